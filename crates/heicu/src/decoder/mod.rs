//! The external decode collaborator.
//!
//! Decoding HEIC/HEIF is never done in this crate. A [`Decoder`] receives the
//! original bytes plus the settings in effect when the job was dispatched and
//! returns encoded JPEG/PNG bytes, or fails.

pub mod command;

use async_trait::async_trait;

pub use command::{CommandDecoder, DecoderCommand};

use crate::error::DecodeError;
use crate::settings::{OutputKind, Quality};

#[async_trait]
pub trait Decoder: Send + Sync {
    async fn decode(
        &self,
        input: &[u8],
        kind: OutputKind,
        quality: Quality,
    ) -> Result<Vec<u8>, DecodeError>;
}

/// Checks that decoded bytes sniff as the requested output format.
pub fn verify_output(bytes: &[u8], kind: OutputKind) -> Result<(), DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::UnexpectedOutput("empty output".to_string()));
    }

    match image::guess_format(bytes) {
        Ok(format) if format == kind.image_format() => Ok(()),
        Ok(format) => Err(DecodeError::UnexpectedOutput(format!(
            "expected {}, got {:?}",
            kind, format
        ))),
        Err(e) => Err(DecodeError::UnexpectedOutput(format!(
            "unrecognized output format: {}",
            e
        ))),
    }
}
