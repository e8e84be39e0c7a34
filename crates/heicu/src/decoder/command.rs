use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info_span, Instrument};

use super::{verify_output, Decoder};
use crate::error::DecodeError;
use crate::settings::{OutputKind, Quality};

/// External converter invocation.
///
/// Each argument may contain the placeholders `{input}`, `{output}` and
/// `{quality}` (integer percent).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecoderCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl DecoderCommand {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn render_args(&self, input: &Path, output: &Path, quality: Quality) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        let quality = quality.percent().to_string();

        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{quality}", &quality)
            })
            .collect()
    }
}

impl Default for DecoderCommand {
    /// libheif's `heif-convert`, which picks the encoder from the output extension.
    fn default() -> Self {
        Self::new("heif-convert", &["-q", "{quality}", "{input}", "{output}"])
    }
}

/// Decoder that shells out to an external HEIC converter.
///
/// Input bytes are staged in a scratch directory that is removed once the
/// call settles.
pub struct CommandDecoder {
    command: DecoderCommand,
}

impl CommandDecoder {
    pub fn new(command: DecoderCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &DecoderCommand {
        &self.command
    }

    async fn run(
        &self,
        input: &[u8],
        kind: OutputKind,
        quality: Quality,
    ) -> Result<Vec<u8>, DecodeError> {
        if input.is_empty() {
            return Err(DecodeError::UnsupportedInput("empty input".to_string()));
        }

        let workspace = tempfile::tempdir().map_err(DecodeError::Workspace)?;
        let input_path = workspace.path().join("input.heic");
        let output_path = workspace.path().join(format!("output.{}", kind.extension()));

        tokio::fs::write(&input_path, input)
            .await
            .map_err(DecodeError::Workspace)?;

        let args = self.command.render_args(&input_path, &output_path, quality);
        debug!(program = %self.command.program, ?args, "Running decoder");

        let output = Command::new(&self.command.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DecodeError::Launch {
                program: self.command.program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(DecodeError::ExitStatus {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let bytes = tokio::fs::read(&output_path).await.map_err(|e| {
            DecodeError::UnexpectedOutput(format!("no output file written: {}", e))
        })?;
        verify_output(&bytes, kind)?;

        Ok(bytes)
    }
}

impl Default for CommandDecoder {
    fn default() -> Self {
        Self::new(DecoderCommand::default())
    }
}

#[async_trait]
impl Decoder for CommandDecoder {
    async fn decode(
        &self,
        input: &[u8],
        kind: OutputKind,
        quality: Quality,
    ) -> Result<Vec<u8>, DecodeError> {
        let span = info_span!("decoder.command", program = %self.command.program, %kind);
        self.run(input, kind, quality).instrument(span).await
    }
}
