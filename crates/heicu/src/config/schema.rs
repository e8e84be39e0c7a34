use serde::{Deserialize, Serialize};

use crate::config::loader::CONFIG_VERSION;
use crate::decoder::DecoderCommand;
use crate::error::SettingsError;
use crate::settings::{ConversionSettings, OutputKind, Quality};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub output_kind: OutputKind,
    #[serde(default = "default_quality")]
    pub quality: f32,
    #[serde(default = "default_max_concurrent_decodes")]
    pub max_concurrent_decodes: usize,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    #[serde(default)]
    pub decoder: DecoderCommand,
    #[serde(default = "default_download_directory")]
    pub download_directory: String,
}

fn default_quality() -> f32 {
    Quality::DEFAULT
}

fn default_max_concurrent_decodes() -> usize {
    1
}

fn default_event_capacity() -> usize {
    100
}

fn default_download_directory() -> String {
    ".".to_string()
}

impl Config {
    /// Initial conversion settings of a session built from this config.
    pub fn conversion_settings(&self) -> Result<ConversionSettings, SettingsError> {
        Ok(ConversionSettings {
            output_kind: self.output_kind,
            quality: Quality::new(self.quality)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            output_kind: OutputKind::default(),
            quality: default_quality(),
            max_concurrent_decodes: default_max_concurrent_decodes(),
            event_capacity: default_event_capacity(),
            decoder: DecoderCommand::default(),
            download_directory: default_download_directory(),
        }
    }
}
