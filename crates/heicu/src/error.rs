use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeicuError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Failed to read input file '{path}': {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("Quality {value} is outside the range {min}..={max}")]
    QualityOutOfRange { value: f32, min: f32, max: f32 },

    #[error("Unknown output kind: {0}")]
    UnknownOutputKind(String),
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Failed to prepare decoder workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("Failed to launch decoder '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Decoder exited with {status}: {stderr}")]
    ExitStatus { status: String, stderr: String },

    #[error("Decoder produced unexpected output: {0}")]
    UnexpectedOutput(String),

    #[error("Decoder panicked: {0}")]
    Panicked(String),

    #[error("Decode failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Cannot allocate a handle for empty output")]
    EmptyOutput,

    #[error("Unknown or already revoked handle: {0}")]
    UnknownHandle(String),
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Job {0} has no converted output")]
    NotConverted(String),

    #[error("Output bytes for handle {0} are no longer available")]
    Unavailable(String),

    #[error("Failed to create download directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No free filename left for: {0}")]
    FileExists(PathBuf),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("{pending} conversion(s) still in progress")]
    ConversionsInFlight { pending: usize },
}

pub type Result<T> = std::result::Result<T, HeicuError>;
