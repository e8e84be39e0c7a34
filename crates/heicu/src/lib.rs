pub mod config;
pub mod decoder;
pub mod download;
pub mod error;
pub mod events;
pub mod ingest;
pub mod job;
pub mod orchestrator;
pub mod registry;
pub mod resource;
pub mod session;
pub mod settings;

pub use config::{load_config, load_config_from_str, Config};
pub use decoder::{CommandDecoder, Decoder, DecoderCommand};
pub use download::{DirectorySink, DownloadReport, DownloadSink};
pub use error::{
    ConfigError, DecodeError, DownloadError, HeicuError, ResourceError, Result, SessionError,
    SettingsError,
};
pub use events::{EventBroadcaster, EventKind, SessionEvent};
pub use job::{InputFile, JobId, JobState, JobView};
pub use orchestrator::{BatchHandle, BatchSummary};
pub use registry::JobRegistry;
pub use resource::{HandleProvider, MemoryHandleProvider, OutputHandle, ResourceManager, ResourceStats};
pub use session::ConversionSession;
pub use settings::{ConversionSettings, OutputKind, Quality};
