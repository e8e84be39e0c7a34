//! Delivery of converted outputs to the user.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DownloadError;

const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Destination for downloaded files.
pub trait DownloadSink: Send + Sync {
    /// Saves `bytes` under `filename` and returns where they ended up.
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, DownloadError>;
}

/// Writes downloads into a directory, never overwriting an existing file.
///
/// A name that is taken gets a numeric suffix: `photo.jpg`, `photo_2.jpg`, ...
#[derive(Debug, Clone)]
pub struct DirectorySink {
    directory: PathBuf,
}

impl DirectorySink {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn ensure_directory(&self) -> Result<(), DownloadError> {
        if !self.directory.exists() {
            std::fs::create_dir_all(&self.directory).map_err(|e| {
                DownloadError::CreateDirectory {
                    path: self.directory.clone(),
                    source: e,
                }
            })?;
        }
        Ok(())
    }

    fn create_exclusive(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, DownloadError> {
        let (base, ext) = match filename.rfind('.') {
            Some(dot) if dot > 0 => (&filename[..dot], Some(&filename[dot..])),
            _ => (filename, None),
        };

        for counter in 1..=MAX_NAME_ATTEMPTS {
            let candidate = match (counter, ext) {
                (1, _) => filename.to_string(),
                (_, Some(ext)) => format!("{}_{}{}", base, counter, ext),
                (_, None) => format!("{}_{}", base, counter),
            };
            let path = self.directory.join(&candidate);

            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => {
                    write_new_file(&path, file, bytes)?;
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(DownloadError::WriteFile { path, source: e }),
            }
        }

        Err(DownloadError::FileExists(self.directory.join(filename)))
    }
}

/// Writes `bytes` into a file that was just created at `path`. On failure the
/// partial file is removed so its name stays free for the next attempt.
fn write_new_file<W: Write>(path: &Path, mut file: W, bytes: &[u8]) -> Result<(), DownloadError> {
    if let Err(e) = file.write_all(bytes).and_then(|()| file.flush()) {
        drop(file);
        if let Err(remove_err) = std::fs::remove_file(path) {
            log::warn!(
                "Failed to remove partial download {}: {}",
                path.display(),
                remove_err
            );
        }
        return Err(DownloadError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}

impl DownloadSink for DirectorySink {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, DownloadError> {
        self.ensure_directory()?;

        // Only the final component is used; output names never choose a directory.
        let filename = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("converted");

        let path = self.create_exclusive(filename, bytes)?;
        log::debug!("Saved {} byte(s) to {}", bytes.len(), path.display());
        Ok(path)
    }
}

/// Result of a bulk download.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadReport {
    pub saved: Vec<PathBuf>,
    pub errors: Vec<String>,
}

impl DownloadReport {
    pub fn is_empty(&self) -> bool {
        self.saved.is_empty() && self.errors.is_empty()
    }
}
