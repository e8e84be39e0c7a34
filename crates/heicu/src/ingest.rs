//! Filtering of raw input files down to convertible HEIC/HEIF jobs.

use crate::job::{InputFile, Job};

/// Extensions accepted regardless of declared media type.
pub const HEIC_EXTENSIONS: [&str; 2] = [".heic", ".heif"];

/// Declared media types accepted regardless of file name.
pub const HEIC_MEDIA_TYPES: [&str; 2] = ["image/heic", "image/heif"];

/// True when the file name ends with a HEIC/HEIF extension (any case) or the
/// declared media type is a HEIC/HEIF type.
pub fn is_eligible(file: &InputFile) -> bool {
    let name = file.name().to_lowercase();
    HEIC_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
        || HEIC_MEDIA_TYPES.contains(&file.media_type())
}

/// Keeps the eligible files, preserving order.
pub fn filter_eligible(files: Vec<InputFile>) -> Vec<InputFile> {
    let total = files.len();
    let eligible: Vec<InputFile> = files
        .into_iter()
        .filter(|file| {
            let keep = is_eligible(file);
            if !keep {
                log::debug!(
                    "Skipping '{}' (declared type '{}'): not HEIC/HEIF",
                    file.name(),
                    file.media_type()
                );
            }
            keep
        })
        .collect();

    log::debug!("{} of {} file(s) eligible for conversion", eligible.len(), total);
    eligible
}

/// Turns a batch of raw files into pending jobs with fresh ids.
///
/// Returns `None` when nothing in the batch is eligible.
pub fn admit(files: Vec<InputFile>) -> Option<Vec<Job>> {
    let eligible = filter_eligible(files);
    if eligible.is_empty() {
        return None;
    }
    Some(eligible.into_iter().map(Job::new).collect())
}
