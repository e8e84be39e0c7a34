//! Conversion settings shared by every job in a session.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Target format produced by the decoder.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Lossy, compressed raster. Honors the quality setting.
    #[default]
    Jpeg,
    /// Lossless raster. Quality is ignored.
    Png,
}

impl OutputKind {
    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::Jpeg => "jpg",
            OutputKind::Png => "png",
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            OutputKind::Jpeg => "image/jpeg",
            OutputKind::Png => "image/png",
        }
    }

    pub fn is_lossy(self) -> bool {
        matches!(self, OutputKind::Jpeg)
    }

    /// The `image` crate format the decoded bytes must sniff as.
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            OutputKind::Jpeg => image::ImageFormat::Jpeg,
            OutputKind::Png => image::ImageFormat::Png,
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::Jpeg => write!(f, "JPEG"),
            OutputKind::Png => write!(f, "PNG"),
        }
    }
}

impl FromStr for OutputKind {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" | "image/jpeg" => Ok(OutputKind::Jpeg),
            "png" | "image/png" => Ok(OutputKind::Png),
            other => Err(SettingsError::UnknownOutputKind(other.to_string())),
        }
    }
}

/// Encoder quality in `[0.1, 1.0]`, adjustable in steps of 0.1.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Quality(f32);

impl Quality {
    pub const MIN: f32 = 0.1;
    pub const MAX: f32 = 1.0;
    pub const STEP: f32 = 0.1;
    pub const DEFAULT: f32 = 0.8;

    pub fn new(value: f32) -> Result<Self, SettingsError> {
        // Tolerate float noise from slider arithmetic such as 0.1 * 3.
        const EPSILON: f32 = 1e-4;
        if !value.is_finite() || value < Self::MIN - EPSILON || value > Self::MAX + EPSILON {
            return Err(SettingsError::QualityOutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(Self(value.clamp(Self::MIN, Self::MAX)))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Quality as an integer percentage, the unit external encoders expect.
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round() as u8
    }

    /// Moves the quality by `steps` increments of [`Quality::STEP`], saturating at the bounds.
    pub fn stepped(self, steps: i32) -> Self {
        let raw = self.0 + steps as f32 * Self::STEP;
        let snapped = (raw * 10.0).round() / 10.0;
        Self(snapped.clamp(Self::MIN, Self::MAX))
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<f32> for Quality {
    type Error = SettingsError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Quality::new(value)
    }
}

impl From<Quality> for f32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionSettings {
    pub output_kind: OutputKind,
    pub quality: Quality,
}

/// Shared, mutable settings handle.
///
/// Readers take a copy at the moment they need it. Nothing is snapshotted per
/// batch, so a change made while a batch runs applies to the jobs that have
/// not started yet.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<ConversionSettings>>,
}

impl SharedSettings {
    pub fn new(settings: ConversionSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    pub fn current(&self) -> ConversionSettings {
        match self.inner.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                log::warn!("Settings lock was poisoned, recovering");
                *poisoned.into_inner()
            }
        }
    }

    pub fn set_output_kind(&self, kind: OutputKind) {
        self.modify(|s| s.output_kind = kind);
    }

    pub fn set_quality(&self, value: f32) -> Result<Quality, SettingsError> {
        let quality = Quality::new(value)?;
        self.modify(|s| s.quality = quality);
        Ok(quality)
    }

    fn modify(&self, f: impl FnOnce(&mut ConversionSettings)) {
        let mut guard = match self.inner.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Settings lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        f(&mut guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ConversionSettings::default();
        assert_eq!(settings.output_kind, OutputKind::Jpeg);
        assert_eq!(settings.quality.value(), 0.8);
        assert_eq!(settings.quality.percent(), 80);
    }

    #[test]
    fn test_output_kind_extensions() {
        assert_eq!(OutputKind::Jpeg.extension(), "jpg");
        assert_eq!(OutputKind::Png.extension(), "png");
        assert_eq!(OutputKind::Jpeg.media_type(), "image/jpeg");
        assert!(OutputKind::Jpeg.is_lossy());
        assert!(!OutputKind::Png.is_lossy());
    }

    #[test]
    fn test_output_kind_from_str() {
        assert_eq!("JPEG".parse::<OutputKind>().unwrap(), OutputKind::Jpeg);
        assert_eq!("jpg".parse::<OutputKind>().unwrap(), OutputKind::Jpeg);
        assert_eq!("image/png".parse::<OutputKind>().unwrap(), OutputKind::Png);
        assert_eq!(
            "webp".parse::<OutputKind>(),
            Err(SettingsError::UnknownOutputKind("webp".to_string()))
        );
    }

    #[test]
    fn test_quality_bounds() {
        assert!(Quality::new(0.1).is_ok());
        assert!(Quality::new(1.0).is_ok());
        assert!(Quality::new(0.05).is_err());
        assert!(Quality::new(1.5).is_err());
        assert!(Quality::new(f32::NAN).is_err());
    }

    #[test]
    fn test_quality_stepping_saturates() {
        let q = Quality::default();
        assert_eq!(q.stepped(1).percent(), 90);
        assert_eq!(q.stepped(5).value(), 1.0);
        assert_eq!(q.stepped(-20).value(), 0.1);
    }

    #[test]
    fn test_quality_serde_rejects_out_of_range() {
        let ok: Quality = serde_json::from_str("0.5").unwrap();
        assert_eq!(ok.percent(), 50);
        assert!(serde_json::from_str::<Quality>("2.0").is_err());
    }

    #[test]
    fn test_shared_settings_visible_to_clones() {
        let shared = SharedSettings::default();
        let reader = shared.clone();

        shared.set_output_kind(OutputKind::Png);
        shared.set_quality(0.3).unwrap();

        let current = reader.current();
        assert_eq!(current.output_kind, OutputKind::Png);
        assert_eq!(current.quality.percent(), 30);
    }

    #[test]
    fn test_shared_settings_rejects_bad_quality() {
        let shared = SharedSettings::default();
        assert!(shared.set_quality(0.0).is_err());
        assert_eq!(shared.current().quality.value(), Quality::DEFAULT);
    }
}
