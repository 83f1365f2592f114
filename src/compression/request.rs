use crate::compression::planner::{DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH, DimensionPlanner};
use crate::error::{CompressionError, Result};
use crate::format::OutputFormat;
use crate::utils::detect_media_type;

/// An uploaded image, borrowed by the controller for one run.
#[derive(Debug, Clone)]
pub struct SourceImage {
    name: String,
    media_type: String,
    bytes: Vec<u8>,
}

impl SourceImage {
    /// Detects the media type from the leading magic bytes.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let media_type = detect_media_type(&bytes).to_string();
        Self {
            name: name.into(),
            media_type,
            bytes,
        }
    }

    /// Keeps the media type the uploader declared, falling back to detection when absent.
    pub fn with_media_type(name: impl Into<String>, media_type: Option<&str>, bytes: Vec<u8>) -> Self {
        match media_type {
            Some(declared) if !declared.is_empty() => Self {
                name: name.into(),
                media_type: declared.to_string(),
                bytes,
            },
            _ => Self::new(name, bytes),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Flat quality, no size target.
    Quality,
    /// Search for an encoding no larger than `max_bytes`.
    TargetSize { max_bytes: i64 },
}

/// Parameters for one compression run.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionRequest {
    pub method: CompressionMethod,
    /// `0.0..=1.0`.
    pub quality: f32,
    pub output_format: OutputFormat,
    pub max_width: u32,
    pub max_height: u32,
}

impl CompressionRequest {
    /// Quality mode from a 0-100 percentage.
    pub fn quality_percent(percent: u8) -> Self {
        Self {
            method: CompressionMethod::Quality,
            quality: f32::from(percent.min(100)) / 100.0,
            output_format: OutputFormat::Original,
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
        }
    }

    pub fn target_size_bytes(max_bytes: i64) -> Self {
        Self {
            method: CompressionMethod::TargetSize { max_bytes },
            ..Self::quality_percent(80)
        }
    }

    /// Target-size mode from a budget in KB (1 KB = 1024 bytes).
    pub fn target_size_kb(max_kb: i64) -> Self {
        Self::target_size_bytes(max_kb.saturating_mul(1024))
    }

    pub fn with_quality_percent(mut self, percent: u8) -> Self {
        self.quality = f32::from(percent.min(100)) / 100.0;
        self
    }

    pub fn with_output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    pub fn with_max_bounds(mut self, max_width: u32, max_height: u32) -> Self {
        self.max_width = max_width;
        self.max_height = max_height;
        self
    }

    pub fn planner(&self) -> DimensionPlanner {
        DimensionPlanner::new(self.max_width, self.max_height)
    }

    /// The only fatal request: a byte budget that is not positive.
    pub fn validate(&self) -> Result<()> {
        match self.method {
            CompressionMethod::TargetSize { max_bytes } if max_bytes <= 0 => {
                Err(CompressionError::InvalidTarget(max_bytes))
            }
            _ => Ok(()),
        }
    }
}

impl Default for CompressionRequest {
    fn default() -> Self {
        Self::quality_percent(80)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn percent_maps_onto_unit_range() {
        assert_eq!(CompressionRequest::quality_percent(80).quality, 0.8);
        assert_eq!(CompressionRequest::quality_percent(250).quality, 1.0);
    }

    #[test]
    fn kb_budget_is_binary_kilobytes() {
        assert_eq!(
            CompressionRequest::target_size_kb(200).method,
            CompressionMethod::TargetSize {
                max_bytes: 200 * 1024
            }
        );
    }

    #[test]
    fn non_positive_budgets_are_rejected() {
        assert_matches!(
            CompressionRequest::target_size_kb(0).validate(),
            Err(CompressionError::InvalidTarget(0))
        );
        assert_matches!(
            CompressionRequest::target_size_bytes(-5).validate(),
            Err(CompressionError::InvalidTarget(-5))
        );
        assert!(CompressionRequest::target_size_bytes(1).validate().is_ok());
    }

    #[test]
    fn declared_media_type_wins_over_detection() {
        let png_magic = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        let declared = SourceImage::with_media_type("a.png", Some("image/x-png"), png_magic.clone());
        assert_eq!(declared.media_type(), "image/x-png");

        let detected = SourceImage::with_media_type("a.png", None, png_magic);
        assert_eq!(detected.media_type(), "image/png");
    }
}
