use crate::compression::request::SourceImage;
use crate::format::ImageFormat;
use serde::Serialize;

/// How a run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Flat-quality encode, including the lower-quality JPEG retry.
    Encoded,
    TargetMet,
    QualityFloorReached,
    AttemptsExhausted,
    /// The size target could not be reached; the best attempt or the original is returned.
    TargetUnreachable,
    /// A lossless source was re-encoded as JPEG.
    AutoConverted,
    /// No strategy beat the original bytes.
    OriginalKept,
}

/// Immutable output of one compression run.
///
/// Sizes and savings are derived from the bytes when the record is built.
#[derive(Debug, Clone)]
pub struct CompressionResult {
    bytes: Vec<u8>,
    file_name: String,
    /// `None` when the original bytes were kept in a format the service does not write.
    format: Option<ImageFormat>,
    media_type: String,
    width: u32,
    height: u32,
    original_size: usize,
    outcome: Outcome,
    note: Option<String>,
}

impl CompressionResult {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        bytes: Vec<u8>,
        file_name: String,
        format: ImageFormat,
        (width, height): (u32, u32),
        original_size: usize,
        outcome: Outcome,
        note: Option<String>,
    ) -> Self {
        Self {
            bytes,
            file_name,
            format: Some(format),
            media_type: format.mime_type().to_string(),
            width,
            height,
            original_size,
            outcome,
            note,
        }
    }

    /// The source bytes, untouched.
    pub(crate) fn kept_original(
        source: &SourceImage,
        format: Option<ImageFormat>,
        (width, height): (u32, u32),
        outcome: Outcome,
        note: Option<String>,
    ) -> Self {
        let media_type = match format {
            Some(format) => format.mime_type().to_string(),
            None => source.media_type().to_string(),
        };
        Self {
            bytes: source.bytes().to_vec(),
            file_name: source.name().to_string(),
            format,
            media_type,
            width,
            height,
            original_size: source.len(),
            outcome,
            note,
        }
    }

    pub(crate) fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn original_size(&self) -> usize {
        self.original_size
    }

    pub fn compressed_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn savings_percent(&self) -> f64 {
        savings_percent(self.original_size, self.bytes.len())
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

/// `(original - compressed) / original * 100`; negative when the output grew.
pub fn savings_percent(original: usize, compressed: usize) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (original as f64 - compressed as f64) / original as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn savings_can_go_negative() {
        assert_eq!(savings_percent(1000, 250), 75.0);
        assert_eq!(savings_percent(1000, 1500), -50.0);
        assert_eq!(savings_percent(0, 10), 0.0);
    }

    #[test]
    fn sizes_follow_the_bytes() {
        let result = CompressionResult::new(
            vec![0; 300],
            "a.jpg".to_string(),
            ImageFormat::Jpeg,
            (10, 10),
            1200,
            Outcome::Encoded,
            None,
        );
        assert_eq!(result.compressed_size(), 300);
        assert_eq!(result.savings_percent(), 75.0);
    }

    #[test]
    fn kept_original_carries_the_source_media_type() {
        let source = SourceImage::new("anim.gif", b"GIF89a-rest-of-file".to_vec());

        let result = CompressionResult::kept_original(&source, None, (4, 4), Outcome::OriginalKept, None);

        assert_eq!(result.bytes(), source.bytes());
        assert_eq!(result.file_name(), "anim.gif");
        assert_eq!(result.format(), None);
        assert_eq!(result.media_type(), "image/gif");
        assert_eq!(result.savings_percent(), 0.0);
    }
}
