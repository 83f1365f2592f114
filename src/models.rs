use crate::compression::result::savings_percent;
use crate::compression::{CompressionResult, Outcome};
use crate::format::ImageFormat;
use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    pub uptime_seconds: f64,
}

#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response for endpoints that accept several files and report each one separately.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse<T> {
    pub success: bool,
    pub results: Vec<FileOutcome<T>>,
    pub total_files: usize,
    pub processed_files: usize,
}

impl<T> BatchResponse<T> {
    pub fn new(results: Vec<FileOutcome<T>>) -> Self {
        let processed_files = results
            .iter()
            .filter(|r| matches!(r, FileOutcome::Done(_)))
            .count();

        Self {
            success: true,
            total_files: results.len(),
            processed_files,
            results,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum FileOutcome<T> {
    Done(T),
    Failed(FailedImage),
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FailedImage {
    pub original_name: String,
    pub error: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CompressedImage {
    pub original_name: String,
    pub file_name: String,
    pub original_size: usize,
    pub compressed_size: usize,
    /// Percentage saved, one decimal.
    pub savings: f64,
    pub data: String,
    /// Absent when the original bytes were kept in an input-only format such as GIF.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ImageFormat>,
    pub media_type: String,
    pub width: u32,
    pub height: u32,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CompressedImage {
    pub fn from_result(original_name: &str, result: &CompressionResult) -> Self {
        Self {
            original_name: original_name.to_string(),
            file_name: result.file_name().to_string(),
            original_size: result.original_size(),
            compressed_size: result.compressed_size(),
            savings: round_one_decimal(result.savings_percent()),
            data: general_purpose::STANDARD.encode(result.bytes()),
            format: result.format(),
            media_type: result.media_type().to_string(),
            width: result.width(),
            height: result.height(),
            outcome: result.outcome(),
            note: result.note().map(str::to_string),
        }
    }
}

/// Output of a single pixel transform (resize, convert, batch operation).
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResizeResponse {
    pub success: bool,
    pub original_size: usize,
    pub new_size: usize,
    pub width: u32,
    pub height: u32,
    pub data: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub success: bool,
    pub original_format: String,
    pub new_format: String,
    pub original_size: usize,
    pub new_size: usize,
    pub data: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedImage {
    pub original_name: String,
    pub original_size: usize,
    pub processed_size: usize,
    pub savings: f64,
    pub data: String,
    pub operations: ImageOperation,
    pub info: ImageInfo,
}

#[derive(Serialize, Debug)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub size: usize,
}

impl ProcessedImage {
    pub fn new(original_name: &str, original_size: usize, operations: ImageOperation, image: EncodedImage) -> Self {
        let processed_size = image.bytes.len();
        Self {
            original_name: original_name.to_string(),
            original_size,
            processed_size,
            savings: round_one_decimal(savings_percent(original_size, processed_size)),
            data: general_purpose::STANDARD.encode(&image.bytes),
            operations,
            info: ImageInfo {
                format: image.format,
                width: image.width,
                height: image.height,
                size: processed_size,
            },
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    /// Sample type per channel: `uchar`, `ushort` or `float`.
    pub depth: &'static str,
    pub has_alpha: bool,
    pub has_profile: bool,
    /// `srgb` or `b-w`.
    pub space: &'static str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MetadataResponse {
    pub success: bool,
    pub filename: String,
    pub size: usize,
    #[serde(flatten)]
    pub metadata: ImageMetadata,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Keep the aspect ratio and fit inside the box.
    #[default]
    #[serde(alias = "inside", alias = "contain")]
    Fit,
    /// Cover the box and crop the overflow around the center.
    #[serde(alias = "cover")]
    Fill,
    /// Stretch to the exact box.
    Force,
}

impl std::str::FromStr for ResizeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fit" | "inside" | "contain" => Ok(ResizeMode::Fit),
            "fill" | "cover" => Ok(ResizeMode::Fill),
            "force" => Ok(ResizeMode::Force),
            _ => Err("Parametro fit invalido (fit, fill, force)".to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, alias = "mode")]
    pub fit: ResizeMode,
}

/// One entry of the `operations` array sent to `/api/batch-process`, applied in field order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ImageOperation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resize: Option<ResizeOptions>,
    /// Degrees clockwise, a multiple of 90.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate: Option<i32>,
    /// Gaussian sigma, 0.3 to 1000.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur: Option<f32>,
    #[serde(default)]
    pub sharpen: bool,
    #[serde(default)]
    pub grayscale: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ImageFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_accept_sharp_style_names() {
        let ops: Vec<ImageOperation> = serde_json::from_str(
            r#"[{"resize": {"width": 300, "fit": "cover"}, "rotate": 90, "format": "jpg"},
                {"grayscale": true, "blur": 2.5}]"#,
        )
        .unwrap();

        assert_eq!(
            ops[0].resize,
            Some(ResizeOptions {
                width: Some(300),
                height: None,
                fit: ResizeMode::Fill,
            })
        );
        assert_eq!(ops[0].format, Some(ImageFormat::Jpeg));
        assert!(ops[1].grayscale);
        assert!(!ops[1].sharpen);
        assert_eq!(ops[1].blur, Some(2.5));
    }

    #[test]
    fn processed_files_counts_only_successes() {
        let response: BatchResponse<u32> = BatchResponse::new(vec![
            FileOutcome::Done(1),
            FileOutcome::Failed(FailedImage {
                original_name: "bad.png".to_string(),
                error: "could not decode image".to_string(),
            }),
        ]);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["totalFiles"], 2);
        assert_eq!(json["processedFiles"], 1);
        assert_eq!(json["results"][0], 1);
        assert_eq!(json["results"][1]["originalName"], "bad.png");
    }

    #[test]
    fn savings_keep_one_decimal() {
        assert_eq!(round_one_decimal(66.666), 66.7);
        assert_eq!(round_one_decimal(-12.04), -12.0);
    }
}
