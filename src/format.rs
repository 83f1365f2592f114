use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Encodable image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    WebP,
}

/// What an encoder can trade for size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormatCapability {
    /// Quality parameter in `0.0..=quality_cap`.
    LossyQuality { quality_cap: f32 },
    /// Quality is ignored; only effort level and dimensions change the size.
    LosslessEffort,
}

impl ImageFormat {
    pub fn capability(self) -> FormatCapability {
        match self {
            ImageFormat::Jpeg => FormatCapability::LossyQuality { quality_cap: 0.8 },
            ImageFormat::WebP => FormatCapability::LossyQuality { quality_cap: 0.75 },
            ImageFormat::Png => FormatCapability::LosslessEffort,
        }
    }

    pub fn is_lossless(self) -> bool {
        matches!(self.capability(), FormatCapability::LosslessEffort)
    }

    /// Caps a caller quality for this format. Lossless formats pass it through untouched.
    pub fn clamp_quality(self, quality: f32) -> f32 {
        let quality = quality.clamp(0.0, 1.0);
        match self.capability() {
            FormatCapability::LossyQuality { quality_cap } => quality.min(quality_cap),
            FormatCapability::LosslessEffort => quality,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::WebP => "webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::WebP => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::WebP => "image/webp",
        }
    }

    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
            image::ImageFormat::Png => Some(ImageFormat::Png),
            image::ImageFormat::WebP => Some(ImageFormat::WebP),
            _ => None,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            "webp" => Ok(ImageFormat::WebP),
            other => Err(format!("unsupported image format '{other}'")),
        }
    }
}

/// Requested output format; `Original` keeps whatever the source decoded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Original,
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    /// Sources that decode to something we cannot encode (GIF, BMP) are written as PNG.
    pub fn resolve(self, source: Option<ImageFormat>) -> ImageFormat {
        match self {
            OutputFormat::Original => source.unwrap_or(ImageFormat::Png),
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::WebP => ImageFormat::WebP,
        }
    }

    pub fn is_original(self) -> bool {
        self == OutputFormat::Original
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "original" | "auto" => Ok(OutputFormat::Original),
            other => match other.parse::<ImageFormat>()? {
                ImageFormat::Jpeg => Ok(OutputFormat::Jpeg),
                ImageFormat::Png => Ok(OutputFormat::Png),
                ImageFormat::WebP => Ok(OutputFormat::WebP),
            },
        }
    }
}
