use crate::codec::{ImageCodec, ImageRsCodec};
use crate::compression::{
    BatchOptions, CompressionRequest, CompressionResult, SizeTargetingController, SourceImage,
    compress_all,
};
use crate::config::CompressionConfig;
use crate::error::{CompressionError, Result};
use crate::format::ImageFormat;
use crate::models::{EncodedImage, ImageMetadata, ImageOperation, ResizeMode, ResizeOptions};
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, ImageDecoder, ImageReader};
use std::io::Cursor;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const RESIZE_FILTER: FilterType = FilterType::Lanczos3;
const RESIZE_QUALITY: u8 = 90;
const OPERATION_QUALITY: u8 = 80;
const BLUR_SIGMA_RANGE: std::ops::RangeInclusive<f32> = 0.3..=1000.0;

/// Image work behind the HTTP routes. Every method except [`compress_images`] is
/// CPU bound and meant to run on the blocking pool.
///
/// [`compress_images`]: ImageCompressionService::compress_images
pub struct ImageCompressionService {
    controller: Arc<SizeTargetingController<ImageRsCodec>>,
    batch_options: BatchOptions,
}

impl ImageCompressionService {
    pub fn new(config: &CompressionConfig) -> Self {
        let codec = ImageRsCodec::new(
            config.png_effort,
            config.timeout(),
            config.max_image_size.saturating_mul(4),
        );

        Self {
            controller: Arc::new(SizeTargetingController::new(codec)),
            batch_options: BatchOptions {
                concurrency: config.batch_concurrency,
            },
        }
    }

    fn codec(&self) -> &ImageRsCodec {
        self.controller.codec()
    }

    pub async fn compress_images(
        &self,
        images: Vec<SourceImage>,
        request: CompressionRequest,
        cancel: CancellationToken,
    ) -> Vec<Result<CompressionResult>> {
        compress_all(
            Arc::clone(&self.controller),
            images,
            request,
            self.batch_options,
            cancel,
            |progress| {
                tracing::debug!(
                    completed = progress.completed,
                    total = progress.total,
                    "batch progress"
                )
            },
        )
        .await
    }

    /// Resizes and re-encodes as JPEG at quality 90.
    pub fn resize(&self, bytes: &[u8], options: &ResizeOptions) -> Result<EncodedImage> {
        let img = self.codec().decode(bytes)?.pixels;
        let resized = resize_image(&img, options)?;
        self.encode(&resized, ImageFormat::Jpeg, RESIZE_QUALITY)
    }

    pub fn convert(&self, bytes: &[u8], format: ImageFormat, quality: u8) -> Result<EncodedImage> {
        let img = self.codec().decode(bytes)?.pixels;
        self.encode(&img, format, quality)
    }

    /// Applies resize, rotate, blur, sharpen and grayscale in that order, then encodes
    /// (JPEG at quality 80 unless the operation says otherwise).
    pub fn process(&self, bytes: &[u8], operation: &ImageOperation) -> Result<EncodedImage> {
        let mut img = self.codec().decode(bytes)?.pixels;

        if let Some(resize) = &operation.resize {
            img = resize_image(&img, resize)?;
        }

        if let Some(degrees) = operation.rotate {
            img = rotate_image(img, degrees)?;
        }

        if let Some(sigma) = operation.blur {
            if !BLUR_SIGMA_RANGE.contains(&sigma) {
                return Err(CompressionError::InvalidOperation(format!(
                    "blur sigma {sigma} is outside 0.3-1000"
                )));
            }
            img = img.blur(sigma);
        }

        if operation.sharpen {
            img = img.unsharpen(1.0, 1);
        }

        if operation.grayscale {
            img = img.grayscale();
        }

        self.encode(
            &img,
            operation.format.unwrap_or(ImageFormat::Jpeg),
            operation.quality.unwrap_or(OPERATION_QUALITY),
        )
    }

    /// Reads header information without decoding pixels.
    pub fn metadata(&self, bytes: &[u8]) -> Result<ImageMetadata> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CompressionError::Decode(e.to_string()))?;

        let format = reader
            .format()
            .ok_or_else(|| CompressionError::Decode("unknown image format".to_string()))?;

        let mut decoder = reader
            .into_decoder()
            .map_err(|e| CompressionError::Decode(e.to_string()))?;

        let (width, height) = decoder.dimensions();
        let color = decoder.color_type();
        let has_profile = decoder
            .icc_profile()
            .map(|profile| profile.is_some_and(|p| !p.is_empty()))
            .unwrap_or(false);

        Ok(ImageMetadata {
            format: format!("{:?}", format).to_lowercase(),
            width,
            height,
            channels: color.channel_count(),
            depth: sample_depth(color),
            has_alpha: color.has_alpha(),
            has_profile,
            space: color_space(color),
        })
    }

    fn encode(&self, img: &DynamicImage, format: ImageFormat, quality: u8) -> Result<EncodedImage> {
        let bytes = self
            .codec()
            .encode(img, format, f32::from(quality.clamp(1, 100)) / 100.0)?;
        let (width, height) = img.dimensions();

        Ok(EncodedImage {
            bytes,
            format,
            width,
            height,
        })
    }
}

fn resize_image(img: &DynamicImage, options: &ResizeOptions) -> Result<DynamicImage> {
    let (src_width, src_height) = img.dimensions();

    match (options.width, options.height) {
        (None, None) => Err(CompressionError::InvalidOperation(
            "resize needs a width or a height".to_string(),
        )),
        (Some(0), _) | (_, Some(0)) => Err(CompressionError::InvalidOperation(
            "resize dimensions must be greater than zero".to_string(),
        )),
        (Some(width), None) => {
            let height = proportional(src_height, width, src_width);
            Ok(img.resize_exact(width, height, RESIZE_FILTER))
        }
        (None, Some(height)) => {
            let width = proportional(src_width, height, src_height);
            Ok(img.resize_exact(width, height, RESIZE_FILTER))
        }
        (Some(width), Some(height)) => Ok(match options.fit {
            ResizeMode::Fit => img.resize(width, height, RESIZE_FILTER),
            ResizeMode::Fill => img.resize_to_fill(width, height, RESIZE_FILTER),
            ResizeMode::Force => img.resize_exact(width, height, RESIZE_FILTER),
        }),
    }
}

/// Scales `other` by `target / source`, never below one pixel.
fn proportional(other: u32, target: u32, source: u32) -> u32 {
    let scaled = f64::from(other) * f64::from(target) / f64::from(source.max(1));
    (scaled.round() as u32).max(1)
}

fn rotate_image(img: DynamicImage, degrees: i32) -> Result<DynamicImage> {
    match degrees.rem_euclid(360) {
        0 => Ok(img),
        90 => Ok(img.rotate90()),
        180 => Ok(img.rotate180()),
        270 => Ok(img.rotate270()),
        _ => Err(CompressionError::InvalidOperation(format!(
            "rotation must be a multiple of 90 degrees, got {degrees}"
        ))),
    }
}

fn sample_depth(color: ColorType) -> &'static str {
    match color.bytes_per_pixel() / color.channel_count().max(1) {
        1 => "uchar",
        2 => "ushort",
        _ => "float",
    }
}

fn color_space(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16 => "b-w",
        _ => "srgb",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use image::{Rgb, RgbImage};

    fn service() -> ImageCompressionService {
        ImageCompressionService::new(&crate::config::AppConfig::default().compression)
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn resize_with_one_side_keeps_aspect_ratio() {
        let out = service()
            .resize(
                &png_bytes(400, 200),
                &ResizeOptions {
                    width: Some(100),
                    height: None,
                    fit: ResizeMode::Fit,
                },
            )
            .unwrap();

        assert_eq!((out.width, out.height), (100, 50));
        assert_eq!(out.format, ImageFormat::Jpeg);
    }

    #[test]
    fn resize_modes_differ_when_both_sides_are_given() {
        let source = png_bytes(400, 200);
        let run = |fit| {
            let out = service()
                .resize(
                    &source,
                    &ResizeOptions {
                        width: Some(100),
                        height: Some(100),
                        fit,
                    },
                )
                .unwrap();
            (out.width, out.height)
        };

        assert_eq!(run(ResizeMode::Fit), (100, 50));
        assert_eq!(run(ResizeMode::Fill), (100, 100));
        assert_eq!(run(ResizeMode::Force), (100, 100));
    }

    #[test]
    fn rotation_swaps_axes_and_rejects_odd_angles() {
        let service = service();
        let source = png_bytes(40, 20);

        let rotated = service
            .process(
                &source,
                &ImageOperation {
                    rotate: Some(-90),
                    format: Some(ImageFormat::Png),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!((rotated.width, rotated.height), (20, 40));

        assert_matches!(
            service.process(
                &source,
                &ImageOperation {
                    rotate: Some(45),
                    ..Default::default()
                }
            ),
            Err(CompressionError::InvalidOperation(_))
        );
    }

    #[test]
    fn blur_sigma_is_range_checked() {
        assert_matches!(
            service().process(
                &png_bytes(10, 10),
                &ImageOperation {
                    blur: Some(0.1),
                    ..Default::default()
                }
            ),
            Err(CompressionError::InvalidOperation(_))
        );
    }

    #[test]
    fn metadata_reads_header_fields() {
        let metadata = service().metadata(&png_bytes(64, 32)).unwrap();

        assert_eq!(metadata.format, "png");
        assert_eq!((metadata.width, metadata.height), (64, 32));
        assert_eq!(metadata.channels, 3);
        assert_eq!(metadata.depth, "uchar");
        assert!(!metadata.has_alpha);
        assert_eq!(metadata.space, "srgb");
    }

    #[test]
    fn metadata_of_garbage_is_a_decode_error() {
        assert_matches!(
            service().metadata(b"definitely not an image"),
            Err(CompressionError::Decode(_))
        );
    }

    #[test]
    fn convert_switches_format() {
        let out = service()
            .convert(&png_bytes(32, 32), ImageFormat::WebP, 90)
            .unwrap();
        assert_eq!(out.format, ImageFormat::WebP);
        assert_eq!(crate::utils::detect_media_type(&out.bytes), "image/webp");
    }
}
