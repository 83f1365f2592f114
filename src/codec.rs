use crate::error::{CompressionError, Result};
use crate::format::ImageFormat;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView};
use oxipng::{Options, StripChunks, optimize_from_memory};
use std::time::Duration;

/// Resampling filter used when redrawing a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resampling {
    /// High quality filter, used for every real downscale.
    Smooth,
    /// Smoothing disabled.
    Nearest,
}

#[derive(Debug, Clone)]
pub struct Decoded<P> {
    pub pixels: P,
    pub width: u32,
    pub height: u32,
    /// `None` when the source decoded fine but is not one of the encodable formats.
    pub format: Option<ImageFormat>,
}

/// Pixel codec the compression controller drives.
///
/// Implementations own every detail of decoding, resampling and encoding. The controller
/// only looks at the byte length of what comes back.
pub trait ImageCodec {
    type Pixels: Clone;

    fn decode(&self, bytes: &[u8]) -> Result<Decoded<Self::Pixels>>;

    fn dimensions(&self, pixels: &Self::Pixels) -> (u32, u32);

    fn resize(
        &self,
        pixels: &Self::Pixels,
        width: u32,
        height: u32,
        resampling: Resampling,
    ) -> Self::Pixels;

    /// `quality` is in `0.0..=1.0` and is ignored by lossless formats.
    fn encode(&self, pixels: &Self::Pixels, format: ImageFormat, quality: f32) -> Result<Vec<u8>>;
}

/// [`ImageCodec`] backed by `image` for decoding and JPEG, `oxipng` for PNG and `webp` for
/// lossy WebP.
#[derive(Debug, Clone)]
pub struct ImageRsCodec {
    png_options: Options,
}

impl ImageRsCodec {
    pub fn new(png_effort: u8, timeout: Duration, max_decompressed_size: usize) -> Self {
        let mut options = Options::from_preset(png_effort.min(6));
        options.optimize_alpha = true;
        options.strip = StripChunks::Safe;
        options.interlace = Some(oxipng::Interlacing::None);
        options.timeout = Some(timeout);
        options.max_decompressed_size = Some(max_decompressed_size);

        Self {
            png_options: options,
        }
    }

    fn encode_jpeg(&self, img: &DynamicImage, quality: f32) -> Result<Vec<u8>> {
        let rgb_img = img.to_rgb8();
        let mut buffer = Vec::new();

        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality_percent(quality));
        encoder
            .encode(
                rgb_img.as_raw(),
                rgb_img.width(),
                rgb_img.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| CompressionError::encode(ImageFormat::Jpeg, e))?;

        Ok(buffer)
    }

    fn encode_png(&self, img: &DynamicImage) -> Result<Vec<u8>> {
        // Cheap first pass; oxipng redoes filtering and deflate at the configured effort.
        let mut raw = Vec::new();
        let encoder = PngEncoder::new_with_quality(&mut raw, CompressionType::Fast, PngFilter::NoFilter);
        img.write_with_encoder(encoder)
            .map_err(|e| CompressionError::encode(ImageFormat::Png, e))?;

        optimize_from_memory(&raw, &self.png_options)
            .map_err(|e| CompressionError::encode(ImageFormat::Png, e))
    }

    fn encode_webp(&self, img: &DynamicImage, quality: f32) -> Result<Vec<u8>> {
        let (width, height) = img.dimensions();
        let quality = quality.clamp(0.0, 1.0) * 100.0;

        let memory = if img.color().has_alpha() {
            let rgba = img.to_rgba8();
            webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode(quality)
        } else {
            let rgb = img.to_rgb8();
            webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode(quality)
        };

        Ok(memory.to_vec())
    }
}

impl Default for ImageRsCodec {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(10), 50 * 1024 * 1024)
    }
}

impl ImageCodec for ImageRsCodec {
    type Pixels = DynamicImage;

    fn decode(&self, bytes: &[u8]) -> Result<Decoded<DynamicImage>> {
        let format = image::guess_format(bytes)
            .ok()
            .and_then(ImageFormat::from_image_format);
        let img = image::load_from_memory(bytes).map_err(|e| CompressionError::Decode(e.to_string()))?;
        let (width, height) = img.dimensions();

        Ok(Decoded {
            pixels: img,
            width,
            height,
            format,
        })
    }

    fn dimensions(&self, pixels: &DynamicImage) -> (u32, u32) {
        pixels.dimensions()
    }

    fn resize(
        &self,
        pixels: &DynamicImage,
        width: u32,
        height: u32,
        resampling: Resampling,
    ) -> DynamicImage {
        let filter = match resampling {
            Resampling::Smooth => FilterType::Lanczos3,
            Resampling::Nearest => FilterType::Nearest,
        };
        pixels.resize_exact(width.max(1), height.max(1), filter)
    }

    fn encode(&self, pixels: &DynamicImage, format: ImageFormat, quality: f32) -> Result<Vec<u8>> {
        match format {
            ImageFormat::Jpeg => self.encode_jpeg(pixels, quality),
            ImageFormat::Png => self.encode_png(pixels),
            ImageFormat::WebP => self.encode_webp(pixels, quality),
        }
    }
}

/// Maps `0.0..=1.0` onto the 1-100 scale the encoders take.
pub fn quality_percent(quality: f32) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
}
