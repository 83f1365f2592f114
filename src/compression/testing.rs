//! Recording codec for controller and batch tests.

use crate::codec::{Decoded, ImageCodec, Resampling};
use crate::compression::request::SourceImage;
use crate::error::{CompressionError, Result};
use crate::format::ImageFormat;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FakePixels {
    pub width: u32,
    pub height: u32,
    /// Filter of the last redraw; `None` for decoded pixels.
    pub resampling: Option<Resampling>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EncodeCall {
    pub format: ImageFormat,
    pub quality: f32,
    pub width: u32,
    pub height: u32,
    pub resampling: Option<Resampling>,
}

/// Sizes are deterministic: lossy output is `pixels * lossy_bpp * quality + 100` bytes and
/// lossless output is `pixels * lossless_bpp` bytes. Sources starting with `CORRUPT` fail
/// to decode.
#[derive(Debug)]
pub(crate) struct FakeCodec {
    width: u32,
    height: u32,
    format: Option<ImageFormat>,
    lossy_bytes_per_pixel: f64,
    lossless_bytes_per_pixel: f64,
    calls: Mutex<Vec<EncodeCall>>,
    decodes: AtomicUsize,
}

impl FakeCodec {
    pub fn new(width: u32, height: u32, format: Option<ImageFormat>) -> Self {
        Self {
            width,
            height,
            format,
            lossy_bytes_per_pixel: 1.0,
            lossless_bytes_per_pixel: 1.0,
            calls: Mutex::new(Vec::new()),
            decodes: AtomicUsize::new(0),
        }
    }

    pub fn jpeg(width: u32, height: u32) -> Self {
        Self::new(width, height, Some(ImageFormat::Jpeg))
    }

    pub fn png(width: u32, height: u32) -> Self {
        Self::new(width, height, Some(ImageFormat::Png))
    }

    pub fn with_lossy_bytes_per_pixel(mut self, bytes_per_pixel: f64) -> Self {
        self.lossy_bytes_per_pixel = bytes_per_pixel;
        self
    }

    pub fn with_lossless_bytes_per_pixel(mut self, bytes_per_pixel: f64) -> Self {
        self.lossless_bytes_per_pixel = bytes_per_pixel;
        self
    }

    pub fn calls(&self) -> Vec<EncodeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn decodes(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }
}

impl ImageCodec for FakeCodec {
    type Pixels = FakePixels;

    fn decode(&self, bytes: &[u8]) -> Result<Decoded<FakePixels>> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        if bytes.starts_with(b"CORRUPT") {
            return Err(CompressionError::Decode("corrupt test image".to_string()));
        }
        Ok(Decoded {
            pixels: FakePixels {
                width: self.width,
                height: self.height,
                resampling: None,
            },
            width: self.width,
            height: self.height,
            format: self.format,
        })
    }

    fn dimensions(&self, pixels: &FakePixels) -> (u32, u32) {
        (pixels.width, pixels.height)
    }

    fn resize(&self, _pixels: &FakePixels, width: u32, height: u32, resampling: Resampling) -> FakePixels {
        FakePixels {
            width,
            height,
            resampling: Some(resampling),
        }
    }

    fn encode(&self, pixels: &FakePixels, format: ImageFormat, quality: f32) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(EncodeCall {
            format,
            quality,
            width: pixels.width,
            height: pixels.height,
            resampling: pixels.resampling,
        });

        let area = f64::from(pixels.width) * f64::from(pixels.height);
        let len = if format.is_lossless() {
            (area * self.lossless_bytes_per_pixel).round() as usize
        } else {
            (area * self.lossy_bytes_per_pixel * f64::from(quality)).round() as usize + 100
        };
        Ok(vec![0; len])
    }
}

pub(crate) fn source_of_len(name: &str, len: usize) -> SourceImage {
    SourceImage::new(name, vec![0; len])
}
