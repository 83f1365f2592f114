//! Controller runs against the real image/oxipng/webp codec.

mod common;

use common::{noise_jpeg, noise_png};
use image_compressor_service::codec::Resampling;
use image_compressor_service::utils::detect_media_type;
use image_compressor_service::{
    CompressionRequest, ImageCodec, ImageFormat, ImageRsCodec, Outcome, OutputFormat,
    SizeTargetingController, SourceImage,
};

fn controller() -> SizeTargetingController<ImageRsCodec> {
    SizeTargetingController::new(ImageRsCodec::default())
}

// ---------------------------------------------------------------------------
// Quality mode
// ---------------------------------------------------------------------------

#[test]
fn quality_mode_downscales_into_bounds() {
    let source = SourceImage::new("photo.jpg", noise_jpeg(1000, 600, 95));
    let request = CompressionRequest::quality_percent(80).with_max_bounds(500, 500);

    let result = controller().compress(&source, &request).unwrap();

    assert_eq!((result.width(), result.height()), (500, 300));
    assert_eq!(result.format(), Some(ImageFormat::Jpeg));
    assert_eq!(result.outcome(), Outcome::Encoded);
    assert_eq!(result.file_name(), "photo.jpg");
    assert!(result.compressed_size() < source.len());
    assert_eq!(detect_media_type(result.bytes()), "image/jpeg");
}

#[test]
fn explicit_webp_output_renames_the_file() {
    let source = SourceImage::new("photo.jpg", noise_jpeg(200, 100, 90));
    let request = CompressionRequest::quality_percent(70).with_output_format(OutputFormat::WebP);

    let result = controller().compress(&source, &request).unwrap();

    assert_eq!(result.format(), Some(ImageFormat::WebP));
    assert_eq!(result.file_name(), "photo.webp");
    assert_eq!(detect_media_type(result.bytes()), "image/webp");
}

#[test]
fn nearest_downscale_differs_from_smooth_downscale() {
    let codec = ImageRsCodec::default();
    let decoded = codec.decode(&noise_png(300, 200)).unwrap();

    let smooth = codec.resize(&decoded.pixels, 150, 100, Resampling::Smooth);
    let nearest = codec.resize(&decoded.pixels, 150, 100, Resampling::Nearest);
    let smooth_png = codec.encode(&smooth, ImageFormat::Png, 0.8).unwrap();
    let nearest_png = codec.encode(&nearest, ImageFormat::Png, 0.8).unwrap();

    assert_ne!(smooth_png, nearest_png);
}

// ---------------------------------------------------------------------------
// Target-size mode
// ---------------------------------------------------------------------------

#[test]
fn lossless_target_is_met_by_scaling_down() {
    let source = SourceImage::new("noise.png", noise_png(256, 256));
    let target = 50 * 1024;
    assert!(source.len() > target);

    let result = controller()
        .compress(&source, &CompressionRequest::target_size_kb(50))
        .unwrap();

    assert_eq!(result.outcome(), Outcome::TargetMet);
    assert_eq!(result.format(), Some(ImageFormat::Png));
    assert!(result.compressed_size() <= target);
    assert!(result.width() < 256);
    assert_eq!(result.width(), result.height());
    assert!(result.note().unwrap().contains("% scale"));
}

#[test]
fn unreachable_lossy_target_stops_at_the_quality_floor() {
    let source = SourceImage::new("noise.jpg", noise_jpeg(300, 300, 95));

    let result = controller()
        .compress(&source, &CompressionRequest::target_size_kb(1))
        .unwrap();

    assert_eq!(result.outcome(), Outcome::QualityFloorReached);
    assert_eq!(result.format(), Some(ImageFormat::Jpeg));
    assert_eq!(result.note(), Some("Minimum quality reached (9%)"));
    assert!(result.compressed_size() > 1024);
}

#[test]
fn garbage_input_is_a_decode_error() {
    let source = SourceImage::new("broken.png", b"not an image at all".to_vec());

    let err = controller()
        .compress(&source, &CompressionRequest::default())
        .unwrap_err();

    assert!(matches!(
        err,
        image_compressor_service::CompressionError::Decode(_)
    ));
}
