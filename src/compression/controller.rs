use crate::codec::{ImageCodec, Resampling, quality_percent};
use crate::compression::planner::scaled_dimensions;
use crate::compression::request::{CompressionMethod, CompressionRequest, SourceImage};
use crate::compression::result::{CompressionResult, Outcome, savings_percent};
use crate::error::Result;
use crate::format::{FormatCapability, ImageFormat};
use crate::utils::{change_file_extension, format_file_size};
use std::cell::Cell;
use tracing::{debug, info};

/// Upper bound on encodes in the lossy target-size search.
pub const MAX_TARGET_ATTEMPTS: u32 = 10;
/// Target-size searches always start here, whatever quality the caller asked for.
pub const TARGET_START_QUALITY: f32 = 0.7;
pub const QUALITY_DECAY: f32 = 0.8;
pub const QUALITY_FLOOR: f32 = 0.1;
/// Second JPEG pass when the first one did not shrink the file.
pub const JPEG_FALLBACK_QUALITY: f32 = 0.5;
/// Lossless downscale ladder runs from 10/10 down to this many tenths.
pub const MIN_LOSSLESS_SCALE_TENTHS: u32 = 3;

const AUTO_CONVERT_MIN_ORIGINAL: usize = 1024 * 1024;
const LARGE_LOSSLESS_ORIGINAL: usize = 2 * 1024 * 1024;
const REDUCED_DIMENSION_SCALE: f64 = 0.8;
const SUBSTITUTION_QUALITY_FACTOR: f32 = 0.8;
const ADVISOR_MIN_SAVINGS: f64 = 10.0;
const ADVISOR_HYSTERESIS: f64 = 5.0;

/// Re-encodes one image at a time under a quality setting or a byte budget.
///
/// Every attempt is an explicit step: encode, measure, decide. Unreachable targets end in a
/// best-effort result with a note; only a non-positive budget is rejected, before anything
/// is decoded.
#[derive(Debug, Clone)]
pub struct SizeTargetingController<C> {
    codec: C,
}

impl<C: ImageCodec> SizeTargetingController<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    #[tracing::instrument(skip_all, fields(image = source.name(), original_size = source.len()))]
    pub fn compress(
        &self,
        source: &SourceImage,
        request: &CompressionRequest,
    ) -> Result<CompressionResult> {
        request.validate()?;

        let decoded = self.codec.decode(source.bytes())?;
        let source_dimensions = (decoded.width, decoded.height);
        let dimensions = request.planner().plan(decoded.width, decoded.height);

        let (pixels, source_pixels) = if dimensions == source_dimensions {
            (decoded.pixels, None)
        } else {
            debug!(
                from_width = decoded.width,
                from_height = decoded.height,
                to_width = dimensions.0,
                to_height = dimensions.1,
                "downscaling to planned dimensions"
            );
            let resized = self
                .codec
                .resize(&decoded.pixels, dimensions.0, dimensions.1, Resampling::Smooth);
            (resized, Some(decoded.pixels))
        };

        let run = Run {
            codec: &self.codec,
            source,
            request,
            pixels,
            source_pixels,
            dimensions,
            source_dimensions,
            source_format: decoded.format,
            format: request.output_format.resolve(decoded.format),
            attempts: Cell::new(0),
        };

        let result = match (run.format.capability(), request.method) {
            (FormatCapability::LossyQuality { quality_cap }, CompressionMethod::Quality) => {
                run.lossy_quality(quality_cap)
            }
            (
                FormatCapability::LossyQuality { quality_cap },
                CompressionMethod::TargetSize { max_bytes },
            ) => run.lossy_target(quality_cap, budget(max_bytes)),
            (FormatCapability::LosslessEffort, CompressionMethod::Quality) => {
                if request.output_format.is_original() {
                    run.lossless_with_advisor()
                } else {
                    run.lossless_reencode()
                }
            }
            (FormatCapability::LosslessEffort, CompressionMethod::TargetSize { max_bytes }) => {
                run.lossless_target(budget(max_bytes))
            }
        }?;

        info!(
            attempts = run.attempts.get(),
            media_type = result.media_type(),
            compressed_size = result.compressed_size(),
            savings = result.savings_percent(),
            outcome = ?result.outcome(),
            "compression finished"
        );

        Ok(result)
    }
}

fn budget(max_bytes: i64) -> usize {
    usize::try_from(max_bytes).unwrap_or(usize::MAX)
}

struct Candidate {
    bytes: Vec<u8>,
    format: ImageFormat,
    dimensions: (u32, u32),
}

impl Candidate {
    fn len(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LosslessStrategy {
    Baseline,
    ReducedSmoothing,
    ReducedDimensions,
}

/// State of a single compression run.
struct Run<'a, C: ImageCodec> {
    codec: &'a C,
    source: &'a SourceImage,
    request: &'a CompressionRequest,
    pixels: C::Pixels,
    /// Decoded pixels, kept only when planning downscaled them.
    source_pixels: Option<C::Pixels>,
    dimensions: (u32, u32),
    source_dimensions: (u32, u32),
    source_format: Option<ImageFormat>,
    format: ImageFormat,
    attempts: Cell<u32>,
}

impl<C: ImageCodec> Run<'_, C> {
    fn original_size(&self) -> usize {
        self.source.len()
    }

    fn label(&self) -> String {
        self.format.as_str().to_uppercase()
    }

    fn encode(&self, pixels: &C::Pixels, format: ImageFormat, quality: f32) -> Result<Candidate> {
        let bytes = self.codec.encode(pixels, format, quality)?;
        let dimensions = self.codec.dimensions(pixels);
        let attempt = self.attempts.get() + 1;
        self.attempts.set(attempt);

        debug!(
            attempt,
            %format,
            quality,
            width = dimensions.0,
            height = dimensions.1,
            size = bytes.len(),
            "encode attempt"
        );

        Ok(Candidate {
            bytes,
            format,
            dimensions,
        })
    }

    fn finish(&self, candidate: Candidate, outcome: Outcome, note: Option<String>) -> CompressionResult {
        let file_name = change_file_extension(self.source.name(), candidate.format.extension());
        CompressionResult::new(
            candidate.bytes,
            file_name,
            candidate.format,
            candidate.dimensions,
            self.original_size(),
            outcome,
            note,
        )
    }

    /// Returns the source bytes untouched, whatever format they are in.
    fn keep_original(&self, outcome: Outcome, note: String) -> CompressionResult {
        CompressionResult::kept_original(
            self.source,
            self.source_format,
            self.source_dimensions,
            outcome,
            Some(note),
        )
    }

    fn kept_label(&self) -> String {
        match self.source_format {
            Some(format) => format.as_str().to_uppercase(),
            None => "Original".to_string(),
        }
    }

    fn lossy_quality(&self, quality_cap: f32) -> Result<CompressionResult> {
        let quality = self.request.quality.clamp(0.0, 1.0).min(quality_cap);
        let first = self.encode(&self.pixels, self.format, quality)?;

        if first.len() >= self.original_size() && self.format == ImageFormat::Jpeg {
            debug!(size = first.len(), "first pass did not shrink the file, retrying");
            let retry = self.encode(&self.pixels, self.format, JPEG_FALLBACK_QUALITY)?;
            let note = format!(
                "Re-encoded at {}% quality because the first pass did not reduce size",
                quality_percent(JPEG_FALLBACK_QUALITY)
            );
            return Ok(self.finish(retry, Outcome::Encoded, Some(note)));
        }

        Ok(self.finish(first, Outcome::Encoded, None))
    }

    fn lossy_target(&self, quality_cap: f32, target: usize) -> Result<CompressionResult> {
        let target_label = format_file_size(target);
        let mut quality = TARGET_START_QUALITY.min(quality_cap);
        let mut attempts = 1;
        let mut smallest: Option<Candidate> = None;
        let mut current = self.encode(&self.pixels, self.format, quality)?;

        let (candidate, outcome, note) = loop {
            if current.len() <= target {
                let note = if self.original_size() <= target {
                    format!("Already within {target_label} target; re-encoded without scaling")
                } else {
                    format!("Compressed to target size ({target_label})")
                };
                break (current, Outcome::TargetMet, note);
            }
            if quality <= QUALITY_FLOOR {
                let note = format!("Minimum quality reached ({}%)", quality_percent(quality));
                break (current, Outcome::QualityFloorReached, note);
            }
            if attempts >= MAX_TARGET_ATTEMPTS {
                let best = match smallest {
                    Some(previous) if previous.len() < current.len() => previous,
                    _ => current,
                };
                let note = format!("Best compression achieved (target: {target_label})");
                break (best, Outcome::AttemptsExhausted, note);
            }

            smallest = match smallest.take() {
                Some(previous) if previous.len() <= current.len() => Some(previous),
                _ => Some(current),
            };
            quality *= QUALITY_DECAY;
            current = self.encode(&self.pixels, self.format, quality)?;
            attempts += 1;
        };

        let within_target_already = self.original_size() <= target
            && candidate.len() > self.original_size()
            && self.source_format == Some(self.format);
        if within_target_already {
            let note = format!("Already within {target_label} target; no scaling needed, original kept");
            return Ok(self.keep_original(Outcome::TargetMet, note));
        }

        Ok(self.finish(candidate, outcome, Some(note)))
    }

    /// Measures every lossless strategy and keeps the smallest one that beats the original.
    ///
    /// The reduced-smoothing candidate redraws the decoded source with nearest-neighbour
    /// sampling at the planned size, so it only exists when planning downscaled the image.
    fn lossless_reencode(&self) -> Result<CompressionResult> {
        let (width, height) = self.dimensions;
        let mut candidates = Vec::with_capacity(3);

        candidates.push((
            self.encode(&self.pixels, self.format, self.request.quality)?,
            LosslessStrategy::Baseline,
        ));

        if let Some(source_pixels) = &self.source_pixels {
            let redrawn = self.codec.resize(source_pixels, width, height, Resampling::Nearest);
            candidates.push((
                self.encode(&redrawn, self.format, self.request.quality)?,
                LosslessStrategy::ReducedSmoothing,
            ));
        }

        if self.original_size() > LARGE_LOSSLESS_ORIGINAL {
            let (small_width, small_height) = scaled_dimensions(width, height, REDUCED_DIMENSION_SCALE);
            let smaller = self
                .codec
                .resize(&self.pixels, small_width, small_height, Resampling::Smooth);
            candidates.push((
                self.encode(&smaller, self.format, self.request.quality)?,
                LosslessStrategy::ReducedDimensions,
            ));
        }

        let original_size = self.original_size();
        let best = candidates
            .into_iter()
            .filter(|(candidate, _)| candidate.len() < original_size)
            .min_by_key(|(candidate, _)| candidate.len());

        match best {
            Some((best, strategy)) => {
                debug!(?strategy, size = best.len(), "lossless strategy selected");
                let note = match strategy {
                    LosslessStrategy::ReducedDimensions => format!(
                        "{} optimized with reduced dimensions ({}% scale)",
                        self.label(),
                        (REDUCED_DIMENSION_SCALE * 100.0).round()
                    ),
                    LosslessStrategy::Baseline | LosslessStrategy::ReducedSmoothing => {
                        format!("{} optimized", self.label())
                    }
                };
                Ok(self.finish(best, Outcome::Encoded, Some(note)))
            }
            None => {
                let note = format!(
                    "Original file kept ({} re-encoding would not reduce size)",
                    self.label()
                );
                Ok(self.keep_original(Outcome::OriginalKept, note))
            }
        }
    }

    /// Lossless re-encode, then a JPEG comparison when the lossless result is poor.
    fn lossless_with_advisor(&self) -> Result<CompressionResult> {
        let lossless = self.lossless_reencode()?;
        let original_size = self.original_size();
        let lossless_savings = lossless.savings_percent();

        let should_compare = lossless_savings < ADVISOR_MIN_SAVINGS
            || lossless.compressed_size() >= original_size
            || original_size > AUTO_CONVERT_MIN_ORIGINAL;
        if !should_compare {
            return Ok(lossless);
        }

        let quality = ImageFormat::Jpeg.clamp_quality(self.request.quality);
        let jpeg = self.encode(&self.pixels, ImageFormat::Jpeg, quality)?;
        let jpeg_savings = savings_percent(original_size, jpeg.len());

        if jpeg.len() < lossless.compressed_size() && jpeg_savings > lossless_savings + ADVISOR_HYSTERESIS {
            let note = format!(
                "Auto-converted to JPEG for better compression ({jpeg_savings:.1}% vs {lossless_savings:.1}% as {})",
                self.label()
            );
            return Ok(self.finish(jpeg, Outcome::AutoConverted, Some(note)));
        }

        debug!(jpeg_savings, lossless_savings, "keeping lossless result");
        if lossless.outcome() == Outcome::OriginalKept {
            let note = format!("{} kept (no significant benefit from JPEG conversion)", self.kept_label());
            return Ok(lossless.with_note(note));
        }
        Ok(lossless)
    }

    fn lossless_target(&self, target: usize) -> Result<CompressionResult> {
        let target_label = format_file_size(target);
        let original_size = self.original_size();

        if original_size <= target {
            let result = self.lossless_reencode()?;
            let note = match result.note() {
                Some(detail) => format!("Already within {target_label} target, no scaling needed; {detail}"),
                None => format!("Already within {target_label} target, no scaling needed"),
            };
            return Ok(result.with_note(note));
        }

        let full = self.encode(&self.pixels, self.format, self.request.quality)?;
        if full.len() <= target {
            let note = format!("{} compressed to {target_label} target (100% scale)", self.label());
            return Ok(self.finish(full, Outcome::TargetMet, Some(note)));
        }

        let (width, height) = self.dimensions;
        let mut smallest = (full, 10);
        for tenths in (MIN_LOSSLESS_SCALE_TENTHS..10).rev() {
            let (scaled_width, scaled_height) = scaled_dimensions(width, height, f64::from(tenths) / 10.0);
            let scaled = self
                .codec
                .resize(&self.pixels, scaled_width, scaled_height, Resampling::Smooth);
            let candidate = self.encode(&scaled, self.format, self.request.quality)?;

            if candidate.len() <= target {
                let note = format!(
                    "{} compressed to {target_label} target ({}% scale)",
                    self.label(),
                    tenths * 10
                );
                return Ok(self.finish(candidate, Outcome::TargetMet, Some(note)));
            }
            if candidate.len() < smallest.0.len() {
                smallest = (candidate, tenths);
            }
        }

        if self.request.output_format.is_original() && original_size > AUTO_CONVERT_MIN_ORIGINAL {
            let quality = TARGET_START_QUALITY * SUBSTITUTION_QUALITY_FACTOR;
            let jpeg = self.encode(&self.pixels, ImageFormat::Jpeg, quality)?;
            if jpeg.len() <= target {
                let note = format!("Auto-converted to JPEG to reach {target_label} target");
                return Ok(self.finish(jpeg, Outcome::AutoConverted, Some(note)));
            }
            debug!(size = jpeg.len(), "JPEG substitution missed the target");
        }

        let (best, tenths) = smallest;
        if best.len() < original_size {
            let note = format!(
                "Best {} compression at {}% scale ({target_label} target not achievable)",
                self.label(),
                tenths * 10
            );
            return Ok(self.finish(best, Outcome::TargetUnreachable, Some(note)));
        }

        let note = format!("Original kept ({target_label} target not achievable)");
        Ok(self.keep_original(Outcome::TargetUnreachable, note))
    }
}
