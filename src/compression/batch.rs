use crate::codec::ImageCodec;
use crate::compression::controller::SizeTargetingController;
use crate::compression::request::{CompressionRequest, SourceImage};
use crate::compression::result::CompressionResult;
use crate::error::{CompressionError, Result};
use futures_util::{StreamExt, stream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Maximum number of images compressed at the same time.
    pub concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total as f64
    }
}

/// Compresses every image independently and returns one slot per input, in input order.
///
/// Each run happens on the blocking pool. Failures stay in their own slot. Once `cancel`
/// fires, runs already in flight finish and the rest resolve to
/// [`CompressionError::Cancelled`].
pub async fn compress_all<C, F>(
    controller: Arc<SizeTargetingController<C>>,
    images: Vec<SourceImage>,
    request: CompressionRequest,
    options: BatchOptions,
    cancel: CancellationToken,
    on_progress: F,
) -> Vec<Result<CompressionResult>>
where
    C: ImageCodec + Send + Sync + 'static,
    F: Fn(BatchProgress) + Sync,
{
    let total = images.len();
    let request = Arc::new(request);
    let completed = AtomicUsize::new(0);
    let completed = &completed;
    let on_progress = &on_progress;

    tracing::info!(total, concurrency = options.concurrency, "starting batch");

    stream::iter(images)
        .map(|image| {
            let controller = Arc::clone(&controller);
            let request = Arc::clone(&request);
            let cancel = cancel.clone();

            async move {
                if cancel.is_cancelled() {
                    tracing::debug!(image = image.name(), "batch cancelled, skipping");
                    return Err(CompressionError::Cancelled);
                }

                let name = image.name().to_string();
                let outcome = tokio::task::spawn_blocking(move || controller.compress(&image, &request))
                    .await
                    .unwrap_or_else(|e| Err(CompressionError::Task(e.to_string())));

                if let Err(e) = &outcome {
                    tracing::warn!(image = %name, error = %e, "image failed");
                }

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                on_progress(BatchProgress {
                    completed: done,
                    total,
                });
                outcome
            }
        })
        .buffered(options.concurrency.max(1))
        .collect()
        .await
}
