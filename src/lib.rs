//! Image compression with optional file-size targets, plus the HTTP service around it.
//!
//! [`SizeTargetingController`] decides dimensions and encoder settings for one image;
//! [`compress_all`] runs many of them concurrently. The `handlers` module exposes the
//! same work over HTTP, locally through hyper or on AWS Lambda.

pub mod codec;
pub mod compression;
pub mod config;
pub mod error;
pub mod format;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

pub use codec::{ImageCodec, ImageRsCodec};
pub use compression::{
    BatchOptions, BatchProgress, CompressionMethod, CompressionRequest, CompressionResult,
    DimensionPlanner, Outcome, SizeTargetingController, SourceImage, compress_all,
};
pub use error::{ApiError, CompressionError};
pub use format::{ImageFormat, OutputFormat};
