use crate::format::ImageFormat;
use hyper::StatusCode;

pub type Result<T, E = CompressionError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("invalid target size: {0} bytes (must be greater than zero)")]
    InvalidTarget(i64),

    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("could not encode {format} image: {message}")]
    Encode {
        format: ImageFormat,
        message: String,
    },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("batch cancelled before this image was started")]
    Cancelled,

    #[error("compression task failed: {0}")]
    Task(String),
}

impl CompressionError {
    pub fn encode(format: ImageFormat, err: impl std::fmt::Display) -> Self {
        CompressionError::Encode {
            format,
            message: err.to_string(),
        }
    }
}

/// Errors surfaced by the HTTP layer, each mapped to a status code.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Payload demasiado grande")]
    PayloadTooLarge,

    #[error("Endpoint no encontrado")]
    NotFound,

    #[error("Tiempo de procesamiento agotado")]
    Timeout,

    #[error(transparent)]
    Compression(#[from] CompressionError),

    #[error("Error interno: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Compression(CompressionError::InvalidTarget(_))
            | ApiError::Compression(CompressionError::Decode(_))
            | ApiError::Compression(CompressionError::InvalidOperation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Compression(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_mistakes_map_to_4xx() {
        assert_eq!(
            ApiError::from(CompressionError::InvalidTarget(0)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(CompressionError::Decode("bad header".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::PayloadTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ApiError::Timeout.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn codec_failures_are_server_errors() {
        let err = ApiError::from(CompressionError::encode(ImageFormat::Png, "deflate failed"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "could not encode png image: deflate failed");
    }
}
