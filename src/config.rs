use crate::compression::CompressionRequest;
use crate::compression::planner::{DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub compression: CompressionConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct CompressionConfig {
    pub max_image_size: usize,
    /// Files per `/api/compress` request.
    pub max_files: usize,
    /// Files per `/api/batch-process` request.
    pub max_batch_files: usize,
    pub default_quality: u8,
    pub max_width: u32,
    pub max_height: u32,
    /// oxipng preset, 0-6.
    pub png_effort: u8,
    pub batch_concurrency: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or(defaults.server.host),
                port: env_or("PORT", defaults.server.port),
                timeout_seconds: env_or("SERVER_TIMEOUT", defaults.server.timeout_seconds),
            },
            compression: CompressionConfig {
                max_image_size: env_or("MAX_IMAGE_SIZE", defaults.compression.max_image_size),
                max_files: env_or("MAX_FILES", defaults.compression.max_files),
                max_batch_files: env_or("MAX_BATCH_FILES", defaults.compression.max_batch_files),
                default_quality: env_or("DEFAULT_QUALITY", defaults.compression.default_quality)
                    .min(100),
                max_width: env_or("MAX_WIDTH", defaults.compression.max_width),
                max_height: env_or("MAX_HEIGHT", defaults.compression.max_height),
                png_effort: env_or("PNG_EFFORT", defaults.compression.png_effort).min(6),
                batch_concurrency: env_or(
                    "BATCH_CONCURRENCY",
                    defaults.compression.batch_concurrency,
                )
                .max(1),
                timeout_seconds: env_or(
                    "COMPRESSION_TIMEOUT",
                    defaults.compression.timeout_seconds,
                ),
            },
            cors: CorsConfig {
                allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .map(|raw| parse_origins(&raw))
                    .unwrap_or(defaults.cors.allowed_origins),
            },
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn is_running_on_lambda(&self) -> bool {
        env::var("AWS_LAMBDA_RUNTIME_API").is_ok()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                timeout_seconds: 30,
            },
            compression: CompressionConfig {
                max_image_size: 50 * 1024 * 1024, // 50MB
                max_files: 10,
                max_batch_files: 20,
                default_quality: 80,
                max_width: DEFAULT_MAX_WIDTH,
                max_height: DEFAULT_MAX_HEIGHT,
                png_effort: 2,
                batch_concurrency: std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4),
                timeout_seconds: 30,
            },
            cors: CorsConfig {
                allowed_origins: vec!["*".to_string()],
            },
        }
    }
}

impl CompressionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Upper bound for a whole request body: every file at the size limit plus form overhead.
    pub fn max_request_size(&self) -> usize {
        self.max_image_size
            .saturating_mul(self.max_files.max(self.max_batch_files).max(1))
            .saturating_add(1024 * 1024)
    }

    /// Request used when the caller supplies no options.
    pub fn default_request(&self) -> CompressionRequest {
        CompressionRequest::quality_percent(self.default_quality)
            .with_max_bounds(self.max_width, self.max_height)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_split_and_trimmed() {
        assert_eq!(
            parse_origins("http://localhost:3000, https://example.com ,"),
            vec!["http://localhost:3000", "https://example.com"]
        );
    }

    #[test]
    fn default_request_uses_configured_bounds() {
        let mut config = AppConfig::default();
        config.compression.max_width = 800;
        config.compression.default_quality = 65;

        let request = config.compression.default_request();
        assert_eq!(request.max_width, 800);
        assert_eq!(request.max_height, DEFAULT_MAX_HEIGHT);
        assert_eq!(request.quality, 0.65);
    }

    #[test]
    fn request_size_covers_the_larger_file_limit() {
        let mut config = AppConfig::default();
        config.compression.max_image_size = 1000;

        assert_eq!(config.compression.max_batch_files, 20);
        assert_eq!(config.compression.max_request_size(), 20 * 1000 + 1024 * 1024);
    }
}
