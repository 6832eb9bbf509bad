//! API configuration.

use std::path::PathBuf;

use segcut_media::{FolderPolicy, ToolCommand, DEFAULT_DOWNLOAD_FORMAT};
use tracing::warn;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second (per client IP, `/api` routes)
    pub rate_limit_rps: u32,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Directory served under `/downloads`
    pub downloads_dir: PathBuf,
    /// Per-subscriber WebSocket buffer (events)
    pub ws_buffer_size: usize,
    /// Segment job settings
    pub segment: SegmentConfig,
}

/// External tool and folder settings for segment jobs.
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// Downloader launcher
    pub downloader: ToolCommand,
    /// Transcoder launcher
    pub transcoder: ToolCommand,
    /// Downloader format selector
    pub download_format: String,
    /// Handling of destination folders that do not exist yet
    pub folder_policy: FolderPolicy,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            downloader: ToolCommand::new("yt-dlp"),
            transcoder: ToolCommand::new("ffmpeg"),
            download_format: DEFAULT_DOWNLOAD_FORMAT.to_string(),
            folder_policy: FolderPolicy::RequireExisting,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            max_body_size: 64 * 1024, // 64KB
            environment: "development".to_string(),
            downloads_dir: PathBuf::from("downloads"),
            ws_buffer_size: 256,
            segment: SegmentConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT").unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: env_parse("RATE_LIMIT_RPS").unwrap_or(defaults.rate_limit_rps),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            downloads_dir: std::env::var("DOWNLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.downloads_dir),
            ws_buffer_size: env_parse("WS_BUFFER_SIZE").unwrap_or(defaults.ws_buffer_size),
            segment: SegmentConfig::from_env(),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

impl SegmentConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let folder_policy = match std::env::var("FOLDER_POLICY") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("{}, using require-existing", e);
                FolderPolicy::RequireExisting
            }),
            Err(_) => defaults.folder_policy,
        };

        Self {
            downloader: env_tool("DOWNLOADER_CMD").unwrap_or(defaults.downloader),
            transcoder: env_tool("TRANSCODER_CMD").unwrap_or(defaults.transcoder),
            download_format: std::env::var("DOWNLOAD_FORMAT").unwrap_or(defaults.download_format),
            folder_policy,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_tool(key: &str) -> Option<ToolCommand> {
    std::env::var(key).ok().and_then(|s| ToolCommand::parse(&s))
}
