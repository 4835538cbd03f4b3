//! Configuration management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 9074;

/// Default shutdown drain timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Default directory for stored response documents.
pub const DEFAULT_DATA_DIR: &str = "responses";

/// Default directory for the static survey front-end.
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Default route for the CSV export.
pub const DEFAULT_EXPORT_PATH: &str = "/export/responses.csv";

/// Default acknowledgment text returned after a successful submission.
pub const DEFAULT_ACK_MESSAGE: &str =
    "Thank you for completing the survey. Your response has been recorded.";

/// Default sendmail-compatible binary used for notifications.
pub const DEFAULT_SENDMAIL_PATH: &str = "/usr/sbin/sendmail";

/// Default capacity of the notification queue.
pub const DEFAULT_NOTIFY_QUEUE_CAPACITY: usize = 64;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub export: ExportConfig,
    pub notify: NotifyConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
    /// Body of the 200 response after a successful submission
    pub ack_message: String,
}

/// Storage layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the response store, created at startup if absent
    pub data_dir: PathBuf,
    /// Directory served as the static survey front-end
    pub static_dir: PathBuf,
}

/// CSV export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Route path the export is served on; must start with `/`
    pub path: String,
}

/// Mail notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub enabled: bool,
    pub from: String,
    pub to: String,
    pub sendmail_path: PathBuf,
    pub queue_capacity: usize,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("SURVEY_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: std::env::var("SURVEY_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: std::env::var("SURVEY_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
                ack_message: std::env::var("SURVEY_ACK_MESSAGE")
                    .unwrap_or_else(|_| DEFAULT_ACK_MESSAGE.to_string()),
            },
            storage: StorageConfig {
                data_dir: std::env::var("SURVEY_DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR)),
                static_dir: std::env::var("SURVEY_STATIC_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATIC_DIR)),
            },
            export: ExportConfig {
                path: std::env::var("SURVEY_EXPORT_PATH")
                    .unwrap_or_else(|_| DEFAULT_EXPORT_PATH.to_string()),
            },
            notify: NotifyConfig {
                enabled: std::env::var("SURVEY_NOTIFY_ENABLED")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(false),
                from: std::env::var("SURVEY_NOTIFY_FROM").unwrap_or_default(),
                to: std::env::var("SURVEY_NOTIFY_TO").unwrap_or_default(),
                sendmail_path: std::env::var("SURVEY_SENDMAIL_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_SENDMAIL_PATH)),
                queue_capacity: std::env::var("SURVEY_NOTIFY_QUEUE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_NOTIFY_QUEUE_CAPACITY),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.storage.data_dir.as_os_str().is_empty() {
            anyhow::bail!("Data directory cannot be empty");
        }

        if !self.export.path.starts_with('/') {
            anyhow::bail!(
                "Export path must start with '/' (got '{}')",
                self.export.path
            );
        }

        if self.export.path == "/submit" {
            anyhow::bail!("Export path cannot shadow the submission endpoint");
        }

        if self.notify.enabled {
            if self.notify.from.is_empty() || self.notify.to.is_empty() {
                anyhow::bail!("Notification from/to addresses are required when notify is enabled");
            }
            if self.notify.queue_capacity == 0 {
                anyhow::bail!("Notification queue capacity must be greater than 0");
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ack_message: DEFAULT_ACK_MESSAGE.to_string(),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from(DEFAULT_DATA_DIR),
                static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            },
            export: ExportConfig {
                path: DEFAULT_EXPORT_PATH.to_string(),
            },
            notify: NotifyConfig {
                enabled: false,
                from: String::new(),
                to: String::new(),
                sendmail_path: PathBuf::from(DEFAULT_SENDMAIL_PATH),
                queue_capacity: DEFAULT_NOTIFY_QUEUE_CAPACITY,
            },
        }
    }
}
