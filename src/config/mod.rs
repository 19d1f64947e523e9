//! Application configuration: one YAML file covering both halves (the
//! client store and the server store/listener), loaded once at startup.

use crate::client::connectivity::BackoffPolicy;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiToken {
    pub token: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub client_database: String,
    pub server_database: String,
    pub listen_addr: String,
    pub server_url: String,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,
    #[serde(default = "default_backoff_jitter_ms")]
    pub backoff_jitter_ms: u64,
    #[serde(default = "default_backoff_max_attempts")]
    pub backoff_max_attempts: u32,
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    #[serde(default)]
    pub tokens: Vec<ApiToken>,
    #[serde(default)]
    pub expired_tokens: Vec<String>,
}

fn default_probe_timeout_secs() -> u64 {
    5
}
fn default_backoff_base_ms() -> u64 {
    2_000
}
fn default_backoff_cap_ms() -> u64 {
    60_000
}
fn default_backoff_jitter_ms() -> u64 {
    500
}
fn default_backoff_max_attempts() -> u32 {
    6
}
fn default_sync_interval_secs() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_database: Self::client_database_file().to_string_lossy().to_string(),
            server_database: Self::server_database_file().to_string_lossy().to_string(),
            listen_addr: "127.0.0.1:8080".to_string(),
            server_url: "http://127.0.0.1:8080".to_string(),
            probe_timeout_secs: default_probe_timeout_secs(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            backoff_jitter_ms: default_backoff_jitter_ms(),
            backoff_max_attempts: default_backoff_max_attempts(),
            sync_interval_secs: default_sync_interval_secs(),
            tokens: vec![ApiToken {
                token: "dev-token".to_string(),
                user_id: "dev".to_string(),
            }],
            expired_tokens: Vec::new(),
        }
    }
}

impl Config {
    /// Return the standard configuration directory depending on the platform
    pub fn config_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(appdata).join("worksync")
        } else {
            let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            home.join(".worksync")
        }
    }

    pub fn config_file() -> PathBuf {
        Self::config_dir().join("worksync.conf")
    }

    pub fn client_database_file() -> PathBuf {
        Self::config_dir().join("worksync-client.sqlite")
    }

    pub fn server_database_file() -> PathBuf {
        Self::config_dir().join("worksync-server.sqlite")
    }

    /// Load configuration from file, or return defaults if not found.
    pub fn load() -> Self {
        let path = Self::config_file();
        if path.exists() {
            let content = fs::read_to_string(&path).expect("Failed to read configuration file");
            serde_yaml::from_str(&content).expect("Failed to parse configuration file")
        } else {
            Self::default()
        }
    }

    /// Write the configuration file (creating the directory first).
    pub fn save(&self) -> AppResult<()> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;
        let yaml = serde_yaml::to_string(self).map_err(|_| AppError::ConfigSave)?;
        fs::write(Self::config_file(), yaml)?;
        Ok(())
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            base: Duration::from_millis(self.backoff_base_ms),
            cap: Duration::from_millis(self.backoff_cap_ms),
            jitter: Duration::from_millis(self.backoff_jitter_ms),
            max_attempts: self.backoff_max_attempts,
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }
}
