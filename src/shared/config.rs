use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// What happens to a queue item once it has failed `max_retry` times.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnExhaustedRetries {
    /// Remove the item from the queue; the entity is left FAILED.
    Drop,
    /// Keep the item parked until an explicit retry; the entity is left FAILED.
    #[default]
    MarkFailed,
}

impl OnExhaustedRetries {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "drop" => Some(Self::Drop),
            "mark_failed" | "mark-failed" | "park" => Some(Self::MarkFailed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    pub sync_interval: u64,
    pub max_retry: u32,
    #[serde(default)]
    pub on_exhausted: OnExhaustedRetries,
    pub batch_size: u32,
    #[serde(default)]
    pub organization_id: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/assessment_sync.db?mode=rwc".to_string(),
                max_connections: 5,
                connection_timeout: 30,
            },
            remote: RemoteConfig {
                base_url: "http://localhost:8080/api".to_string(),
                timeout_secs: 30,
            },
            sync: SyncConfig::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: true,
            sync_interval: 300, // 5 minutes
            max_retry: 3,
            on_exhausted: OnExhaustedRetries::MarkFailed,
            batch_size: 100,
            organization_id: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("ASSESSMENT_SYNC_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v.trim().to_string();
            }
        }
        if let Ok(v) = std::env::var("ASSESSMENT_SYNC_DATABASE_MAX_CONNECTIONS") {
            if let Some(value) = parse_u64(&v) {
                cfg.database.max_connections = value as u32;
            }
        }
        if let Ok(v) = std::env::var("ASSESSMENT_SYNC_REMOTE_BASE_URL") {
            cfg.remote.base_url = v.trim().trim_end_matches('/').to_string();
        }
        if let Ok(v) = std::env::var("ASSESSMENT_SYNC_REMOTE_TIMEOUT_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.remote.timeout_secs = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("ASSESSMENT_SYNC_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Ok(v) = std::env::var("ASSESSMENT_SYNC_INTERVAL_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.sync.sync_interval = value;
            }
        }
        if let Ok(v) = std::env::var("ASSESSMENT_SYNC_MAX_RETRY") {
            if let Some(value) = parse_u64(&v) {
                cfg.sync.max_retry = value as u32;
            }
        }
        if let Ok(v) = std::env::var("ASSESSMENT_SYNC_ON_EXHAUSTED") {
            if let Some(policy) = OnExhaustedRetries::parse(&v) {
                cfg.sync.on_exhausted = policy;
            }
        }
        if let Ok(v) = std::env::var("ASSESSMENT_SYNC_BATCH_SIZE") {
            if let Some(value) = parse_u64(&v) {
                cfg.sync.batch_size = value as u32;
            }
        }
        if let Ok(v) = std::env::var("ASSESSMENT_SYNC_ORGANIZATION_ID") {
            let trimmed = v.trim();
            cfg.sync.organization_id = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.database.url.trim().is_empty() {
            return Err("Database url must not be empty".to_string());
        }
        if self.sync.sync_interval == 0 {
            return Err("Sync sync_interval must be greater than 0".to_string());
        }
        if self.sync.max_retry == 0 {
            return Err("Sync max_retry must be greater than 0".to_string());
        }
        if self.sync.batch_size == 0 {
            return Err("Sync batch_size must be greater than 0".to_string());
        }
        if self.sync.auto_sync && self.remote.base_url.trim().is_empty() {
            return Err("Remote base_url is required when auto_sync is enabled".to_string());
        }
        Ok(())
    }
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
