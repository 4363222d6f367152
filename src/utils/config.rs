use crate::utils::errors::{Result, SheetTranslatorError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub translation: TranslationDefaults,
    pub storage: StorageConfig,
    pub retention: RetentionConfig,
    pub notify: NotifyConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Base used to build local download links, e.g. `https://host`.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationDefaults {
    pub endpoint: String,
    pub api_key: String,
    pub timeout_seconds: u64,
    pub chunk_size: usize,
    pub chunk_pause_ms: u64,
    pub max_concurrent_jobs: usize,
    pub event_buffer: usize,
    pub source_lang: String,
    pub target_lang: String,
    pub source_column: String,
    pub target_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub bucket: Option<String>,
    pub prefix: String,
    pub url_ttl_hours: u64,
    pub artifact_extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub local_ttl_secs: u64,
    pub local_interval_secs: u64,
    pub remote_ttl_secs: u64,
    pub remote_interval_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub from_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            public_base_url: "http://localhost:8080".to_string(),
        }
    }
}

impl Default for TranslationDefaults {
    fn default() -> Self {
        Self {
            endpoint: "https://translation.googleapis.com/language/translate/v2".to_string(),
            api_key: String::new(),
            timeout_seconds: 30,
            chunk_size: 120,
            chunk_pause_ms: 0,
            max_concurrent_jobs: 4,
            event_buffer: 16,
            source_lang: "auto".to_string(),
            target_lang: "de".to_string(),
            source_column: "source".to_string(),
            target_column: "target".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("uploads"),
            bucket: None,
            prefix: "translated/".to_string(),
            url_ttl_hours: 24,
            artifact_extension: "csv".to_string(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            local_ttl_secs: 60 * 60,
            local_interval_secs: 60 * 60,
            remote_ttl_secs: 24 * 60 * 60,
            remote_interval_secs: 24 * 60 * 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl RetentionConfig {
    pub fn local_ttl(&self) -> Duration {
        Duration::from_secs(self.local_ttl_secs)
    }

    pub fn local_interval(&self) -> Duration {
        Duration::from_secs(self.local_interval_secs)
    }

    pub fn remote_ttl(&self) -> Duration {
        Duration::from_secs(self.remote_ttl_secs)
    }

    pub fn remote_interval(&self) -> Duration {
        Duration::from_secs(self.remote_interval_secs)
    }
}

impl AppConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SheetTranslatorError::ConfigError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| SheetTranslatorError::ConfigError(e.to_string()))
    }

    pub fn load_or_default(path: Option<&str>) -> Self {
        match path {
            Some(p) if std::path::Path::new(p).exists() => match Self::load_from_file(p) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = p, error = %e, "Ignoring unreadable config file");
                    Self::default()
                }
            },
            _ => Self::default(),
        }
    }

    /// File (if present) first, then process environment.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = Self::load_or_default(path);
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TRANSLATE_API_KEY") {
            self.translation.api_key = v;
        }
        if let Some(v) = lookup("TRANSLATE_ENDPOINT") {
            self.translation.endpoint = v;
        }
        if let Some(v) = lookup("CHUNK_SIZE") {
            self.translation.chunk_size = parse_var("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = lookup("CHUNK_PAUSE_MS") {
            self.translation.chunk_pause_ms = parse_var("CHUNK_PAUSE_MS", &v)?;
        }
        if let Some(v) = lookup("EVENT_BUFFER") {
            self.translation.event_buffer = parse_var("EVENT_BUFFER", &v)?;
        }
        if let Some(v) = lookup("MAX_CONCURRENT_JOBS") {
            self.translation.max_concurrent_jobs = parse_var("MAX_CONCURRENT_JOBS", &v)?;
        }
        if let Some(v) = lookup("ARTIFACT_BUCKET") {
            self.storage.bucket = Some(v).filter(|b| !b.is_empty());
        }
        if let Some(v) = lookup("ARTIFACT_PREFIX") {
            self.storage.prefix = v;
        }
        if let Some(v) = lookup("UPLOAD_DIR") {
            self.storage.upload_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("OUTPUT_DIR") {
            self.storage.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("PUBLIC_BASE_URL") {
            self.server.public_base_url = v;
        }
        if let Some(v) = lookup("PORT") {
            self.server.port = parse_var("PORT", &v)?;
        }
        if let Some(v) = lookup("LOCAL_TTL_SECS") {
            self.retention.local_ttl_secs = parse_var("LOCAL_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("LOCAL_SWEEP_INTERVAL_SECS") {
            self.retention.local_interval_secs = parse_var("LOCAL_SWEEP_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = lookup("REMOTE_TTL_SECS") {
            self.retention.remote_ttl_secs = parse_var("REMOTE_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("REMOTE_SWEEP_INTERVAL_SECS") {
            self.retention.remote_interval_secs = parse_var("REMOTE_SWEEP_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = lookup("MAIL_ENDPOINT") {
            self.notify.endpoint = Some(v).filter(|e| !e.is_empty());
        }
        if let Some(v) = lookup("MAIL_API_KEY") {
            self.notify.api_key = Some(v);
        }
        if let Some(v) = lookup("MAIL_FROM") {
            self.notify.from_address = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("LOG_FORMAT") {
            self.logging.format = v;
        }

        if self.translation.chunk_size == 0 {
            return Err(SheetTranslatorError::ConfigError(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.translation.max_concurrent_jobs == 0 {
            return Err(SheetTranslatorError::ConfigError(
                "max_concurrent_jobs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| {
        SheetTranslatorError::ConfigError(format!("{key} has an invalid value: {value:?}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_service_contract() {
        let config = AppConfig::default();
        assert_eq!(config.translation.chunk_size, 120);
        assert_eq!(config.storage.url_ttl_hours, 24);
        assert_eq!(config.retention.local_ttl(), Duration::from_secs(3600));
        assert_eq!(config.retention.remote_interval(), Duration::from_secs(86400));
        assert_eq!(config.translation.target_lang, "de");
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(env(&[
                ("CHUNK_SIZE", "50"),
                ("CHUNK_PAUSE_MS", "250"),
                ("EVENT_BUFFER", "8"),
                ("ARTIFACT_BUCKET", "exports"),
                ("LOCAL_TTL_SECS", "10"),
                ("MAIL_ENDPOINT", "https://mail.local/send"),
            ]))
            .unwrap();

        assert_eq!(config.translation.chunk_size, 50);
        assert_eq!(config.translation.chunk_pause_ms, 250);
        assert_eq!(config.translation.event_buffer, 8);
        assert_eq!(config.storage.bucket.as_deref(), Some("exports"));
        assert_eq!(config.retention.local_ttl_secs, 10);
        assert_eq!(
            config.notify.endpoint.as_deref(),
            Some("https://mail.local/send")
        );
    }

    #[test]
    fn invalid_numeric_override_is_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_overrides(env(&[("CHUNK_SIZE", "lots")]))
            .unwrap_err();
        assert!(matches!(err, SheetTranslatorError::ConfigError(_)));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let mut config = AppConfig::default();
        assert!(config.apply_env_overrides(env(&[("CHUNK_SIZE", "0")])).is_err());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [translation]
            chunk_size = 10

            [storage]
            bucket = "b"
            "#,
        )
        .unwrap();

        assert_eq!(config.translation.chunk_size, 10);
        assert_eq!(config.translation.max_concurrent_jobs, 4);
        assert_eq!(config.storage.bucket.as_deref(), Some("b"));
        assert_eq!(config.server.port, 8080);
    }
}
