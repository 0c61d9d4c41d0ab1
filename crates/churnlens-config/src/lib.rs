use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CHURNLENS_DIR_NAME: &str = ".churnlens";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const SESSION_DIR_NAME: &str = "session";
pub const DEFAULT_SERVICE_BASE_URL: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;
pub const MIN_POLL_INTERVAL_MS: u64 = 250;
pub const DEFAULT_SESSION_KEY: &str = "churnlens.session";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChurnlensConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub sizemap: SizeMapConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_key")]
    pub key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key: default_session_key(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeMapConfig {
    #[serde(default = "default_outer_padding")]
    pub outer_padding: f64,
    #[serde(default = "default_inner_padding")]
    pub inner_padding: f64,
    #[serde(default = "default_label_min_width")]
    pub label_min_width: f64,
    #[serde(default = "default_label_min_height")]
    pub label_min_height: f64,
    #[serde(default = "default_approx_char_width")]
    pub approx_char_width: f64,
}

impl Default for SizeMapConfig {
    fn default() -> Self {
        Self {
            outer_padding: default_outer_padding(),
            inner_padding: default_inner_padding(),
            label_min_width: default_label_min_width(),
            label_min_height: default_label_min_height(),
            approx_char_width: default_approx_char_width(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("failed to serialize config TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub fn churnlens_dir(workspace_root: impl AsRef<Path>) -> PathBuf {
    workspace_root.as_ref().join(CHURNLENS_DIR_NAME)
}

pub fn config_path(workspace_root: impl AsRef<Path>) -> PathBuf {
    churnlens_dir(workspace_root).join(CONFIG_FILE_NAME)
}

pub fn session_dir(workspace_root: impl AsRef<Path>) -> PathBuf {
    churnlens_dir(workspace_root).join(SESSION_DIR_NAME)
}

pub fn load_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<ChurnlensConfig, ConfigError> {
    let path = config_path(workspace_root);
    if !path.exists() {
        return Ok(ChurnlensConfig::default());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: ChurnlensConfig = toml::from_str(&raw)?;
    Ok(normalize_config(parsed))
}

pub fn ensure_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<ChurnlensConfig, ConfigError> {
    let workspace_root = workspace_root.as_ref();
    fs::create_dir_all(churnlens_dir(workspace_root))?;

    let path = config_path(workspace_root);
    if path.exists() {
        return load_workspace_config(workspace_root);
    }

    let config = ChurnlensConfig::default();
    let content = toml::to_string_pretty(&config)?;
    fs::write(path, content)?;

    Ok(config)
}

pub fn validate_config(config: &ChurnlensConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    let base_url = config.service.base_url.as_str();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        warnings.push(ConfigWarning {
            code: "service_base_url",
            message: format!("service.base_url '{base_url}' is not an http(s) URL"),
        });
    }
    if config.service.request_timeout_ms == 0 {
        warnings.push(ConfigWarning {
            code: "service_timeout",
            message: "service.request_timeout_ms is 0; requests will fail immediately".to_owned(),
        });
    }

    let sizemap = &config.sizemap;
    if sizemap.outer_padding < 0.0 || sizemap.inner_padding < 0.0 {
        warnings.push(ConfigWarning {
            code: "sizemap_padding",
            message: "sizemap padding values must not be negative; treating them as 0".to_owned(),
        });
    }
    if !(sizemap.approx_char_width > 0.0) {
        warnings.push(ConfigWarning {
            code: "sizemap_char_width",
            message: "sizemap.approx_char_width must be positive; labels will be hidden"
                .to_owned(),
        });
    }

    warnings
}

fn default_base_url() -> String {
    DEFAULT_SERVICE_BASE_URL.to_owned()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_session_key() -> String {
    DEFAULT_SESSION_KEY.to_owned()
}

fn default_outer_padding() -> f64 {
    2.0
}

fn default_inner_padding() -> f64 {
    1.0
}

fn default_label_min_width() -> f64 {
    40.0
}

fn default_label_min_height() -> f64 {
    14.0
}

fn default_approx_char_width() -> f64 {
    7.0
}

fn normalize_config(mut config: ChurnlensConfig) -> ChurnlensConfig {
    let base_url = config.service.base_url.trim().trim_end_matches('/');
    config.service.base_url = if base_url.is_empty() {
        default_base_url()
    } else {
        base_url.to_owned()
    };

    config.polling.interval_ms = config.polling.interval_ms.max(MIN_POLL_INTERVAL_MS);

    let key = config.session.key.trim();
    config.session.key = if key.is_empty() {
        default_session_key()
    } else {
        key.to_owned()
    };

    config
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn ensure_workspace_config_creates_default_file() {
        let temp = tempdir().expect("tempdir");
        let workspace = temp.path();

        let config = ensure_workspace_config(workspace).expect("ensure config");

        assert_eq!(config.service.base_url, DEFAULT_SERVICE_BASE_URL);
        assert_eq!(config.polling.interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert!(config_path(workspace).exists());

        let content = fs::read_to_string(config_path(workspace)).expect("read config file");
        assert!(content.contains("[service]"));
        assert!(content.contains("[sizemap]"));
        assert!(content.contains("interval_ms = 3000"));
    }

    #[test]
    fn load_workspace_config_defaults_when_file_missing() {
        let temp = tempdir().expect("tempdir");
        let config = load_workspace_config(temp.path()).expect("load config");
        assert_eq!(config, ChurnlensConfig::default());
    }

    #[test]
    fn load_workspace_config_normalizes_values() {
        let temp = tempdir().expect("tempdir");
        let workspace = temp.path();
        fs::create_dir_all(churnlens_dir(workspace)).expect("create .churnlens");

        let raw = r#"
[service]
base_url = "  https://mining.example.com/api/  "

[polling]
interval_ms = 10

[session]
key = "   "

[sizemap]
inner_padding = 0.5
"#;
        fs::write(config_path(workspace), raw).expect("write config");

        let config = load_workspace_config(workspace).expect("load config");

        assert_eq!(config.service.base_url, "https://mining.example.com/api");
        assert_eq!(config.service.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
        assert_eq!(config.polling.interval_ms, MIN_POLL_INTERVAL_MS);
        assert_eq!(config.session.key, DEFAULT_SESSION_KEY);
        assert_eq!(config.sizemap.inner_padding, 0.5);
        assert_eq!(config.sizemap.outer_padding, 2.0);
    }

    #[test]
    fn validate_config_flags_suspicious_values() {
        let mut config = ChurnlensConfig::default();
        assert!(validate_config(&config).is_empty());

        config.service.base_url = "ftp://example".to_owned();
        config.sizemap.inner_padding = -1.0;
        config.sizemap.approx_char_width = 0.0;

        let codes = validate_config(&config)
            .into_iter()
            .map(|warning| warning.code)
            .collect::<Vec<_>>();
        assert_eq!(
            codes,
            vec!["service_base_url", "sizemap_padding", "sizemap_char_width"]
        );
    }
}
