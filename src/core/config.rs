//! Configuration management for reqflow.
//!
//! Handles loading configuration from TOML files and the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{TimeoutPolicy, DEFAULT_BASE_URL};
use crate::workflow::{OutputFormat, PushOptions, DEFAULT_WORK_ITEM_TYPE};

/// Environment variable overriding `backend.base_url`.
pub const BASE_URL_ENV: &str = "REQFLOW_BASE_URL";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend service settings
    pub backend: BackendConfig,

    /// Per-operation timeouts
    pub timeouts: TimeoutsConfig,

    /// Download settings
    pub output: OutputConfig,

    /// Issue tracker push defaults
    pub tracker: TrackerConfig,

    /// Assistant settings
    pub chat: ChatConfig,
}

/// Backend service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// API base address
    pub base_url: String,
}

/// Per-operation timeouts in seconds.
///
/// Operations without an explicit value use `default_secs`, except generation
/// which has its own longer default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub default_secs: u64,
    pub generate_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_secs: Option<u64>,
}

/// Download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory downloads are saved to (`~` is expanded)
    pub download_dir: String,

    /// Default output format (docx, pdf)
    pub format: OutputFormat,
}

/// Issue tracker push defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Work item type to create
    pub work_item_type: String,

    /// Tracker project, overriding the service default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    /// Area path for created items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_path: Option<String>,

    /// Iteration path for created items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration_path: Option<String>,
}

/// Assistant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Ground answers in uploaded documents
    pub use_rag: bool,

    /// Send earlier messages as conversation context
    pub include_history: bool,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.reqflow.toml` in current directory
    /// 2. `~/.config/reqflow/config.toml`
    /// 3. Falls back to defaults
    ///
    /// `REQFLOW_BASE_URL` overrides the base URL from any of these.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env();
        Ok(config)
    }

    fn load_file() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(".reqflow.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(global_config) = Self::config_path() {
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Apply environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                tracing::debug!(base_url = %url, "Base URL overridden from environment");
                self.backend.base_url = url;
            }
        }
    }

    /// Save configuration to the global config file.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("reqflow"))
    }

    /// Get the global config file path.
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Get the data directory path (for the saved session).
    pub fn data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("reqflow"))
    }

    /// Download directory with `~` and environment variables expanded.
    pub fn download_dir(&self) -> PathBuf {
        let expanded = shellexpand::full(&self.output.download_dir)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| self.output.download_dir.clone());
        PathBuf::from(expanded)
    }

    /// Push defaults from the tracker section.
    pub fn push_options(&self) -> PushOptions {
        PushOptions {
            work_item_type: self.tracker.work_item_type.clone(),
            project_name: self.tracker.project_name.clone(),
            area_path: self.tracker.area_path.clone(),
            iteration_path: self.tracker.iteration_path.clone(),
        }
    }
}

impl TimeoutsConfig {
    /// Resolve into the transport's timeout table.
    pub fn policy(&self) -> TimeoutPolicy {
        let secs = |value: Option<u64>| Duration::from_secs(value.unwrap_or(self.default_secs));
        TimeoutPolicy {
            upload: secs(self.upload_secs),
            generate: Duration::from_secs(self.generate_secs),
            download: secs(self.download_secs),
            chat: secs(self.chat_secs),
            push: secs(self.push_secs),
            health: secs(None),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_string() }
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            default_secs: 300,
            generate_secs: 900,
            upload_secs: None,
            download_secs: None,
            chat_secs: None,
            push_secs: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { download_dir: ".".to_string(), format: OutputFormat::Docx }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            work_item_type: DEFAULT_WORK_ITEM_TYPE.to_string(),
            project_name: None,
            area_path: None,
            iteration_path: None,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { use_rag: true, include_history: false }
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::client::Operation;

    #[test]
    #[serial]
    fn test_base_url_env_override() {
        std::env::set_var(BASE_URL_ENV, "http://localhost:9000/api/v1");
        let mut config = Config::default();
        config.apply_env();
        std::env::remove_var(BASE_URL_ENV);

        assert_eq!(config.backend.base_url, "http://localhost:9000/api/v1");
    }

    #[test]
    #[serial]
    fn test_blank_env_is_ignored() {
        std::env::set_var(BASE_URL_ENV, "  ");
        let mut config = Config::default();
        config.apply_env();
        std::env::remove_var(BASE_URL_ENV);

        assert_eq!(config.backend.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend.base_url, "http://127.0.0.1:8000/api/v1");
        assert_eq!(config.output.format, OutputFormat::Docx);
        assert_eq!(config.tracker.work_item_type, "User Story");
        assert!(config.chat.use_rag);
        assert!(!config.chat.include_history);
    }

    #[test]
    fn test_default_timeouts_match_transport() {
        assert_eq!(TimeoutsConfig::default().policy(), TimeoutPolicy::default());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[backend]"));
        assert!(toml_str.contains("[timeouts]"));
        assert!(toml_str.contains("format = \"docx\""));
        assert!(!toml_str.contains("project_name"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [backend]
            base_url = "http://genai.internal:8000/api/v1"

            [timeouts]
            default_secs = 60
            chat_secs = 120

            [output]
            format = "pdf"

            [tracker]
            work_item_type = "Feature"
            area_path = "Shop\\Checkout"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend.base_url, "http://genai.internal:8000/api/v1");
        assert_eq!(config.output.format, OutputFormat::Pdf);
        assert_eq!(config.output.download_dir, ".");

        let policy = config.timeouts.policy();
        assert_eq!(policy.for_operation(Operation::Upload), Duration::from_secs(60));
        assert_eq!(policy.for_operation(Operation::Chat), Duration::from_secs(120));
        assert_eq!(policy.for_operation(Operation::Generate), Duration::from_secs(900));

        let options = config.push_options();
        assert_eq!(options.work_item_type, "Feature");
        assert_eq!(options.area_path.as_deref(), Some("Shop\\Checkout"));
        assert!(options.project_name.is_none());
    }

    #[test]
    fn test_invalid_format_is_rejected() {
        let result: Result<Config, _> = toml::from_str("[output]\nformat = \"odt\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[chat]\nuse_rag = false\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert!(!config.chat.use_rag);
        assert_eq!(config.timeouts.generate_secs, 900);
    }
}
