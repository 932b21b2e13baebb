//! Persisted settings for the `phone-task` CLI.
//! Stored as JSON in the platform-specific config directory via `directories::ProjectDirs`,
//! and overlaid with environment variables at startup.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::agent::{
    AgentCommand, AgentConfig, Lang, DEFAULT_LIST_APPS_TIMEOUT_SECS, DEFAULT_MAX_STEPS,
    DEFAULT_TASK_TIMEOUT_SECS,
};
use crate::model::{
    EndpointPreset, ModelConfig, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_SECS, EMPTY_API_KEY,
};

/// Settings persistence errors.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Cannot determine config directory")]
    NoConfigDir,
    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed settings file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings that can be saved and loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Model API base URL
    pub base_url: String,
    /// Model API key
    pub api_key: String,
    /// Model name
    pub model_name: String,
    /// Maximum steps for agent
    pub max_steps: u32,
    /// Language code ("cn" or "en")
    pub lang: Lang,
    /// Whether the agent prints its reasoning
    pub verbose: bool,
    /// Maximum retries for endpoint probes
    pub max_retries: u32,
    /// Retry delay in seconds
    pub retry_delay: u64,
    /// Agent CLI executable
    pub agent_program: String,
    /// Arguments placed before the generated flags
    pub agent_args: Vec<String>,
    /// Working directory of the agent CLI
    pub agent_dir: Option<PathBuf>,
    /// Task timeout in seconds
    pub timeout_secs: u64,
    /// `--list-apps` timeout in seconds
    pub list_apps_timeout_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        let command = AgentCommand::default();
        Self {
            base_url: EndpointPreset::Zhipu.base_url().to_string(),
            api_key: EMPTY_API_KEY.to_string(),
            model_name: EndpointPreset::Zhipu.model_name().to_string(),
            max_steps: DEFAULT_MAX_STEPS,
            lang: Lang::Cn,
            verbose: true,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY_SECS,
            agent_program: command.program,
            agent_args: command.args,
            agent_dir: None,
            timeout_secs: DEFAULT_TASK_TIMEOUT_SECS,
            list_apps_timeout_secs: DEFAULT_LIST_APPS_TIMEOUT_SECS,
        }
    }
}

impl AppSettings {
    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "moderras", "phone-task")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path.
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.json"))
    }

    /// Load settings from the config file, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Load settings from a specific file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut loaded: Self = serde_json::from_str(&content).map_err(|source| SettingsError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        // Backfill fields older files saved as empty or zero
        let defaults = Self::default();
        if loaded.base_url.is_empty() {
            loaded.base_url = defaults.base_url;
        }
        if loaded.model_name.is_empty() {
            loaded.model_name = defaults.model_name;
        }
        if loaded.api_key.is_empty() {
            loaded.api_key = defaults.api_key;
        }
        if loaded.agent_program.is_empty() {
            loaded.agent_program = defaults.agent_program;
        }
        if loaded.timeout_secs == 0 {
            loaded.timeout_secs = defaults.timeout_secs;
        }
        if loaded.list_apps_timeout_secs == 0 {
            loaded.list_apps_timeout_secs = defaults.list_apps_timeout_secs;
        }

        Ok(loaded)
    }

    /// Save settings to the config file, returning where they went.
    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = Self::settings_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save settings to a specific file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(io_err)
    }

    /// Overlay values from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`, which maps variable names to values.
    ///
    /// Unparsable numbers and languages are ignored with a warning.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("MODEL_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = get("MODEL_API_KEY") {
            self.api_key = v;
        }
        if let Some(v) = get("MODEL_NAME") {
            self.model_name = v;
        }
        if let Some(v) = get("AGENT_LANG") {
            match v.parse() {
                Ok(lang) => self.lang = lang,
                Err(e) => tracing::warn!("Ignoring AGENT_LANG: {}", e),
            }
        }
        if let Some(v) = get("AGENT_PROGRAM") {
            self.agent_program = v;
        }
        if let Some(v) = get("AGENT_VERBOSE") {
            self.verbose = v == "1" || v.eq_ignore_ascii_case("true");
        }
        parse_env(&get, "AGENT_MAX_STEPS", &mut self.max_steps);
        parse_env(&get, "AGENT_TIMEOUT_SECS", &mut self.timeout_secs);
        parse_env(&get, "MODEL_MAX_RETRIES", &mut self.max_retries);
        parse_env(&get, "MODEL_RETRY_DELAY", &mut self.retry_delay);
        self
    }

    /// Replace endpoint and model with a preset's.
    pub fn with_preset(mut self, preset: EndpointPreset) -> Self {
        self.base_url = preset.base_url().to_string();
        self.model_name = preset.model_name().to_string();
        self
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig::new(&self.base_url, &self.model_name, &self.api_key)
            .with_max_retries(self.max_retries)
            .with_retry_delay(self.retry_delay)
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            max_steps: self.max_steps,
            lang: self.lang,
            verbose: self.verbose,
        }
    }

    pub fn agent_command(&self) -> AgentCommand {
        let mut command = AgentCommand::new(&self.agent_program)
            .with_args(self.agent_args.iter().cloned())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_list_apps_timeout(Duration::from_secs(self.list_apps_timeout_secs));
        if let Some(dir) = &self.agent_dir {
            command = command.with_working_dir(dir);
        }
        command
    }
}

fn parse_env<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    if let Some(raw) = get(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!("Ignoring {}: '{}' is not a valid number", key, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_target_zhipu() {
        let settings = AppSettings::default();
        assert_eq!(settings.base_url, "https://open.bigmodel.cn/api/paas/v4");
        assert_eq!(settings.model_name, "autoglm-phone");
        assert_eq!(settings.agent_program, "python");
        assert_eq!(settings.agent_args, vec!["main.py".to_string()]);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = AppSettings {
            api_key: "k".into(),
            max_steps: 3,
            lang: Lang::En,
            agent_dir: Some(PathBuf::from("/opt/agent")),
            ..AppSettings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(AppSettings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = AppSettings::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, AppSettings::default());
    }

    #[test]
    fn test_load_backfills_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"base_url": "", "max_steps": 5, "lang": "zh", "timeout_secs": 0}"#)
            .unwrap();
        let loaded = AppSettings::load_from(&path).unwrap();
        assert_eq!(loaded.base_url, EndpointPreset::Zhipu.base_url());
        assert_eq!(loaded.max_steps, 5);
        assert_eq!(loaded.lang, Lang::Cn);
        assert_eq!(loaded.timeout_secs, DEFAULT_TASK_TIMEOUT_SECS);
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            AppSettings::load_from(&path),
            Err(SettingsError::Json { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("MODEL_BASE_URL", "http://10.0.0.2:8000/v1"),
            ("MODEL_API_KEY", "env-key"),
            ("AGENT_LANG", "en"),
            ("AGENT_MAX_STEPS", "7"),
            ("AGENT_TIMEOUT_SECS", "not-a-number"),
            ("MODEL_NAME", ""),
        ]
        .into_iter()
        .collect();

        let settings = AppSettings::default()
            .with_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.base_url, "http://10.0.0.2:8000/v1");
        assert_eq!(settings.api_key, "env-key");
        assert_eq!(settings.lang, Lang::En);
        assert_eq!(settings.max_steps, 7);
        assert_eq!(settings.timeout_secs, DEFAULT_TASK_TIMEOUT_SECS);
        assert_eq!(settings.model_name, "autoglm-phone");
    }

    #[test]
    fn test_builds_configs() {
        let settings = AppSettings {
            max_steps: 3,
            verbose: false,
            timeout_secs: 10,
            agent_dir: Some(PathBuf::from("/opt/agent")),
            ..AppSettings::default()
        }
        .with_preset(EndpointPreset::ModelScope);

        let model = settings.model_config();
        assert_eq!(model.base_url, "https://api-inference.modelscope.cn/v1");
        assert_eq!(model.model_name, "ZhipuAI/AutoGLM-Phone-9B");

        let agent = settings.agent_config();
        assert_eq!(agent.max_steps, 3);
        assert!(!agent.verbose);

        let command = settings.agent_command();
        assert_eq!(command.program, "python");
        assert_eq!(command.timeout, Duration::from_secs(10));
        assert_eq!(command.working_dir, Some(PathBuf::from("/opt/agent")));
    }
}
