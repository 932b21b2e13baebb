//! Model access configuration and well-known endpoint presets.

use std::fmt;
use std::str::FromStr;

use reqwest::Url;

use crate::error::{RunnerError, RunnerResult};

/// Default number of retry attempts for endpoint probes.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay between probe retry attempts in seconds.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 2;

/// Placeholder key accepted by unauthenticated local inference servers.
pub const EMPTY_API_KEY: &str = "EMPTY";

/// Configuration identifying the inference endpoint, model and credential.
///
/// The API key is never printed by `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub base_url: String,
    pub model_name: String,
    pub api_key: String,
    /// Maximum number of retry attempts for endpoint probes.
    pub max_retries: u32,
    /// Delay between probe retry attempts in seconds.
    pub retry_delay_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        EndpointPreset::Local.model_config()
    }
}

impl ModelConfig {
    /// Create a config from the three required fields.
    pub fn new(
        base_url: impl Into<String>,
        model_name: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model_name: model_name.into(),
            api_key: api_key.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
        }
    }

    /// Create a new ModelConfig with custom base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Create a new ModelConfig with custom API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Create a new ModelConfig with custom model name.
    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    /// Set the maximum number of retry attempts for endpoint probes.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay between probe retry attempts in seconds.
    pub fn with_retry_delay(mut self, delay_secs: u64) -> Self {
        self.retry_delay_secs = delay_secs;
        self
    }

    /// Check every field and normalize the base URL.
    ///
    /// Returns the validated config with any trailing `/` removed from
    /// `base_url`, so that `{base_url}/models` never doubles the slash.
    pub fn validated(mut self) -> RunnerResult<Self> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(RunnerError::config("base URL must not be empty"));
        }
        let url = Url::parse(trimmed)
            .map_err(|e| RunnerError::config(format!("invalid base URL '{}': {}", trimmed, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(RunnerError::config(format!(
                "base URL must use http or https, got '{}'",
                url.scheme()
            )));
        }
        self.base_url = trimmed.to_string();

        if self.model_name.trim().is_empty() {
            return Err(RunnerError::config("model name must not be empty"));
        }
        if self.api_key.trim().is_empty() {
            return Err(RunnerError::config(format!(
                "API key must not be empty (use '{}' for servers without auth)",
                EMPTY_API_KEY
            )));
        }
        Ok(self)
    }

    /// The API key with everything but the last four characters masked.
    pub fn redacted_key(&self) -> String {
        if self.api_key == EMPTY_API_KEY {
            return EMPTY_API_KEY.to_string();
        }
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{}", tail)
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .field("api_key", &self.redacted_key())
            .field("max_retries", &self.max_retries)
            .field("retry_delay_secs", &self.retry_delay_secs)
            .finish()
    }
}

impl fmt::Display for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.model_name, self.base_url)
    }
}

/// Hosted and local endpoints the AutoGLM phone model is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointPreset {
    /// Zhipu BigModel open platform.
    Zhipu,
    /// ModelScope inference API.
    ModelScope,
    /// Self-hosted OpenAI-compatible server (vLLM, SGLang).
    Local,
}

impl EndpointPreset {
    pub const ALL: [EndpointPreset; 3] = [
        EndpointPreset::Zhipu,
        EndpointPreset::ModelScope,
        EndpointPreset::Local,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EndpointPreset::Zhipu => "zhipu",
            EndpointPreset::ModelScope => "modelscope",
            EndpointPreset::Local => "local",
        }
    }

    pub fn base_url(self) -> &'static str {
        match self {
            EndpointPreset::Zhipu => "https://open.bigmodel.cn/api/paas/v4",
            EndpointPreset::ModelScope => "https://api-inference.modelscope.cn/v1",
            EndpointPreset::Local => "http://localhost:8000/v1",
        }
    }

    pub fn model_name(self) -> &'static str {
        match self {
            EndpointPreset::Zhipu => "autoglm-phone",
            EndpointPreset::ModelScope => "ZhipuAI/AutoGLM-Phone-9B",
            EndpointPreset::Local => "autoglm-phone-9b",
        }
    }

    /// Model config for this preset with the placeholder API key.
    pub fn model_config(self) -> ModelConfig {
        ModelConfig::new(self.base_url(), self.model_name(), EMPTY_API_KEY)
    }
}

impl fmt::Display for EndpointPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EndpointPreset {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zhipu" | "bigmodel" => Ok(EndpointPreset::Zhipu),
            "modelscope" => Ok(EndpointPreset::ModelScope),
            "local" | "vllm" => Ok(EndpointPreset::Local),
            other => Err(RunnerError::config(format!(
                "unknown provider '{}' (expected zhipu, modelscope or local)",
                other
            ))),
        }
    }
}
