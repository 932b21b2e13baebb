//! Run configuration handed to the agent alongside the model config.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RunnerError, RunnerResult};

/// Default step limit, matching the agent CLI's own default.
pub const DEFAULT_MAX_STEPS: u32 = 100;

/// Prompt and message language of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    /// Chinese ("cn").
    #[default]
    #[serde(alias = "zh")]
    Cn,
    /// English ("en").
    En,
}

impl Lang {
    /// Language code understood by the agent CLI.
    pub fn code(self) -> &'static str {
        match self {
            Lang::Cn => "cn",
            Lang::En => "en",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Lang {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cn" | "zh" | "zh-cn" => Ok(Lang::Cn),
            "en" | "en-us" => Ok(Lang::En),
            other => Err(RunnerError::config(format!(
                "unsupported language '{}' (expected cn or en)",
                other
            ))),
        }
    }
}

/// Configuration bounding and tuning one agent invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Maximum number of steps before the agent gives up.
    pub max_steps: u32,
    /// Language code for prompts and messages.
    pub lang: Lang,
    /// Whether the agent should print its reasoning as it goes.
    pub verbose: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            lang: Lang::Cn,
            verbose: true,
        }
    }
}

impl AgentConfig {
    /// Create a new AgentConfig with custom language.
    pub fn with_lang(mut self, lang: Lang) -> Self {
        self.lang = lang;
        self
    }

    /// Create a new AgentConfig with custom max steps.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Create a new AgentConfig with verbose output disabled.
    pub fn quiet(mut self) -> Self {
        self.verbose = false;
        self
    }

    pub fn validate(&self) -> RunnerResult<()> {
        if self.max_steps == 0 {
            return Err(RunnerError::config("max steps must be greater than zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_default() {
        let config = AgentConfig::default();
        assert_eq!(config.max_steps, 100);
        assert_eq!(config.lang, Lang::Cn);
        assert!(config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_agent_config_builder() {
        let config = AgentConfig::default()
            .with_lang(Lang::En)
            .with_max_steps(5)
            .quiet();

        assert_eq!(config.lang, Lang::En);
        assert_eq!(config.max_steps, 5);
        assert!(!config.verbose);
    }

    #[test]
    fn test_zero_steps_rejected() {
        assert!(AgentConfig::default().with_max_steps(0).validate().is_err());
    }

    #[test]
    fn test_lang_parse() {
        assert_eq!("CN".parse::<Lang>().unwrap(), Lang::Cn);
        assert_eq!("zh".parse::<Lang>().unwrap(), Lang::Cn);
        assert_eq!(" en ".parse::<Lang>().unwrap(), Lang::En);
        assert!("fr".parse::<Lang>().is_err());
        assert_eq!(Lang::En.to_string(), "en");
    }

    #[test]
    fn test_lang_serde() {
        assert_eq!(serde_json::to_string(&Lang::En).unwrap(), "\"en\"");
        assert_eq!(serde_json::from_str::<Lang>("\"zh\"").unwrap(), Lang::Cn);
    }
}
