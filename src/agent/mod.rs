//! Agent configuration, contract and the process-backed agent.

mod config;
mod phone_agent;
mod process;

pub use config::{AgentConfig, Lang, DEFAULT_MAX_STEPS};
pub use phone_agent::{AgentFactory, PhoneAgent};
pub use process::{
    AgentCommand, CommandOutput, ProcessAgent, ProcessAgentFactory, DEFAULT_LIST_APPS_TIMEOUT_SECS,
    DEFAULT_TASK_TIMEOUT_SECS,
};
