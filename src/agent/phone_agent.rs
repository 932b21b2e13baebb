//! The opaque agent contract the task runner drives.

use std::io::Write;

use async_trait::async_trait;

use super::AgentConfig;
use crate::error::RunnerResult;
use crate::model::ModelConfig;

/// An agent that carries out a natural-language task on a phone.
///
/// How the agent reasons, how many steps it takes and what it does on the
/// device are its own business. The runner only hands it a task and a sink
/// for human-readable output, and waits for the final message.
///
/// # Example
///
/// ```rust,no_run
/// use std::io::Write;
/// use phone_task_runner::{PhoneAgent, RunnerResult};
///
/// struct Echo;
///
/// #[async_trait::async_trait]
/// impl PhoneAgent for Echo {
///     async fn run(&mut self, task: &str, out: &mut (dyn Write + Send)) -> RunnerResult<String> {
///         writeln!(out, "pretending to do: {}", task)?;
///         Ok(format!("did {}", task))
///     }
/// }
/// ```
#[async_trait]
pub trait PhoneAgent: Send {
    /// Run the task to completion and return the agent's final message.
    ///
    /// An empty message means the agent finished without saying anything.
    async fn run(&mut self, task: &str, out: &mut (dyn Write + Send)) -> RunnerResult<String>;
}

/// Builds an agent from the model and run configurations.
pub trait AgentFactory: Send + Sync {
    fn build(
        &self,
        model_config: &ModelConfig,
        agent_config: &AgentConfig,
    ) -> RunnerResult<Box<dyn PhoneAgent>>;
}

impl<F> AgentFactory for F
where
    F: Fn(&ModelConfig, &AgentConfig) -> RunnerResult<Box<dyn PhoneAgent>> + Send + Sync,
{
    fn build(
        &self,
        model_config: &ModelConfig,
        agent_config: &AgentConfig,
    ) -> RunnerResult<Box<dyn PhoneAgent>> {
        self(model_config, agent_config)
    }
}
