//! Task runner: validate the configs, build the agent, run one task.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::Instrument;
use uuid::Uuid;

use crate::agent::{AgentConfig, AgentFactory};
use crate::config::get_messages;
use crate::error::{RunnerError, RunnerResult};
use crate::model::ModelConfig;

/// Outcome of a successful task run.
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Identifier attached to this run's log lines.
    pub run_id: Uuid,
    /// The task as it was handed to the agent.
    pub task: String,
    /// The agent's final message, never empty.
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl fmt::Display for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Runs tasks through agents produced by a factory.
///
/// # Example
///
/// ```rust,no_run
/// use phone_task_runner::{
///     AgentCommand, AgentConfig, EndpointPreset, ProcessAgentFactory, TaskRunner,
/// };
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let model_config = EndpointPreset::Zhipu.model_config().with_api_key("your-key");
///     let agent_config = AgentConfig::default().with_max_steps(5);
///
///     let runner = TaskRunner::new(ProcessAgentFactory::new(AgentCommand::default()));
///     let result = runner
///         .execute("打开设置查看电量", &model_config, &agent_config, &mut std::io::stdout())
///         .await?;
///
///     println!("Task result: {}", result);
///     Ok(())
/// }
/// ```
pub struct TaskRunner<F> {
    factory: F,
}

impl<F: AgentFactory> TaskRunner<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    /// Run `task` to completion, writing the agent's output into `out`.
    ///
    /// The task and both configs are validated before the agent is built.
    /// Failures are logged and returned unchanged; nothing is retried.
    pub async fn execute(
        &self,
        task: &str,
        model_config: &ModelConfig,
        agent_config: &AgentConfig,
        out: &mut (dyn Write + Send),
    ) -> RunnerResult<TaskResult> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("task", %run_id);

        let result = self
            .execute_inner(run_id, task, model_config, agent_config, out)
            .instrument(span.clone())
            .await;

        if let Err(e) = &result {
            span.in_scope(|| {
                tracing::error!(kind = e.kind().as_str(), "Task execution failed: {}", e);
            });
        }
        result
    }

    /// Run `task` with its output captured in the file at `path`.
    ///
    /// Input is validated before the file is touched, so a rejected call
    /// leaves an earlier run's output in place. Otherwise the file is created
    /// (or truncated) before the run and flushed and closed afterwards whether
    /// or not the run succeeded.
    pub async fn execute_to_file(
        &self,
        task: &str,
        model_config: &ModelConfig,
        agent_config: &AgentConfig,
        path: &Path,
    ) -> RunnerResult<TaskResult> {
        if let Err(e) = check_input(task, model_config, agent_config) {
            tracing::error!(kind = e.kind().as_str(), "Task execution failed: {}", e);
            return Err(e);
        }

        let file = File::create(path).map_err(|e| {
            RunnerError::config(format!("cannot open output file {}: {}", path.display(), e))
        })?;
        let mut sink = BufWriter::new(file);

        let result = self.execute(task, model_config, agent_config, &mut sink).await;
        let flushed = sink.flush();
        drop(sink);

        let result = result?;
        flushed?;
        tracing::debug!(path = %path.display(), "agent output written");
        Ok(result)
    }

    async fn execute_inner(
        &self,
        run_id: Uuid,
        task: &str,
        model_config: &ModelConfig,
        agent_config: &AgentConfig,
        out: &mut (dyn Write + Send),
    ) -> RunnerResult<TaskResult> {
        let (task, model_config) = check_input(task, model_config, agent_config)?;

        tracing::info!(
            task,
            model = %model_config.model_name,
            max_steps = agent_config.max_steps,
            lang = %agent_config.lang,
            "starting task"
        );

        let started_at = Utc::now();
        let started = Instant::now();
        let mut agent = self.factory.build(&model_config, agent_config)?;
        let message = agent.run(task, out).await?;
        let elapsed = started.elapsed();

        let message = if message.trim().is_empty() {
            get_messages(agent_config.lang).task_completed.to_string()
        } else {
            message
        };
        tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "task finished");

        Ok(TaskResult {
            run_id,
            task: task.to_string(),
            message,
            started_at,
            elapsed,
        })
    }
}

/// Trimmed task and validated model config, or the `Config` error that
/// rejects them.
fn check_input<'a>(
    task: &'a str,
    model_config: &ModelConfig,
    agent_config: &AgentConfig,
) -> RunnerResult<(&'a str, ModelConfig)> {
    let task = task.trim();
    if task.is_empty() {
        return Err(RunnerError::config("task must not be empty"));
    }
    let model_config = model_config.clone().validated()?;
    agent_config.validate()?;
    Ok((task, model_config))
}

/// Banner describing a run, written to stderr before the task starts.
///
/// Names the endpoint exactly once and never shows the full API key. A valid
/// config is shown normalized, as the agent will receive it.
pub fn diagnostics(model_config: &ModelConfig, agent_config: &AgentConfig) -> String {
    let normalized = model_config.clone().validated();
    let model_config = normalized.as_ref().unwrap_or(model_config);
    let rule = "=".repeat(48);
    format!(
        "🤖 Phone Task Runner\n{rule}\nEndpoint: {}\nModel: {}\nAPI key: {}\nMax steps: {}\nLanguage: {}\nVerbose: {}\n{rule}",
        model_config.base_url,
        model_config.model_name,
        model_config.redacted_key(),
        agent_config.max_steps,
        agent_config.lang,
        agent_config.verbose,
    )
}
