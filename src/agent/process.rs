//! Agent backed by an external agent CLI running as a child process.
//!
//! The child is invoked as
//! `<program> [args..] --base-url URL --model NAME --apikey KEY --max-steps N --lang L [--quiet] TASK`.
//! Both its stdout and stderr are streamed into the caller's sink, and the tail
//! of stderr is kept for error reporting. Output encoding is declared on the child's environment
//! instead of re-wrapping any stream of this process.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, timeout_at, Instant};

use super::{AgentConfig, AgentFactory, PhoneAgent};
use crate::error::{RunnerError, RunnerResult};
use crate::model::ModelConfig;

/// Default wall-clock limit for a task run, in seconds.
pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 120;

/// Default wall-clock limit for `--list-apps`, in seconds.
pub const DEFAULT_LIST_APPS_TIMEOUT_SECS: u64 = 30;

/// Environment declaring the child's output encoding.
const ENCODING_ENV: (&str, &str) = ("PYTHONIOENCODING", "utf-8");

/// Number of trailing stderr lines kept for error classification.
const STDERR_TAIL_LINES: usize = 20;

/// HTTP status mentioned by OpenAI-style client errors ("Error code: 401").
static HTTP_STATUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:error code|status code|status|http)\W{0,3}([45]\d\d)\b")
        .expect("valid status regex")
});

static AUTH_FAILURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(unauthori[sz]ed|forbidden|invalid[ _-]?api[ _-]?key|authentication (?:failed|error)|permission denied for model)")
        .expect("valid auth regex")
});

static NETWORK_FAILURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(connection ?(?:refused|reset|error|aborted)|failed to establish|name or service not known|nodename nor servname|getaddrinfo|network is unreachable|max retries exceeded|\btimed? ?out\b)")
        .expect("valid network regex")
});

/// How to launch the external agent CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCommand {
    /// Executable to run.
    pub program: String,
    /// Arguments placed before the generated flags (e.g. the script path).
    pub args: Vec<String>,
    /// Working directory of the child, if different from ours.
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables for the child.
    pub env: Vec<(String, String)>,
    /// Wall-clock limit for a task run.
    pub timeout: Duration,
    /// Wall-clock limit for `--list-apps`.
    pub list_apps_timeout: Duration,
}

impl Default for AgentCommand {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: vec!["main.py".to_string()],
            working_dir: None,
            env: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TASK_TIMEOUT_SECS),
            list_apps_timeout: Duration::from_secs(DEFAULT_LIST_APPS_TIMEOUT_SECS),
        }
    }
}

impl AgentCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            ..Self::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_list_apps_timeout(mut self, timeout: Duration) -> Self {
        self.list_apps_timeout = timeout;
        self
    }

    /// A command for the program and its fixed args, with piped output.
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env(ENCODING_ENV.0, ENCODING_ENV.1)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn spawn_error(&self, err: io::Error) -> RunnerError {
        match err.kind() {
            io::ErrorKind::NotFound => {
                RunnerError::config(format!("agent program '{}' not found", self.program))
            }
            io::ErrorKind::PermissionDenied => RunnerError::config(format!(
                "agent program '{}' is not executable",
                self.program
            )),
            _ => RunnerError::Io(err),
        }
    }
}

/// Captured result of a short-lived child invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, or `None` if the child was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Agent that delegates every task to the external agent CLI.
pub struct ProcessAgent {
    command: AgentCommand,
    model_config: ModelConfig,
    agent_config: AgentConfig,
}

impl ProcessAgent {
    pub fn new(command: AgentCommand, model_config: ModelConfig, agent_config: AgentConfig) -> Self {
        Self {
            command,
            model_config,
            agent_config,
        }
    }

    /// Flags and positional task passed after the command's fixed args.
    pub fn task_args(&self, task: &str) -> Vec<String> {
        let mut args = vec![
            "--base-url".to_string(),
            self.model_config.base_url.clone(),
            "--model".to_string(),
            self.model_config.model_name.clone(),
            "--apikey".to_string(),
            self.model_config.api_key.clone(),
            "--max-steps".to_string(),
            self.agent_config.max_steps.to_string(),
            "--lang".to_string(),
            self.agent_config.lang.code().to_string(),
        ];
        if !self.agent_config.verbose {
            args.push("--quiet".to_string());
        }
        args.push(task.to_string());
        args
    }

    /// Ask the agent CLI for the apps it can launch.
    ///
    /// The child's exit code is reported as-is; only spawn failures and the
    /// timeout are turned into errors.
    pub async fn list_apps(&self) -> RunnerResult<CommandOutput> {
        let mut cmd = self.command.command();
        cmd.arg("--list-apps");
        tracing::debug!(program = %self.command.program, "listing supported apps");

        let child = cmd.spawn().map_err(|e| self.command.spawn_error(e))?;
        let output = timeout(self.command.list_apps_timeout, child.wait_with_output())
            .await
            .map_err(|_| RunnerError::Timeout(self.command.list_apps_timeout))??;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[async_trait]
impl PhoneAgent for ProcessAgent {
    async fn run(&mut self, task: &str, out: &mut (dyn Write + Send)) -> RunnerResult<String> {
        let mut cmd = self.command.command();
        cmd.args(self.task_args(task));
        tracing::info!(
            program = %self.command.program,
            timeout_secs = self.command.timeout.as_secs(),
            "launching agent process"
        );

        let mut child = cmd.spawn().map_err(|e| self.command.spawn_error(e))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::agent("agent stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::agent("agent stderr was not captured"))?;

        // One deadline covers both pipes and the exit; a grandchild holding
        // a pipe open must not stretch the run past it.
        let deadline = Instant::now() + self.command.timeout;
        let mut stderr_tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let streamed = timeout_at(deadline, async {
            let last_line = stream_output(stdout, stderr, &mut *out, &mut stderr_tail).await?;
            let status = child.wait().await?;
            Ok::<_, RunnerError>((status, last_line))
        })
        .await;

        let (status, last_line) = match streamed {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!("agent process exceeded {:?}, killing it", self.command.timeout);
                let _ = child.kill().await;
                let _ = out.flush();
                return Err(RunnerError::Timeout(self.command.timeout));
            }
        };

        if status.success() {
            Ok(last_line)
        } else {
            let stderr_text = Vec::from(stderr_tail).join("\n");
            Err(classify_failure(status, &stderr_text))
        }
    }
}

/// Builds a [`ProcessAgent`] per run from a shared command template.
#[derive(Debug, Clone, Default)]
pub struct ProcessAgentFactory {
    command: AgentCommand,
}

impl ProcessAgentFactory {
    pub fn new(command: AgentCommand) -> Self {
        Self { command }
    }
}

impl AgentFactory for ProcessAgentFactory {
    fn build(
        &self,
        model_config: &ModelConfig,
        agent_config: &AgentConfig,
    ) -> RunnerResult<Box<dyn PhoneAgent>> {
        Ok(Box::new(ProcessAgent::new(
            self.command.clone(),
            model_config.clone(),
            agent_config.clone(),
        )))
    }
}

/// Copy the child's stdout and stderr into `out` line by line as they arrive.
///
/// Keeps the last [`STDERR_TAIL_LINES`] stderr lines in `stderr_tail` and
/// returns the last non-blank stdout line, which the agent CLI uses for its
/// result. Returns once both pipes are closed.
async fn stream_output<O, E>(
    stdout: O,
    stderr: E,
    out: &mut (dyn Write + Send),
    stderr_tail: &mut VecDeque<String>,
) -> RunnerResult<String>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut stdout = BufReader::new(stdout);
    let mut stderr = BufReader::new(stderr);
    // read_until keeps partial reads in these buffers across select! rounds
    let mut out_line = Vec::new();
    let mut err_line = Vec::new();
    let mut stdout_open = true;
    let mut stderr_open = true;
    let mut last_line = String::new();

    while stdout_open || stderr_open {
        tokio::select! {
            read = stdout.read_until(b'\n', &mut out_line), if stdout_open => {
                if read? == 0 {
                    stdout_open = false;
                    continue;
                }
                out.write_all(&out_line)?;
                let text = String::from_utf8_lossy(&out_line);
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    last_line = trimmed.to_string();
                }
                out_line.clear();
            }
            read = stderr.read_until(b'\n', &mut err_line), if stderr_open => {
                if read? == 0 {
                    stderr_open = false;
                    continue;
                }
                out.write_all(&err_line)?;
                if stderr_tail.len() == STDERR_TAIL_LINES {
                    stderr_tail.pop_front();
                }
                stderr_tail.push_back(String::from_utf8_lossy(&err_line).trim_end().to_string());
                err_line.clear();
            }
        }
    }

    out.flush()?;
    Ok(last_line)
}

/// Map a failed child run onto an error category using its stderr.
fn classify_failure(status: ExitStatus, stderr: &str) -> RunnerError {
    let message = stderr_tail(stderr);
    let message = if message.is_empty() {
        format!("agent exited with {}", status)
    } else {
        message
    };

    if let Some(caps) = HTTP_STATUS.captures(stderr) {
        let code = caps.get(1).and_then(|m| m.as_str().parse::<u16>().ok());
        return RunnerError::RemoteService {
            status: code,
            message,
        };
    }
    if AUTH_FAILURE.is_match(stderr) {
        return RunnerError::RemoteService {
            status: None,
            message,
        };
    }
    if NETWORK_FAILURE.is_match(stderr) {
        return RunnerError::Network(message);
    }
    RunnerError::Agent {
        code: status.code(),
        message,
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
