//! Command-line surface of `phone-task`.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use crate::agent::{AgentConfig, Lang, ProcessAgent, ProcessAgentFactory};
use crate::config::{get_messages, Messages};
use crate::error::{ErrorKind, RunnerError};
use crate::model::{EndpointPreset, EndpointProbe, ModelConfig};
use crate::runner::{diagnostics, TaskRunner};
use crate::settings::AppSettings;

/// Run a natural-language task on an Android phone through the AutoGLM agent.
#[derive(Parser, Debug)]
#[command(name = "phone-task", version, about)]
pub struct Cli {
    /// Task to run. Without one, tasks are read interactively from stdin.
    pub task: Vec<String>,

    /// Model API base URL.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Model name.
    #[arg(long)]
    pub model: Option<String>,

    /// Model API key.
    #[arg(long)]
    pub apikey: Option<String>,

    /// Maximum agent steps per task.
    #[arg(long)]
    pub max_steps: Option<u32>,

    /// Language of prompts and messages (cn or en).
    #[arg(long)]
    pub lang: Option<Lang>,

    /// Hosted endpoint preset (zhipu, modelscope or local).
    #[arg(long)]
    pub provider: Option<EndpointPreset>,

    /// Suppress the agent's step-by-step output.
    #[arg(short, long)]
    pub quiet: bool,

    /// List the apps the agent can launch and exit.
    #[arg(long)]
    pub list_apps: bool,

    /// Check that the endpoint is reachable and exit.
    #[arg(long)]
    pub check: bool,

    /// Capture agent output in this file, then print it.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Agent CLI executable.
    #[arg(long, value_name = "PROGRAM")]
    pub agent_program: Option<String>,

    /// Argument placed before the generated flags (repeatable).
    #[arg(long = "agent-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub agent_args: Vec<String>,

    /// Task timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Persist the resolved settings for later runs.
    #[arg(long)]
    pub save_settings: bool,
}

impl Cli {
    /// Apply command-line values on top of `settings`.
    ///
    /// A preset replaces endpoint and model; explicit `--base-url` and
    /// `--model` still win over it.
    pub fn resolve(&self, mut settings: AppSettings) -> AppSettings {
        if let Some(preset) = self.provider {
            settings = settings.with_preset(preset);
        }
        if let Some(v) = &self.base_url {
            settings.base_url = v.clone();
        }
        if let Some(v) = &self.model {
            settings.model_name = v.clone();
        }
        if let Some(v) = &self.apikey {
            settings.api_key = v.clone();
        }
        if let Some(v) = self.max_steps {
            settings.max_steps = v;
        }
        if let Some(v) = self.lang {
            settings.lang = v;
        }
        if self.quiet {
            settings.verbose = false;
        }
        if let Some(v) = &self.agent_program {
            settings.agent_program = v.clone();
        }
        if !self.agent_args.is_empty() {
            settings.agent_args = self.agent_args.clone();
        }
        if let Some(v) = self.timeout {
            settings.timeout_secs = v;
        }
        settings
    }

    /// The positional words joined into one task, if any were given.
    pub fn task_text(&self) -> Option<String> {
        let task = self.task.join(" ");
        let task = task.trim();
        (!task.is_empty()).then(|| task.to_string())
    }

    /// Run the CLI with settings loaded from disk and the environment.
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        let settings = self.resolve(AppSettings::load().with_env_overrides());
        self.run_with(settings).await.map(ExitCode::from)
    }

    /// Run the CLI against already resolved settings, returning the exit code.
    pub async fn run_with(self, settings: AppSettings) -> anyhow::Result<u8> {
        let model_config = settings.model_config();
        let agent_config = settings.agent_config();
        let msgs = get_messages(agent_config.lang);

        if self.save_settings {
            let path = settings.save()?;
            eprintln!("💾 {} {}", msgs.settings_saved, path.display());
        }

        if self.list_apps {
            let agent = ProcessAgent::new(settings.agent_command(), model_config, agent_config);
            return Ok(match agent.list_apps().await {
                Ok(output) => {
                    print!("{}", app_list(msgs, &output.stdout));
                    eprint!("{}", output.stderr);
                    // Killed by a signal: no code to forward
                    let code = output.code.unwrap_or(1);
                    u8::try_from(code).unwrap_or(1)
                }
                Err(e) => report_error(msgs, &e),
            });
        }

        eprintln!("{}\n", diagnostics(&model_config, &agent_config));

        if self.check {
            return Ok(check_endpoint(msgs, model_config).await);
        }

        let runner = TaskRunner::new(ProcessAgentFactory::new(settings.agent_command()));
        let output = self.output.as_deref();

        match self.task_text() {
            Some(task) => {
                Ok(run_task(&runner, msgs, &task, &model_config, &agent_config, output).await)
            }
            None => interactive(&runner, msgs, &model_config, &agent_config, output).await,
        }
    }
}

async fn check_endpoint(msgs: &Messages, model_config: ModelConfig) -> u8 {
    let model_name = model_config.model_name.clone();
    match EndpointProbe::new(model_config).check().await {
        Ok(report) => {
            println!(
                "✅ {} (HTTP {}, {} ms)",
                msgs.endpoint_ok,
                report.status,
                report.latency.as_millis()
            );
            if !report.serves(&model_name) {
                println!("⚠️ {}: {}", msgs.model_not_listed, model_name);
            }
            0
        }
        Err(e) => {
            eprintln!("❌ {}: {}", msgs.endpoint_failed, e);
            e.exit_code()
        }
    }
}

async fn run_task(
    runner: &TaskRunner<ProcessAgentFactory>,
    msgs: &Messages,
    task: &str,
    model_config: &ModelConfig,
    agent_config: &AgentConfig,
    output: Option<&Path>,
) -> u8 {
    println!("{}: {}", msgs.executing_task, task);
    println!("{}", "-".repeat(50));

    let result = match output {
        Some(path) => {
            let result = runner
                .execute_to_file(task, model_config, agent_config, path)
                .await;
            if result.is_ok() {
                echo_file(msgs, path);
            }
            result
        }
        None => {
            let mut stdout = io::stdout();
            runner
                .execute(task, model_config, agent_config, &mut stdout)
                .await
        }
    };

    match result {
        Ok(result) => {
            println!("\n✅ {}: {}", msgs.task_result, result);
            0
        }
        Err(e) => report_error(msgs, &e),
    }
}

/// The agent's `--list-apps` output under a localized header.
fn app_list(msgs: &Messages, stdout: &str) -> String {
    format!("📱 {}:\n{}", msgs.supported_apps, stdout)
}

fn echo_file(msgs: &Messages, path: &Path) {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            println!("\n{}", msgs.task_completed);
            println!("{}", "=".repeat(50));
            print!("{}", content);
            println!("{}", "=".repeat(50));
            eprintln!("📄 {} {}", msgs.output_saved, path.display());
        }
        Err(e) => tracing::warn!("Could not read back {}: {}", path.display(), e),
    }
}

fn report_error(msgs: &Messages, err: &RunnerError) -> u8 {
    let label = match err.kind() {
        ErrorKind::Timeout => msgs.timed_out,
        _ => msgs.task_failed,
    };
    eprintln!("\n❌ {}", label);
    eprintln!("{}: {}", msgs.error, err);
    err.exit_code()
}

async fn interactive(
    runner: &TaskRunner<ProcessAgentFactory>,
    msgs: &Messages,
    model_config: &ModelConfig,
    agent_config: &AgentConfig,
    output: Option<&Path>,
) -> anyhow::Result<u8> {
    println!("{}\n", msgs.interactive_hint);

    let stdin = io::stdin();
    let mut last = 0;
    loop {
        print!("📝 {}: ", msgs.task_prompt);
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let task = line.trim();

        if task.is_empty() {
            continue;
        }

        if task == "quit" || task == "exit" {
            println!("{} 👋", msgs.goodbye);
            break;
        }

        last = run_task(runner, msgs, task, model_config, agent_config, output).await;
        println!();
    }

    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("phone-task").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_app_list_has_localized_header() {
        let listing = app_list(get_messages(Lang::En), "微信\n设置\n");
        assert_eq!(listing, "📱 Supported apps:\n微信\n设置\n");
        assert!(app_list(get_messages(Lang::Cn), "").starts_with("📱 支持的应用:"));
    }

    #[test]
    fn test_parses_agent_style_flags() {
        let cli = parse(&[
            "--base-url",
            "https://open.bigmodel.cn/api/paas/v4",
            "--model",
            "autoglm-phone",
            "--apikey",
            "k",
            "--max-steps",
            "3",
            "打开设置",
        ]);
        let settings = cli.resolve(AppSettings::default().with_preset(EndpointPreset::Local));
        assert_eq!(settings.base_url, "https://open.bigmodel.cn/api/paas/v4");
        assert_eq!(settings.model_name, "autoglm-phone");
        assert_eq!(settings.api_key, "k");
        assert_eq!(settings.max_steps, 3);
        assert_eq!(cli.task_text().as_deref(), Some("打开设置"));
    }

    #[test]
    fn test_explicit_flags_beat_provider() {
        let cli = parse(&["--provider", "modelscope", "--model", "custom"]);
        let settings = cli.resolve(AppSettings::default());
        assert_eq!(settings.base_url, EndpointPreset::ModelScope.base_url());
        assert_eq!(settings.model_name, "custom");
    }

    #[test]
    fn test_task_words_are_joined() {
        let cli = parse(&["--lang", "en", "-q", "open", "settings"]);
        assert_eq!(cli.task_text().as_deref(), Some("open settings"));
        let settings = cli.resolve(AppSettings::default());
        assert_eq!(settings.lang, Lang::En);
        assert!(!settings.verbose);
        assert_eq!(parse(&[]).task_text(), None);
    }

    #[test]
    fn test_agent_command_flags() {
        let cli = parse(&[
            "--list-apps",
            "--agent-program",
            "python3",
            "--agent-arg",
            "/opt/autoglm/main.py",
            "--agent-arg",
            "--device-id=emulator-5554",
            "--timeout",
            "30",
        ]);
        assert!(cli.list_apps);
        let command = cli.resolve(AppSettings::default()).agent_command();
        assert_eq!(command.program, "python3");
        assert_eq!(
            command.args,
            vec!["/opt/autoglm/main.py", "--device-id=emulator-5554"]
        );
        assert_eq!(command.timeout.as_secs(), 30);
    }

    #[test]
    fn test_rejects_unknown_provider_and_lang() {
        let argv = ["phone-task", "--provider", "openai"];
        assert!(Cli::try_parse_from(argv).is_err());
        let argv = ["phone-task", "--lang", "fr"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_with_propagates_list_apps_exit_code() {
        let cli = parse(&["--list-apps"]);
        let settings = AppSettings {
            agent_program: "sh".into(),
            agent_args: vec!["-c".into(), "exit 3".into(), "agent".into()],
            ..AppSettings::default()
        };
        let code = cli.run_with(settings).await.unwrap();
        assert_eq!(code, 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_with_maps_errors_to_exit_codes() {
        let cli = parse(&["--agent-program", "phone-task-no-such-agent-cli", "t"]);
        let settings = cli.resolve(AppSettings::default());
        let code = cli.run_with(settings).await.unwrap();
        assert_eq!(code, ErrorKind::Config.exit_code());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_with_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autoglm_output.txt");
        let path_arg = path.to_string_lossy().into_owned();
        let cli = parse(&["-o", &path_arg, "打开设置"]);
        let settings = AppSettings {
            agent_program: "sh".into(),
            agent_args: vec!["-c".into(), r#"echo "ran: ${11}""#.into(), "agent".into()],
            ..cli.resolve(AppSettings::default())
        };
        let code = cli.run_with(settings).await.unwrap();
        assert_eq!(code, 0);
        let captured = std::fs::read_to_string(&path).unwrap();
        assert_eq!(captured, "ran: 打开设置\n");
    }
}
