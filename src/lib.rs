// Copyright 2025 Zhipu AI (Original Python implementation)
// Copyright 2025 ModerRAS (Rust implementation)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Phone Task Runner
//!
//! Harness for running natural-language tasks through the AutoGLM phone agent.
//!
//! The runner builds a [`ModelConfig`] (endpoint, model, credential) and an
//! [`AgentConfig`] (step limit, language, verbosity), hands both to an agent
//! built by an [`AgentFactory`], and waits for the single `run(task)` call to
//! finish. The agent is opaque: the bundled [`ProcessAgent`] drives the
//! agent CLI as a child process, and any other [`PhoneAgent`] can be plugged in.
//!
//! ## Example
//!
//! ```rust,no_run
//! use phone_task_runner::{
//!     AgentCommand, AgentConfig, Lang, ModelConfig, ProcessAgentFactory, TaskRunner,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let model_config = ModelConfig::new(
//!         "https://open.bigmodel.cn/api/paas/v4",
//!         "autoglm-phone",
//!         "your-api-key",
//!     );
//!     let agent_config = AgentConfig::default()
//!         .with_max_steps(3)
//!         .with_lang(Lang::Cn);
//!
//!     let runner = TaskRunner::new(ProcessAgentFactory::new(AgentCommand::default()));
//!     let result = runner
//!         .execute("打开设置", &model_config, &agent_config, &mut std::io::stdout())
//!         .await?;
//!
//!     println!("Task result: {}", result);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod runner;
pub mod settings;

pub use agent::{
    AgentCommand, AgentConfig, AgentFactory, CommandOutput, Lang, PhoneAgent, ProcessAgent,
    ProcessAgentFactory,
};
pub use cli::Cli;
pub use error::{ErrorKind, RunnerError, RunnerResult};
pub use model::{EndpointPreset, EndpointProbe, ModelConfig, ProbeReport};
pub use runner::{diagnostics, TaskResult, TaskRunner};
pub use settings::{AppSettings, SettingsError};
