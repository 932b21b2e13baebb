//! Basic usage example for Phone Task Runner.

use phone_task_runner::{
    AgentCommand, AgentConfig, EndpointPreset, Lang, ProcessAgentFactory, TaskRunner,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    // Configure the model endpoint
    // MODEL_API_KEY must hold a key for the ModelScope inference API
    let model_config = EndpointPreset::ModelScope
        .model_config()
        .with_api_key(std::env::var("MODEL_API_KEY").unwrap_or_default());

    // Configure the agent
    let agent_config = AgentConfig::default()
        .with_lang(Lang::Cn)    // Use Chinese prompts
        .with_max_steps(5);     // Maximum 5 steps

    // The agent CLI lives next to this checkout
    let runner = TaskRunner::new(ProcessAgentFactory::new(AgentCommand::default()));

    let task = "打开设置查看电量";
    println!("📝 Task: {}\n", task);

    match runner
        .execute(task, &model_config, &agent_config, &mut std::io::stdout())
        .await
    {
        Ok(result) => {
            println!("\n✅ Task completed: {}", result);
        }
        Err(e) => {
            eprintln!("\n❌ Task failed ({}): {}", e.kind().as_str(), e);
        }
    }

    Ok(())
}
