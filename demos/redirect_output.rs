//! Capture the agent's output in a file instead of the terminal.

use std::path::Path;

use phone_task_runner::{AgentCommand, AgentConfig, EndpointPreset, ProcessAgentFactory, TaskRunner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let model_config = EndpointPreset::Zhipu
        .model_config()
        .with_api_key(std::env::var("MODEL_API_KEY").unwrap_or_default());
    let agent_config = AgentConfig::default().with_max_steps(3).quiet();

    let runner = TaskRunner::new(ProcessAgentFactory::new(AgentCommand::default()));
    let path = Path::new("autoglm_output.txt");

    println!("Starting task: 打开设置");
    match runner
        .execute_to_file("打开设置", &model_config, &agent_config, path)
        .await
    {
        Ok(result) => {
            println!("\nTask completed!");
            println!("{}", "=".repeat(50));
            print!("{}", std::fs::read_to_string(path)?);
            println!("{}", "=".repeat(50));
            println!("Result: {}", result);
        }
        Err(e) => eprintln!("\nError: {}", e),
    }

    Ok(())
}
