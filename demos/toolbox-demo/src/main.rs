//! Loads canned providers into an orchestrator and runs command envelopes.

mod providers;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use toolbox::config::OrchestratorConfig;
use toolbox::kernel::Orchestrator;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "toolbox-demo", about = "Run tool commands through the orchestrator")]
struct Args {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// File holding one JSON command envelope. Runs a scripted session when absent.
    #[arg(long)]
    envelope: Option<PathBuf>,
}

const SCRIPT: &[&str] = &[
    r#"{"action":"execute_tool","tool_name":"get_token_price","parameters":{"symbol":"ETH-USDC"},"request_id":"demo-1"}"#,
    r#"{"action":"execute_tool","tool_name":"get_token_price","parameters":{"symbol":"DOGE-USDC"},"request_id":"demo-2"}"#,
    r#"{"action":"execute_tool","tool_name":"get_token_price","parameters":{"symbol":"ETH-USDC","delay_ms":500},"timeout":0.1,"request_id":"demo-3"}"#,
    r#"{"action":"execute_batch","parallel":true,"request_id":"demo-4","commands":[
        {"tool_name":"get_token_price","parameters":{"symbol":"BTC-USDC","delay_ms":100}},
        {"tool_name":"get_balance","parameters":{"address":"0xabc"}},
        {"tool_name":"nonexistent"}]}"#,
    r#"{"action":"launch_rocket","request_id":"demo-5"}"#,
];

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => OrchestratorConfig::from_path(path)?,
        None => OrchestratorConfig::default(),
    }
    .apply_env()
    .context("failed to apply environment overrides")?;
    toolbox::telemetry::init_tracing(config.telemetry())?;

    let mut orchestrator = Orchestrator::new(config)?;
    orchestrator.initialize(providers::all())?;
    info!(tools = orchestrator.registry().count(None), "orchestrator ready");

    if let Some(path) = &args.envelope {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read envelope {}", path.display()))?;
        print_json(&orchestrator.handle_json(&raw).await)?;
        return Ok(());
    }

    for raw in SCRIPT {
        print_json(&orchestrator.handle_json(raw).await)?;
    }
    print_json(&orchestrator.describe("get_token_price")?)?;
    print_json(&orchestrator.health())?;
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
