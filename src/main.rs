/*
 * Quill - Sandboxed Autonomous Coding Agent
 * File Path: src/main.rs
 * Responsibility: CLI entry point
 */

use anyhow::Context;
use clap::Parser;
use quill::agent;
use quill::config::Config;
use quill::oracle::GeminiOracle;
use quill::sandbox::Sandbox;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Quill - sandboxed autonomous coding agent", long_about = None)]
struct Cli {
    /// Natural-language task for the agent
    user_prompt: String,

    /// Print token usage and full tool traffic
    #[arg(long)]
    verbose: bool,

    /// Working directory the agent is confined to (default: current directory)
    #[arg(short, long)]
    workdir: Option<PathBuf>,

    /// Path to a quill.yml configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let workdir = args.workdir.unwrap_or_else(|| PathBuf::from("."));
    let sandbox = Sandbox::new(&workdir)?;

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => {
            let default_path = workdir.join("quill.yml");
            if default_path.exists() {
                Config::load(&default_path)?
            } else {
                Config::default()
            }
        }
    };

    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            config.gemini.api_key = key;
        }
    }
    if config.gemini.api_key.is_empty() {
        anyhow::bail!("no gemini api key configured in the environment");
    }

    println!("🚀 Quill is starting in {:?}", sandbox.root());
    let oracle = GeminiOracle::new(config.gemini.api_key.as_str(), config.gemini.model.as_str());

    let answer = agent::run_agent(&oracle, &sandbox, &config, &args.user_prompt, args.verbose)
        .await
        .context("agent run aborted")?;

    println!("Response:");
    println!("{}", answer);
    Ok(())
}
