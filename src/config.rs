/*
 * Quill - Sandboxed Autonomous Coding Agent
 * File Path: src/config.rs
 * Responsibility: YAML configuration structure, defaults, and loading
 */
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful AI coding agent.

When a user asks a question or makes a request, make a function call plan. You can perform the following operations:

- List files and directories
- Read file contents
- Execute Python files with optional arguments
- Write or overwrite files

All paths you provide should be relative to the working directory. You do not need to specify the working directory in your function calls as it is automatically injected for security reasons.
";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Hard cap on oracle invocations per run.
    pub max_turns: usize,
    /// Maximum characters returned by a single file read.
    pub read_char_cap: usize,
    /// Wall-clock limit for a spawned script.
    pub script_timeout_secs: u64,
    /// Interpreter used to execute scripts.
    pub interpreter: String,
    /// Behavioral directive sent with every oracle request.
    pub system_prompt: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_turns: 20,
            read_char_cap: 10_000,
            script_timeout_secs: 30,
            interpreter: "python3".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file at {:?}", path.as_ref()))?;
        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
