/*
 * Quill - Sandboxed Autonomous Coding Agent
 * File Path: src/agent.rs
 * Responsibility: The bounded agent loop driving oracle turns and tool execution.
 */

use crate::config::Config;
use crate::conversation::{Conversation, Turn};
use crate::oracle::{Oracle, OracleTurn};
use crate::registry;
use crate::sandbox::Sandbox;

/// Drives at most `runtime.max_turns` oracle invocations. Each iteration
/// appends the oracle's turn, executes any requested tool calls strictly in
/// the order they were listed, and appends all results as one tool turn. The
/// loop ends early the moment the oracle answers without requesting tools.
pub async fn run_agent<O: Oracle>(
    oracle: &O,
    sandbox: &Sandbox,
    config: &Config,
    task: &str,
    verbose: bool,
) -> anyhow::Result<String> {
    let tools = registry::tool_definitions();
    let mut conversation = Conversation::new();
    conversation.push(Turn::User {
        text: task.to_string(),
    });

    if verbose {
        println!("User prompt: {}", task);
    }

    let max_turns = config.runtime.max_turns.max(1);
    for turn in 1..=max_turns {
        println!("🧠 Turn {}/{}: Reasoning...", turn, max_turns);

        // A response without usage metadata is a protocol fault; `?` aborts
        // the run here. Tool failures below never do.
        let OracleTurn { text, calls, usage } = oracle
            .generate(&conversation, &tools, &config.runtime.system_prompt)
            .await?;

        if verbose {
            println!("Prompt tokens: {}", usage.prompt_tokens);
            println!("Response tokens: {}", usage.response_tokens);
        }

        conversation.push(Turn::Oracle {
            text: text.clone(),
            calls: calls.clone(),
        });

        if calls.is_empty() {
            return Ok(text.unwrap_or_default());
        }
        if let Some(thought) = &text {
            println!("💬 Thought: {}", thought);
        }

        let mut results = Vec::with_capacity(calls.len());
        for call in &calls {
            if verbose {
                println!("Calling function: {}({})", call.name, call.args);
            } else {
                println!(" - Calling function: {}", call.name);
            }
            let result = registry::dispatch(call, sandbox, &config.runtime).await;
            if verbose {
                println!("-> {}", result.payload);
            }
            results.push(result);
        }
        conversation.push(Turn::Tool { results });
    }

    Ok("Max iterations reached.".to_string())
}
