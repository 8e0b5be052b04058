/*
 * Quill - Sandboxed Autonomous Coding Agent
 * File Path: src/registry.rs
 * Responsibility: Tool schema catalog, argument validation, and dispatch.
 */

use crate::config::RuntimeConfig;
use crate::conversation::{ToolCallRequest, ToolResult};
use crate::error::ToolError;
use crate::sandbox::Sandbox;
use crate::tools::{
    self, ListDirectoryArgs, ReadFileArgs, RunScriptArgs, WriteFileArgs,
};
use serde_json::{Value, json};

/// Static declaration of every tool the oracle may call, in Gemini
/// function-declaration form.
pub fn tool_definitions() -> Vec<Value> {
    vec![
        json!({
            "name": "list_directory",
            "description": "Lists files in a specified directory relative to the working directory, providing file size and directory status",
            "parameters": {
                "type": "object",
                "properties": {
                    "directory": {
                        "type": "string",
                        "description": "Directory path to list files from, relative to the working directory (default is the working directory itself)"
                    }
                }
            }
        }),
        json!({
            "name": "read_file",
            "description": "Get the content of a file in a specified directory relative to the working directory. Content above a threshold is truncated",
            "parameters": {
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path to the file to read, relative to the working directory"
                    }
                },
                "required": ["file_path"]
            }
        }),
        json!({
            "name": "write_file",
            "description": "Write content to a file in a specified directory relative to the working directory",
            "parameters": {
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path to the file to write, relative to the working directory"
                    },
                    "content": {
                        "type": "string",
                        "description": "Content to write to the file"
                    }
                },
                "required": ["file_path", "content"]
            }
        }),
        json!({
            "name": "run_script",
            "description": "Execute a python file in a specified directory relative to the working directory",
            "parameters": {
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path to the python file to execute, relative to the working directory"
                    },
                    "args": {
                        "type": "array",
                        "items": {
                            "type": "string",
                            "description": "Argument to pass to the python file on execution."
                        }
                    }
                },
                "required": ["file_path"]
            }
        }),
    ]
}

/// The closed set of operations the agent can perform. Unknown names and
/// malformed arguments are rejected here, once, so the tool implementations
/// only ever see well-typed records.
#[derive(Debug)]
pub enum ToolCall {
    ListDirectory(ListDirectoryArgs),
    ReadFile(ReadFileArgs),
    WriteFile(WriteFileArgs),
    RunScript(RunScriptArgs),
}

impl ToolCall {
    pub fn parse(name: &str, args: Value) -> Result<Self, ToolError> {
        let invalid = |source| ToolError::InvalidArguments {
            name: name.to_string(),
            source,
        };
        match name {
            "list_directory" => serde_json::from_value(args)
                .map(Self::ListDirectory)
                .map_err(invalid),
            "read_file" => serde_json::from_value(args)
                .map(Self::ReadFile)
                .map_err(invalid),
            "write_file" => serde_json::from_value(args)
                .map(Self::WriteFile)
                .map_err(invalid),
            "run_script" => serde_json::from_value(args)
                .map(Self::RunScript)
                .map_err(invalid),
            other => Err(ToolError::UnknownFunction(other.to_string())),
        }
    }
}

/// Executes one requested call against the sandbox. Every fault is converted
/// into an error-shaped string payload; nothing propagates to the agent loop.
pub async fn dispatch(
    call: &ToolCallRequest,
    sandbox: &Sandbox,
    runtime: &RuntimeConfig,
) -> ToolResult {
    let parsed = match ToolCall::parse(&call.name, call.args.clone()) {
        Ok(parsed) => parsed,
        Err(err) => return ToolResult::error(&call.name, error_payload(&err)),
    };

    let outcome = match parsed {
        ToolCall::ListDirectory(args) => tools::list_directory(sandbox, &args),
        ToolCall::ReadFile(args) => tools::read_file(sandbox, runtime, &args),
        ToolCall::WriteFile(args) => tools::write_file(sandbox, &args),
        ToolCall::RunScript(args) => tools::run_script(sandbox, runtime, &args).await,
    };

    match outcome {
        Ok(payload) => ToolResult::success(&call.name, payload),
        Err(err) => ToolResult::error(&call.name, error_payload(&err)),
    }
}

fn error_payload(err: &ToolError) -> String {
    format!("Error: {}", err)
}
