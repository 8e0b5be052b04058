/*
 * Quill - Sandboxed Autonomous Coding Agent
 * File Path: src/oracle.rs
 * Responsibility: The opaque reasoning boundary and its Gemini implementation.
 */

use crate::conversation::{Conversation, ToolCallRequest, Turn};
use crate::error::OracleError;
use once_cell::sync::Lazy;
use serde_json::{Value, json};

static POOLED_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .build()
        .expect("Failed to create pooled reqwest client")
});

/// Token accounting the oracle must return with every response. A response
/// without it is a protocol violation and aborts the run.
#[derive(Debug, Clone, Copy)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub response_tokens: u64,
}

/// One oracle response: optional free text, zero or more tool-call requests,
/// and mandatory usage metadata.
#[derive(Debug)]
pub struct OracleTurn {
    pub text: Option<String>,
    pub calls: Vec<ToolCallRequest>,
    pub usage: Usage,
}

/// The decision oracle consumed by the agent loop. Kept behind a trait so
/// tests can drive the loop with scripted stubs.
#[allow(async_fn_in_trait)]
pub trait Oracle {
    async fn generate(
        &self,
        conversation: &Conversation,
        tools: &[Value],
        system_prompt: &str,
    ) -> Result<OracleTurn, OracleError>;
}

pub struct GeminiOracle {
    api_key: String,
    model: String,
}

impl GeminiOracle {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

impl Oracle for GeminiOracle {
    async fn generate(
        &self,
        conversation: &Conversation,
        tools: &[Value],
        system_prompt: &str,
    ) -> Result<OracleTurn, OracleError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let payload = json!({
            "systemInstruction": {
                "parts": [{ "text": system_prompt }]
            },
            "contents": contents_from(conversation),
            "tools": [{ "functionDeclarations": tools }],
        });

        let response = POOLED_CLIENT.post(url).json(&payload).send().await?;
        if !response.status().is_success() {
            let body = response.text().await?;
            return Err(OracleError::Api {
                model: self.model.clone(),
                body,
            });
        }

        let body: Value = response.json().await?;
        parse_response(&body)
    }
}

/// Maps conversation turns onto Gemini `contents`. Tool results ride along as
/// user-role `functionResponse` parts, keyed `result` or `error` so the model
/// can tell the two apart.
fn contents_from(conversation: &Conversation) -> Vec<Value> {
    conversation
        .turns()
        .iter()
        .map(|turn| match turn {
            Turn::User { text } => json!({
                "role": "user",
                "parts": [{ "text": text }]
            }),
            Turn::Oracle { text, calls } => {
                let mut parts = Vec::new();
                if let Some(text) = text {
                    parts.push(json!({ "text": text }));
                }
                for call in calls {
                    parts.push(json!({
                        "functionCall": { "name": call.name, "args": call.args }
                    }));
                }
                json!({ "role": "model", "parts": parts })
            }
            Turn::Tool { results } => {
                let parts: Vec<Value> = results
                    .iter()
                    .map(|result| {
                        let key = if result.is_error { "error" } else { "result" };
                        json!({
                            "functionResponse": {
                                "name": result.name,
                                "response": { key: result.payload }
                            }
                        })
                    })
                    .collect();
                json!({ "role": "user", "parts": parts })
            }
        })
        .collect()
}

/// Pulls the first candidate apart into accumulated text and tool-call
/// requests. Usage metadata is checked first: its absence is the fatal
/// protocol fault, whatever else the response contains. A usage-carrying
/// response with no content parts is a valid empty turn; the loop treats it
/// as a final answer with no text.
fn parse_response(body: &Value) -> Result<OracleTurn, OracleError> {
    let usage_metadata = body.get("usageMetadata").ok_or(OracleError::MissingUsage)?;
    let usage = Usage {
        prompt_tokens: usage_metadata["promptTokenCount"].as_u64().unwrap_or(0),
        response_tokens: usage_metadata["candidatesTokenCount"].as_u64().unwrap_or(0),
    };

    let mut text = String::new();
    let mut calls = Vec::new();
    if let Some(parts) = body["candidates"][0]["content"]["parts"].as_array() {
        for part in parts {
            if let Some(fragment) = part["text"].as_str() {
                text.push_str(fragment);
            }
            if let Some(call) = part.get("functionCall") {
                calls.push(ToolCallRequest {
                    name: call["name"].as_str().unwrap_or_default().to_string(),
                    args: call.get("args").cloned().unwrap_or_else(|| json!({})),
                });
            }
        }
    }

    Ok(OracleTurn {
        text: if text.is_empty() { None } else { Some(text) },
        calls,
        usage,
    })
}
