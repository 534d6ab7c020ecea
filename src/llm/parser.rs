//! Parse natural language instructions into validated Actions
//!
//! The model picks one app from the catalog and fills in its arguments. Its
//! answer is treated as untrusted input: the JSON is extracted and parsed
//! strictly, the app name must be in the registry, and the arguments go
//! through the resolver before anything reaches a device.

use crate::actions::catalog::tools_json;
use crate::command::resolver::{IntentResolution, IntentResolver};
use crate::core::error::{Result, RunnerError};
use crate::core::types::{Action, AppId, Params};
use crate::llm::client::CompletionBackend;
use crate::llm::context::InstructionContext;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Instant;

/// App names the model uses to say "none of the above"
const NO_APP_MARKERS: [&str; 4] = ["unsupported", "none", "unknown", "null"];

/// Raw routing answer as returned by the model
#[derive(Debug, Clone, Deserialize)]
pub struct RouteAnswer {
    /// Chosen app; `tool_name` is accepted for older prompts
    #[serde(alias = "tool_name")]
    pub app: Option<String>,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// Routing answer whose app has been checked against the registry
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRoute {
    pub app: AppId,
    pub arguments: Params,
}

/// Parse an instruction into a validated Action
///
/// # Arguments
/// * `backend` - The completion backend to ask
/// * `context` - Deterministic slots extracted from the instruction
///
/// # Returns
/// The resolved Action, or a Classification / UnsupportedApp / Llm error
pub async fn parse_instruction<B: CompletionBackend>(
    backend: &B,
    context: &InstructionContext,
) -> Result<Action> {
    let route = request_route(backend, context).await?;
    let resolution = resolve_route(&route, context)?;
    Ok(resolution.action)
}

/// Ask the configured models in order until one gives a parseable answer
pub async fn request_route<B: CompletionBackend>(
    backend: &B,
    context: &InstructionContext,
) -> Result<ParsedRoute> {
    let user_prompt = build_user_prompt(context);
    let mut last_err = None;

    for model in backend.models() {
        let started = Instant::now();
        let response = match backend.complete(model, ROUTER_SYSTEM_PROMPT, &user_prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Model '{}' failed: {}", model, e);
                last_err = Some(e);
                continue;
            }
        };

        match parse_route_answer(&response) {
            Ok(answer) => {
                tracing::info!(
                    "Model '{}' responded in {:.1}s",
                    model,
                    started.elapsed().as_secs_f32()
                );
                return validate_answer(answer);
            }
            Err(e) => {
                tracing::warn!("Model '{}' returned unusable output: {}", model, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| RunnerError::Config("No models configured".into())))
}

/// Run the resolver for a parsed route
pub fn resolve_route(route: &ParsedRoute, context: &InstructionContext) -> Result<IntentResolution> {
    let resolution = IntentResolver::new(context).resolve(route.app, &route.arguments)?;
    if !resolution.dropped.is_empty() {
        tracing::debug!("Dropped arguments not in {} schema: {:?}", route.app, resolution.dropped);
    }
    for (key, from, to) in &resolution.normalized {
        tracing::debug!("Normalized {} '{}' -> '{}'", key, from, to);
    }
    Ok(resolution)
}

fn build_user_prompt(context: &InstructionContext) -> String {
    json!({
        "instruction": context.instruction,
        "detected_slots": context.to_prompt_json(),
        "apps": tools_json(),
        "output_format": {
            "app": "string, one of the app names above or \"unsupported\"",
            "arguments": "object, keys must match the app's parameters",
        },
    })
    .to_string()
}

/// Parse raw model text into a routing answer
pub fn parse_route_answer(response: &str) -> Result<RouteAnswer> {
    let json_str = extract_json(response)?;
    serde_json::from_str(json_str).map_err(|e| {
        RunnerError::Classification(format!(
            "Failed to parse routing answer: {} - Response: {}",
            e, response
        ))
    })
}

/// Check the app against the registry and flatten arguments to strings
pub fn validate_answer(answer: RouteAnswer) -> Result<ParsedRoute> {
    let name = answer
        .app
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| RunnerError::Classification("Model did not name an app".into()))?;

    let app = match AppId::from_name(name) {
        Some(app) => app,
        None if NO_APP_MARKERS.contains(&name.to_lowercase().as_str()) => {
            let wanted = answer
                .arguments
                .get("app")
                .and_then(Value::as_str)
                .unwrap_or("the requested app");
            return Err(RunnerError::UnsupportedApp(wanted.to_string()));
        }
        None => return Err(RunnerError::UnsupportedApp(name.to_string())),
    };

    let mut arguments = Params::new();
    for (key, value) in answer.arguments {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(RunnerError::Classification(format!(
                    "Argument '{}' must be a scalar value",
                    key
                )));
            }
        };
        arguments.insert(key, text);
    }

    Ok(ParsedRoute { app, arguments })
}

/// Extract JSON object from LLM response (handles surrounding text)
fn extract_json(response: &str) -> Result<&str> {
    let start = response
        .find('{')
        .ok_or_else(|| RunnerError::Classification("No JSON found in response".into()))?;
    let end = response
        .rfind('}')
        .ok_or_else(|| RunnerError::Classification("No closing brace found in response".into()))?;
    if end < start {
        return Err(RunnerError::Classification("Malformed JSON in response".into()));
    }
    Ok(&response[start..=end])
}

/// System prompt for instruction routing
const ROUTER_SYSTEM_PROMPT: &str = r#"You are a router for an iOS automation tool.
Given a user instruction, a set of pre-detected slots and a list of apps with JSON Schemas,
choose the single best app and fill in its arguments.

RULES:
- Output ONLY a JSON object, no explanation.
- "app" must be exactly one of the listed app names. If the instruction targets an app that
  is not listed, answer {"app": "unsupported", "arguments": {"app": "<name the user said>"}}.
- Argument keys must match the chosen app's parameters. Respect enums and required fields.
- Use "detected_slots" when they fit the schema; "_preferred_app" is a keyword hint only.
- For Maps: "from X to Y" means source = X, destination = Y. Map driving/walking/
  public transit/cycling to transport "d"/"w"/"r"/"c".
- For Phone and FaceTime put the number, e-mail or person's name in "contact".

OUTPUT FORMAT:
{"app": "App Name", "arguments": {"param": "value"}}

Examples:
"give Alice a phone call" -> {"app": "Phone", "arguments": {"contact": "Alice"}}
"play some Beatles on Spotify" -> {"app": "Spotify", "arguments": {"query": "The Beatles"}}
"open maps for driving from San Francisco to Los Angeles" -> {"app": "Maps", "arguments": {"source": "San Francisco", "destination": "Los Angeles", "transport": "d"}}
"text 5551234 that I'm running late" -> {"app": "Messages", "arguments": {"phone": "5551234", "message": "I'm running late"}}
"turn on bluetooth" -> {"app": "Settings", "arguments": {"root": "Bluetooth"}}
"send a snap to Bob on Snapchat" -> {"app": "unsupported", "arguments": {"app": "Snapchat"}}
"#;
