//! Reconstructed LLM call and tool call content, assembled from the flattened
//! `llm_request.content.parts.<i>.*`, `llm_response.content.parts.<i>.*`,
//! `args.*` and `tool_response.*` attribute keys a span's attributes carry.

use crate::attrs::AttrValue;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, Serialize)]
pub struct TextContent {
    pub text: String,
    pub thought: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCall {
    pub tool_name: String,
    pub arguments: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolResponse {
    pub tool_name: String,
    pub response: HashMap<String, serde_json::Value>,
}

/// One part of a request content list. No discriminator tag is emitted;
/// consumers distinguish variants by the fields present.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RequestPart {
    Text(TextContent),
    ToolResponse(ToolResponse),
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResponsePart {
    Text(TextContent),
    ToolCall(ToolCall),
}

#[derive(Debug, Clone, Serialize)]
pub struct LlmRequestContent {
    pub role: String,
    pub content: Vec<RequestPart>,
}

impl Default for LlmRequestContent {
    fn default() -> Self {
        Self {
            role: "user".into(),
            content: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LlmResponseContent {
    pub role: String,
    pub parts: Vec<ResponsePart>,
}

impl Default for LlmResponseContent {
    fn default() -> Self {
        Self {
            role: "model".into(),
            parts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageMetadata {
    pub total_tokens: i64,
    pub prompt_tokens: i64,
    pub candidate_tokens: i64,
    pub thoughts_tokens: i64,
    pub tool_use_prompt_tokens: i64,
    pub cached_content_tokens: i64,
}

impl UsageMetadata {
    /// Reads the `llm_response.usage_metadata.*` keys off a flattened
    /// attribute map, defaulting every field to `0` when absent.
    pub fn from_attrs(attrs: &HashMap<String, AttrValue>) -> Self {
        let int = |key: &str| attrs.get(key).and_then(AttrValue::as_i64).unwrap_or(0);
        Self {
            total_tokens: int("llm_response.usage_metadata.total_token_count"),
            prompt_tokens: int("llm_response.usage_metadata.prompt_token_count"),
            candidate_tokens: int("llm_response.usage_metadata.candidates_token_count"),
            thoughts_tokens: int("llm_response.usage_metadata.thoughts_token_count"),
            tool_use_prompt_tokens: int("llm_response.usage_metadata.tool_use_prompt_token_count"),
            cached_content_tokens: int("llm_response.usage_metadata.cached_content_token_count"),
        }
    }
}

/// Returns everything after `prefix`, with the matched value converted to
/// JSON the way an `AttrValue` naturally round-trips.
fn strip(key: &str, prefix: &str) -> Option<String> {
    key.strip_prefix(prefix).map(str::to_string)
}

/// `tool_name` plus every `args.<key>` attribute, one level deep.
pub fn extract_tool_call(attrs: &HashMap<String, AttrValue>) -> ToolCall {
    let tool_name = attrs
        .get("tool_name")
        .and_then(AttrValue::as_str)
        .unwrap_or("")
        .to_string();

    let mut arguments = HashMap::new();
    for (key, value) in attrs {
        if let Some(arg_key) = strip(key, "args.") {
            arguments.insert(arg_key, value.to_json());
        }
    }

    ToolCall {
        tool_name,
        arguments,
    }
}

/// Collapses every `tool_response.<path>` attribute into a flat map keyed by
/// only the LAST segment of the path (nested structure is not preserved;
/// later keys win on collision, matching the flattening this performs on
/// the producing side).
pub fn extract_tool_response(attrs: &HashMap<String, AttrValue>) -> HashMap<String, serde_json::Value> {
    let mut response = HashMap::new();
    for (key, value) in attrs {
        let Some(rest) = strip(key, "tool_response.") else {
            continue;
        };
        let last = rest.rsplit('.').next().unwrap_or(&rest).to_string();
        response.insert(last, value.to_json());
    }
    response
}

#[derive(Debug, Clone, Default)]
struct PartialToolResponse {
    tool_name: Option<String>,
    response: HashMap<String, serde_json::Value>,
}

/// Reassembles `llm_request.content.parts.<i>.*` attribute keys into an
/// ordered [`LlmRequestContent`].
///
/// Text parts and tool-response parts are tracked in separate `BTreeMap`s
/// keyed by part index, each yielding a deterministic ascending order, then
/// concatenated text-parts-first. This mirrors the two-pass shape of the
/// attribute walk this is reconstructed from: a single linear scan appends
/// text parts as it encounters them and defers tool-response assembly
/// (whose `name` and `response.*` keys may arrive in any order) to a second
/// pass over the same attributes.
pub fn extract_llm_request_content(attrs: &HashMap<String, AttrValue>) -> LlmRequestContent {
    let mut role = "user".to_string();
    let mut texts: BTreeMap<u32, String> = BTreeMap::new();
    let mut tool_responses: BTreeMap<u32, PartialToolResponse> = BTreeMap::new();

    for (key, value) in attrs {
        let Some(rest) = strip(key, "llm_request.content.") else {
            continue;
        };
        if rest == "role" {
            if let Some(s) = value.as_str() {
                role = s.to_string();
            }
            continue;
        }
        let Some(rest) = rest.strip_prefix("parts.") else {
            continue;
        };
        let Some((idx, field)) = rest.split_once('.') else {
            continue;
        };
        let Ok(idx) = idx.parse::<u32>() else {
            continue;
        };

        if field == "text" {
            if let Some(s) = value.as_str() {
                texts.insert(idx, s.to_string());
            }
        } else if field == "function_response.name" {
            tool_responses.entry(idx).or_default().tool_name =
                value.as_str().map(str::to_string);
        }
    }

    // Second pass: function_response.response.* fields, keyed by the same index.
    for (key, value) in attrs {
        let Some(rest) = strip(key, "llm_request.content.parts.") else {
            continue;
        };
        let Some((idx, field)) = rest.split_once('.') else {
            continue;
        };
        let Ok(idx) = idx.parse::<u32>() else {
            continue;
        };
        let Some(sub) = field.strip_prefix("function_response.response.") else {
            continue;
        };
        if let Some(partial) = tool_responses.get_mut(&idx) {
            partial.response.insert(sub.to_string(), value.to_json());
        }
    }

    let mut content: Vec<RequestPart> = texts
        .into_values()
        .map(|text| RequestPart::Text(TextContent { text, thought: false }))
        .collect();
    content.extend(tool_responses.into_values().map(|p| {
        RequestPart::ToolResponse(ToolResponse {
            tool_name: p.tool_name.unwrap_or_default(),
            response: p.response,
        })
    }));

    LlmRequestContent { role, content }
}

#[derive(Debug, Clone, Default)]
struct PartialToolCall {
    tool_name: Option<String>,
    arguments: HashMap<String, serde_json::Value>,
}

/// Reassembles `llm_response.content.parts.<i>.*` attribute keys into an
/// ordered [`LlmResponseContent`]; same text-first-then-tool-calls ordering
/// discipline as [`extract_llm_request_content`].
pub fn extract_llm_response_content(attrs: &HashMap<String, AttrValue>) -> LlmResponseContent {
    let mut role = "model".to_string();
    let mut texts: BTreeMap<u32, (String, bool)> = BTreeMap::new();
    let mut tool_calls: BTreeMap<u32, PartialToolCall> = BTreeMap::new();

    for (key, value) in attrs {
        let Some(rest) = strip(key, "llm_response.content.") else {
            continue;
        };
        if rest == "role" {
            if let Some(s) = value.as_str() {
                role = s.to_string();
            }
            continue;
        }
        let Some(rest) = rest.strip_prefix("parts.") else {
            continue;
        };
        let Some((idx, field)) = rest.split_once('.') else {
            continue;
        };
        let Ok(idx) = idx.parse::<u32>() else {
            continue;
        };

        if field == "text" {
            if let Some(s) = value.as_str() {
                let thought_key = format!(
                    "llm_response.content.parts.{idx}.thought"
                );
                let thought = attrs
                    .get(&thought_key)
                    .and_then(AttrValue::as_bool)
                    .unwrap_or(false);
                texts.insert(idx, (s.to_string(), thought));
            }
        } else if field == "function_call.name" {
            tool_calls.entry(idx).or_default().tool_name = value.as_str().map(str::to_string);
        }
    }

    for (key, value) in attrs {
        let Some(rest) = strip(key, "llm_response.content.parts.") else {
            continue;
        };
        let Some((idx, field)) = rest.split_once('.') else {
            continue;
        };
        let Ok(idx) = idx.parse::<u32>() else {
            continue;
        };
        let Some(sub) = field.strip_prefix("function_call.args.") else {
            continue;
        };
        if let Some(partial) = tool_calls.get_mut(&idx) {
            partial.arguments.insert(sub.to_string(), value.to_json());
        }
    }

    let mut parts: Vec<ResponsePart> = texts
        .into_values()
        .map(|(text, thought)| ResponsePart::Text(TextContent { text, thought }))
        .collect();
    parts.extend(tool_calls.into_values().map(|p| {
        ResponsePart::ToolCall(ToolCall {
            tool_name: p.tool_name.unwrap_or_default(),
            arguments: p.arguments,
        })
    }));

    LlmResponseContent { role, parts }
}

/// The agent that a `transfer_to_agent` (or bare `AgentTool`) call invokes.
///
/// When the call is the legacy `transfer_to_agent` tool, the target comes
/// from its `args.agent_name` argument; any other tool invocation that
/// reaches this function is itself the invoked agent's name (the `AgentTool`
/// pattern, where the sub-agent is wrapped and called directly by its own
/// name instead of through `transfer_to_agent`).
pub fn extract_invoked_agent(attrs: &HashMap<String, AttrValue>) -> String {
    let tool_name = attrs.get("tool_name").and_then(AttrValue::as_str).unwrap_or("");
    if tool_name == "transfer_to_agent" {
        attrs
            .get("args.agent_name")
            .and_then(AttrValue::as_str)
            .unwrap_or("")
            .to_string()
    } else {
        tool_name.to_string()
    }
}

/// A tool call counts as an agent invocation when it's the legacy
/// `transfer_to_agent` call, or when it's a single-argument call whose only
/// argument is `args.request` (the `AgentTool` wrapping pattern).
pub fn is_agent_tool_call(attrs: &HashMap<String, AttrValue>) -> bool {
    let tool_name = attrs.get("tool_name").and_then(AttrValue::as_str);
    if tool_name == Some("transfer_to_agent") {
        return true;
    }
    let arg_keys: Vec<&str> = attrs
        .keys()
        .filter_map(|k| k.strip_prefix("args."))
        .collect();
    arg_keys.len() == 1 && arg_keys[0] == "request"
}
