//! Dispatches a classified span to the matching event constructor, applying
//! the agent-call heuristic and the tool-response JSON-unwrap step
//! (spec.md §4.5).

use std::collections::HashMap;

use crate::attrs::AttrValue;
use crate::content::{
    extract_invoked_agent, extract_llm_request_content, extract_llm_response_content,
    extract_tool_call, extract_tool_response, is_agent_tool_call, UsageMetadata,
};
use crate::event::{CommunicationEvent, EventHeader, EventKind};

/// The non-payload fields every constructor needs, already resolved by the
/// preprocessor driver (acting agent, conversation, timestamp, workforce).
#[derive(Debug, Clone)]
pub struct EventContext {
    pub acting_agent: String,
    pub conversation_id: String,
    pub timestamp: String,
    pub workforce_name: Option<String>,
}

fn invocation_id(attrs: &HashMap<String, AttrValue>) -> String {
    attrs
        .get("invocation_id")
        .and_then(AttrValue::as_str)
        .unwrap_or("")
        .to_string()
}

fn header(ctx: &EventContext, kind: EventKind, attrs: &HashMap<String, AttrValue>) -> EventHeader {
    EventHeader::new(
        kind,
        ctx.acting_agent.clone(),
        ctx.conversation_id.clone(),
        ctx.timestamp.clone(),
        invocation_id(attrs),
        ctx.workforce_name.clone(),
    )
}

/// Replaces a string-valued `response["text"]` with its parsed JSON value
/// when it parses; leaves the string as-is on parse failure (spec.md §4.5,
/// P10).
fn unwrap_tool_response_text(
    mut response: HashMap<String, serde_json::Value>,
) -> HashMap<String, serde_json::Value> {
    if let Some(serde_json::Value::String(text)) = response.get("text") {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(parsed) => {
                response.insert("text".to_string(), parsed);
            }
            Err(_) => {
                tracing::debug!("tool response text is not valid JSON, leaving as string");
            }
        }
    }
    response
}

/// Builds the event for a classified span. `kind` is always one of the
/// eight base kinds the classifier produces — the agent-call heuristic
/// upgrades `ToolCallStart`/`ToolCallEnd` to `InvokeAgentStart`/
/// `InvokeAgentEnd` here, inside the factory, not the classifier.
pub fn build_event(
    kind: EventKind,
    ctx: &EventContext,
    attrs: &HashMap<String, AttrValue>,
) -> CommunicationEvent {
    match kind {
        EventKind::AgentStart => CommunicationEvent::AgentStart {
            header: header(ctx, EventKind::AgentStart, attrs),
        },
        EventKind::AgentEnd => CommunicationEvent::AgentEnd {
            header: header(ctx, EventKind::AgentEnd, attrs),
        },
        EventKind::LlmCallStart => CommunicationEvent::LlmCallStart {
            header: header(ctx, EventKind::LlmCallStart, attrs),
            model: attrs.get("model").and_then(AttrValue::as_str).unwrap_or("").to_string(),
            content: extract_llm_request_content(attrs),
        },
        EventKind::LlmCallEnd => CommunicationEvent::LlmCallEnd {
            header: header(ctx, EventKind::LlmCallEnd, attrs),
            content: extract_llm_response_content(attrs),
            usage_metadata: UsageMetadata::from_attrs(attrs),
        },
        EventKind::LlmCallError => CommunicationEvent::LlmCallError {
            header: header(ctx, EventKind::LlmCallError, attrs),
            model: attrs.get("model").and_then(AttrValue::as_str).unwrap_or("").to_string(),
            content: extract_llm_request_content(attrs),
            error: attrs.get("error").and_then(AttrValue::as_str).unwrap_or("").to_string(),
        },
        EventKind::ToolCallStart => {
            let tool_call = extract_tool_call(attrs);
            if is_agent_tool_call(attrs) {
                CommunicationEvent::InvokeAgentStart {
                    header: header(ctx, EventKind::InvokeAgentStart, attrs),
                    invoked_agent: extract_invoked_agent(attrs),
                    tool_call,
                }
            } else {
                CommunicationEvent::ToolCallStart {
                    header: header(ctx, EventKind::ToolCallStart, attrs),
                    tool_call,
                }
            }
        }
        EventKind::ToolCallEnd => {
            let tool_call = extract_tool_call(attrs);
            let response = unwrap_tool_response_text(extract_tool_response(attrs));
            if is_agent_tool_call(attrs) {
                CommunicationEvent::InvokeAgentEnd {
                    header: header(ctx, EventKind::InvokeAgentEnd, attrs),
                    invoked_agent: extract_invoked_agent(attrs),
                    tool_call,
                    response,
                }
            } else {
                CommunicationEvent::ToolCallEnd {
                    header: header(ctx, EventKind::ToolCallEnd, attrs),
                    tool_call,
                    response,
                }
            }
        }
        EventKind::ToolCallError => CommunicationEvent::ToolCallError {
            header: header(ctx, EventKind::ToolCallError, attrs),
            tool_call: extract_tool_call(attrs),
            error: attrs.get("error").and_then(AttrValue::as_str).unwrap_or("").to_string(),
        },
        EventKind::InvokeAgentStart | EventKind::InvokeAgentEnd => {
            unreachable!("classifier never produces invoke_agent kinds directly")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> AttrValue {
        AttrValue::String(v.to_string())
    }

    fn ctx() -> EventContext {
        EventContext {
            acting_agent: "alice".into(),
            conversation_id: "c1".into(),
            timestamp: "2023-11-14T22:13:20Z".into(),
            workforce_name: None,
        }
    }

    #[test]
    fn s1_agent_start_header_only() {
        let mut attrs = HashMap::new();
        attrs.insert("invocation_id".into(), s("inv-1"));
        let event = build_event(EventKind::AgentStart, &ctx(), &attrs);
        let json = event.to_dict();
        assert_eq!(json["event_type"], "agent_start");
        assert_eq!(json["acting_agent"], "alice");
        assert_eq!(json["conversation_id"], "c1");
        assert_eq!(json["invocation_id"], "inv-1");
        assert!(json["workforce_name"].is_null());
    }

    #[test]
    fn s2_llm_call_end_reconstructs_content_and_usage() {
        let mut attrs = HashMap::new();
        attrs.insert("llm_response.content.parts.0.text".into(), s("hello"));
        attrs.insert("llm_response.content.parts.0.thought".into(), AttrValue::Bool(false));
        attrs.insert("llm_response.content.role".into(), s("model"));
        attrs.insert(
            "llm_response.usage_metadata.total_token_count".into(),
            AttrValue::Int(42),
        );
        let event = build_event(EventKind::LlmCallEnd, &ctx(), &attrs);
        let json = event.to_dict();
        assert_eq!(json["event_type"], "llm_call_end");
        assert_eq!(json["content"]["role"], "model");
        assert_eq!(json["content"]["parts"][0]["text"], "hello");
        assert_eq!(json["usage_metadata"]["total_tokens"], 42);
        assert_eq!(json["usage_metadata"]["prompt_tokens"], 0);
    }

    #[test]
    fn s3_tool_call_end_unwraps_json_string_response() {
        let mut attrs = HashMap::new();
        attrs.insert("tool_name".into(), s("get_weather"));
        attrs.insert("args.city".into(), s("Munich"));
        attrs.insert("tool_response.text".into(), s(r#"{"temp":7}"#));
        let event = build_event(EventKind::ToolCallEnd, &ctx(), &attrs);
        let json = event.to_dict();
        assert_eq!(json["event_type"], "tool_call_end");
        assert_eq!(json["response"]["text"]["temp"], 7);
    }

    #[test]
    fn p10_non_json_tool_response_text_stays_a_string() {
        let mut attrs = HashMap::new();
        attrs.insert("tool_name".into(), s("get_weather"));
        attrs.insert("tool_response.text".into(), s("not json"));
        let event = build_event(EventKind::ToolCallEnd, &ctx(), &attrs);
        let json = event.to_dict();
        assert_eq!(json["response"]["text"], "not json");
    }

    #[test]
    fn s4_agent_tool_heuristic_upgrades_tool_call_start() {
        let mut attrs = HashMap::new();
        attrs.insert("tool_name".into(), s("cross_selling_agent"));
        attrs.insert("args.request".into(), s("Analyze cust001"));
        let event = build_event(EventKind::ToolCallStart, &ctx(), &attrs);
        let json = event.to_dict();
        assert_eq!(json["event_type"], "invoke_agent_start");
        assert_eq!(json["invoked_agent"], "cross_selling_agent");
        assert_eq!(json["tool_call"]["tool_name"], "cross_selling_agent");
    }

    #[test]
    fn s5_legacy_transfer_to_agent_upgrades_tool_call_end() {
        let mut attrs = HashMap::new();
        attrs.insert("tool_name".into(), s("transfer_to_agent"));
        attrs.insert("args.agent_name".into(), s("weather-agent"));
        let event = build_event(EventKind::ToolCallEnd, &ctx(), &attrs);
        let json = event.to_dict();
        assert_eq!(json["event_type"], "invoke_agent_end");
        assert_eq!(json["invoked_agent"], "weather-agent");
    }

    #[test]
    fn ordinary_multi_arg_tool_call_is_not_upgraded() {
        let mut attrs = HashMap::new();
        attrs.insert("tool_name".into(), s("search_web"));
        attrs.insert("args.query".into(), s("rust async"));
        attrs.insert("args.max_results".into(), AttrValue::Int(5));
        let event = build_event(EventKind::ToolCallStart, &ctx(), &attrs);
        assert_eq!(event.to_dict()["event_type"], "tool_call_start");
    }

    #[test]
    fn llm_call_error_carries_model_content_and_error() {
        let mut attrs = HashMap::new();
        attrs.insert("model".into(), s("gemini-pro"));
        attrs.insert("error".into(), s("rate limited"));
        attrs.insert("llm_request.content.parts.0.text".into(), s("hi"));
        let event = build_event(EventKind::LlmCallError, &ctx(), &attrs);
        let json = event.to_dict();
        assert_eq!(json["event_type"], "llm_call_error");
        assert_eq!(json["model"], "gemini-pro");
        assert_eq!(json["error"], "rate limited");
        assert_eq!(json["content"]["content"][0]["text"], "hi");
    }
}
