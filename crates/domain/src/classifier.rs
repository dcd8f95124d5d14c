//! Maps a span's name and attributes to an [`EventKind`], gating on the
//! dashboard flag and the two required header attributes (spec.md §4.4).

use std::collections::HashMap;

use crate::attrs::AttrValue;
use crate::event::EventKind;

fn is_truthy(value: &AttrValue) -> bool {
    match value {
        AttrValue::Bool(b) => *b,
        AttrValue::String(s) => s.eq_ignore_ascii_case("true"),
        AttrValue::Int(n) => *n != 0,
        AttrValue::Double(d) => *d != 0.0,
    }
}

/// First-match-wins prefix rules on the lower-cased span name. Only
/// produces the eight base kinds — `InvokeAgentStart`/`InvokeAgentEnd` are
/// an upgrade applied later by the event factory.
fn classify_name(span_name: &str) -> Option<EventKind> {
    let lower = span_name.to_lowercase();
    if lower.starts_with("before_agent") {
        Some(EventKind::AgentStart)
    } else if lower.starts_with("after_agent") {
        Some(EventKind::AgentEnd)
    } else if lower.starts_with("before_model") || lower.starts_with("before_llm") {
        Some(EventKind::LlmCallStart)
    } else if lower.starts_with("after_model") || lower.starts_with("after_llm") {
        Some(EventKind::LlmCallEnd)
    } else if lower.starts_with("on_model_error") {
        Some(EventKind::LlmCallError)
    } else if lower.starts_with("before_tool") {
        Some(EventKind::ToolCallStart)
    } else if lower.starts_with("after_tool") {
        Some(EventKind::ToolCallEnd)
    } else if lower.starts_with("on_tool_error") {
        Some(EventKind::ToolCallError)
    } else {
        None
    }
}

/// Classifies a span into an event kind, or `None` if it should be dropped.
///
/// Gating order matches spec.md §4.4: the dashboard flag, then the two
/// required header attributes, then the span name. A span failing any
/// check produces no event — it is never an error, only a debug log.
pub fn classify_span(span_name: &str, attrs: &HashMap<String, AttrValue>) -> Option<EventKind> {
    let dashboard = attrs
        .get("agent_communication_dashboard")
        .map(is_truthy)
        .unwrap_or(false);
    if !dashboard {
        tracing::debug!(span_name, "skipping span: missing agent_communication_dashboard flag");
        return None;
    }

    let conversation_id = attrs.get("conversation_id").and_then(AttrValue::as_str).unwrap_or("");
    let agent_name = attrs.get("agent_name").and_then(AttrValue::as_str).unwrap_or("");
    if conversation_id.is_empty() || agent_name.is_empty() {
        tracing::debug!(
            span_name,
            has_conversation_id = !conversation_id.is_empty(),
            has_agent_name = !agent_name.is_empty(),
            "skipping span: missing required attributes"
        );
        return None;
    }

    let kind = classify_name(span_name);
    if kind.is_none() {
        tracing::debug!(span_name, "skipping span: unrecognized communication event pattern");
    }
    kind
}

/// Converts a span's `start_time_unix_nano` into the ISO-8601 UTC timestamp
/// string the event header carries. `None` on a negative value or one that
/// overflows the platform's time representation (spec.md §4.4 step 4, §7).
pub fn convert_timestamp(unix_nano: i64) -> Option<String> {
    if unix_nano < 0 {
        return None;
    }
    let secs = unix_nano / 1_000_000_000;
    let nanos = (unix_nano % 1_000_000_000) as u32;
    let dt = chrono::DateTime::from_timestamp(secs, nanos)?;
    if nanos == 0 {
        Some(dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
    } else {
        Some(dt.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true))
    }
}
