//! The communication event model: a discriminated union of the nine span
//! kinds this service recognizes, with a header common to all of them.
//!
//! Serialization must flatten the header into the event object rather than
//! nest it — consumers of the JSON expect `acting_agent`, `event_type`, etc.
//! as siblings of the payload fields, not under a nested `"header"` key.

use serde::Serialize;

use crate::content::{LlmRequestContent, LlmResponseContent, ToolCall, UsageMetadata};

/// The fixed set of event kinds a span can be classified into.
///
/// `InvokeAgentStart`/`InvokeAgentEnd` are never produced by the classifier
/// directly — they're an upgrade the event factory applies to a
/// `ToolCallStart`/`ToolCallEnd` span when the agent-call heuristic fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AgentStart,
    AgentEnd,
    LlmCallStart,
    LlmCallEnd,
    LlmCallError,
    ToolCallStart,
    ToolCallEnd,
    ToolCallError,
    InvokeAgentStart,
    InvokeAgentEnd,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AgentStart => "agent_start",
            EventKind::AgentEnd => "agent_end",
            EventKind::LlmCallStart => "llm_call_start",
            EventKind::LlmCallEnd => "llm_call_end",
            EventKind::LlmCallError => "llm_call_error",
            EventKind::ToolCallStart => "tool_call_start",
            EventKind::ToolCallEnd => "tool_call_end",
            EventKind::ToolCallError => "tool_call_error",
            EventKind::InvokeAgentStart => "invoke_agent_start",
            EventKind::InvokeAgentEnd => "invoke_agent_end",
        }
    }
}

/// Fields common to every event, populated only for spans that pass the
/// classifier's gating checks (spec.md §3's "Invariants").
#[derive(Debug, Clone, Serialize)]
pub struct EventHeader {
    pub acting_agent: String,
    pub conversation_id: String,
    pub timestamp: String,
    pub event_type: String,
    pub invocation_id: String,
    pub workforce_name: Option<String>,
}

impl EventHeader {
    pub fn new(
        kind: EventKind,
        acting_agent: impl Into<String>,
        conversation_id: impl Into<String>,
        timestamp: impl Into<String>,
        invocation_id: impl Into<String>,
        workforce_name: Option<String>,
    ) -> Self {
        Self {
            acting_agent: acting_agent.into(),
            conversation_id: conversation_id.into(),
            timestamp: timestamp.into(),
            event_type: kind.as_str().to_string(),
            invocation_id: invocation_id.into(),
            workforce_name,
        }
    }
}

/// One communication event. No `"kind"` discriminator tag is added on top of
/// `event_type` — `#[serde(untagged)]` plus `#[serde(flatten)]` on every
/// variant's header produces exactly the field-for-field shape spec.md §9
/// calls for.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CommunicationEvent {
    AgentStart {
        #[serde(flatten)]
        header: EventHeader,
    },
    AgentEnd {
        #[serde(flatten)]
        header: EventHeader,
    },
    LlmCallStart {
        #[serde(flatten)]
        header: EventHeader,
        model: String,
        content: LlmRequestContent,
    },
    LlmCallEnd {
        #[serde(flatten)]
        header: EventHeader,
        content: LlmResponseContent,
        usage_metadata: UsageMetadata,
    },
    LlmCallError {
        #[serde(flatten)]
        header: EventHeader,
        model: String,
        content: LlmRequestContent,
        error: String,
    },
    ToolCallStart {
        #[serde(flatten)]
        header: EventHeader,
        tool_call: ToolCall,
    },
    ToolCallEnd {
        #[serde(flatten)]
        header: EventHeader,
        tool_call: ToolCall,
        response: std::collections::HashMap<String, serde_json::Value>,
    },
    ToolCallError {
        #[serde(flatten)]
        header: EventHeader,
        tool_call: ToolCall,
        error: String,
    },
    InvokeAgentStart {
        #[serde(flatten)]
        header: EventHeader,
        tool_call: ToolCall,
        invoked_agent: String,
    },
    InvokeAgentEnd {
        #[serde(flatten)]
        header: EventHeader,
        tool_call: ToolCall,
        response: std::collections::HashMap<String, serde_json::Value>,
        invoked_agent: String,
    },
}

impl CommunicationEvent {
    pub fn header(&self) -> &EventHeader {
        match self {
            CommunicationEvent::AgentStart { header }
            | CommunicationEvent::AgentEnd { header }
            | CommunicationEvent::LlmCallStart { header, .. }
            | CommunicationEvent::LlmCallEnd { header, .. }
            | CommunicationEvent::LlmCallError { header, .. }
            | CommunicationEvent::ToolCallStart { header, .. }
            | CommunicationEvent::ToolCallEnd { header, .. }
            | CommunicationEvent::ToolCallError { header, .. }
            | CommunicationEvent::InvokeAgentStart { header, .. }
            | CommunicationEvent::InvokeAgentEnd { header, .. } => header,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.header().conversation_id
    }

    pub fn workforce_name(&self) -> Option<&str> {
        self.header().workforce_name.as_deref()
    }

    pub fn event_type(&self) -> &str {
        &self.header().event_type
    }

    /// The event's field-for-field JSON serialization, matching spec.md's
    /// `to_dict` — the form both the welcome-frame echo and `publish` use.
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(kind: EventKind) -> EventHeader {
        EventHeader::new(kind, "alice", "c1", "2023-11-14T22:13:20Z", "inv-1", None)
    }

    #[test]
    fn agent_start_serializes_header_fields_as_siblings() {
        let event = CommunicationEvent::AgentStart {
            header: header(EventKind::AgentStart),
        };
        let json = event.to_dict();
        assert_eq!(json["event_type"], "agent_start");
        assert_eq!(json["acting_agent"], "alice");
        assert_eq!(json["conversation_id"], "c1");
        assert!(json.get("header").is_none());
    }

    #[test]
    fn workforce_name_serializes_as_null_when_absent() {
        let event = CommunicationEvent::AgentStart {
            header: header(EventKind::AgentStart),
        };
        let json = event.to_dict();
        assert!(json["workforce_name"].is_null());
    }

    #[test]
    fn header_accessor_matches_all_variants() {
        let events = vec![
            CommunicationEvent::AgentStart {
                header: header(EventKind::AgentStart),
            },
            CommunicationEvent::LlmCallStart {
                header: header(EventKind::LlmCallStart),
                model: "gemini-pro".into(),
                content: LlmRequestContent::default(),
            },
        ];
        for event in &events {
            assert_eq!(event.conversation_id(), "c1");
        }
    }

    #[test]
    fn round_trips_header_fields_through_to_dict() {
        let h = header(EventKind::ToolCallStart);
        let event = CommunicationEvent::ToolCallStart {
            header: h.clone(),
            tool_call: ToolCall::default(),
        };
        let json = event.to_dict();
        assert_eq!(json["acting_agent"], h.acting_agent);
        assert_eq!(json["conversation_id"], h.conversation_id);
        assert_eq!(json["timestamp"], h.timestamp);
        assert_eq!(json["invocation_id"], h.invocation_id);
    }
}
