//! Per-subscriber filter predicate, evaluated once per published event.

use serde::Deserialize;
use std::collections::HashMap;

use crate::event::CommunicationEvent;

/// Exact-match filter on a subscriber's recognized fields. A `None` field
/// means "no constraint on this field" — an all-`None` criteria matches
/// every event. Extension is additive: new fields default to `None`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct FilterCriteria {
    pub conversation_id: Option<String>,
    pub workforce: Option<String>,
}

impl FilterCriteria {
    pub fn new(conversation_id: Option<String>, workforce: Option<String>) -> Self {
        Self {
            conversation_id,
            workforce,
        }
    }

    /// Parses filter criteria from WebSocket query parameters. Unknown
    /// parameters are ignored; empty strings are treated the same as an
    /// absent parameter (no constraint).
    pub fn from_query_params(params: &HashMap<String, String>) -> Self {
        let non_empty = |key: &str| {
            params
                .get(key)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            conversation_id: non_empty("conversation_id"),
            workforce: non_empty("workforce"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conversation_id.is_none() && self.workforce.is_none()
    }

    /// True when every set field matches the event's corresponding
    /// attribute exactly.
    pub fn matches(&self, event: &CommunicationEvent) -> bool {
        if let Some(conversation_id) = &self.conversation_id {
            if event.conversation_id() != conversation_id {
                return false;
            }
        }
        if let Some(workforce) = &self.workforce {
            if event.workforce_name() != Some(workforce.as_str()) {
                return false;
            }
        }
        true
    }

    /// A human-readable summary for connect-time logging, e.g.
    /// `conversation_id=c1, workforce=foo` or `no filter (all events)`.
    pub fn describe(&self) -> String {
        if self.is_empty() {
            return "no filter (all events)".to_string();
        }
        let mut parts = Vec::new();
        if let Some(c) = &self.conversation_id {
            parts.push(format!("conversation_id={c}"));
        }
        if let Some(w) = &self.workforce {
            parts.push(format!("workforce={w}"));
        }
        parts.join(", ")
    }
}
