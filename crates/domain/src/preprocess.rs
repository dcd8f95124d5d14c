//! The preprocessor driver: walks an OTLP export request's span tree and
//! turns the relevant spans into communication events (spec.md §4.6).

use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;

use crate::attrs::flatten_attributes;
use crate::classifier::{classify_span, convert_timestamp};
use crate::event::CommunicationEvent;
use crate::factory::{build_event, EventContext};

const WORKFORCE_ATTR: &str = "agentic_layer.workforce";

/// Walks `resource_spans[*].scope_spans[*].spans[*]`, classifying and
/// building an event for every span that passes the classifier's gates.
/// Never panics; spans it drops are logged at `debug`, a span whose
/// timestamp can't convert is logged at `warn` and dropped too.
///
/// Returns events in the order their spans were encountered — no ordering
/// guarantee is made across resources or scopes beyond that traversal
/// order (spec.md §5).
pub fn preprocess(request: &ExportTraceServiceRequest) -> Vec<CommunicationEvent> {
    let mut events = Vec::new();

    let span_count: usize = request
        .resource_spans
        .iter()
        .flat_map(|rs| rs.scope_spans.iter())
        .map(|ss| ss.spans.len())
        .sum();
    tracing::debug!(span_count, "processing spans for communication events");

    for resource_spans in &request.resource_spans {
        let workforce_name = resource_spans
            .resource
            .as_ref()
            .and_then(|resource| {
                flatten_attributes(&resource.attributes)
                    .get(WORKFORCE_ATTR)
                    .and_then(|v| v.as_str().map(str::to_string))
            });

        for scope_spans in &resource_spans.scope_spans {
            for span in &scope_spans.spans {
                let attrs = flatten_attributes(&span.attributes);

                let Some(kind) = classify_span(&span.name, &attrs) else {
                    continue;
                };

                let Some(timestamp) = convert_timestamp(span.start_time_unix_nano as i64) else {
                    tracing::warn!(
                        span_name = %span.name,
                        start_time_unix_nano = span.start_time_unix_nano,
                        "timestamp overflow, dropping span"
                    );
                    continue;
                };

                let acting_agent = attrs
                    .get("agent_name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let conversation_id = attrs
                    .get("conversation_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();

                let ctx = EventContext {
                    acting_agent,
                    conversation_id,
                    timestamp,
                    workforce_name: workforce_name.clone(),
                };

                let event = build_event(kind, &ctx, &attrs);
                tracing::debug!(
                    event_type = event.event_type(),
                    acting_agent = %event.header().acting_agent,
                    conversation_id = event.conversation_id(),
                    "created communication event"
                );
                events.push(event);
            }
        }
    }

    tracing::debug!(
        events = events.len(),
        spans = span_count,
        "generated communication events"
    );
    events
}
