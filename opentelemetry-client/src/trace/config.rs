//! Span limits
//!
//! Limits cap how much a single span can hold. Anything added past a limit is
//! dropped and counted on the span instead.
use crate::util::count_limit_from_env;

const OTEL_ATTRIBUTE_COUNT_LIMIT: &str = "OTEL_ATTRIBUTE_COUNT_LIMIT";
const OTEL_SPAN_ATTRIBUTE_COUNT_LIMIT: &str = "OTEL_SPAN_ATTRIBUTE_COUNT_LIMIT";
const OTEL_SPAN_EVENT_COUNT_LIMIT: &str = "OTEL_SPAN_EVENT_COUNT_LIMIT";

pub(crate) const DEFAULT_MAX_EVENT_PER_SPAN: usize = 128;
pub(crate) const DEFAULT_MAX_ATTRIBUTES_PER_SPAN: usize = 128;
pub(crate) const DEFAULT_MAX_ATTRIBUTES_PER_EVENT: usize = 128;

/// Span limit configuration to keep attributes and events to reasonable numbers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct SpanLimits {
    /// The max events that can be added to a `Span`.
    pub max_events_per_span: usize,
    /// The max attributes that can be added to a `Span`.
    pub max_attributes_per_span: usize,
    /// The max attributes that can be added into an `Event`
    pub max_attributes_per_event: usize,
}

impl Default for SpanLimits {
    fn default() -> Self {
        SpanLimits {
            max_events_per_span: DEFAULT_MAX_EVENT_PER_SPAN,
            max_attributes_per_span: DEFAULT_MAX_ATTRIBUTES_PER_SPAN,
            max_attributes_per_event: DEFAULT_MAX_ATTRIBUTES_PER_EVENT,
        }
    }
}

impl SpanLimits {
    /// Limits read from the environment.
    ///
    /// `OTEL_SPAN_ATTRIBUTE_COUNT_LIMIT` takes precedence over the generic
    /// `OTEL_ATTRIBUTE_COUNT_LIMIT`, which also caps event attributes.
    /// `OTEL_SPAN_EVENT_COUNT_LIMIT` caps events. Values that do not parse are
    /// ignored.
    pub fn from_env() -> Self {
        let generic = count_limit_from_env(OTEL_ATTRIBUTE_COUNT_LIMIT);
        SpanLimits {
            max_events_per_span: count_limit_from_env(OTEL_SPAN_EVENT_COUNT_LIMIT)
                .unwrap_or(DEFAULT_MAX_EVENT_PER_SPAN),
            max_attributes_per_span: count_limit_from_env(OTEL_SPAN_ATTRIBUTE_COUNT_LIMIT)
                .or(generic)
                .unwrap_or(DEFAULT_MAX_ATTRIBUTES_PER_SPAN),
            max_attributes_per_event: generic.unwrap_or(DEFAULT_MAX_ATTRIBUTES_PER_EVENT),
        }
    }

    /// Replace the per-span attribute limit.
    pub fn with_max_attributes_per_span(mut self, limit: usize) -> Self {
        self.max_attributes_per_span = limit;
        self
    }

    /// Replace the per-span event limit.
    pub fn with_max_events_per_span(mut self, limit: usize) -> Self {
        self.max_events_per_span = limit;
        self
    }

    /// Replace the per-event attribute limit.
    pub fn with_max_attributes_per_event(mut self, limit: usize) -> Self {
        self.max_attributes_per_event = limit;
        self
    }
}
