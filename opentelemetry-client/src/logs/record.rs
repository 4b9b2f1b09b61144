use crate::util::count_limit_from_env;
use opentelemetry::{
    logs::{AnyValue, Severity},
    trace::{SpanId, TraceFlags, TraceId},
    Key,
};
use std::{borrow::Cow, time::SystemTime};

pub(crate) const DEFAULT_MAX_ATTRIBUTES_PER_LOG: usize = 128;

const OTEL_ATTRIBUTE_COUNT_LIMIT: &str = "OTEL_ATTRIBUTE_COUNT_LIMIT";
const OTEL_LOGRECORD_ATTRIBUTE_COUNT_LIMIT: &str = "OTEL_LOGRECORD_ATTRIBUTE_COUNT_LIMIT";

/// Limits applied to every log record created by a logger.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct LogRecordLimits {
    /// The max attributes that can be added to a log record. Attributes added
    /// beyond the limit are dropped and counted.
    pub max_attributes: usize,
}

impl Default for LogRecordLimits {
    fn default() -> Self {
        LogRecordLimits {
            max_attributes: DEFAULT_MAX_ATTRIBUTES_PER_LOG,
        }
    }
}

impl LogRecordLimits {
    /// Limits from `OTEL_LOGRECORD_ATTRIBUTE_COUNT_LIMIT`, falling back to
    /// `OTEL_ATTRIBUTE_COUNT_LIMIT` and then to the default. Values that do
    /// not parse are ignored.
    pub fn from_env() -> Self {
        let max_attributes = count_limit_from_env(OTEL_LOGRECORD_ATTRIBUTE_COUNT_LIMIT)
            .or_else(|| count_limit_from_env(OTEL_ATTRIBUTE_COUNT_LIMIT))
            .unwrap_or(DEFAULT_MAX_ATTRIBUTES_PER_LOG);
        LogRecordLimits { max_attributes }
    }

    /// Replace the attribute limit.
    pub fn with_max_attributes(mut self, max_attributes: usize) -> Self {
        self.max_attributes = max_attributes;
        self
    }
}

/// TraceContext stores the trace data for logs that have an associated
/// span.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct TraceContext {
    /// Trace id
    pub trace_id: TraceId,
    /// Span Id
    pub span_id: SpanId,
    /// Trace flags
    pub trace_flags: Option<TraceFlags>,
}

/// A log record, as produced by an [`SdkLogger`](super::SdkLogger) and handed
/// to [`LogExporter`](super::LogExporter)s.
///
/// Fields are set before the record is emitted. Once emitted the record is
/// owned by the processors and never changes again.
#[derive(Debug, Clone, PartialEq)]
pub struct SdkLogRecord {
    pub(crate) event_name: Option<&'static str>,
    pub(crate) target: Option<Cow<'static, str>>,
    pub(crate) timestamp: Option<SystemTime>,
    pub(crate) observed_timestamp: Option<SystemTime>,
    pub(crate) trace_context: Option<TraceContext>,
    pub(crate) severity_text: Option<&'static str>,
    pub(crate) severity_number: Option<Severity>,
    pub(crate) body: Option<AnyValue>,
    pub(crate) attributes: Vec<(Key, AnyValue)>,
    pub(crate) dropped_attributes_count: u32,
    max_attributes: usize,
}

impl SdkLogRecord {
    pub(crate) fn new(limits: LogRecordLimits) -> Self {
        SdkLogRecord {
            event_name: None,
            target: None,
            timestamp: None,
            observed_timestamp: None,
            trace_context: None,
            severity_text: None,
            severity_number: None,
            body: None,
            attributes: Vec::new(),
            dropped_attributes_count: 0,
            max_attributes: limits.max_attributes,
        }
    }

    /// Sets the event name of the record.
    pub fn set_event_name(&mut self, name: &'static str) {
        self.event_name = Some(name);
    }

    /// Sets the target, usually the module the record originates from.
    pub fn set_target<T: Into<Cow<'static, str>>>(&mut self, target: T) {
        self.target = Some(target.into());
    }

    /// Sets the time the event occurred.
    pub fn set_timestamp(&mut self, timestamp: SystemTime) {
        self.timestamp = Some(timestamp);
    }

    /// Sets the time the event was observed. Filled in on emit if unset.
    pub fn set_observed_timestamp(&mut self, timestamp: SystemTime) {
        self.observed_timestamp = Some(timestamp);
    }

    /// Sets severity as text.
    pub fn set_severity_text(&mut self, severity_text: &'static str) {
        self.severity_text = Some(severity_text);
    }

    /// Sets severity as a numeric value.
    pub fn set_severity_number(&mut self, severity_number: Severity) {
        self.severity_number = Some(severity_number);
    }

    /// Sets the message body of the log.
    pub fn set_body(&mut self, body: AnyValue) {
        self.body = Some(body);
    }

    /// Correlates the record with a span.
    pub fn set_trace_context(
        &mut self,
        trace_id: TraceId,
        span_id: SpanId,
        trace_flags: Option<TraceFlags>,
    ) {
        self.trace_context = Some(TraceContext {
            trace_id,
            span_id,
            trace_flags,
        });
    }

    /// Adds a single attribute. Once the attribute limit is reached further
    /// attributes are dropped and counted.
    pub fn add_attribute<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Key>,
        V: Into<AnyValue>,
    {
        if self.attributes.len() < self.max_attributes {
            self.attributes.push((key.into(), value.into()));
        } else {
            self.dropped_attributes_count = self.dropped_attributes_count.saturating_add(1);
        }
    }

    /// Adds multiple attributes.
    pub fn add_attributes<I, K, V>(&mut self, attributes: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<AnyValue>,
    {
        for (key, value) in attributes {
            self.add_attribute(key, value);
        }
    }

    /// Returns the event name.
    pub fn event_name(&self) -> Option<&'static str> {
        self.event_name
    }

    /// Returns the target.
    pub fn target(&self) -> Option<&Cow<'static, str>> {
        self.target.as_ref()
    }

    /// Returns the time the event occurred.
    pub fn timestamp(&self) -> Option<SystemTime> {
        self.timestamp
    }

    /// Returns the time the event was observed.
    pub fn observed_timestamp(&self) -> Option<SystemTime> {
        self.observed_timestamp
    }

    /// Returns the trace context, if the record is correlated with a span.
    pub fn trace_context(&self) -> Option<&TraceContext> {
        self.trace_context.as_ref()
    }

    /// Returns severity as text.
    pub fn severity_text(&self) -> Option<&'static str> {
        self.severity_text
    }

    /// Returns the numeric severity.
    pub fn severity_number(&self) -> Option<Severity> {
        self.severity_number
    }

    /// Returns the body.
    pub fn body(&self) -> Option<&AnyValue> {
        self.body.as_ref()
    }

    /// Iterates over the attributes in the order they were added.
    pub fn attributes_iter(&self) -> impl Iterator<Item = &(Key, AnyValue)> {
        self.attributes.iter()
    }

    /// Number of attributes that were dropped because of the attribute limit.
    pub fn dropped_attributes_count(&self) -> u32 {
        self.dropped_attributes_count
    }

    /// Whether an attribute with `key` and `value` is present.
    pub fn attributes_contains(&self, key: &Key, value: &AnyValue) -> bool {
        self.attributes
            .iter()
            .any(|(k, v)| k == key && v == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_beyond_limit_are_dropped_and_counted() {
        let mut record = SdkLogRecord::new(LogRecordLimits::default().with_max_attributes(2));
        record.add_attributes([("a", 1), ("b", 2)]);
        record.add_attribute("c", 3);
        record.add_attribute("d", "four");

        let keys: Vec<&str> = record.attributes_iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(record.dropped_attributes_count(), 2);
        assert!(record.attributes_contains(&Key::new("a"), &AnyValue::Int(1)));
    }

    #[test]
    fn setters_populate_fields() {
        let mut record = SdkLogRecord::new(LogRecordLimits::default());
        let now = SystemTime::now();
        record.set_event_name("order.placed");
        record.set_target("checkout::api");
        record.set_timestamp(now);
        record.set_severity_number(Severity::Warn);
        record.set_severity_text("WARN");
        record.set_body("stock low".into());
        record.set_trace_context(
            TraceId::from_bytes(7u128.to_be_bytes()),
            SpanId::from_bytes(9u64.to_be_bytes()),
            Some(TraceFlags::SAMPLED),
        );

        assert_eq!(record.event_name(), Some("order.placed"));
        assert_eq!(record.target().map(|t| t.as_ref()), Some("checkout::api"));
        assert_eq!(record.timestamp(), Some(now));
        assert_eq!(record.observed_timestamp(), None);
        assert_eq!(record.severity_number(), Some(Severity::Warn));
        assert_eq!(record.severity_text(), Some("WARN"));
        assert_eq!(record.body(), Some(&AnyValue::from("stock low")));
        let context = record.trace_context().unwrap();
        assert_eq!(context.trace_id, TraceId::from_bytes(7u128.to_be_bytes()));
        assert_eq!(context.span_id, SpanId::from_bytes(9u64.to_be_bytes()));
    }

    #[test]
    fn limits_read_from_env() {
        temp_env::with_vars(
            [
                (OTEL_ATTRIBUTE_COUNT_LIMIT, Some("10")),
                (OTEL_LOGRECORD_ATTRIBUTE_COUNT_LIMIT, None),
            ],
            || assert_eq!(LogRecordLimits::from_env().max_attributes, 10),
        );
        temp_env::with_vars(
            [
                (OTEL_ATTRIBUTE_COUNT_LIMIT, Some("10")),
                (OTEL_LOGRECORD_ATTRIBUTE_COUNT_LIMIT, Some(" 3 ")),
            ],
            || assert_eq!(LogRecordLimits::from_env().max_attributes, 3),
        );
        temp_env::with_vars(
            [
                (OTEL_ATTRIBUTE_COUNT_LIMIT, Some("many")),
                (OTEL_LOGRECORD_ATTRIBUTE_COUNT_LIMIT, None),
            ],
            || {
                assert_eq!(
                    LogRecordLimits::from_env().max_attributes,
                    DEFAULT_MAX_ATTRIBUTES_PER_LOG
                )
            },
        );
    }
}
