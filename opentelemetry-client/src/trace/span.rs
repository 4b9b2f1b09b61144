//! # Span
//!
//! `Span`s represent a single operation within a trace. `Span`s can be nested to form a trace
//! tree. Each trace contains a root span, which typically describes the end-to-end latency and,
//! optionally, one or more sub-spans for its sub-operations.
//!
//! The `Span`'s start and end timestamps reflect the elapsed real time of the operation. A `Span`'s
//! start time is set to the current time on span creation. After the `Span` is created, it
//! is possible to change its name, set its attributes, and add events. These cannot be changed
//! after the `Span`'s end time has been set.
//!
//! A `Span` that goes out of scope without being ended is ended on drop. If the
//! thread is panicking at that point, the span's status is set to `Error`.
use crate::trace::{SdkTracer, SpanData, SpanLimits};
use opentelemetry::otel_debug;
use opentelemetry::trace::{Event, SpanContext, SpanId, SpanKind, Status};
use opentelemetry::{Key, KeyValue};
use std::borrow::Cow;
use std::fmt;
use std::time::SystemTime;

const EXCEPTION_EVENT_NAME: &str = "exception";
const EXCEPTION_MESSAGE: &str = "exception.message";
const EXCEPTION_TYPE: &str = "exception.type";

/// Single operation within a trace.
#[derive(Debug)]
pub struct Span {
    span_context: SpanContext,
    data: Option<SpanRecording>,
    tracer: SdkTracer,
    span_limits: SpanLimits,
}

/// What a span records until it ends.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SpanRecording {
    pub(crate) parent_span_id: SpanId,
    pub(crate) span_kind: SpanKind,
    pub(crate) name: Cow<'static, str>,
    pub(crate) start_time: SystemTime,
    pub(crate) attributes: Vec<KeyValue>,
    pub(crate) dropped_attributes_count: u32,
    pub(crate) events: Vec<Event>,
    pub(crate) dropped_events_count: u32,
    pub(crate) status: Status,
}

impl Span {
    pub(crate) fn new(
        span_context: SpanContext,
        data: SpanRecording,
        tracer: SdkTracer,
        span_limits: SpanLimits,
    ) -> Self {
        Span {
            span_context,
            data: Some(data),
            tracer,
            span_limits,
        }
    }

    /// Operate on a mutable reference to span data
    fn with_data<T, F>(&mut self, f: F) -> Option<T>
    where
        F: FnOnce(&mut SpanRecording) -> T,
    {
        self.data.as_mut().map(f)
    }

    /// Returns the `SpanContext` for the given `Span`.
    pub fn span_context(&self) -> &SpanContext {
        &self.span_context
    }

    /// Returns true until the span has ended.
    pub fn is_recording(&self) -> bool {
        self.data.is_some()
    }

    /// Sets a single attribute. Setting a key that is already present replaces
    /// its value; new keys past the span's limit are dropped and counted.
    pub fn set_attribute(&mut self, attribute: KeyValue) {
        let limit = self.span_limits.max_attributes_per_span;
        self.with_data(|data| {
            if let Some(existing) = data
                .attributes
                .iter_mut()
                .find(|existing| existing.key == attribute.key)
            {
                *existing = attribute;
            } else if data.attributes.len() < limit {
                data.attributes.push(attribute);
            } else {
                data.dropped_attributes_count = data.dropped_attributes_count.saturating_add(1);
            }
        });
    }

    /// Sets several attributes, see [`Span::set_attribute`].
    pub fn set_attributes(&mut self, attributes: impl IntoIterator<Item = KeyValue>) {
        for attribute in attributes {
            self.set_attribute(attribute);
        }
    }

    /// Records an event at the current time.
    pub fn add_event(&mut self, name: impl Into<Cow<'static, str>>, attributes: Vec<KeyValue>) {
        self.add_event_with_timestamp(name, SystemTime::now(), attributes);
    }

    /// Records an event at a specific time.
    pub fn add_event_with_timestamp(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        timestamp: SystemTime,
        mut attributes: Vec<KeyValue>,
    ) {
        let events_limit = self.span_limits.max_events_per_span;
        let attributes_limit = self.span_limits.max_attributes_per_event;
        self.with_data(|data| {
            if data.events.len() < events_limit {
                let dropped_attributes_count = attributes.len().saturating_sub(attributes_limit);
                attributes.truncate(attributes_limit);
                data.events.push(Event::new(
                    name,
                    timestamp,
                    attributes,
                    dropped_attributes_count as u32,
                ));
            } else {
                data.dropped_events_count = data.dropped_events_count.saturating_add(1);
            }
        });
    }

    /// Records `err` as an `exception` event and sets the status to `Error`.
    pub fn record_error<E: fmt::Display + ?Sized>(&mut self, err: &E) {
        let message = err.to_string();
        self.add_event(
            EXCEPTION_EVENT_NAME,
            vec![
                KeyValue::new(Key::from_static_str(EXCEPTION_MESSAGE), message.clone()),
                KeyValue::new(
                    Key::from_static_str(EXCEPTION_TYPE),
                    std::any::type_name::<E>(),
                ),
            ],
        );
        self.set_status(Status::error(message));
    }

    /// Sets the status of this `Span`.
    ///
    /// `Ok` is final. `Error` replaces `Unset` or an earlier `Error`. Setting
    /// `Unset` has no effect.
    pub fn set_status(&mut self, status: Status) {
        self.with_data(|data| {
            if matches!(data.status, Status::Ok) || matches!(status, Status::Unset) {
                return;
            }
            data.status = status;
        });
    }

    /// Updates the `Span`'s name.
    pub fn update_name(&mut self, new_name: impl Into<Cow<'static, str>>) {
        self.with_data(|data| data.name = new_name.into());
    }

    /// Ends the span at the current time and hands it to the span processors.
    /// Ending twice has no effect.
    pub fn end(&mut self) {
        self.ensure_ended_and_exported(None);
    }

    /// Ends the span at `timestamp`.
    pub fn end_with_timestamp(&mut self, timestamp: SystemTime) {
        self.ensure_ended_and_exported(Some(timestamp));
    }

    fn ensure_ended_and_exported(&mut self, timestamp: Option<SystemTime>) {
        // Take data, skip if it has already been exported
        let Some(data) = self.data.take() else {
            return;
        };
        let end_time = timestamp.unwrap_or_else(SystemTime::now);
        end_and_export_span(data, &self.span_context, &self.tracer, end_time);
    }
}

impl Drop for Span {
    /// Report span on inner drop
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.set_status(Status::error("panicked"));
        }
        self.ensure_ended_and_exported(None);
    }
}

fn end_and_export_span(
    data: SpanRecording,
    span_context: &SpanContext,
    tracer: &SdkTracer,
    end_time: SystemTime,
) {
    let provider = tracer.provider();
    if provider.is_shutdown() {
        otel_debug!(
            name: "Span.End.AfterShutdown",
            span_name = format!("{}", data.name)
        );
        return;
    }

    let span_data = SpanData {
        trace_id: span_context.trace_id(),
        span_id: span_context.span_id(),
        parent_span_id: data.parent_span_id,
        span_kind: data.span_kind,
        name: data.name,
        start_time: data.start_time,
        end_time,
        attributes: data.attributes,
        dropped_attributes_count: data.dropped_attributes_count,
        events: data.events,
        dropped_events_count: data.dropped_events_count,
        status: data.status,
        instrumentation_scope: tracer.instrumentation_scope().clone(),
    };

    match provider.span_processors() {
        [] => {}
        [processor] => processor.on_end(span_data),
        [rest @ .., last] => {
            for processor in rest {
                processor.on_end(span_data.clone());
            }
            last.on_end(span_data);
        }
    }
}
