//! Trace exporters
use crate::batch::BatchExporter;
use crate::error::OTelSdkResult;
use crate::Resource;
use opentelemetry::trace::{Event, SpanId, SpanKind, Status, TraceId};
use opentelemetry::{InstrumentationScope, KeyValue};
use std::borrow::Cow;
use std::fmt::Debug;
use std::future::Future;
use std::time::SystemTime;

/// `SpanExporter` defines the interface that protocol-specific exporters must
/// implement so that they can be plugged into the client and export finished
/// spans.
///
/// Exporters are owned by a single batch worker: `export` is never called
/// again before the previous call has completed.
pub trait SpanExporter: Send + Sync + Debug {
    /// Exports a batch of finished spans.
    ///
    /// The returned future must eventually complete. The batch processor
    /// abandons it once the export timeout has elapsed and reports the batch
    /// as failed.
    fn export(&self, batch: Vec<SpanData>) -> impl Future<Output = OTelSdkResult> + Send;

    /// Shuts down the exporter, releasing its transport.
    fn shutdown(&mut self) -> impl Future<Output = OTelSdkResult> + Send {
        async { Ok(()) }
    }

    /// Set the resource for the exporter.
    fn set_resource(&mut self, _resource: &Resource) {}
}

impl<E: SpanExporter + 'static> BatchExporter<SpanData> for E {
    fn export(&self, batch: Vec<SpanData>) -> impl Future<Output = OTelSdkResult> + Send {
        SpanExporter::export(self, batch)
    }

    fn shutdown(&mut self) -> impl Future<Output = OTelSdkResult> + Send {
        SpanExporter::shutdown(self)
    }

    fn set_resource(&mut self, resource: &Resource) {
        SpanExporter::set_resource(self, resource)
    }
}

/// `SpanData` contains all the information collected by a finished `Span`
/// and can be used by exporters as a standard input.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanData {
    /// Trace the span belongs to
    pub trace_id: TraceId,
    /// Span id
    pub span_id: SpanId,
    /// Span parent id, [`SpanId::INVALID`] for root spans
    pub parent_span_id: SpanId,
    /// Span kind
    pub span_kind: SpanKind,
    /// Span name
    pub name: Cow<'static, str>,
    /// Span start time
    pub start_time: SystemTime,
    /// Span end time
    pub end_time: SystemTime,
    /// Span attributes
    pub attributes: Vec<KeyValue>,
    /// The number of attributes that were above the configured limit, and thus
    /// dropped.
    pub dropped_attributes_count: u32,
    /// Span events
    pub events: Vec<Event>,
    /// The number of events that were above the configured limit, and thus
    /// dropped.
    pub dropped_events_count: u32,
    /// Span status
    pub status: Status,
    /// Instrumentation scope that produced this span
    pub instrumentation_scope: InstrumentationScope,
}
