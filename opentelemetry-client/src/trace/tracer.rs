//! # Tracer
//!
//! The tracer starts [`Span`]s on behalf of one instrumentation scope and
//! offers helpers that run a unit of work inside a span:
//!
//! * [`SdkTracer::in_span`] runs a closure,
//! * [`SdkTracer::in_span_async`] drives a future,
//! * [`SdkTracer::wrap`] turns a function into one that runs in a span on
//!   every call.
//!
//! On success the span status is set to `Ok`. On error the error is recorded
//! as an `exception` event and the status set to `Error`. The span is ended on
//! every exit path, including panics and futures dropped before completion.
use crate::trace::span::SpanRecording;
use crate::trace::{SdkTracerProvider, Span};
use opentelemetry::trace::{SpanContext, SpanId, SpanKind, Status, TraceFlags, TraceState};
use opentelemetry::{InstrumentationScope, KeyValue};
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::time::SystemTime;

/// `SdkTracer` implementation to create and manage spans
#[derive(Clone)]
pub struct SdkTracer {
    scope: InstrumentationScope,
    provider: SdkTracerProvider,
}

impl fmt::Debug for SdkTracer {
    /// Formats the `Tracer` using the given formatter.
    /// Omitting `provider` here is necessary to avoid cycles.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkTracer")
            .field("name", &self.scope.name())
            .field("version", &self.scope.version())
            .finish()
    }
}

impl SdkTracer {
    /// Create a new tracer (used internally by `TracerProvider`s).
    pub(crate) fn new(scope: InstrumentationScope, provider: SdkTracerProvider) -> Self {
        SdkTracer { scope, provider }
    }

    /// TracerProvider associated with this tracer.
    pub(crate) fn provider(&self) -> &SdkTracerProvider {
        &self.provider
    }

    /// Instrumentation scope of this tracer.
    pub(crate) fn instrumentation_scope(&self) -> &InstrumentationScope {
        &self.scope
    }

    /// Starts a new root span.
    pub fn start(&self, name: impl Into<Cow<'static, str>>) -> Span {
        self.span_builder(name).start(self)
    }

    /// Starts a new span whose parent is `parent`.
    pub fn start_child(&self, name: impl Into<Cow<'static, str>>, parent: &SpanContext) -> Span {
        self.span_builder(name).with_parent(parent.clone()).start(self)
    }

    /// Creates a span builder, for spans that need a kind, start attributes
    /// or a parent.
    pub fn span_builder(&self, name: impl Into<Cow<'static, str>>) -> SpanBuilder {
        SpanBuilder::from_name(name)
    }

    /// Runs `work` inside a new root span.
    ///
    /// The span is ended before this returns. Use
    /// [`SdkTracer::start_child`] with the span's context to nest spans.
    ///
    /// ```
    /// use opentelemetry_client::trace::SdkTracerProvider;
    ///
    /// let provider = SdkTracerProvider::builder().build();
    /// let tracer = provider.tracer("checkout");
    /// let total = tracer.in_span("compute_total", |span| {
    ///     span.set_attribute(opentelemetry::KeyValue::new("items", 3));
    ///     Ok::<_, std::num::ParseIntError>("42".parse::<u32>()? * 3)
    /// });
    /// assert_eq!(total, Ok(126));
    /// ```
    pub fn in_span<T, E, F>(&self, name: impl Into<Cow<'static, str>>, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut Span) -> Result<T, E>,
        E: fmt::Display,
    {
        let mut span = self.start(name);
        let result = work(&mut span);
        finish(&mut span, &result);
        result
    }

    /// Drives the future returned by `work` inside a new root span.
    ///
    /// `work` receives the context of the span so it can start children. If
    /// the returned future is dropped before completing, the span still ends.
    pub async fn in_span_async<T, E, F, Fut>(
        &self,
        name: impl Into<Cow<'static, str>>,
        work: F,
    ) -> Result<T, E>
    where
        F: FnOnce(SpanContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut span = self.start(name);
        let result = work(span.span_context().clone()).await;
        finish(&mut span, &result);
        result
    }

    /// Wraps `work` so that every call runs inside a span named `name`.
    ///
    /// ```
    /// use opentelemetry_client::trace::SdkTracerProvider;
    ///
    /// let provider = SdkTracerProvider::builder().build();
    /// let double = provider
    ///     .tracer("math")
    ///     .wrap("double", |_span, n: u32| n.checked_mul(2).ok_or("overflow"));
    /// assert_eq!(double(21), Ok(42));
    /// assert!(double(u32::MAX).is_err());
    /// ```
    pub fn wrap<A, T, E, F>(
        &self,
        name: impl Into<Cow<'static, str>>,
        work: F,
    ) -> impl Fn(A) -> Result<T, E>
    where
        F: Fn(&mut Span, A) -> Result<T, E>,
        E: fmt::Display,
    {
        let tracer = self.clone();
        let name: Cow<'static, str> = name.into();
        move |arg| tracer.in_span(name.clone(), |span| work(span, arg))
    }
}

fn finish<T, E: fmt::Display>(span: &mut Span, result: &Result<T, E>) {
    match result {
        Ok(_) => span.set_status(Status::Ok),
        Err(err) => span.record_error(err),
    }
    span.end();
}

/// Options for starting a [`Span`].
#[derive(Clone, Debug)]
pub struct SpanBuilder {
    name: Cow<'static, str>,
    kind: SpanKind,
    parent: Option<SpanContext>,
    attributes: Vec<KeyValue>,
    start_time: Option<SystemTime>,
}

impl SpanBuilder {
    /// A builder for an internal root span named `name`.
    pub fn from_name(name: impl Into<Cow<'static, str>>) -> Self {
        SpanBuilder {
            name: name.into(),
            kind: SpanKind::Internal,
            parent: None,
            attributes: Vec::new(),
            start_time: None,
        }
    }

    /// Assign span kind
    pub fn with_kind(self, kind: SpanKind) -> Self {
        SpanBuilder { kind, ..self }
    }

    /// Make the span a child of `parent`. Invalid contexts are ignored.
    pub fn with_parent(self, parent: SpanContext) -> Self {
        SpanBuilder {
            parent: Some(parent),
            ..self
        }
    }

    /// Assign span attributes from an iterable.
    pub fn with_attributes<I>(self, attributes: I) -> Self
    where
        I: IntoIterator<Item = KeyValue>,
    {
        SpanBuilder {
            attributes: attributes.into_iter().collect(),
            ..self
        }
    }

    /// Assign span start time
    pub fn with_start_time(self, start_time: SystemTime) -> Self {
        SpanBuilder {
            start_time: Some(start_time),
            ..self
        }
    }

    /// Start the span and hand it to the `on_start` hook of every span
    /// processor.
    pub fn start(self, tracer: &SdkTracer) -> Span {
        let provider = tracer.provider();
        let id_generator = provider.id_generator();
        let span_limits = provider.span_limits();

        let (trace_id, parent_span_id) = match self.parent.filter(|parent| parent.is_valid()) {
            Some(parent) => (parent.trace_id(), parent.span_id()),
            None => (id_generator.new_trace_id(), SpanId::INVALID),
        };
        let span_context = SpanContext::new(
            trace_id,
            id_generator.new_span_id(),
            TraceFlags::SAMPLED,
            false,
            TraceState::default(),
        );

        let mut span = Span::new(
            span_context,
            SpanRecording {
                parent_span_id,
                span_kind: self.kind,
                name: self.name,
                start_time: self.start_time.unwrap_or_else(SystemTime::now),
                attributes: Vec::new(),
                dropped_attributes_count: 0,
                events: Vec::new(),
                dropped_events_count: 0,
                status: Status::Unset,
            },
            tracer.clone(),
            span_limits,
        );
        span.set_attributes(self.attributes);

        for processor in provider.span_processors() {
            processor.on_start(&mut span);
        }
        span
    }
}
