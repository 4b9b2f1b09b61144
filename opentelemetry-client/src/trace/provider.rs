#[cfg(feature = "rt-tokio")]
use super::BatchSpanProcessor;
use super::{IdGenerator, RandomIdGenerator, SdkTracer, SpanLimits, SpanProcessor};
use crate::batch::ShutdownGuard;
use crate::error::{OTelSdkError, OTelSdkResult};
#[cfg(feature = "rt-tokio")]
use crate::trace::SpanExporter;
use crate::Resource;
use futures_util::future::join_all;
use opentelemetry::{otel_debug, otel_info, InstrumentationScope};
use std::borrow::Cow;
use std::sync::Arc;

type Processors = Arc<Vec<Box<dyn SpanProcessor>>>;

/// Creator and registry of named [`SdkTracer`] instances.
///
/// `SdkTracerProvider` is a handle to shared state: cloning it yields another
/// reference to the same provider. Every tracer created from it shares its
/// span processors, span limits and [`Resource`].
///
/// Call [`shutdown`](SdkTracerProvider::shutdown) before exiting so buffered
/// spans are exported. Spans ended after shutdown are dropped.
#[derive(Clone, Debug)]
pub struct SdkTracerProvider {
    inner: Arc<TracerProviderInner>,
}

#[derive(Debug)]
struct TracerProviderInner {
    processors: Processors,
    resource: Resource,
    span_limits: SpanLimits,
    id_generator: Box<dyn IdGenerator>,
    shutdown: ShutdownGuard,
}

impl Drop for TracerProviderInner {
    fn drop(&mut self) {
        if !self.shutdown.is_shutdown() {
            otel_info!(
                name: "TracerProvider.Drop",
                message = "Last reference of TracerProvider dropped without shutdown; batch processors drain in the background."
            );
        } else {
            otel_debug!(
                name: "TracerProvider.Drop.AlreadyShutdown",
                message = "TracerProvider was already shut down."
            );
        }
    }
}

impl SdkTracerProvider {
    /// Create a new [`SdkTracerProvider`] builder.
    pub fn builder() -> TracerProviderBuilder {
        TracerProviderBuilder::default()
    }

    /// Create a tracer whose spans are attributed to the scope `name`.
    pub fn tracer(&self, name: impl Into<Cow<'static, str>>) -> SdkTracer {
        let scope = InstrumentationScope::builder(name).build();
        self.tracer_with_scope(scope)
    }

    /// Create a tracer for a fully described instrumentation scope.
    pub fn tracer_with_scope(&self, scope: InstrumentationScope) -> SdkTracer {
        if scope.name().is_empty() {
            otel_info!(name: "TracerNameEmpty", message = "Tracer name is empty; consider providing a meaningful name. Tracer will function normally and the provided name will be used as-is.");
        };
        otel_debug!(
            name: "TracerProvider.NewTracerReturned",
            tracer_name = format!("{}", scope.name())
        );
        SdkTracer::new(scope, self.clone())
    }

    pub(crate) fn span_processors(&self) -> &[Box<dyn SpanProcessor>] {
        &self.inner.processors
    }

    pub(crate) fn span_limits(&self) -> SpanLimits {
        self.inner.span_limits
    }

    pub(crate) fn id_generator(&self) -> &dyn IdGenerator {
        self.inner.id_generator.as_ref()
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.inner.shutdown.is_shutdown()
    }

    /// The resource shared by every tracer of this provider.
    pub fn resource(&self) -> &Resource {
        &self.inner.resource
    }

    /// Force flush all remaining spans in span processors.
    ///
    /// Every processor is flushed; their failures are returned together.
    pub async fn force_flush(&self) -> OTelSdkResult {
        if self.is_shutdown() {
            return Err(OTelSdkError::AlreadyShutdown);
        }
        let results = join_all(
            self.span_processors()
                .iter()
                .map(|processor| processor.force_flush()),
        )
        .await;
        OTelSdkError::combine(results)
    }

    /// Shuts down this `TracerProvider` and all of its processors.
    ///
    /// Runs once. Repeated and concurrent calls wait for that single run and
    /// receive its outcome.
    pub async fn shutdown(&self) -> OTelSdkResult {
        otel_debug!(name: "TracerProvider.ShutdownInvokedByUser");
        let processors = self.inner.processors.clone();
        self.inner
            .shutdown
            .shutdown(move || shutdown_processors(processors))
            .await
    }
}

async fn shutdown_processors(processors: Processors) -> OTelSdkResult {
    let results = join_all(processors.iter().map(|processor| processor.shutdown())).await;
    for err in results.iter().filter_map(|result| result.as_ref().err()) {
        // Log at debug level because the error is also returned to the caller
        otel_debug!(
            name: "TracerProvider.ShutdownError",
            error = format!("{err}")
        );
    }
    OTelSdkError::combine(results)
}

/// Builder for provider attributes.
#[derive(Debug, Default)]
pub struct TracerProviderBuilder {
    processors: Vec<Box<dyn SpanProcessor>>,
    resource: Option<Resource>,
    span_limits: Option<SpanLimits>,
    id_generator: Option<Box<dyn IdGenerator>>,
}

impl TracerProviderBuilder {
    /// Adds a [BatchSpanProcessor] with the configured exporter, running on
    /// the Tokio runtime.
    ///
    /// Processors are invoked in the order they are added.
    #[cfg(feature = "rt-tokio")]
    pub fn with_batch_exporter<T: SpanExporter + 'static>(self, exporter: T) -> Self {
        let batch = BatchSpanProcessor::builder(exporter, crate::runtime::Tokio).build();
        self.with_span_processor(batch)
    }

    /// Adds a custom [SpanProcessor] to the pipeline.
    ///
    /// Processors are invoked in the order they are added.
    pub fn with_span_processor<T: SpanProcessor + 'static>(self, processor: T) -> Self {
        let mut processors = self.processors;
        processors.push(Box::new(processor));

        TracerProviderBuilder { processors, ..self }
    }

    /// The `Resource` to be associated with this Provider.
    pub fn with_resource(self, resource: Resource) -> Self {
        TracerProviderBuilder {
            resource: Some(resource),
            ..self
        }
    }

    /// Limits applied to every span. Defaults to [`SpanLimits::from_env`].
    pub fn with_span_limits(self, span_limits: SpanLimits) -> Self {
        TracerProviderBuilder {
            span_limits: Some(span_limits),
            ..self
        }
    }

    /// The generator of trace and span ids. Defaults to [`RandomIdGenerator`].
    pub fn with_id_generator<T: IdGenerator + 'static>(self, id_generator: T) -> Self {
        TracerProviderBuilder {
            id_generator: Some(Box::new(id_generator)),
            ..self
        }
    }

    /// Create a new provider from this configuration.
    pub fn build(self) -> SdkTracerProvider {
        let resource = self.resource.unwrap_or_else(|| Resource::builder().build());
        let mut processors = self.processors;

        // invoke set_resource on all the processors
        for processor in processors.iter_mut() {
            processor.set_resource(&resource);
        }

        let provider = SdkTracerProvider {
            inner: Arc::new(TracerProviderInner {
                processors: Arc::new(processors),
                resource,
                span_limits: self.span_limits.unwrap_or_else(SpanLimits::from_env),
                id_generator: self
                    .id_generator
                    .unwrap_or_else(|| Box::new(RandomIdGenerator::default())),
                shutdown: ShutdownGuard::new(),
            }),
        };

        otel_debug!(name: "TracerProvider.Built");
        provider
    }
}
