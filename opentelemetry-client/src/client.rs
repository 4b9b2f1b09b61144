//! # Telemetry client
//!
//! [`TelemetryClient`] is the explicit init/teardown handle of an
//! application's telemetry: it owns one [`SdkTracerProvider`] and one
//! [`SdkLoggerProvider`] built over the same [`Resource`], and is passed to
//! the code that needs tracers or loggers.
//!
//! ```no_run
//! use opentelemetry_client::logs::JsonLogExporter;
//! use opentelemetry_client::{Resource, TelemetryClient};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let client = TelemetryClient::builder()
//!     .with_resource(Resource::builder().with_service_name("checkout").build())
//!     .with_log_exporter(JsonLogExporter::new(std::io::stdout()))
//!     .build();
//!
//! let tracer = client.tracer("checkout::cart");
//! tracer.start("add_item").end();
//!
//! client.shutdown().await.unwrap();
//! # }
//! ```
use crate::batch::ShutdownGuard;
use crate::error::{OTelSdkError, OTelSdkResult};
use crate::logs::{
    LogProcessor, LogRecordLimits, LoggerProviderBuilder, SdkLogger, SdkLoggerProvider,
};
use crate::trace::{
    SdkTracer, SdkTracerProvider, SpanLimits, SpanProcessor, TracerProviderBuilder,
};
#[cfg(feature = "rt-tokio")]
use crate::{logs::LogExporter, trace::SpanExporter};
use crate::Resource;
use opentelemetry::{otel_debug, otel_warn};
use std::borrow::Cow;
use std::sync::Arc;

/// Handle to the tracing and logging pipelines of an application.
///
/// Cloning yields another handle to the same client.
#[derive(Clone, Debug)]
pub struct TelemetryClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    resource: Resource,
    tracer_provider: SdkTracerProvider,
    logger_provider: SdkLoggerProvider,
    shutdown: ShutdownGuard,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if !self.shutdown.is_shutdown() {
            otel_warn!(
                name: "TelemetryClient.DroppedWithoutShutdown",
                message = "TelemetryClient dropped without shutdown; buffered telemetry is exported in the background but failures go unreported."
            );
        }
    }
}

impl TelemetryClient {
    /// Create a new client builder.
    pub fn builder() -> TelemetryClientBuilder {
        TelemetryClientBuilder::default()
    }

    /// The resource shared by every span and log record of this client.
    pub fn resource(&self) -> &Resource {
        &self.inner.resource
    }

    /// A tracer for the instrumentation scope `name`.
    pub fn tracer(&self, name: impl Into<Cow<'static, str>>) -> SdkTracer {
        self.inner.tracer_provider.tracer(name)
    }

    /// A logger for the instrumentation scope `name`.
    pub fn logger(&self, name: impl Into<Cow<'static, str>>) -> SdkLogger {
        self.inner.logger_provider.logger(name)
    }

    /// The tracer provider of this client.
    pub fn tracer_provider(&self) -> &SdkTracerProvider {
        &self.inner.tracer_provider
    }

    /// The logger provider of this client.
    pub fn logger_provider(&self) -> &SdkLoggerProvider {
        &self.inner.logger_provider
    }

    /// Export everything buffered by both pipelines.
    pub async fn force_flush(&self) -> OTelSdkResult {
        if self.inner.shutdown.is_shutdown() {
            return Err(OTelSdkError::AlreadyShutdown);
        }
        let (traces, logs) = futures_util::join!(
            self.inner.tracer_provider.force_flush(),
            self.inner.logger_provider.force_flush()
        );
        OTelSdkError::combine([traces, logs])
    }

    /// Flush and shut down both pipelines.
    ///
    /// Runs once. Repeated and concurrent calls wait for that single run and
    /// receive its outcome.
    pub async fn shutdown(&self) -> OTelSdkResult {
        let tracer_provider = self.inner.tracer_provider.clone();
        let logger_provider = self.inner.logger_provider.clone();
        self.inner
            .shutdown
            .shutdown(move || async move {
                otel_debug!(name: "TelemetryClient.Shutdown");
                let (traces, logs) =
                    futures_util::join!(tracer_provider.shutdown(), logger_provider.shutdown());
                OTelSdkError::combine([traces, logs])
            })
            .await
    }
}

/// Builder for [`TelemetryClient`].
#[derive(Debug, Default)]
pub struct TelemetryClientBuilder {
    resource: Option<Resource>,
    tracer_provider: TracerProviderBuilder,
    logger_provider: LoggerProviderBuilder,
}

impl TelemetryClientBuilder {
    /// The resource shared by both pipelines. Defaults to
    /// [`Resource::builder`] with the default detectors.
    pub fn with_resource(self, resource: Resource) -> Self {
        TelemetryClientBuilder {
            resource: Some(resource),
            ..self
        }
    }

    /// Export spans in batches through `exporter`, on the Tokio runtime.
    #[cfg(feature = "rt-tokio")]
    pub fn with_span_exporter<E: SpanExporter + 'static>(self, exporter: E) -> Self {
        TelemetryClientBuilder {
            tracer_provider: self.tracer_provider.with_batch_exporter(exporter),
            ..self
        }
    }

    /// Export log records in batches through `exporter`, on the Tokio runtime.
    #[cfg(feature = "rt-tokio")]
    pub fn with_log_exporter<E: LogExporter + 'static>(self, exporter: E) -> Self {
        TelemetryClientBuilder {
            logger_provider: self.logger_provider.with_batch_exporter(exporter),
            ..self
        }
    }

    /// Add a custom span processor.
    pub fn with_span_processor<P: SpanProcessor + 'static>(self, processor: P) -> Self {
        TelemetryClientBuilder {
            tracer_provider: self.tracer_provider.with_span_processor(processor),
            ..self
        }
    }

    /// Add a custom log processor.
    pub fn with_log_processor<P: LogProcessor + 'static>(self, processor: P) -> Self {
        TelemetryClientBuilder {
            logger_provider: self.logger_provider.with_log_processor(processor),
            ..self
        }
    }

    /// Limits applied to every span.
    pub fn with_span_limits(self, limits: SpanLimits) -> Self {
        TelemetryClientBuilder {
            tracer_provider: self.tracer_provider.with_span_limits(limits),
            ..self
        }
    }

    /// Limits applied to every log record.
    pub fn with_log_record_limits(self, limits: LogRecordLimits) -> Self {
        TelemetryClientBuilder {
            logger_provider: self.logger_provider.with_log_record_limits(limits),
            ..self
        }
    }

    /// Build both providers over the shared resource.
    pub fn build(self) -> TelemetryClient {
        let resource = self.resource.unwrap_or_else(|| Resource::builder().build());
        let tracer_provider = self
            .tracer_provider
            .with_resource(resource.clone())
            .build();
        let logger_provider = self
            .logger_provider
            .with_resource(resource.clone())
            .build();

        otel_debug!(name: "TelemetryClient.Built");
        TelemetryClient {
            inner: Arc::new(ClientInner {
                resource,
                tracer_provider,
                logger_provider,
                shutdown: ShutdownGuard::new(),
            }),
        }
    }
}
