#[cfg(feature = "rt-tokio")]
use super::BatchLogProcessor;
use super::{LogProcessor, LogRecordLimits, SdkLogger};
use crate::batch::ShutdownGuard;
use crate::error::{OTelSdkError, OTelSdkResult};
#[cfg(feature = "rt-tokio")]
use crate::logs::LogExporter;
use crate::Resource;
use futures_util::future::join_all;
use opentelemetry::{otel_debug, otel_info, InstrumentationScope};
use std::{borrow::Cow, sync::Arc};

type Processors = Arc<Vec<Box<dyn LogProcessor>>>;

#[derive(Debug, Clone)]
/// Handles the creation and coordination of [`SdkLogger`]s.
///
/// All `SdkLogger`s created by a `SdkLoggerProvider` will share the same
/// [`Resource`] and have their log records processed by the configured log
/// processors. This is a clonable handle to the `SdkLoggerProvider` itself,
/// and cloning it will create a new reference, not a new instance of a
/// `SdkLoggerProvider`.
///
/// Call [`shutdown`](SdkLoggerProvider::shutdown) before exiting to flush
/// what is buffered and release the exporters. Dropping the last reference
/// without shutting down still lets batch processors drain in the background,
/// but nobody observes the outcome.
pub struct SdkLoggerProvider {
    inner: Arc<LoggerProviderInner>,
}

impl SdkLoggerProvider {
    /// Create a new `LoggerProvider` builder.
    pub fn builder() -> LoggerProviderBuilder {
        LoggerProviderBuilder::default()
    }

    /// Create a logger whose records are attributed to the scope `name`.
    pub fn logger(&self, name: impl Into<Cow<'static, str>>) -> SdkLogger {
        let scope = InstrumentationScope::builder(name).build();
        self.logger_with_scope(scope)
    }

    /// Create a logger for a fully described instrumentation scope.
    pub fn logger_with_scope(&self, scope: InstrumentationScope) -> SdkLogger {
        if scope.name().is_empty() {
            otel_info!(name: "LoggerNameEmpty", message = "Logger name is empty; consider providing a meaningful name. Logger will function normally and the provided name will be used as-is.");
        };
        otel_debug!(
            name: "LoggerProvider.NewLoggerReturned",
            logger_name = format!("{}", scope.name())
        );
        SdkLogger::new(scope, self.clone())
    }

    pub(crate) fn log_processors(&self) -> &[Box<dyn LogProcessor>] {
        &self.inner.processors
    }

    pub(crate) fn log_record_limits(&self) -> LogRecordLimits {
        self.inner.limits
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.inner.shutdown.is_shutdown()
    }

    /// The resource shared by every logger of this provider.
    pub fn resource(&self) -> &Resource {
        &self.inner.resource
    }

    /// Force flush all remaining logs in log processors.
    ///
    /// Every processor is flushed; their failures are returned together.
    pub async fn force_flush(&self) -> OTelSdkResult {
        if self.is_shutdown() {
            return Err(OTelSdkError::AlreadyShutdown);
        }
        let results = join_all(
            self.log_processors()
                .iter()
                .map(|processor| processor.force_flush()),
        )
        .await;
        OTelSdkError::combine(results)
    }

    /// Shuts down this `LoggerProvider` and all of its processors.
    ///
    /// Runs once. Repeated and concurrent calls wait for that single run and
    /// receive its outcome.
    pub async fn shutdown(&self) -> OTelSdkResult {
        otel_debug!(name: "LoggerProvider.ShutdownInvokedByUser");
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
            name: "LoggerProvider.ShutdownError",
            error = format!("{err}")
        );
    }
    OTelSdkError::combine(results)
}

#[derive(Debug)]
struct LoggerProviderInner {
    processors: Processors,
    resource: Resource,
    limits: LogRecordLimits,
    shutdown: ShutdownGuard,
}

impl Drop for LoggerProviderInner {
    fn drop(&mut self) {
        if !self.shutdown.is_shutdown() {
            otel_info!(
                name: "LoggerProvider.Drop",
                message = "Last reference of LoggerProvider dropped without shutdown; batch processors drain in the background."
            );
        } else {
            otel_debug!(
                name: "LoggerProvider.Drop.AlreadyShutdown",
                message = "LoggerProvider was already shut down."
            );
        }
    }
}

#[derive(Debug, Default)]
/// Builder for provider attributes.
pub struct LoggerProviderBuilder {
    processors: Vec<Box<dyn LogProcessor>>,
    resource: Option<Resource>,
    limits: Option<LogRecordLimits>,
}

impl LoggerProviderBuilder {
    /// Adds a [BatchLogProcessor] with the configured exporter, running on
    /// the Tokio runtime.
    ///
    /// Processors are invoked in the order they are added.
    #[cfg(feature = "rt-tokio")]
    pub fn with_batch_exporter<T: LogExporter + 'static>(self, exporter: T) -> Self {
        let batch = BatchLogProcessor::builder(exporter, crate::runtime::Tokio).build();
        self.with_log_processor(batch)
    }

    /// Adds a custom [LogProcessor] to the pipeline.
    ///
    /// Processors are invoked in the order they are added.
    pub fn with_log_processor<T: LogProcessor + 'static>(self, processor: T) -> Self {
        let mut processors = self.processors;
        processors.push(Box::new(processor));

        LoggerProviderBuilder { processors, ..self }
    }

    /// The `Resource` to be associated with this Provider.
    pub fn with_resource(self, resource: Resource) -> Self {
        LoggerProviderBuilder {
            resource: Some(resource),
            ..self
        }
    }

    /// Limits applied to every record. Defaults to [`LogRecordLimits::from_env`].
    pub fn with_log_record_limits(self, limits: LogRecordLimits) -> Self {
        LoggerProviderBuilder {
            limits: Some(limits),
            ..self
        }
    }

    /// Create a new provider from this configuration.
    pub fn build(self) -> SdkLoggerProvider {
        let resource = self.resource.unwrap_or_else(|| Resource::builder().build());
        let mut processors = self.processors;

        // invoke set_resource on all the processors
        for processor in processors.iter_mut() {
            processor.set_resource(&resource);
        }

        let logger_provider = SdkLoggerProvider {
            inner: Arc::new(LoggerProviderInner {
                processors: Arc::new(processors),
                resource,
                limits: self.limits.unwrap_or_else(LogRecordLimits::from_env),
                shutdown: ShutdownGuard::new(),
            }),
        };

        otel_debug!(name: "LoggerProvider.Built");
        logger_provider
    }
}
