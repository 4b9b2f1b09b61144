//! # Log Processor Interface
//!
//! The `LogProcessor` interface provides hooks for log record processing and
//! exporting. Log processors receive `SdkLogRecord`s emitted by the
//! [`SdkLogger`](super::SdkLogger) and determine how these records are handled.
//!
//! The [`BatchLogProcessor`] buffers log records and sends them to its
//! exporter in batches from a background task.
//!
//! ## Diagram
//!
//! ```ascii
//!   +-----+---------------+   +-----------------------+   +-------------------+
//!   |     |               |   |                       |   |                   |
//!   | SDK | Logger.emit() +---> (Batch)LogProcessor   +--->  LogExporter      |
//!   +-----+---------------+   +-----------------------+   +-------------------+
//! ```
use crate::batch::{BatchConfig, BatchConfigBuilder, BatchProcessor, ShutdownHook};
use crate::error::OTelSdkResult;
use crate::logs::export::LogData;
use crate::logs::{LogExporter, SdkLogRecord};
use crate::runtime::RuntimeChannel;
use crate::Resource;
use async_trait::async_trait;
use opentelemetry::InstrumentationScope;
use std::fmt::Debug;
use std::sync::Arc;

/// The interface for plugging into a [`SdkLogger`].
///
/// [`SdkLogger`]: crate::logs::SdkLogger
#[async_trait]
pub trait LogProcessor: Send + Sync + Debug {
    /// Called when a log record is ready to processed and exported.
    ///
    /// This method receives a mutable reference to `SdkLogRecord`. If the
    /// processor needs to handle the export asynchronously, it should clone the
    /// data. Any changes made to the record in this method will be reflected in
    /// the next log processor in the chain.
    ///
    /// Must not block and must not fail.
    fn emit(&self, data: &mut SdkLogRecord, instrumentation: &InstrumentationScope);

    /// Force the logs lying in the cache to be exported.
    async fn force_flush(&self) -> OTelSdkResult;

    /// Shuts down the processor.
    /// After shutdown returns the log processor should stop processing any logs.
    async fn shutdown(&self) -> OTelSdkResult;

    /// Set the resource for the log processor.
    fn set_resource(&mut self, _resource: &Resource) {}
}

/// A [`LogProcessor`] that buffers log records and exports them in batches
/// from a background task spawned on `R`.
///
/// Cloning yields another handle to the same processor. When the last handle
/// is dropped the background task exports what is still buffered, shuts the
/// exporter down and exits.
///
/// # Example
///
/// ```no_run
/// # use opentelemetry_client::logs::{BatchLogProcessor, JsonLogExporter, SdkLoggerProvider};
/// # use opentelemetry_client::runtime;
/// # #[tokio::main]
/// # async fn main() {
/// let exporter = JsonLogExporter::new(std::io::stderr());
/// let processor = BatchLogProcessor::builder(exporter, runtime::Tokio).build();
/// let provider = SdkLoggerProvider::builder()
///     .with_log_processor(processor)
///     .build();
/// // emit records through provider.logger("my-app")
/// provider.shutdown().await.unwrap();
/// # }
/// ```
pub struct BatchLogProcessor<R: RuntimeChannel> {
    inner: Arc<BatchProcessor<LogData, R>>,
}

impl<R: RuntimeChannel> Debug for BatchLogProcessor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchLogProcessor")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<R: RuntimeChannel> Clone for BatchLogProcessor<R> {
    fn clone(&self) -> Self {
        BatchLogProcessor {
            inner: self.inner.clone(),
        }
    }
}

impl<R: RuntimeChannel> BatchLogProcessor<R> {
    /// Create a new batch processor builder.
    ///
    /// The batch settings default to [`BatchConfigBuilder::for_logs`], which
    /// honors the `OTEL_BLRP_*` environment variables.
    pub fn builder<E>(exporter: E, runtime: R) -> BatchLogProcessorBuilder<E, R>
    where
        E: LogExporter + 'static,
    {
        BatchLogProcessorBuilder {
            exporter,
            config: BatchConfigBuilder::for_logs().build(),
            runtime,
            shutdown_hook: None,
        }
    }

    /// Number of records dropped because the buffer was full.
    pub fn dropped_records(&self) -> usize {
        self.inner.dropped_records()
    }

    /// Number of batches that failed to export or timed out.
    pub fn export_failures(&self) -> usize {
        self.inner.export_failures()
    }
}

#[async_trait]
impl<R: RuntimeChannel> LogProcessor for BatchLogProcessor<R> {
    fn emit(&self, record: &mut SdkLogRecord, instrumentation: &InstrumentationScope) {
        self.inner
            .push(Box::new((record.clone(), instrumentation.clone())));
    }

    async fn force_flush(&self) -> OTelSdkResult {
        self.inner.force_flush().await
    }

    async fn shutdown(&self) -> OTelSdkResult {
        self.inner.shutdown().await
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.inner.set_resource(resource);
    }
}

/// A builder for creating [`BatchLogProcessor`] instances.
pub struct BatchLogProcessorBuilder<E, R> {
    exporter: E,
    config: BatchConfig,
    runtime: R,
    shutdown_hook: Option<ShutdownHook>,
}

impl<E: Debug, R: Debug> Debug for BatchLogProcessorBuilder<E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchLogProcessorBuilder")
            .field("exporter", &self.exporter)
            .field("config", &self.config)
            .field("runtime", &self.runtime)
            .field("shutdown_hook", &self.shutdown_hook.is_some())
            .finish()
    }
}

impl<E, R> BatchLogProcessorBuilder<E, R>
where
    E: LogExporter + 'static,
    R: RuntimeChannel,
{
    /// Set the BatchConfig for [`BatchLogProcessorBuilder`]
    pub fn with_batch_config(self, config: BatchConfig) -> Self {
        BatchLogProcessorBuilder { config, ..self }
    }

    /// Run `hook` once, after the exporter has been shut down. Its error is
    /// reported by `shutdown` together with any export failure.
    pub fn with_shutdown_hook<F>(self, hook: F) -> Self
    where
        F: FnOnce() -> OTelSdkResult + Send + 'static,
    {
        BatchLogProcessorBuilder {
            shutdown_hook: Some(Box::new(hook)),
            ..self
        }
    }

    /// Build a batch processor and spawn its worker.
    pub fn build(self) -> BatchLogProcessor<R> {
        BatchLogProcessor {
            inner: Arc::new(BatchProcessor::new(
                self.exporter,
                self.config,
                self.runtime,
                self.shutdown_hook,
            )),
        }
    }
}

#[cfg(all(test, feature = "rt-tokio"))]
mod tests {
    use super::{BatchLogProcessor, LogProcessor};
    use crate::batch::BatchConfigBuilder;
    use crate::error::{OTelSdkError, OTelSdkResult};
    use crate::logs::{InMemoryLogExporter, InMemoryLogExporterBuilder, LogRecordLimits, SdkLogRecord};
    use crate::runtime;
    use crate::Resource;
    use opentelemetry::logs::AnyValue;
    use opentelemetry::{InstrumentationScope, Key, KeyValue};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn record(body: &'static str) -> SdkLogRecord {
        let mut record = SdkLogRecord::new(LogRecordLimits::default());
        record.set_body(AnyValue::from(body));
        record
    }

    #[tokio::test]
    async fn force_flush_exports_emitted_records() {
        let exporter = InMemoryLogExporterBuilder::default()
            .keep_records_on_shutdown()
            .build();
        let processor = BatchLogProcessor::builder(exporter.clone(), runtime::Tokio)
            .with_batch_config(
                BatchConfigBuilder::default()
                    .with_max_export_batch_size(2)
                    .build(),
            )
            .build();
        let scope = InstrumentationScope::builder("orders").build();

        for body in ["one", "two", "three"] {
            processor.emit(&mut record(body), &scope);
        }
        processor.force_flush().await.unwrap();

        let logs = exporter.get_emitted_logs().unwrap();
        let bodies: Vec<_> = logs.iter().map(|log| log.record.body().cloned()).collect();
        assert_eq!(
            bodies,
            vec![
                Some(AnyValue::from("one")),
                Some(AnyValue::from("two")),
                Some(AnyValue::from("three"))
            ]
        );
        assert!(logs.iter().all(|log| log.scope.name() == "orders"));
    }

    #[tokio::test]
    async fn shutdown_runs_hook_once_and_shares_outcome() {
        let calls = Arc::new(AtomicUsize::new(0));
        let hook_calls = calls.clone();
        let processor = BatchLogProcessor::builder(InMemoryLogExporter::default(), runtime::Tokio)
            .with_shutdown_hook(move || {
                hook_calls.fetch_add(1, Ordering::SeqCst);
                Err(OTelSdkError::InternalFailure("flush sink".into()))
            })
            .build();
        let other_handle = processor.clone();

        let (first, second) = futures_util::join!(processor.shutdown(), other_handle.shutdown());

        let expected: OTelSdkResult = Err(OTelSdkError::InternalFailure("flush sink".into()));
        assert_eq!(first, expected);
        assert_eq!(second, expected);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exporter_receives_resource() {
        let exporter = InMemoryLogExporterBuilder::default()
            .keep_records_on_shutdown()
            .build();
        let mut processor = BatchLogProcessor::builder(exporter.clone(), runtime::Tokio).build();
        let resource = Resource::builder_empty()
            .with_attribute(KeyValue::new("service.name", "orders"))
            .build();

        processor.set_resource(&resource);
        processor.emit(&mut record("hello"), &InstrumentationScope::builder("x").build());
        processor.force_flush().await.unwrap();

        let logs = exporter.get_emitted_logs().unwrap();
        assert_eq!(
            logs[0].resource.get(&Key::new("service.name")),
            Some("orders".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_drops_and_counts() {
        let exporter = InMemoryLogExporter::default();
        let processor = BatchLogProcessor::builder(exporter, runtime::Tokio)
            .with_batch_config(
                BatchConfigBuilder::default()
                    .with_max_queue_size(2)
                    .with_scheduled_delay(Duration::from_secs(60))
                    .build(),
            )
            .build();
        let scope = InstrumentationScope::builder("x").build();

        for _ in 0..5 {
            processor.emit(&mut record("r"), &scope);
        }

        assert_eq!(processor.dropped_records(), 3);
        assert_eq!(processor.export_failures(), 0);
    }
}
