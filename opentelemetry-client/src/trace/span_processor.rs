//! # Span Processor Interface
//!
//! Span processors are invoked when a span starts and when it ends. They are
//! registered on the [`SdkTracerProvider`](crate::trace::SdkTracerProvider)
//! and called in the order they were added.
//!
//! The [`BatchSpanProcessor`] buffers finished spans and hands them to a
//! [`SpanExporter`] in batches from a background task.
//!
//! ```ascii
//!   +-----+--------------+   +-----------------------+   +-------------------+
//!   |     |              |   |                       |   |                   |
//!   | SDK | Span.end()   +---> (Batch)SpanProcessor  +--->  SpanExporter     |
//!   |     |              |   |                       |   |                   |
//!   +-----+--------------+   +-----------------------+   +-------------------+
//! ```
use crate::batch::{BatchConfig, BatchConfigBuilder, BatchProcessor, ShutdownHook};
use crate::error::OTelSdkResult;
use crate::runtime::RuntimeChannel;
use crate::trace::{Span, SpanData, SpanExporter};
use crate::Resource;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// `SpanProcessor` is an interface which allows hooks for span start and end
/// method invocations.
#[async_trait]
pub trait SpanProcessor: Send + Sync + Debug {
    /// `on_start` is called when a `Span` is started. Changes made to the
    /// span here are visible to the processors that follow.
    fn on_start(&self, _span: &mut Span) {}

    /// `on_end` is called after a `Span` is ended (i.e., the end timestamp is
    /// already set). Must not block and must not fail.
    fn on_end(&self, span: SpanData);

    /// Force the spans lying in the cache to be exported.
    async fn force_flush(&self) -> OTelSdkResult;

    /// Shuts down the processor. Called when the provider is shut down. Spans
    /// ended afterwards are not processed.
    async fn shutdown(&self) -> OTelSdkResult;

    /// Set the resource for the span processor.
    fn set_resource(&mut self, _resource: &Resource) {}
}

/// A [`SpanProcessor`] that buffers finished spans and exports them in
/// batches from a background task spawned on `R`.
///
/// Cloning yields another handle to the same processor.
///
/// # Example
///
/// ```no_run
/// # use opentelemetry_client::trace::{BatchSpanProcessor, SdkTracerProvider, SpanData, SpanExporter};
/// # use opentelemetry_client::batch::BatchConfigBuilder;
/// # use opentelemetry_client::{runtime, OTelSdkResult};
/// # use std::time::Duration;
/// # #[derive(Debug)]
/// # struct StdoutExporter;
/// # impl SpanExporter for StdoutExporter {
/// #     async fn export(&self, batch: Vec<SpanData>) -> OTelSdkResult {
/// #         batch.iter().for_each(|span| println!("{}", span.name));
/// #         Ok(())
/// #     }
/// # }
/// # #[tokio::main]
/// # async fn main() {
/// let processor = BatchSpanProcessor::builder(StdoutExporter, runtime::Tokio)
///     .with_batch_config(
///         BatchConfigBuilder::for_spans()
///             .with_scheduled_delay(Duration::from_millis(100))
///             .build(),
///     )
///     .build();
/// let provider = SdkTracerProvider::builder()
///     .with_span_processor(processor)
///     .build();
/// provider.tracer("my-app").start("work").end();
/// provider.shutdown().await.unwrap();
/// # }
/// ```
pub struct BatchSpanProcessor<R: RuntimeChannel> {
    inner: Arc<BatchProcessor<SpanData, R>>,
}

impl<R: RuntimeChannel> Debug for BatchSpanProcessor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchSpanProcessor")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<R: RuntimeChannel> Clone for BatchSpanProcessor<R> {
    fn clone(&self) -> Self {
        BatchSpanProcessor {
            inner: self.inner.clone(),
        }
    }
}

impl<R: RuntimeChannel> BatchSpanProcessor<R> {
    /// Create a new batch processor builder.
    ///
    /// The batch settings default to [`BatchConfigBuilder::for_spans`], which
    /// honors the `OTEL_BSP_*` environment variables.
    pub fn builder<E>(exporter: E, runtime: R) -> BatchSpanProcessorBuilder<E, R>
    where
        E: SpanExporter + 'static,
    {
        BatchSpanProcessorBuilder {
            exporter,
            config: BatchConfigBuilder::for_spans().build(),
            runtime,
            shutdown_hook: None,
        }
    }

    /// Number of spans dropped because the buffer was full.
    pub fn dropped_records(&self) -> usize {
        self.inner.dropped_records()
    }

    /// Number of batches that failed to export or timed out.
    pub fn export_failures(&self) -> usize {
        self.inner.export_failures()
    }
}

#[async_trait]
impl<R: RuntimeChannel> SpanProcessor for BatchSpanProcessor<R> {
    fn on_end(&self, span: SpanData) {
        self.inner.push(span);
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

/// A builder for creating [`BatchSpanProcessor`] instances.
pub struct BatchSpanProcessorBuilder<E, R> {
    exporter: E,
    config: BatchConfig,
    runtime: R,
    shutdown_hook: Option<ShutdownHook>,
}

impl<E: Debug, R: Debug> Debug for BatchSpanProcessorBuilder<E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchSpanProcessorBuilder")
            .field("exporter", &self.exporter)
            .field("config", &self.config)
            .field("runtime", &self.runtime)
            .field("shutdown_hook", &self.shutdown_hook.is_some())
            .finish()
    }
}

impl<E, R> BatchSpanProcessorBuilder<E, R>
where
    E: SpanExporter + 'static,
    R: RuntimeChannel,
{
    /// Set the BatchConfig for [`BatchSpanProcessorBuilder`]
    pub fn with_batch_config(self, config: BatchConfig) -> Self {
        BatchSpanProcessorBuilder { config, ..self }
    }

    /// Run `hook` once, after the exporter has been shut down.
    pub fn with_shutdown_hook<F>(self, hook: F) -> Self
    where
        F: FnOnce() -> OTelSdkResult + Send + 'static,
    {
        BatchSpanProcessorBuilder {
            shutdown_hook: Some(Box::new(hook)),
            ..self
        }
    }

    /// Build a batch processor and spawn its worker.
    pub fn build(self) -> BatchSpanProcessor<R> {
        BatchSpanProcessor {
            inner: Arc::new(BatchProcessor::new(
                self.exporter,
                self.config,
                self.runtime,
                self.shutdown_hook,
            )),
        }
    }
}
