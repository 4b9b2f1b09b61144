use crate::error::{OTelSdkError, OTelSdkResult};
use crate::resource::Resource;
use crate::trace::{SpanData, SpanExporter};
use std::sync::{Arc, Mutex};

/// An in-memory span exporter that stores span data in memory.
///
/// This exporter is useful for testing and debugging purposes. Spans can be
/// retrieved using the `get_finished_spans` method.
///
/// # Example
/// ```no_run
///# use opentelemetry_client::trace::{InMemorySpanExporter, SdkTracerProvider};
///# #[tokio::main]
///# async fn main() {
///     let exporter = InMemorySpanExporter::default();
///     let provider = SdkTracerProvider::builder()
///         .with_batch_exporter(exporter.clone())
///         .build();
///
///     provider.tracer("example").in_span("say hello", |_span| Ok::<_, String>(()))
///         .unwrap();
///     provider.force_flush().await.unwrap();
///
///     let spans = exporter.get_finished_spans().unwrap();
///     for span in spans {
///         println!("{:?}", span)
///     }
///# }
/// ```
#[derive(Clone, Debug)]
pub struct InMemorySpanExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
    resource: Arc<Mutex<Resource>>,
    should_reset_on_shutdown: bool,
}

impl Default for InMemorySpanExporter {
    fn default() -> Self {
        InMemorySpanExporterBuilder::new().build()
    }
}

/// Builder for [`InMemorySpanExporter`].
#[derive(Clone, Debug)]
pub struct InMemorySpanExporterBuilder {
    reset_on_shutdown: bool,
}

impl Default for InMemorySpanExporterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySpanExporterBuilder {
    /// Creates a new instance of the `InMemorySpanExporterBuilder`.
    pub fn new() -> Self {
        Self {
            reset_on_shutdown: true,
        }
    }

    /// Creates a new instance of the `InMemorySpanExporter`.
    pub fn build(&self) -> InMemorySpanExporter {
        InMemorySpanExporter {
            spans: Arc::new(Mutex::new(Vec::new())),
            resource: Arc::new(Mutex::new(Resource::builder_empty().build())),
            should_reset_on_shutdown: self.reset_on_shutdown,
        }
    }

    /// If set, the spans will not be [`InMemorySpanExporter::reset`] on shutdown.
    pub fn keep_records_on_shutdown(self) -> Self {
        Self {
            reset_on_shutdown: false,
        }
    }
}

impl InMemorySpanExporter {
    /// Returns the finished spans as a vector of `SpanData`.
    pub fn get_finished_spans(&self) -> Result<Vec<SpanData>, OTelSdkError> {
        let spans = self
            .spans
            .lock()
            .map_err(|e| OTelSdkError::InternalFailure(format!("Failed to lock spans: {e}")))?;
        Ok(spans.clone())
    }

    /// The resource last handed to this exporter.
    pub fn resource(&self) -> Result<Resource, OTelSdkError> {
        let resource = self.resource.lock().map_err(|e| {
            OTelSdkError::InternalFailure(format!("Failed to lock resource: {e}"))
        })?;
        Ok(resource.clone())
    }

    /// Clears the internal storage of finished spans.
    pub fn reset(&self) {
        if let Ok(mut spans) = self.spans.lock() {
            spans.clear();
        }
    }
}

impl SpanExporter for InMemorySpanExporter {
    async fn export(&self, mut batch: Vec<SpanData>) -> OTelSdkResult {
        let mut spans = self.spans.lock().map_err(|e| {
            OTelSdkError::InternalFailure(format!("Failed to lock spans for export: {e}"))
        })?;
        spans.append(&mut batch);
        Ok(())
    }

    async fn shutdown(&mut self) -> OTelSdkResult {
        if self.should_reset_on_shutdown {
            self.reset();
        }
        Ok(())
    }

    fn set_resource(&mut self, resource: &Resource) {
        if let Ok(mut res_guard) = self.resource.lock() {
            *res_guard = resource.clone();
        }
    }
}
