use crate::batch::buffer::RecordBuffer;
use crate::batch::BatchExporter;
use crate::error::{OTelSdkError, OTelSdkResult};
use crate::resource::Resource;
use crate::runtime::Runtime;
use futures_util::{
    future::{self, Either},
    pin_mut,
};
use opentelemetry::{otel_debug, otel_warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Moves records from the shared buffer to the exporter, one batch at a time.
///
/// The pipeline is owned by the batch worker, which awaits every export before
/// touching the exporter again. Batches therefore reach the exporter in the
/// order they were drained and never overlap.
pub(crate) struct ExportPipeline<T, E, R> {
    buffer: Arc<Mutex<RecordBuffer<T>>>,
    exporter: E,
    runtime: R,
    resource: Option<Resource>,
    max_export_batch_size: usize,
    export_timeout: Duration,
    export_failures: Arc<AtomicUsize>,
}

impl<T, E, R> ExportPipeline<T, E, R>
where
    T: Send + 'static,
    E: BatchExporter<T>,
    R: Runtime,
{
    pub(crate) fn new(
        buffer: Arc<Mutex<RecordBuffer<T>>>,
        exporter: E,
        runtime: R,
        max_export_batch_size: usize,
        export_timeout: Duration,
        export_failures: Arc<AtomicUsize>,
    ) -> Self {
        ExportPipeline {
            buffer,
            exporter,
            runtime,
            resource: None,
            max_export_batch_size,
            export_timeout,
            export_failures,
        }
    }

    pub(crate) fn set_resource(&mut self, resource: &Resource) {
        self.exporter.set_resource(resource);
        self.resource = Some(resource.clone());
    }

    /// Whether the buffer holds at least one full batch.
    pub(crate) fn has_full_batch(&self) -> bool {
        self.buffered() >= self.max_export_batch_size
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.buffered() == 0
    }

    fn buffered(&self) -> usize {
        self.buffer.lock().map(|buffer| buffer.len()).unwrap_or(0)
    }

    fn drain(&self, max_size: usize) -> Result<Vec<T>, OTelSdkError> {
        let mut buffer = self.buffer.lock()?;
        Ok(buffer.drain_batch(max_size))
    }

    /// Drain one batch and hand it to the exporter.
    ///
    /// A batch that fails or times out is counted and discarded.
    pub(crate) async fn flush_one_batch(&mut self) -> OTelSdkResult {
        let batch = self.drain(self.max_export_batch_size)?;
        self.export(batch).await
    }

    /// Export everything buffered at the time of the call.
    ///
    /// Records added while the flush is running are left for the next cycle,
    /// so a busy producer cannot keep the flush going forever. Every batch is
    /// attempted even if an earlier one failed; the failures are returned
    /// together.
    pub(crate) async fn force_flush(&mut self) -> OTelSdkResult {
        let mut remaining = self.buffered();
        let mut errors = Vec::new();

        while remaining > 0 {
            let batch = self.drain(remaining.min(self.max_export_batch_size))?;
            if batch.is_empty() {
                break;
            }
            remaining = remaining.saturating_sub(batch.len());
            if let Err(err) = self.export(batch).await {
                errors.push(err);
            }
        }

        OTelSdkError::aggregate(errors)
    }

    /// Flush what is left and release the exporter.
    pub(crate) async fn shutdown(&mut self) -> OTelSdkResult {
        let flush_result = self.force_flush().await;

        if let Ok(buffer) = self.buffer.lock() {
            let dropped = buffer.dropped_count();
            if dropped > 0 {
                otel_warn!(
                    name: "BatchProcessor.RecordsDropped",
                    dropped_records_count = dropped,
                    message = "Records were dropped because the buffer was full. Increase the queue size or decrease the scheduled delay."
                );
            }
        }

        let shutdown_result = self.exporter.shutdown().await;
        OTelSdkError::combine([flush_result, shutdown_result])
    }

    async fn export(&mut self, batch: Vec<T>) -> OTelSdkResult {
        let count = batch.len();
        let result = export_with_timeout(
            self.export_timeout,
            &self.exporter,
            &self.runtime,
            self.resource.as_ref(),
            batch,
        )
        .await;

        if let Err(err) = &result {
            self.export_failures.fetch_add(1, Ordering::Relaxed);
            otel_debug!(
                name: "BatchProcessor.BatchDiscarded",
                batch_size = count,
                error = format!("{err}")
            );
        }
        result
    }
}

/// Export `batch`, giving up once `time_out` has elapsed.
///
/// Pending asynchronous resource attributes are awaited first, within the
/// same time budget, so the exporter observes a settled resource.
pub(crate) async fn export_with_timeout<T, E, R>(
    time_out: Duration,
    exporter: &E,
    runtime: &R,
    resource: Option<&Resource>,
    batch: Vec<T>,
) -> OTelSdkResult
where
    T: Send + 'static,
    E: BatchExporter<T>,
    R: Runtime,
{
    if batch.is_empty() {
        return Ok(());
    }

    let export = async move {
        if let Some(resource) = resource {
            if resource.async_attributes_pending() {
                resource.wait_for_async_attributes().await;
            }
        }
        exporter.export(batch).await
    };
    let timeout = runtime.delay(time_out);
    pin_mut!(export);
    pin_mut!(timeout);
    match future::select(export, timeout).await {
        Either::Left((export_res, _)) => export_res,
        Either::Right((_, _)) => Err(OTelSdkError::Timeout(time_out)),
    }
}

#[cfg(all(test, feature = "rt-tokio"))]
mod tests {
    use super::ExportPipeline;
    use crate::batch::buffer::RecordBuffer;
    use crate::batch::BatchExporter;
    use crate::error::{OTelSdkError, OTelSdkResult};
    use crate::resource::Resource;
    use crate::runtime;
    use opentelemetry::{Key, KeyValue};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone, Default)]
    struct RecordingExporter {
        batches: Arc<Mutex<Vec<Vec<u32>>>>,
        fail: bool,
        delay: Option<Duration>,
        shutdown_calls: Arc<AtomicUsize>,
        saw_pending_resource: Arc<AtomicBool>,
        resource: Option<Resource>,
    }

    impl BatchExporter<u32> for RecordingExporter {
        async fn export(&self, batch: Vec<u32>) -> OTelSdkResult {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(resource) = &self.resource {
                if resource.async_attributes_pending() {
                    self.saw_pending_resource.store(true, Ordering::SeqCst);
                }
            }
            self.batches.lock().unwrap().push(batch);
            if self.fail {
                Err(OTelSdkError::InternalFailure("collector unavailable".into()))
            } else {
                Ok(())
            }
        }

        async fn shutdown(&mut self) -> OTelSdkResult {
            self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn set_resource(&mut self, resource: &Resource) {
            self.resource = Some(resource.clone());
        }
    }

    fn pipeline(
        exporter: RecordingExporter,
        records: impl IntoIterator<Item = u32>,
        max_export_batch_size: usize,
    ) -> ExportPipeline<u32, RecordingExporter, runtime::Tokio> {
        let mut buffer = RecordBuffer::new(10);
        for record in records {
            buffer.add(record);
        }
        ExportPipeline::new(
            Arc::new(Mutex::new(buffer)),
            exporter,
            runtime::Tokio,
            max_export_batch_size,
            Duration::from_millis(100),
            Arc::new(AtomicUsize::new(0)),
        )
    }

    #[tokio::test]
    async fn force_flush_exports_in_batches_preserving_order() {
        let exporter = RecordingExporter::default();
        let mut pipeline = pipeline(exporter.clone(), 1..=5, 2);

        pipeline.force_flush().await.unwrap();

        let batches = exporter.batches.lock().unwrap().clone();
        assert_eq!(batches, vec![vec![1, 2], vec![3, 4], vec![5]]);
        assert!(pipeline.is_empty());
    }

    #[tokio::test]
    async fn flush_one_batch_exports_a_single_batch() {
        let exporter = RecordingExporter::default();
        let mut pipeline = pipeline(exporter.clone(), 1..=5, 2);

        assert!(pipeline.has_full_batch());
        pipeline.flush_one_batch().await.unwrap();

        assert_eq!(*exporter.batches.lock().unwrap(), vec![vec![1, 2]]);
        assert_eq!(pipeline.buffered(), 3);
    }

    #[tokio::test]
    async fn empty_flush_does_not_call_exporter() {
        let exporter = RecordingExporter::default();
        let mut pipeline = pipeline(exporter.clone(), [], 2);

        pipeline.flush_one_batch().await.unwrap();
        pipeline.force_flush().await.unwrap();

        assert!(exporter.batches.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_batch_is_discarded_and_counted() {
        let exporter = RecordingExporter {
            delay: Some(Duration::from_secs(10)),
            ..Default::default()
        };
        let mut pipeline = pipeline(exporter.clone(), 1..=3, 2);

        let result = pipeline.flush_one_batch().await;

        assert_eq!(result, Err(OTelSdkError::Timeout(Duration::from_millis(100))));
        assert_eq!(pipeline.export_failures.load(Ordering::SeqCst), 1);
        // not requeued
        assert_eq!(pipeline.buffered(), 1);
        assert!(exporter.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn force_flush_attempts_every_batch_and_aggregates_failures() {
        let exporter = RecordingExporter {
            fail: true,
            ..Default::default()
        };
        let mut pipeline = pipeline(exporter.clone(), 1..=5, 2);

        let err = pipeline.force_flush().await.unwrap_err();

        match err {
            OTelSdkError::ExportFailures(errors) => assert_eq!(errors.len(), 3),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(exporter.batches.lock().unwrap().len(), 3);
        assert_eq!(pipeline.export_failures.load(Ordering::SeqCst), 3);
        assert!(pipeline.is_empty());
    }

    #[tokio::test]
    async fn shutdown_flushes_then_closes_exporter() {
        let exporter = RecordingExporter::default();
        let mut pipeline = pipeline(exporter.clone(), 1..=3, 2);

        pipeline.shutdown().await.unwrap();

        assert_eq!(exporter.batches.lock().unwrap().len(), 2);
        assert_eq!(exporter.shutdown_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn export_waits_for_async_resource_attributes() {
        let exporter = RecordingExporter::default();
        let mut pipeline = pipeline(exporter.clone(), 1..=1, 2);
        let resource = Resource::builder_empty()
            .with_attribute(KeyValue::new("service.name", "checkout"))
            .with_async_attributes(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                vec![KeyValue::new("host.id", "abc")]
            })
            .build();
        pipeline.set_resource(&resource);

        pipeline.force_flush().await.unwrap();

        assert!(!exporter.saw_pending_resource.load(Ordering::SeqCst));
        assert!(!resource.async_attributes_pending());
        assert_eq!(resource.get(&Key::new("host.id")), Some("abc".into()));
    }
}
