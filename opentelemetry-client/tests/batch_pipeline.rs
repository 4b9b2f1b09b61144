use opentelemetry_client::batch::{BatchConfig, BatchConfigBuilder};
use opentelemetry_client::runtime;
use opentelemetry_client::trace::{BatchSpanProcessor, SdkTracerProvider, SpanData, SpanExporter};
use opentelemetry_client::{OTelSdkError, OTelSdkResult, Resource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
struct RecordingExporter {
    batches: Arc<Mutex<Vec<Vec<String>>>>,
    shutdowns: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl RecordingExporter {
    fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

impl SpanExporter for RecordingExporter {
    async fn export(&self, batch: Vec<SpanData>) -> OTelSdkResult {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let names = batch.into_iter().map(|span| span.name.into_owned()).collect();
        self.batches.lock().unwrap().push(names);
        Ok(())
    }

    async fn shutdown(&mut self) -> OTelSdkResult {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn config(max_queue_size: usize, max_export_batch_size: usize) -> BatchConfigBuilder {
    BatchConfigBuilder::default()
        .with_max_queue_size(max_queue_size)
        .with_max_export_batch_size(max_export_batch_size)
        .with_scheduled_delay(Duration::from_secs(60))
}

fn provider(
    exporter: &RecordingExporter,
    config: BatchConfig,
) -> (SdkTracerProvider, BatchSpanProcessor<runtime::Tokio>) {
    let processor = BatchSpanProcessor::builder(exporter.clone(), runtime::Tokio)
        .with_batch_config(config)
        .build();
    let provider = SdkTracerProvider::builder()
        .with_resource(Resource::builder_empty().build())
        .with_span_processor(processor.clone())
        .build();
    (provider, processor)
}

#[tokio::test]
async fn force_flush_exports_two_two_one() {
    let exporter = RecordingExporter::default();
    let (provider, _) = provider(&exporter, config(10, 2).build());
    let tracer = provider.tracer("pipeline");

    for name in ["r1", "r2", "r3", "r4", "r5"] {
        tracer.start(name).end();
    }
    provider.force_flush().await.unwrap();

    assert_eq!(
        exporter.batches(),
        vec![vec!["r1", "r2"], vec!["r3", "r4"], vec!["r5"]]
    );
}

#[tokio::test(start_paused = true)]
async fn overflow_is_counted_not_raised() {
    let exporter = RecordingExporter::default();
    let (provider, processor) = provider(&exporter, config(3, 3).build());
    let tracer = provider.tracer("pipeline");

    for i in 0..8 {
        tracer.start(format!("r{i}")).end();
    }

    assert_eq!(processor.dropped_records(), 5);
    provider.force_flush().await.unwrap();
    let exported: usize = exporter.batches().iter().map(Vec::len).sum();
    assert_eq!(exported, 3);
}

#[tokio::test(start_paused = true)]
async fn timer_flushes_without_being_asked() {
    let exporter = RecordingExporter::default();
    let (provider, _) = provider(
        &exporter,
        config(10, 5)
            .with_scheduled_delay(Duration::from_millis(100))
            .build(),
    );

    provider.tracer("pipeline").start("lonely").end();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(exporter.batches().is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(exporter.batches(), vec![vec!["lonely"]]);
}

#[tokio::test(start_paused = true)]
async fn slow_export_times_out_and_is_counted() {
    let exporter = RecordingExporter {
        delay: Some(Duration::from_secs(10)),
        ..Default::default()
    };
    let (provider, processor) = provider(
        &exporter,
        config(10, 10)
            .with_max_export_timeout(Duration::from_secs(1))
            .build(),
    );

    provider.tracer("pipeline").start("slow").end();

    assert_eq!(
        provider.force_flush().await,
        Err(OTelSdkError::Timeout(Duration::from_secs(1)))
    );
    assert_eq!(processor.export_failures(), 1);
    assert!(exporter.batches().is_empty());
}

#[tokio::test]
async fn concurrent_shutdown_runs_once() {
    let exporter = RecordingExporter::default();
    let (provider, _) = provider(&exporter, config(10, 2).build());
    provider.tracer("pipeline").start("last").end();
    let other_handle = provider.clone();

    let (first, second) = tokio::join!(provider.shutdown(), other_handle.shutdown());

    assert_eq!(first, Ok(()));
    assert_eq!(first, second);
    assert_eq!(exporter.shutdowns.load(Ordering::SeqCst), 1);
    assert_eq!(exporter.batches(), vec![vec!["last"]]);

    provider.tracer("pipeline").start("too late").end();
    assert_eq!(provider.shutdown().await, Ok(()));
    assert_eq!(exporter.batches().len(), 1);
}

#[tokio::test]
async fn dropping_the_last_handle_drains_the_buffer() {
    let exporter = RecordingExporter::default();
    let (provider, processor) = provider(&exporter, config(10, 10).build());
    provider.tracer("pipeline").start("orphan").end();

    drop(processor);
    drop(provider);

    for _ in 0..100 {
        if exporter.shutdowns.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(exporter.batches(), vec![vec!["orphan"]]);
    assert_eq!(exporter.shutdowns.load(Ordering::SeqCst), 1);
}

#[cfg(feature = "rt-tokio-current-thread")]
#[test]
fn dedicated_worker_thread_runs_without_ambient_runtime() {
    let exporter = RecordingExporter::default();
    let processor = BatchSpanProcessor::builder(exporter.clone(), runtime::TokioCurrentThread)
        .with_batch_config(config(10, 2).build())
        .build();
    let provider = SdkTracerProvider::builder()
        .with_resource(Resource::builder_empty().build())
        .with_span_processor(processor)
        .build();
    let tracer = provider.tracer("worker-thread");

    for name in ["t1", "t2", "t3"] {
        tracer.start(name).end();
    }
    assert_eq!(futures_executor::block_on(provider.force_flush()), Ok(()));
    tracer.start("t4").end();
    assert_eq!(futures_executor::block_on(provider.shutdown()), Ok(()));

    let exported: Vec<String> = exporter.batches().into_iter().flatten().collect();
    assert_eq!(exported, vec!["t1", "t2", "t3", "t4"]);
    assert_eq!(exporter.shutdowns.load(Ordering::SeqCst), 1);
}
