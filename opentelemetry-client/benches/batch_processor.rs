/*
    Measures the producer side of the batch processors: the cost paid by
    application code for every emitted log record or ended span. Exports run
    on a background Tokio runtime and are not part of the measurement.
*/

use criterion::{criterion_group, criterion_main, Criterion};
use opentelemetry::logs::Severity;
use opentelemetry::KeyValue;
use opentelemetry_client::batch::BatchConfigBuilder;
use opentelemetry_client::logs::{
    BatchLogProcessor, LogBatch, LogExporter, SdkLogRecord, SdkLogger, SdkLoggerProvider,
};
use opentelemetry_client::runtime;
use opentelemetry_client::trace::{BatchSpanProcessor, SdkTracerProvider, SpanData, SpanExporter};
use opentelemetry_client::{OTelSdkResult, Resource};
use std::time::Duration;

// Run this benchmark with:
// cargo bench --bench batch_processor

#[derive(Debug)]
struct NoopExporter;

impl LogExporter for NoopExporter {
    async fn export(&self, _batch: LogBatch<'_>) -> OTelSdkResult {
        Ok(())
    }
}

impl SpanExporter for NoopExporter {
    async fn export(&self, _batch: Vec<SpanData>) -> OTelSdkResult {
        Ok(())
    }
}

fn create_log_record(logger: &SdkLogger) -> SdkLogRecord {
    let mut log_record = logger.create_log_record();
    log_record.set_target("my-target".to_string());
    log_record.set_event_name("CheckoutFailed");
    log_record.set_severity_number(Severity::Warn);
    log_record.set_severity_text("WARN");
    log_record.add_attribute("book_id", "12345");
    log_record.add_attribute("book_title", "Rust Programming Adventures");
    log_record.add_attribute("message", "Unable to process checkout.");
    log_record
}

fn config() -> BatchConfigBuilder {
    BatchConfigBuilder::default()
        .with_max_queue_size(65_536)
        .with_scheduled_delay(Duration::from_millis(50))
}

fn criterion_benchmark(c: &mut Criterion) {
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => panic!("failed to build the benchmark runtime: {err}"),
    };
    let _guard = rt.enter();

    let logger_provider = SdkLoggerProvider::builder()
        .with_resource(Resource::builder_empty().build())
        .with_log_processor(
            BatchLogProcessor::builder(NoopExporter, runtime::Tokio)
                .with_batch_config(config().build())
                .build(),
        )
        .build();
    let logger = logger_provider.logger("benchmark");
    c.bench_function("batch_log_emit", |b| {
        b.iter(|| logger.emit(create_log_record(&logger)));
    });

    let tracer_provider = SdkTracerProvider::builder()
        .with_resource(Resource::builder_empty().build())
        .with_span_processor(
            BatchSpanProcessor::builder(NoopExporter, runtime::Tokio)
                .with_batch_config(config().build())
                .build(),
        )
        .build();
    let tracer = tracer_provider.tracer("benchmark");
    c.bench_function("batch_span_end", |b| {
        b.iter(|| {
            let mut span = tracer.start("checkout");
            span.set_attribute(KeyValue::new("book_id", "12345"));
            span.end();
        });
    });

    let _ = rt.block_on(async {
        let (logs, traces) =
            futures_util::join!(logger_provider.shutdown(), tracer_provider.shutdown());
        logs.and(traces)
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
