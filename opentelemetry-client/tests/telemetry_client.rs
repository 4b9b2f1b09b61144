use opentelemetry::logs::{AnyValue, Severity};
use opentelemetry::trace::Status;
use opentelemetry::Key;
use opentelemetry_client::logs::{LogBatch, LogExporter};
use opentelemetry_client::trace::{SpanData, SpanExporter};
use opentelemetry_client::{OTelSdkError, OTelSdkResult, Resource, TelemetryClient};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
struct Collector {
    spans: Arc<Mutex<Vec<SpanData>>>,
    log_bodies: Arc<Mutex<Vec<String>>>,
    service_names: Arc<Mutex<Vec<String>>>,
    shutdowns: Arc<AtomicUsize>,
}

impl SpanExporter for Collector {
    async fn export(&self, batch: Vec<SpanData>) -> OTelSdkResult {
        self.spans.lock().unwrap().extend(batch);
        Ok(())
    }

    async fn shutdown(&mut self) -> OTelSdkResult {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_resource(&mut self, resource: &Resource) {
        if let Some(name) = resource.get(&Key::new("service.name")) {
            self.service_names.lock().unwrap().push(name.to_string());
        }
    }
}

impl LogExporter for Collector {
    async fn export(&self, batch: LogBatch<'_>) -> OTelSdkResult {
        let mut bodies = self.log_bodies.lock().unwrap();
        for (record, _scope) in batch.iter() {
            if let Some(AnyValue::String(body)) = record.body() {
                bodies.push(body.to_string());
            }
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> OTelSdkResult {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_resource(&mut self, resource: &Resource) {
        if let Some(name) = resource.get(&Key::new("service.name")) {
            self.service_names.lock().unwrap().push(name.to_string());
        }
    }
}

fn client(collector: &Collector) -> TelemetryClient {
    TelemetryClient::builder()
        .with_resource(Resource::builder_empty().with_service_name("orders").build())
        .with_span_exporter(collector.clone())
        .with_log_exporter(collector.clone())
        .build()
}

#[tokio::test]
async fn spans_and_logs_reach_their_exporters() {
    let collector = Collector::default();
    let client = client(&collector);
    let tracer = client.tracer("orders::api");
    let logger = client.logger("orders::api");

    let placed: Result<u32, String> = tracer.in_span("place_order", |span| {
        let mut record = logger.create_log_record();
        record.set_severity_number(Severity::Info);
        record.set_body(AnyValue::from("order placed"));
        logger.emit(record);
        span.add_event("validated", vec![]);
        Ok(7)
    });
    let cancelled: Result<u32, String> =
        tracer.in_span("cancel_order", |_| Err("already shipped".to_string()));
    client.force_flush().await.unwrap();

    assert_eq!(placed, Ok(7));
    assert!(cancelled.is_err());
    let spans = collector.spans.lock().unwrap().clone();
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].status, Status::Ok);
    assert_eq!(spans[1].status, Status::error("already shipped"));
    assert_eq!(spans[1].events[0].name, "exception");
    assert_eq!(
        collector.log_bodies.lock().unwrap().clone(),
        vec!["order placed".to_string()]
    );
    assert_eq!(
        collector.service_names.lock().unwrap().clone(),
        vec!["orders".to_string(), "orders".to_string()]
    );

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutdown_is_shared_and_final() {
    let collector = Collector::default();
    let client = client(&collector);
    let other_handle = client.clone();

    let (first, second) = tokio::join!(client.shutdown(), other_handle.shutdown());

    assert_eq!(first, Ok(()));
    assert_eq!(second, Ok(()));
    assert_eq!(client.shutdown().await, Ok(()));
    // one span exporter and one log exporter
    assert_eq!(collector.shutdowns.load(Ordering::SeqCst), 2);
    assert_eq!(client.force_flush().await, Err(OTelSdkError::AlreadyShutdown));

    let logger = client.logger("orders::api");
    logger.emit(logger.create_log_record());
    client.tracer("orders::api").start("ignored").end();
    assert!(collector.spans.lock().unwrap().is_empty());
}

#[tokio::test]
async fn async_work_is_traced() {
    let collector = Collector::default();
    let client = client(&collector);
    let tracer = client.tracer("orders::jobs");

    let total = tracer
        .in_span_async("settle", |cx| {
            let child_tracer = tracer.clone();
            async move {
                child_tracer.start_child("fetch_rates", &cx).end();
                tokio::task::yield_now().await;
                Ok::<_, String>(3)
            }
        })
        .await;
    client.force_flush().await.unwrap();

    assert_eq!(total, Ok(3));
    let spans = collector.spans.lock().unwrap().clone();
    let (child, parent) = (&spans[0], &spans[1]);
    assert_eq!(child.parent_span_id, parent.span_id);
    assert_eq!(child.trace_id, parent.trace_id);
    client.shutdown().await.unwrap();
}
