use crate::error::{OTelSdkError, OTelSdkResult};
use crate::logs::{LogBatch, LogExporter, SdkLogRecord};
use crate::Resource;
use opentelemetry::InstrumentationScope;
use std::sync::{Arc, Mutex};

/// A log record as seen by [`InMemoryLogExporter`], together with the scope
/// it was emitted under and the resource the exporter held when the batch
/// arrived.
#[derive(Clone, Debug)]
pub struct CapturedLog {
    /// The exported record.
    pub record: SdkLogRecord,
    /// Scope of the logger that emitted the record.
    pub scope: InstrumentationScope,
    /// Resource of the provider the record belongs to.
    pub resource: Resource,
}

#[derive(Debug)]
struct Captured {
    logs: Vec<CapturedLog>,
    resource: Resource,
}

/// A [`LogExporter`] keeping every exported record in memory, for tests.
///
/// Clones share the same storage, so a clone can be handed to a processor
/// while the original is used to inspect what was exported. Records are
/// cleared on shutdown unless the exporter was built with
/// [`InMemoryLogExporterBuilder::keep_records_on_shutdown`].
#[derive(Clone, Debug)]
pub struct InMemoryLogExporter {
    captured: Arc<Mutex<Captured>>,
    keep_on_shutdown: bool,
}

impl Default for InMemoryLogExporter {
    fn default() -> Self {
        InMemoryLogExporterBuilder::new().build()
    }
}

/// Builder for [`InMemoryLogExporter`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryLogExporterBuilder {
    keep_on_shutdown: bool,
}

impl InMemoryLogExporterBuilder {
    /// Start from an exporter that forgets its records on shutdown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the exported records after shutdown, so they can be inspected
    /// once the provider is gone.
    pub fn keep_records_on_shutdown(self) -> Self {
        InMemoryLogExporterBuilder {
            keep_on_shutdown: true,
        }
    }

    /// Create the exporter.
    pub fn build(&self) -> InMemoryLogExporter {
        InMemoryLogExporter {
            captured: Arc::new(Mutex::new(Captured {
                logs: Vec::new(),
                resource: Resource::builder_empty().build(),
            })),
            keep_on_shutdown: self.keep_on_shutdown,
        }
    }
}

impl InMemoryLogExporter {
    /// Every record exported so far, in export order.
    pub fn get_emitted_logs(&self) -> Result<Vec<CapturedLog>, OTelSdkError> {
        Ok(self.captured.lock()?.logs.clone())
    }

    /// Forget the records exported so far.
    pub fn reset(&self) {
        if let Ok(mut captured) = self.captured.lock() {
            captured.logs.clear();
        }
    }
}

impl LogExporter for InMemoryLogExporter {
    async fn export(&self, batch: LogBatch<'_>) -> OTelSdkResult {
        let mut captured = self.captured.lock()?;
        let resource = captured.resource.clone();
        let logs = batch.iter().map(|(record, scope)| CapturedLog {
            record: record.clone(),
            scope: scope.clone(),
            resource: resource.clone(),
        });
        captured.logs.extend(logs);
        Ok(())
    }

    async fn shutdown(&mut self) -> OTelSdkResult {
        if !self.keep_on_shutdown {
            self.reset();
        }
        Ok(())
    }

    fn set_resource(&mut self, resource: &Resource) {
        if let Ok(mut captured) = self.captured.lock() {
            captured.resource = resource.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::LogRecordLimits;
    use opentelemetry::logs::AnyValue;
    use opentelemetry::Key;

    fn export_one(exporter: &InMemoryLogExporter, body: &'static str) {
        let mut record = SdkLogRecord::new(LogRecordLimits::default());
        record.set_body(AnyValue::from(body));
        let scope = InstrumentationScope::builder("ledger").build();
        let records = [(&record, &scope)];
        futures_executor::block_on(LogExporter::export(exporter, LogBatch::new(&records)))
            .unwrap();
    }

    #[test]
    fn records_carry_scope_and_resource() {
        let mut exporter = InMemoryLogExporter::default();
        let resource = Resource::builder_empty().with_service_name("ledger").build();
        LogExporter::set_resource(&mut exporter, &resource);

        export_one(&exporter, "posted");

        let logs = exporter.get_emitted_logs().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].scope.name(), "ledger");
        assert_eq!(logs[0].record.body(), Some(&AnyValue::from("posted")));
        assert_eq!(
            logs[0].resource.get(&Key::new("service.name")),
            Some("ledger".into())
        );
    }

    #[test]
    fn shutdown_clears_records_unless_kept() {
        let mut forgetful = InMemoryLogExporter::default();
        let mut keeping = InMemoryLogExporterBuilder::new()
            .keep_records_on_shutdown()
            .build();

        for exporter in [&forgetful, &keeping] {
            export_one(exporter, "posted");
        }
        futures_executor::block_on(LogExporter::shutdown(&mut forgetful)).unwrap();
        futures_executor::block_on(LogExporter::shutdown(&mut keeping)).unwrap();

        assert!(forgetful.get_emitted_logs().unwrap().is_empty());
        assert_eq!(keeping.get_emitted_logs().unwrap().len(), 1);
    }
}
