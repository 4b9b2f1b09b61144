//! Log exporters
use crate::batch::BatchExporter;
use crate::error::OTelSdkResult;
use crate::logs::SdkLogRecord;
use crate::Resource;
use opentelemetry::InstrumentationScope;
use std::fmt::Debug;
use std::future::Future;

/// A log record paired with the scope of the logger that emitted it, as held
/// by the batch log processor.
pub(crate) type LogData = Box<(SdkLogRecord, InstrumentationScope)>;

/// A batch of log records to be exported by a `LogExporter`.
///
/// The `LogBatch` struct holds a collection of log records along with their associated
/// instrumentation scopes. The batch only borrows the records, so exporters that need
/// to keep them must clone.
#[derive(Debug)]
pub struct LogBatch<'a> {
    data: LogBatchData<'a>,
}

#[derive(Debug)]
enum LogBatchData<'a> {
    // drained from a batch processor buffer
    Owned(&'a [LogData]),
    Borrowed(&'a [(&'a SdkLogRecord, &'a InstrumentationScope)]),
}

impl<'a> LogBatch<'a> {
    /// Creates a new instance of `LogBatch` over borrowed records.
    pub fn new(data: &'a [(&'a SdkLogRecord, &'a InstrumentationScope)]) -> LogBatch<'a> {
        LogBatch {
            data: LogBatchData::Borrowed(data),
        }
    }

    pub(crate) fn new_with_owned_data(data: &'a [LogData]) -> LogBatch<'a> {
        LogBatch {
            data: LogBatchData::Owned(data),
        }
    }

    /// Returns an iterator over the log records and instrumentation scopes in the batch.
    pub fn iter(&self) -> impl Iterator<Item = (&'a SdkLogRecord, &'a InstrumentationScope)> + '_ {
        let (owned, borrowed): (&'a [LogData], &'a [(&'a SdkLogRecord, &'a InstrumentationScope)]) =
            match self.data {
                LogBatchData::Owned(data) => (data, &[]),
                LogBatchData::Borrowed(data) => (&[], data),
            };
        owned
            .iter()
            .map(|data| (&data.0, &data.1))
            .chain(borrowed.iter().map(|(record, scope)| (*record, *scope)))
    }

    /// Number of records in the batch.
    pub fn len(&self) -> usize {
        match self.data {
            LogBatchData::Owned(data) => data.len(),
            LogBatchData::Borrowed(data) => data.len(),
        }
    }

    /// Whether the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `LogExporter` defines the interface that log exporters should implement.
///
/// Exporters are owned by a single batch worker: `export` is never called
/// again before the previous call has completed.
pub trait LogExporter: Send + Sync + Debug {
    /// Exports a batch of log records and their associated instrumentation scopes.
    ///
    /// The returned future must eventually complete. The batch processor
    /// abandons it once the export timeout has elapsed and reports the batch
    /// as failed.
    fn export(&self, batch: LogBatch<'_>) -> impl Future<Output = OTelSdkResult> + Send;

    /// Shuts down the exporter, releasing its transport.
    fn shutdown(&mut self) -> impl Future<Output = OTelSdkResult> + Send {
        async { Ok(()) }
    }

    /// Set the resource for the exporter.
    fn set_resource(&mut self, _resource: &Resource) {}
}

impl<E: LogExporter + 'static> BatchExporter<LogData> for E {
    fn export(&self, batch: Vec<LogData>) -> impl Future<Output = OTelSdkResult> + Send {
        async move { LogExporter::export(self, LogBatch::new_with_owned_data(&batch)).await }
    }

    fn shutdown(&mut self) -> impl Future<Output = OTelSdkResult> + Send {
        LogExporter::shutdown(self)
    }

    fn set_resource(&mut self, resource: &Resource) {
        LogExporter::set_resource(self, resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::LogRecordLimits;

    fn record(body: &'static str) -> SdkLogRecord {
        let mut record = SdkLogRecord::new(LogRecordLimits::default());
        record.set_body(body.into());
        record
    }

    fn bodies(batch: &LogBatch<'_>) -> Vec<String> {
        batch
            .iter()
            .map(|(record, _)| format!("{:?}", record.body()))
            .collect()
    }

    #[test]
    fn owned_and_borrowed_batches_iterate_in_order() {
        let scope = InstrumentationScope::builder("test").build();
        let owned: Vec<LogData> = vec![
            Box::new((record("a"), scope.clone())),
            Box::new((record("b"), scope.clone())),
        ];
        let owned_batch = LogBatch::new_with_owned_data(&owned);

        let (a, b) = (record("a"), record("b"));
        let borrowed = [(&a, &scope), (&b, &scope)];
        let borrowed_batch = LogBatch::new(&borrowed);

        assert_eq!(owned_batch.len(), 2);
        assert_eq!(bodies(&owned_batch), bodies(&borrowed_batch));
        assert!(LogBatch::new(&[]).is_empty());
    }
}
