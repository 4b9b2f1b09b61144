use super::{SdkLogRecord, SdkLoggerProvider};
use opentelemetry::{otel_debug, InstrumentationScope};
use std::time::SystemTime;

#[derive(Debug, Clone)]
/// The object for emitting [`SdkLogRecord`]s.
pub struct SdkLogger {
    scope: InstrumentationScope,
    provider: SdkLoggerProvider,
}

impl SdkLogger {
    pub(crate) fn new(scope: InstrumentationScope, provider: SdkLoggerProvider) -> Self {
        SdkLogger { scope, provider }
    }

    /// The instrumentation scope records of this logger are attributed to.
    pub fn instrumentation_scope(&self) -> &InstrumentationScope {
        &self.scope
    }

    /// Create an empty record carrying the provider's attribute limits.
    pub fn create_log_record(&self) -> SdkLogRecord {
        SdkLogRecord::new(self.provider.log_record_limits())
    }

    /// Emit a record to every processor of the provider.
    ///
    /// Never blocks and never fails. Records emitted after the provider was
    /// shut down are dropped.
    pub fn emit(&self, mut record: SdkLogRecord) {
        if self.provider.is_shutdown() {
            otel_debug!(
                name: "Logger.Emit.AfterShutdown",
                logger_name = format!("{}", self.scope.name())
            );
            return;
        }
        if record.observed_timestamp.is_none() {
            record.observed_timestamp = Some(SystemTime::now());
        }

        for processor in self.provider.log_processors() {
            processor.emit(&mut record, &self.scope);
        }
    }
}
