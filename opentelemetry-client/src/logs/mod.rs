//! # Logs
//!
//! Log records are created by an [`SdkLogger`], handed to every
//! [`LogProcessor`] of its [`SdkLoggerProvider`] and, through a
//! [`BatchLogProcessor`], exported in batches by a [`LogExporter`].
//!
//! ```no_run
//! use opentelemetry::logs::Severity;
//! use opentelemetry_client::logs::{JsonLogExporter, SdkLoggerProvider};
//! use opentelemetry_client::Resource;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let provider = SdkLoggerProvider::builder()
//!     .with_resource(Resource::builder().with_service_name("checkout").build())
//!     .with_batch_exporter(JsonLogExporter::new(std::io::stdout()))
//!     .build();
//!
//! let logger = provider.logger("checkout::cart");
//! let mut record = logger.create_log_record();
//! record.set_severity_number(Severity::Info);
//! record.set_body("item added".into());
//! logger.emit(record);
//!
//! provider.shutdown().await.unwrap();
//! # }
//! ```
mod export;
#[cfg(any(feature = "testing", test))]
mod in_memory_exporter;
mod json;
mod log_processor;
mod logger;
mod logger_provider;
mod record;

pub use export::{LogBatch, LogExporter};
#[cfg(any(feature = "testing", test))]
#[cfg_attr(docsrs, doc(cfg(any(feature = "testing", test))))]
pub use in_memory_exporter::{CapturedLog, InMemoryLogExporter, InMemoryLogExporterBuilder};
pub use json::JsonLogExporter;
pub use log_processor::{BatchLogProcessor, BatchLogProcessorBuilder, LogProcessor};
pub use logger::SdkLogger;
pub use logger_provider::{LoggerProviderBuilder, SdkLoggerProvider};
pub use record::{LogRecordLimits, SdkLogRecord, TraceContext};
