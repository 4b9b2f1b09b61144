//! # Batch processing and export pipeline
//!
//! Records produced by the application are pushed into a bounded
//! [`RecordBuffer`]. A background worker, spawned on a
//! [`Runtime`](crate::runtime::Runtime), owns the exporter and is the only
//! place where exports happen. It wakes up when:
//!
//! * the flush timer started by the first record of an idle buffer fires
//!   (one batch is exported, the timer restarts if records remain),
//! * the buffer reaches `max_export_batch_size` (full batches are exported
//!   back to back),
//! * `force_flush` or `shutdown` is requested (everything buffered at that
//!   point is exported).
//!
//! Because every trigger goes through the same worker, exports never overlap
//! and batches reach the exporter in the order they were buffered.
use crate::error::OTelSdkResult;
use crate::resource::Resource;
use std::future::Future;

mod buffer;
mod config;
mod pipeline;
mod processor;
mod scheduler;
mod shutdown;

pub use buffer::RecordBuffer;
pub use config::{BatchConfig, BatchConfigBuilder};
pub(crate) use processor::{BatchProcessor, ShutdownHook};
pub use shutdown::ShutdownGuard;

/// The exporter as seen by the batch worker.
///
/// Log and span exporters are adapted to this trait so one worker
/// implementation serves both signals.
pub(crate) trait BatchExporter<T>: Send + Sync + 'static {
    fn export(&self, batch: Vec<T>) -> impl Future<Output = OTelSdkResult> + Send;

    fn shutdown(&mut self) -> impl Future<Output = OTelSdkResult> + Send;

    fn set_resource(&mut self, resource: &Resource);
}
