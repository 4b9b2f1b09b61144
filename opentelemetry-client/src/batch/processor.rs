use crate::batch::buffer::RecordBuffer;
use crate::batch::config::BatchConfig;
use crate::batch::pipeline::ExportPipeline;
use crate::batch::scheduler::FlushScheduler;
use crate::batch::shutdown::ShutdownGuard;
use crate::batch::BatchExporter;
use crate::error::{OTelSdkError, OTelSdkResult};
use crate::resource::Resource;
use crate::runtime::{Runtime, RuntimeChannel, TrySend};
use futures_channel::{mpsc, oneshot};
use futures_util::{
    future::{self, Either, FutureExt},
    pin_mut,
    stream::{self, PollNext, StreamExt},
};
use opentelemetry::{otel_debug, otel_error, otel_info, otel_warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Teardown step run by the worker after the exporter has been shut down.
pub(crate) type ShutdownHook = Box<dyn FnOnce() -> OTelSdkResult + Send + 'static>;

// At most one pending wake-up per kind.
const WAKE_UP_CHANNEL_CAPACITY: usize = 4;

/// Messages sent from the processor handle to its worker.
///
/// Wake-ups travel over the runtime's bounded channel. Lifecycle requests
/// travel over an unbounded lane, so they are never rejected while the
/// worker is busy exporting.
#[derive(Debug)]
enum BatchMessage {
    /// A record entered the buffer; make sure the flush timer runs.
    ArmTimer,
    /// The buffer holds at least one full batch.
    ExportBatch,
    /// Export everything currently buffered and report the outcome.
    ForceFlush(oneshot::Sender<OTelSdkResult>),
    /// Flush, shut the exporter down and stop the worker.
    Shutdown(oneshot::Sender<OTelSdkResult>),
    /// Hand the resource to the exporter.
    SetResource(Arc<Resource>),
}

// Lifecycle requests overtake pending wake-ups, so the resource is in place
// before the first export.
fn control_first(_: &mut ()) -> PollNext {
    PollNext::Left
}

enum WorkerEvent {
    Message(Option<BatchMessage>),
    TimerFired,
}

/// Producer-side handle of a batch processor.
///
/// Records are pushed into the shared [`RecordBuffer`] directly; the worker is
/// only notified when it has something new to do.
pub(crate) struct BatchProcessor<T, R: RuntimeChannel> {
    buffer: Arc<Mutex<RecordBuffer<T>>>,
    message_sender: R::Sender<BatchMessage>,
    control_sender: mpsc::UnboundedSender<BatchMessage>,
    timer_requested: Arc<AtomicBool>,
    export_requested: Arc<AtomicBool>,
    dropping_reported: AtomicBool,
    max_export_batch_size: usize,
    export_failures: Arc<AtomicUsize>,
    shutdown: ShutdownGuard,
}

impl<T, R: RuntimeChannel> fmt::Debug for BatchProcessor<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("message_sender", &self.message_sender)
            .field("max_export_batch_size", &self.max_export_batch_size)
            .field("shutdown", &self.shutdown)
            .finish()
    }
}

impl<T, R> BatchProcessor<T, R>
where
    T: Send + 'static,
    R: RuntimeChannel,
{
    /// Create the processor and spawn its worker on `runtime`.
    pub(crate) fn new<E>(
        exporter: E,
        config: BatchConfig,
        runtime: R,
        shutdown_hook: Option<ShutdownHook>,
    ) -> Self
    where
        E: BatchExporter<T>,
    {
        let buffer = Arc::new(Mutex::new(RecordBuffer::new(config.max_queue_size)));
        let (message_sender, message_receiver) =
            runtime.batch_message_channel(WAKE_UP_CHANNEL_CAPACITY);
        let (control_sender, control_receiver) = mpsc::unbounded();
        let timer_requested = Arc::new(AtomicBool::new(false));
        let export_requested = Arc::new(AtomicBool::new(false));
        let export_failures = Arc::new(AtomicUsize::new(0));

        let worker = BatchWorker {
            pipeline: ExportPipeline::new(
                buffer.clone(),
                exporter,
                runtime.clone(),
                config.max_export_batch_size,
                config.max_export_timeout,
                export_failures.clone(),
            ),
            scheduler: FlushScheduler::new(runtime.clone(), config.scheduled_delay),
            timer_requested: timer_requested.clone(),
            export_requested: export_requested.clone(),
            shutdown_hook,
        };
        let messages =
            stream::select_with_strategy(control_receiver, message_receiver, control_first);
        runtime.spawn(worker.run(messages).boxed());

        otel_debug!(
            name: "BatchProcessor.Created",
            max_queue_size = config.max_queue_size,
            max_export_batch_size = config.max_export_batch_size,
            scheduled_delay_ms = config.scheduled_delay.as_millis() as u64,
            export_timeout_ms = config.max_export_timeout.as_millis() as u64
        );

        BatchProcessor {
            buffer,
            message_sender,
            control_sender,
            timer_requested,
            export_requested,
            dropping_reported: AtomicBool::new(false),
            max_export_batch_size: config.max_export_batch_size,
            export_failures,
            shutdown: ShutdownGuard::new(),
        }
    }

    /// Buffer `record` for export. Never blocks and never fails; records that
    /// do not fit, or arrive after shutdown, are dropped.
    pub(crate) fn push(&self, record: T) {
        if self.shutdown.is_shutdown() {
            otel_warn!(
                name: "BatchProcessor.Emit.AfterShutdown",
                message = "Record dropped because the processor is already shut down."
            );
            return;
        }

        let buffered = match self.buffer.lock() {
            Ok(mut buffer) => buffer.add(record).then(|| buffer.len()),
            Err(_) => {
                otel_error!(name: "BatchProcessor.Emit.BufferPoisoned");
                return;
            }
        };

        let Some(buffered) = buffered else {
            // Report the first drop only; the total is logged at shutdown.
            if !self.dropping_reported.swap(true, Ordering::Relaxed) {
                otel_warn!(
                    name: "BatchProcessor.RecordDroppingStarted",
                    message = "Beginning to drop records because the buffer is full. The total number of dropped records is logged at shutdown."
                );
            }
            return;
        };

        if !self.timer_requested.swap(true, Ordering::SeqCst) {
            self.notify(BatchMessage::ArmTimer, &self.timer_requested);
        }
        if buffered >= self.max_export_batch_size
            && !self.export_requested.swap(true, Ordering::SeqCst)
        {
            self.notify(BatchMessage::ExportBatch, &self.export_requested);
        }
    }

    fn notify(&self, message: BatchMessage, pending_flag: &AtomicBool) {
        if let Err(err) = self.message_sender.try_send(message) {
            // let a later record retry the wake-up
            pending_flag.store(false, Ordering::SeqCst);
            otel_debug!(
                name: "BatchProcessor.NotifyWorker.Failed",
                error = format!("{err}")
            );
        }
    }

    /// Export every record buffered at the time of the call.
    pub(crate) async fn force_flush(&self) -> OTelSdkResult {
        if self.shutdown.is_shutdown() {
            return Err(OTelSdkError::AlreadyShutdown);
        }
        let (sender, receiver) = oneshot::channel();
        self.control_sender
            .unbounded_send(BatchMessage::ForceFlush(sender))
            .map_err(|_| OTelSdkError::InternalFailure("batch worker is gone".into()))?;
        receiver.await.map_err(|err| {
            OTelSdkError::InternalFailure(format!("flush response channel closed: {err}"))
        })?
    }

    /// Cancel the timer, flush what is buffered, shut the exporter down and
    /// run the teardown hook. Runs once; every caller gets the same outcome.
    pub(crate) async fn shutdown(&self) -> OTelSdkResult {
        self.shutdown
            .shutdown(|| {
                let (sender, receiver) = oneshot::channel();
                // only fails once the worker has exited, so nothing is left to shut down
                let requested = self
                    .control_sender
                    .unbounded_send(BatchMessage::Shutdown(sender))
                    .map_err(|_| OTelSdkError::InternalFailure("batch worker is gone".into()));
                async move {
                    requested?;
                    receiver.await.map_err(|err| {
                        OTelSdkError::InternalFailure(format!(
                            "shutdown response channel closed: {err}"
                        ))
                    })?
                }
            })
            .await
    }

    pub(crate) fn set_resource(&self, resource: &Resource) {
        let message = BatchMessage::SetResource(Arc::new(resource.clone()));
        if self.control_sender.unbounded_send(message).is_err() {
            otel_error!(
                name: "BatchProcessor.SetResource.Failed",
                message = "batch worker is gone"
            );
        }
    }

    pub(crate) fn dropped_records(&self) -> usize {
        self.buffer
            .lock()
            .map(|buffer| buffer.dropped_count())
            .unwrap_or(0)
    }

    pub(crate) fn export_failures(&self) -> usize {
        self.export_failures.load(Ordering::Relaxed)
    }
}

/// The single logical run-loop that owns the exporter.
struct BatchWorker<T, E, R: Runtime> {
    pipeline: ExportPipeline<T, E, R>,
    scheduler: FlushScheduler<R>,
    timer_requested: Arc<AtomicBool>,
    export_requested: Arc<AtomicBool>,
    shutdown_hook: Option<ShutdownHook>,
}

impl<T, E, R> BatchWorker<T, E, R>
where
    T: Send + 'static,
    E: BatchExporter<T>,
    R: Runtime,
{
    async fn run<S>(mut self, mut messages: S)
    where
        S: futures_util::Stream<Item = BatchMessage> + Send + Unpin,
    {
        loop {
            let event = {
                let fired = self.scheduler.fired();
                pin_mut!(fired);
                match future::select(messages.next(), fired).await {
                    Either::Left((message, _)) => WorkerEvent::Message(message),
                    Either::Right(((), _)) => WorkerEvent::TimerFired,
                }
            };

            match event {
                WorkerEvent::TimerFired => {
                    self.timer_requested.store(false, Ordering::SeqCst);
                    if let Err(err) = self.pipeline.flush_one_batch().await {
                        otel_warn!(
                            name: "BatchProcessor.ScheduledExport.Failed",
                            error = format!("{err}")
                        );
                    }
                    self.rearm_if_pending();
                }
                WorkerEvent::Message(Some(BatchMessage::ArmTimer)) => {
                    self.scheduler.notify_record_added();
                }
                WorkerEvent::Message(Some(BatchMessage::ExportBatch)) => {
                    self.export_requested.store(false, Ordering::SeqCst);
                    while self.pipeline.has_full_batch() {
                        if let Err(err) = self.pipeline.flush_one_batch().await {
                            otel_warn!(
                                name: "BatchProcessor.BatchExport.Failed",
                                error = format!("{err}")
                            );
                        }
                    }
                }
                WorkerEvent::Message(Some(BatchMessage::ForceFlush(sender))) => {
                    otel_debug!(name: "BatchProcessor.ForceFlush");
                    let result = self.pipeline.force_flush().await;
                    if let Err(err) = &result {
                        otel_debug!(
                            name: "BatchProcessor.ForceFlush.ExportError",
                            error = format!("{err}")
                        );
                    }
                    let _ = sender.send(result);
                }
                WorkerEvent::Message(Some(BatchMessage::Shutdown(sender))) => {
                    let result = self.shutdown().await;
                    let _ = sender.send(result);
                    break;
                }
                WorkerEvent::Message(Some(BatchMessage::SetResource(resource))) => {
                    self.pipeline.set_resource(&resource);
                }
                WorkerEvent::Message(None) => {
                    // every handle is gone, nobody is left to report to
                    otel_debug!(name: "BatchProcessor.ChannelClosed");
                    if let Err(err) = self.shutdown().await {
                        otel_warn!(
                            name: "BatchProcessor.Shutdown.Failed",
                            error = format!("{err}")
                        );
                    }
                    break;
                }
            }
        }
        otel_debug!(name: "BatchProcessor.WorkerExiting");
    }

    fn rearm_if_pending(&mut self) {
        if !self.pipeline.is_empty() && !self.timer_requested.swap(true, Ordering::SeqCst) {
            self.scheduler.notify_record_added();
        }
    }

    async fn shutdown(&mut self) -> OTelSdkResult {
        self.scheduler.cancel();
        let result = self.pipeline.shutdown().await;
        let hook_result = self.shutdown_hook.take().map_or(Ok(()), |hook| hook());
        let result = OTelSdkError::combine([result, hook_result]);
        otel_info!(
            name: "BatchProcessor.Shutdown",
            succeeded = result.is_ok()
        );
        result
    }
}
