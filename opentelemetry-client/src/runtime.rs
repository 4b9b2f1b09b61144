//! Provides an abstraction of async runtimes.
//!
//! The batch processors run their export loop as a background task spawned on
//! a [`Runtime`]. Builtin implementations exist for [Tokio].
//!
//! [Tokio]: https://crates.io/crates/tokio
use futures_util::{future::BoxFuture, stream::Stream};
use std::{fmt::Debug, future::Future, time::Duration};
use thiserror::Error;

/// A runtime is an abstraction of an async runtime like [Tokio]. It allows the
/// batch processors to work with any runtime implementation.
///
/// [Tokio]: https://crates.io/crates/tokio
pub trait Runtime: Clone + Send + Sync + 'static {
    /// A future, which resolves after a previously specified amount of time. The output type is
    /// not important.
    type Delay: Future + Send + Unpin;

    /// Spawn a new task or thread, which executes the given future.
    ///
    /// # Note
    ///
    /// The function does not return a handle. Processors learn about the
    /// completion of their worker through the messages they exchange with it,
    /// so runtime implementations must keep driving the future even when no
    /// handle is held.
    fn spawn(&self, future: BoxFuture<'static, ()>);

    /// Return a new future, which resolves after the specified [std::time::Duration].
    fn delay(&self, duration: Duration) -> Self::Delay;
}

/// Runtime implementation, which works with Tokio's multi thread runtime.
///
/// Also works on a current thread runtime as long as callers await the
/// processors' `force_flush` and `shutdown` instead of blocking on them.
#[cfg(feature = "rt-tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "rt-tokio")))]
#[derive(Debug, Clone)]
pub struct Tokio;

#[cfg(feature = "rt-tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "rt-tokio")))]
impl Runtime for Tokio {
    type Delay = ::std::pin::Pin<Box<tokio::time::Sleep>>;

    fn spawn(&self, future: BoxFuture<'static, ()>) {
        #[allow(clippy::let_underscore_future)]
        // we don't have to await on the returned future to execute
        let _ = tokio::spawn(future);
    }

    fn delay(&self, duration: Duration) -> Self::Delay {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Runtime implementation, which runs the worker on a dedicated thread with
/// its own Tokio current thread runtime.
#[cfg(feature = "rt-tokio-current-thread")]
#[cfg_attr(docsrs, doc(cfg(feature = "rt-tokio-current-thread")))]
#[derive(Debug, Clone)]
pub struct TokioCurrentThread;

#[cfg(feature = "rt-tokio-current-thread")]
#[cfg_attr(docsrs, doc(cfg(feature = "rt-tokio-current-thread")))]
impl Runtime for TokioCurrentThread {
    type Delay = ::std::pin::Pin<Box<tokio::time::Sleep>>;

    fn spawn(&self, future: BoxFuture<'static, ()>) {
        // A caller blocking the only thread of a current thread scheduler
        // would starve the worker, so it gets a thread of its own.
        let spawned = std::thread::Builder::new()
            .name("OpenTelemetry.Client.BatchWorker".to_string())
            .spawn(move || {
                match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt.block_on(future),
                    Err(err) => {
                        opentelemetry::otel_error!(
                            name: "TokioCurrentThread.RuntimeCreationFailed",
                            error = format!("{err}")
                        );
                    }
                }
            });
        if let Err(err) = spawned {
            opentelemetry::otel_error!(
                name: "TokioCurrentThread.ThreadSpawnFailed",
                error = format!("{err}")
            );
        }
    }

    fn delay(&self, duration: Duration) -> Self::Delay {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// `RuntimeChannel` is an extension to [`Runtime`]. It provides the channel
/// the batch processors use to talk to their worker.
pub trait RuntimeChannel: Runtime {
    /// A future stream to receive batch messages from channels.
    type Receiver<T: Debug + Send + 'static>: Stream<Item = T> + Send + Unpin;
    /// A batch messages sender that can be sent across threads safely.
    type Sender<T: Debug + Send + 'static>: TrySend<Message = T> + Debug;

    /// Return the sender and receiver used to send batch messages.
    fn batch_message_channel<T: Debug + Send + 'static>(
        &self,
        capacity: usize,
    ) -> (Self::Sender<T>, Self::Receiver<T>);
}

/// Error returned by a [`TrySend`] implementation.
#[derive(Debug, Error)]
pub enum TrySendError {
    /// Send failed due to the channel being full.
    #[error("cannot send message to batch processor as the channel is full")]
    ChannelFull,
    /// Send failed due to the channel being closed.
    #[error("cannot send message to batch processor as the channel is closed")]
    ChannelClosed,
    /// Any other send error that isnt covered above.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// TrySend is an abstraction of `Sender` that is capable of sending messages through a reference.
pub trait TrySend: Sync + Send {
    /// The message that will be sent.
    type Message;

    /// Try to send a message to the worker without waiting.
    ///
    /// A failure can be due to either a closed receiver, or a depleted buffer.
    fn try_send(&self, item: Self::Message) -> Result<(), TrySendError>;
}

#[cfg(any(feature = "rt-tokio", feature = "rt-tokio-current-thread"))]
impl<T: Send> TrySend for tokio::sync::mpsc::Sender<T> {
    type Message = T;

    fn try_send(&self, item: Self::Message) -> Result<(), TrySendError> {
        self.try_send(item).map_err(|err| match err {
            tokio::sync::mpsc::error::TrySendError::Full(_) => TrySendError::ChannelFull,
            tokio::sync::mpsc::error::TrySendError::Closed(_) => TrySendError::ChannelClosed,
        })
    }
}

#[cfg(feature = "rt-tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "rt-tokio")))]
impl RuntimeChannel for Tokio {
    type Receiver<T: Debug + Send + 'static> = tokio_stream::wrappers::ReceiverStream<T>;
    type Sender<T: Debug + Send + 'static> = tokio::sync::mpsc::Sender<T>;

    fn batch_message_channel<T: Debug + Send + 'static>(
        &self,
        capacity: usize,
    ) -> (Self::Sender<T>, Self::Receiver<T>) {
        let (sender, receiver) = tokio::sync::mpsc::channel(capacity);
        (
            sender,
            tokio_stream::wrappers::ReceiverStream::new(receiver),
        )
    }
}

#[cfg(feature = "rt-tokio-current-thread")]
#[cfg_attr(docsrs, doc(cfg(feature = "rt-tokio-current-thread")))]
impl RuntimeChannel for TokioCurrentThread {
    type Receiver<T: Debug + Send + 'static> = tokio_stream::wrappers::ReceiverStream<T>;
    type Sender<T: Debug + Send + 'static> = tokio::sync::mpsc::Sender<T>;

    fn batch_message_channel<T: Debug + Send + 'static>(
        &self,
        capacity: usize,
    ) -> (Self::Sender<T>, Self::Receiver<T>) {
        let (sender, receiver) = tokio::sync::mpsc::channel(capacity);
        (
            sender,
            tokio_stream::wrappers::ReceiverStream::new(receiver),
        )
    }
}
