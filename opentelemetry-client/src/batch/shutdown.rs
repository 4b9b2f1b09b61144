use crate::error::{OTelSdkError, OTelSdkResult};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;
use std::sync::Mutex;

enum ShutdownState {
    NotStarted,
    InProgress(Shared<BoxFuture<'static, OTelSdkResult>>),
    Completed(OTelSdkResult),
}

/// Runs a shutdown sequence at most once.
///
/// The first call to [`ShutdownGuard::shutdown`] starts the sequence; every
/// other call, whether it overlaps the first or comes after it, waits for that
/// same sequence and receives a clone of its result.
pub struct ShutdownGuard {
    state: Mutex<ShutdownState>,
}

impl Default for ShutdownGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShutdownGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state.lock().as_deref() {
            Ok(ShutdownState::NotStarted) => "NotStarted",
            Ok(ShutdownState::InProgress(_)) => "InProgress",
            Ok(ShutdownState::Completed(_)) => "Completed",
            Err(_) => "Poisoned",
        };
        f.debug_struct("ShutdownGuard").field("state", &state).finish()
    }
}

impl ShutdownGuard {
    /// Create a guard whose sequence has not run yet.
    pub fn new() -> Self {
        ShutdownGuard {
            state: Mutex::new(ShutdownState::NotStarted),
        }
    }

    /// Whether shutdown has been requested, including while it is still running.
    pub fn is_shutdown(&self) -> bool {
        !matches!(
            self.state.lock().as_deref(),
            Ok(ShutdownState::NotStarted)
        )
    }

    /// Run `sequence` if no shutdown has started yet, then wait for the
    /// outcome of the one and only shutdown sequence.
    ///
    /// `sequence` is invoked synchronously while the guard is locked, and
    /// only by the first caller. The future it returns is driven by whichever
    /// callers are awaiting it.
    pub async fn shutdown<F, Fut>(&self, sequence: F) -> OTelSdkResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = OTelSdkResult> + Send + 'static,
    {
        let in_flight = {
            let mut state = self.state.lock()?;
            match &*state {
                ShutdownState::Completed(result) => return result.clone(),
                ShutdownState::InProgress(in_flight) => in_flight.clone(),
                ShutdownState::NotStarted => {
                    let in_flight = sequence().boxed().shared();
                    *state = ShutdownState::InProgress(in_flight.clone());
                    in_flight
                }
            }
        };

        let result = in_flight.await;

        let mut state = self.state.lock()?;
        if matches!(*state, ShutdownState::InProgress(_)) {
            *state = ShutdownState::Completed(result.clone());
        }
        result
    }

    /// The settled outcome, if shutdown has completed.
    pub fn result(&self) -> Option<OTelSdkResult> {
        match self.state.lock().as_deref() {
            Ok(ShutdownState::Completed(result)) => Some(result.clone()),
            Ok(_) => None,
            Err(_) => Some(Err(OTelSdkError::InternalFailure(
                "shutdown state poisoned".into(),
            ))),
        }
    }
}
