//! Errors returned by lifecycle operations and exporters.
use std::sync::PoisonError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while flushing, exporting or shutting down.
///
/// The type is `Clone` so that the outcome of a single shutdown can be handed
/// to every caller that awaited it.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum OTelSdkError {
    /// Shutdown has already been invoked.
    ///
    /// Returned by operations that are not allowed once the component is shut
    /// down, such as `force_flush`.
    #[error("Shutdown already invoked")]
    AlreadyShutdown,

    /// The operation did not complete within the given duration.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The operation failed for a reason not covered by other variants.
    #[error("Operation failed: {0}")]
    InternalFailure(String),

    /// One or more batch exports failed during an explicit flush or shutdown.
    #[error("{} export(s) failed, last error: {}", .0.len(), last_error(.0))]
    ExportFailures(Vec<OTelSdkError>),
}

fn last_error(errors: &[OTelSdkError]) -> String {
    errors
        .last()
        .map(|err| err.to_string())
        .unwrap_or_default()
}

impl OTelSdkError {
    /// Folds a list of failures into a single result.
    ///
    /// A single failure is returned as is, several are wrapped in
    /// [`OTelSdkError::ExportFailures`].
    pub(crate) fn aggregate(mut errors: Vec<OTelSdkError>) -> OTelSdkResult {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(OTelSdkError::ExportFailures(errors)),
        }
    }

    /// Merges the outcomes of several steps, flattening nested aggregates.
    pub(crate) fn combine(results: impl IntoIterator<Item = OTelSdkResult>) -> OTelSdkResult {
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(()) => {}
                Err(OTelSdkError::ExportFailures(inner)) => errors.extend(inner),
                Err(err) => errors.push(err),
            }
        }
        Self::aggregate(errors)
    }
}

impl<T> From<PoisonError<T>> for OTelSdkError {
    fn from(err: PoisonError<T>) -> Self {
        OTelSdkError::InternalFailure(format!("mutex poisoned: {err}"))
    }
}

/// A specialized `Result` type for lifecycle operations.
pub type OTelSdkResult = Result<(), OTelSdkError>;
