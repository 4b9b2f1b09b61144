//! Internal utilities
use opentelemetry::otel_debug;
use std::env;

/// Reads a non-negative count from the environment variable `name`.
///
/// Unset variables and values that do not parse yield `None`.
pub(crate) fn count_limit_from_env(name: &'static str) -> Option<usize> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<usize>() {
        Ok(limit) => Some(limit),
        Err(_) => {
            otel_debug!(
                name: "Limits.InvalidEnvValue",
                variable = name,
                value = raw
            );
            None
        }
    }
}
