use std::cmp::min;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default delay interval between two consecutive exports.
pub(crate) const SCHEDULE_DELAY_DEFAULT: Duration = Duration::from_millis(5_000);
/// Default maximum queue size.
pub(crate) const MAX_QUEUE_SIZE_DEFAULT: usize = 2_048;
/// Default maximum batch size.
pub(crate) const MAX_EXPORT_BATCH_SIZE_DEFAULT: usize = 512;
/// Default maximum allowed time to export data.
pub(crate) const EXPORT_TIMEOUT_DEFAULT: Duration = Duration::from_millis(30_000);

/// Names of the environment variables a signal reads its batch settings from.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BatchEnvVars {
    schedule_delay: &'static str,
    max_queue_size: &'static str,
    max_export_batch_size: &'static str,
    export_timeout: &'static str,
}

/// Batch log record processor settings.
pub(crate) const LOG_ENV_VARS: BatchEnvVars = BatchEnvVars {
    schedule_delay: "OTEL_BLRP_SCHEDULE_DELAY",
    max_queue_size: "OTEL_BLRP_MAX_QUEUE_SIZE",
    max_export_batch_size: "OTEL_BLRP_MAX_EXPORT_BATCH_SIZE",
    export_timeout: "OTEL_BLRP_EXPORT_TIMEOUT",
};

/// Batch span processor settings.
pub(crate) const SPAN_ENV_VARS: BatchEnvVars = BatchEnvVars {
    schedule_delay: "OTEL_BSP_SCHEDULE_DELAY",
    max_queue_size: "OTEL_BSP_MAX_QUEUE_SIZE",
    max_export_batch_size: "OTEL_BSP_MAX_EXPORT_BATCH_SIZE",
    export_timeout: "OTEL_BSP_EXPORT_TIMEOUT",
};

/// Batch processor configuration.
/// Use [`BatchConfigBuilder`] to configure your own instance of [`BatchConfig`].
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// The maximum queue size to buffer records for delayed processing. If the
    /// queue gets full it drops the records.
    pub(crate) max_queue_size: usize,

    /// The delay interval between two consecutive processing of batches.
    pub(crate) scheduled_delay: Duration,

    /// The maximum number of records to process in a single batch. If there are
    /// more than one batch worth of records then it processes multiple batches
    /// one after the other without any delay.
    pub(crate) max_export_batch_size: usize,

    /// The maximum duration to export a batch of data.
    pub(crate) max_export_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfigBuilder::default().build()
    }
}

impl BatchConfig {
    /// Maximum number of records held in the buffer.
    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }

    /// Delay between a record arriving in an idle buffer and its export.
    pub fn scheduled_delay(&self) -> Duration {
        self.scheduled_delay
    }

    /// Maximum number of records in one call to the exporter.
    pub fn max_export_batch_size(&self) -> usize {
        self.max_export_batch_size
    }

    /// Upper bound on a single export call.
    pub fn max_export_timeout(&self) -> Duration {
        self.max_export_timeout
    }
}

/// A builder for creating [`BatchConfig`] instances.
#[derive(Debug)]
pub struct BatchConfigBuilder {
    max_queue_size: usize,
    scheduled_delay: Duration,
    max_export_batch_size: usize,
    max_export_timeout: Duration,
}

impl Default for BatchConfigBuilder {
    /// Create a new [`BatchConfigBuilder`] initialized with the default batch
    /// config values. No environment variable is consulted.
    fn default() -> Self {
        BatchConfigBuilder {
            max_queue_size: MAX_QUEUE_SIZE_DEFAULT,
            scheduled_delay: SCHEDULE_DELAY_DEFAULT,
            max_export_batch_size: MAX_EXPORT_BATCH_SIZE_DEFAULT,
            max_export_timeout: EXPORT_TIMEOUT_DEFAULT,
        }
    }
}

impl BatchConfigBuilder {
    /// Defaults overridden by the batch log record processor variables:
    /// * `OTEL_BLRP_MAX_QUEUE_SIZE`
    /// * `OTEL_BLRP_SCHEDULE_DELAY`
    /// * `OTEL_BLRP_MAX_EXPORT_BATCH_SIZE`
    /// * `OTEL_BLRP_EXPORT_TIMEOUT`
    ///
    /// Values that cannot be parsed are ignored.
    pub fn for_logs() -> Self {
        Self::default().init_from_env_vars(&LOG_ENV_VARS)
    }

    /// Defaults overridden by the batch span processor variables:
    /// * `OTEL_BSP_MAX_QUEUE_SIZE`
    /// * `OTEL_BSP_SCHEDULE_DELAY`
    /// * `OTEL_BSP_MAX_EXPORT_BATCH_SIZE`
    /// * `OTEL_BSP_EXPORT_TIMEOUT`
    ///
    /// Values that cannot be parsed are ignored.
    pub fn for_spans() -> Self {
        Self::default().init_from_env_vars(&SPAN_ENV_VARS)
    }

    /// Set max_queue_size for [`BatchConfigBuilder`].
    /// It's the maximum queue size to buffer records for delayed processing.
    /// If the queue gets full it drops the records.
    /// The default value is 2048.
    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    /// Set max_export_batch_size for [`BatchConfigBuilder`].
    /// It's the maximum number of records to process in a single batch. If there are
    /// more than one batch worth of records then it processes multiple batches
    /// one after the other without any delay. The default value is 512.
    pub fn with_max_export_batch_size(mut self, max_export_batch_size: usize) -> Self {
        self.max_export_batch_size = max_export_batch_size;
        self
    }

    /// Set scheduled_delay for [`BatchConfigBuilder`].
    /// It's the delay between the first record entering an idle buffer and the
    /// export of a batch. The default value is 5000 milliseconds.
    pub fn with_scheduled_delay(mut self, scheduled_delay: Duration) -> Self {
        self.scheduled_delay = scheduled_delay;
        self
    }

    /// Set max_export_timeout for [`BatchConfigBuilder`].
    /// It's the maximum duration to export a batch of data.
    /// The default value is 30000 milliseconds.
    pub fn with_max_export_timeout(mut self, max_export_timeout: Duration) -> Self {
        self.max_export_timeout = max_export_timeout;
        self
    }

    /// Builds a `BatchConfig` enforcing the following invariants:
    /// * `max_export_batch_size` must be less than or equal to `max_queue_size`.
    /// * `max_export_batch_size` is at least one.
    pub fn build(self) -> BatchConfig {
        // max export batch size must be less or equal to max queue size.
        // we set max export batch size to max queue size if it's larger than max queue size.
        let max_export_batch_size = min(self.max_export_batch_size, self.max_queue_size).max(1);

        BatchConfig {
            max_queue_size: self.max_queue_size,
            scheduled_delay: self.scheduled_delay,
            max_export_timeout: self.max_export_timeout,
            max_export_batch_size,
        }
    }

    fn init_from_env_vars(mut self, vars: &BatchEnvVars) -> Self {
        if let Some(max_queue_size) = env::var(vars.max_queue_size)
            .ok()
            .and_then(|queue_size| usize::from_str(queue_size.trim()).ok())
        {
            self.max_queue_size = max_queue_size;
        }

        if let Some(scheduled_delay) = env::var(vars.schedule_delay)
            .ok()
            .and_then(|delay| u64::from_str(delay.trim()).ok())
        {
            self.scheduled_delay = Duration::from_millis(scheduled_delay);
        }

        if let Some(max_export_batch_size) = env::var(vars.max_export_batch_size)
            .ok()
            .and_then(|batch_size| usize::from_str(batch_size.trim()).ok())
        {
            self.max_export_batch_size = max_export_batch_size;
        }

        if let Some(max_export_timeout) = env::var(vars.export_timeout)
            .ok()
            .and_then(|timeout| u64::from_str(timeout.trim()).ok())
        {
            self.max_export_timeout = Duration::from_millis(max_export_timeout);
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_const_values() {
        let config = BatchConfig::default();
        assert_eq!(config.max_queue_size(), 2_048);
        assert_eq!(config.scheduled_delay(), Duration::from_millis(5_000));
        assert_eq!(config.max_export_batch_size(), 512);
        assert_eq!(config.max_export_timeout(), Duration::from_millis(30_000));
    }

    #[test]
    fn test_log_config_from_env_vars() {
        let env_vars = vec![
            ("OTEL_BLRP_SCHEDULE_DELAY", Some("2000")),
            ("OTEL_BLRP_EXPORT_TIMEOUT", Some("60000")),
            ("OTEL_BLRP_MAX_QUEUE_SIZE", Some("4096")),
            ("OTEL_BLRP_MAX_EXPORT_BATCH_SIZE", Some("1024")),
        ];

        let config = temp_env::with_vars(env_vars, || BatchConfigBuilder::for_logs().build());

        assert_eq!(config.scheduled_delay, Duration::from_millis(2000));
        assert_eq!(config.max_export_timeout, Duration::from_millis(60000));
        assert_eq!(config.max_queue_size, 4096);
        assert_eq!(config.max_export_batch_size, 1024);
    }

    #[test]
    fn test_span_config_ignores_log_env_vars() {
        let env_vars = vec![
            ("OTEL_BLRP_SCHEDULE_DELAY", Some("2000")),
            ("OTEL_BSP_SCHEDULE_DELAY", Some("750")),
        ];

        let config = temp_env::with_vars(env_vars, || BatchConfigBuilder::for_spans().build());

        assert_eq!(config.scheduled_delay, Duration::from_millis(750));
        assert_eq!(config.max_queue_size, MAX_QUEUE_SIZE_DEFAULT);
    }

    #[test]
    fn test_invalid_env_vars_are_ignored() {
        let env_vars = vec![
            ("OTEL_BLRP_SCHEDULE_DELAY", Some("I am not number")),
            ("OTEL_BLRP_MAX_QUEUE_SIZE", Some("-1")),
        ];

        let config = temp_env::with_vars(env_vars, || BatchConfigBuilder::for_logs().build());

        assert_eq!(config.scheduled_delay, SCHEDULE_DELAY_DEFAULT);
        assert_eq!(config.max_queue_size, MAX_QUEUE_SIZE_DEFAULT);
    }

    #[test]
    fn test_batch_size_is_clamped_to_queue_size() {
        let env_vars = vec![
            ("OTEL_BLRP_MAX_QUEUE_SIZE", Some("256")),
            ("OTEL_BLRP_MAX_EXPORT_BATCH_SIZE", Some("1024")),
        ];

        let config = temp_env::with_vars(env_vars, || BatchConfigBuilder::for_logs().build());
        assert_eq!(config.max_queue_size, 256);
        assert_eq!(config.max_export_batch_size, 256);

        let config = BatchConfigBuilder::default()
            .with_max_queue_size(10)
            .with_max_export_batch_size(0)
            .build();
        assert_eq!(config.max_export_batch_size, 1);
    }

    #[test]
    fn test_builder_overrides_env() {
        let config = temp_env::with_var("OTEL_BLRP_MAX_QUEUE_SIZE", Some("100"), || {
            BatchConfigBuilder::for_logs()
                .with_max_queue_size(20)
                .with_max_export_batch_size(5)
                .with_scheduled_delay(Duration::from_millis(10))
                .with_max_export_timeout(Duration::from_millis(20))
                .build()
        });

        assert_eq!(config.max_queue_size, 20);
        assert_eq!(config.max_export_batch_size, 5);
        assert_eq!(config.scheduled_delay, Duration::from_millis(10));
        assert_eq!(config.max_export_timeout, Duration::from_millis(20));
    }
}
