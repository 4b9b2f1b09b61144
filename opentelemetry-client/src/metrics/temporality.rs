use opentelemetry::otel_warn;
use std::env;
use std::str::FromStr;
use thiserror::Error;

const OTEL_EXPORTER_OTLP_METRICS_TEMPORALITY_PREFERENCE: &str =
    "OTEL_EXPORTER_OTLP_METRICS_TEMPORALITY_PREFERENCE";

/// Defines the window that an aggregation was calculated over.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Temporality {
    /// A measurement interval that continues to expand forward in time from a
    /// starting point.
    ///
    /// New measurements are added to all previous measurements since a start time.
    #[default]
    Cumulative,

    /// A measurement interval that resets each cycle.
    ///
    /// Measurements from one cycle are recorded independently, measurements from
    /// other cycles do not affect them.
    Delta,
}

/// The identifier of a group of instruments that all perform the same function.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum InstrumentKind {
    /// Identifies a group of instruments that record increasing values synchronously
    /// with the code path they are measuring.
    Counter,
    /// A group of instruments that record increasing and decreasing values
    /// synchronously with the code path they are measuring.
    UpDownCounter,
    /// A group of instruments that record a distribution of values synchronously with
    /// the code path they are measuring.
    Histogram,
    /// A group of instruments that record increasing values in an asynchronous
    /// callback.
    ObservableCounter,
    /// A group of instruments that record increasing and decreasing values in an
    /// asynchronous callback.
    ObservableUpDownCounter,
    /// a group of instruments that record current value synchronously with
    /// the code path they are measuring.
    Gauge,
    /// a group of instruments that record current values in an asynchronous callback.
    ObservableGauge,
}

/// Which temporality an exporter asks for, as configured by
/// `OTEL_EXPORTER_OTLP_METRICS_TEMPORALITY_PREFERENCE`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum TemporalityPreference {
    /// Every instrument reports cumulative totals.
    #[default]
    Cumulative,

    /// Monotonic instruments, histograms and gauges report deltas. Up-down
    /// counters stay cumulative.
    Delta,

    /// Configures Synchronous Counter and Histogram instruments to use
    /// Delta aggregation temporality, which allows them to shed memory
    /// following a cardinality explosion, thus use less memory.
    LowMemory,
}

/// A temporality preference name that is not one of `cumulative`, `delta` or
/// `lowmemory`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown temporality preference {0:?}")]
pub struct ParseTemporalityError(String);

impl FromStr for TemporalityPreference {
    type Err = ParseTemporalityError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cumulative" => Ok(TemporalityPreference::Cumulative),
            "delta" => Ok(TemporalityPreference::Delta),
            "lowmemory" => Ok(TemporalityPreference::LowMemory),
            _ => Err(ParseTemporalityError(s.to_owned())),
        }
    }
}

impl TemporalityPreference {
    /// The preference set in `OTEL_EXPORTER_OTLP_METRICS_TEMPORALITY_PREFERENCE`.
    ///
    /// Unset means [`TemporalityPreference::Cumulative`]. Unknown values are
    /// logged and fall back to it as well.
    pub fn from_env() -> Self {
        let Ok(raw) = env::var(OTEL_EXPORTER_OTLP_METRICS_TEMPORALITY_PREFERENCE) else {
            return TemporalityPreference::default();
        };
        raw.parse().unwrap_or_else(|err: ParseTemporalityError| {
            otel_warn!(
                name: "TemporalityPreference.InvalidEnvValue",
                message = "Unknown metrics temporality preference, falling back to cumulative.",
                error = format!("{err}")
            );
            TemporalityPreference::default()
        })
    }

    /// Select the [Temporality] for instruments of `kind`.
    pub fn temporality(&self, kind: InstrumentKind) -> Temporality {
        match self {
            TemporalityPreference::Cumulative => Temporality::Cumulative,
            TemporalityPreference::Delta => match kind {
                InstrumentKind::Counter
                | InstrumentKind::Histogram
                | InstrumentKind::ObservableCounter
                | InstrumentKind::Gauge
                | InstrumentKind::ObservableGauge => Temporality::Delta,
                InstrumentKind::UpDownCounter | InstrumentKind::ObservableUpDownCounter => {
                    Temporality::Cumulative
                }
            },
            TemporalityPreference::LowMemory => match kind {
                InstrumentKind::Counter | InstrumentKind::Histogram => Temporality::Delta,
                InstrumentKind::ObservableCounter
                | InstrumentKind::Gauge
                | InstrumentKind::ObservableGauge
                | InstrumentKind::UpDownCounter
                | InstrumentKind::ObservableUpDownCounter => Temporality::Cumulative,
            },
        }
    }
}
