//! # Metrics
//!
//! Aggregation temporality selection for metric exporters. The client does
//! not aggregate measurements itself; exporters use
//! [`TemporalityPreference::temporality`] to decide, per instrument kind,
//! whether to report cumulative totals or deltas.
mod temporality;

pub use temporality::{
    InstrumentKind, ParseTemporalityError, Temporality, TemporalityPreference,
};
