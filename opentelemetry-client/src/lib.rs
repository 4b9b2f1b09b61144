//! # OpenTelemetry Client
//!
//! A telemetry client for applications: spans and log records are produced
//! through explicitly constructed providers, buffered, and handed to
//! pluggable exporters in batches from a background task.
//!
//! The pieces, bottom-up:
//!
//! * [`batch`]: the bounded record buffer, the flush timer, the export
//!   pipeline with its timeout, and the run-once shutdown guard, shared by
//!   both signals.
//! * [`resource`]: the attributes describing the process that emits
//!   telemetry, including attributes that settle asynchronously and those
//!   read from `OTEL_RESOURCE_ATTRIBUTES`.
//! * [`logs`] and [`trace`]: records, exporters, batch processors and
//!   providers for each signal, plus the span-wrapping helpers
//!   [`SdkTracer::in_span`](trace::SdkTracer::in_span),
//!   [`in_span_async`](trace::SdkTracer::in_span_async) and
//!   [`wrap`](trace::SdkTracer::wrap).
//! * [`metrics`]: temporality selection for metric exporters.
//! * [`TelemetryClient`]: one handle owning both providers over a shared
//!   resource, with a single flush and shutdown.
//!
//! Nothing here is global. Build a client (or the providers) at startup, pass
//! it to the code that needs it, and shut it down before exiting:
//!
//! ```no_run
//! use opentelemetry_client::{Resource, TelemetryClient};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let client = TelemetryClient::builder()
//!     .with_resource(Resource::builder().with_service_name("checkout").build())
//!     .build();
//!
//! let result: Result<u32, String> = client
//!     .tracer("checkout")
//!     .in_span("compute_total", |_span| Ok(42));
//!
//! client.shutdown().await.unwrap();
//! # let _ = result;
//! # }
//! ```
//!
//! ## Crate Feature Flags
//!
//! * `trace`: spans, tracers and span exporters (enabled by default).
//! * `logs`: log records, loggers and log exporters (enabled by default).
//! * `metrics`: temporality selection (enabled by default).
//! * `rt-tokio`: batch processors on the Tokio runtime (enabled by default).
//! * `rt-tokio-current-thread`: batch processors on a dedicated current-thread
//!   Tokio runtime.
//! * `internal-logs`: diagnostics through `tracing` (enabled by default).
//! * `testing`: in-memory exporters.
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![allow(clippy::needless_doctest_main)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

pub mod batch;
#[cfg(all(feature = "trace", feature = "logs"))]
#[cfg_attr(docsrs, doc(cfg(all(feature = "trace", feature = "logs"))))]
mod client;
pub mod error;
#[cfg(feature = "logs")]
#[cfg_attr(docsrs, doc(cfg(feature = "logs")))]
pub mod logs;
#[cfg(feature = "metrics")]
#[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
pub mod metrics;
pub mod resource;
pub mod runtime;
#[cfg(feature = "trace")]
#[cfg_attr(docsrs, doc(cfg(feature = "trace")))]
pub mod trace;
mod util;

#[cfg(all(feature = "trace", feature = "logs"))]
pub use client::{TelemetryClient, TelemetryClientBuilder};
pub use error::{OTelSdkError, OTelSdkResult};
pub use resource::Resource;
