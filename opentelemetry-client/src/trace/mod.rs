//! # Trace
//!
//! The tracing pipeline. An [`SdkTracerProvider`] hands out [`SdkTracer`]s,
//! which start [`Span`]s. Ended spans become [`SpanData`] and are passed to
//! every [`SpanProcessor`] of the provider; the [`BatchSpanProcessor`]
//! exports them in batches through a [`SpanExporter`].
//!
//! ```no_run
//! use opentelemetry_client::trace::{SdkTracerProvider, SpanData, SpanExporter};
//! use opentelemetry_client::OTelSdkResult;
//!
//! #[derive(Debug)]
//! struct StdoutExporter;
//!
//! impl SpanExporter for StdoutExporter {
//!     async fn export(&self, batch: Vec<SpanData>) -> OTelSdkResult {
//!         for span in batch {
//!             println!("{} took {:?}", span.name, span.end_time.duration_since(span.start_time));
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let provider = SdkTracerProvider::builder()
//!     .with_batch_exporter(StdoutExporter)
//!     .build();
//! let tracer = provider.tracer("checkout");
//!
//! let outcome = tracer
//!     .in_span_async("charge_card", |_cx| async { Ok::<_, String>(42) })
//!     .await;
//! assert_eq!(outcome, Ok(42));
//!
//! provider.shutdown().await.unwrap();
//! # }
//! ```
mod config;
mod export;
mod id_generator;
#[cfg(any(feature = "testing", test))]
mod in_memory_exporter;
mod provider;
mod span;
mod span_processor;
mod tracer;

pub use config::SpanLimits;
pub use export::{SpanData, SpanExporter};
pub use id_generator::{IdGenerator, RandomIdGenerator};
#[cfg(any(feature = "testing", test))]
#[cfg_attr(docsrs, doc(cfg(any(feature = "testing", test))))]
pub use in_memory_exporter::{InMemorySpanExporter, InMemorySpanExporterBuilder};
pub use provider::{SdkTracerProvider, TracerProviderBuilder};
pub use span::Span;
pub use span_processor::{BatchSpanProcessor, BatchSpanProcessorBuilder, SpanProcessor};
pub use tracer::{SdkTracer, SpanBuilder};
