//! Counter export: the `MetricReporter`, its pipeline seam, and the OTLP
//! pipeline used in production.
//!
//! No global meter provider is installed. The reporter is built once at
//! startup and shared by `Arc` with the ticker loop and the supervisor.

pub mod otlp;
pub mod reporter;
pub mod sink;

pub use otlp::{normalize_endpoint, CollectorEndpoint, OtlpPipeline};
pub use reporter::{CounterPipeline, MetricReporter, ReporterOptions, SERVICE_VERSION};
pub use sink::{ErrorSink, LogErrorSink};
