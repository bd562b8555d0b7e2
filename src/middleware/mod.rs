//! Hooks that run around every dispatched handler call.

mod core;
mod metrics;
mod tracing;

pub use core::Middleware;
pub use metrics::MetricsMiddleware;
pub use tracing::TracingMiddleware;
pub(crate) use tracing::duration_ms;
