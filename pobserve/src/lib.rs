//! Observability hooks for promptshell refresh cycles and tool calls.
//!
//! ```rust
//! use pobserve::{
//!     CombinedHooks, MetricsObservabilityHooks, SafeToolHooks, TracingObservabilityHooks,
//! };
//!
//! let _tool_hooks = SafeToolHooks::new(CombinedHooks::new(
//!     TracingObservabilityHooks,
//!     MetricsObservabilityHooks,
//! ));
//! ```

mod combined;
mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use combined::CombinedHooks;
pub use metrics_hooks::MetricsObservabilityHooks;
pub use safe_hooks::{SafeRefreshHooks, SafeToolHooks};
pub use tracing_hooks::TracingObservabilityHooks;

/// Tracing plus metrics, isolated from panics.
pub type StandardToolHooks =
    SafeToolHooks<CombinedHooks<TracingObservabilityHooks, MetricsObservabilityHooks>>;

pub type StandardRefreshHooks =
    SafeRefreshHooks<CombinedHooks<TracingObservabilityHooks, MetricsObservabilityHooks>>;

pub fn standard_tool_hooks() -> StandardToolHooks {
    SafeToolHooks::new(CombinedHooks::new(
        TracingObservabilityHooks,
        MetricsObservabilityHooks,
    ))
}

pub fn standard_refresh_hooks() -> StandardRefreshHooks {
    SafeRefreshHooks::new(CombinedHooks::new(
        TracingObservabilityHooks,
        MetricsObservabilityHooks,
    ))
}

pub mod prelude {
    pub use crate::{
        CombinedHooks, MetricsObservabilityHooks, SafeRefreshHooks, SafeToolHooks,
        TracingObservabilityHooks, standard_refresh_hooks, standard_tool_hooks,
    };
}

#[cfg(test)]
mod tests;
