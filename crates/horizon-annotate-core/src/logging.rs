//! Logging facilities for Horizon Annotate.
//!
//! Horizon Annotate uses the `tracing` crate for instrumentation. To see
//! logs, install a tracing subscriber in the embedding application:
//!
//! ```ignore
//! tracing_subscriber::fmt::init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "horizon_annotate_core";
    /// Event map target.
    pub const EVENTS: &str = "horizon_annotate_core::events";
    /// Session store target.
    pub const STORE: &str = "horizon_annotate_core::store";
    /// Ready latch target.
    pub const READY: &str = "horizon_annotate_core::ready";
}
