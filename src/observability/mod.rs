//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! CLI and HTTP layers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms; serve mode only)
//! ```
//!
//! The broadcast core emits neither; callers log around it.

pub mod logging;
pub mod metrics;
