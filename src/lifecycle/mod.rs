//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → HTTP server stops accepting
//!             → in-flight confirmation waits are cancelled
//!             → drain, bounded by the grace period
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
