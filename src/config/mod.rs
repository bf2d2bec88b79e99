//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → loader.rs (optional TOML file via --config)
//!     → loader.rs (JUNO_RPC_* environment for blank RPC fields)
//!     → command-line flags (applied by the cli module)
//!     → validation.rs (semantic checks)
//!     → BroadcastConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Every field has a default, so an empty file (or none) is valid TOML
//! - Environment only fills RPC fields the file left blank
//! - Validation runs after flags are applied, not at load time

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::BroadcastConfig;
pub use schema::{
    LogFormat, ObservabilityConfig, PollConfig, RpcConfig, ServerConfig, TimeoutConfig,
};
pub use validation::ValidationError;
