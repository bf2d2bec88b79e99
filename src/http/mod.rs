//! HTTP API subsystem (serve mode).
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → handlers.rs (decode, call the shared broadcaster)
//!     → response.rs (envelope, error → status code)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::{ApiError, Envelope};
pub use server::{AppState, HttpServer};
