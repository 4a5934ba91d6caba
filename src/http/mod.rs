//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID assigned, span opened)
//!     → cors.rs (origin policy from CORS_ORIGINS)
//!     → handler (health.rs)
//!     → response carries x-request-id back to the client
//! ```

pub mod cors;
pub mod health;
pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
