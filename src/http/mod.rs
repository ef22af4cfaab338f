//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, catch-all handler)
//!     → request.rs (capture body once into a RequestSnapshot)
//!     → engine.rs (route lookup, replay scheduling)
//!     → forwarder.rs (outbound request on the shared client.rs client)
//!     → downstream response streamed back to the client
//! ```

pub mod client;
pub mod engine;
pub mod forwarder;
pub mod request;
pub mod server;

pub use engine::ProxyEngine;
pub use request::RequestSnapshot;
pub use server::HttpServer;
