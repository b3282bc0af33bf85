//! HTTP API surface.
//!
//! Thin request/response mapping over the core services. Authentication,
//! field parsing and status-code translation happen here; quota and
//! ownership guarantees live in the registry and ledger.

pub mod agents;
pub mod auth;
pub mod routes;
pub mod subscriptions;
pub mod tools;
pub mod types;

pub use routes::{serve, AppState};
