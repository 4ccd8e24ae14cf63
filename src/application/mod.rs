//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain types and manages runtime behavior:
//! - Counter store (per-second buckets)
//! - Query engine (windowed sums)
//! - Cleanup scheduler (background eviction)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod cleanup;
pub mod metrics;
pub mod ports;
pub mod query;
pub mod store;
