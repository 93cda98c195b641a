//! Request handler module
//!
//! Request routing dispatch and the endpoint implementations, grouped by
//! what part of the request or response they exercise.

mod bodies;
mod deps;
mod forms;
mod params;
mod records;
mod responses;
pub mod router;
pub mod unicorns;

// Re-export main entry points
pub use router::handle_request;
