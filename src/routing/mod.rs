//! Routing module
//!
//! Maps a request method and path onto one endpoint:
//! - Template matching with `{name}` and `{name:path}` captures
//! - An ordered route table with 405 and trailing-slash handling

mod matcher;
mod table;

pub use table::{lookup, Endpoint, RouteMatch};
