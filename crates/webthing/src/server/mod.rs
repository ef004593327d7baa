//! Web Thing Server
//!
//! REST API plus a per-thing WebSocket channel for real-time updates.

mod error;
mod handler;
mod http;
mod protocol;
mod router;
mod state;

pub use error::*;
pub use handler::*;
pub use http::*;
pub use protocol::*;
pub use router::*;
pub use state::*;
