//! Thing Types - Core data definitions for the Web Thing runtime
//!
//! This crate contains the pure data structures shared by the runtime and the
//! server: native value types, constraint sets, declarative thing definitions
//! and the WebSocket message envelope.

mod constraints;
mod descriptor;
mod message;
mod types;
mod value;

pub use constraints::*;
pub use descriptor::*;
pub use message::*;
pub use types::*;
pub use value::*;
