//! Thing Runtime - Execution engine for hosted Web Things
//!
//! This crate turns declarative [`ThingDef`](thing_types::ThingDef)s into live
//! things:
//!
//! - [`MetadataCompiler`]: compiles each thing type once into name-indexed
//!   value bindings (coercion plus constraint validation)
//! - [`PropertyRegistry`]: per-instance property slots
//! - [`ActionRegistry`]: action lifecycle and concurrent execution
//! - [`EventLog`]: bounded per-event history
//! - [`NotificationHub`]: fan-out to subscribers
//! - [`ThingContext`]: one hosted thing, wiring the above together
//! - [`ThingRegistry`]: registered types and hosted instances

mod action;
mod binding;
mod compiler;
mod context;
mod error;
mod event_log;
mod hub;
mod property;
mod registry;
mod resolver;
mod thing_type;

pub use action::*;
pub use binding::*;
pub use compiler::*;
pub use context::*;
pub use error::*;
pub use event_log::*;
pub use hub::*;
pub use property::*;
pub use registry::*;
pub use resolver::*;
pub use thing_type::*;
