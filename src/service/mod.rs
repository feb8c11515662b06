//! Service layer
//!
//! Resolution logic on top of the federation clients.

mod classify;
mod cross_instance;
mod resolver;

pub use classify::{Route, classify};
pub use cross_instance::{CrossInstanceResolver, CrossInstanceTarget};
pub use resolver::Resolver;
