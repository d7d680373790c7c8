//! Core abstractions for herald
//!
//! This module provides the request model, the handler and behavior
//! contracts, pipeline composition and the dispatcher.

pub mod cache;
pub mod error;
pub mod mediator;
pub mod pipeline;
pub mod registry;
pub mod request;
pub mod traits;


// Re-export commonly used types
pub use cache::CompositionCache;
pub use error::{ErrorContext, MediatorError, MediatorResult};
pub use mediator::Mediator;
pub use pipeline::{Next, Pipeline};
pub use registry::{BehaviorSet, Registered, Registry, RegistryStats, Sequenced};
pub use request::{
    handler_contract, short_type_name, Command, Query, Request, RequestKind, Unit, VoidCommand,
};
pub use traits::*;
