//! herald is an in-process mediator.
//!
//! Callers send commands and queries through a [`Mediator`](core::Mediator);
//! each request type is served by exactly one handler, wrapped in an ordered
//! chain of behaviors that is composed once per request type.

pub mod behavior;
pub mod config;
pub mod core;
pub mod logging;

pub use tokio_util::sync::CancellationToken;

#[doc(hidden)]
pub mod __private {
    pub use validator;
}
