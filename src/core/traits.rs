//! Core traits for herald components
//!
//! Handlers execute requests, behaviors wrap them, and a [`Resolve`]
//! implementation tells the mediator which of them apply to a request type.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{
    error::{MediatorError, MediatorResult},
    pipeline::Next,
    request::{Command, Query, Request, RequestKind, Unit, VoidCommand},
};

/// Handles a command that produces no result
#[async_trait]
pub trait VoidCommandHandler<C: VoidCommand>: Send + Sync {
    async fn handle(&self, command: &C, cancel: &CancellationToken) -> MediatorResult<()>;
}

/// Handles a command that produces a result
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    async fn handle(&self, command: &C, cancel: &CancellationToken)
        -> MediatorResult<C::Response>;
}

/// Handles a query
#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync {
    async fn handle(&self, query: &Q, cancel: &CancellationToken) -> MediatorResult<Q::Response>;
}

/// Uniform handler shape the pipeline terminates in.
///
/// Void command handlers are adapted to this shape by mapping their
/// completion to [`Unit`].
#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync {
    async fn handle(&self, request: &R, cancel: &CancellationToken)
        -> MediatorResult<R::Response>;
}

/// Middleware bound to one request type.
#[async_trait]
pub trait PipelineBehavior<R: Request>: Send + Sync {
    /// Run before and/or after the rest of the pipeline.
    ///
    /// Returning without running `next` short-circuits every inner behavior
    /// and the handler.
    async fn handle(
        &self,
        request: &R,
        next: Next<'_, R>,
        cancel: &CancellationToken,
    ) -> MediatorResult<R::Response>;
}

/// Middleware that applies to every request type.
///
/// Bound to each concrete request type the first time its pipeline is built.
#[async_trait]
pub trait GenericBehavior: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &str;

    /// A disabled behavior is left out of every pipeline
    fn enabled(&self) -> bool {
        true
    }

    async fn handle<R: Request>(
        &self,
        request: &R,
        next: Next<'_, R>,
        cancel: &CancellationToken,
    ) -> MediatorResult<R::Response>;
}

/// A handler together with the contract it was registered under.
pub struct ResolvedHandler<R: Request> {
    pub kind: RequestKind,
    pub handler: Arc<dyn RequestHandler<R>>,
}

impl<R: Request> Clone for ResolvedHandler<R> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            handler: Arc::clone(&self.handler),
        }
    }
}

/// Supplies handlers and behaviors to the mediator.
pub trait Resolve: Send + Sync + 'static {
    /// The single handler for `R`, or `None` if nothing is registered.
    fn resolve_handler<R: Request>(&self) -> Option<ResolvedHandler<R>>;

    /// Behaviors for `R`, outermost first. May be empty.
    fn resolve_behaviors<R: Request>(&self) -> Vec<Arc<dyn PipelineBehavior<R>>>;
}

/// Observes pipeline construction.
pub trait DispatchObserver: Send + Sync {
    /// Called from inside the build step, once per composed pipeline.
    fn pipeline_built(&self, _request: &str, _behaviors: usize) {}
}

/// Fails with [`MediatorError::Cancelled`] once the token has fired.
pub fn ensure_active(cancel: &CancellationToken) -> MediatorResult<()> {
    if cancel.is_cancelled() {
        Err(MediatorError::Cancelled)
    } else {
        Ok(())
    }
}

// Adapters from the public handler shapes to `RequestHandler`.

pub(crate) struct VoidCommandAdapter<H>(pub(crate) H);

#[async_trait]
impl<C, H> RequestHandler<C> for VoidCommandAdapter<H>
where
    C: VoidCommand,
    H: VoidCommandHandler<C>,
{
    async fn handle(&self, request: &C, cancel: &CancellationToken) -> MediatorResult<Unit> {
        self.0.handle(request, cancel).await?;
        Ok(Unit)
    }
}

pub(crate) struct CommandAdapter<H>(pub(crate) H);

#[async_trait]
impl<C, H> RequestHandler<C> for CommandAdapter<H>
where
    C: Command,
    H: CommandHandler<C>,
{
    async fn handle(&self, request: &C, cancel: &CancellationToken) -> MediatorResult<C::Response> {
        self.0.handle(request, cancel).await
    }
}

pub(crate) struct QueryAdapter<H>(pub(crate) H);

#[async_trait]
impl<Q, H> RequestHandler<Q> for QueryAdapter<H>
where
    Q: Query,
    H: QueryHandler<Q>,
{
    async fn handle(&self, request: &Q, cancel: &CancellationToken) -> MediatorResult<Q::Response> {
        self.0.handle(request, cancel).await
    }
}

/// Binds a generic behavior to one request type.
pub(crate) struct BoundBehavior<B>(pub(crate) Arc<B>);

#[async_trait]
impl<R, B> PipelineBehavior<R> for BoundBehavior<B>
where
    R: Request,
    B: GenericBehavior,
{
    async fn handle(
        &self,
        request: &R,
        next: Next<'_, R>,
        cancel: &CancellationToken,
    ) -> MediatorResult<R::Response> {
        GenericBehavior::handle(self.0.as_ref(), request, next, cancel).await
    }
}
