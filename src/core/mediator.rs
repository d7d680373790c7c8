//! The dispatcher
//!
//! [`Mediator`] is the public entry point: it validates a request, fetches
//! (or builds once) the pipeline for the request type and runs it.

use std::sync::Arc;

use log::{debug, trace};
use tokio_util::sync::CancellationToken;

use super::{
    cache::CompositionCache,
    error::{MediatorError, MediatorResult},
    pipeline::Pipeline,
    request::{handler_contract, short_type_name, Request, VoidCommand},
    traits::{DispatchObserver, Resolve},
};

/// Dispatches commands and queries to their handlers
pub struct Mediator<S> {
    resolver: S,
    cache: CompositionCache,
    observer: Option<Arc<dyn DispatchObserver>>,
}

impl<S: Resolve> Mediator<S> {
    /// Create a mediator over the given resolver
    pub fn new(resolver: S) -> Self {
        Self {
            resolver,
            cache: CompositionCache::new(),
            observer: None,
        }
    }

    /// Create a mediator that reports pipeline construction to `observer`
    pub fn with_observer(resolver: S, observer: Arc<dyn DispatchObserver>) -> Self {
        Self {
            resolver,
            cache: CompositionCache::new(),
            observer: Some(observer),
        }
    }

    /// Get the resolver
    pub fn resolver(&self) -> &S {
        &self.resolver
    }

    /// Send a command or query with a token that never fires.
    pub async fn send<R: Request>(&self, request: R) -> MediatorResult<R::Response> {
        self.send_with_cancel(request, &CancellationToken::new()).await
    }

    /// Send a command or query.
    ///
    /// Errors and cancellation raised inside the pipeline are returned as-is.
    pub async fn send_with_cancel<R: Request>(
        &self,
        request: R,
        cancel: &CancellationToken,
    ) -> MediatorResult<R::Response> {
        request
            .validate()
            .map_err(|reason| MediatorError::InvalidRequest {
                request: short_type_name::<R>(),
                reason,
            })?;

        let pipeline = self.pipeline::<R>()?;
        trace!(request = std::any::type_name::<R>(); "Dispatching request");
        pipeline.invoke(&request, cancel).await
    }

    /// Execute a void command with a token that never fires.
    pub async fn execute<C: VoidCommand>(&self, command: C) -> MediatorResult<()> {
        self.execute_with_cancel(command, &CancellationToken::new())
            .await
    }

    /// Execute a void command, discarding the [`Unit`](super::Unit) result.
    pub async fn execute_with_cancel<C: VoidCommand>(
        &self,
        command: C,
        cancel: &CancellationToken,
    ) -> MediatorResult<()> {
        self.send_with_cancel(command, cancel).await.map(|_| ())
    }

    /// Build and cache the pipeline for `R` ahead of the first dispatch.
    ///
    /// Lets an application fail at startup on a missing registration.
    pub fn prepare<R: Request>(&self) -> MediatorResult<()> {
        self.pipeline::<R>().map(|_| ())
    }

    /// Number of pipelines built so far
    pub fn cached_pipelines(&self) -> usize {
        self.cache.len()
    }

    fn pipeline<R: Request>(&self) -> MediatorResult<Arc<Pipeline<R>>> {
        self.cache.get_or_build(|| self.build::<R>())
    }

    fn build<R: Request>(&self) -> MediatorResult<Pipeline<R>> {
        let request = short_type_name::<R>();

        let resolved = self
            .resolver
            .resolve_handler::<R>()
            .ok_or_else(|| MediatorError::NoHandlerRegistered {
                kind: R::KIND,
                request: request.clone(),
                contract: handler_contract::<R>(),
            })?;

        if resolved.kind != R::KIND {
            return Err(MediatorError::PipelineBuild {
                request,
                reason: format!(
                    "handler registered for a {:?} but the request is declared as a {:?}, expected {}",
                    resolved.kind,
                    R::KIND,
                    handler_contract::<R>()
                ),
            });
        }

        let behaviors = self.resolver.resolve_behaviors::<R>();
        debug!(request = request.as_str(), behaviors = behaviors.len(); "Composed pipeline");

        if let Some(observer) = &self.observer {
            observer.pipeline_built(&request, behaviors.len());
        }

        Ok(Pipeline::compose(resolved.kind, resolved.handler, behaviors))
    }
}
