//! Pipeline composition
//!
//! A pipeline is the handler wrapped by its behaviors, onion style: the first
//! behavior is outermost, runs first and sees the final result last.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::{
    error::MediatorResult,
    request::{Request, RequestKind},
    traits::{PipelineBehavior, RequestHandler},
};

enum Step<R: Request> {
    Handler(Arc<dyn RequestHandler<R>>),
    Behavior {
        behavior: Arc<dyn PipelineBehavior<R>>,
        next: Box<Step<R>>,
    },
}

impl<R: Request> Step<R> {
    fn invoke<'a>(
        &'a self,
        request: &'a R,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, MediatorResult<R::Response>> {
        match self {
            Step::Handler(handler) => handler.handle(request, cancel),
            Step::Behavior { behavior, next } => behavior.handle(
                request,
                Next {
                    step: next,
                    request,
                    cancel,
                },
                cancel,
            ),
        }
    }
}

/// The rest of the pipeline, as seen from inside a behavior.
///
/// Running it consumes it, so the inner pipeline runs at most once per
/// behavior invocation.
pub struct Next<'a, R: Request> {
    step: &'a Step<R>,
    request: &'a R,
    cancel: &'a CancellationToken,
}

impl<'a, R: Request> Next<'a, R> {
    /// Run the remaining behaviors and the handler.
    pub fn run(self) -> BoxFuture<'a, MediatorResult<R::Response>> {
        self.step.invoke(self.request, self.cancel)
    }
}

/// The composed, immutable invoker for one request type.
pub struct Pipeline<R: Request> {
    root: Step<R>,
    kind: RequestKind,
    behaviors: usize,
}

impl<R: Request> Pipeline<R> {
    /// Wrap `handler` in `behaviors`, the first one outermost.
    ///
    /// Nothing is invoked here.
    pub fn compose(
        kind: RequestKind,
        handler: Arc<dyn RequestHandler<R>>,
        behaviors: Vec<Arc<dyn PipelineBehavior<R>>>,
    ) -> Self {
        let count = behaviors.len();
        let root = behaviors
            .into_iter()
            .rev()
            .fold(Step::Handler(handler), |next, behavior| Step::Behavior {
                behavior,
                next: Box::new(next),
            });

        Self {
            root,
            kind,
            behaviors: count,
        }
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Number of behaviors wrapping the handler
    pub fn behavior_count(&self) -> usize {
        self.behaviors
    }

    pub fn invoke<'a>(
        &'a self,
        request: &'a R,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, MediatorResult<R::Response>> {
        self.root.invoke(request, cancel)
    }
}
