//! Handler and behavior registry
//!
//! The registry is the default [`Resolve`] implementation. Registration is
//! explicit and happens once at startup:
//!
//! ```ignore
//! let registry = Registry::new()
//!     .behavior(LoggingBehavior::default())
//!     .command_handler(CreateOrderHandler)
//!     .query_handler(GetOrderHandler)
//!     .request_behavior::<GetOrder, _>(CacheBehavior::default());
//! ```
//!
//! Every behavior registration, request-specific or generic, takes the next
//! number of one shared sequence, and `resolve_behaviors` returns behaviors in
//! that order.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

use log::{debug, warn};

use super::{
    request::{short_type_name, Command, Query, Request, RequestKind, VoidCommand},
    traits::{
        BoundBehavior, CommandAdapter, CommandHandler, GenericBehavior, PipelineBehavior,
        QueryAdapter, QueryHandler, Resolve, ResolvedHandler, VoidCommandAdapter,
        VoidCommandHandler,
    },
};

/// A behavior together with its registration sequence number
pub struct Sequenced<R: Request> {
    pub order: usize,
    pub behavior: Arc<dyn PipelineBehavior<R>>,
}

/// Generic behaviors known to a registry, bound per request type on demand.
///
/// Implemented for `()` and for `(Tail, Registered<B>)`, which the
/// [`Registry::behavior`] builder assembles.
pub trait BehaviorSet: Send + Sync + 'static {
    fn bind<R: Request>(&self, out: &mut Vec<Sequenced<R>>);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BehaviorSet for () {
    fn bind<R: Request>(&self, _out: &mut Vec<Sequenced<R>>) {}

    fn len(&self) -> usize {
        0
    }
}

/// One generic behavior and the sequence number it was registered with
pub struct Registered<B> {
    order: usize,
    behavior: Arc<B>,
}

impl<Tail, B> BehaviorSet for (Tail, Registered<B>)
where
    Tail: BehaviorSet,
    B: GenericBehavior,
{
    fn bind<R: Request>(&self, out: &mut Vec<Sequenced<R>>) {
        self.0.bind(out);
        let registered = &self.1;
        if registered.behavior.enabled() {
            out.push(Sequenced {
                order: registered.order,
                behavior: Arc::new(BoundBehavior(Arc::clone(&registered.behavior))),
            });
        }
    }

    fn len(&self) -> usize {
        self.0.len() + 1
    }
}

/// Registry of handlers and behaviors
pub struct Registry<G = ()> {
    /// `TypeId` of the request to `ResolvedHandler<R>`
    handlers: HashMap<TypeId, Box<dyn Any + Send + Sync>>,

    /// `TypeId` of the request to `Vec<Sequenced<R>>`
    behaviors: HashMap<TypeId, Box<dyn Any + Send + Sync>>,

    generic: G,
    sequence: usize,
}

impl Default for Registry<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry<()> {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            behaviors: HashMap::new(),
            generic: (),
            sequence: 0,
        }
    }
}

impl<G: BehaviorSet> Registry<G> {
    /// Register the handler for a void command
    pub fn void_command_handler<C, H>(self, handler: H) -> Self
    where
        C: VoidCommand,
        H: VoidCommandHandler<C> + 'static,
    {
        self.insert_handler::<C>(ResolvedHandler {
            kind: RequestKind::VoidCommand,
            handler: Arc::new(VoidCommandAdapter(handler)),
        })
    }

    /// Register the handler for a command with a result
    pub fn command_handler<C, H>(self, handler: H) -> Self
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        self.insert_handler::<C>(ResolvedHandler {
            kind: RequestKind::Command,
            handler: Arc::new(CommandAdapter(handler)),
        })
    }

    /// Register the handler for a query
    pub fn query_handler<Q, H>(self, handler: H) -> Self
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        self.insert_handler::<Q>(ResolvedHandler {
            kind: RequestKind::Query,
            handler: Arc::new(QueryAdapter(handler)),
        })
    }

    /// Register a behavior that only wraps requests of type `R`
    pub fn request_behavior<R, B>(mut self, behavior: B) -> Self
    where
        R: Request,
        B: PipelineBehavior<R> + 'static,
    {
        let order = self.next_order();
        debug!(request = short_type_name::<R>().as_str(), order = order; "Registering request behavior");

        let entry = self
            .behaviors
            .entry(TypeId::of::<R>())
            .or_insert_with(|| Box::new(Vec::<Sequenced<R>>::new()) as Box<dyn Any + Send + Sync>);
        if let Some(list) = entry.downcast_mut::<Vec<Sequenced<R>>>() {
            list.push(Sequenced {
                order,
                behavior: Arc::new(behavior),
            });
        }
        self
    }

    /// Register a behavior that wraps every request type
    pub fn behavior<B: GenericBehavior>(mut self, behavior: B) -> Registry<(G, Registered<B>)> {
        let order = self.next_order();
        debug!(behavior = behavior.name(), order = order; "Registering generic behavior");

        Registry {
            handlers: self.handlers,
            behaviors: self.behaviors,
            generic: (
                self.generic,
                Registered {
                    order,
                    behavior: Arc::new(behavior),
                },
            ),
            sequence: self.sequence,
        }
    }

    /// Whether a handler is registered for `R`
    pub fn has_handler<R: Request>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<R>())
    }

    /// Get registration counts for monitoring
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            handler_count: self.handlers.len(),
            request_behavior_count: self.behaviors.len(),
            generic_behavior_count: self.generic.len(),
        }
    }

    fn insert_handler<R: Request>(mut self, resolved: ResolvedHandler<R>) -> Self {
        let key = TypeId::of::<R>();
        if self.handlers.contains_key(&key) {
            warn!(
                request = short_type_name::<R>().as_str();
                "Handler already registered, keeping the first registration"
            );
            return self;
        }

        debug!(request = short_type_name::<R>().as_str(), kind = resolved.kind.to_string().as_str(); "Registering handler");
        self.handlers.insert(key, Box::new(resolved));
        self
    }

    fn next_order(&mut self) -> usize {
        let order = self.sequence;
        self.sequence += 1;
        order
    }
}

impl<G: BehaviorSet> Resolve for Registry<G> {
    fn resolve_handler<R: Request>(&self) -> Option<ResolvedHandler<R>> {
        self.handlers
            .get(&TypeId::of::<R>())
            .and_then(|entry| entry.downcast_ref::<ResolvedHandler<R>>())
            .cloned()
    }

    fn resolve_behaviors<R: Request>(&self) -> Vec<Arc<dyn PipelineBehavior<R>>> {
        let mut ordered: Vec<Sequenced<R>> = self
            .behaviors
            .get(&TypeId::of::<R>())
            .and_then(|entry| entry.downcast_ref::<Vec<Sequenced<R>>>())
            .map(|list| {
                list.iter()
                    .map(|s| Sequenced {
                        order: s.order,
                        behavior: Arc::clone(&s.behavior),
                    })
                    .collect()
            })
            .unwrap_or_default();

        self.generic.bind(&mut ordered);

        // Registration order, request-specific and generic interleaved
        ordered.sort_by_key(|s| s.order);
        ordered.into_iter().map(|s| s.behavior).collect()
    }
}

/// Statistics about registry contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    pub handler_count: usize,
    /// Request types that have at least one request-specific behavior
    pub request_behavior_count: usize,
    pub generic_behavior_count: usize,
}
