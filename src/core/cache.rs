//! Composition cache
//!
//! Maps a request type to its composed [`Pipeline`]. Each entry is a
//! `OnceCell`, so concurrent first dispatches of a type run the builder once
//! and the late arrivals wait for it.

use std::{
    any::{Any, TypeId},
    sync::Arc,
};

use dashmap::DashMap;
use log::trace;
use once_cell::sync::OnceCell;

use super::{
    error::{MediatorError, MediatorResult},
    pipeline::Pipeline,
    request::{short_type_name, Request},
};

type ErasedPipeline = Arc<dyn Any + Send + Sync>;

/// Build-once store of composed pipelines, keyed by request type
#[derive(Default)]
pub struct CompositionCache {
    entries: DashMap<TypeId, Arc<OnceCell<ErasedPipeline>>>,
}

impl CompositionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the pipeline for `R`, running `build` if none exists yet.
    ///
    /// A failed build leaves the entry empty.
    pub fn get_or_build<R, F>(&self, build: F) -> MediatorResult<Arc<Pipeline<R>>>
    where
        R: Request,
        F: FnOnce() -> MediatorResult<Pipeline<R>>,
    {
        let key = TypeId::of::<R>();

        if let Some(pipeline) = self.entries.get(&key).and_then(|cell| cell.get().cloned()) {
            return Self::downcast(pipeline);
        }

        let cell = self.entries.entry(key).or_default().clone();
        let pipeline = cell
            .get_or_try_init(|| {
                trace!(request = std::any::type_name::<R>(); "building pipeline");
                build().map(|pipeline| Arc::new(pipeline) as ErasedPipeline)
            })?
            .clone();

        Self::downcast(pipeline)
    }

    /// Whether a pipeline for `R` has been built
    pub fn contains<R: Request>(&self) -> bool {
        self.entries
            .get(&TypeId::of::<R>())
            .is_some_and(|cell| cell.get().is_some())
    }

    /// Number of built pipelines
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn downcast<R: Request>(pipeline: ErasedPipeline) -> MediatorResult<Arc<Pipeline<R>>> {
        pipeline
            .downcast::<Pipeline<R>>()
            .map_err(|_| MediatorError::PipelineBuild {
                request: short_type_name::<R>(),
                reason: "cached pipeline does not match the request type".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::core::{request::RequestKind, traits::RequestHandler};

    struct Probe;
    crate::query!(Probe => u8);

    struct ProbeHandler;

    #[async_trait]
    impl RequestHandler<Probe> for ProbeHandler {
        async fn handle(&self, _request: &Probe, _cancel: &CancellationToken) -> MediatorResult<u8> {
            Ok(7)
        }
    }

    fn build_probe(counter: &AtomicUsize) -> MediatorResult<Pipeline<Probe>> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Pipeline::compose(
            RequestKind::Query,
            Arc::new(ProbeHandler),
            Vec::new(),
        ))
    }

    #[test]
    fn test_builds_once() {
        let cache = CompositionCache::new();
        let counter = AtomicUsize::new(0);
        assert!(cache.is_empty());

        let first = cache.get_or_build(|| build_probe(&counter)).unwrap();
        let second = cache.get_or_build(|| build_probe(&counter)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(cache.contains::<Probe>());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        let cache = CompositionCache::new();
        let result = cache.get_or_build::<Probe, _>(|| {
            Err(MediatorError::PipelineBuild {
                request: "Probe".to_string(),
                reason: "boom".to_string(),
            })
        });
        assert!(matches!(result, Err(MediatorError::PipelineBuild { .. })));
        assert!(!cache.contains::<Probe>());
        assert!(cache.is_empty());

        let counter = AtomicUsize::new(0);
        cache.get_or_build(|| build_probe(&counter)).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_use_builds_once() {
        let cache = Arc::new(CompositionCache::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                let counter = counter.clone();
                std::thread::spawn(move || {
                    cache
                        .get_or_build(|| {
                            std::thread::sleep(std::time::Duration::from_millis(5));
                            build_probe(&counter)
                        })
                        .unwrap()
                })
            })
            .collect();

        let pipelines: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(pipelines.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
