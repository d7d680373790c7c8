pub mod logging;
pub mod timeout;

use async_trait::async_trait;
use log::debug;
use serde_yaml::Value as YamlValue;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    core::{
        BehaviorSet, GenericBehavior, MediatorError, MediatorResult, Next, Registered, Registry,
        Request,
    },
};

pub use logging::LoggingBehavior;
pub use timeout::TimeoutBehavior;

/// Names accepted under the `behaviors` key of the configuration.
pub const BUILTIN_BEHAVIORS: [&str; 2] = [logging::BEHAVIOR_NAME, timeout::BEHAVIOR_NAME];

/// Registry type produced by [`Registry::with_configured_behaviors`]
pub type ConfiguredRegistry<G> =
    Registry<((G, Registered<Option<LoggingBehavior>>), Registered<Option<TimeoutBehavior>>)>;

// A behavior that was not configured stays in the list but is never bound.
#[async_trait]
impl<B: GenericBehavior> GenericBehavior for Option<B> {
    fn name(&self) -> &str {
        self.as_ref().map_or("unconfigured", |b| b.name())
    }

    fn enabled(&self) -> bool {
        self.as_ref().is_some_and(|b| b.enabled())
    }

    async fn handle<R: Request>(
        &self,
        request: &R,
        next: Next<'_, R>,
        cancel: &CancellationToken,
    ) -> MediatorResult<R::Response> {
        match self {
            Some(behavior) => behavior.handle(request, next, cancel).await,
            None => next.run().await,
        }
    }
}

impl<G: BehaviorSet> Registry<G> {
    /// Register the built-in behaviors named in `config`, logging outermost.
    ///
    /// Fails fast on an unknown behavior name or an invalid behavior config.
    pub fn with_configured_behaviors(
        self,
        config: &Config,
    ) -> MediatorResult<ConfiguredRegistry<G>> {
        if let Some(unknown) = config
            .behaviors
            .keys()
            .find(|name| !BUILTIN_BEHAVIORS.contains(&name.as_str()))
        {
            return Err(MediatorError::Config(format!(
                "Unknown behavior type '{unknown}'"
            )));
        }

        let logging = configured(config, logging::BEHAVIOR_NAME, logging::create_logging_behavior)?;
        let timeout = configured(config, timeout::BEHAVIOR_NAME, timeout::create_timeout_behavior)?;

        Ok(self.behavior(logging).behavior(timeout))
    }
}

fn configured<B, F>(config: &Config, name: &str, create: F) -> MediatorResult<Option<B>>
where
    F: FnOnce(YamlValue) -> MediatorResult<B>,
{
    match config.behaviors.get(name) {
        Some(cfg) => {
            debug!(behavior = name; "Building configured behavior");
            create(cfg.clone()).map(Some)
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{QueryHandler, Resolve};

    struct Lookup;
    crate::query!(Lookup => u32);

    struct LookupHandler;

    #[async_trait]
    impl QueryHandler<Lookup> for LookupHandler {
        async fn handle(&self, _query: &Lookup, _cancel: &CancellationToken) -> MediatorResult<u32> {
            Ok(1)
        }
    }

    #[test]
    fn test_unknown_behavior_is_rejected() {
        let conf = Config::from_yaml("behaviors:\n  retry: {}\n").unwrap();
        let err = Registry::new().with_configured_behaviors(&conf).err().unwrap();
        assert!(err.to_string().contains("Unknown behavior type 'retry'"));
    }

    #[test]
    fn test_invalid_behavior_config_is_rejected() {
        let conf = Config::from_yaml("behaviors:\n  timeout:\n    duration_ms: 0\n").unwrap();
        let err = Registry::new().with_configured_behaviors(&conf).err().unwrap();
        assert!(matches!(err, MediatorError::Config(_)));
    }

    #[test]
    fn test_only_configured_behaviors_are_bound() {
        let conf = Config::from_yaml("behaviors:\n  timeout:\n    duration_ms: 50\n").unwrap();
        let registry = Registry::new()
            .with_configured_behaviors(&conf)
            .unwrap()
            .query_handler(LookupHandler);

        assert_eq!(registry.stats().generic_behavior_count, 2);
        assert_eq!(registry.resolve_behaviors::<Lookup>().len(), 1);

        let registry = Registry::new()
            .with_configured_behaviors(&Config::default())
            .unwrap();
        assert!(registry.resolve_behaviors::<Lookup>().is_empty());
    }

    #[test]
    fn test_disabled_behavior_is_skipped() {
        let conf = Config::from_yaml(
            r#"
behaviors:
  logging:
    enabled: false
  timeout:
    duration_ms: 50
"#,
        )
        .unwrap();
        let registry = Registry::new().with_configured_behaviors(&conf).unwrap();
        assert_eq!(registry.resolve_behaviors::<Lookup>().len(), 1);
    }
}
