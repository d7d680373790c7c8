use std::{
    str::FromStr,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use log::{log, warn, Level};
use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::core::{short_type_name, GenericBehavior, MediatorError, MediatorResult, Next, Request};

pub const BEHAVIOR_NAME: &str = "logging";

/// Creates a logging behavior from its YAML configuration.
pub fn create_logging_behavior(cfg: YamlValue) -> MediatorResult<LoggingBehavior> {
    let config: BehaviorConfig = serde_yaml::from_value(cfg)
        .map_err(|e| MediatorError::Config(format!("Invalid logging behavior config: {e}")))?;

    config
        .validate()
        .map_err(|e| MediatorError::Config(format!("Invalid logging behavior config: {e}")))?;

    let level = Level::from_str(&config.level)
        .map_err(|e| MediatorError::Config(format!("Invalid logging behavior level: {e}")))?;

    let mut behavior = LoggingBehavior::new(level).with_enabled(config.enabled);
    if let Some(ms) = config.slow_threshold_ms {
        behavior = behavior.with_slow_threshold(Duration::from_millis(ms));
    }
    Ok(behavior)
}

#[derive(Debug, Serialize, Deserialize, Validate)]
struct BehaviorConfig {
    #[serde(default = "BehaviorConfig::default_enabled")]
    enabled: bool,
    #[serde(default = "BehaviorConfig::default_level")]
    #[validate(custom(function = "BehaviorConfig::validate_level"))]
    level: String,
    #[validate(range(min = 1))]
    slow_threshold_ms: Option<u64>,
}

impl BehaviorConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_level() -> String {
        "debug".to_string()
    }

    fn validate_level(level: &String) -> Result<(), ValidationError> {
        Level::from_str(level)
            .map(|_| ())
            .map_err(|_| ValidationError::new("level must be one of error, warn, info, debug, trace"))
    }
}

/// Logs the start, outcome and duration of every dispatch.
///
/// Each dispatch gets a fresh `dispatch_id` so concurrent requests can be told
/// apart. Results and errors pass through unchanged.
#[derive(Debug, Clone)]
pub struct LoggingBehavior {
    enabled: bool,
    level: Level,
    slow_threshold: Option<Duration>,
}

impl Default for LoggingBehavior {
    fn default() -> Self {
        Self::new(Level::Debug)
    }
}

impl LoggingBehavior {
    pub fn new(level: Level) -> Self {
        Self {
            enabled: true,
            level,
            slow_threshold: None,
        }
    }

    /// Warn about dispatches that take longer than `threshold`
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn slow_threshold(&self) -> Option<Duration> {
        self.slow_threshold
    }
}

#[async_trait]
impl GenericBehavior for LoggingBehavior {
    fn name(&self) -> &str {
        BEHAVIOR_NAME
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    async fn handle<R: Request>(
        &self,
        _request: &R,
        next: Next<'_, R>,
        _cancel: &CancellationToken,
    ) -> MediatorResult<R::Response> {
        let dispatch_id = Uuid::new_v4().to_string();
        let request = short_type_name::<R>();
        let kind = R::KIND.to_string();

        log!(
            self.level,
            dispatch_id = dispatch_id.as_str(),
            request = request.as_str(),
            kind = kind.as_str();
            "Handling request"
        );

        let start = Instant::now();
        let result = next.run().await;
        let elapsed = start.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;

        match &result {
            Ok(_) => {
                log!(
                    self.level,
                    dispatch_id = dispatch_id.as_str(),
                    request = request.as_str(),
                    elapsed_ms = elapsed_ms;
                    "Handled request"
                );
                if self.slow_threshold.is_some_and(|threshold| elapsed > threshold) {
                    warn!(
                        dispatch_id = dispatch_id.as_str(),
                        request = request.as_str(),
                        elapsed_ms = elapsed_ms;
                        "Slow request"
                    );
                }
            }
            Err(err) if err.is_cancelled() => {
                log!(
                    self.level,
                    dispatch_id = dispatch_id.as_str(),
                    request = request.as_str(),
                    elapsed_ms = elapsed_ms;
                    "Request cancelled"
                );
            }
            Err(err) => {
                let error = err.to_string();
                warn!(
                    dispatch_id = dispatch_id.as_str(),
                    request = request.as_str(),
                    elapsed_ms = elapsed_ms,
                    error = error.as_str();
                    "Request failed"
                );
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::{CommandHandler, Mediator, Registry};

    struct Shout(String);
    crate::command!(Shout => String);

    struct ShoutHandler;

    #[async_trait]
    impl CommandHandler<Shout> for ShoutHandler {
        async fn handle(&self, command: &Shout, _cancel: &CancellationToken) -> MediatorResult<String> {
            if command.0.is_empty() {
                return Err(MediatorError::handler("nothing to shout"));
            }
            Ok(command.0.to_uppercase())
        }
    }

    fn init_log() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_create_from_config() {
        let cfg: YamlValue =
            serde_yaml::from_str("level: info\nslow_threshold_ms: 250\n").unwrap();
        let behavior = create_logging_behavior(cfg).unwrap();
        assert_eq!(behavior.level(), Level::Info);
        assert_eq!(behavior.slow_threshold(), Some(Duration::from_millis(250)));
        assert!(GenericBehavior::enabled(&behavior));

        let behavior = create_logging_behavior(YamlValue::Mapping(Default::default())).unwrap();
        assert_eq!(behavior.level(), Level::Debug);
        assert!(behavior.slow_threshold().is_none());
    }

    #[test]
    fn test_invalid_config() {
        let cfg: YamlValue = serde_yaml::from_str("level: loud\n").unwrap();
        assert!(matches!(
            create_logging_behavior(cfg),
            Err(MediatorError::Config(_))
        ));

        let cfg: YamlValue = serde_yaml::from_str("slow_threshold_ms: 0\n").unwrap();
        assert!(create_logging_behavior(cfg).is_err());
    }

    #[tokio::test]
    async fn test_results_pass_through() {
        init_log();
        let registry = Registry::new()
            .behavior(LoggingBehavior::new(Level::Info).with_slow_threshold(Duration::from_millis(1)))
            .command_handler(ShoutHandler);
        let mediator = Arc::new(Mediator::new(registry));

        let result = mediator.send(Shout("hello".to_string())).await.unwrap();
        assert_eq!(result, "HELLO");

        let err = mediator.send(Shout(String::new())).await.unwrap_err();
        assert_eq!(err.to_string(), "nothing to shout");
    }
}
