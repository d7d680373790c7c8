use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::core::{short_type_name, GenericBehavior, MediatorError, MediatorResult, Next, Request};

pub const BEHAVIOR_NAME: &str = "timeout";

/// Creates a timeout behavior from its YAML configuration.
pub fn create_timeout_behavior(cfg: YamlValue) -> MediatorResult<TimeoutBehavior> {
    let config: BehaviorConfig = serde_yaml::from_value(cfg)
        .map_err(|e| MediatorError::Config(format!("Invalid timeout behavior config: {e}")))?;

    config
        .validate()
        .map_err(|e| MediatorError::Config(format!("Invalid timeout behavior config: {e}")))?;

    Ok(TimeoutBehavior {
        enabled: config.enabled,
        duration: Duration::from_millis(config.duration_ms),
    })
}

#[derive(Debug, Serialize, Deserialize, Validate)]
struct BehaviorConfig {
    #[serde(default = "BehaviorConfig::default_enabled")]
    enabled: bool,
    #[validate(range(min = 1))]
    duration_ms: u64,
}

impl BehaviorConfig {
    fn default_enabled() -> bool {
        true
    }
}

/// Fails a dispatch with [`MediatorError::TimedOut`] once the inner chain runs
/// longer than the configured duration. The inner future is dropped.
#[derive(Debug, Clone)]
pub struct TimeoutBehavior {
    enabled: bool,
    duration: Duration,
}

impl TimeoutBehavior {
    pub fn new(duration: Duration) -> Self {
        Self {
            enabled: true,
            duration,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

#[async_trait]
impl GenericBehavior for TimeoutBehavior {
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
        match tokio::time::timeout(self.duration, next.run()).await {
            Ok(result) => result,
            Err(_) => {
                let request = short_type_name::<R>();
                let after_ms = self.duration.as_millis() as u64;
                warn!(request = request.as_str(), after_ms = after_ms; "Request timed out");
                Err(MediatorError::TimedOut { request, after_ms })
            }
        }
    }
}
