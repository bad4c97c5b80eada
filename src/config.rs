//! Declarative configuration surface
//!
//! Hosts that load their setup from a config file deserialize a
//! [`RotationSettings`] and build a controller from it; hosts wiring things up
//! in code use the controller's builder methods directly.

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::condition::{DefaultSwitchCondition, DEFAULT_RETRY_STATUSES};
use crate::controller::{ControllerScope, RotationController};
use crate::error::{Result, RotationError};

/// Rotation engine settings, deserializable from host configuration
///
/// Every field has a default, so an empty document yields the engine's
/// defaults: proxying on, force-proxy on, round-robin off, the built-in retry
/// statuses, an empty queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationSettings {
    /// Attach proxies to outgoing requests at all
    pub enabled: bool,
    /// Fail request preparation when no proxy is available
    pub force_proxy: bool,
    /// Recycle dequeued proxies to the queue tail
    pub round_robin: bool,
    /// HTTP statuses that trigger a proxy switch
    pub retry_statuses: Vec<u16>,
    /// Initial proxy list, as connection URLs
    pub proxies: Vec<String>,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            force_proxy: true,
            round_robin: false,
            retry_statuses: DEFAULT_RETRY_STATUSES
                .iter()
                .map(|status| status.as_u16())
                .collect(),
            proxies: Vec::new(),
        }
    }
}

impl RotationSettings {
    /// Validate the configured retry statuses
    pub fn retry_status_codes(&self) -> Result<Vec<StatusCode>> {
        self.retry_statuses
            .iter()
            .map(|&code| {
                StatusCode::from_u16(code).map_err(|_| {
                    RotationError::InvalidConfig(format!("invalid retry status code: {code}"))
                })
            })
            .collect()
    }
}

impl RotationController {
    /// Build a controller from deserialized settings
    ///
    /// Fails with [`RotationError::InvalidProxySpec`] on a bad proxy URL and
    /// [`RotationError::InvalidConfig`] on an out-of-range status code.
    pub fn from_settings(scope: ControllerScope, settings: &RotationSettings) -> Result<Self> {
        let condition =
            DefaultSwitchCondition::new().with_retry_statuses(settings.retry_status_codes()?);

        RotationController::new(scope)
            .with_enabled(settings.enabled)
            .with_force_proxy(settings.force_proxy)
            .with_round_robin(settings.round_robin)
            .with_switch_condition(condition)
            .with_proxies(settings.proxies.iter().map(String::as_str))
    }
}
