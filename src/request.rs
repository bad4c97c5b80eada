//! Host-side request contract
//!
//! [`PendingRequest`] is what the engine requires from a host transport: a
//! mutable outbound configuration map and two named hook pipelines fired
//! exactly once when the request completes or fails fatally. A host either
//! uses this type directly or adapts its own request object to the same
//! shape.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::controller::ControllerScope;
use crate::error::{Result, RotationError};
use crate::outcome::{ResponseSummary, TransportError};

/// Configuration key the engine writes the proxy URL under
pub const PROXY_CONFIG_KEY: &str = "proxy";

/// Callback invoked with the response when a request completes cleanly
pub type ResponseHook = Box<dyn FnMut(&ResponseSummary) + Send>;

/// Callback invoked with the terminal error when a request fails fatally
pub type FatalHook = Box<dyn FnMut(&TransportError) + Send>;

/// Mutable outbound configuration map
///
/// Values are JSON so "proxy explicitly set to null" (proxying disabled) is
/// distinguishable from "proxy key absent" (no proxy selected).
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    entries: HashMap<String, Value>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// The proxy URL attached to this request, if one was set
    pub fn proxy_url(&self) -> Option<&str> {
        match self.entries.get(PROXY_CONFIG_KEY) {
            Some(Value::String(url)) => Some(url),
            _ => None,
        }
    }
}

struct NamedHook<T> {
    name: String,
    callback: T,
}

/// One request moving through the host pipeline
///
/// Hooks are named, and a duplicate name within a pipeline is rejected with
/// [`RotationError::HookCollision`] rather than silently overwritten. Firing
/// drains the pipeline, so each hook runs at most once per request.
pub struct PendingRequest {
    id: Uuid,
    config: RequestConfig,
    on_response: Vec<NamedHook<ResponseHook>>,
    on_fatal: Vec<NamedHook<FatalHook>>,
    finished: bool,
    armed_by: Option<ControllerScope>,
}

impl PendingRequest {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            config: RequestConfig::new(),
            on_response: Vec::new(),
            on_fatal: Vec::new(),
            finished: false,
            armed_by: None,
        }
    }

    /// Identity of this request, for logging and per-request bookkeeping
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RequestConfig {
        &mut self.config
    }

    /// Register a response-completion hook under a unique name
    pub fn register_response_hook(
        &mut self,
        name: impl Into<String>,
        callback: impl FnMut(&ResponseSummary) + Send + 'static,
    ) -> Result<()> {
        let name = name.into();
        if self.on_response.iter().any(|hook| hook.name == name) {
            return Err(RotationError::HookCollision { name });
        }
        self.on_response.push(NamedHook {
            name,
            callback: Box::new(callback),
        });
        Ok(())
    }

    /// Register a fatal-failure hook under a unique name
    pub fn register_fatal_hook(
        &mut self,
        name: impl Into<String>,
        callback: impl FnMut(&TransportError) + Send + 'static,
    ) -> Result<()> {
        let name = name.into();
        if self.on_fatal.iter().any(|hook| hook.name == name) {
            return Err(RotationError::HookCollision { name });
        }
        self.on_fatal.push(NamedHook {
            name,
            callback: Box::new(callback),
        });
        Ok(())
    }

    /// Remove a response hook by name; returns whether one was present
    pub fn remove_response_hook(&mut self, name: &str) -> bool {
        let before = self.on_response.len();
        self.on_response.retain(|hook| hook.name != name);
        self.on_response.len() != before
    }

    /// Remove a fatal hook by name; returns whether one was present
    pub fn remove_fatal_hook(&mut self, name: &str) -> bool {
        let before = self.on_fatal.len();
        self.on_fatal.retain(|hook| hook.name != name);
        self.on_fatal.len() != before
    }

    /// Report a clean completion, firing the response pipeline once
    pub fn complete(&mut self, response: &ResponseSummary) {
        if self.mark_finished("complete") {
            return;
        }
        for mut hook in std::mem::take(&mut self.on_response) {
            (hook.callback)(response);
        }
        self.on_fatal.clear();
    }

    /// Report a fatal failure, firing the fatal pipeline once
    pub fn fail(&mut self, error: &TransportError) {
        if self.mark_finished("fail") {
            return;
        }
        for mut hook in std::mem::take(&mut self.on_fatal) {
            (hook.callback)(error);
        }
        self.on_response.clear();
    }

    fn mark_finished(&mut self, event: &str) -> bool {
        if self.finished {
            warn!(request = %self.id, event, "outcome reported twice, ignoring");
            return true;
        }
        self.finished = true;
        false
    }

    pub(crate) fn armed_by(&self) -> Option<ControllerScope> {
        self.armed_by
    }

    pub(crate) fn set_armed_by(&mut self, scope: ControllerScope) {
        self.armed_by = Some(scope);
    }
}

impl Default for PendingRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("response_hooks", &self.on_response.len())
            .field("fatal_hooks", &self.on_fatal.len())
            .field("finished", &self.finished)
            .finish()
    }
}
