//! Rotation controller
//!
//! One controller per request-issuing entity: a connector embeds one, and an
//! individual request definition may carry its own. The controller selects
//! the current proxy before dispatch, writes it into the outgoing request
//! configuration, registers the outcome hooks, and rotates when the switch
//! condition says so.
//!
//! The controller is composed into hosts, never mixed in: when both a
//! connector-scoped and a request-scoped controller touch the same request,
//! the request-scoped one wins (see [`RotationController::prepare`]).

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, trace};

use crate::condition::{DefaultSwitchCondition, SwitchCondition};
use crate::error::{Result, RotationError};
use crate::outcome::Outcome;
use crate::proxy::{Proxy, ProxySource};
use crate::queue::ProxyQueue;
use crate::request::{PendingRequest, PROXY_CONFIG_KEY};

/// Fixed name of the response-completion hook
pub const RESPONSE_HOOK: &str = "proxy-response";

/// Fixed name of the fatal-failure hook
pub const FATAL_HOOK: &str = "proxy-fatal";

/// Which host entity a controller is attached to
///
/// Scope drives precedence when one request passes through two controllers:
/// request-scoped configuration overrides connector-scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerScope {
    Connector,
    Request,
}

impl ControllerScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerScope::Connector => "connector",
            ControllerScope::Request => "request",
        }
    }
}

struct Inner {
    queue: ProxyQueue,
    current: Option<Arc<Proxy>>,
    enabled: bool,
    force_proxy: bool,
    condition: Box<dyn SwitchCondition>,
}

impl Inner {
    /// Runs the switch condition against a completed request's outcome and
    /// advances the queue on a positive decision. The completed request is
    /// unaffected either way; rotation only changes what the next `prepare`
    /// hands out.
    fn process_outcome(&mut self, outcome: Outcome<'_>) {
        if !self.condition.evaluate(outcome) {
            trace!("switch condition negative, keeping current proxy");
            return;
        }

        let previous = self.current.take();
        self.current = self.queue.dequeue();
        debug!(
            previous = previous.as_ref().map(|p| p.identifier()).as_deref(),
            next = self.current.as_ref().map(|p| p.identifier()).as_deref(),
            "switch condition positive, rotating proxy"
        );
    }
}

/// Queue-backed proxy rotation controller
///
/// State lives behind an `Arc<Mutex<..>>` so the hooks registered on a
/// request can reach it after `prepare` returns. That sharing is an ownership
/// mechanism, not a concurrency guarantee: callers dispatching requests in
/// parallel against one controller must serialize prepare-to-outcome
/// themselves, or use one controller per in-flight request.
pub struct RotationController {
    scope: ControllerScope,
    inner: Arc<Mutex<Inner>>,
}

impl RotationController {
    pub fn new(scope: ControllerScope) -> Self {
        Self {
            scope,
            inner: Arc::new(Mutex::new(Inner {
                queue: ProxyQueue::new(),
                current: None,
                enabled: true,
                force_proxy: true,
                condition: Box::new(DefaultSwitchCondition::new()),
            })),
        }
    }

    /// Shorthand for a connector-scoped controller
    pub fn connector() -> Self {
        Self::new(ControllerScope::Connector)
    }

    /// Shorthand for a request-scoped controller
    pub fn for_request() -> Self {
        Self::new(ControllerScope::Request)
    }

    pub fn scope(&self) -> ControllerScope {
        self.scope
    }

    /// Enable or disable proxying entirely (builder form)
    pub fn with_enabled(self, enabled: bool) -> Self {
        self.inner.lock().enabled = enabled;
        self
    }

    /// Require a proxy on every request; exhaustion becomes a hard failure
    pub fn with_force_proxy(self, force: bool) -> Self {
        self.inner.lock().force_proxy = force;
        self
    }

    /// Recycle dequeued proxies to the queue tail
    pub fn with_round_robin(self, enabled: bool) -> Self {
        self.inner.lock().queue.set_round_robin_enabled(enabled);
        self
    }

    /// Seed the queue from proxies or URL strings
    pub fn with_proxies<I, P>(self, proxies: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: ProxySource,
    {
        {
            let mut inner = self.inner.lock();
            for proxy in proxies {
                inner.queue.enqueue(proxy)?;
            }
        }
        Ok(self)
    }

    /// Replace the queue wholesale
    pub fn with_queue(self, queue: ProxyQueue) -> Self {
        self.inner.lock().queue = queue;
        self
    }

    /// Replace the switch condition
    pub fn with_switch_condition(self, condition: impl SwitchCondition + 'static) -> Self {
        self.inner.lock().condition = Box::new(condition);
        self
    }

    /// Replace the switch condition with a closure predicate
    pub fn switch_proxy_when(
        self,
        condition: impl Fn(Outcome<'_>) -> bool + Send + 'static,
    ) -> Self {
        self.with_switch_condition(condition)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.lock().enabled = enabled;
    }

    pub fn set_force_proxy(&self, force: bool) {
        self.inner.lock().force_proxy = force;
    }

    pub fn set_round_robin(&self, enabled: bool) {
        self.inner.lock().queue.set_round_robin_enabled(enabled);
    }

    /// Append one proxy or URL string to the queue
    pub fn enqueue<P: ProxySource>(&self, proxy: P) -> Result<()> {
        self.inner.lock().queue.enqueue(proxy)
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.lock().enabled
    }

    pub fn is_force_proxy_enabled(&self) -> bool {
        self.inner.lock().force_proxy
    }

    pub fn round_robin_enabled(&self) -> bool {
        self.inner.lock().queue.round_robin_enabled()
    }

    /// The proxy the next prepared request will receive, if one is selected
    pub fn current_proxy(&self) -> Option<Arc<Proxy>> {
        self.inner.lock().current.clone()
    }

    pub fn queue_len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Read-only copy of the queued proxies, front first
    pub fn snapshot(&self) -> Vec<Arc<Proxy>> {
        self.inner.lock().queue.snapshot()
    }

    /// Prepare an outgoing request: select a proxy, attach it, arm the hooks
    ///
    /// With proxying disabled the proxy key is set to null and no hooks are
    /// registered. Otherwise the cached current proxy is reused, or the next
    /// one is dequeued; an empty queue under force-proxy fails with
    /// [`RotationError::NoAvailableProxy`] and the request must not be
    /// dispatched.
    ///
    /// Precedence when the request already went through another controller:
    /// a request-scoped arming beats a connector-scoped `prepare` (no-op); a
    /// connector-scoped arming is torn down and overridden by a
    /// request-scoped `prepare`; two preparations at the same scope are a
    /// genuine double registration and fail with
    /// [`RotationError::HookCollision`]. Precedence is checked before the
    /// disabled short-circuit, so a disabled connector still yields.
    pub fn prepare(&self, request: &mut PendingRequest) -> Result<()> {
        let mut inner = self.inner.lock();

        // Precedence applies before the enabled check: a disabled connector
        // still yields to a request-level arming instead of clobbering it.
        match request.armed_by() {
            Some(scope) if scope == self.scope => {
                return Err(RotationError::HookCollision {
                    name: RESPONSE_HOOK.to_string(),
                });
            }
            Some(ControllerScope::Request) if self.scope == ControllerScope::Connector => {
                debug!(
                    request = %request.id(),
                    "request-level rotation already armed, connector yields"
                );
                return Ok(());
            }
            Some(ControllerScope::Connector) if self.scope == ControllerScope::Request => {
                request.remove_response_hook(RESPONSE_HOOK);
                request.remove_fatal_hook(FATAL_HOOK);
                debug!(
                    request = %request.id(),
                    "request-level rotation overrides connector-level hooks"
                );
            }
            _ => {}
        }

        if !inner.enabled {
            request.config_mut().set(PROXY_CONFIG_KEY, Value::Null);
            debug!(request = %request.id(), "proxying disabled, request goes direct");
            return Ok(());
        }

        if inner.current.is_none() {
            inner.current = inner.queue.dequeue();
        }

        match &inner.current {
            Some(proxy) => {
                request
                    .config_mut()
                    .set(PROXY_CONFIG_KEY, proxy.url().to_string());
                debug!(
                    request = %request.id(),
                    proxy = %proxy.identifier(),
                    scope = self.scope.as_str(),
                    "attached proxy to request"
                );
            }
            None if inner.force_proxy => return Err(RotationError::NoAvailableProxy),
            None => {
                request.config_mut().remove(PROXY_CONFIG_KEY);
                debug!(request = %request.id(), "no proxy available, proceeding without one");
            }
        }

        let state = Arc::clone(&self.inner);
        request.register_response_hook(RESPONSE_HOOK, move |response| {
            state.lock().process_outcome(Outcome::Success(response));
        })?;

        let state = Arc::clone(&self.inner);
        request.register_fatal_hook(FATAL_HOOK, move |error| {
            state.lock().process_outcome(Outcome::Failure(error));
        })?;

        request.set_armed_by(self.scope);
        Ok(())
    }
}

impl std::fmt::Debug for RotationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("RotationController")
            .field("scope", &self.scope)
            .field("enabled", &inner.enabled)
            .field("force_proxy", &inner.force_proxy)
            .field("queue_len", &inner.queue.len())
            .field(
                "current",
                &inner.current.as_ref().map(|p| p.identifier()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{ResponseSummary, TransportError};
    use http::StatusCode;

    const PROXY_A: &str = "http://192.168.1.1:8080";
    const PROXY_B: &str = "http://192.168.1.2:8080";

    fn ok() -> ResponseSummary {
        ResponseSummary::new(StatusCode::OK)
    }

    #[test]
    fn test_disabled_controller_attaches_null_proxy() {
        let controller = RotationController::connector()
            .with_proxies([PROXY_A])
            .unwrap()
            .with_enabled(false);

        let mut request = PendingRequest::new();
        controller.prepare(&mut request).unwrap();

        assert_eq!(request.config().get(PROXY_CONFIG_KEY), Some(&Value::Null));
        assert!(request.config().proxy_url().is_none());
        // Rotation logic fully bypassed: queue untouched, no hooks armed
        assert_eq!(controller.queue_len(), 1);
        request.complete(&ok());
        assert!(controller.current_proxy().is_none());
    }

    #[test]
    fn test_force_proxy_with_empty_queue_fails_preparation() {
        let controller = RotationController::connector().with_force_proxy(true);

        let mut request = PendingRequest::new();
        let result = controller.prepare(&mut request);
        assert!(matches!(result, Err(RotationError::NoAvailableProxy)));
    }

    #[test]
    fn test_non_force_empty_queue_proceeds_without_proxy() {
        let controller = RotationController::connector().with_force_proxy(false);

        let mut request = PendingRequest::new();
        controller.prepare(&mut request).unwrap();

        assert!(!request.config().contains_key(PROXY_CONFIG_KEY));
        // Hooks are still armed; a completion is harmless
        request.complete(&ok());
        assert!(controller.current_proxy().is_none());
    }

    #[test]
    fn test_exhaustion_scenario_under_force_proxy() {
        let controller = RotationController::connector()
            .with_proxies([PROXY_A, PROXY_B])
            .unwrap()
            .with_force_proxy(true)
            .switch_proxy_when(|_| true);

        // First request uses A, then rotates to B
        let mut first = PendingRequest::new();
        controller.prepare(&mut first).unwrap();
        assert_eq!(first.config().proxy_url(), Some(PROXY_A));
        first.complete(&ok());
        assert_eq!(controller.current_proxy().unwrap().url(), PROXY_B);

        // Second request uses B, then rotates onto an empty queue
        let mut second = PendingRequest::new();
        controller.prepare(&mut second).unwrap();
        assert_eq!(second.config().proxy_url(), Some(PROXY_B));
        second.complete(&ok());
        assert!(controller.current_proxy().is_none());

        // Third request has nothing left
        let mut third = PendingRequest::new();
        assert!(matches!(
            controller.prepare(&mut third),
            Err(RotationError::NoAvailableProxy)
        ));
    }

    #[test]
    fn test_default_condition_retains_proxy_on_success() {
        let controller = RotationController::connector()
            .with_proxies([PROXY_A, PROXY_B])
            .unwrap();

        let mut request = PendingRequest::new();
        controller.prepare(&mut request).unwrap();
        request.complete(&ok());

        // No switch on success: A stays current, B stays queued
        assert_eq!(controller.current_proxy().unwrap().url(), PROXY_A);
        assert_eq!(controller.queue_len(), 1);

        let mut next = PendingRequest::new();
        controller.prepare(&mut next).unwrap();
        assert_eq!(next.config().proxy_url(), Some(PROXY_A));
    }

    #[test]
    fn test_default_condition_rotates_on_connection_failure() {
        let controller = RotationController::connector()
            .with_proxies([PROXY_A, PROXY_B])
            .unwrap();

        let mut request = PendingRequest::new();
        controller.prepare(&mut request).unwrap();
        request.fail(&TransportError::Connect("connection refused".to_string()));

        assert_eq!(controller.current_proxy().unwrap().url(), PROXY_B);
    }

    #[test]
    fn test_round_robin_single_proxy_is_reused() {
        let controller = RotationController::connector()
            .with_proxies([PROXY_A])
            .unwrap()
            .with_round_robin(true)
            .switch_proxy_when(|_| true);

        let mut request = PendingRequest::new();
        controller.prepare(&mut request).unwrap();
        assert_eq!(request.config().proxy_url(), Some(PROXY_A));
        request.complete(&ok());

        // Recycled at the queue level: still one queued, still current
        assert_eq!(controller.queue_len(), 1);
        assert_eq!(controller.current_proxy().unwrap().url(), PROXY_A);

        let mut next = PendingRequest::new();
        controller.prepare(&mut next).unwrap();
        assert_eq!(next.config().proxy_url(), Some(PROXY_A));
    }

    #[test]
    fn test_cancelled_request_leaves_current_proxy_untouched() {
        let controller = RotationController::connector()
            .with_proxies([PROXY_A, PROXY_B])
            .unwrap()
            .switch_proxy_when(|_| true);

        let mut request = PendingRequest::new();
        controller.prepare(&mut request).unwrap();
        drop(request); // cancelled before any outcome hook fired

        assert_eq!(controller.current_proxy().unwrap().url(), PROXY_A);
        let mut retry = PendingRequest::new();
        controller.prepare(&mut retry).unwrap();
        assert_eq!(retry.config().proxy_url(), Some(PROXY_A));
    }

    #[test]
    fn test_same_scope_double_prepare_collides() {
        let connector_a = RotationController::connector()
            .with_proxies([PROXY_A])
            .unwrap();
        let connector_b = RotationController::connector()
            .with_proxies([PROXY_B])
            .unwrap();

        let mut request = PendingRequest::new();
        connector_a.prepare(&mut request).unwrap();

        let result = connector_b.prepare(&mut request);
        assert!(matches!(
            result,
            Err(RotationError::HookCollision { name }) if name == RESPONSE_HOOK
        ));
    }

    #[test]
    fn test_request_scope_overrides_connector_scope() {
        let connector = RotationController::connector()
            .with_proxies([PROXY_A])
            .unwrap()
            .switch_proxy_when(|_| true);
        let per_request = RotationController::for_request()
            .with_proxies([PROXY_B])
            .unwrap()
            .switch_proxy_when(|_| true);

        let mut request = PendingRequest::new();
        connector.prepare(&mut request).unwrap();
        per_request.prepare(&mut request).unwrap();

        // Request-level proxy wins
        assert_eq!(request.config().proxy_url(), Some(PROXY_B));

        // Only the request-level controller sees the outcome
        request.complete(&ok());
        assert_eq!(connector.current_proxy().unwrap().url(), PROXY_A);
        assert!(per_request.current_proxy().is_none());
    }

    #[test]
    fn test_connector_scope_yields_to_armed_request_scope() {
        let per_request = RotationController::for_request()
            .with_proxies([PROXY_B])
            .unwrap();
        let connector = RotationController::connector()
            .with_proxies([PROXY_A])
            .unwrap();

        let mut request = PendingRequest::new();
        per_request.prepare(&mut request).unwrap();
        connector.prepare(&mut request).unwrap();

        assert_eq!(request.config().proxy_url(), Some(PROXY_B));
        // Connector never touched its queue
        assert_eq!(connector.queue_len(), 1);
        assert!(connector.current_proxy().is_none());
    }

    #[test]
    fn test_disabled_connector_yields_to_armed_request_scope() {
        let per_request = RotationController::for_request()
            .with_proxies([PROXY_B])
            .unwrap();
        let connector = RotationController::connector()
            .with_proxies([PROXY_A])
            .unwrap()
            .with_enabled(false);

        let mut request = PendingRequest::new();
        per_request.prepare(&mut request).unwrap();
        connector.prepare(&mut request).unwrap();

        // The request-level proxy survives; no null overwrite
        assert_eq!(request.config().proxy_url(), Some(PROXY_B));
    }

    #[test]
    fn test_runtime_setters_and_accessors() {
        let controller = RotationController::connector();
        assert!(controller.is_enabled());
        assert!(controller.is_force_proxy_enabled());
        assert!(!controller.round_robin_enabled());

        controller.set_enabled(false);
        controller.set_force_proxy(false);
        controller.set_round_robin(true);
        controller.enqueue(PROXY_A).unwrap();

        assert!(!controller.is_enabled());
        assert!(!controller.is_force_proxy_enabled());
        assert!(controller.round_robin_enabled());
        assert_eq!(controller.queue_len(), 1);
        assert_eq!(controller.snapshot()[0].url(), PROXY_A);
    }
}
