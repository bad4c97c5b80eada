//! Switch condition: should the engine rotate to the next proxy?
//!
//! The decision is a pure predicate over a request [`Outcome`]. The built-in
//! [`DefaultSwitchCondition`] covers connection failures and a configurable
//! set of retryable HTTP statuses; any `Fn(Outcome<'_>) -> bool` closure works
//! as a custom policy.

use http::StatusCode;

use crate::outcome::Outcome;

/// Retry statuses the default policy starts with: proxy auth required, bad
/// gateway, service unavailable, gateway timeout
pub const DEFAULT_RETRY_STATUSES: [StatusCode; 4] = [
    StatusCode::PROXY_AUTHENTICATION_REQUIRED,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Decision predicate evaluated once per completed request
pub trait SwitchCondition: Send {
    /// Returns true when the controller should advance to the next proxy
    fn evaluate(&self, outcome: Outcome<'_>) -> bool;
}

impl<F> SwitchCondition for F
where
    F: Fn(Outcome<'_>) -> bool + Send,
{
    fn evaluate(&self, outcome: Outcome<'_>) -> bool {
        self(outcome)
    }
}

/// Built-in switch policy
///
/// Ordered checks, first match wins:
/// 1. connection-level failure (direct or wrapped) → switch
/// 2. an HTTP status is extractable from the error → switch iff it is in the
///    retry set
/// 3. anything else, including a clean success → keep the current proxy
#[derive(Debug, Clone)]
pub struct DefaultSwitchCondition {
    retry_statuses: Vec<StatusCode>,
}

impl Default for DefaultSwitchCondition {
    fn default() -> Self {
        Self {
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }
}

impl DefaultSwitchCondition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the retry set wholesale
    pub fn with_retry_statuses(mut self, statuses: impl Into<Vec<StatusCode>>) -> Self {
        self.retry_statuses = statuses.into();
        self
    }

    /// Append one status to the retry set
    pub fn add_retry_status(mut self, status: StatusCode) -> Self {
        self.retry_statuses.push(status);
        self
    }

    pub fn retry_statuses(&self) -> &[StatusCode] {
        &self.retry_statuses
    }
}

impl SwitchCondition for DefaultSwitchCondition {
    fn evaluate(&self, outcome: Outcome<'_>) -> bool {
        let error = match outcome {
            Outcome::Success(_) => return false,
            Outcome::Failure(error) => error,
        };

        if error.is_connection_failure() {
            return true;
        }

        match error.http_status() {
            Some(status) => self.retry_statuses.contains(&status),
            None => false,
        }
    }
}
