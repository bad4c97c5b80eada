//! Proxy Revolver - Proxy Rotation Engine
//!
//! A queue-backed proxy rotation engine for outbound HTTP request pipelines.
//! The engine selects a proxy before each request is dispatched, writes it
//! into the outgoing request configuration, and reacts to the request's
//! outcome by deciding whether to rotate to the next proxy. It performs no
//! I/O of its own: the host transport dispatches requests and reports
//! outcomes through registered hooks.
//!
//! ## Features
//!
//! - FIFO proxy queue with optional round-robin recycling
//! - Pluggable switch condition with a built-in status-code policy
//! - Force-proxy mode turning pool exhaustion into a hard failure
//! - Connector-level and request-level controllers with explicit precedence
//! - Serde-deserializable settings for config-driven hosts
//!
//! ## Example
//!
//! ```
//! use proxy_revolver::{PendingRequest, RotationController, TransportError};
//!
//! # fn main() -> proxy_revolver::Result<()> {
//! let controller = RotationController::connector()
//!     .with_proxies(["http://10.0.0.1:8080", "http://10.0.0.2:8080"])?
//!     .with_round_robin(true);
//!
//! let mut request = PendingRequest::new();
//! controller.prepare(&mut request)?;
//! assert_eq!(request.config().proxy_url(), Some("http://10.0.0.1:8080"));
//!
//! // ... the host dispatches the request, then reports how it went:
//! request.fail(&TransportError::Connect("connection refused".into()));
//!
//! // Connection failure -> the next request gets the next proxy
//! assert_eq!(
//!     controller.current_proxy().unwrap().url(),
//!     "http://10.0.0.2:8080"
//! );
//! # Ok(())
//! # }
//! ```

pub mod condition;
pub mod config;
pub mod controller;
pub mod error;
pub mod outcome;
pub mod proxy;
pub mod queue;
pub mod request;

pub use condition::{DefaultSwitchCondition, SwitchCondition, DEFAULT_RETRY_STATUSES};
pub use config::RotationSettings;
pub use controller::{ControllerScope, RotationController, FATAL_HOOK, RESPONSE_HOOK};
pub use error::{Result, RotationError};
pub use outcome::{Outcome, ResponseSummary, TransportError};
pub use proxy::{Proxy, ProxyScheme, ProxySource};
pub use queue::ProxyQueue;
pub use request::{PendingRequest, RequestConfig, PROXY_CONFIG_KEY};
