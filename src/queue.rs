//! FIFO proxy queue with optional round-robin recycling
//!
//! Composition over an internal buffer rather than an extension of a stdlib
//! container: only the vetted operations are exposed, and the round-robin
//! recycling rule lives in exactly one place, `dequeue`.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::trace;

use crate::error::Result;
use crate::proxy::{Proxy, ProxySource};

/// Ordered collection of proxies with FIFO dequeue semantics
///
/// With round-robin enabled, a dequeued proxy that is still available is
/// re-appended to the tail before being returned, so it becomes eligible again
/// only after every other queued proxy has been served once. Queue cardinality
/// is invariant under round-robin as long as dequeued proxies stay available.
#[derive(Debug, Default)]
pub struct ProxyQueue {
    proxies: VecDeque<Arc<Proxy>>,
    round_robin: bool,
}

impl ProxyQueue {
    /// Create an empty queue with round-robin disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue pre-seeded from proxies or URL strings
    pub fn from_proxies<I, P>(proxies: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: ProxySource,
    {
        let mut queue = Self::new();
        for proxy in proxies {
            queue.enqueue(proxy)?;
        }
        Ok(queue)
    }

    /// Append a proxy to the tail
    ///
    /// Accepts a [`Proxy`], a shared `Arc<Proxy>`, or a URL string; a string
    /// that does not parse surfaces [`crate::RotationError::InvalidProxySpec`]
    /// here, at the call site.
    pub fn enqueue<P: ProxySource>(&mut self, proxy: P) -> Result<()> {
        let proxy = proxy.resolve()?;
        trace!(proxy = %proxy.identifier(), "enqueued proxy");
        self.proxies.push_back(proxy);
        Ok(())
    }

    /// Remove and return the front proxy, or `None` when empty
    ///
    /// Applies the round-robin recycling rule: removal first, re-append before
    /// returning, and only when the proxy is still marked available.
    pub fn dequeue(&mut self) -> Option<Arc<Proxy>> {
        let proxy = self.proxies.pop_front()?;

        if self.round_robin && proxy.is_available() {
            self.proxies.push_back(Arc::clone(&proxy));
        }

        Some(proxy)
    }

    /// The front proxy without removing it
    pub fn peek(&self) -> Option<&Arc<Proxy>> {
        self.proxies.front()
    }

    /// Read-only copy of the current contents, front first
    pub fn snapshot(&self) -> Vec<Arc<Proxy>> {
        self.proxies.iter().cloned().collect()
    }

    /// Remove all proxies
    pub fn clear(&mut self) {
        self.proxies.clear();
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Whether dequeued proxies are recycled to the tail
    pub fn round_robin_enabled(&self) -> bool {
        self.round_robin
    }

    /// Toggle round-robin recycling; affects only future dequeues
    pub fn set_round_robin_enabled(&mut self, enabled: bool) {
        self.round_robin = enabled;
    }
}
