//! Platform collaborator seams
//!
//! The orchestrator core never talks HTTP itself. Each platform is reached
//! through three narrow capability traits: [`Publisher`] for posting,
//! [`MetricsProvider`] for analytics, and [`ContentSource`] for fetching
//! canonical content back. Concrete clients live outside this crate; the
//! [`exec`] module bridges to external command-line clients and [`mock`]
//! provides deterministic fakes for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{AdaptedContent, Platform, Timeframe, UnifiedMetrics, UniversalContent};

pub mod exec;
pub mod mock;

/// Posting capability for one platform
///
/// Implementations are not idempotent: the executor guarantees a post is
/// never dispatched to `publish` twice concurrently.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish adapted content, returning the platform-assigned post id
    ///
    /// # Errors
    ///
    /// Returns `PublisherError` wrapped in the crate error; the variant
    /// decides whether the attempt is retried (see `PublisherError::retryable`).
    async fn publish(&self, content: &AdaptedContent) -> Result<String>;

    /// The platform this publisher posts to
    fn platform(&self) -> Platform;
}

/// Metrics capability for one platform
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    async fn fetch(&self, timeframe: Timeframe) -> Result<UnifiedMetrics>;

    fn platform(&self) -> Platform;
}

/// Fetch canonical content for an already-published post
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, platform: Platform, post_id: &str) -> Result<UniversalContent>;
}

/// Publishers keyed by platform
#[derive(Clone, Default)]
pub struct PublisherRegistry {
    publishers: HashMap<Platform, Arc<dyn Publisher>>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, publisher: Arc<dyn Publisher>) {
        self.publishers.insert(publisher.platform(), publisher);
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn Publisher>> {
        self.publishers.get(&platform).cloned()
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.publishers.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }
}
