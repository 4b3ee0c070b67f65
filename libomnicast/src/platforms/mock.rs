//! Mock collaborators for testing
//!
//! Configurable fakes that simulate successes, failures, and delays without
//! network access. Available in all builds (not just tests) so integration
//! tests can drive the executor, coordinator, and analytics against
//! deterministic behavior.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{OmnicastError, PublisherError, Result};
use crate::platforms::{ContentSource, MetricsProvider, Publisher};
use crate::types::{AdaptedContent, Platform, Timeframe, UnifiedMetrics, UniversalContent};

/// Mock publisher with scripted behavior
pub struct MockPublisher {
    platform: Platform,
    /// Number of leading attempts that fail before success; `usize::MAX`
    /// never succeeds
    failures_before_success: usize,
    error: PublisherError,
    delay: Duration,
    calls: Arc<Mutex<usize>>,
    published: Arc<Mutex<Vec<AdaptedContent>>>,
}

impl MockPublisher {
    /// A publisher that always succeeds
    pub fn succeeding(platform: Platform) -> Self {
        Self {
            platform,
            failures_before_success: 0,
            error: PublisherError::Network("unused".to_string()),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(0)),
            published: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A publisher that always fails with the given error
    pub fn failing(platform: Platform, error: PublisherError) -> Self {
        Self {
            failures_before_success: usize::MAX,
            error,
            ..Self::succeeding(platform)
        }
    }

    /// A publisher that fails `n` times, then succeeds
    pub fn flaky(platform: Platform, n: usize, error: PublisherError) -> Self {
        Self {
            failures_before_success: n,
            error,
            ..Self::succeeding(platform)
        }
    }

    /// Add simulated network latency to every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of publish attempts observed
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    /// Content successfully published, in order
    pub fn published(&self) -> Vec<AdaptedContent> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, content: &AdaptedContent) -> Result<String> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        if attempt <= self.failures_before_success {
            return Err(self.error.clone().into());
        }

        self.published.lock().unwrap().push(content.clone());
        Ok(format!("{}:mock-{}", self.platform, uuid::Uuid::new_v4()))
    }

    fn platform(&self) -> Platform {
        self.platform
    }
}

/// Mock metrics provider returning a fixed result
pub struct MockMetricsProvider {
    platform: Platform,
    metrics: Option<UnifiedMetrics>,
}

impl MockMetricsProvider {
    pub fn returning(metrics: UnifiedMetrics) -> Self {
        Self {
            platform: metrics.platform,
            metrics: Some(metrics),
        }
    }

    /// A provider that fails every fetch with a network error
    pub fn failing(platform: Platform) -> Self {
        Self {
            platform,
            metrics: None,
        }
    }
}

#[async_trait]
impl MetricsProvider for MockMetricsProvider {
    async fn fetch(&self, _timeframe: Timeframe) -> Result<UnifiedMetrics> {
        match &self.metrics {
            Some(metrics) => Ok(metrics.clone()),
            None => Err(PublisherError::Network(format!(
                "{} metrics endpoint unreachable",
                self.platform
            ))
            .into()),
        }
    }

    fn platform(&self) -> Platform {
        self.platform
    }
}

/// Mock content source returning a fixed payload for any post id
pub struct MockContentSource {
    content: UniversalContent,
    fail: bool,
}

impl MockContentSource {
    pub fn returning(content: UniversalContent) -> Self {
        Self {
            content,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            content: UniversalContent::default(),
            fail: true,
        }
    }
}

#[async_trait]
impl ContentSource for MockContentSource {
    async fn fetch(&self, platform: Platform, post_id: &str) -> Result<UniversalContent> {
        if self.fail {
            return Err(OmnicastError::NotFound(format!(
                "{} post {} not found",
                platform, post_id
            )));
        }
        Ok(self.content.clone())
    }
}
