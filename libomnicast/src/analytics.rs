//! Cross-platform analytics aggregation
//!
//! Collects one `UnifiedMetrics` per enabled platform and merges them into a
//! single ranked view. A platform whose metrics collaborator fails is logged
//! and omitted; it never aborts the sweep.

use std::sync::{Arc, RwLock};
use tracing::warn;

use crate::platforms::MetricsProvider;
use crate::types::{CrossPlatformAnalytics, Timeframe, UnifiedMetrics};

/// Engagement below this fraction of the cross-platform mean earns a
/// recommendation
const UNDERPERFORM_THRESHOLD: f64 = 0.7;

pub struct AnalyticsAggregator {
    /// Providers in registration order; the order is the top-platform
    /// tie-break
    providers: Vec<Arc<dyn MetricsProvider>>,
    snapshot: RwLock<Option<CrossPlatformAnalytics>>,
}

impl AnalyticsAggregator {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            snapshot: RwLock::new(None),
        }
    }

    pub fn register(&mut self, provider: Arc<dyn MetricsProvider>) {
        self.providers.push(provider);
    }

    /// The most recent aggregation, if any sweep has completed
    pub fn latest(&self) -> Option<CrossPlatformAnalytics> {
        self.snapshot.read().unwrap().clone()
    }

    /// Collect metrics from every registered provider and merge them.
    ///
    /// Individual provider failures are tolerated: the platform is omitted
    /// from the result. The merged view is retained as the latest snapshot.
    pub async fn track_all(&self, timeframe: Timeframe) -> CrossPlatformAnalytics {
        let mut collected: Vec<UnifiedMetrics> = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            match provider.fetch(timeframe).await {
                Ok(metrics) => collected.push(metrics),
                Err(e) => warn!(
                    platform = %provider.platform(),
                    "Metrics collection failed, omitting platform: {}",
                    e
                ),
            }
        }

        let analytics = aggregate(collected);
        *self.snapshot.write().unwrap() = Some(analytics.clone());
        analytics
    }
}

impl Default for AnalyticsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge per-platform metrics into totals, a top platform, and
/// recommendations.
///
/// The top platform is the one with the highest engagement; a tie is broken
/// by first occurrence in iteration order. That choice is arbitrary but
/// deterministic, and callers depend on it staying that way.
fn aggregate(per_platform: Vec<UnifiedMetrics>) -> CrossPlatformAnalytics {
    let total_reach: u64 = per_platform.iter().map(|m| m.impressions).sum();
    let total_engagement: u64 = per_platform.iter().map(|m| m.engagement).sum();
    let total_clicks: u64 = per_platform.iter().map(|m| m.clicks).sum();

    let top_platform = per_platform
        .iter()
        .max_by(|a, b| {
            a.engagement
                .cmp(&b.engagement)
                // max_by keeps the later of equal elements; reverse the
                // tie so the first occurrence wins
                .then(std::cmp::Ordering::Greater)
        })
        .map(|m| m.platform);

    let average_engagement_rate = if total_reach == 0 {
        0.0
    } else {
        total_engagement as f64 / total_reach as f64
    };

    let recommendations = recommend(&per_platform);

    CrossPlatformAnalytics {
        total_reach,
        total_engagement,
        total_clicks,
        top_platform,
        average_engagement_rate,
        recommendations,
        per_platform,
    }
}

fn recommend(per_platform: &[UnifiedMetrics]) -> Vec<String> {
    if per_platform.is_empty() {
        return Vec::new();
    }

    let mean =
        per_platform.iter().map(|m| m.engagement).sum::<u64>() as f64 / per_platform.len() as f64;
    let threshold = UNDERPERFORM_THRESHOLD * mean;

    per_platform
        .iter()
        .filter(|m| (m.engagement as f64) < threshold)
        .map(|m| {
            format!(
                "{} engagement ({}) is below 70% of the cross-platform average ({:.0}); review content or posting times",
                m.platform, m.engagement, mean
            )
        })
        .collect()
}
