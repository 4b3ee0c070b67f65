//! Cross-platform fan-out coordination
//!
//! Takes one piece of content to N platforms: adapts it per platform, calls
//! each publisher sequentially with a fixed inter-call delay, and isolates
//! failures so one platform can never abort the others. Also derives
//! cross-promotion posts from an already-published post and syncs canonical
//! content from one platform to others.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::adapter;
use crate::analytics::AnalyticsAggregator;
use crate::error::Result;
use crate::platforms::{ContentSource, PublisherRegistry};
use crate::types::{Platform, UniversalContent};

/// Delay between consecutive platform calls during fan-out
const DEFAULT_CALL_DELAY: Duration = Duration::from_secs(2);

/// Outcome of a fan-out across platforms
#[derive(Debug, Clone, Default)]
pub struct FanOutReport {
    /// Platform post ids for successful publishes
    pub posted: HashMap<Platform, String>,
    /// Platforms skipped because they are not enabled
    pub skipped: Vec<Platform>,
    /// Per-platform failures; the rest of the fan-out proceeded regardless
    pub failed: HashMap<Platform, String>,
}

impl FanOutReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Static preference table: which platforms suit a content type best
fn preferred_platforms(content_type: &str) -> &'static [Platform] {
    match content_type {
        "video" => &[Platform::Youtube, Platform::Tiktok, Platform::Instagram],
        "short_video" => &[Platform::Tiktok, Platform::Instagram, Platform::Youtube],
        "image" => &[Platform::Instagram, Platform::Pinterest, Platform::Facebook],
        "article" => &[Platform::Linkedin, Platform::Facebook, Platform::Twitter],
        _ => &[Platform::Twitter, Platform::Facebook],
    }
}

/// Canonical public URL for a published post
pub fn canonical_url(platform: Platform, post_id: &str) -> String {
    match platform {
        Platform::Twitter => format!("https://twitter.com/i/status/{}", post_id),
        Platform::Instagram => format!("https://www.instagram.com/p/{}/", post_id),
        Platform::Facebook => format!("https://www.facebook.com/{}", post_id),
        Platform::Linkedin => format!("https://www.linkedin.com/feed/update/{}/", post_id),
        Platform::Tiktok => format!("https://www.tiktok.com/t/{}", post_id),
        Platform::Youtube => format!("https://www.youtube.com/watch?v={}", post_id),
        Platform::Pinterest => format!("https://www.pinterest.com/pin/{}/", post_id),
    }
}

pub struct PlatformCoordinator {
    publishers: PublisherRegistry,
    /// Enabled platforms, in configuration order
    enabled: Vec<Platform>,
    source: Arc<dyn ContentSource>,
    analytics: Arc<AnalyticsAggregator>,
    call_delay: Duration,
}

impl PlatformCoordinator {
    pub fn new(
        publishers: PublisherRegistry,
        enabled: Vec<Platform>,
        source: Arc<dyn ContentSource>,
        analytics: Arc<AnalyticsAggregator>,
    ) -> Self {
        Self {
            publishers,
            enabled,
            source,
            analytics,
            call_delay: DEFAULT_CALL_DELAY,
        }
    }

    /// Override the inter-call delay (tests use zero)
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    pub fn is_enabled(&self, platform: Platform) -> bool {
        self.enabled.contains(&platform)
    }

    /// Publish one piece of content to several platforms.
    ///
    /// Platforms outside the enabled set are skipped with a warning. Enabled
    /// platforms are called one at a time, separated by the fixed delay;
    /// sequential by design so external rate limits see a predictable call
    /// pattern. A failure on one platform is recorded and the fan-out
    /// continues.
    pub async fn post_to_all(
        &self,
        content: &UniversalContent,
        platforms: &[Platform],
        cross_promote: bool,
        adapt_content: bool,
    ) -> FanOutReport {
        let mut report = FanOutReport::default();
        let mut first = true;

        for &platform in platforms {
            if !self.is_enabled(platform) {
                warn!(platform = %platform, "Platform not enabled, skipping");
                report.skipped.push(platform);
                continue;
            }

            let Some(publisher) = self.publishers.get(platform) else {
                warn!(platform = %platform, "No publisher registered, skipping");
                report
                    .failed
                    .insert(platform, "no publisher registered".to_string());
                continue;
            };

            if !first {
                sleep(self.call_delay).await;
            }
            first = false;

            let cross: Vec<Platform> = if cross_promote {
                self.enabled
                    .iter()
                    .copied()
                    .filter(|p| *p != platform)
                    .collect()
            } else {
                Vec::new()
            };

            let adapted = if adapt_content {
                adapter::adapt(content, platform, &cross)
            } else {
                // Pass through unadapted: caller guarantees the content
                // already conforms
                crate::types::AdaptedContent {
                    platform,
                    title: content.title.clone(),
                    body: content.body.clone(),
                    hashtags: content.hashtags.clone(),
                    media: content.media.clone(),
                    link: content.link.clone(),
                }
            };

            match publisher.publish(&adapted).await {
                Ok(post_id) => {
                    info!(platform = %platform, post_id = %post_id, "Fan-out publish succeeded");
                    report.posted.insert(platform, post_id);
                }
                Err(e) => {
                    warn!(platform = %platform, "Fan-out publish failed, continuing: {}", e);
                    report.failed.insert(platform, e.to_string());
                }
            }
        }

        report
    }

    /// Publish secondary posts pointing at an already-published main post.
    ///
    /// The derived content references the main post's canonical URL and is
    /// fanned out with cross-promotion disabled, so promotion posts never
    /// spawn further promotion.
    pub async fn cross_promote(
        &self,
        main_platform: Platform,
        post_id: &str,
        promotion_platforms: &[Platform],
        message: &str,
    ) -> FanOutReport {
        let url = canonical_url(main_platform, post_id);
        let content = UniversalContent {
            body: format!("{}\n\n{}", message, url),
            link: Some(url),
            ..Default::default()
        };

        self.post_to_all(&content, promotion_platforms, false, true)
            .await
    }

    /// Fetch canonical content from a source platform and fan it out.
    ///
    /// # Errors
    ///
    /// Fails when the source fetch fails; fan-out failures are reported per
    /// platform in the result.
    pub async fn sync_content(
        &self,
        source_platform: Platform,
        post_id: &str,
        target_platforms: &[Platform],
    ) -> Result<FanOutReport> {
        let content = self.source.fetch(source_platform, post_id).await?;
        Ok(self.post_to_all(&content, target_platforms, false, true).await)
    }

    /// Pick the best enabled platform for a content type.
    ///
    /// Intersects the static preference table with the enabled set, then
    /// ranks candidates by engagement from the latest analytics snapshot.
    /// When no candidate is enabled, falls back to the snapshot's global top
    /// platform.
    pub fn best_platform_for(&self, content_type: &str) -> Option<Platform> {
        let candidates: Vec<Platform> = preferred_platforms(content_type)
            .iter()
            .copied()
            .filter(|p| self.is_enabled(*p))
            .collect();

        let snapshot = self.analytics.latest();

        if candidates.is_empty() {
            return snapshot.and_then(|s| s.top_platform);
        }

        match &snapshot {
            Some(s) => candidates
                .iter()
                .copied()
                .max_by(|a, b| {
                    let ea = s.engagement_for(*a).unwrap_or(0);
                    let eb = s.engagement_for(*b).unwrap_or(0);
                    // First candidate wins ties, mirroring the analytics
                    // tie-break
                    ea.cmp(&eb).then(std::cmp::Ordering::Greater)
                }),
            None => candidates.first().copied(),
        }
    }
}
