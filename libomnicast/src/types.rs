//! Core types for Omnicast

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported publishing targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Instagram,
    Facebook,
    Linkedin,
    Tiktok,
    Youtube,
    Pinterest,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
            Self::Linkedin => "linkedin",
            Self::Tiktok => "tiktok",
            Self::Youtube => "youtube",
            Self::Pinterest => "pinterest",
        }
    }

    pub fn all() -> &'static [Platform] {
        &[
            Self::Twitter,
            Self::Instagram,
            Self::Facebook,
            Self::Linkedin,
            Self::Tiktok,
            Self::Youtube,
            Self::Pinterest,
        ]
    }

    /// Static content constraints for this platform
    pub fn limits(&self) -> PlatformLimits {
        match self {
            Self::Twitter => PlatformLimits::new(280, 4, 5),
            Self::Instagram => PlatformLimits::new(2200, 10, 30),
            Self::Facebook => PlatformLimits::new(63_206, 10, 10),
            Self::Linkedin => PlatformLimits::new(3000, 9, 5),
            Self::Tiktok => PlatformLimits::new(150, 1, 8),
            _ => PlatformLimits::default(),
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::Twitter
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "twitter" | "x" => Ok(Self::Twitter),
            "instagram" => Ok(Self::Instagram),
            "facebook" => Ok(Self::Facebook),
            "linkedin" => Ok(Self::Linkedin),
            "tiktok" => Ok(Self::Tiktok),
            "youtube" => Ok(Self::Youtube),
            "pinterest" => Ok(Self::Pinterest),
            _ => Err(format!(
                "Unknown platform: '{}'. Valid options: twitter, instagram, facebook, linkedin, tiktok, youtube, pinterest",
                s
            )),
        }
    }
}

/// Per-platform content constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformLimits {
    /// Maximum text length in characters
    pub max_text: usize,
    /// Maximum number of attached media items
    pub max_media: usize,
    /// Maximum number of hashtags
    pub max_hashtags: usize,
}

impl PlatformLimits {
    pub fn new(max_text: usize, max_media: usize, max_hashtags: usize) -> Self {
        Self {
            max_text,
            max_media,
            max_hashtags,
        }
    }
}

impl Default for PlatformLimits {
    fn default() -> Self {
        Self::new(5000, 10, 10)
    }
}

/// Platform-agnostic content payload before per-platform adaptation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniversalContent {
    pub title: String,
    pub body: String,
    /// References to media assets (URLs or asset ids)
    pub media: Vec<String>,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
    pub link: Option<String>,
}

impl UniversalContent {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }
}

/// Content after adaptation to a single platform's limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptedContent {
    pub platform: Platform,
    pub title: String,
    pub body: String,
    pub hashtags: Vec<String>,
    pub media: Vec<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Scheduled,
    /// Transient in-flight lock held by the executor for the duration of a
    /// publish attempt. Never a terminal state.
    Publishing,
    Published,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Publishing => "publishing",
            Self::Published => "published",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "scheduled" => Ok(Self::Scheduled),
            "publishing" => Ok(Self::Publishing),
            "published" => Ok(Self::Published),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown post status: '{}'", s)),
        }
    }
}

/// Error detail retained on a post after a failed publish attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostError {
    pub message: String,
    pub code: String,
    pub retryable: bool,
    pub at: DateTime<Utc>,
}

/// Campaign and retry bookkeeping attached to a post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostMetadata {
    pub campaign: Option<String>,
    pub content_type: Option<String>,
    pub retry_count: u32,
}

/// Engagement recorded on a post once it has been published
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub likes: u64,
    pub shares: u64,
    pub comments: u64,
    pub views: u64,
}

impl EngagementMetrics {
    /// Interactions relative to views; 0 when the post has no views
    pub fn rate(&self) -> f64 {
        if self.views == 0 {
            return 0.0;
        }
        (self.likes + self.shares + self.comments) as f64 / self.views as f64
    }
}

/// A post in the scheduling queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPost {
    pub id: String,
    pub platform: Platform,
    pub content: UniversalContent,
    pub scheduled_at: DateTime<Utc>,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    /// Platform-assigned id, set on successful publish
    pub platform_post_id: Option<String>,
    pub metadata: PostMetadata,
    pub engagement: Option<EngagementMetrics>,
    pub error: Option<PostError>,
}

impl ScheduledPost {
    pub fn new(platform: Platform, content: UniversalContent, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            platform,
            content,
            scheduled_at,
            status: PostStatus::Scheduled,
            created_at: Utc::now(),
            published_at: None,
            platform_post_id: None,
            metadata: PostMetadata::default(),
            engagement: None,
            error: None,
        }
    }
}

/// Metrics for one platform over one reporting period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedMetrics {
    pub platform: Platform,
    pub impressions: u64,
    pub engagement: u64,
    pub clicks: u64,
    pub saves: Option<u64>,
    pub shares: Option<u64>,
    pub likes: Option<u64>,
    pub views: Option<u64>,
    pub followers: Option<u64>,
}

/// Reporting period for metrics collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Day,
    Week,
    Month,
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Day => write!(f, "day"),
            Self::Week => write!(f, "week"),
            Self::Month => write!(f, "month"),
        }
    }
}

/// Merged view over all platforms for one period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossPlatformAnalytics {
    pub total_reach: u64,
    pub total_engagement: u64,
    pub total_clicks: u64,
    pub top_platform: Option<Platform>,
    pub average_engagement_rate: f64,
    pub recommendations: Vec<String>,
    pub per_platform: Vec<UnifiedMetrics>,
}

impl CrossPlatformAnalytics {
    pub fn engagement_for(&self, platform: Platform) -> Option<u64> {
        self.per_platform
            .iter()
            .find(|m| m.platform == platform)
            .map(|m| m.engagement)
    }
}
