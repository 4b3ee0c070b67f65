//! Post repository abstraction
//!
//! Storage sits behind `PostRepository` so the orchestrator can run against
//! an in-memory map in tests and SQLite in production. All status mutation
//! goes through `compare_and_swap`, which only applies an update when the
//! stored post still has the expected status. This is what prevents lost
//! updates between a manual reschedule and an in-progress publish attempt.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::types::{Platform, PostStatus, ScheduledPost};

/// Filter for queue queries; `None` fields match everything
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub platform: Option<Platform>,
    pub status: Option<PostStatus>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl PostFilter {
    pub fn matches(&self, post: &ScheduledPost) -> bool {
        if let Some(platform) = self.platform {
            if post.platform != platform {
                return false;
            }
        }
        if let Some(status) = self.status {
            if post.status != status {
                return false;
            }
        }
        if let Some(since) = self.since {
            if post.scheduled_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if post.scheduled_at > until {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a new post; the id must not already exist
    async fn insert(&self, post: &ScheduledPost) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<ScheduledPost>>;

    /// Posts matching the filter, ordered by `scheduled_at` ascending
    async fn list(&self, filter: &PostFilter) -> Result<Vec<ScheduledPost>>;

    /// Scheduled posts due at `now`, oldest due time first
    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledPost>>;

    /// Replace the stored post only if its current status is `expected`.
    ///
    /// Returns `false` when the post is missing or another writer got there
    /// first; the caller must re-read and decide what to do.
    async fn compare_and_swap(&self, expected: PostStatus, post: &ScheduledPost) -> Result<bool>;
}

/// In-memory repository backed by a `HashMap`
#[derive(Default)]
pub struct MemoryRepository {
    posts: RwLock<HashMap<String, ScheduledPost>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostRepository for MemoryRepository {
    async fn insert(&self, post: &ScheduledPost) -> Result<()> {
        let mut posts = self.posts.write().await;
        posts.insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ScheduledPost>> {
        let posts = self.posts.read().await;
        Ok(posts.get(id).cloned())
    }

    async fn list(&self, filter: &PostFilter) -> Result<Vec<ScheduledPost>> {
        let posts = self.posts.read().await;
        let mut matched: Vec<ScheduledPost> =
            posts.values().filter(|p| filter.matches(p)).cloned().collect();
        matched.sort_by_key(|p| p.scheduled_at);
        Ok(matched)
    }

    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledPost>> {
        let posts = self.posts.read().await;
        let mut due: Vec<ScheduledPost> = posts
            .values()
            .filter(|p| p.status == PostStatus::Scheduled && p.scheduled_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|p| p.scheduled_at);
        Ok(due)
    }

    async fn compare_and_swap(&self, expected: PostStatus, post: &ScheduledPost) -> Result<bool> {
        let mut posts = self.posts.write().await;
        match posts.get(&post.id) {
            Some(current) if current.status == expected => {
                posts.insert(post.id.clone(), post.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
