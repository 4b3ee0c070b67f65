//! Scheduled post store
//!
//! Single source of truth for the post queue. Owns validation of time and
//! content constraints at creation, and every status transition the executor
//! or a direct caller can make. Transitions are compare-and-set through the
//! repository so a manual cancel/reschedule can never clobber an in-flight
//! publish attempt.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::error::{OmnicastError, Result};
use crate::repo::{MemoryRepository, PostFilter, PostRepository};
use crate::types::{
    EngagementMetrics, Platform, PostError, PostStatus, ScheduledPost, UniversalContent,
};

/// Request to put one post on the queue
#[derive(Debug, Clone)]
pub struct SchedulePostRequest {
    pub platform: Platform,
    pub content: UniversalContent,
    pub scheduled_at: DateTime<Utc>,
    pub campaign: Option<String>,
    pub content_type: Option<String>,
}

impl SchedulePostRequest {
    pub fn new(
        platform: Platform,
        content: UniversalContent,
        scheduled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            platform,
            content,
            scheduled_at,
            campaign: None,
            content_type: None,
        }
    }
}

/// Result of a cancellation request
///
/// Cancelling an already-published post is an expected, recoverable caller
/// mistake, so this is a structured outcome rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub struct CancelOutcome {
    pub success: bool,
    pub message: String,
}

/// Snapshot of the queue for introspection
#[derive(Debug, Clone)]
pub struct QueueStatus {
    pub total_posts: usize,
    pub scheduled: usize,
    /// Scheduled posts due within the next hour
    pub pending_within_hour: usize,
    pub failed: usize,
    /// Next scheduled posts, at most 10, earliest first
    pub upcoming: Vec<ScheduledPost>,
    /// Most recently published posts, at most 10
    pub recent_published: Vec<ScheduledPost>,
}

#[derive(Clone)]
pub struct PostStore {
    repo: Arc<dyn PostRepository>,
}

impl PostStore {
    pub fn new(repo: Arc<dyn PostRepository>) -> Self {
        Self { repo }
    }

    /// Store backed by an in-memory map, for tests and embedded use
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRepository::new()))
    }

    /// Validate and enqueue a single post
    ///
    /// # Errors
    ///
    /// `Validation` when the schedule time is not in the future or the raw
    /// content exceeds the platform's limits (checked before adaptation;
    /// directly scheduled posts must already conform).
    pub async fn schedule_post(&self, request: SchedulePostRequest) -> Result<ScheduledPost> {
        validate_schedule_time(request.scheduled_at, Utc::now())?;
        validate_content(&request.content, request.platform)?;

        let mut post =
            ScheduledPost::new(request.platform, request.content, request.scheduled_at);
        post.metadata.campaign = request.campaign;
        post.metadata.content_type = request.content_type;

        self.repo.insert(&post).await?;
        debug!(post_id = %post.id, platform = %post.platform, "Post scheduled");
        Ok(post)
    }

    /// Enqueue a batch of posts with generated schedule times
    ///
    /// Entries are spaced `spacing` apart starting at `start`. The whole
    /// batch is validated before anything is stored, so a calendar is created
    /// completely or not at all.
    pub async fn create_calendar(
        &self,
        platform: Platform,
        entries: Vec<UniversalContent>,
        start: DateTime<Utc>,
        spacing: Duration,
        campaign: Option<String>,
    ) -> Result<Vec<ScheduledPost>> {
        validate_schedule_time(start, Utc::now())?;
        for content in &entries {
            validate_content(content, platform)?;
        }

        let mut posts = Vec::with_capacity(entries.len());
        for (i, content) in entries.into_iter().enumerate() {
            let scheduled_at = start + spacing * i as i32;
            let mut post = ScheduledPost::new(platform, content, scheduled_at);
            post.metadata.campaign = campaign.clone();
            self.repo.insert(&post).await?;
            posts.push(post);
        }
        Ok(posts)
    }

    /// # Errors
    ///
    /// `NotFound` when no post has the given id.
    pub async fn get_post(&self, id: &str) -> Result<ScheduledPost> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| OmnicastError::NotFound(format!("No post with id {}", id)))
    }

    pub async fn get_posts(&self, filter: &PostFilter) -> Result<Vec<ScheduledPost>> {
        self.repo.list(filter).await
    }

    /// Scheduled posts whose time has passed, oldest due time first
    pub async fn due_posts(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledPost>> {
        self.repo.due(now).await
    }

    /// Demote a post back to draft
    ///
    /// Succeeds only from `Draft` or `Scheduled`. A post that is published,
    /// failed, or currently claimed by the executor is reported in the
    /// outcome without mutating state.
    pub async fn cancel_post(&self, id: &str) -> Result<CancelOutcome> {
        let post = self.get_post(id).await?;

        match post.status {
            PostStatus::Published => Ok(CancelOutcome {
                success: false,
                message: format!("Post {} is already published and cannot be cancelled", id),
            }),
            PostStatus::Publishing => Ok(CancelOutcome {
                success: false,
                message: format!("Post {} has a publish attempt in flight", id),
            }),
            PostStatus::Failed => Ok(CancelOutcome {
                success: false,
                message: format!("Post {} already failed; reschedule it instead", id),
            }),
            PostStatus::Draft | PostStatus::Scheduled => {
                let from = post.status;
                let mut cancelled = post;
                cancelled.status = PostStatus::Draft;

                if self.repo.compare_and_swap(from, &cancelled).await? {
                    Ok(CancelOutcome {
                        success: true,
                        message: format!("Post {} cancelled", id),
                    })
                } else {
                    // Claimed by the executor between read and swap
                    Ok(CancelOutcome {
                        success: false,
                        message: format!("Post {} was claimed by a publish attempt", id),
                    })
                }
            }
        }
    }

    /// Move a post to a new schedule time
    ///
    /// A failed post becomes scheduled again with a fresh retry budget.
    ///
    /// # Errors
    ///
    /// `State` when the post is published or mid-attempt, `Validation` when
    /// the new time is not in the future.
    pub async fn reschedule_post(
        &self,
        id: &str,
        new_time: DateTime<Utc>,
    ) -> Result<ScheduledPost> {
        let post = self.get_post(id).await?;

        match post.status {
            PostStatus::Published => {
                return Err(OmnicastError::State(format!(
                    "Post {} is already published and cannot be rescheduled",
                    id
                )));
            }
            PostStatus::Publishing => {
                return Err(OmnicastError::State(format!(
                    "Post {} has a publish attempt in flight",
                    id
                )));
            }
            _ => {}
        }
        validate_schedule_time(new_time, Utc::now())?;

        let from = post.status;
        let mut updated = post;
        updated.scheduled_at = new_time;
        updated.status = PostStatus::Scheduled;
        if from == PostStatus::Failed {
            updated.metadata.retry_count = 0;
            updated.error = None;
        }

        if self.repo.compare_and_swap(from, &updated).await? {
            Ok(updated)
        } else {
            Err(OmnicastError::State(format!(
                "Post {} was claimed by a publish attempt",
                id
            )))
        }
    }

    /// Record engagement observed for a published post
    pub async fn record_engagement(
        &self,
        id: &str,
        engagement: EngagementMetrics,
    ) -> Result<ScheduledPost> {
        let post = self.get_post(id).await?;
        if post.status != PostStatus::Published {
            return Err(OmnicastError::State(format!(
                "Post {} is not published; engagement applies to published posts only",
                id
            )));
        }

        let mut updated = post;
        updated.engagement = Some(engagement);
        self.repo
            .compare_and_swap(PostStatus::Published, &updated)
            .await?;
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Executor-facing transitions
    // ------------------------------------------------------------------

    /// Claim a post for a publish attempt: CAS `Scheduled -> Publishing`.
    ///
    /// Returns `None` when another writer (a concurrent tick, a cancel, a
    /// reschedule) got there first. The `Publishing` status is the exclusive
    /// in-flight marker checked by `cancel_post` and `reschedule_post`.
    pub async fn claim_for_publish(&self, post: &ScheduledPost) -> Result<Option<ScheduledPost>> {
        let mut claimed = post.clone();
        claimed.status = PostStatus::Publishing;

        if self
            .repo
            .compare_and_swap(PostStatus::Scheduled, &claimed)
            .await?
        {
            Ok(Some(claimed))
        } else {
            Ok(None)
        }
    }

    /// Finish a successful attempt: `Publishing -> Published`
    pub async fn complete_publish(
        &self,
        post: &ScheduledPost,
        platform_post_id: String,
        now: DateTime<Utc>,
    ) -> Result<ScheduledPost> {
        let mut published = post.clone();
        published.status = PostStatus::Published;
        published.published_at = Some(now);
        published.platform_post_id = Some(platform_post_id);
        published.error = None;

        self.repo
            .compare_and_swap(PostStatus::Publishing, &published)
            .await?;
        Ok(published)
    }

    /// Requeue after a retryable failure: `Publishing -> Scheduled` at
    /// `next_attempt_at` with the error and retry count recorded
    pub async fn reschedule_retry(
        &self,
        post: &ScheduledPost,
        next_attempt_at: DateTime<Utc>,
        retry_count: u32,
        error: PostError,
    ) -> Result<ScheduledPost> {
        let mut retried = post.clone();
        retried.status = PostStatus::Scheduled;
        retried.scheduled_at = next_attempt_at;
        retried.metadata.retry_count = retry_count;
        retried.error = Some(error);

        self.repo
            .compare_and_swap(PostStatus::Publishing, &retried)
            .await?;
        Ok(retried)
    }

    /// Terminal failure: `Publishing -> Failed`, last error detail retained
    pub async fn fail_post(
        &self,
        post: &ScheduledPost,
        retry_count: u32,
        error: PostError,
    ) -> Result<ScheduledPost> {
        let mut failed = post.clone();
        failed.status = PostStatus::Failed;
        failed.metadata.retry_count = retry_count;
        failed.error = Some(error);

        self.repo
            .compare_and_swap(PostStatus::Publishing, &failed)
            .await?;
        Ok(failed)
    }

    /// Queue snapshot: counts plus the nearest upcoming and most recently
    /// published posts. This is the one place accumulated failures become
    /// observable.
    pub async fn queue_status(&self) -> Result<QueueStatus> {
        let all = self.repo.list(&PostFilter::default()).await?;
        let now = Utc::now();
        let hour_ahead = now + Duration::hours(1);

        let scheduled: Vec<&ScheduledPost> = all
            .iter()
            .filter(|p| p.status == PostStatus::Scheduled)
            .collect();
        let pending_within_hour = scheduled
            .iter()
            .filter(|p| p.scheduled_at <= hour_ahead)
            .count();
        let failed = all.iter().filter(|p| p.status == PostStatus::Failed).count();

        // `all` is ordered by scheduled_at ascending already
        let upcoming: Vec<ScheduledPost> = scheduled
            .iter()
            .filter(|p| p.scheduled_at >= now)
            .take(10)
            .map(|p| (*p).clone())
            .collect();

        let mut published: Vec<ScheduledPost> = all
            .iter()
            .filter(|p| p.status == PostStatus::Published)
            .cloned()
            .collect();
        published.sort_by_key(|p| std::cmp::Reverse(p.published_at));
        published.truncate(10);

        Ok(QueueStatus {
            total_posts: all.len(),
            scheduled: scheduled.len(),
            pending_within_hour,
            failed,
            upcoming,
            recent_published: published,
        })
    }
}

fn validate_schedule_time(scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
    if scheduled_at <= now {
        return Err(OmnicastError::Validation(
            "schedule time must be in the future".to_string(),
        ));
    }
    Ok(())
}

fn validate_content(content: &UniversalContent, platform: Platform) -> Result<()> {
    let limits = platform.limits();

    if content.body.chars().count() > limits.max_text {
        return Err(OmnicastError::Validation(format!(
            "Text exceeds {} limit of {} characters",
            platform, limits.max_text
        )));
    }
    if content.media.len() > limits.max_media {
        return Err(OmnicastError::Validation(format!(
            "Media count exceeds {} limit of {} items",
            platform, limits.max_media
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn future_request(platform: Platform, body: &str) -> SchedulePostRequest {
        SchedulePostRequest::new(
            platform,
            UniversalContent::text(body),
            Utc::now() + Duration::hours(1),
        )
    }

    #[tokio::test]
    async fn test_schedule_post_rejects_past_time() {
        let store = PostStore::in_memory();
        let request = SchedulePostRequest::new(
            Platform::Twitter,
            UniversalContent::text("late"),
            Utc::now() - Duration::minutes(1),
        );

        let err = store.schedule_post(request).await.unwrap_err();
        match err {
            OmnicastError::Validation(msg) => {
                assert_eq!(msg, "schedule time must be in the future")
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_schedule_post_rejects_now() {
        let store = PostStore::in_memory();
        let request = SchedulePostRequest::new(
            Platform::Twitter,
            UniversalContent::text("now"),
            Utc::now(),
        );
        assert!(store.schedule_post(request).await.is_err());
    }

    #[tokio::test]
    async fn test_schedule_post_rejects_oversized_text() {
        let store = PostStore::in_memory();
        let request = future_request(Platform::Twitter, &"x".repeat(300));

        let err = store.schedule_post(request).await.unwrap_err();
        match err {
            OmnicastError::Validation(msg) => {
                assert_eq!(msg, "Text exceeds twitter limit of 280 characters")
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_schedule_post_rejects_too_many_media() {
        let store = PostStore::in_memory();
        let mut request = future_request(Platform::Tiktok, "clip");
        request.content.media = vec!["a".to_string(), "b".to_string()];

        let err = store.schedule_post(request).await.unwrap_err();
        assert!(err.to_string().contains("Media count exceeds tiktok limit"));
    }

    #[tokio::test]
    async fn test_schedule_post_stores_metadata() {
        let store = PostStore::in_memory();
        let mut request = future_request(Platform::Linkedin, "announcement");
        request.campaign = Some("q3-launch".to_string());
        request.content_type = Some("article".to_string());

        let post = store.schedule_post(request).await.unwrap();
        let stored = store.get_post(&post.id).await.unwrap();
        assert_eq!(stored.metadata.campaign.as_deref(), Some("q3-launch"));
        assert_eq!(stored.metadata.content_type.as_deref(), Some("article"));
        assert_eq!(stored.status, PostStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_get_post_not_found() {
        let store = PostStore::in_memory();
        let err = store.get_post("missing").await.unwrap_err();
        assert!(matches!(err, OmnicastError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_calendar_spaces_posts() {
        let store = PostStore::in_memory();
        let start = Utc::now() + Duration::hours(1);

        let posts = store
            .create_calendar(
                Platform::Instagram,
                vec![
                    UniversalContent::text("one"),
                    UniversalContent::text("two"),
                    UniversalContent::text("three"),
                ],
                start,
                Duration::hours(24),
                Some("drip".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(posts.len(), 3);
        assert_eq!(posts[0].scheduled_at, start);
        assert_eq!(posts[1].scheduled_at, start + Duration::hours(24));
        assert_eq!(posts[2].scheduled_at, start + Duration::hours(48));
        assert!(posts.iter().all(|p| p.metadata.campaign.as_deref() == Some("drip")));
    }

    #[tokio::test]
    async fn test_create_calendar_validates_whole_batch_first() {
        let store = PostStore::in_memory();
        let start = Utc::now() + Duration::hours(1);

        let result = store
            .create_calendar(
                Platform::Twitter,
                vec![
                    UniversalContent::text("fine"),
                    UniversalContent::text("x".repeat(300)),
                ],
                start,
                Duration::hours(1),
                None,
            )
            .await;

        assert!(result.is_err());
        // Nothing from the batch was stored
        let all = store.get_posts(&PostFilter::default()).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_scheduled_post_demotes_to_draft() {
        let store = PostStore::in_memory();
        let post = store
            .schedule_post(future_request(Platform::Twitter, "cancel me"))
            .await
            .unwrap();

        let outcome = store.cancel_post(&post.id).await.unwrap();
        assert!(outcome.success);

        let stored = store.get_post(&post.id).await.unwrap();
        assert_eq!(stored.status, PostStatus::Draft);
    }

    #[tokio::test]
    async fn test_cancel_published_post_fails_without_mutation() {
        let store = PostStore::in_memory();
        let post = store
            .schedule_post(future_request(Platform::Twitter, "done"))
            .await
            .unwrap();

        let claimed = store.claim_for_publish(&post).await.unwrap().unwrap();
        let published = store
            .complete_publish(&claimed, "tw-1".to_string(), Utc::now())
            .await
            .unwrap();

        let outcome = store.cancel_post(&published.id).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("already published"));

        let stored = store.get_post(&published.id).await.unwrap();
        assert_eq!(stored.status, PostStatus::Published);
    }

    #[tokio::test]
    async fn test_cancel_respects_in_flight_marker() {
        let store = PostStore::in_memory();
        let post = store
            .schedule_post(future_request(Platform::Twitter, "racing"))
            .await
            .unwrap();

        store.claim_for_publish(&post).await.unwrap().unwrap();

        let outcome = store.cancel_post(&post.id).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("in flight"));
    }

    #[tokio::test]
    async fn test_reschedule_published_post_is_a_state_error() {
        let store = PostStore::in_memory();
        let post = store
            .schedule_post(future_request(Platform::Twitter, "done"))
            .await
            .unwrap();
        let claimed = store.claim_for_publish(&post).await.unwrap().unwrap();
        store
            .complete_publish(&claimed, "tw-1".to_string(), Utc::now())
            .await
            .unwrap();

        let err = store
            .reschedule_post(&post.id, Utc::now() + Duration::hours(2))
            .await
            .unwrap_err();
        assert!(matches!(err, OmnicastError::State(_)));
    }

    #[tokio::test]
    async fn test_reschedule_rejects_past_time() {
        let store = PostStore::in_memory();
        let post = store
            .schedule_post(future_request(Platform::Twitter, "move me"))
            .await
            .unwrap();

        let err = store
            .reschedule_post(&post.id, Utc::now() - Duration::minutes(5))
            .await
            .unwrap_err();
        assert!(matches!(err, OmnicastError::Validation(_)));
    }

    #[tokio::test]
    async fn test_reschedule_failed_post_resets_retry_budget() {
        let store = PostStore::in_memory();
        let post = store
            .schedule_post(future_request(Platform::Twitter, "flaky"))
            .await
            .unwrap();
        let claimed = store.claim_for_publish(&post).await.unwrap().unwrap();
        store
            .fail_post(
                &claimed,
                4,
                PostError {
                    message: "gone".to_string(),
                    code: "network".to_string(),
                    retryable: true,
                    at: Utc::now(),
                },
            )
            .await
            .unwrap();

        let new_time = Utc::now() + Duration::hours(3);
        let rescheduled = store.reschedule_post(&post.id, new_time).await.unwrap();
        assert_eq!(rescheduled.status, PostStatus::Scheduled);
        assert_eq!(rescheduled.metadata.retry_count, 0);
        assert!(rescheduled.error.is_none());
    }

    #[tokio::test]
    async fn test_claim_for_publish_only_wins_once() {
        let store = PostStore::in_memory();
        let post = store
            .schedule_post(future_request(Platform::Twitter, "contested"))
            .await
            .unwrap();

        assert!(store.claim_for_publish(&post).await.unwrap().is_some());
        assert!(store.claim_for_publish(&post).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_engagement_requires_published() {
        let store = PostStore::in_memory();
        let post = store
            .schedule_post(future_request(Platform::Twitter, "metrics"))
            .await
            .unwrap();

        let err = store
            .record_engagement(&post.id, EngagementMetrics::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OmnicastError::State(_)));
    }

    #[tokio::test]
    async fn test_queue_status_counts_and_windows() {
        let store = PostStore::in_memory();

        // Due soon (within the hour)
        store
            .schedule_post(SchedulePostRequest::new(
                Platform::Twitter,
                UniversalContent::text("soon"),
                Utc::now() + Duration::minutes(30),
            ))
            .await
            .unwrap();
        // Due later
        store
            .schedule_post(SchedulePostRequest::new(
                Platform::Twitter,
                UniversalContent::text("later"),
                Utc::now() + Duration::hours(5),
            ))
            .await
            .unwrap();
        // One published
        let done = store
            .schedule_post(future_request(Platform::Linkedin, "shipped"))
            .await
            .unwrap();
        let claimed = store.claim_for_publish(&done).await.unwrap().unwrap();
        store
            .complete_publish(&claimed, "li-1".to_string(), Utc::now())
            .await
            .unwrap();
        // One failed
        let bad = store
            .schedule_post(future_request(Platform::Tiktok, "broken"))
            .await
            .unwrap();
        let claimed = store.claim_for_publish(&bad).await.unwrap().unwrap();
        store
            .fail_post(
                &claimed,
                4,
                PostError {
                    message: "rejected".to_string(),
                    code: "validation".to_string(),
                    retryable: false,
                    at: Utc::now(),
                },
            )
            .await
            .unwrap();

        let status = store.queue_status().await.unwrap();
        assert_eq!(status.total_posts, 4);
        assert_eq!(status.scheduled, 2);
        assert_eq!(status.pending_within_hour, 1);
        assert_eq!(status.failed, 1);
        assert_eq!(status.upcoming.len(), 2);
        assert_eq!(status.upcoming[0].content.body, "soon");
        assert_eq!(status.recent_published.len(), 1);
    }
}
