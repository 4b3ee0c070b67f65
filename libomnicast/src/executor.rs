//! Publish executor
//!
//! Drives one post through a single publish attempt:
//! `Scheduled -> Publishing -> {Published | Scheduled(retry) | Failed}`.
//!
//! The `Publishing` claim is taken with a compare-and-set before the
//! external publisher is called, so a slow network call overlapping the next
//! tick can never double-post, and a concurrent cancel/reschedule sees the
//! in-flight marker. Publish failures are captured here and recorded on the
//! post; they never propagate out of a tick.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::adapter;
use crate::config::AutoPublishConfig;
use crate::error::{OmnicastError, Result};
use crate::notify::{LogNotifier, Notification, Notifier, NotifyOutcome};
use crate::platforms::PublisherRegistry;
use crate::retry;
use crate::store::PostStore;
use crate::types::{PostError, PostStatus, ScheduledPost};

/// What happened to a post in one attempt
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// Publisher accepted the post
    Published { platform_post_id: String },
    /// Retryable failure; the post is back on the queue
    Rescheduled { next_attempt_at: DateTime<Utc> },
    /// Permanent failure; retry budget exhausted or error not retryable
    Failed,
    /// Not eligible, platform inactive, or the claim was lost to another
    /// writer
    Skipped,
}

pub struct PublishExecutor {
    store: PostStore,
    publishers: PublisherRegistry,
    config: AutoPublishConfig,
    notifier: Arc<dyn Notifier>,
}

impl PublishExecutor {
    pub fn new(store: PostStore, publishers: PublisherRegistry, config: AutoPublishConfig) -> Self {
        Self::with_notifier(store, publishers, config, Arc::new(LogNotifier))
    }

    pub fn with_notifier(
        store: PostStore,
        publishers: PublisherRegistry,
        config: AutoPublishConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            publishers,
            config,
            notifier,
        }
    }

    /// Attempt to publish one post.
    ///
    /// # Errors
    ///
    /// Only storage failures surface as errors; publish failures are
    /// recorded on the post and reported through the outcome.
    pub async fn attempt(&self, post: &ScheduledPost, now: DateTime<Utc>) -> Result<AttemptOutcome> {
        if post.status != PostStatus::Scheduled || post.scheduled_at > now {
            return Ok(AttemptOutcome::Skipped);
        }
        if !self.config.is_enabled(post.platform) {
            debug!(post_id = %post.id, platform = %post.platform, "Platform not active, leaving post queued");
            return Ok(AttemptOutcome::Skipped);
        }

        let Some(claimed) = self.store.claim_for_publish(post).await? else {
            debug!(post_id = %post.id, "Lost publish claim to another writer");
            return Ok(AttemptOutcome::Skipped);
        };

        let Some(publisher) = self.publishers.get(claimed.platform) else {
            // No client wired up for this platform; permanent, not a retry case
            let error = PostError {
                message: format!("No publisher registered for {}", claimed.platform),
                code: "no_publisher".to_string(),
                retryable: false,
                at: now,
            };
            return self.finish_failed(&claimed, claimed.metadata.retry_count, error).await;
        };

        let adapted = adapter::adapt(&claimed.content, claimed.platform, &[]);

        match publisher.publish(&adapted).await {
            Ok(platform_post_id) => {
                let published = self
                    .store
                    .complete_publish(&claimed, platform_post_id.clone(), now)
                    .await?;
                info!(
                    post_id = %published.id,
                    platform = %published.platform,
                    platform_post_id = %platform_post_id,
                    "Post published"
                );

                if self.config.notifications.on_success {
                    self.notifier.notify(
                        &self.config.notifications.channels,
                        &Notification {
                            post_id: published.id.clone(),
                            platform: published.platform,
                            outcome: NotifyOutcome::Published,
                            detail: platform_post_id.clone(),
                        },
                    );
                }

                Ok(AttemptOutcome::Published { platform_post_id })
            }
            Err(e) => self.handle_failure(&claimed, e, now).await,
        }
    }

    async fn handle_failure(
        &self,
        claimed: &ScheduledPost,
        error: OmnicastError,
        now: DateTime<Utc>,
    ) -> Result<AttemptOutcome> {
        let (retryable, code) = match &error {
            OmnicastError::Publish(publisher_error) => {
                (publisher_error.retryable(), publisher_error.code())
            }
            _ => (false, "internal"),
        };

        let attempt = claimed.metadata.retry_count + 1;
        let post_error = PostError {
            message: error.to_string(),
            code: code.to_string(),
            retryable,
            at: now,
        };

        if retryable && retry::should_retry(attempt, self.config.retry.max_retries) {
            let delay = retry::next_delay(
                attempt,
                self.config.retry.retry_delay,
                self.config.retry.backoff_multiplier,
            );
            let next_attempt_at = now + delay;

            self.store
                .reschedule_retry(claimed, next_attempt_at, attempt, post_error)
                .await?;
            warn!(
                post_id = %claimed.id,
                platform = %claimed.platform,
                attempt,
                retry_in_minutes = delay.num_minutes(),
                "Publish failed, retry scheduled: {}",
                error
            );
            Ok(AttemptOutcome::Rescheduled { next_attempt_at })
        } else {
            // The recorded retry count stays within the configured budget
            self.finish_failed(claimed, claimed.metadata.retry_count, post_error)
                .await
        }
    }

    /// Terminal failure path; fires the failure notification exactly once
    /// per exhaustion event.
    async fn finish_failed(
        &self,
        claimed: &ScheduledPost,
        retry_count: u32,
        error: PostError,
    ) -> Result<AttemptOutcome> {
        let failed = self.store.fail_post(claimed, retry_count, error).await?;
        warn!(
            post_id = %failed.id,
            platform = %failed.platform,
            "Post permanently failed: {}",
            failed.error.as_ref().map(|e| e.message.as_str()).unwrap_or("unknown")
        );

        if self.config.notifications.on_failure {
            self.notifier.notify(
                &self.config.notifications.channels,
                &Notification {
                    post_id: failed.id.clone(),
                    platform: failed.platform,
                    outcome: NotifyOutcome::Exhausted,
                    detail: failed
                        .error
                        .as_ref()
                        .map(|e| e.message.clone())
                        .unwrap_or_default(),
                },
            );
        }

        Ok(AttemptOutcome::Failed)
    }
}
