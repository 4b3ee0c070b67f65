//! Integration tests for the publish executor and auto-publish loop
//!
//! Drives the per-post state machine with deterministic mock publishers and
//! explicit clock values.

use chrono::{Duration, Utc};
use libomnicast::autopublish::AutoPublishLoop;
use libomnicast::config::{AutoPublishConfig, NotificationConfig, RetryConfig};
use libomnicast::executor::{AttemptOutcome, PublishExecutor};
use libomnicast::notify::{NotifyOutcome, RecordingNotifier};
use libomnicast::platforms::mock::MockPublisher;
use libomnicast::platforms::PublisherRegistry;
use libomnicast::{
    Platform, PostStatus, PostStore, PublisherError, SchedulePostRequest, UniversalContent,
};
use std::sync::Arc;

fn test_config() -> AutoPublishConfig {
    AutoPublishConfig {
        enabled: true,
        check_interval: 1,
        retry: RetryConfig {
            max_retries: 3,
            retry_delay: 5,
            backoff_multiplier: 2.0,
        },
        notifications: NotificationConfig {
            on_success: true,
            on_failure: true,
            channels: vec![],
        },
        platforms: Platform::all().to_vec(),
    }
}

async fn schedule(
    store: &PostStore,
    platform: Platform,
    body: &str,
    offset: Duration,
) -> libomnicast::ScheduledPost {
    store
        .schedule_post(SchedulePostRequest::new(
            platform,
            UniversalContent::text(body),
            Utc::now() + offset,
        ))
        .await
        .unwrap()
}

fn executor_with(
    store: &PostStore,
    publisher: Arc<MockPublisher>,
    config: AutoPublishConfig,
) -> (PublishExecutor, Arc<RecordingNotifier>) {
    let mut registry = PublisherRegistry::new();
    registry.register(publisher);
    let notifier = Arc::new(RecordingNotifier::new());
    let executor =
        PublishExecutor::with_notifier(store.clone(), registry, config, notifier.clone());
    (executor, notifier)
}

#[tokio::test]
async fn test_tick_publishes_only_due_posts_oldest_first() {
    let store = PostStore::in_memory();
    let publisher = Arc::new(MockPublisher::succeeding(Platform::Twitter));
    let (executor, _) = executor_with(&store, publisher.clone(), test_config());

    let t = Utc::now();
    let first = schedule(&store, Platform::Twitter, "first", Duration::minutes(1)).await;
    let second = schedule(&store, Platform::Twitter, "second", Duration::minutes(10)).await;
    let third = schedule(&store, Platform::Twitter, "third", Duration::minutes(20)).await;

    // One tick fifteen minutes in: exactly the first two posts are due
    let tick_at = t + Duration::minutes(15);
    let due = store.due_posts(tick_at).await.unwrap();
    assert_eq!(due.len(), 2);
    assert_eq!(due[0].id, first.id);
    assert_eq!(due[1].id, second.id);

    for post in &due {
        let outcome = executor.attempt(post, tick_at).await.unwrap();
        assert!(matches!(outcome, AttemptOutcome::Published { .. }));
    }

    assert_eq!(
        store.get_post(&first.id).await.unwrap().status,
        PostStatus::Published
    );
    assert_eq!(
        store.get_post(&second.id).await.unwrap().status,
        PostStatus::Published
    );
    assert_eq!(
        store.get_post(&third.id).await.unwrap().status,
        PostStatus::Scheduled
    );

    // FIFO: the oldest due post reached the publisher first
    let published = publisher.published();
    assert_eq!(published[0].body, "first");
    assert_eq!(published[1].body, "second");
}

#[tokio::test]
async fn test_retry_backoff_five_ten_twenty_then_permanent_failure() {
    let store = PostStore::in_memory();
    let publisher = Arc::new(MockPublisher::failing(
        Platform::Twitter,
        PublisherError::Network("connection reset".to_string()),
    ));
    let (executor, notifier) = executor_with(&store, publisher.clone(), test_config());

    let post = schedule(&store, Platform::Twitter, "doomed", Duration::milliseconds(10)).await;
    let mut now = post.scheduled_at + Duration::seconds(1);

    // Three consecutive failures back off 5, 10, 20 minutes
    for expected_delay in [5i64, 10, 20] {
        let current = store.get_post(&post.id).await.unwrap();
        let outcome = executor.attempt(&current, now).await.unwrap();
        match outcome {
            AttemptOutcome::Rescheduled { next_attempt_at } => {
                assert_eq!(next_attempt_at - now, Duration::minutes(expected_delay));
                now = next_attempt_at;
            }
            other => panic!("Expected reschedule, got {:?}", other),
        }
    }

    // Budget exhausted: the fourth failure is terminal
    let current = store.get_post(&post.id).await.unwrap();
    assert_eq!(current.metadata.retry_count, 3);
    let outcome = executor.attempt(&current, now).await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Failed);

    let failed = store.get_post(&post.id).await.unwrap();
    assert_eq!(failed.status, PostStatus::Failed);
    assert_eq!(failed.metadata.retry_count, 3);
    let error = failed.error.expect("terminal failure retains its error");
    assert!(error.message.contains("connection reset"));
    assert_eq!(error.code, "network");

    // No further retry is scheduled and the post stays failed
    assert!(store.due_posts(now + Duration::hours(10)).await.unwrap().is_empty());

    // The failure notification fired exactly once, not once per attempt
    assert_eq!(notifier.count_for(NotifyOutcome::Exhausted), 1);
    assert_eq!(notifier.count_for(NotifyOutcome::Published), 0);
}

#[tokio::test]
async fn test_non_retryable_error_fails_immediately() {
    let store = PostStore::in_memory();
    let publisher = Arc::new(MockPublisher::failing(
        Platform::Twitter,
        PublisherError::Validation("media type rejected".to_string()),
    ));
    let (executor, notifier) = executor_with(&store, publisher.clone(), test_config());

    let post = schedule(&store, Platform::Twitter, "rejected", Duration::milliseconds(10)).await;
    let now = post.scheduled_at + Duration::seconds(1);

    let outcome = executor.attempt(&post, now).await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Failed);
    assert_eq!(publisher.call_count(), 1);

    let failed = store.get_post(&post.id).await.unwrap();
    assert_eq!(failed.status, PostStatus::Failed);
    assert_eq!(failed.metadata.retry_count, 0);
    assert!(!failed.error.unwrap().retryable);
    assert_eq!(notifier.count_for(NotifyOutcome::Exhausted), 1);
}

#[tokio::test]
async fn test_success_notification_fires_once() {
    let store = PostStore::in_memory();
    let publisher = Arc::new(MockPublisher::succeeding(Platform::Linkedin));
    let (executor, notifier) = executor_with(&store, publisher, test_config());

    let post = schedule(&store, Platform::Linkedin, "good news", Duration::milliseconds(10)).await;
    let now = post.scheduled_at + Duration::seconds(1);

    let outcome = executor.attempt(&post, now).await.unwrap();
    assert!(matches!(outcome, AttemptOutcome::Published { .. }));

    let published = store.get_post(&post.id).await.unwrap();
    assert_eq!(published.status, PostStatus::Published);
    assert_eq!(published.published_at, Some(now));
    assert!(published.platform_post_id.is_some());

    assert_eq!(notifier.count_for(NotifyOutcome::Published), 1);
}

#[tokio::test]
async fn test_success_notification_suppressed_when_disabled() {
    let store = PostStore::in_memory();
    let publisher = Arc::new(MockPublisher::succeeding(Platform::Linkedin));
    let mut config = test_config();
    config.notifications.on_success = false;
    let (executor, notifier) = executor_with(&store, publisher, config);

    let post = schedule(&store, Platform::Linkedin, "quiet", Duration::milliseconds(10)).await;
    executor
        .attempt(&post, post.scheduled_at + Duration::seconds(1))
        .await
        .unwrap();

    assert!(notifier.notifications().is_empty());
}

#[tokio::test]
async fn test_claimed_post_is_never_dispatched_twice() {
    let store = PostStore::in_memory();
    let publisher = Arc::new(MockPublisher::succeeding(Platform::Twitter));
    let (executor, _) = executor_with(&store, publisher.clone(), test_config());

    let post = schedule(&store, Platform::Twitter, "once only", Duration::milliseconds(10)).await;
    let now = post.scheduled_at + Duration::seconds(1);

    // Another writer holds the in-flight claim
    store.claim_for_publish(&post).await.unwrap().unwrap();

    // The executor sees a stale snapshot but loses the CAS and backs off
    let outcome = executor.attempt(&post, now).await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Skipped);
    assert_eq!(publisher.call_count(), 0);
}

#[tokio::test]
async fn test_inactive_platform_left_queued() {
    let store = PostStore::in_memory();
    let publisher = Arc::new(MockPublisher::succeeding(Platform::Tiktok));
    let mut config = test_config();
    config.platforms = vec![Platform::Twitter];
    let (executor, _) = executor_with(&store, publisher.clone(), config);

    let post = schedule(&store, Platform::Tiktok, "inactive", Duration::milliseconds(10)).await;
    let outcome = executor
        .attempt(&post, post.scheduled_at + Duration::seconds(1))
        .await
        .unwrap();

    assert_eq!(outcome, AttemptOutcome::Skipped);
    assert_eq!(publisher.call_count(), 0);
    assert_eq!(
        store.get_post(&post.id).await.unwrap().status,
        PostStatus::Scheduled
    );
}

#[tokio::test]
async fn test_missing_publisher_is_a_permanent_failure() {
    let store = PostStore::in_memory();
    let notifier = Arc::new(RecordingNotifier::new());
    let executor = PublishExecutor::with_notifier(
        store.clone(),
        PublisherRegistry::new(),
        test_config(),
        notifier.clone(),
    );

    let post = schedule(&store, Platform::Pinterest, "orphan", Duration::milliseconds(10)).await;
    let outcome = executor
        .attempt(&post, post.scheduled_at + Duration::seconds(1))
        .await
        .unwrap();

    assert_eq!(outcome, AttemptOutcome::Failed);
    let failed = store.get_post(&post.id).await.unwrap();
    assert_eq!(failed.error.unwrap().code, "no_publisher");
    assert_eq!(notifier.count_for(NotifyOutcome::Exhausted), 1);
}

#[tokio::test]
async fn test_loop_runs_immediate_scan_on_start() {
    let store = PostStore::in_memory();
    let publisher = Arc::new(MockPublisher::succeeding(Platform::Twitter));
    let (executor, _) = executor_with(&store, publisher.clone(), test_config());

    let post = schedule(&store, Platform::Twitter, "startup", Duration::milliseconds(5)).await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let publish_loop = AutoPublishLoop::new(store.clone(), executor, test_config());
    publish_loop.start().await;

    // The initial scan runs synchronously with start, before any timer tick
    assert_eq!(
        store.get_post(&post.id).await.unwrap().status,
        PostStatus::Published
    );
    assert!(publish_loop.is_running());

    publish_loop.stop();
    assert!(!publish_loop.is_running());
    // Stopping again is a no-op
    publish_loop.stop();
}

#[tokio::test]
async fn test_loop_start_replaces_previous_timer() {
    let store = PostStore::in_memory();
    let publisher = Arc::new(MockPublisher::succeeding(Platform::Twitter));
    let (executor, _) = executor_with(&store, publisher, test_config());

    let publish_loop = AutoPublishLoop::new(store, executor, test_config());
    publish_loop.start().await;
    assert!(publish_loop.is_running());

    // Restarting while running swaps in a fresh timer
    publish_loop.start().await;
    assert!(publish_loop.is_running());

    publish_loop.stop();
}

#[tokio::test]
async fn test_loop_respects_disabled_config() {
    let store = PostStore::in_memory();
    let publisher = Arc::new(MockPublisher::succeeding(Platform::Twitter));
    let mut config = test_config();
    config.enabled = false;
    let (executor, _) = executor_with(&store, publisher, config.clone());

    let publish_loop = AutoPublishLoop::new(store, executor, config);
    publish_loop.start().await;
    assert!(!publish_loop.is_running());
}
