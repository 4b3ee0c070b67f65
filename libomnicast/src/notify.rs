//! Outcome notifications for the auto-publish loop
//!
//! The executor emits one notification per terminal publish outcome. The
//! `Notifier` trait is the delivery seam; the default implementation logs
//! through `tracing`, and tests use `RecordingNotifier` to assert on
//! exactly-once delivery.

use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::config::NotifyChannel;
use crate::types::Platform;

/// Terminal outcome of a publish attempt worth notifying about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Post published successfully
    Published,
    /// Retry budget exhausted or permanent error; the post is failed
    Exhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub post_id: String,
    pub platform: Platform,
    pub outcome: NotifyOutcome,
    pub detail: String,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, channels: &[NotifyChannel], notification: &Notification);
}

/// Default notifier: structured log lines, one per configured channel
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, channels: &[NotifyChannel], notification: &Notification) {
        let channel_list = if channels.is_empty() {
            "log".to_string()
        } else {
            channels
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };

        match notification.outcome {
            NotifyOutcome::Published => info!(
                post_id = %notification.post_id,
                platform = %notification.platform,
                channels = %channel_list,
                "Post published: {}",
                notification.detail
            ),
            NotifyOutcome::Exhausted => warn!(
                post_id = %notification.post_id,
                platform = %notification.platform,
                channels = %channel_list,
                "Post failed permanently: {}",
                notification.detail
            ),
        }
    }
}

/// Captures notifications for test assertions
#[derive(Default)]
pub struct RecordingNotifier {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn count_for(&self, outcome: NotifyOutcome) -> usize {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.outcome == outcome)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, _channels: &[NotifyChannel], notification: &Notification) {
        self.notifications.lock().unwrap().push(notification.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier_captures_in_order() {
        let notifier = RecordingNotifier::new();

        notifier.notify(
            &[NotifyChannel::Slack],
            &Notification {
                post_id: "p-1".to_string(),
                platform: Platform::Twitter,
                outcome: NotifyOutcome::Published,
                detail: "tw-1".to_string(),
            },
        );
        notifier.notify(
            &[],
            &Notification {
                post_id: "p-2".to_string(),
                platform: Platform::Tiktok,
                outcome: NotifyOutcome::Exhausted,
                detail: "network error".to_string(),
            },
        );

        let seen = notifier.notifications();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].post_id, "p-1");
        assert_eq!(seen[1].outcome, NotifyOutcome::Exhausted);
        assert_eq!(notifier.count_for(NotifyOutcome::Published), 1);
        assert_eq!(notifier.count_for(NotifyOutcome::Exhausted), 1);
    }
}
