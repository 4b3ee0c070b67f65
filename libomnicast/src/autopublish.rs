//! Auto-publish loop
//!
//! Periodic task that scans the queue for due posts and drives each through
//! the executor, oldest due time first. One logical scheduler task: a tick
//! runs to completion, and a tick that would overlap a still-running one is
//! skipped rather than queued so backlog stays bounded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::AutoPublishConfig;
use crate::executor::PublishExecutor;
use crate::store::PostStore;

pub struct AutoPublishLoop {
    inner: Arc<LoopInner>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

struct LoopInner {
    store: PostStore,
    executor: PublishExecutor,
    config: AutoPublishConfig,
    ticking: AtomicBool,
}

impl AutoPublishLoop {
    pub fn new(store: PostStore, executor: PublishExecutor, config: AutoPublishConfig) -> Self {
        Self {
            inner: Arc::new(LoopInner {
                store,
                executor,
                config,
                ticking: AtomicBool::new(false),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Start the periodic scan.
    ///
    /// Runs one immediate scan before the first timer tick, so due posts do
    /// not wait a full interval after startup (posts left past-due by a
    /// previous run become eligible right away). Starting while already
    /// running replaces the previous timer.
    pub async fn start(&self) {
        if !self.inner.config.enabled {
            warn!("Auto-publish is disabled in configuration; not starting");
            return;
        }

        self.stop();

        info!(
            check_interval_minutes = self.inner.config.check_interval,
            "Auto-publish loop starting"
        );

        // Initial scan, synchronous with start
        self.inner.run_tick().await;

        let inner = Arc::clone(&self.inner);
        let period = Duration::from_secs(inner.config.check_interval * 60);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first interval tick completes immediately; the initial
            // scan already covered it
            interval.tick().await;
            loop {
                interval.tick().await;
                inner.run_tick().await;
            }
        });

        *self.handle.lock().unwrap() = Some(task);
    }

    /// Stop the periodic scan; a no-op when not running
    pub fn stop(&self) {
        if let Some(task) = self.handle.lock().unwrap().take() {
            task.abort();
            info!("Auto-publish loop stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap()
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }

    /// Run a single scan outside the timer (used by `omni-send --once` and
    /// by tests)
    pub async fn tick(&self) {
        self.inner.run_tick().await;
    }
}

impl Drop for AutoPublishLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

impl LoopInner {
    /// One scan over the due set. Never panics or returns an error: publish
    /// failures are recorded on their posts, storage failures are logged.
    async fn run_tick(&self) {
        // Re-entrancy guard: skip if the previous tick is still running
        if self.ticking.swap(true, Ordering::SeqCst) {
            warn!("Previous scan still running, skipping this tick");
            return;
        }

        let now = chrono::Utc::now();
        match self.store.due_posts(now).await {
            Ok(due) => {
                if !due.is_empty() {
                    info!("Found {} post(s) due for publishing", due.len());
                }
                // Oldest due time first, sequentially; ordering and platform
                // rate limits stay deterministic
                for post in due {
                    debug!(post_id = %post.id, "Processing due post");
                    if let Err(e) = self.executor.attempt(&post, now).await {
                        error!(post_id = %post.id, "Storage error during publish attempt: {}", e);
                    }
                }
            }
            Err(e) => error!("Failed to query due posts: {}", e),
        }

        self.ticking.store(false, Ordering::SeqCst);
    }
}
