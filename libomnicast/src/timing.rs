//! Posting-time optimization
//!
//! Analyzes engagement on historical published posts, bucketed by weekday
//! and hour of day, and recommends future schedule slots.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use std::collections::HashMap;
use tracing::warn;

use crate::error::Result;
use crate::repo::PostFilter;
use crate::store::PostStore;
use crate::types::{Platform, PostStatus, ScheduledPost};

/// Historical sample count below which recommendations are flagged
const MIN_SAMPLE_SIZE: usize = 10;

/// One recommended posting slot
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSlot {
    pub weekday: Weekday,
    pub hour: u32,
    /// Mean of the day and hour bucket scores
    pub expected_engagement: f64,
    /// Confidence in percent, clamped to [60, 95]
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct TimingReport {
    pub platform: Platform,
    /// Weekdays ranked by mean engagement rate, best first
    pub best_days: Vec<(Weekday, f64)>,
    /// Hours of day ranked by mean engagement rate, best first
    pub best_hours: Vec<(u32, f64)>,
    /// Top-3 days crossed with top-2 hours
    pub optimal_schedule: Vec<ScheduleSlot>,
    pub sample_size: usize,
    /// Set when fewer than 10 historical posts back the recommendation
    pub low_confidence: bool,
}

pub struct TimingOptimizer {
    store: PostStore,
}

impl TimingOptimizer {
    pub fn new(store: PostStore) -> Self {
        Self { store }
    }

    /// Recommend posting times for a platform from the trailing
    /// `days_back` window of published posts with recorded engagement.
    ///
    /// Always produces a report; thin history is flagged low-confidence
    /// rather than failing.
    pub async fn optimize(&self, platform: Platform, days_back: i64) -> Result<TimingReport> {
        let since = Utc::now() - Duration::days(days_back);
        let published = self
            .store
            .get_posts(&PostFilter {
                platform: Some(platform),
                status: Some(PostStatus::Published),
                ..Default::default()
            })
            .await?;

        let samples: Vec<(DateTime<Utc>, f64)> = published
            .iter()
            .filter_map(|post| sample_of(post, since))
            .collect();

        if samples.len() < MIN_SAMPLE_SIZE {
            warn!(
                platform = %platform,
                samples = samples.len(),
                "Fewer than {} historical posts; recommendation is low-confidence",
                MIN_SAMPLE_SIZE
            );
        }

        let mut day_buckets: HashMap<Weekday, Vec<f64>> = HashMap::new();
        let mut hour_buckets: HashMap<u32, Vec<f64>> = HashMap::new();
        for (at, rate) in &samples {
            day_buckets.entry(at.weekday()).or_default().push(*rate);
            hour_buckets.entry(at.hour()).or_default().push(*rate);
        }

        let best_days = ranked(&day_buckets);
        let best_hours = ranked(&hour_buckets);

        let mut optimal_schedule = Vec::new();
        for (weekday, day_score) in best_days.iter().take(3) {
            for (hour, hour_score) in best_hours.iter().take(2) {
                let day_samples = day_buckets.get(weekday).map(Vec::len).unwrap_or(0);
                let hour_samples = hour_buckets.get(hour).map(Vec::len).unwrap_or(0);
                optimal_schedule.push(ScheduleSlot {
                    weekday: *weekday,
                    hour: *hour,
                    expected_engagement: (day_score + hour_score) / 2.0,
                    confidence: confidence(day_samples + hour_samples),
                });
            }
        }

        Ok(TimingReport {
            platform,
            best_days,
            best_hours,
            optimal_schedule,
            sample_size: samples.len(),
            low_confidence: samples.len() < MIN_SAMPLE_SIZE,
        })
    }
}

/// Engagement sample for a post published inside the window
fn sample_of(post: &ScheduledPost, since: DateTime<Utc>) -> Option<(DateTime<Utc>, f64)> {
    let published_at = post.published_at?;
    if published_at < since {
        return None;
    }
    let engagement = post.engagement?;
    Some((published_at, engagement.rate()))
}

/// Bucket means ranked descending
fn ranked<K: Copy>(buckets: &HashMap<K, Vec<f64>>) -> Vec<(K, f64)> {
    let mut means: Vec<(K, f64)> = buckets
        .iter()
        .map(|(k, rates)| (*k, rates.iter().sum::<f64>() / rates.len() as f64))
        .collect();
    means.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    means
}

/// Confidence grows with the combined bucket sample count, clamped to
/// [60, 95] percent
fn confidence(combined_samples: usize) -> f64 {
    (60.0 + combined_samples as f64 * 4.0).clamp(60.0, 95.0)
}
