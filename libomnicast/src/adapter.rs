//! Per-platform content adaptation
//!
//! Pure transformation of platform-agnostic content into content that fits a
//! single platform's constraints. No side effects, deterministic, and
//! idempotent: adapting already-adapted content yields the same result.

use crate::types::{AdaptedContent, Platform, UniversalContent};

const ELLIPSIS: &str = "...";

/// Adapt content to one platform's limits.
///
/// Title and body are truncated to the platform's text limit, with the tail
/// replaced by an ellipsis when truncation occurs. When `cross_promote`
/// names other platforms, a "follow me on" suffix is appended to the body
/// before the limit is applied, so the suffix itself can be truncated away
/// under tight limits. Hashtags and media are sliced to the platform's
/// maximum counts, original order preserved.
pub fn adapt(
    content: &UniversalContent,
    platform: Platform,
    cross_promote: &[Platform],
) -> AdaptedContent {
    let limits = platform.limits();

    let mut body = content.body.clone();
    let others: Vec<&str> = cross_promote
        .iter()
        .filter(|p| **p != platform)
        .map(|p| p.as_str())
        .collect();
    if !others.is_empty() {
        body.push_str(&format!("\n\nfollow me on: {}", others.join(", ")));
    }

    AdaptedContent {
        platform,
        title: truncate(&content.title, limits.max_text),
        body: truncate(&body, limits.max_text),
        hashtags: content
            .hashtags
            .iter()
            .take(limits.max_hashtags)
            .cloned()
            .collect(),
        media: content.media.iter().take(limits.max_media).cloned().collect(),
        link: content.link.clone(),
    }
}

/// Truncate to `max` characters, reserving three for the ellipsis.
///
/// Counts characters rather than bytes so multi-byte text never splits on a
/// UTF-8 boundary.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }

    let keep = max.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}
