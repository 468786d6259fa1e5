//! Review decisions recorded in a task's activity log.
//!
//! ```text
//! ## Activity Log
//!
//! - 2024-01-01T10:00:00Z: [REVIEW] CHANGES REQUESTED by alice
//!   - ❌ Missing tests for empty input
//!   - ✅ Clear module layout
//!   - Next steps: add tests and resubmit
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static REVIEW_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^- (.+?):\s*\[REVIEW\]\s+(APPROVED|CHANGES REQUESTED)\s+by\s+(.+?)$")
        .expect("review line pattern")
});

/// Headings that open the activity log, by locale.
const ACTIVITY_LOG_HEADINGS: [&str; 3] = ["## Activity Log", "## 활동 로그", "## 작업 이력"];

const ISSUE_MARK: &str = "❌";
const POSITIVE_MARK: &str = "✅";
const NEXT_STEPS_PREFIX: &str = "Next steps:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewDecision {
    #[serde(rename = "APPROVED")]
    Approved,
    #[serde(rename = "CHANGES REQUESTED")]
    ChangesRequested,
}

impl ReviewDecision {
    fn from_log(text: &str) -> Self {
        if text == "APPROVED" {
            Self::Approved
        } else {
            Self::ChangesRequested
        }
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => f.write_str("APPROVED"),
            Self::ChangesRequested => f.write_str("CHANGES REQUESTED"),
        }
    }
}

/// One `[REVIEW]` entry and the bullets that follow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEntry {
    /// Timestamp as written in the log.
    pub timestamp: String,
    pub decision: ReviewDecision,
    pub reviewer: String,
    pub issues: Vec<String>,
    pub positives: Vec<String>,
    pub notes: Vec<String>,
}

impl ReviewEntry {
    fn new(timestamp: &str, decision: ReviewDecision, reviewer: &str) -> Self {
        Self {
            timestamp: timestamp.trim().to_string(),
            decision,
            reviewer: reviewer.trim().to_string(),
            issues: Vec::new(),
            positives: Vec::new(),
            notes: Vec::new(),
        }
    }

    fn add_item(&mut self, item: &str) {
        if let Some(issue) = item.strip_prefix(ISSUE_MARK) {
            self.issues.push(issue.trim().to_string());
        } else if let Some(positive) = item.strip_prefix(POSITIVE_MARK) {
            self.positives.push(positive.trim().to_string());
        } else if let Some(next) = item.strip_prefix(NEXT_STEPS_PREFIX) {
            self.notes.push(next.trim().to_string());
        } else {
            self.notes.push(item.to_string());
        }
    }
}

/// Extract review entries from task content, in log order.
///
/// Only the first activity log section is read; it ends at the next
/// second-level heading. Bullets before the first review line are ignored.
///
/// # Example
///
/// ```
/// use specboard::review::{parse_reviews, ReviewDecision};
///
/// let content = "## Activity Log\n- 2024-01-01: [REVIEW] APPROVED by alice\n  - ✅ Tests pass\n";
/// let reviews = parse_reviews(content);
/// assert_eq!(reviews[0].decision, ReviewDecision::Approved);
/// assert_eq!(reviews[0].positives, vec!["Tests pass"]);
/// ```
#[must_use]
pub fn parse_reviews(content: &str) -> Vec<ReviewEntry> {
    let mut reviews = Vec::new();
    let mut current: Option<ReviewEntry> = None;
    let mut in_log = false;

    for line in content.lines().map(str::trim) {
        if ACTIVITY_LOG_HEADINGS.iter().any(|h| line.starts_with(h)) {
            in_log = true;
            continue;
        }
        if !in_log {
            continue;
        }
        if line.starts_with("## ") {
            break;
        }

        if let Some(caps) = REVIEW_LINE_RE.captures(line) {
            reviews.extend(current.take());
            current = Some(ReviewEntry::new(
                &caps[1],
                ReviewDecision::from_log(&caps[2]),
                &caps[3],
            ));
            continue;
        }

        if let (Some(entry), Some(item)) = (current.as_mut(), line.strip_prefix("- ")) {
            entry.add_item(item.trim());
        }
    }

    reviews.extend(current);
    reviews
}
