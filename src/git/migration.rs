//! Migration records: commits already reconciled with an older task scheme.
//!
//! Each feature may carry a `.migration-info` file, either JSON
//!
//! ```json
//! { "migrated_commits": ["abc1234...", "def5678..."] }
//! ```
//!
//! or the legacy text form:
//!
//! ```text
//! Commits:
//! - abc1234: original message
//! - def5678: another message
//! ```
//!
//! with a single `Migrated from commit: abc1234` line also accepted.

use std::collections::HashSet;
use std::path::Path;

use crate::feature::Workspace;

/// File name of a feature's migration record.
pub const MIGRATION_FILE: &str = ".migration-info";

const SHORT_HASH_LEN: usize = 7;

/// Commit hashes excluded from untracked-commit reports.
///
/// Every hash is stored lowercased in both full and seven-character form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationLedger {
    hashes: HashSet<String>,
}

impl MigrationLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the migration records of every feature in the workspace.
    ///
    /// Unreadable records are skipped.
    #[must_use]
    pub fn from_workspace(workspace: &Workspace) -> Self {
        let mut ledger = Self::new();
        for feature in workspace.features() {
            ledger.load_file(&feature.path.join(MIGRATION_FILE));
        }
        ledger
    }

    /// Add the hashes from one record file, if it exists.
    pub fn load_file(&mut self, path: &Path) {
        if !path.is_file() {
            return;
        }
        match std::fs::read_to_string(path) {
            Ok(content) => {
                for hash in parse_record(&content) {
                    self.insert(&hash);
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable migration record");
            }
        }
    }

    pub fn insert(&mut self, hash: &str) {
        let hash = hash.trim().to_lowercase();
        if hash.is_empty() {
            return;
        }
        self.hashes.insert(short(&hash));
        self.hashes.insert(hash);
    }

    /// Whether `hash` (full or abbreviated) was recorded.
    #[must_use]
    pub fn contains(&self, hash: &str) -> bool {
        let hash = hash.to_lowercase();
        self.hashes.contains(&hash) || self.hashes.contains(&short(&hash))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

fn short(hash: &str) -> String {
    hash.chars().take(SHORT_HASH_LEN).collect()
}

/// Hashes listed by a migration record, in either form.
///
/// A JSON document without `migrated_commits` lists nothing.
#[must_use]
pub fn parse_record(content: &str) -> Vec<String> {
    match serde_json::from_str::<serde_json::Value>(content) {
        Ok(value) => value
            .get("migrated_commits")
            .and_then(|list| list.as_array())
            .map(|list| {
                list.iter()
                    .filter_map(|hash| hash.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        Err(_) => parse_legacy_record(content),
    }
}

fn parse_legacy_record(content: &str) -> Vec<String> {
    let mut hashes = Vec::new();
    let mut in_commits = false;

    for line in content.lines().map(str::trim) {
        if line.eq_ignore_ascii_case("commits:") {
            in_commits = true;
            continue;
        }

        if in_commits && line.starts_with("- ") {
            let hash = line[2..].split(':').next().unwrap_or_default().trim();
            if hash.len() >= SHORT_HASH_LEN {
                hashes.push(hash.to_string());
            }
        } else if line.to_lowercase().contains("migrated from commit") && line.contains(':') {
            let hash = line.rsplit(':').next().unwrap_or_default().trim();
            if !hash.is_empty() {
                hashes.push(hash.to_string());
            }
        }
    }
    hashes
}
