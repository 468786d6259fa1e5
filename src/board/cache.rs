//! In-memory board cache.
//!
//! Entries are keyed by feature root and validated against a fingerprint of
//! the task artifacts, so an external edit is picked up on the next read even
//! without an explicit invalidation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use super::format::{has_lane_dirs, tasks_dir, tasks_file};
use super::parsing::{lane_files, parse_board};
use super::{Board, Lane};

#[derive(Debug, Clone)]
struct CacheEntry {
    fingerprint: String,
    board: Board,
}

/// Parsed boards keyed by feature root.
#[derive(Debug, Default)]
pub struct BoardCache {
    entries: HashMap<PathBuf, CacheEntry>,
    hits: u64,
    misses: u64,
}

impl BoardCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached board for `feature_root`, reparsing when the
    /// artifacts changed since it was stored.
    pub fn get_or_parse(&mut self, feature_root: &Path) -> Board {
        let fingerprint = fingerprint(feature_root);

        if let Some(entry) = self.entries.get(feature_root) {
            if entry.fingerprint == fingerprint {
                self.hits += 1;
                tracing::debug!(feature = %feature_root.display(), "board cache hit");
                return entry.board.clone();
            }
        }

        self.misses += 1;
        let board = parse_board(feature_root);
        self.entries.insert(
            feature_root.to_path_buf(),
            CacheEntry {
                fingerprint,
                board: board.clone(),
            },
        );
        board
    }

    /// Drop the entry for one feature.
    pub fn invalidate(&mut self, feature_root: &Path) {
        if self.entries.remove(feature_root).is_some() {
            tracing::debug!(feature = %feature_root.display(), "board cache invalidated");
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation.
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

/// md5 over `tasks.md` content, or over the names, sizes and modification
/// times of every lane file for directory boards.
#[must_use]
pub fn fingerprint(feature_root: &Path) -> String {
    let mut material = String::new();

    if has_lane_dirs(feature_root) {
        let dir = tasks_dir(feature_root);
        for lane in Lane::ALL {
            for file in lane_files(&dir.join(lane.as_str())) {
                let (size, mtime) = std::fs::metadata(&file)
                    .map(|meta| {
                        let mtime = meta
                            .modified()
                            .ok()
                            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                            .map_or(0, |d| d.as_nanos());
                        (meta.len(), mtime)
                    })
                    .unwrap_or((0, 0));
                material.push_str(&format!("{lane}/{}:{size}:{mtime}\n", file.display()));
            }
        }
    } else if let Ok(content) = std::fs::read_to_string(tasks_file(feature_root)) {
        material.push_str("tasks.md\n");
        material.push_str(&content);
    }

    format!("{:x}", md5::compute(material.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_hit_until_content_changes() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("tasks.md");
        std::fs::write(&file, "- [ ] T001 a\n").unwrap();

        let mut cache = BoardCache::new();
        assert_eq!(cache.get_or_parse(temp.path()).total_tasks(), 1);
        assert_eq!(cache.get_or_parse(temp.path()).total_tasks(), 1);
        assert_eq!(cache.stats(), (1, 1));

        std::fs::write(&file, "- [ ] T001 a\n- [x] T002 b\n").unwrap();
        assert_eq!(cache.get_or_parse(temp.path()).total_tasks(), 2);
        assert_eq!(cache.stats(), (1, 2));
    }

    #[test]
    fn test_fingerprint_tracks_lane_moves() {
        let temp = TempDir::new().unwrap();
        let planned = temp.path().join("tasks/planned");
        let done = temp.path().join("tasks/done");
        std::fs::create_dir_all(&planned).unwrap();
        std::fs::create_dir_all(&done).unwrap();
        std::fs::write(planned.join("WP01.md"), "# WP01\n").unwrap();

        let before = fingerprint(temp.path());
        std::fs::rename(planned.join("WP01.md"), done.join("WP01.md")).unwrap();
        assert_ne!(before, fingerprint(temp.path()));
    }

    #[test]
    fn test_invalidate_only_affects_one_feature() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        for root in [&a, &b] {
            std::fs::create_dir_all(root).unwrap();
            std::fs::write(root.join("tasks.md"), "- [ ] T001 a\n").unwrap();
        }

        let mut cache = BoardCache::new();
        cache.get_or_parse(&a);
        cache.get_or_parse(&b);
        cache.invalidate(&a);
        assert_eq!(cache.len(), 1);
        cache.get_or_parse(&b);
        assert_eq!(cache.stats(), (1, 2));
    }

    #[test]
    fn test_missing_artifacts_fingerprint_is_stable() {
        let temp = TempDir::new().unwrap();
        assert_eq!(fingerprint(temp.path()), fingerprint(temp.path()));
    }
}
