//! Static candidate pool.
//!
//! Loaded once at startup from a local JSON file and read-only thereafter.
//! Sampling draws uniformly at random; the pool itself keeps no episode
//! state - callers pass in the set of ids already seen.

use crate::domain::{Candidate, WatchError};
use rand::Rng;
use std::collections::HashSet;
use std::path::Path;

/// Ordered, read-only pool of candidate ids.
#[derive(Debug)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
}

impl CandidatePool {
    /// Load the pool from a JSON array of `{ "XID": ..., "name": ... }` records.
    ///
    /// # Errors
    ///
    /// Returns `WatchError::Config` when the file is missing or the JSON is
    /// not a candidate array.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, WatchError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            WatchError::Config(format!(
                "cannot read candidate pool {}: {}",
                path.display(),
                e
            ))
        })?;
        let candidates: Vec<Candidate> = serde_json::from_str(&raw).map_err(|e| {
            WatchError::Config(format!(
                "cannot parse candidate pool {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self { candidates })
    }

    /// Build a pool from already-loaded candidates.
    pub fn from_candidates(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// An empty pool; sampling against it yields empty results.
    pub fn empty() -> Self {
        Self {
            candidates: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Draw a uniformly random candidate whose id is not in `seen`.
    ///
    /// Gives up after `max_search` consecutive draws land on seen ids, which
    /// bounds the draw when the pool is (nearly) exhausted. Returns `None`
    /// on an empty or exhausted pool.
    pub fn draw(&self, seen: &HashSet<u64>, max_search: u32) -> Option<&Candidate> {
        if self.candidates.is_empty() {
            return None;
        }
        let mut rng = rand::thread_rng();
        for _ in 0..max_search {
            let candidate = &self.candidates[rng.gen_range(0..self.candidates.len())];
            if !seen.contains(&candidate.xid) {
                return Some(candidate);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn pool_of(ids: &[u64]) -> CandidatePool {
        CandidatePool::from_candidates(
            ids.iter()
                .map(|&xid| Candidate { xid, name: None })
                .collect(),
        )
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{ "XID": 111, "name": "One" }}, {{ "XID": 222 }}]"#
        )
        .unwrap();

        let pool = CandidatePool::load(file.path()).unwrap();
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = CandidatePool::load("/nonexistent/data.json").unwrap_err();
        assert!(matches!(err, WatchError::Config(_)));
    }

    #[test]
    fn test_load_malformed_json_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "not": "an array" }}"#).unwrap();

        let err = CandidatePool::load(file.path()).unwrap_err();
        assert!(matches!(err, WatchError::Config(_)));
    }

    #[test]
    fn test_draw_skips_seen_ids() {
        let pool = pool_of(&[1, 2, 3]);
        let seen: HashSet<u64> = [1, 3].into_iter().collect();

        for _ in 0..50 {
            let candidate = pool.draw(&seen, 100).unwrap();
            assert_eq!(candidate.xid, 2);
        }
    }

    #[test]
    fn test_draw_exhausted_pool_returns_none() {
        let pool = pool_of(&[1, 2]);
        let seen: HashSet<u64> = [1, 2].into_iter().collect();
        assert!(pool.draw(&seen, 100).is_none());
    }

    #[test]
    fn test_draw_empty_pool_returns_none() {
        let pool = CandidatePool::empty();
        assert!(pool.draw(&HashSet::new(), 100).is_none());
    }
}
