//! Human category corrections keyed by normalized description.
//!
//! A flat JSON document on disk, human-inspectable, rewritten wholesale on
//! each update. One coarse lock wraps every load-mutate-save cycle so
//! concurrent writers in one process cannot lose updates. Last write wins;
//! no history is kept.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};

use centime_core::normalize_description;

pub struct OverrideStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl OverrideStore {
    pub fn new(path: impl Into<PathBuf>) -> OverrideStore {
        OverrideStore {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Missing or unreadable documents read as empty; overrides are
    /// corrections, never load-bearing state.
    fn load(&self) -> BTreeMap<String, String> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => BTreeMap::new(),
        }
    }

    fn save(&self, overrides: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(overrides)?;
        fs::write(&self.path, json).with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }

    /// Look up the corrected category for a description, if any.
    pub fn lookup(&self, description: &str) -> Option<String> {
        let normalized = normalize_description(description);
        if normalized.is_empty() {
            return None;
        }
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.load().get(&normalized).cloned()
    }

    /// Record a correction; `None` removes any existing entry. Descriptions
    /// normalizing to nothing are ignored.
    pub fn record(&self, description: &str, category: Option<&str>) -> Result<()> {
        let normalized = normalize_description(description);
        if normalized.is_empty() {
            return Ok(());
        }
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut overrides = self.load();
        match category {
            Some(category) => {
                overrides.insert(normalized, category.to_string());
            }
            None => {
                overrides.remove(&normalized);
            }
        }
        self.save(&overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> OverrideStore {
        OverrideStore::new(dir.path().join("overrides.json"))
    }

    #[test]
    fn test_record_and_lookup_share_the_key_space() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store
            .record("POS PURCHASE STARBUCKS 12345", Some("Restaurants"))
            .unwrap();
        // a different raw string normalizing to the same key hits the entry
        assert_eq!(
            store.lookup("STARBUCKS 99887").as_deref(),
            Some("Restaurants")
        );
    }

    #[test]
    fn test_recording_none_removes_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.record("UBER TRIP 11", Some("Transportation")).unwrap();
        store.record("UBER TRIP 22", None).unwrap();
        assert_eq!(store.lookup("UBER TRIP 33"), None);
    }

    #[test]
    fn test_noise_only_descriptions_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.record("12345", Some("Shopping")).unwrap();
        assert!(!dir.path().join("overrides.json").exists());
        assert_eq!(store.lookup("12345"), None);
    }

    #[test]
    fn test_document_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        store_in(&dir)
            .record("MONTHLY RENT TRANSFER", Some("Rent"))
            .unwrap();
        let reopened = store_in(&dir);
        assert_eq!(reopened.lookup("MONTHLY RENT").as_deref(), Some("Rent"));
    }

    #[test]
    fn test_corrupt_document_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("overrides.json"), "not json").unwrap();
        let store = store_in(&dir);
        assert_eq!(store.lookup("ANYTHING"), None);
        // and a new record replaces the corrupt document
        store.record("COSTCO RUN", Some("Groceries")).unwrap();
        assert_eq!(store.lookup("COSTCO RUN").as_deref(), Some("Groceries"));
    }
}
