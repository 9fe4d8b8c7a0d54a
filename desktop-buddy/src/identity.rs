use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const FALLBACK_NAME: &str = "friend";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IdentityRecord {
    pub user_name: Option<String>,
}

/// Remembers what the buddy calls the user, in a one-field JSON file.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored name, or `None` when the user should be asked.
    pub fn load(&self) -> Option<String> {
        match load_record(&self.path) {
            Ok(record) => record
                .user_name
                .map(|name| name.trim().to_owned())
                .filter(|name| !name.is_empty()),
            Err(err) => {
                debug!(?err, path = %self.path.display(), "identity unavailable; will prompt");
                None
            }
        }
    }

    /// Normalizes the prompt answer and tries to persist it. Saving is best
    /// effort; the returned name is used for the session either way.
    pub fn remember(&self, answer: &str) -> String {
        let name = normalize_name(answer);
        let record = IdentityRecord {
            user_name: Some(name.clone()),
        };
        match save_record(&self.path, &record) {
            Ok(()) => info!(path = %self.path.display(), "remembered user name"),
            Err(err) => warn!(?err, "failed saving user name; keeping it for this session only"),
        }
        name
    }
}

pub fn normalize_name(answer: &str) -> String {
    let trimmed = answer.trim();
    if trimmed.is_empty() {
        FALLBACK_NAME.to_owned()
    } else {
        trimmed.to_owned()
    }
}

pub fn load_record(path: &Path) -> Result<IdentityRecord> {
    if !path.exists() {
        return Ok(IdentityRecord::default());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed reading identity at {}", path.display()))?;
    let parsed = serde_json::from_str::<IdentityRecord>(&text)
        .with_context(|| format!("invalid identity json at {}", path.display()))?;
    Ok(parsed)
}

pub fn save_record(path: &Path, record: &IdentityRecord) -> Result<()> {
    let payload = serde_json::to_string(record).context("failed serializing identity")?;
    fs::write(path, payload)
        .with_context(|| format!("failed writing identity at {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{normalize_name, IdentityStore, FALLBACK_NAME};

    #[test]
    fn missing_file_means_prompt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = IdentityStore::new(dir.path().join("helper_config.json"));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn remembered_name_is_trimmed_and_reloaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = IdentityStore::new(dir.path().join("helper_config.json"));
        assert_eq!(store.remember("  Robin \n"), "Robin");
        assert_eq!(store.load().as_deref(), Some("Robin"));

        let raw = std::fs::read_to_string(store.path()).expect("read back");
        assert_eq!(raw, r#"{"user_name":"Robin"}"#);
    }

    #[test]
    fn blank_or_corrupt_records_fall_back_to_prompt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("helper_config.json");
        let store = IdentityStore::new(path.clone());

        std::fs::write(&path, r#"{"user_name": "   "}"#).expect("write");
        assert_eq!(store.load(), None);

        std::fs::write(&path, r#"{"user_name": 42}"#).expect("write");
        assert_eq!(store.load(), None);

        std::fs::write(&path, "garbage").expect("write");
        assert_eq!(store.load(), None);
    }

    #[test]
    fn empty_answer_becomes_fallback_name() {
        assert_eq!(normalize_name(""), FALLBACK_NAME);
        assert_eq!(normalize_name("   "), FALLBACK_NAME);
    }

    #[test]
    fn unwritable_location_still_returns_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = IdentityStore::new(dir.path().join("missing").join("helper_config.json"));
        assert_eq!(store.remember("Kim"), "Kim");
        assert_eq!(store.load(), None);
    }
}
