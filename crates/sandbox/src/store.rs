//! Saved learner progress
//!
//! A flat JSON object of string keys, in the shape a browser's local storage
//! would hold. Saving is best effort: failures are logged and otherwise
//! ignored by callers that do not care.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use autolab_common::{ApiStyle, Result};
use tokio::fs;
use tracing::{debug, warn};

const KEY_PREFIX: &str = "autolab-";
const ACTIVE_SCENARIO: &str = "autolab-active-scenario";
const ACTIVE_STYLE: &str = "autolab-active-style";
const COMPLETED: &str = "autolab-completed";
const SIDEBAR_COLLAPSED: &str = "autolab-sidebar-collapsed";
const CODE_PREFIX: &str = "autolab-code-";

/// File name inside the store directory
pub const PROGRESS_FILE: &str = "progress.json";

/// Key under which the completed set records a scenario/style pair
pub fn completion_key(scenario_id: &str, style: ApiStyle) -> String {
    format!("{}-{}", scenario_id, style.as_str())
}

/// Key-value progress store backed by one JSON file
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl ProgressStore {
    /// Empty store that will save to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Store inside the directory `root`
    pub fn in_dir(root: &Path) -> Self {
        Self::new(root.join(PROGRESS_FILE))
    }

    /// Load the store at `path`. A missing or unreadable file yields an
    /// empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self::new(path);
        match fs::read_to_string(&store.path).await {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(entries) => {
                    store.entries = entries
                        .into_iter()
                        .filter(|(k, _)| k.starts_with(KEY_PREFIX))
                        .collect();
                    debug!("Loaded {} progress entries from {}", store.entries.len(), store.path.display());
                }
                Err(e) => warn!("Ignoring unreadable progress file {}: {}", store.path.display(), e),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Cannot read progress file {}: {}", store.path.display(), e),
        }
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the store through a temporary file
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &self.path).await?;
        debug!("Saved {} progress entries", self.entries.len());
        Ok(())
    }

    /// Save, logging instead of failing
    pub async fn save_best_effort(&self) {
        if let Err(e) = self.save().await {
            warn!("Failed to save progress to {}: {}", self.path.display(), e);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn last_scenario(&self) -> Option<&str> {
        self.get(ACTIVE_SCENARIO)
    }

    pub fn set_last_scenario(&mut self, id: &str) {
        self.set(ACTIVE_SCENARIO, id);
    }

    pub fn last_style(&self) -> Option<ApiStyle> {
        self.get(ACTIVE_STYLE).and_then(|s| s.parse().ok())
    }

    pub fn set_last_style(&mut self, style: ApiStyle) {
        self.set(ACTIVE_STYLE, style.as_str());
    }

    /// Code the learner last wrote for a scenario in one style
    pub fn code(&self, scenario_id: &str, style: ApiStyle) -> Option<&str> {
        self.get(&code_key(scenario_id, style))
    }

    pub fn set_code(&mut self, scenario_id: &str, style: ApiStyle, code: &str) {
        self.set(code_key(scenario_id, style), code);
    }

    /// Completed scenario/style pairs, as `completion_key` strings
    pub fn completed(&self) -> Vec<String> {
        self.get(COMPLETED)
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }

    pub fn is_completed(&self, scenario_id: &str, style: ApiStyle) -> bool {
        self.completed().contains(&completion_key(scenario_id, style))
    }

    /// Record a completion; returns false when it was already recorded
    pub fn mark_completed(&mut self, scenario_id: &str, style: ApiStyle) -> bool {
        let key = completion_key(scenario_id, style);
        let mut completed = self.completed();
        if completed.contains(&key) {
            return false;
        }
        completed.push(key);
        let encoded = serde_json::Value::from(completed).to_string();
        self.set(COMPLETED, encoded);
        true
    }

    /// Scenario/style pairs with saved code
    pub fn saved_code(&self) -> Vec<(String, ApiStyle)> {
        self.entries
            .keys()
            .filter_map(|key| key.strip_prefix(CODE_PREFIX))
            .filter_map(|rest| {
                let (id, style) = rest.rsplit_once('-')?;
                Some((id.to_string(), style.parse().ok()?))
            })
            .collect()
    }

    pub fn sidebar_collapsed(&self) -> bool {
        self.get(SIDEBAR_COLLAPSED) == Some("true")
    }

    pub fn set_sidebar_collapsed(&mut self, collapsed: bool) {
        self.set(SIDEBAR_COLLAPSED, collapsed.to_string());
    }
}

fn code_key(scenario_id: &str, style: ApiStyle) -> String {
    format!("{}{}-{}", CODE_PREFIX, scenario_id, style.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_round_trip_through_disk() {
        let dir = TempDir::new().unwrap();
        let mut store = ProgressStore::in_dir(dir.path());
        store.set_last_scenario("basic-auth");
        store.set_last_style(ApiStyle::Cypress);
        store.set_code("basic-auth", ApiStyle::Cypress, "cy.visit('/');");
        assert!(store.mark_completed("basic-auth", ApiStyle::Cypress));
        assert!(!store.mark_completed("basic-auth", ApiStyle::Cypress));
        store.set_sidebar_collapsed(true);
        store.save().await.unwrap();

        let loaded = ProgressStore::open(dir.path().join(PROGRESS_FILE)).await;
        assert_eq!(loaded.last_scenario(), Some("basic-auth"));
        assert_eq!(loaded.last_style(), Some(ApiStyle::Cypress));
        assert_eq!(loaded.code("basic-auth", ApiStyle::Cypress), Some("cy.visit('/');"));
        assert_eq!(loaded.code("basic-auth", ApiStyle::Playwright), None);
        assert_eq!(loaded.completed(), vec!["basic-auth-cypress".to_string()]);
        assert!(loaded.sidebar_collapsed());
        assert_eq!(
            loaded.saved_code(),
            vec![("basic-auth".to_string(), ApiStyle::Cypress)]
        );
    }

    #[tokio::test]
    async fn test_missing_or_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let missing = ProgressStore::open(dir.path().join("none.json")).await;
        assert!(missing.entries().is_empty());

        let corrupt = dir.path().join("bad.json");
        std::fs::write(&corrupt, "{ not json").unwrap();
        let store = ProgressStore::open(&corrupt).await;
        assert!(store.entries().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_keys_are_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(PROGRESS_FILE);
        std::fs::write(&path, r#"{"autolab-active-scenario":"x","other-app":"y"}"#).unwrap();
        let store = ProgressStore::open(&path).await;
        assert_eq!(store.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_save_creates_directory() {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::in_dir(&dir.path().join("nested").join("deeper"));
        store.save().await.unwrap();
        assert!(store.path().exists());
        assert!(!store.path().with_extension("json.tmp").exists());
    }
}
