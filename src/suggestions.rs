use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// A free-text user submission tagged with a postal code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "Text")]
    pub text: String,
    #[serde(rename = "PLZ", default)]
    pub plz: String,
}

/// Persisted entry: the canonical shape is the `{Text, PLZ}` object, but
/// older stores held flat strings. Both deserialize; flat strings are
/// migrated to objects with an empty PLZ on load.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredSuggestion {
    Entry(Suggestion),
    Legacy(String),
}

/// The one piece of cross-invocation state: an ordered list of
/// suggestions in a single JSON file. The path is injected so callers
/// (and tests) choose where the store lives. A single active writer is
/// assumed; concurrent writers race and the last one wins.
#[derive(Debug, Clone)]
pub struct SuggestionStore {
    path: PathBuf,
}

impl SuggestionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SuggestionStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file holding an empty array if it does not exist yet.
    pub fn initialize(&self) -> Result<()> {
        if !self.path.exists() {
            self.write(&[])?;
        }
        Ok(())
    }

    /// Loads all suggestions, initializing the store first when the file
    /// is missing.
    pub fn load(&self) -> Result<Vec<Suggestion>> {
        self.initialize()?;
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read suggestions file: {:?}", self.path))?;
        let stored: Vec<StoredSuggestion> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse suggestions file: {:?}", self.path))?;
        Ok(stored
            .into_iter()
            .map(|entry| match entry {
                StoredSuggestion::Entry(s) => s,
                StoredSuggestion::Legacy(text) => Suggestion {
                    text,
                    plz: String::new(),
                },
            })
            .collect())
    }

    /// Replaces the store wholesale.
    pub fn save(&self, suggestions: &[Suggestion]) -> Result<()> {
        self.write(suggestions)
    }

    /// Appends one suggestion and returns the new list.
    pub fn append(&self, suggestion: Suggestion) -> Result<Vec<Suggestion>> {
        let mut suggestions = self.load()?;
        suggestions.push(suggestion);
        self.save(&suggestions)?;
        Ok(suggestions)
    }

    /// Wipes the store when the password matches the configured one.
    /// Returns whether the wipe happened; a wrong password leaves the
    /// store untouched.
    pub fn clear(&self, password: &str, expected: &str) -> Result<bool> {
        if !verify_admin_password(password, expected) {
            return Ok(false);
        }
        self.write(&[])?;
        info!("Suggestions store cleared");
        Ok(true)
    }

    // Write through a temp file and rename so readers never see a torn
    // document.
    fn write(&self, suggestions: &[Suggestion]) -> Result<()> {
        let json = serde_json::to_string(suggestions)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("Failed to write suggestions file: {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace suggestions file: {:?}", self.path))?;
        Ok(())
    }
}

/// Exact-equality password check, kept in one place so a hashed
/// comparison can replace it without touching callers.
pub fn verify_admin_password(given: &str, expected: &str) -> bool {
    given == expected
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Suggestion and PLZ cannot be empty.")]
    Empty,
    #[error("Invalid PLZ.")]
    UnknownPlz,
}

/// Validates a submission against the whitelist of postal codes present
/// in the data. The whitelist is checked at submission time only; stored
/// suggestions carry no referential constraint.
pub fn validate_submission(
    text: &str,
    plz: &str,
    valid_codes: &[String],
) -> Result<Suggestion, SubmitError> {
    let text = text.trim();
    let plz = plz.trim();
    if text.is_empty() || plz.is_empty() {
        return Err(SubmitError::Empty);
    }
    if !valid_codes.iter().any(|code| code == plz) {
        return Err(SubmitError::UnknownPlz);
    }
    Ok(Suggestion {
        text: text.to_string(),
        plz: plz.to_string(),
    })
}

/// Listing view: without a filter the suggestions come back ordered by
/// PLZ; with one, only exact matches survive.
pub fn filter_suggestions(mut all: Vec<Suggestion>, filter_plz: Option<&str>) -> Vec<Suggestion> {
    match filter_plz.map(str::trim).filter(|p| !p.is_empty()) {
        None => {
            all.sort_by(|a, b| a.plz.cmp(&b.plz));
            all
        }
        Some(plz) => all.into_iter().filter(|s| s.plz == plz).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &tempfile::TempDir) -> SuggestionStore {
        SuggestionStore::new(dir.path().join("suggestions.json"))
    }

    fn suggestion(text: &str, plz: &str) -> Suggestion {
        Suggestion {
            text: text.to_string(),
            plz: plz.to_string(),
        }
    }

    #[test]
    fn initialize_creates_an_empty_array() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        store.initialize().unwrap();
        assert!(store.path().exists());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[]");
    }

    #[test]
    fn load_self_heals_a_missing_file() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        let loaded = store.load().unwrap();
        assert!(loaded.is_empty());
        assert!(store.path().exists());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let suggestions = vec![
            suggestion("More stations near the park", "10115"),
            suggestion("Faster chargers please", "10117"),
        ];

        store.save(&suggestions).unwrap();
        assert_eq!(store.load().unwrap(), suggestions);
    }

    #[test]
    fn save_overwrites_existing_content() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        store.save(&[suggestion("Old", "10115")]).unwrap();
        let replacement = vec![suggestion("New 1", "10117"), suggestion("New 2", "10119")];
        store.save(&replacement).unwrap();
        assert_eq!(store.load().unwrap(), replacement);
    }

    #[test]
    fn append_keeps_order() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        store.append(suggestion("First", "10115")).unwrap();
        let all = store.append(suggestion("Second", "10117")).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].text, "First");
        assert_eq!(store.load().unwrap(), all);
    }

    #[test]
    fn legacy_flat_strings_are_migrated() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), r#"["Suggestion 1","Suggestion 2"]"#).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(
            loaded,
            vec![suggestion("Suggestion 1", ""), suggestion("Suggestion 2", "")]
        );
    }

    #[test]
    fn clear_with_correct_password_wipes_the_store() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&[suggestion("To be removed", "10115")]).unwrap();

        assert!(store.clear("12345", "12345").unwrap());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn clear_with_wrong_password_is_a_no_op() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let suggestions = vec![suggestion("Keep me", "10115")];
        store.save(&suggestions).unwrap();

        assert!(!store.clear("wrong_password", "12345").unwrap());
        assert_eq!(store.load().unwrap(), suggestions);
    }

    #[test]
    fn submissions_are_validated() {
        let codes = vec!["10115".to_string(), "10117".to_string()];

        assert_eq!(validate_submission("", "10115", &codes), Err(SubmitError::Empty));
        assert_eq!(validate_submission("Text", "  ", &codes), Err(SubmitError::Empty));
        assert_eq!(
            validate_submission("Text", "99999", &codes),
            Err(SubmitError::UnknownPlz)
        );
        assert_eq!(
            validate_submission("  More chargers  ", " 10115 ", &codes),
            Ok(suggestion("More chargers", "10115"))
        );
    }

    #[test]
    fn unfiltered_listing_sorts_by_plz() {
        let all = vec![
            suggestion("c", "10119"),
            suggestion("a", "10115"),
            suggestion("b", "10117"),
        ];
        let listed = filter_suggestions(all, None);
        assert_eq!(
            listed.iter().map(|s| s.plz.as_str()).collect::<Vec<_>>(),
            vec!["10115", "10117", "10119"]
        );
    }

    #[test]
    fn filtered_listing_matches_exactly() {
        let all = vec![
            suggestion("a", "10115"),
            suggestion("b", "10117"),
            suggestion("c", "10115"),
        ];
        let listed = filter_suggestions(all, Some("10115"));
        assert_eq!(
            listed.iter().map(|s| s.text.as_str()).collect::<Vec<_>>(),
            vec!["a", "c"]
        );
    }
}
