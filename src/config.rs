//! Runtime settings: where the database lives, who the active owner is and
//! which list order to use by default.
//!
//! Environment variables win over values stored in the `configs` table.

use std::path::PathBuf;

use crate::database::Database;
use crate::error::StoreError;
use crate::query::SortKey;

pub const DB_PATH_ENV: &str = "DODECK_DB";
pub const USER_ENV: &str = "DODECK_USER";
pub const LOG_ENV: &str = "DODECK_LOG";

pub const CURRENT_USER_KEY: &str = "current_user";
pub const DEFAULT_SORT_KEY: &str = "default_sort";

const KNOWN_KEYS: [(&str, &str); 2] = [
    (CURRENT_USER_KEY, "Login id used when --user is not given"),
    (DEFAULT_SORT_KEY, "List order when --sort is not given (date, priority, title)"),
];

/// Description stored alongside a config value, for the keys DoDeck reads.
pub fn describe_key(key: &str) -> Option<&'static str> {
    KNOWN_KEYS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, description)| *description)
}

pub fn db_path() -> PathBuf {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    let home_dir = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home_dir).join(".dodeck.db")
}

/// First non-blank of: command-line flag, environment, stored config.
pub fn pick_login(flag: Option<&str>, env: Option<&str>, stored: Option<&str>) -> Option<String> {
    [flag, env, stored]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|login| !login.is_empty())
        .map(str::to_string)
}

pub fn active_login(db: &Database, flag: Option<&str>) -> Result<Option<String>, StoreError> {
    let env = std::env::var(USER_ENV).ok();
    let stored = db.get_config(CURRENT_USER_KEY)?;
    Ok(pick_login(flag, env.as_deref(), stored.as_deref()))
}

/// Stored default sort, falling back to newest-first when unset or invalid.
pub fn default_sort(db: &Database) -> Result<SortKey, StoreError> {
    let Some(value) = db.get_config(DEFAULT_SORT_KEY)? else {
        return Ok(SortKey::default());
    };
    match value.parse() {
        Ok(key) => Ok(key),
        Err(err) => {
            log::warn!("ignoring {}: {}", DEFAULT_SORT_KEY, err);
            Ok(SortKey::default())
        }
    }
}

/// Rejects values DoDeck would not be able to use later.
pub fn validate_value(key: &str, value: &str) -> Result<(), String> {
    match key {
        DEFAULT_SORT_KEY => value.parse::<SortKey>().map(|_| ()).map_err(|e| e.to_string()),
        CURRENT_USER_KEY if value.trim().is_empty() => Err("login id must not be empty".to_string()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_beats_env_beats_stored() {
        assert_eq!(pick_login(Some("a"), Some("b"), Some("c")).as_deref(), Some("a"));
        assert_eq!(pick_login(None, Some("b"), Some("c")).as_deref(), Some("b"));
        assert_eq!(pick_login(None, None, Some("c")).as_deref(), Some("c"));
        assert_eq!(pick_login(None, None, None), None);
    }

    #[test]
    fn blank_sources_are_skipped() {
        assert_eq!(pick_login(Some("  "), Some(""), Some(" c ")).as_deref(), Some("c"));
    }

    #[test]
    fn default_sort_falls_back() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(default_sort(&db).unwrap(), SortKey::Date);

        db.set_config(DEFAULT_SORT_KEY, "title").unwrap();
        assert_eq!(default_sort(&db).unwrap(), SortKey::Title);

        db.set_config(DEFAULT_SORT_KEY, "shoe size").unwrap();
        assert_eq!(default_sort(&db).unwrap(), SortKey::Date);
    }

    #[test]
    fn validates_known_keys() {
        assert!(validate_value(DEFAULT_SORT_KEY, "priority").is_ok());
        assert!(validate_value(DEFAULT_SORT_KEY, "colour").is_err());
        assert!(validate_value(CURRENT_USER_KEY, " ").is_err());
        assert!(validate_value("anything_else", "").is_ok());
    }

    #[test]
    fn known_keys_have_descriptions() {
        assert!(describe_key(DEFAULT_SORT_KEY).is_some());
        assert!(describe_key("theme").is_none());
    }
}
