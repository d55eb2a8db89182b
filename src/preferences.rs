//! Preference manager that layers stored UI choices over config.toml defaults.
//!
//! Config values serve as defaults; `pref.*` keys in local storage override
//! them. Writes always go to the DB, never to the config file.
use anyhow::Result;

use crate::config::Config;
use crate::storage::{keys, Database};

// ============================================================================
// PreferenceManager
// ============================================================================

/// Grouping label and last active group, merged from config and storage.
#[derive(Debug, Clone)]
pub struct PreferenceManager {
    default_group_label: String,
    group_label: Option<String>,
    active_group: Option<String>,
}

impl PreferenceManager {
    /// Load preferences: config defaults, then DB overrides.
    pub async fn load(config: &Config, db: &Database) -> Result<Self> {
        let mut pm = Self::from_config(config);
        for (key, value) in db.items_with_prefix("pref.").await? {
            match key.as_str() {
                keys::GROUP_LABEL if !value.is_empty() => pm.group_label = Some(value),
                keys::ACTIVE_GROUP if !value.is_empty() => pm.active_group = Some(value),
                _ => tracing::debug!(key = %key, "Ignoring stored preference"),
            }
        }
        Ok(pm)
    }

    /// Create from config only (no DB). Fallback for when DB load fails.
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_group_label: config.default_group_label.clone(),
            group_label: None,
            active_group: None,
        }
    }

    pub fn default_group_label(&self) -> &str {
        &self.default_group_label
    }

    /// Chosen grouping label, or the configured default.
    pub fn group_label(&self) -> &str {
        self.group_label
            .as_deref()
            .unwrap_or(&self.default_group_label)
    }

    /// Group tab that was active when the app last ran.
    pub fn active_group(&self) -> Option<&str> {
        self.active_group.as_deref()
    }

    pub async fn set_group_label(&mut self, db: &Database, label: &str) -> Result<()> {
        db.set_item(keys::GROUP_LABEL, label).await?;
        self.group_label = Some(label.to_string());
        Ok(())
    }

    /// Remember the active group. `None` clears the stored value.
    pub async fn set_active_group(&mut self, db: &Database, group: Option<&str>) -> Result<()> {
        if self.active_group.as_deref() == group {
            return Ok(());
        }
        match group {
            Some(g) => db.set_item(keys::ACTIVE_GROUP, g).await?,
            None => db.remove_item(keys::ACTIVE_GROUP).await?,
        }
        self.active_group = group.map(str::to_string);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_load_defaults_from_config() {
        let db = test_db().await;
        let config = Config {
            default_group_label: "category".into(),
            ..Config::default()
        };
        let pm = PreferenceManager::load(&config, &db).await.unwrap();

        assert_eq!(pm.group_label(), "category");
        assert_eq!(pm.active_group(), None);
    }

    #[tokio::test]
    async fn test_db_overrides_config() {
        let db = test_db().await;
        db.set_item(keys::GROUP_LABEL, "author").await.unwrap();
        db.set_item(keys::ACTIVE_GROUP, "hn").await.unwrap();

        let pm = PreferenceManager::load(&Config::default(), &db)
            .await
            .unwrap();
        assert_eq!(pm.group_label(), "author");
        assert_eq!(pm.default_group_label(), "source");
        assert_eq!(pm.active_group(), Some("hn"));
    }

    #[tokio::test]
    async fn test_set_persists_across_loads() {
        let db = test_db().await;
        let config = Config::default();
        let mut pm = PreferenceManager::load(&config, &db).await.unwrap();

        pm.set_group_label(&db, "category").await.unwrap();
        pm.set_active_group(&db, Some("tech")).await.unwrap();

        let reloaded = PreferenceManager::load(&config, &db).await.unwrap();
        assert_eq!(reloaded.group_label(), "category");
        assert_eq!(reloaded.active_group(), Some("tech"));

        pm.set_active_group(&db, None).await.unwrap();
        let reloaded = PreferenceManager::load(&config, &db).await.unwrap();
        assert_eq!(reloaded.active_group(), None);
    }
}
