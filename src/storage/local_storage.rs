use anyhow::Result;

use super::schema::Database;

impl Database {
    // ========================================================================
    // Key/Value Operations
    // ========================================================================

    /// Get a stored value by key, or `None` if not set.
    pub async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM local_storage WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Store a value (UPSERT), refreshing its `updated_at` timestamp.
    pub async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO local_storage (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a key. Removing a missing key is not an error.
    pub async fn remove_item(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM local_storage WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove every key starting with `prefix`. Returns the number removed.
    ///
    /// Used at startup to drop `session.*` keys left behind by the previous run.
    pub async fn remove_prefix(&self, prefix: &str) -> Result<u64> {
        // Escape LIKE wildcards so "session." cannot match "sessionX".
        let escaped = prefix
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let result = sqlx::query("DELETE FROM local_storage WHERE key LIKE ? ESCAPE '\\'")
            .bind(format!("{}%", escaped))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// All `(key, value)` pairs under a prefix, ordered by key.
    pub async fn items_with_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let escaped = prefix
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT key, value FROM local_storage WHERE key LIKE ? ESCAPE '\\' ORDER BY key",
        )
        .bind(format!("{}%", escaped))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
