use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another instance of the application has locked the database
    #[error("Another instance of feedboard appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Map lock-related sqlx errors to `InstanceLocked`.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5), SQLITE_LOCKED (6), SQLITE_CANTOPEN (14)
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return DatabaseError::InstanceLocked;
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Storage Keys
// ============================================================================

/// Well-known `local_storage` keys.
pub mod keys {
    /// Read-state map: JSON array of `[item_id, read_at_ms]` pairs.
    pub const READ_ITEMS: &str = "read_items";
    /// Preferred grouping label.
    pub const GROUP_LABEL: &str = "pref.group_label";
    /// Last active group tab, restored once on the next start.
    pub const ACTIVE_GROUP: &str = "pref.active_group";
    /// Prefix of keys that only live for one process lifetime.
    pub const SESSION_PREFIX: &str = "session.";
    /// Navigation context captured before opening the reader.
    pub const NAV_CONTEXT: &str = "session.nav_context";
    /// List scroll offset captured before opening the reader.
    pub const SCROLL: &str = "session.scroll";
}
