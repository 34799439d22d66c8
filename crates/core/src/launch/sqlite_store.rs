//! SQLite-backed launch store.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::store::{check_loaded, check_save};
use super::{LaunchConfiguration, LaunchError, LaunchStore};

/// SQLite-backed launch store. Configurations are kept as JSON payloads.
pub struct SqliteLaunchStore {
    conn: Mutex<Connection>,
}

impl SqliteLaunchStore {
    /// Create a new store, creating the database file and table if needed.
    pub fn new(path: &Path) -> Result<Self, LaunchError> {
        let conn = Connection::open(path).map_err(|e| LaunchError::Storage(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, LaunchError> {
        let conn = Connection::open_in_memory().map_err(|e| LaunchError::Storage(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), LaunchError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS launch_configs (
                job_key TEXT PRIMARY KEY,
                config TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| LaunchError::Storage(e.to_string()))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, LaunchError> {
        self.conn
            .lock()
            .map_err(|_| LaunchError::Storage("connection mutex poisoned".to_string()))
    }

    /// Store raw JSON without validating it.
    #[cfg(test)]
    fn save_raw(&self, key: &str, json: &str) -> Result<(), LaunchError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO launch_configs (job_key, config, updated_at) VALUES (?1, ?2, ?3)",
            params![key, json, Utc::now().to_rfc3339()],
        )
        .map_err(|e| LaunchError::Storage(e.to_string()))?;
        Ok(())
    }
}

impl LaunchStore for SqliteLaunchStore {
    fn load(&self, key: &str) -> Result<LaunchConfiguration, LaunchError> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT config FROM launch_configs WHERE job_key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| LaunchError::Storage(e.to_string()))?;

        let json = json.ok_or_else(|| LaunchError::ConfigurationMissing(key.to_string()))?;
        let config = serde_json::from_str(&json).map_err(|e| LaunchError::corrupt(key, e))?;
        check_loaded(key, config)
    }

    fn save(&self, key: &str, config: &LaunchConfiguration) -> Result<(), LaunchError> {
        check_save(key, config)?;
        let json = serde_json::to_string(config).map_err(|e| LaunchError::Storage(e.to_string()))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO launch_configs (job_key, config, updated_at) VALUES (?1, ?2, ?3)",
            params![key, json, Utc::now().to_rfc3339()],
        )
        .map_err(|e| LaunchError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launch::InputItem;

    #[test]
    fn test_load_missing() {
        let store = SqliteLaunchStore::in_memory().unwrap();
        let err = store.load("alice").unwrap_err();
        assert!(matches!(err, LaunchError::ConfigurationMissing(ref k) if k == "alice"));
    }

    #[test]
    fn test_save_then_load() {
        let store = SqliteLaunchStore::in_memory().unwrap();
        let config = LaunchConfiguration::default()
            .with_items(vec![InputItem::new("a"), InputItem::new("b")])
            .with_thread_count(3)
            .with_owner("alice");

        store.save("alice", &config).unwrap();
        let loaded = store.load("alice").unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_save_replaces_previous() {
        let store = SqliteLaunchStore::in_memory().unwrap();
        store
            .save("alice", &LaunchConfiguration::default().with_output_name("first"))
            .unwrap();
        store
            .save("alice", &LaunchConfiguration::default().with_output_name("second"))
            .unwrap();
        assert_eq!(store.load("alice").unwrap().output_name, "second");
    }

    #[test]
    fn test_load_corrupt() {
        let store = SqliteLaunchStore::in_memory().unwrap();
        store.save_raw("alice", "{ not json").unwrap();
        let err = store.load("alice").unwrap_err();
        assert!(matches!(err, LaunchError::ConfigurationCorrupt { .. }));
    }

    #[test]
    fn test_save_rejects_escaping_output_name() {
        let store = SqliteLaunchStore::in_memory().unwrap();
        let config = LaunchConfiguration::default().with_output_name("../../escaped");

        let err = store.save("alice", &config).unwrap_err();
        assert!(matches!(err, LaunchError::Invalid { .. }));
        assert!(matches!(
            store.load("alice"),
            Err(LaunchError::ConfigurationMissing(_))
        ));
    }

    #[test]
    fn test_load_escaping_payload_is_corrupt() {
        let store = SqliteLaunchStore::in_memory().unwrap();
        store
            .save_raw("alice", r#"{"items": [], "owner": "../root"}"#)
            .unwrap();
        assert!(matches!(
            store.load("alice"),
            Err(LaunchError::ConfigurationCorrupt { .. })
        ));
    }

    #[test]
    fn test_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launch.db");
        {
            let store = SqliteLaunchStore::new(&path).unwrap();
            store
                .save("bob", &LaunchConfiguration::default().with_thread_count(2))
                .unwrap();
        }
        let store = SqliteLaunchStore::new(&path).unwrap();
        assert_eq!(store.load("bob").unwrap().thread_count, 2);
    }
}
