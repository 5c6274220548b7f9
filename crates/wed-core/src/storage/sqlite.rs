use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{DocumentStore, Namespace};
use crate::error::StoreError;

/// SQLite backed store holding one row per (namespace, user)
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open the database at the given path and initialize tables if needed
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS user_kv (
                namespace TEXT NOT NULL,
                user_id TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (namespace, user_id)
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection off the async executor
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Worker("connection lock poisoned".into()))?;
            f(&guard).map_err(StoreError::from)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, ns: Namespace, user_id: &str) -> Result<Option<String>, StoreError> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT value FROM user_kv WHERE namespace = ?1 AND user_id = ?2",
                params![ns.as_str(), user_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
    }

    async fn put(&self, ns: Namespace, user_id: &str, value: String) -> Result<(), StoreError> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO user_kv (namespace, user_id, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(namespace, user_id) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                params![ns.as_str(), user_id, value, Utc::now().to_rfc3339()],
            )
            .map(|_| ())
        })
        .await
    }

    async fn remove(&self, ns: Namespace, user_id: &str) -> Result<(), StoreError> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM user_kv WHERE namespace = ?1 AND user_id = ?2",
                params![ns.as_str(), user_id],
            )
            .map(|_| ())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventDocument, Field};

    #[tokio::test]
    async fn documents_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("wed.db");

        let mut doc = EventDocument::default();
        doc.apply(Field::ClientName(Some("Alex".into())));
        {
            let store = SqliteStore::open(&path).unwrap();
            store.save_document("u1", &doc).await.unwrap();
            store.set_submitted("u1").await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load_document("u1").await.unwrap(), Some(doc));
        assert!(store.is_submitted("u1").await.unwrap());
        assert!(!store.is_submitted("u2").await.unwrap());
        assert_eq!(store.load_document("u2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn namespaces_are_independent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut doc = EventDocument::default();
        doc.apply(Field::EventType(Some("Wedding".into())));

        store.save_document("u1", &doc).await.unwrap();
        store.set_submitted("u1").await.unwrap();
        store.remove(Namespace::Document, "u1").await.unwrap();

        assert_eq!(store.load_document("u1").await.unwrap(), None);
        assert!(store.is_submitted("u1").await.unwrap());
        assert_eq!(store.load_backup("u1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn overwrite_replaces_value() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .put(Namespace::Document, "u1", "{\"client_name\":\"A\"}".into())
            .await
            .unwrap();
        store
            .put(Namespace::Document, "u1", "{\"client_name\":\"B\"}".into())
            .await
            .unwrap();
        let doc = store.load_document("u1").await.unwrap().unwrap();
        assert_eq!(doc.client_name.as_deref(), Some("B"));
    }
}
