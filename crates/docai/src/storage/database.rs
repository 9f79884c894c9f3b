//! SQLite persistence for document records

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{DocumentRecord, NewDocument};

/// Store and retrieve document rows.
///
/// Implementations guarantee read-your-writes within the process.
pub trait DocumentRepository: Send + Sync {
    /// Insert a new record and return it with its assigned id
    fn create(&self, document: NewDocument) -> Result<DocumentRecord>;

    fn get_by_id(&self, id: i64) -> Result<Option<DocumentRecord>>;

    /// All records, oldest first
    fn list(&self) -> Result<Vec<DocumentRecord>>;

    /// Replace the content of a record and bump `updated_at`
    fn update_content(&self, id: i64, content: &str) -> Result<Option<DocumentRecord>>;
}

/// SQLite-backed document repository
pub struct SqliteDocumentRepository {
    conn: Arc<Mutex<Connection>>,
}

const SELECT_COLUMNS: &str =
    "SELECT id, filename, file_type, content, storage_path, created_at, updated_at FROM documents";

impl SqliteDocumentRepository {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::persistence(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::persistence(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        tracing::info!("Document database ready at {}", path.display());
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            Error::persistence(format!("Failed to open in-memory database: {}", e))
        })?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            "#,
        )
        .map_err(|e| Error::persistence(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                file_type TEXT NOT NULL,
                content TEXT,
                storage_path TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_filename ON documents(filename);
            "#,
        )
        .map_err(|e| Error::persistence(format!("Failed to create tables: {}", e)))?;

        Ok(())
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<DocumentRecord> {
        Ok(DocumentRecord {
            id: row.get(0)?,
            filename: row.get(1)?,
            file_type: row.get(2)?,
            content: row.get(3)?,
            storage_path: row.get(4)?,
            created_at: row.get::<_, DateTime<Utc>>(5)?,
            updated_at: row.get::<_, DateTime<Utc>>(6)?,
        })
    }

    fn fetch(conn: &Connection, id: i64) -> Result<Option<DocumentRecord>> {
        conn.query_row(
            &format!("{} WHERE id = ?1", SELECT_COLUMNS),
            params![id],
            Self::row_to_record,
        )
        .optional()
        .map_err(|e| Error::persistence(format!("Failed to load document {}: {}", id, e)))
    }
}

impl DocumentRepository for SqliteDocumentRepository {
    fn create(&self, document: NewDocument) -> Result<DocumentRecord> {
        let conn = self.conn.lock();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO documents (filename, file_type, content, storage_path, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                document.filename,
                document.file_type,
                document.content,
                document.storage_path,
                now,
                now,
            ],
        )
        .map_err(|e| Error::persistence(format!("Failed to insert document: {}", e)))?;

        let id = conn.last_insert_rowid();
        Self::fetch(&conn, id)?
            .ok_or_else(|| Error::persistence(format!("Inserted document {} not readable", id)))
    }

    fn get_by_id(&self, id: i64) -> Result<Option<DocumentRecord>> {
        let conn = self.conn.lock();
        Self::fetch(&conn, id)
    }

    fn list(&self) -> Result<Vec<DocumentRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!("{} ORDER BY id", SELECT_COLUMNS))
            .map_err(|e| Error::persistence(format!("Failed to prepare query: {}", e)))?;

        let records = stmt
            .query_map([], Self::row_to_record)
            .map_err(|e| Error::persistence(format!("Failed to list documents: {}", e)))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::persistence(format!("Failed to read document row: {}", e)))?;

        Ok(records)
    }

    fn update_content(&self, id: i64, content: &str) -> Result<Option<DocumentRecord>> {
        let conn = self.conn.lock();

        let changed = conn
            .execute(
                "UPDATE documents SET content = ?1, updated_at = ?2 WHERE id = ?3",
                params![content, Utc::now(), id],
            )
            .map_err(|e| Error::persistence(format!("Failed to update document {}: {}", id, e)))?;

        if changed == 0 {
            return Ok(None);
        }
        Self::fetch(&conn, id)
    }
}
