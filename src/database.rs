use log::{debug, warn};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::config::database;
use crate::errors::AppResult;

/// A tracked file. Identity and lifecycle are owned by the file side of the
/// application; the association store only relies on `id` being stable.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FileRecord {
    pub id: Option<i64>,
    pub filename: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A tag. Same ownership rules as [`FileRecord`].
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Tag {
    pub id: Option<i64>,
    pub name: String,
    pub created_at: Option<String>,
}

/// A single (file, tag) pairing. The pair is the identity; there is no
/// surrogate key.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileTag {
    pub file_id: i64,
    pub tag_id: i64,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if necessary) the database at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> AppResult<Self> {
        let conn = Connection::open(db_path)?;
        let db = Database { conn };
        db.configure_connection()?;
        db.initialize_schema()?;
        Ok(db)
    }

    /// Open a private in-memory database. Used by tests and throwaway runs.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_connection()?;
        db.initialize_schema()?;
        Ok(db)
    }

    /// Per-connection pragmas. Foreign key enforcement is off by default in
    /// SQLite and must be switched on for every new connection, or the
    /// file_tags constraints are silently ignored.
    fn configure_connection(&self) -> rusqlite::Result<()> {
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        // The pragma reports the mode actually in effect. In-memory databases
        // stay on "memory"; any other non-WAL answer means degraded
        // durability on a file-backed database.
        let journal_mode: String = self
            .conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        match journal_mode.as_str() {
            "wal" | "memory" => {}
            other => warn!("journal_mode=WAL not applied, running with journal_mode={other}"),
        }
        self.conn
            .busy_timeout(Duration::from_millis(database::BUSY_TIMEOUT_MS))?;
        Ok(())
    }

    fn initialize_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT UNIQUE NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS file_tags (
                file_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                PRIMARY KEY (file_id, tag_id),
                FOREIGN KEY (file_id) REFERENCES files (id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags (id) ON DELETE CASCADE
            )",
            [],
        )?;

        debug!("database schema initialized");
        Ok(())
    }

    /// Borrow the underlying connection for repository use.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn get_file_count(&self) -> AppResult<usize> {
        self.count_rows(database::FILES_TABLE)
    }

    pub fn get_tag_count(&self) -> AppResult<usize> {
        self.count_rows(database::TAGS_TABLE)
    }

    pub fn get_association_count(&self) -> AppResult<usize> {
        self.count_rows(database::FILE_TAGS_TABLE)
    }

    fn count_rows(&self, table: &str) -> AppResult<usize> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_backed_database_runs_in_wal_mode() {
        let db_file = tempfile::NamedTempFile::new().unwrap();
        let db = Database::new(db_file.path()).unwrap();
        let mode: String = db
            .connection()
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[test]
    fn foreign_keys_are_enabled_on_every_connection() {
        let db = Database::open_in_memory().unwrap();
        let enabled: i64 = db
            .connection()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn schema_initialization_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.initialize_schema().unwrap();
        assert_eq!(db.get_file_count().unwrap(), 0);
        assert_eq!(db.get_tag_count().unwrap(), 0);
        assert_eq!(db.get_association_count().unwrap(), 0);
    }

    #[test]
    fn file_tags_has_no_surrogate_key() {
        let db = Database::open_in_memory().unwrap();
        // Composite primary key over exactly (file_id, tag_id).
        let mut stmt = db
            .connection()
            .prepare("SELECT name, pk FROM pragma_table_info('file_tags') ORDER BY pk")
            .unwrap();
        let columns: Vec<(String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0], ("file_id".to_string(), 1));
        assert_eq!(columns[1], ("tag_id".to_string(), 2));
    }
}
