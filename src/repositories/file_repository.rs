// FileRepository - file entity operations
//
// Files are collaborators of the association store: the store only needs
// their ids to exist. Lifecycle operations live here so the referential
// contract has something to reference.

use rusqlite::{params, Connection, OptionalExtension};

use crate::database::FileRecord;
use crate::errors::AppResult;

pub trait FileRepository {
    fn insert(&self, filename: &str) -> AppResult<i64>;
    fn find_by_id(&self, id: i64) -> AppResult<Option<FileRecord>>;
    fn find_by_name(&self, filename: &str) -> AppResult<Option<FileRecord>>;
    fn find_all(&self) -> AppResult<Vec<FileRecord>>;
    /// Delete the file. Associations referencing it are cascade-deleted.
    /// Returns false when no such file existed.
    fn delete(&self, id: i64) -> AppResult<bool>;
}

/// SQLite implementation of FileRepository
pub struct SqliteFileRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteFileRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRecord> {
        Ok(FileRecord {
            id: Some(row.get(0)?),
            filename: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }
}

impl<'a> FileRepository for SqliteFileRepository<'a> {
    fn insert(&self, filename: &str) -> AppResult<i64> {
        self.conn.execute(
            "INSERT INTO files (filename) VALUES (?1)",
            params![filename],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn find_by_id(&self, id: i64) -> AppResult<Option<FileRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, filename, created_at, updated_at FROM files WHERE id = ?1",
        )?;
        Ok(stmt.query_row([id], Self::row_to_record).optional()?)
    }

    fn find_by_name(&self, filename: &str) -> AppResult<Option<FileRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, filename, created_at, updated_at FROM files WHERE filename = ?1",
        )?;
        Ok(stmt.query_row([filename], Self::row_to_record).optional()?)
    }

    fn find_all(&self) -> AppResult<Vec<FileRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, filename, created_at, updated_at FROM files ORDER BY created_at DESC",
        )?;
        let file_iter = stmt.query_map([], Self::row_to_record)?;

        let mut files = Vec::new();
        for file in file_iter {
            files.push(file?);
        }
        Ok(files)
    }

    fn delete(&self, id: i64) -> AppResult<bool> {
        let affected_rows = self
            .conn
            .execute("DELETE FROM files WHERE id = ?1", [id])?;
        Ok(affected_rows > 0)
    }
}
