// TagRepository - tag entity operations
//
// Same collaborator role as FileRepository: the association store only
// depends on tag ids existing.

use rusqlite::{params, Connection, OptionalExtension};

use crate::config::tags;
use crate::database::Tag;
use crate::errors::{AppError, AppResult};

pub trait TagRepository {
    fn insert(&self, name: &str) -> AppResult<i64>;
    fn find_by_id(&self, id: i64) -> AppResult<Option<Tag>>;
    fn find_by_name(&self, name: &str) -> AppResult<Option<Tag>>;
    fn find_all(&self) -> AppResult<Vec<Tag>>;
    /// Look the tag up by name, creating it if it does not exist yet.
    fn get_or_create(&self, name: &str) -> AppResult<Tag>;
    /// Delete the tag. Associations referencing it are cascade-deleted.
    /// Returns false when no such tag existed.
    fn delete(&self, id: i64) -> AppResult<bool>;
}

/// SQLite implementation of TagRepository
pub struct SqliteTagRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteTagRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn row_to_tag(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tag> {
        Ok(Tag {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            created_at: row.get(2)?,
        })
    }

    /// Validate the name, returning the trimmed form that gets stored.
    /// Surrounding whitespace never distinguishes two tags.
    fn validate_name(name: &str) -> AppResult<&str> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("name", "tag name must not be empty"));
        }
        if trimmed.len() > tags::MAX_TAG_LENGTH {
            return Err(AppError::validation(
                "name",
                format!("tag name must be at most {} bytes", tags::MAX_TAG_LENGTH),
            ));
        }
        Ok(trimmed)
    }
}

impl<'a> TagRepository for SqliteTagRepository<'a> {
    fn insert(&self, name: &str) -> AppResult<i64> {
        let name = Self::validate_name(name)?;
        self.conn
            .execute("INSERT INTO tags (name) VALUES (?1)", params![name])?;
        Ok(self.conn.last_insert_rowid())
    }

    fn find_by_id(&self, id: i64) -> AppResult<Option<Tag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM tags WHERE id = ?1")?;
        Ok(stmt.query_row([id], Self::row_to_tag).optional()?)
    }

    fn find_by_name(&self, name: &str) -> AppResult<Option<Tag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM tags WHERE name = ?1")?;
        Ok(stmt.query_row([name], Self::row_to_tag).optional()?)
    }

    fn find_all(&self) -> AppResult<Vec<Tag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM tags ORDER BY name ASC")?;
        let tag_iter = stmt.query_map([], Self::row_to_tag)?;

        let mut all = Vec::new();
        for tag in tag_iter {
            all.push(tag?);
        }
        Ok(all)
    }

    fn get_or_create(&self, name: &str) -> AppResult<Tag> {
        let name = Self::validate_name(name)?;

        if let Some(existing) = self.find_by_name(name)? {
            return Ok(existing);
        }

        // INSERT OR IGNORE keeps a concurrent creator from failing us; the
        // follow-up lookup returns whichever row won.
        self.conn
            .execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", params![name])?;
        self.find_by_name(name)?
            .ok_or_else(|| AppError::ConstraintConflict(format!("tag '{name}' vanished after insert")))
    }

    fn delete(&self, id: i64) -> AppResult<bool> {
        let affected_rows = self.conn.execute("DELETE FROM tags WHERE id = ?1", [id])?;
        Ok(affected_rows > 0)
    }
}
