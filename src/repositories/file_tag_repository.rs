// FileTagRepository - the (file, tag) association store
//
// The pairing itself is the identity: file_tags has a composite primary key
// and no surrogate id. Uniqueness and referential validity are enforced by
// the engine (composite PK + foreign keys), so a single statement per
// operation is atomic with respect to both invariants.

use log::debug;
use rusqlite::{params, Connection};
use std::collections::HashSet;

use crate::database::{FileRecord, FileTag, Tag};
use crate::errors::{map_association_error, AppResult};

pub trait FileTagRepository {
    /// Record the pairing. Idempotent: adding an existing pairing is a no-op.
    /// Fails with `ReferentialViolation` when either id does not reference an
    /// existing file or tag.
    fn add(&self, file_id: i64, tag_id: i64) -> AppResult<()>;
    /// Remove the pairing if present. Returns whether anything was removed;
    /// removing an absent pairing is not an error.
    fn remove(&self, file_id: i64, tag_id: i64) -> AppResult<bool>;
    /// Whether the specific pairing is present.
    fn exists(&self, file_id: i64, tag_id: i64) -> AppResult<bool>;
    /// Tag ids associated with the file. Empty for unknown files; reads do
    /// not validate existence.
    fn tags_for_file(&self, file_id: i64) -> AppResult<HashSet<i64>>;
    /// File ids associated with the tag, symmetric to `tags_for_file`.
    fn files_for_tag(&self, tag_id: i64) -> AppResult<HashSet<i64>>;
    /// Joined tag records for the file, ordered by name.
    fn tag_records_for_file(&self, file_id: i64) -> AppResult<Vec<Tag>>;
    /// Joined file records for the tag, ordered by filename.
    fn file_records_for_tag(&self, tag_id: i64) -> AppResult<Vec<FileRecord>>;
    /// Add the tag to every file in one transaction. Returns how many
    /// pairings were actually created.
    fn batch_add(&self, file_ids: &[i64], tag_id: i64) -> AppResult<usize>;
    /// Remove the tag from every file in one transaction. Returns how many
    /// pairings were actually removed.
    fn batch_remove(&self, file_ids: &[i64], tag_id: i64) -> AppResult<usize>;
    /// Every pairing currently in the store.
    fn pairs(&self) -> AppResult<Vec<FileTag>>;
    /// Total number of pairings in the store.
    fn count(&self) -> AppResult<usize>;
}

/// SQLite implementation of FileTagRepository
pub struct SqliteFileTagRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteFileTagRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn collect_ids(&self, sql: &str, key: i64) -> AppResult<HashSet<i64>> {
        let mut stmt = self.conn.prepare(sql)?;
        let iter = stmt.query_map([key], |row| row.get::<_, i64>(0))?;

        let mut ids = HashSet::new();
        for id in iter {
            ids.insert(id?);
        }
        Ok(ids)
    }
}

impl<'a> FileTagRepository for SqliteFileTagRepository<'a> {
    fn add(&self, file_id: i64, tag_id: i64) -> AppResult<()> {
        // OR IGNORE absorbs the duplicate-pair case but still surfaces
        // foreign key violations, so a missing file or tag is an error.
        self.conn
            .execute(
                "INSERT OR IGNORE INTO file_tags (file_id, tag_id) VALUES (?1, ?2)",
                params![file_id, tag_id],
            )
            .map_err(|e| map_association_error(e, file_id, tag_id))?;
        Ok(())
    }

    fn remove(&self, file_id: i64, tag_id: i64) -> AppResult<bool> {
        let affected_rows = self.conn.execute(
            "DELETE FROM file_tags WHERE file_id = ?1 AND tag_id = ?2",
            params![file_id, tag_id],
        )?;
        Ok(affected_rows > 0)
    }

    fn exists(&self, file_id: i64, tag_id: i64) -> AppResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM file_tags WHERE file_id = ?1 AND tag_id = ?2",
            params![file_id, tag_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn tags_for_file(&self, file_id: i64) -> AppResult<HashSet<i64>> {
        self.collect_ids("SELECT tag_id FROM file_tags WHERE file_id = ?1", file_id)
    }

    fn files_for_tag(&self, tag_id: i64) -> AppResult<HashSet<i64>> {
        self.collect_ids("SELECT file_id FROM file_tags WHERE tag_id = ?1", tag_id)
    }

    fn tag_records_for_file(&self, file_id: i64) -> AppResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.name, t.created_at
             FROM tags t
             INNER JOIN file_tags ft ON t.id = ft.tag_id
             WHERE ft.file_id = ?1
             ORDER BY t.name ASC",
        )?;

        let tag_iter = stmt.query_map([file_id], |row| {
            Ok(Tag {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;

        let mut tags = Vec::new();
        for tag in tag_iter {
            tags.push(tag?);
        }
        Ok(tags)
    }

    fn file_records_for_tag(&self, tag_id: i64) -> AppResult<Vec<FileRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT f.id, f.filename, f.created_at, f.updated_at
             FROM files f
             INNER JOIN file_tags ft ON f.id = ft.file_id
             WHERE ft.tag_id = ?1
             ORDER BY f.filename ASC",
        )?;

        let file_iter = stmt.query_map([tag_id], |row| {
            Ok(FileRecord {
                id: Some(row.get(0)?),
                filename: row.get(1)?,
                created_at: row.get(2)?,
                updated_at: row.get(3)?,
            })
        })?;

        let mut files = Vec::new();
        for file in file_iter {
            files.push(file?);
        }
        Ok(files)
    }

    fn batch_add(&self, file_ids: &[i64], tag_id: i64) -> AppResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut added_count = 0;

        for file_id in file_ids {
            let affected_rows = tx
                .execute(
                    "INSERT OR IGNORE INTO file_tags (file_id, tag_id) VALUES (?1, ?2)",
                    params![file_id, tag_id],
                )
                .map_err(|e| map_association_error(e, *file_id, tag_id))?;
            added_count += affected_rows;
        }

        tx.commit()?;
        debug!("batch_add: tagged {added_count} of {} files with tag {tag_id}", file_ids.len());
        Ok(added_count)
    }

    fn batch_remove(&self, file_ids: &[i64], tag_id: i64) -> AppResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut removed_count = 0;

        for file_id in file_ids {
            removed_count += tx.execute(
                "DELETE FROM file_tags WHERE file_id = ?1 AND tag_id = ?2",
                params![file_id, tag_id],
            )?;
        }

        tx.commit()?;
        debug!("batch_remove: untagged {removed_count} files from tag {tag_id}");
        Ok(removed_count)
    }

    fn pairs(&self) -> AppResult<Vec<FileTag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT file_id, tag_id FROM file_tags ORDER BY file_id, tag_id")?;
        let iter = stmt.query_map([], |row| {
            Ok(FileTag {
                file_id: row.get(0)?,
                tag_id: row.get(1)?,
            })
        })?;

        let mut all = Vec::new();
        for pair in iter {
            all.push(pair?);
        }
        Ok(all)
    }

    fn count(&self) -> AppResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM file_tags", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::errors::AppError;
    use crate::repositories::{FileRepository, SqliteFileRepository, SqliteTagRepository, TagRepository};
    use tempfile::NamedTempFile;

    fn create_test_db() -> (NamedTempFile, Database) {
        let _ = env_logger::builder().is_test(true).try_init();
        let db_file = NamedTempFile::new().unwrap();
        let db = Database::new(db_file.path()).unwrap();
        (db_file, db)
    }

    fn create_test_file(db: &Database, name: &str) -> i64 {
        SqliteFileRepository::new(db.connection())
            .insert(name)
            .unwrap()
    }

    fn create_test_tag(db: &Database, name: &str) -> i64 {
        SqliteTagRepository::new(db.connection())
            .insert(name)
            .unwrap()
    }

    #[test]
    fn test_add_and_remove() {
        let (_db_file, db) = create_test_db();
        let repo = SqliteFileTagRepository::new(db.connection());

        let file_id = create_test_file(&db, "model.zip");
        let tag_id = create_test_tag(&db, "vrchat");

        repo.add(file_id, tag_id).unwrap();
        assert!(repo.exists(file_id, tag_id).unwrap());

        assert!(repo.remove(file_id, tag_id).unwrap());
        assert!(!repo.exists(file_id, tag_id).unwrap());
    }

    #[test]
    fn test_duplicate_add_keeps_exactly_one_pairing() {
        let (_db_file, db) = create_test_db();
        let repo = SqliteFileTagRepository::new(db.connection());

        let file_id = create_test_file(&db, "model.zip");
        let tag_id = create_test_tag(&db, "vrchat");

        repo.add(file_id, tag_id).unwrap();
        repo.add(file_id, tag_id).unwrap();
        repo.add(file_id, tag_id).unwrap();

        assert_eq!(repo.count().unwrap(), 1);
        assert_eq!(repo.tags_for_file(file_id).unwrap().len(), 1);
        assert_eq!(repo.pairs().unwrap(), vec![FileTag { file_id, tag_id }]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (_db_file, db) = create_test_db();
        let repo = SqliteFileTagRepository::new(db.connection());

        // Removing from an empty store is a no-op, not an error.
        assert!(!repo.remove(1, 10).unwrap());
        assert_eq!(repo.count().unwrap(), 0);

        let file_id = create_test_file(&db, "model.zip");
        let tag_id = create_test_tag(&db, "vrchat");
        repo.add(file_id, tag_id).unwrap();

        assert!(repo.remove(file_id, tag_id).unwrap());
        assert!(!repo.remove(file_id, tag_id).unwrap());
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_add_with_missing_file_is_a_referential_violation() {
        let (_db_file, db) = create_test_db();
        let repo = SqliteFileTagRepository::new(db.connection());

        let tag_id = create_test_tag(&db, "vrchat");

        match repo.add(12345, tag_id) {
            Err(AppError::ReferentialViolation { file_id, tag_id: t }) => {
                assert_eq!(file_id, 12345);
                assert_eq!(t, tag_id);
            }
            other => panic!("expected ReferentialViolation, got {other:?}"),
        }
        // The failed add must not leave a pairing behind.
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_add_with_missing_tag_is_a_referential_violation() {
        let (_db_file, db) = create_test_db();
        let repo = SqliteFileTagRepository::new(db.connection());

        let file_id = create_test_file(&db, "model.zip");

        assert!(matches!(
            repo.add(file_id, 999),
            Err(AppError::ReferentialViolation { .. })
        ));
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_symmetry_of_lookups() {
        let (_db_file, db) = create_test_db();
        let repo = SqliteFileTagRepository::new(db.connection());

        let file_id = create_test_file(&db, "model.zip");
        let tag_id = create_test_tag(&db, "vrchat");
        repo.add(file_id, tag_id).unwrap();

        assert!(repo.tags_for_file(file_id).unwrap().contains(&tag_id));
        assert!(repo.files_for_tag(tag_id).unwrap().contains(&file_id));
    }

    #[test]
    fn test_lookup_scenario() {
        let (_db_file, db) = create_test_db();
        let repo = SqliteFileTagRepository::new(db.connection());

        let file1 = create_test_file(&db, "a.zip");
        let file2 = create_test_file(&db, "b.zip");
        let tag10 = create_test_tag(&db, "unity");
        let tag20 = create_test_tag(&db, "avatar");

        repo.add(file1, tag10).unwrap();
        repo.add(file1, tag20).unwrap();
        repo.add(file2, tag10).unwrap();

        assert_eq!(
            repo.tags_for_file(file1).unwrap(),
            HashSet::from([tag10, tag20])
        );
        assert_eq!(
            repo.files_for_tag(tag10).unwrap(),
            HashSet::from([file1, file2])
        );
        assert!(!repo.exists(file1, 99).unwrap());

        // Unknown ids read as empty sets, not errors.
        assert!(repo.tags_for_file(999).unwrap().is_empty());
        assert!(repo.files_for_tag(999).unwrap().is_empty());
    }

    #[test]
    fn test_joined_record_lookups() {
        let (_db_file, db) = create_test_db();
        let repo = SqliteFileTagRepository::new(db.connection());

        let file_id = create_test_file(&db, "model.zip");
        let avatar = create_test_tag(&db, "avatar");
        let unity = create_test_tag(&db, "unity");
        repo.add(file_id, unity).unwrap();
        repo.add(file_id, avatar).unwrap();

        let tags = repo.tag_records_for_file(file_id).unwrap();
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["avatar", "unity"]);

        let files = repo.file_records_for_tag(unity).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "model.zip");
    }

    #[test]
    fn test_batch_operations() {
        let (_db_file, db) = create_test_db();
        let repo = SqliteFileTagRepository::new(db.connection());

        let file1 = create_test_file(&db, "a.zip");
        let file2 = create_test_file(&db, "b.zip");
        let file3 = create_test_file(&db, "c.zip");
        let tag_id = create_test_tag(&db, "bulk");

        // file2 is tagged up front; batch_add only counts new pairings.
        repo.add(file2, tag_id).unwrap();
        let added = repo.batch_add(&[file1, file2, file3], tag_id).unwrap();
        assert_eq!(added, 2);
        assert_eq!(repo.files_for_tag(tag_id).unwrap().len(), 3);

        let removed = repo.batch_remove(&[file1, file2], tag_id).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(repo.files_for_tag(tag_id).unwrap(), HashSet::from([file3]));
    }

    #[test]
    fn test_batch_add_rolls_back_on_referential_violation() {
        let (_db_file, db) = create_test_db();
        let repo = SqliteFileTagRepository::new(db.connection());

        let file1 = create_test_file(&db, "a.zip");
        let tag_id = create_test_tag(&db, "bulk");

        let result = repo.batch_add(&[file1, 999], tag_id);
        assert!(matches!(
            result,
            Err(AppError::ReferentialViolation { .. })
        ));
        // The transaction dropped without commit, so file1 stays untagged.
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_deleting_a_file_cascades_its_pairings() {
        let (_db_file, db) = create_test_db();
        let repo = SqliteFileTagRepository::new(db.connection());
        let files = SqliteFileRepository::new(db.connection());

        let file_id = create_test_file(&db, "model.zip");
        let tag_id = create_test_tag(&db, "vrchat");
        repo.add(file_id, tag_id).unwrap();

        assert!(files.delete(file_id).unwrap());
        assert_eq!(repo.count().unwrap(), 0);
        // The tag itself survives.
        assert!(SqliteTagRepository::new(db.connection())
            .find_by_id(tag_id)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_deleting_a_tag_cascades_its_pairings() {
        let (_db_file, db) = create_test_db();
        let repo = SqliteFileTagRepository::new(db.connection());
        let tags = SqliteTagRepository::new(db.connection());

        let file_id = create_test_file(&db, "model.zip");
        let tag_id = create_test_tag(&db, "vrchat");
        repo.add(file_id, tag_id).unwrap();

        assert!(tags.delete(tag_id).unwrap());
        assert_eq!(repo.count().unwrap(), 0);
        assert!(SqliteFileRepository::new(db.connection())
            .find_by_id(file_id)
            .unwrap()
            .is_some());
    }
}
