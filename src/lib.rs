use anyhow::Result;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

mod config;
pub mod database;
pub mod errors;
pub mod repositories;

use crate::config::app;
pub use database::{Database, FileRecord, FileTag, Tag};
pub use errors::{AppError, AppResult, ErrorCategory};
pub use repositories::{
    FileRepository, FileTagRepository, SqliteFileRepository, SqliteFileTagRepository,
    SqliteTagRepository, TagRepository,
};

// Shared application state. The mutex serializes in-process callers per
// operation; nothing is held across operations.
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
}

impl AppState {
    /// Open the database in the platform data directory, creating it on
    /// first use.
    pub fn new() -> Result<Self> {
        let app_data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(app::DATA_DIR_NAME);

        if !app_data_dir.exists() {
            std::fs::create_dir_all(&app_data_dir)?;
        }

        let db_path = app_data_dir.join(app::DATABASE_FILENAME);
        let db = Database::new(&db_path)?;

        Ok(AppState {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// State backed by a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        Ok(AppState {
            db: Arc::new(Mutex::new(Database::open_in_memory()?)),
        })
    }
}
