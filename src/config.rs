// Configuration constants for the file tagger
// This module centralizes magic numbers and hardcoded strings

/// Application configuration constants
pub mod app {
    /// Name of the application data directory
    pub const DATA_DIR_NAME: &str = "FileTagger";

    /// Database file name
    pub const DATABASE_FILENAME: &str = "file_tagger.db";
}

/// Tag-related configuration constants
pub mod tags {
    /// Maximum allowed length for tag names
    pub const MAX_TAG_LENGTH: usize = 50;
}

/// Database configuration constants
pub mod database {
    /// Files table name
    pub const FILES_TABLE: &str = "files";

    /// Tags table name
    pub const TAGS_TABLE: &str = "tags";

    /// File-tags junction table name
    pub const FILE_TAGS_TABLE: &str = "file_tags";

    /// How long a writer waits on a locked database before failing
    pub const BUSY_TIMEOUT_MS: u64 = 5000;
}
