// Repository pattern implementation: one trait per table responsibility

pub mod file_repository;
pub mod tag_repository;
pub mod file_tag_repository;

pub use file_repository::{FileRepository, SqliteFileRepository};
pub use tag_repository::{SqliteTagRepository, TagRepository};
pub use file_tag_repository::{FileTagRepository, SqliteFileTagRepository};
