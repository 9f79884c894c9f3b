//! Persistent storage: archived originals and document records

pub mod archive;
pub mod database;

pub use archive::ArchiveStore;
pub use database::{DocumentRepository, SqliteDocumentRepository};
