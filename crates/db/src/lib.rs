//! duo-db – Persistenz
//!
//! Repository-Traits fuer die Nachrichten-Queue und die Benutzerkonten,
//! implementiert fuer SQLite. Die Geschaeftslogik kennt nur die Traits.

pub mod error;
pub mod models;
pub mod repository;
pub mod sqlite;

pub use error::DbError;
pub use repository::{DatabaseConfig, DbResult, NachrichtenQueue, UserRepository};
pub use sqlite::SqliteDb;
