//! Repository-Trait-Definitionen
//!
//! Die Traits sind objekt-sicher (`async_trait`), damit die Dienste sie als
//! `Arc<dyn …>` halten und in Tests gegen Doubles austauschen koennen.

use async_trait::async_trait;

use crate::error::DbError;
use crate::models::{BenutzerRecord, NachrichtRecord, NeueNachricht, NeuerBenutzer};

pub type DbResult<T> = Result<T, DbError>;

/// Konfiguration fuer die Datenbankverbindung
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Verbindungs-URL (z.B. "sqlite://chat.db")
    pub url: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen im Pool
    pub max_verbindungen: u32,
    /// Ob WAL-Modus aktiviert werden soll
    pub sqlite_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://chat.db".into(),
            max_verbindungen: 5,
            sqlite_wal: true,
        }
    }
}

/// Dauerhafte Nachrichten-Queue
///
/// Zustellung ist at-least-once: eine Nachricht kann erneut nachgereicht
/// werden, wenn das Markieren nach dem Schreiben scheitert.
#[async_trait]
pub trait NachrichtenQueue: Send + Sync {
    /// Speichert eine Nachricht als unzugestellt und gibt ihren Datensatz zurueck
    async fn einreihen(&self, nachricht: NeueNachricht<'_>) -> DbResult<NachrichtRecord>;

    /// Setzt `delivered` fuer alle IDs; leere Menge ist ein No-op
    async fn als_zugestellt_markieren(&self, ids: &[i64]) -> DbResult<u64>;

    /// Alle unzugestellten Nachrichten an `empfaenger`, aelteste zuerst
    async fn unzugestellte_laden(&self, empfaenger: &str) -> DbResult<Vec<NachrichtRecord>>;

    /// Die letzten `limit` Nachrichten, neueste zuerst
    async fn verlauf_laden(&self, limit: u32) -> DbResult<Vec<NachrichtRecord>>;
}

/// Benutzerkonten
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, data: NeuerBenutzer<'_>) -> DbResult<BenutzerRecord>;

    async fn get_by_name(&self, username: &str) -> DbResult<Option<BenutzerRecord>>;
}
