//! Datenbankmodelle fuer Duo
//!
//! Reine Datenuebertragungsobjekte, getrennt von den Domain-Typen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Benutzer-Datensatz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenutzerRecord {
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Daten zum Erstellen eines neuen Benutzers
#[derive(Debug, Clone)]
pub struct NeuerBenutzer<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
}

/// Gespeicherte Chat-Nachricht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NachrichtRecord {
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub delivered: bool,
}

/// Daten zum Einreihen einer Nachricht
#[derive(Debug, Clone, Copy)]
pub struct NeueNachricht<'a> {
    pub sender: &'a str,
    pub recipient: &'a str,
    pub text: &'a str,
}
