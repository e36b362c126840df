//! Fehlertypen fuer Duo
//!
//! Fehler beim Validieren der gemeinsamen Typen (Paar, Session-ID, Rolle).
//! Die uebrigen Crates definieren eigene Fehler-Enums.

use thiserror::Error;

/// Globaler Result-Alias fuer Duo
pub type Result<T> = std::result::Result<T, DuoError>;

/// Validierungsfehler der gemeinsamen Typen
#[derive(Debug, Error)]
pub enum DuoError {
    // --- Identitaeten ---
    #[error("Ungueltiges Identitaetspaar: {0}")]
    UngueltigesPaar(String),

    // --- Signaling ---
    #[error("Unbekannte Rolle: {0}")]
    UnbekannteRolle(String),

    #[error("Ungueltige Session-ID: {0}")]
    UngueltigeSessionId(String),
}
