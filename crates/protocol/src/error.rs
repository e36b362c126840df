//! Fehlertypen fuer das Protokoll-Crate

use thiserror::Error;

/// Fehler beim Parsen eingehender Frames
#[derive(Debug, Error)]
pub enum ProtokollFehler {
    /// Frame ist kein gueltiges JSON oder hat die falsche Form
    #[error("Ungueltiges JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pflichtfeld fehlt (z.B. `sdp` bei offer)
    #[error("Pflichtfeld fehlt: {0}")]
    FeldFehlt(&'static str),

    /// Rolle ist weder sender noch viewer
    #[error("Unbekannte Rolle: {0}")]
    UnbekannteRolle(String),

    /// Session-ID fehlt oder ist leer
    #[error("Session-ID fehlt")]
    SessionIdFehlt,
}

pub type ProtokollResult<T> = Result<T, ProtokollFehler>;
