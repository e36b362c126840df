//! Fehlertypen fuer den Signaling-Service

use duo_protocol::ProtokollFehler;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Frame nicht parsebar oder Pflichtfeld fehlt
    #[error("Ungueltiges Frame: {0}")]
    UngueltigesFrame(String),

    /// Anmelde-Frame mit unbekannter Rolle oder ohne Session-ID
    #[error("Ungueltige Anmeldung: {0}")]
    UngueltigeAnmeldung(String),

    /// IO-Fehler (Socket, Listener)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

impl SignalingError {
    /// Ordnet einen Parse-Fehler des Anmelde-Frames zu
    pub fn aus_anmeldung(fehler: ProtokollFehler) -> Self {
        match fehler {
            ProtokollFehler::Json(e) => Self::UngueltigesFrame(e.to_string()),
            andere => Self::UngueltigeAnmeldung(andere.to_string()),
        }
    }

    /// Ordnet einen Parse-Fehler eines Relay-Frames zu
    pub fn aus_frame(fehler: ProtokollFehler) -> Self {
        Self::UngueltigesFrame(fehler.to_string())
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
