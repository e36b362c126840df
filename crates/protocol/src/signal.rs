//! Signaling-Frames (JSON ueber WebSocket)
//!
//! Erster Frame einer Verbindung ist die Anmeldung `{"role", "sid"}`,
//! danach fliessen `offer`, `answer` und `ice` in beide Richtungen.
//! Unbekannte `type`-Werte werden toleriert und vom Aufrufer ignoriert.

use duo_core::{Rolle, SessionId};
use serde::{Deserialize, Serialize};

use crate::error::{ProtokollFehler, ProtokollResult};

// ---------------------------------------------------------------------------
// Anmeldung
// ---------------------------------------------------------------------------

/// Anmelde-Frame wie er auf dem Draht steht
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anmeldung {
    pub role: String,
    pub sid: String,
}

impl Anmeldung {
    /// Parst und validiert den Anmelde-Frame
    pub fn parsen(text: &str) -> ProtokollResult<(Rolle, SessionId)> {
        let roh: Anmeldung = serde_json::from_str(text)?;
        let rolle = roh
            .role
            .parse::<Rolle>()
            .map_err(|_| ProtokollFehler::UnbekannteRolle(roh.role.clone()))?;
        let sid = SessionId::parsen(&roh.sid).map_err(|_| ProtokollFehler::SessionIdFehlt)?;
        Ok((rolle, sid))
    }
}

// ---------------------------------------------------------------------------
// Relay-Nachrichten
// ---------------------------------------------------------------------------

/// Weiterzuleitende Signaling-Nachricht
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignalNachricht {
    Offer { sdp: String },
    Answer { sdp: String },
    /// Kandidat bleibt opak und wird unveraendert weitergegeben
    Ice { candidate: serde_json::Value },
}

impl SignalNachricht {
    /// Rolle, von der diese Nachricht stammen darf (`None`: beide)
    pub fn erlaubte_quelle(&self) -> Option<Rolle> {
        match self {
            Self::Offer { .. } => Some(Rolle::Sender),
            Self::Answer { .. } => Some(Rolle::Viewer),
            Self::Ice { .. } => None,
        }
    }

    pub fn typ(&self) -> &'static str {
        match self {
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::Ice { .. } => "ice",
        }
    }

    pub fn to_json(&self) -> ProtokollResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Ergebnis des Parsens eines Relay-Frames
#[derive(Debug, Clone, PartialEq)]
pub enum EingehendesFrame {
    Nachricht(SignalNachricht),
    /// Unbekannter oder fehlender `type`
    Unbekannt(String),
}

#[derive(Deserialize)]
struct RohFrame {
    #[serde(rename = "type", default)]
    typ: String,
    #[serde(default)]
    sdp: Option<String>,
    #[serde(default)]
    candidate: Option<serde_json::Value>,
}

impl EingehendesFrame {
    /// Parst einen Relay-Frame
    ///
    /// Ungueltiges JSON oder ein fehlendes Pflichtfeld ist ein Fehler,
    /// ein unbekannter Typ nicht.
    pub fn parsen(text: &str) -> ProtokollResult<Self> {
        let roh: RohFrame = serde_json::from_str(text)?;
        let nachricht = match roh.typ.as_str() {
            "offer" => SignalNachricht::Offer {
                sdp: roh.sdp.ok_or(ProtokollFehler::FeldFehlt("sdp"))?,
            },
            "answer" => SignalNachricht::Answer {
                sdp: roh.sdp.ok_or(ProtokollFehler::FeldFehlt("sdp"))?,
            },
            "ice" => SignalNachricht::Ice {
                candidate: roh
                    .candidate
                    .filter(|c| !c.is_null())
                    .ok_or(ProtokollFehler::FeldFehlt("candidate"))?,
            },
            _ => return Ok(Self::Unbekannt(roh.typ)),
        };
        Ok(Self::Nachricht(nachricht))
    }
}
