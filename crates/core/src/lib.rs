//! duo-core – Gemeinsame Typen, Verbindungs-Handles und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die Chat-Relay und
//! Signaling-Endpunkt gemeinsam nutzen: Identitaeten und ihre feste
//! Peer-Beziehung, Session-IDs und Rollen sowie das Handle auf die
//! ausgehende Seite einer Client-Verbindung.

pub mod error;
pub mod types;
pub mod verbindung;

// Re-Exporte fuer bequemen Zugriff
pub use error::{DuoError, Result};
pub use types::{FestesPaar, Identitaet, PeerAufloesung, Rolle, SessionId};
pub use verbindung::{
    Schliessgrund, SendeStatus, VerbindungsEmpfaenger, VerbindungsHandle, VerbindungsId,
};
