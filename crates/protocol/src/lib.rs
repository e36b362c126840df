//! duo-protocol – Protokoll-Definitionen
//!
//! Zwei Transporte, zwei Module:
//! - `chat`:   zeilenbasiertes Textprotokoll (Befehle parsen, ANSI-Zeilen formatieren)
//! - `signal`: JSON-Frames fuer den WebRTC-Signaling-Endpunkt

pub mod chat;
pub mod error;
pub mod signal;

pub use chat::{Befehl, Farbe, VorLogin};
pub use error::{ProtokollFehler, ProtokollResult};
pub use signal::{Anmeldung, EingehendesFrame, SignalNachricht};
