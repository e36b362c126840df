//! duo-chat – Chat-Relay zwischen zwei festen Teilnehmern
//!
//! Dieses Crate implementiert:
//! - PresenceRegistry: hoechstens eine aktive Verbindung pro Identitaet
//! - Nachrichten-Relay: erst speichern, dann zustellen; Rueckstand beim Anmelden
//! - Videoanfragen: anfragen / annehmen / ablehnen, erzeugt Session-IDs
//! - Zeilen-Dispatcher und TCP-Server fuer das Textprotokoll
//!
//! Der gesamte geteilte Zustand liegt in einem `ChatState`, der einmal beim
//! Start gebaut und als `Arc` an jede Verbindung gereicht wird.

pub mod anruf;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod presence;
pub mod relay;
pub mod state;
pub mod tcp;

#[cfg(test)]
mod tests;

pub use anruf::{AnrufEinladung, AnrufErgebnis, AnrufTabelle};
pub use connection::ChatVerbindung;
pub use dispatcher::{Aktion, DispatcherKontext, ZeilenDispatcher};
pub use error::{ChatError, ChatResult};
pub use presence::{ChatHandle, PresenceRegistry};
pub use relay::SendeErgebnis;
pub use state::{ChatConfig, ChatState};
pub use tcp::ChatServer;
