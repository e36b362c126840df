//! Zeilen-Dispatcher – verarbeitet eine Eingabezeile eines Clients
//!
//! Vor dem Login wird nur `login` akzeptiert. Danach werden Slash-Befehle
//! an Relay und Videoanfragen weitergereicht, alles andere ist eine
//! Chat-Nachricht an den Peer.

use duo_core::Identitaet;
use duo_protocol::chat::{self, Befehl, VorLogin, MAX_NACHRICHTENLAENGE};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::anruf::AnrufErgebnis;
use crate::presence::ChatHandle;
use crate::relay::SendeErgebnis;
use crate::state::ChatState;

/// Was die Verbindung nach einer Zeile tun soll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aktion {
    /// Text direkt an den eigenen Client schreiben (darf leer sein),
    /// danach Queue leeren und Prompt zeigen
    Antworten(String),
    Beenden,
}

/// Zustand einer einzelnen Verbindung
pub struct DispatcherKontext {
    pub peer_addr: SocketAddr,
    /// Handle der eigenen ausgehenden Queue
    pub handle: ChatHandle,
    /// Gesetzt nach erfolgreichem Login
    pub identitaet: Option<Identitaet>,
}

pub struct ZeilenDispatcher {
    state: Arc<ChatState>,
}

impl ZeilenDispatcher {
    pub fn neu(state: Arc<ChatState>) -> Self {
        Self { state }
    }

    pub async fn verarbeiten(&self, zeile: &str, ctx: &mut DispatcherKontext) -> Aktion {
        match ctx.identitaet.clone() {
            None => self.vor_login(zeile, ctx).await,
            Some(identitaet) => self.befehl(&identitaet, zeile).await,
        }
    }

    /// Prompt passend zum Login-Zustand
    pub fn prompt(&self, ctx: &DispatcherKontext) -> String {
        match &ctx.identitaet {
            Some(id) => chat::prompt(self.state.farbe(id)),
            None => chat::system_prompt(),
        }
    }

    // -----------------------------------------------------------------------
    // Vor dem Login
    // -----------------------------------------------------------------------

    async fn vor_login(&self, zeile: &str, ctx: &mut DispatcherKontext) -> Aktion {
        let (name, passwort) = match chat::vor_login_parsen(zeile) {
            VorLogin::Login { name, passwort } => (name, passwort),
            VorLogin::Unvollstaendig => {
                return Aktion::Antworten(chat::system("Verwendung: login <name> <passwort>"));
            }
            VorLogin::Sonstiges => {
                return Aktion::Antworten(chat::system(
                    "Bitte zuerst anmelden:  login <name> <passwort>",
                ));
            }
        };

        let identitaet = Identitaet::neu(name.as_str());
        if !self.state.paar.ist_bekannt(&identitaet) {
            let [a, b] = self.state.paar.identitaeten();
            return Aktion::Antworten(chat::system(&format!("Nur {a} und {b} sind erlaubt.")));
        }

        match self.state.auth.anmelden(&name, &passwort).await {
            Ok(()) => {}
            Err(duo_auth::AuthError::UngueltigeAnmeldedaten) => {
                tracing::warn!(peer = %ctx.peer_addr, identitaet = %identitaet, "Anmeldung abgelehnt");
                return Aktion::Antworten(chat::system("Ungueltige Anmeldedaten."));
            }
            Err(e) => {
                tracing::error!(peer = %ctx.peer_addr, fehler = %e, "Anmeldung fehlgeschlagen");
                return Aktion::Antworten(chat::system("Anmeldung derzeit nicht moeglich."));
            }
        }

        self.state.anmelden(identitaet.clone(), ctx.handle.clone());
        ctx.identitaet = Some(identitaet.clone());

        let mut antwort = chat::system(&format!(
            "Angemeldet als {identitaet}. Nachricht eintippen, /quit zum Beenden."
        ));

        // Landet in der eigenen Queue und wird nach der Bestaetigung geschrieben
        if let Err(e) = self.state.rueckstand_zustellen(&identitaet).await {
            tracing::error!(identitaet = %identitaet, fehler = %e, "Rueckstand nicht zustellbar");
            antwort.push_str(&chat::system("Verpasste Nachrichten konnten nicht geladen werden."));
        }

        if let Ok(peer) = self.state.peer_von(&identitaet) {
            self.state
                .benachrichtigen(&peer, &format!("{identitaet} ist beigetreten."));
        }

        Aktion::Antworten(antwort)
    }

    // -----------------------------------------------------------------------
    // Nach dem Login
    // -----------------------------------------------------------------------

    async fn befehl(&self, identitaet: &Identitaet, zeile: &str) -> Aktion {
        match chat::befehl_parsen(zeile) {
            Befehl::Beenden => Aktion::Beenden,
            Befehl::Leer => Aktion::Antworten(String::new()),
            Befehl::Verlauf(anzahl) => match self.state.verlauf(anzahl).await {
                Ok(zeilen) => Aktion::Antworten(zeilen.concat()),
                Err(e) => {
                    tracing::error!(identitaet = %identitaet, fehler = %e, "Verlauf nicht ladbar");
                    Aktion::Antworten(chat::system("Verlauf konnte nicht geladen werden."))
                }
            },
            Befehl::VideoAnfragen => {
                if let Err(e) = self.state.video_anfragen(identitaet) {
                    tracing::error!(identitaet = %identitaet, fehler = %e, "Videoanfrage fehlgeschlagen");
                }
                Aktion::Antworten(String::new())
            }
            Befehl::VideoAnnehmen => {
                if let AnrufErgebnis::Angenommen(einladung) = self.state.video_annehmen(identitaet) {
                    tracing::debug!(sid = %einladung.sid, "Einladung verschickt");
                }
                Aktion::Antworten(String::new())
            }
            Befehl::VideoAblehnen => {
                self.state.video_ablehnen(identitaet);
                Aktion::Antworten(String::new())
            }
            Befehl::Nachricht(text) => Aktion::Antworten(self.nachricht(identitaet, &text).await),
        }
    }

    async fn nachricht(&self, identitaet: &Identitaet, text: &str) -> String {
        if text.chars().count() > MAX_NACHRICHTENLAENGE {
            return chat::system(&format!(
                "Nachricht zu lang (maximal {MAX_NACHRICHTENLAENGE} Zeichen)."
            ));
        }

        match self.state.senden(identitaet, text).await {
            Ok(SendeErgebnis::Zugestellt) => String::new(),
            Ok(SendeErgebnis::PeerOffline) => {
                chat::system("Peer ist offline (Nachricht gespeichert).")
            }
            Ok(SendeErgebnis::Zurueckgestellt) => chat::system(
                "Peer kommt nicht nach (Nachricht gespeichert, wird nach erneutem Login zugestellt).",
            ),
            Err(_) => chat::system("Nachricht konnte nicht gespeichert werden."),
        }
    }
}
