//! Gemeinsamer Zustand des Chat-Relays
//!
//! Ein `ChatState` wird einmal beim Start gebaut und als `Arc` an jede
//! Verbindung gereicht. Presence-Registry und Anruftabelle sind je eine
//! eigene Struktur; keine Operation haelt Locks ueber beide.

use duo_auth::AuthService;
use duo_core::{Identitaet, PeerAufloesung, VerbindungsId};
use duo_db::NachrichtenQueue;
use duo_observability::DuoMetrics;
use duo_protocol::chat::{self, Farbe};
use std::sync::Arc;

use crate::anruf::AnrufTabelle;
use crate::error::{ChatError, ChatResult};
use crate::presence::{ChatHandle, PresenceRegistry};

/// Laufzeit-Konfiguration des Chat-Relays
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Laengere Eingabezeilen beenden die Verbindung
    pub max_zeilenlaenge: usize,
    /// Kapazitaet der ausgehenden Queue pro Verbindung (in Zeilen)
    pub sende_queue_kapazitaet: usize,
    /// Basis fuer die Video-Links, z.B. `http://127.0.0.1:5001`
    pub video_basis_url: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_zeilenlaenge: 8192,
            sende_queue_kapazitaet: 1024,
            video_basis_url: "http://127.0.0.1:5001".to_string(),
        }
    }
}

pub struct ChatState {
    pub config: ChatConfig,
    pub paar: Arc<dyn PeerAufloesung>,
    pub presence: PresenceRegistry,
    pub anrufe: AnrufTabelle,
    pub queue: Arc<dyn NachrichtenQueue>,
    pub auth: AuthService,
    pub metriken: DuoMetrics,
}

impl ChatState {
    pub fn neu(
        config: ChatConfig,
        paar: Arc<dyn PeerAufloesung>,
        queue: Arc<dyn NachrichtenQueue>,
        auth: AuthService,
        metriken: DuoMetrics,
    ) -> Self {
        Self {
            config,
            paar,
            presence: PresenceRegistry::neu(),
            anrufe: AnrufTabelle::neu(),
            queue,
            auth,
            metriken,
        }
    }

    pub(crate) fn peer_von(&self, identitaet: &Identitaet) -> ChatResult<Identitaet> {
        self.paar
            .peer(identitaet)
            .ok_or_else(|| ChatError::UnbekannteIdentitaet(identitaet.to_string()))
    }

    pub fn farbe(&self, identitaet: &Identitaet) -> Farbe {
        Farbe::fuer_teilnehmer(self.paar.ist_erster(identitaet))
    }

    /// Schickt eine Systemmeldung, falls `identitaet` online ist
    ///
    /// Best effort: `false` wenn offline oder die Queue nicht annimmt.
    pub fn benachrichtigen(&self, identitaet: &Identitaet, text: &str) -> bool {
        match self.presence.nachschlagen(identitaet) {
            Some(handle) => handle.senden(chat::system(text)),
            None => false,
        }
    }

    /// Traegt eine Verbindung ein und verdraengt eine vorhandene
    pub fn anmelden(&self, identitaet: Identitaet, handle: ChatHandle) {
        let verbindung = handle.id();
        self.presence.registrieren(identitaet.clone(), handle);
        self.metriken
            .verbundene_clients
            .set(self.presence.online_anzahl() as i64);
        tracing::info!(identitaet = %identitaet, verbindung = %verbindung, "Teilnehmer angemeldet");
    }

    /// Meldet eine Verbindung ab
    ///
    /// Nur wenn der Registry-Eintrag noch dieser Verbindung gehoerte, wird
    /// die offene Videoanfrage an `identitaet` verworfen und der Peer
    /// informiert. Gibt zurueck, ob abgemeldet wurde.
    pub fn abmelden(&self, identitaet: &Identitaet, verbindung: VerbindungsId) -> bool {
        if !self.presence.abmelden(identitaet, verbindung) {
            tracing::debug!(
                identitaet = %identitaet,
                verbindung = %verbindung,
                "Abmelden ignoriert – Eintrag gehoert einer neueren Verbindung"
            );
            return false;
        }

        self.anrufe.verwerfen(identitaet);
        self.metriken
            .verbundene_clients
            .set(self.presence.online_anzahl() as i64);

        if let Some(peer) = self.paar.peer(identitaet) {
            self.benachrichtigen(&peer, &format!("{identitaet} hat den Chat verlassen."));
        }
        tracing::info!(identitaet = %identitaet, verbindung = %verbindung, "Teilnehmer abgemeldet");
        true
    }
}
