//! Nachrichten-Relay zwischen den beiden Teilnehmern
//!
//! Jede Nachricht wird zuerst in der Queue gespeichert und erst dann
//! zugestellt. Ist der Peer offline, bleibt sie unzugestellt liegen und wird
//! beim naechsten Anmelden als "verpasst" nachgereicht.
//!
//! Nimmt die Verbindung des Peers nichts mehr an, wird sie getrennt. Die
//! Nachricht und alle folgenden bleiben dann ebenfalls liegen und kommen
//! beim naechsten Anmelden in Sendereihenfolge an.
//!
//! Zustellung ist at-least-once: scheitert das Markieren nach erfolgreicher
//! Zustellung, wird die Nachricht beim naechsten Anmelden erneut gezeigt.

use duo_core::{Identitaet, Schliessgrund, SendeStatus};
use duo_db::models::NeueNachricht;
use duo_observability::metrics::{
    NACHRICHT_FEHLER, NACHRICHT_OFFLINE, NACHRICHT_ZUGESTELLT, NACHRICHT_ZURUECKGESTELLT,
};
use duo_protocol::chat;

use crate::error::{ChatError, ChatResult};
use crate::state::ChatState;

/// Ausgang eines Sendeversuchs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendeErgebnis {
    /// An die Verbindung des Peers uebergeben und als zugestellt markiert
    Zugestellt,
    /// Peer nicht angemeldet; gespeichert, aber nicht zugestellt
    PeerOffline,
    /// Peer angemeldet, aber seine Queue war voll; Verbindung getrennt,
    /// Nachricht gespeichert
    Zurueckgestellt,
}

impl ChatState {
    /// Sendet `text` von `von` an dessen Peer
    pub async fn senden(&self, von: &Identitaet, text: &str) -> ChatResult<SendeErgebnis> {
        let peer = self.peer_von(von)?;

        let record = match self
            .queue
            .einreihen(NeueNachricht {
                sender: von.als_str(),
                recipient: peer.als_str(),
                text,
            })
            .await
        {
            Ok(record) => record,
            Err(e) => {
                self.metriken.nachricht_zaehlen(NACHRICHT_FEHLER);
                tracing::error!(von = %von, fehler = %e, "Nachricht konnte nicht gespeichert werden");
                return Err(ChatError::Persistenz(e));
            }
        };

        let status = match self.presence.nachschlagen(&peer) {
            Some(handle) => {
                let status = handle.einreihen(chat::nachricht(
                    self.farbe(von),
                    &record.created_at,
                    von.als_str(),
                    text,
                ));
                if status == SendeStatus::Voll {
                    handle.schliessen_wegen(Schliessgrund::Ueberlastet);
                }
                Some(status)
            }
            None => None,
        };

        match status {
            Some(SendeStatus::Angenommen) => {}
            Some(SendeStatus::Voll) => {
                self.metriken.nachricht_zaehlen(NACHRICHT_ZURUECKGESTELLT);
                tracing::warn!(
                    von = %von,
                    an = %peer,
                    id = record.id,
                    "Peer kommt nicht nach – Verbindung getrennt, Nachricht bleibt in der Queue"
                );
                return Ok(SendeErgebnis::Zurueckgestellt);
            }
            // Geschlossen: Verbindungs-Task endet gerade, Abmelden folgt
            Some(SendeStatus::Geschlossen) | None => {
                self.metriken.nachricht_zaehlen(NACHRICHT_OFFLINE);
                tracing::debug!(von = %von, an = %peer, id = record.id, "Peer offline – Nachricht bleibt in der Queue");
                return Ok(SendeErgebnis::PeerOffline);
            }
        }

        if let Err(e) = self.queue.als_zugestellt_markieren(&[record.id]).await {
            tracing::warn!(
                id = record.id,
                fehler = %e,
                "Markieren fehlgeschlagen – Nachricht wird erneut nachgereicht"
            );
        }
        self.metriken.nachricht_zaehlen(NACHRICHT_ZUGESTELLT);
        tracing::trace!(von = %von, an = %peer, id = record.id, "Nachricht zugestellt");
        Ok(SendeErgebnis::Zugestellt)
    }

    /// Reicht alle unzugestellten Nachrichten an `identitaet` nach
    ///
    /// No-op wenn `identitaet` nicht angemeldet ist. Gibt die Anzahl der
    /// nachgereichten Nachrichten zurueck.
    pub async fn rueckstand_zustellen(&self, identitaet: &Identitaet) -> ChatResult<usize> {
        let Some(handle) = self.presence.nachschlagen(identitaet) else {
            return Ok(0);
        };

        let offen = self.queue.unzugestellte_laden(identitaet.als_str()).await?;

        let mut ids = Vec::with_capacity(offen.len());
        for nachricht in &offen {
            let sender = Identitaet::neu(nachricht.sender.as_str());
            let zeile = chat::verpasst(
                self.farbe(&sender),
                &nachricht.created_at,
                &nachricht.sender,
                &nachricht.text,
            );
            // Was nicht in die Queue passt, bleibt fuer die naechste Anmeldung liegen
            if !handle.senden(zeile) {
                break;
            }
            ids.push(nachricht.id);
        }

        if ids.is_empty() {
            return Ok(0);
        }

        handle.senden(chat::system(&format!(
            "Du hattest {} Offline-Nachricht(en).",
            ids.len()
        )));
        self.queue.als_zugestellt_markieren(&ids).await?;
        self.metriken.verpasste_zugestellt_total.inc_by(ids.len() as u64);

        tracing::info!(identitaet = %identitaet, anzahl = ids.len(), "Rueckstand nachgereicht");
        Ok(ids.len())
    }

    /// Die letzten `anzahl` Nachrichten als formatierte Zeilen, aelteste zuerst
    pub async fn verlauf(&self, anzahl: usize) -> ChatResult<Vec<String>> {
        let limit = u32::try_from(anzahl).unwrap_or(u32::MAX);
        let mut nachrichten = self.queue.verlauf_laden(limit).await?;
        nachrichten.reverse();

        Ok(nachrichten
            .iter()
            .map(|n| {
                let sender = Identitaet::neu(n.sender.as_str());
                chat::nachricht(self.farbe(&sender), &n.created_at, &n.sender, &n.text)
            })
            .collect())
    }
}
