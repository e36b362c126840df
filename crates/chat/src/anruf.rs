//! Videoanfragen zwischen den beiden Teilnehmern
//!
//! `/video` legt eine offene Anfrage beim Peer (Angerufener) ab, eine neue
//! Anfrage ersetzt eine unbeantwortete. `/acceptvideo` und `/declinevideo`
//! lesen und loeschen die Anfrage in einem Schritt. Beim Annehmen teilt der
//! Angerufene seine Kamera (Rolle sender), der Anfragende schaut zu
//! (Rolle viewer).

use dashmap::DashMap;
use duo_core::{Identitaet, Rolle, SessionId};
use std::sync::Arc;

use crate::error::ChatResult;
use crate::state::ChatState;

// ---------------------------------------------------------------------------
// AnrufTabelle
// ---------------------------------------------------------------------------

/// Offene Anfragen: Angerufener -> Anfragender
#[derive(Clone, Default)]
pub struct AnrufTabelle {
    offen: Arc<DashMap<Identitaet, Identitaet>>,
}

impl AnrufTabelle {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Legt eine Anfrage ab und gibt eine ersetzte zurueck
    pub fn setzen(&self, angerufener: Identitaet, anfragender: Identitaet) -> Option<Identitaet> {
        self.offen.insert(angerufener, anfragender)
    }

    /// Liest und loescht die Anfrage an `angerufener` atomar
    pub fn nehmen(&self, angerufener: &Identitaet) -> Option<Identitaet> {
        self.offen.remove(angerufener).map(|(_, anfragender)| anfragender)
    }

    pub fn verwerfen(&self, angerufener: &Identitaet) {
        self.offen.remove(angerufener);
    }

    #[cfg(test)]
    pub(crate) fn offen_fuer(&self, angerufener: &Identitaet) -> Option<Identitaet> {
        self.offen.get(angerufener).map(|e| e.value().clone())
    }
}

// ---------------------------------------------------------------------------
// Ergebnisse
// ---------------------------------------------------------------------------

/// Join-Links einer angenommenen Anfrage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnrufEinladung {
    pub sid: SessionId,
    /// Fuer den Angerufenen (teilt die Kamera)
    pub sender_url: String,
    /// Fuer den Anfragenden (schaut zu)
    pub viewer_url: String,
}

impl AnrufEinladung {
    pub fn neu(basis_url: &str, sid: SessionId) -> Self {
        Self {
            sender_url: join_url(basis_url, Rolle::Sender, &sid),
            viewer_url: join_url(basis_url, Rolle::Viewer, &sid),
            sid,
        }
    }
}

/// `<basis>/v/send?sid=…` bzw. `<basis>/v/view?sid=…`
pub fn join_url(basis_url: &str, rolle: Rolle, sid: &SessionId) -> String {
    let pfad = match rolle {
        Rolle::Sender => "send",
        Rolle::Viewer => "view",
    };
    format!("{}/v/{}?sid={}", basis_url.trim_end_matches('/'), pfad, sid)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnrufErgebnis {
    /// Anfrage liegt beim Peer
    Angefragt,
    /// Peer offline, nichts veraendert
    PeerOffline,
    Angenommen(AnrufEinladung),
    Abgelehnt,
    /// Annehmen/Ablehnen ohne offene Anfrage
    KeineAnfrage,
}

// ---------------------------------------------------------------------------
// Ablauf
// ---------------------------------------------------------------------------

impl ChatState {
    /// `anfragender` moechte die Kamera seines Peers sehen
    pub fn video_anfragen(&self, anfragender: &Identitaet) -> ChatResult<AnrufErgebnis> {
        let angerufener = self.peer_von(anfragender)?;

        if !self.presence.ist_online(&angerufener) {
            self.benachrichtigen(anfragender, "Peer offline; Video kann nicht gestartet werden.");
            return Ok(AnrufErgebnis::PeerOffline);
        }

        if let Some(alt) = self.anrufe.setzen(angerufener.clone(), anfragender.clone()) {
            tracing::debug!(angerufener = %angerufener, alt = %alt, "Unbeantwortete Videoanfrage ersetzt");
        }

        // Abmeldung zwischen Pruefung und Eintrag: Anfrage nicht liegen lassen
        if !self.presence.ist_online(&angerufener) {
            self.anrufe.verwerfen(&angerufener);
            self.benachrichtigen(anfragender, "Peer offline; Video kann nicht gestartet werden.");
            return Ok(AnrufErgebnis::PeerOffline);
        }

        self.benachrichtigen(
            &angerufener,
            &format!("{anfragender} moechte deine Kamera sehen. /acceptvideo oder /declinevideo eingeben."),
        );
        self.benachrichtigen(anfragender, &format!("Videoanfrage an {angerufener} gesendet."));
        tracing::info!(anfragender = %anfragender, angerufener = %angerufener, "Videoanfrage gestellt");
        Ok(AnrufErgebnis::Angefragt)
    }

    /// `angerufener` nimmt die offene Anfrage an
    pub fn video_annehmen(&self, angerufener: &Identitaet) -> AnrufErgebnis {
        let Some(anfragender) = self.anrufe.nehmen(angerufener) else {
            self.benachrichtigen(angerufener, "Keine offene Videoanfrage.");
            return AnrufErgebnis::KeineAnfrage;
        };

        let einladung = AnrufEinladung::neu(&self.config.video_basis_url, SessionId::generieren());

        self.benachrichtigen(
            angerufener,
            "Video angenommen. Diese URL oeffnen, um die Kamera zu teilen:",
        );
        self.benachrichtigen(angerufener, &einladung.sender_url);
        self.benachrichtigen(&anfragender, "Diese URL oeffnen, um die Kamera zu sehen:");
        self.benachrichtigen(&anfragender, &einladung.viewer_url);

        tracing::info!(
            sender = %angerufener,
            viewer = %anfragender,
            sid = %einladung.sid,
            "Videoanfrage angenommen"
        );
        AnrufErgebnis::Angenommen(einladung)
    }

    /// `angerufener` lehnt die offene Anfrage ab
    pub fn video_ablehnen(&self, angerufener: &Identitaet) -> AnrufErgebnis {
        let Some(anfragender) = self.anrufe.nehmen(angerufener) else {
            self.benachrichtigen(angerufener, "Keine offene Videoanfrage.");
            return AnrufErgebnis::KeineAnfrage;
        };

        self.benachrichtigen(
            &anfragender,
            &format!("{angerufener} hat deine Videoanfrage abgelehnt."),
        );
        self.benachrichtigen(angerufener, "Abgelehnt.");
        tracing::info!(angerufener = %angerufener, anfragender = %anfragender, "Videoanfrage abgelehnt");
        AnrufErgebnis::Abgelehnt
    }
}
