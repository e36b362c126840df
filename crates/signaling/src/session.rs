//! Signaling-Sitzung – Zustandsmaschine einer einzelnen Session-ID
//!
//! Jede Rolle hat hoechstens eine Verbindung. Fehlt die Gegenrolle, werden
//! Nachrichten zwischengespeichert: Offer und Answer nur der jeweils letzte
//! Wert, ICE-Kandidaten pro Richtung in Sendereihenfolge. Beim Anmelden
//! einer Rolle wird ihr Anteil sofort zugestellt und geleert.
//!
//! Alle Operationen laufen unter dem Mutex der Sitzung und senden nur
//! nicht-blockierend in die Queue der Zielverbindung. Nimmt eine belegte
//! Zielverbindung nichts mehr an, wird sie geschlossen und ihr Slot
//! freigegeben: alles Weitere landet im Zwischenspeicher und erreicht die
//! naechste Verbindung dieser Rolle in Sendereihenfolge.

use duo_core::{Rolle, Schliessgrund, SendeStatus, SessionId, VerbindungsHandle, VerbindungsId};
use duo_protocol::SignalNachricht;
use std::collections::VecDeque;

/// Handle auf die ausgehende Queue einer WebSocket-Verbindung
pub type SignalHandle = VerbindungsHandle<SignalNachricht>;

/// Was mit einer eingehenden Nachricht passiert ist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingErgebnis {
    /// An die Gegenrolle uebergeben
    Weitergeleitet,
    /// Gegenrolle fehlt oder nimmt nichts an, Nachricht gespeichert
    Eingereiht,
    /// Falsche Richtung (z.B. answer vom sender)
    Verworfen,
}

#[derive(Debug)]
pub struct SignalSitzung {
    sid: SessionId,
    sender: Option<SignalHandle>,
    viewer: Option<SignalHandle>,
    offer: Option<SignalNachricht>,
    answer: Option<SignalNachricht>,
    ice_von_sender: VecDeque<SignalNachricht>,
    ice_von_viewer: VecDeque<SignalNachricht>,
}

impl SignalSitzung {
    pub fn neu(sid: SessionId) -> Self {
        Self {
            sid,
            sender: None,
            viewer: None,
            offer: None,
            answer: None,
            ice_von_sender: VecDeque::new(),
            ice_von_viewer: VecDeque::new(),
        }
    }

    pub fn sid(&self) -> &SessionId {
        &self.sid
    }

    fn slot(&mut self, rolle: Rolle) -> &mut Option<SignalHandle> {
        match rolle {
            Rolle::Sender => &mut self.sender,
            Rolle::Viewer => &mut self.viewer,
        }
    }

    /// ICE-Queue fuer Kandidaten, die von `quelle` stammen
    fn ice_queue(&mut self, quelle: Rolle) -> &mut VecDeque<SignalNachricht> {
        match quelle {
            Rolle::Sender => &mut self.ice_von_sender,
            Rolle::Viewer => &mut self.ice_von_viewer,
        }
    }

    pub fn ist_belegt(&self, rolle: Rolle) -> bool {
        match rolle {
            Rolle::Sender => self.sender.is_some(),
            Rolle::Viewer => self.viewer.is_some(),
        }
    }

    /// Verbindung, die den Slot von `rolle` haelt
    pub fn verbindung(&self, rolle: Rolle) -> Option<VerbindungsId> {
        match rolle {
            Rolle::Sender => self.sender.as_ref().map(|h| h.id()),
            Rolle::Viewer => self.viewer.as_ref().map(|h| h.id()),
        }
    }

    pub fn hat_offer(&self) -> bool {
        self.offer.is_some()
    }

    pub fn hat_answer(&self) -> bool {
        self.answer.is_some()
    }

    /// Anzahl wartender ICE-Kandidaten, die von `quelle` stammen
    pub fn wartende_ice(&self, quelle: Rolle) -> usize {
        match quelle {
            Rolle::Sender => self.ice_von_sender.len(),
            Rolle::Viewer => self.ice_von_viewer.len(),
        }
    }

    /// Belegt den Slot von `rolle` und stellt Wartendes zu
    ///
    /// Eine vorherige Verbindung derselben Rolle wird geschlossen und
    /// zurueckgegeben.
    pub fn anmelden(&mut self, rolle: Rolle, handle: SignalHandle) -> Option<SignalHandle> {
        let alt = self.slot(rolle).replace(handle.clone());
        if let Some(alt) = &alt {
            alt.schliessen();
            tracing::warn!(
                sid = %self.sid,
                rolle = %rolle,
                alt = %alt.id(),
                neu = %handle.id(),
                "Rolle neu belegt – alte Verbindung verdraengt"
            );
        }

        if let Err(status) = self.zustellen(rolle, &handle) {
            self.slot_freigeben(rolle, status);
        }
        alt
    }

    /// Leert die Zwischenspeicher, die fuer `rolle` bestimmt sind
    ///
    /// Was die Queue nicht annimmt, bleibt fuer die naechste Anmeldung liegen.
    fn zustellen(&mut self, rolle: Rolle, handle: &SignalHandle) -> Result<(), SendeStatus> {
        let cache = match rolle {
            Rolle::Viewer => &mut self.offer,
            Rolle::Sender => &mut self.answer,
        };
        if let Some(nachricht) = cache.take() {
            let status = handle.einreihen(nachricht.clone());
            if status != SendeStatus::Angenommen {
                *cache = Some(nachricht);
                return Err(status);
            }
        }

        let sid = self.sid.clone();
        let queue = self.ice_queue(rolle.gegenueber());
        let mut zugestellt = 0usize;
        let mut ergebnis = Ok(());
        while let Some(kandidat) = queue.pop_front() {
            let status = handle.einreihen(kandidat.clone());
            if status != SendeStatus::Angenommen {
                queue.push_front(kandidat);
                ergebnis = Err(status);
                break;
            }
            zugestellt += 1;
        }

        if zugestellt > 0 {
            tracing::debug!(sid = %sid, rolle = %rolle, anzahl = zugestellt, "Wartende ICE-Kandidaten zugestellt");
        }
        ergebnis
    }

    /// Schliesst die Verbindung von `rolle`, die eine Nachricht abgewiesen hat
    fn slot_freigeben(&mut self, rolle: Rolle, status: SendeStatus) {
        let sid = self.sid.clone();
        let Some(handle) = self.slot(rolle).take() else {
            return;
        };
        handle.schliessen_wegen(Schliessgrund::Ueberlastet);

        if status == SendeStatus::Voll {
            tracing::warn!(
                sid = %sid,
                rolle = %rolle,
                verbindung = %handle.id(),
                "Send-Queue voll – Verbindung getrennt, Nachrichten werden zwischengespeichert"
            );
        } else {
            tracing::debug!(sid = %sid, rolle = %rolle, verbindung = %handle.id(), "Zielverbindung bereits beendet");
        }
    }

    /// Gibt den Slot frei, sofern ihn noch `verbindung` haelt
    ///
    /// Gegenrolle und Zwischenspeicher bleiben unberuehrt.
    pub fn abmelden(&mut self, rolle: Rolle, verbindung: VerbindungsId) -> bool {
        let slot = self.slot(rolle);
        if slot.as_ref().map(|h| h.id()) != Some(verbindung) {
            return false;
        }
        *slot = None;
        true
    }

    /// Leitet eine Nachricht von `quelle` an die Gegenrolle weiter
    pub fn routen(&mut self, quelle: Rolle, nachricht: SignalNachricht) -> RoutingErgebnis {
        if let Some(erlaubt) = nachricht.erlaubte_quelle() {
            if erlaubt != quelle {
                return RoutingErgebnis::Verworfen;
            }
        }

        let ziel = quelle.gegenueber();
        let status = self.slot(ziel).as_ref().map(|h| h.einreihen(nachricht.clone()));
        match status {
            Some(SendeStatus::Angenommen) => return RoutingErgebnis::Weitergeleitet,
            Some(status) => self.slot_freigeben(ziel, status),
            None => {}
        }

        match nachricht {
            SignalNachricht::Offer { .. } => self.offer = Some(nachricht),
            SignalNachricht::Answer { .. } => self.answer = Some(nachricht),
            SignalNachricht::Ice { .. } => self.ice_queue(quelle).push_back(nachricht),
        }
        RoutingErgebnis::Eingereiht
    }
}
