//! Sitzungstabelle – SessionId -> SignalSitzung
//!
//! Sitzungen entstehen beim ersten Anmelden einer Rolle und werden nie
//! automatisch entfernt. Der DashMap-Guard wird vor dem Sperren der
//! Sitzung freigegeben; pro Operation ist genau ein Sitzungs-Mutex gesperrt.

use dashmap::{mapref::entry::Entry, DashMap};
use duo_core::{Rolle, SessionId, VerbindungsId};
use duo_observability::metrics::{FRAME_EINGEREIHT, FRAME_VERWORFEN, FRAME_WEITERGELEITET};
use duo_observability::DuoMetrics;
use duo_protocol::SignalNachricht;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::session::{RoutingErgebnis, SignalHandle, SignalSitzung};

#[derive(Clone)]
pub struct SitzungsTabelle {
    sitzungen: Arc<DashMap<SessionId, Arc<Mutex<SignalSitzung>>>>,
    metriken: DuoMetrics,
}

impl SitzungsTabelle {
    pub fn neu(metriken: DuoMetrics) -> Self {
        Self {
            sitzungen: Arc::new(DashMap::new()),
            metriken,
        }
    }

    /// Holt die Sitzung zu `sid` oder legt sie an
    fn sitzung(&self, sid: &SessionId) -> Arc<Mutex<SignalSitzung>> {
        if let Some(vorhanden) = self.sitzungen.get(sid) {
            return Arc::clone(vorhanden.value());
        }

        match self.sitzungen.entry(sid.clone()) {
            Entry::Occupied(e) => Arc::clone(e.get()),
            Entry::Vacant(e) => {
                let sitzung = Arc::new(Mutex::new(SignalSitzung::neu(sid.clone())));
                e.insert(Arc::clone(&sitzung));
                self.metriken.signal_sitzungen.inc();
                tracing::debug!(sid = %sid, "Signaling-Sitzung angelegt");
                sitzung
            }
        }
    }

    /// Belegt `rolle` in der Sitzung `sid` und stellt Wartendes zu
    pub fn anmelden(&self, sid: &SessionId, rolle: Rolle, handle: SignalHandle) -> Option<SignalHandle> {
        let verbindung = handle.id();
        let alt = self.sitzung(sid).lock().anmelden(rolle, handle);
        tracing::info!(sid = %sid, rolle = %rolle, verbindung = %verbindung, "Rolle angemeldet");
        alt
    }

    /// Gibt `rolle` frei, falls sie noch von `verbindung` gehalten wird
    pub fn abmelden(&self, sid: &SessionId, rolle: Rolle, verbindung: VerbindungsId) -> bool {
        let Some(sitzung) = self.sitzungen.get(sid).map(|e| Arc::clone(e.value())) else {
            return false;
        };

        let entfernt = sitzung.lock().abmelden(rolle, verbindung);
        if entfernt {
            tracing::info!(sid = %sid, rolle = %rolle, verbindung = %verbindung, "Rolle abgemeldet");
        } else {
            tracing::debug!(
                sid = %sid,
                rolle = %rolle,
                verbindung = %verbindung,
                "Abmelden ignoriert – Slot gehoert nicht mehr dieser Verbindung"
            );
        }
        entfernt
    }

    /// Leitet eine Nachricht von `quelle` innerhalb von `sid` weiter
    pub fn routen(&self, sid: &SessionId, quelle: Rolle, nachricht: SignalNachricht) -> RoutingErgebnis {
        let typ = nachricht.typ();
        let ergebnis = self.sitzung(sid).lock().routen(quelle, nachricht);

        match ergebnis {
            RoutingErgebnis::Weitergeleitet => self.metriken.frame_zaehlen(FRAME_WEITERGELEITET),
            RoutingErgebnis::Eingereiht => self.metriken.frame_zaehlen(FRAME_EINGEREIHT),
            RoutingErgebnis::Verworfen => {
                self.metriken.frame_zaehlen(FRAME_VERWORFEN);
                tracing::warn!(sid = %sid, rolle = %quelle, typ, "Frame in falscher Richtung verworfen");
            }
        }
        tracing::trace!(sid = %sid, rolle = %quelle, typ, ergebnis = ?ergebnis, "Frame geroutet");
        ergebnis
    }

    /// Zaehlt einen Frame mit unbekanntem Typ
    pub fn unbekannt_verwerfen(&self, sid: &SessionId, typ: &str) {
        self.metriken.frame_zaehlen(FRAME_VERWORFEN);
        tracing::debug!(sid = %sid, typ, "Frame mit unbekanntem Typ ignoriert");
    }

    pub fn anzahl(&self) -> usize {
        self.sitzungen.len()
    }

    /// Fuehrt `f` unter dem Lock der Sitzung aus, falls sie existiert
    pub fn mit_sitzung<R>(&self, sid: &SessionId, f: impl FnOnce(&SignalSitzung) -> R) -> Option<R> {
        let sitzung = self.sitzungen.get(sid).map(|e| Arc::clone(e.value()))?;
        let guard = sitzung.lock();
        Some(f(&guard))
    }
}
