//! Presence-Registry – eine aktive Verbindung pro Identitaet
//!
//! Eine neue Anmeldung verdraengt die vorherige Verbindung derselben
//! Identitaet: das alte Handle wird ersetzt und geschlossen. Abmelden
//! entfernt den Eintrag nur, wenn er noch der abmeldenden Verbindung
//! gehoert; eine verdraengte Verbindung kann ihren Nachfolger also nicht
//! austragen.

use dashmap::DashMap;
use duo_core::{Identitaet, VerbindungsHandle, VerbindungsId};
use std::sync::Arc;

/// Handle auf die ausgehende Zeilen-Queue einer Chat-Verbindung
pub type ChatHandle = VerbindungsHandle<String>;

/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct PresenceRegistry {
    clients: Arc<DashMap<Identitaet, ChatHandle>>,
}

impl PresenceRegistry {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Traegt `handle` fuer `identitaet` ein
    ///
    /// Ein vorhandenes Handle wird im selben Schritt ersetzt, danach
    /// geschlossen und zurueckgegeben.
    pub fn registrieren(&self, identitaet: Identitaet, handle: ChatHandle) -> Option<ChatHandle> {
        let neu_id = handle.id();
        let alt = self.clients.insert(identitaet.clone(), handle);

        if let Some(ref alt) = alt {
            alt.schliessen();
            tracing::warn!(
                identitaet = %identitaet,
                alt = %alt.id(),
                neu = %neu_id,
                "Bestehende Verbindung verdraengt"
            );
        }
        alt
    }

    /// Entfernt den Eintrag, falls er noch `verbindung` gehoert
    ///
    /// Gibt `true` zurueck wenn tatsaechlich entfernt wurde.
    pub fn abmelden(&self, identitaet: &Identitaet, verbindung: VerbindungsId) -> bool {
        self.clients
            .remove_if(identitaet, |_, handle| handle.id() == verbindung)
            .is_some()
    }

    /// O(1), blockiert nie auf I/O
    pub fn nachschlagen(&self, identitaet: &Identitaet) -> Option<ChatHandle> {
        self.clients.get(identitaet).map(|eintrag| eintrag.value().clone())
    }

    pub fn ist_online(&self, identitaet: &Identitaet) -> bool {
        self.clients.contains_key(identitaet)
    }

    pub fn online_anzahl(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identitaet {
        Identitaet::neu("alice")
    }

    #[test]
    fn registrieren_und_nachschlagen() {
        let reg = PresenceRegistry::neu();
        let (h, _rx) = ChatHandle::paar(4);
        assert!(reg.registrieren(alice(), h.clone()).is_none());

        let gefunden = reg.nachschlagen(&alice()).expect("Eintrag fehlt");
        assert_eq!(gefunden.id(), h.id());
        assert_eq!(reg.online_anzahl(), 1);
    }

    #[test]
    fn neue_verbindung_verdraengt_alte() {
        let reg = PresenceRegistry::neu();
        let (alt, alt_rx) = ChatHandle::paar(4);
        let (neu, _neu_rx) = ChatHandle::paar(4);

        reg.registrieren(alice(), alt.clone());
        let verdraengt = reg.registrieren(alice(), neu.clone()).expect("Alte Verbindung erwartet");

        assert_eq!(verdraengt.id(), alt.id());
        assert!(alt_rx.wurde_geschlossen(), "Alte Verbindung muss geschlossen sein");
        assert_eq!(reg.online_anzahl(), 1);
        assert_eq!(reg.nachschlagen(&alice()).unwrap().id(), neu.id());
    }

    #[test]
    fn verdraengte_verbindung_kann_nachfolger_nicht_austragen() {
        let reg = PresenceRegistry::neu();
        let (alt, _a) = ChatHandle::paar(4);
        let (neu, _n) = ChatHandle::paar(4);

        reg.registrieren(alice(), alt.clone());
        reg.registrieren(alice(), neu.clone());

        assert!(!reg.abmelden(&alice(), alt.id()));
        assert!(reg.ist_online(&alice()));
        assert!(reg.abmelden(&alice(), neu.id()));
        assert!(!reg.ist_online(&alice()));
        assert!(!reg.abmelden(&alice(), neu.id()), "Zweites Abmelden ist ein No-op");
    }

    #[test]
    fn nebenlaeufiges_an_und_abmelden_bleibt_konsistent() {
        let reg = PresenceRegistry::neu();
        let identitaeten = [Identitaet::neu("alice"), Identitaet::neu("bob")];

        let threads: Vec<_> = (0..8)
            .map(|i| {
                let reg = reg.clone();
                let id = identitaeten[i % 2].clone();
                std::thread::spawn(move || {
                    let mut letzte = None;
                    for runde in 0..200 {
                        let (h, rx) = ChatHandle::paar(1);
                        reg.registrieren(id.clone(), h.clone());
                        if runde % 3 == 0 {
                            reg.abmelden(&id, h.id());
                        }
                        letzte = Some((h, rx));
                    }
                    letzte
                })
            })
            .collect();

        let mut ueberlebende = Vec::new();
        for t in threads {
            ueberlebende.push(t.join().expect("Thread abgestuerzt"));
        }

        assert!(reg.online_anzahl() <= 2);
        for id in &identitaeten {
            if let Some(handle) = reg.nachschlagen(id) {
                // Der Eintrag gehoert genau einer noch offenen Verbindung
                assert!(!handle.ist_geschlossen());
                let besitzer = ueberlebende
                    .iter()
                    .flatten()
                    .filter(|(h, _)| h.id() == handle.id())
                    .count();
                assert_eq!(besitzer, 1);
            }
        }
    }
}
