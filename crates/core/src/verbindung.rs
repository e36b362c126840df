//! Verbindungs-Handle – Ausgehende Seite einer Client-Verbindung
//!
//! Jede Client-Verbindung laeuft in einem eigenen tokio-Task. Registries
//! halten nur ein `VerbindungsHandle`: eine begrenzte Send-Queue in Richtung
//! dieses Tasks plus ein Abbruch-Token, ueber das eine verdraengte oder
//! ueberlastete Verbindung zwangsweise geschlossen wird. Senden blockiert nie; der Task
//! schreibt die Queue in den Socket, nachdem der Aufrufer alle Locks
//! freigegeben hat.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Eindeutige Kennung einer einzelnen Verbindung
///
/// Dient dem bedingten Entfernen aus Registries: nur wer den Slot noch
/// haelt, darf ihn freigeben.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerbindungsId(pub Uuid);

impl VerbindungsId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VerbindungsId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VerbindungsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// VerbindungsHandle
// ---------------------------------------------------------------------------

/// Ergebnis von `VerbindungsHandle::einreihen`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendeStatus {
    Angenommen,
    /// Der Task kommt mit dem Schreiben nicht nach
    Voll,
    /// Task beendet oder Verbindung geschlossen
    Geschlossen,
}

/// Warum eine Verbindung zwangsweise geschlossen wurde
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schliessgrund {
    /// Eine neuere Anmeldung hat den Slot uebernommen
    Verdraengt,
    /// Die Send-Queue lief voll
    Ueberlastet,
}

/// Handle auf die Send-Queue einer Verbindung
pub struct VerbindungsHandle<T> {
    id: VerbindungsId,
    tx: mpsc::Sender<T>,
    abbruch: CancellationToken,
    grund: Arc<OnceLock<Schliessgrund>>,
}

impl<T> VerbindungsHandle<T> {
    /// Erstellt Handle und zugehoerigen Empfaenger fuer den Verbindungs-Task
    pub fn paar(kapazitaet: usize) -> (Self, VerbindungsEmpfaenger<T>) {
        let (tx, rx) = mpsc::channel(kapazitaet);
        let abbruch = CancellationToken::new();
        let grund = Arc::new(OnceLock::new());
        let handle = Self {
            id: VerbindungsId::new(),
            tx,
            abbruch: abbruch.clone(),
            grund: Arc::clone(&grund),
        };
        (handle, VerbindungsEmpfaenger { rx, abbruch, grund })
    }

    pub fn id(&self) -> VerbindungsId {
        self.id
    }

    /// Reiht eine Nachricht nicht-blockierend ein
    ///
    /// Gibt `false` zurueck wenn die Queue voll, der Task beendet oder die
    /// Verbindung geschlossen wurde. Die Nachricht gilt dann als nicht
    /// zugestellt.
    pub fn senden(&self, nachricht: T) -> bool {
        self.einreihen(nachricht) == SendeStatus::Angenommen
    }

    /// Wie `senden`, unterscheidet aber volle Queue und beendete Verbindung
    pub fn einreihen(&self, nachricht: T) -> SendeStatus {
        if self.abbruch.is_cancelled() {
            return SendeStatus::Geschlossen;
        }
        match self.tx.try_send(nachricht) {
            Ok(()) => SendeStatus::Angenommen,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(verbindung = %self.id, "Send-Queue voll – Nachricht nicht angenommen");
                SendeStatus::Voll
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(verbindung = %self.id, "Send-Queue geschlossen (Client getrennt)");
                SendeStatus::Geschlossen
            }
        }
    }

    /// Schliesst die Verbindung zwangsweise (Verdraengung)
    pub fn schliessen(&self) {
        self.schliessen_wegen(Schliessgrund::Verdraengt);
    }

    /// Schliesst die Verbindung und merkt sich den Grund
    ///
    /// Nur der erste Grund zaehlt.
    pub fn schliessen_wegen(&self, grund: Schliessgrund) {
        let _ = self.grund.set(grund);
        self.abbruch.cancel();
    }

    pub fn ist_geschlossen(&self) -> bool {
        self.abbruch.is_cancelled() || self.tx.is_closed()
    }
}

impl<T> Clone for VerbindungsHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            tx: self.tx.clone(),
            abbruch: self.abbruch.clone(),
            grund: Arc::clone(&self.grund),
        }
    }
}

impl<T> fmt::Debug for VerbindungsHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerbindungsHandle")
            .field("id", &self.id)
            .field("geschlossen", &self.ist_geschlossen())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// VerbindungsEmpfaenger
// ---------------------------------------------------------------------------

/// Lese-Seite der Send-Queue, gehoert dem Verbindungs-Task
pub struct VerbindungsEmpfaenger<T> {
    rx: mpsc::Receiver<T>,
    abbruch: CancellationToken,
    grund: Arc<OnceLock<Schliessgrund>>,
}

impl<T> VerbindungsEmpfaenger<T> {
    /// Wartet auf die naechste ausgehende Nachricht
    pub async fn naechste(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Nicht-blockierende Variante (fuer Tests und Drain beim Beenden)
    pub fn try_naechste(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Token das ausgeloest wird, sobald die Verbindung verdraengt wurde
    pub fn abbruch_token(&self) -> CancellationToken {
        self.abbruch.clone()
    }

    pub fn wurde_geschlossen(&self) -> bool {
        self.abbruch.is_cancelled()
    }

    /// Grund des Schliessens, sofern die Verbindung geschlossen wurde
    pub fn schliessgrund(&self) -> Option<Schliessgrund> {
        self.grund.get().copied()
    }
}
