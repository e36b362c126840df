//! Gemeinsame Identifikationstypen fuer Duo
//!
//! Identitaeten, Session-IDs und Rollen verwenden das Newtype-Pattern, damit
//! sie zur Compilezeit nicht verwechselt werden koennen.

use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use serde::{Deserialize, Serialize};

use crate::error::{DuoError, Result};

/// Laenge einer generierten Session-ID (Alphabet: 62 alphanumerische Zeichen)
pub const SESSION_ID_LAENGE: usize = 16;

// ---------------------------------------------------------------------------
// Identitaet
// ---------------------------------------------------------------------------

/// Name eines der beiden festen Teilnehmer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identitaet(pub String);

impl Identitaet {
    pub fn neu(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn als_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identitaet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Peer-Aufloesung
// ---------------------------------------------------------------------------

/// Loest zu einer Identitaet ihren festen Gegenueber auf
///
/// Die Relation ist eine Involution: `peer(peer(a)) == a` fuer jede
/// bekannte Identitaet.
pub trait PeerAufloesung: Send + Sync {
    /// Gibt den Peer zurueck, `None` fuer unbekannte Identitaeten
    fn peer(&self, identitaet: &Identitaet) -> Option<Identitaet>;

    /// Beide Identitaeten in fester Reihenfolge
    fn identitaeten(&self) -> [Identitaet; 2];

    /// `true` fuer die erste Identitaet des Paares (bestimmt die Anzeigefarbe)
    fn ist_erster(&self, identitaet: &Identitaet) -> bool {
        &self.identitaeten()[0] == identitaet
    }

    /// Prueft ob die Identitaet zum Paar gehoert
    fn ist_bekannt(&self, identitaet: &Identitaet) -> bool {
        self.identitaeten().contains(identitaet)
    }
}

/// Zwei fest konfigurierte Teilnehmer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FestesPaar {
    erster: Identitaet,
    zweiter: Identitaet,
}

impl FestesPaar {
    /// Erstellt ein Paar; beide Namen muessen nicht-leer, verschieden und
    /// ohne Leerzeichen sein (der Login-Befehl trennt an Leerzeichen).
    pub fn neu(erster: impl Into<String>, zweiter: impl Into<String>) -> Result<Self> {
        let erster = erster.into();
        let zweiter = zweiter.into();

        for name in [&erster, &zweiter] {
            if name.is_empty() {
                return Err(DuoError::UngueltigesPaar("Name darf nicht leer sein".into()));
            }
            if name.chars().any(char::is_whitespace) {
                return Err(DuoError::UngueltigesPaar(format!(
                    "Name '{name}' enthaelt Leerzeichen"
                )));
            }
        }
        if erster == zweiter {
            return Err(DuoError::UngueltigesPaar(format!(
                "Beide Teilnehmer heissen '{erster}'"
            )));
        }

        Ok(Self {
            erster: Identitaet(erster),
            zweiter: Identitaet(zweiter),
        })
    }
}

impl PeerAufloesung for FestesPaar {
    fn peer(&self, identitaet: &Identitaet) -> Option<Identitaet> {
        if identitaet == &self.erster {
            Some(self.zweiter.clone())
        } else if identitaet == &self.zweiter {
            Some(self.erster.clone())
        } else {
            None
        }
    }

    fn identitaeten(&self) -> [Identitaet; 2] {
        [self.erster.clone(), self.zweiter.clone()]
    }
}

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Kennung einer Signaling-Session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Erzeugt eine zufaellige, praktisch nicht erratbare Session-ID
    ///
    /// Quelle ist der kryptografische Zufallsgenerator des Betriebssystems.
    pub fn generieren() -> Self {
        let sid: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LAENGE)
            .map(char::from)
            .collect();
        Self(sid)
    }

    /// Uebernimmt eine vom Client gesendete ID; leere IDs sind ungueltig
    pub fn parsen(roh: &str) -> Result<Self> {
        if roh.is_empty() {
            return Err(DuoError::UngueltigeSessionId("leer".into()));
        }
        Ok(Self(roh.to_string()))
    }

    pub fn als_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Rolle
// ---------------------------------------------------------------------------

/// Rolle innerhalb einer Signaling-Session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rolle {
    /// Teilt die Kamera, sendet das Offer
    Sender,
    /// Sieht zu, sendet das Answer
    Viewer,
}

impl Rolle {
    /// Die jeweils andere Rolle
    pub fn gegenueber(self) -> Self {
        match self {
            Self::Sender => Self::Viewer,
            Self::Viewer => Self::Sender,
        }
    }

    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for Rolle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.als_str())
    }
}

impl std::str::FromStr for Rolle {
    type Err = DuoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sender" => Ok(Self::Sender),
            "viewer" => Ok(Self::Viewer),
            other => Err(DuoError::UnbekannteRolle(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paar() -> FestesPaar {
        FestesPaar::neu("alice", "bob").expect("Paar muss gueltig sein")
    }

    #[test]
    fn peer_ist_involution() {
        let p = paar();
        for id in p.identitaeten() {
            let peer = p.peer(&id).expect("Peer muss existieren");
            assert_ne!(peer, id);
            assert_eq!(p.peer(&peer), Some(id));
        }
    }

    #[test]
    fn unbekannte_identitaet_hat_keinen_peer() {
        let p = paar();
        assert_eq!(p.peer(&Identitaet::neu("mallory")), None);
        assert!(!p.ist_bekannt(&Identitaet::neu("mallory")));
    }

    #[test]
    fn erster_wird_erkannt() {
        let p = paar();
        assert!(p.ist_erster(&Identitaet::neu("alice")));
        assert!(!p.ist_erster(&Identitaet::neu("bob")));
    }

    #[test]
    fn ungueltige_paare_werden_abgelehnt() {
        assert!(FestesPaar::neu("alice", "alice").is_err());
        assert!(FestesPaar::neu("", "bob").is_err());
        assert!(FestesPaar::neu("al ice", "bob").is_err());
    }

    #[test]
    fn session_id_ist_alphanumerisch() {
        let sid = SessionId::generieren();
        assert!(sid.als_str().len() >= 12);
        assert!(sid.als_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(sid, SessionId::generieren());
    }

    #[test]
    fn leere_session_id_ungueltig() {
        assert!(SessionId::parsen("").is_err());
        assert_eq!(SessionId::parsen("abc").unwrap().als_str(), "abc");
    }

    #[test]
    fn rolle_parsen_und_gegenueber() {
        assert_eq!("sender".parse::<Rolle>().unwrap(), Rolle::Sender);
        assert_eq!("viewer".parse::<Rolle>().unwrap(), Rolle::Viewer);
        assert!("admin".parse::<Rolle>().is_err());
        assert_eq!(Rolle::Sender.gegenueber(), Rolle::Viewer);
        assert_eq!(Rolle::Viewer.gegenueber().gegenueber(), Rolle::Viewer);
    }

    #[test]
    fn rolle_ist_serde_kompatibel() {
        let json = serde_json::to_string(&Rolle::Viewer).unwrap();
        assert_eq!(json, "\"viewer\"");
        let r: Rolle = serde_json::from_str("\"sender\"").unwrap();
        assert_eq!(r, Rolle::Sender);
    }
}
