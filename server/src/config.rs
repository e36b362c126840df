//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Umgebungsvariable mit dem Pfad der Konfigurationsdatei
pub const ENV_CONFIG: &str = "DUO_CONFIG";
/// Ueberschreibt `signaling.video_basis_url`
pub const ENV_VIDEO_BASE_URL: &str = "VIDEO_BASE_URL";
pub const STANDARD_PFAD: &str = "duo.toml";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Chat-Relay (TCP, zeilenbasiert)
    pub chat: ChatEinstellungen,
    /// Signaling (HTTP + WebSocket)
    pub signaling: SignalingEinstellungen,
    pub datenbank: DatenbankEinstellungen,
    /// Das feste Teilnehmerpaar
    pub benutzer: BenutzerEinstellungen,
    pub logging: LoggingEinstellungen,
}

/// Chat-Relay-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatEinstellungen {
    pub bind_adresse: String,
    pub port: u16,
    /// Laengere Eingabezeilen (in Bytes) beenden die Verbindung
    pub max_zeilenlaenge: usize,
}

impl Default for ChatEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 5000,
            max_zeilenlaenge: 8192,
        }
    }
}

/// Signaling-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingEinstellungen {
    pub bind_adresse: String,
    pub port: u16,
    /// Basis der Join-Links, die beim Annehmen einer Videoanfrage verschickt werden
    pub video_basis_url: String,
    /// Verzeichnis mit `send.html` / `view.html` (optional)
    pub web_verzeichnis: Option<PathBuf>,
}

impl Default for SignalingEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 5001,
            video_basis_url: "http://127.0.0.1:5001".into(),
            web_verzeichnis: None,
        }
    }
}

/// Datenbank-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatenbankEinstellungen {
    /// Verbindungs-URL
    pub url: String,
    /// Maximale Verbindungspool-Groesse
    pub max_verbindungen: u32,
    /// WAL-Journal aktivieren
    pub wal: bool,
}

impl Default for DatenbankEinstellungen {
    fn default() -> Self {
        Self {
            url: "sqlite://chat.db".into(),
            max_verbindungen: 5,
            wal: true,
        }
    }
}

/// Ein Teilnehmer mit dem Passwort fuer die Erstanlage seines Kontos
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teilnehmer {
    pub name: String,
    pub initial_passwort: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenutzerEinstellungen {
    pub erster: Teilnehmer,
    pub zweiter: Teilnehmer,
}

impl Default for BenutzerEinstellungen {
    fn default() -> Self {
        Self {
            erster: Teilnehmer {
                name: "alice".into(),
                initial_passwort: "alice".into(),
            },
            zweiter: Teilnehmer {
                name: "bob".into(),
                initial_passwort: "bob".into(),
            },
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Pfad aus `DUO_CONFIG` oder `duo.toml`
    pub fn pfad_aus_umgebung() -> String {
        std::env::var(ENV_CONFIG).unwrap_or_else(|_| STANDARD_PFAD.into())
    }

    /// Wendet Umgebungsvariablen an (`VIDEO_BASE_URL`)
    pub fn umgebung_anwenden(&mut self, video_basis_url: Option<String>) {
        if let Some(url) = video_basis_url.filter(|u| !u.trim().is_empty()) {
            self.signaling.video_basis_url = url;
        }
    }

    /// Prueft die Konfiguration auf Widersprueche
    pub fn validieren(&self) -> anyhow::Result<()> {
        let erster = &self.benutzer.erster.name;
        let zweiter = &self.benutzer.zweiter.name;
        for name in [erster, zweiter] {
            if name.is_empty() {
                bail!("Teilnehmername darf nicht leer sein");
            }
            if name.chars().any(char::is_whitespace) {
                bail!("Teilnehmername '{name}' enthaelt Leerzeichen");
            }
        }
        if erster == zweiter {
            bail!("Die beiden Teilnehmer muessen verschieden sein ('{erster}')");
        }
        if self.chat.max_zeilenlaenge == 0 {
            bail!("chat.max_zeilenlaenge muss groesser als 0 sein");
        }
        if !duo_observability::logging::log_level_gueltig(&self.logging.level) {
            bail!("Unbekanntes Log-Level '{}'", self.logging.level);
        }
        if !duo_observability::logging::log_format_gueltig(&self.logging.format) {
            bail!("Unbekanntes Log-Format '{}'", self.logging.format);
        }
        self.chat_bind_adresse()?;
        self.signaling_bind_adresse()?;
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse fuer den Chat zurueck
    pub fn chat_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.chat.bind_adresse, self.chat.port)
            .parse()
            .with_context(|| format!("Ungueltige Chat-Adresse '{}'", self.chat.bind_adresse))
    }

    /// Gibt die vollstaendige Bind-Adresse fuer das Signaling zurueck
    pub fn signaling_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.signaling.bind_adresse, self.signaling.port)
            .parse()
            .with_context(|| {
                format!("Ungueltige Signaling-Adresse '{}'", self.signaling.bind_adresse)
            })
    }
}
