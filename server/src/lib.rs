//! duo-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;

use anyhow::{Context, Result};
use config::ServerConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;

use duo_auth::AuthService;
use duo_chat::{ChatConfig, ChatServer, ChatState};
use duo_core::FestesPaar;
use duo_db::{DatabaseConfig, SqliteDb};
use duo_observability::DuoMetrics;
use duo_signaling::{SignalingConfig, SignalingServer, SignalingState};

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

/// Beide Listener gebunden, noch nicht gestartet
pub struct GebundenerServer {
    chat: ChatServer,
    signaling: SignalingServer,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Baut alle Subsysteme auf und bindet beide Listener
    ///
    /// Reihenfolge:
    /// 1. Datenbank oeffnen und migrieren
    /// 2. Konten des Teilnehmerpaars anlegen (falls noch nicht vorhanden)
    /// 3. `ChatState` und `SignalingState` bauen
    /// 4. Chat-TCP und Signaling-HTTP binden
    pub async fn binden(&self) -> Result<GebundenerServer> {
        let cfg = &self.config;
        cfg.validieren()?;

        let db = Arc::new(
            SqliteDb::oeffnen(&DatabaseConfig {
                url: cfg.datenbank.url.clone(),
                max_verbindungen: cfg.datenbank.max_verbindungen,
                sqlite_wal: cfg.datenbank.wal,
            })
            .await
            .with_context(|| format!("Datenbank '{}' nicht oeffenbar", cfg.datenbank.url))?,
        );

        let erster = &cfg.benutzer.erster;
        let zweiter = &cfg.benutzer.zweiter;
        let paar = FestesPaar::neu(erster.name.as_str(), zweiter.name.as_str())?;

        let auth = AuthService::neu(db.clone());
        let angelegt = auth
            .standardbenutzer_anlegen(&[
                (erster.name.as_str(), erster.initial_passwort.as_str()),
                (zweiter.name.as_str(), zweiter.initial_passwort.as_str()),
            ])
            .await
            .context("Konten konnten nicht angelegt werden")?;
        tracing::debug!(angelegt, "Konten geprueft");

        let metriken = DuoMetrics::neu()?;

        let chat_state = Arc::new(ChatState::neu(
            ChatConfig {
                max_zeilenlaenge: cfg.chat.max_zeilenlaenge,
                video_basis_url: cfg.signaling.video_basis_url.clone(),
                ..ChatConfig::default()
            },
            Arc::new(paar),
            db,
            auth,
            metriken.clone(),
        ));

        let signaling_state = Arc::new(SignalingState::neu(
            SignalingConfig {
                web_verzeichnis: cfg.signaling.web_verzeichnis.clone(),
                ..SignalingConfig::default()
            },
            metriken,
        ));

        let chat_adresse = cfg.chat_bind_adresse()?;
        let chat = ChatServer::binden(chat_state, chat_adresse)
            .await
            .with_context(|| format!("Chat-Port {chat_adresse} nicht bindbar"))?;

        let signaling_adresse = cfg.signaling_bind_adresse()?;
        let signaling = SignalingServer::binden(signaling_state, signaling_adresse)
            .await
            .with_context(|| format!("Signaling-Port {signaling_adresse} nicht bindbar"))?;

        Ok(GebundenerServer { chat, signaling })
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    pub async fn starten(self) -> Result<()> {
        tracing::info!(
            chat = %self.config.chat_bind_adresse()?,
            signaling = %self.config.signaling_bind_adresse()?,
            video_basis_url = %self.config.signaling.video_basis_url,
            "Server startet"
        );

        let gebunden = self.binden().await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown-Signal empfangen, Server wird beendet"),
                Err(e) => tracing::error!(fehler = %e, "Ctrl-C-Handler nicht installierbar"),
            }
            let _ = shutdown_tx.send(true);
        });

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        gebunden.laufen(shutdown_rx).await
    }
}

impl GebundenerServer {
    pub fn chat_adresse(&self) -> std::io::Result<SocketAddr> {
        self.chat.lokale_adresse()
    }

    pub fn signaling_adresse(&self) -> std::io::Result<SocketAddr> {
        self.signaling.lokale_adresse()
    }

    /// Laesst Chat und Signaling parallel laufen, bis `shutdown_rx` `true` meldet
    pub async fn laufen(self, shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        tokio::try_join!(
            self.chat.starten(shutdown_rx.clone()),
            self.signaling.starten(shutdown_rx),
        )?;
        tracing::info!("Server beendet");
        Ok(())
    }
}
