//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Fuer jede eingehende Verbindung startet der `ChatServer` einen eigenen
//! tokio-Task mit einer `ChatVerbindung`. Alle Tasks teilen sich denselben
//! `ChatState`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::connection::ChatVerbindung;
use crate::state::ChatState;

pub struct ChatServer {
    state: Arc<ChatState>,
    listener: TcpListener,
}

impl ChatServer {
    /// Bindet den Socket; Port 0 waehlt einen freien Port
    pub async fn binden(state: Arc<ChatState>, bind_addr: SocketAddr) -> std::io::Result<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        Ok(Self { state, listener })
    }

    pub fn lokale_adresse(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Akzeptiert Verbindungen bis `shutdown_rx` `true` meldet
    pub async fn starten(
        self,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        tracing::info!(adresse = %self.listener.local_addr()?, "Chat-Server gestartet");

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            tracing::debug!(peer = %peer_addr, "Verbindung akzeptiert");
                            if let Err(e) = stream.set_nodelay(true) {
                                tracing::debug!(peer = %peer_addr, fehler = %e, "TCP_NODELAY nicht setzbar");
                            }

                            let verbindung = ChatVerbindung::neu(Arc::clone(&self.state), peer_addr);
                            let shutdown_rx_clone = shutdown_rx.clone();
                            tokio::spawn(async move {
                                verbindung.verarbeiten(stream, shutdown_rx_clone).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Chat-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("Chat-Server gestoppt");
        Ok(())
    }
}
