//! HTTP-Router und Server-Start fuer das Signaling

use axum::{
    extract::RawQuery,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use duo_observability::{health_router, http_trace_layer, metrics_router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::services::ServeDir;

use crate::state::SignalingState;
use crate::ws::{ws_handler, WsKontext};

/// Baut den kompletten Router: `/ws`, `/v/*`, `/health`, `/metrics`
pub fn signaling_router(state: Arc<SignalingState>, shutdown_rx: watch::Receiver<bool>) -> Router {
    let mut seiten = Router::new()
        .route("/send", get(send_umleiten))
        .route("/view", get(view_umleiten));
    if let Some(verzeichnis) = &state.config.web_verzeichnis {
        seiten = seiten.fallback_service(ServeDir::new(verzeichnis));
    }

    let ws = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(WsKontext {
            state: Arc::clone(&state),
            shutdown_rx,
        });

    Router::new()
        .merge(ws)
        .nest("/v", seiten)
        .merge(health_router(state.health.clone()))
        .merge(metrics_router(state.metriken.clone()))
        .layer(http_trace_layer())
}

/// `/v/<seite>?<query>` -> `/v/<seite>.html?<query>`
fn umleitungsziel(seite: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("/v/{seite}.html?{q}"),
        _ => format!("/v/{seite}.html"),
    }
}

fn umleiten(ziel: String) -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, ziel)])
}

async fn send_umleiten(RawQuery(query): RawQuery) -> impl IntoResponse {
    umleiten(umleitungsziel("send", query.as_deref()))
}

async fn view_umleiten(RawQuery(query): RawQuery) -> impl IntoResponse {
    umleiten(umleitungsziel("view", query.as_deref()))
}

// ---------------------------------------------------------------------------
// SignalingServer
// ---------------------------------------------------------------------------

pub struct SignalingServer {
    state: Arc<SignalingState>,
    listener: TcpListener,
}

impl SignalingServer {
    /// Bindet den Socket; Port 0 waehlt einen freien Port
    pub async fn binden(state: Arc<SignalingState>, bind_addr: SocketAddr) -> std::io::Result<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        Ok(Self { state, listener })
    }

    pub fn lokale_adresse(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Bedient HTTP und WebSocket bis `shutdown_rx` `true` meldet
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        tracing::info!(adresse = %self.listener.local_addr()?, "Signaling-Server gestartet");

        let router = signaling_router(self.state, shutdown_rx.clone());
        let mut rx = shutdown_rx;
        axum::serve(self.listener, router)
            .with_graceful_shutdown(async move {
                while rx.changed().await.is_ok() {
                    if *rx.borrow() {
                        break;
                    }
                }
                tracing::info!("Signaling-Server: Shutdown-Signal empfangen");
            })
            .await?;

        tracing::info!("Signaling-Server gestoppt");
        Ok(())
    }
}
