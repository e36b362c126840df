//! Prometheus-kompatible Metriken fuer Duo
//!
//! Registrierte Metriken:
//! - `duo_verbundene_clients` – Gauge: angemeldete Chat-Teilnehmer
//! - `duo_nachrichten_total{ergebnis}` – Counter: zugestellt / offline / zurueckgestellt / fehler
//! - `duo_verpasste_zugestellt_total` – Counter: nachgereichte Nachrichten
//! - `duo_signal_frames_total{ergebnis}` – Counter: weitergeleitet / eingereiht / verworfen
//! - `duo_signal_sitzungen` – Gauge: Signaling-Sitzungen in der Tabelle

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

pub const NACHRICHT_ZUGESTELLT: &str = "zugestellt";
pub const NACHRICHT_OFFLINE: &str = "offline";
pub const NACHRICHT_ZURUECKGESTELLT: &str = "zurueckgestellt";
pub const NACHRICHT_FEHLER: &str = "fehler";

pub const FRAME_WEITERGELEITET: &str = "weitergeleitet";
pub const FRAME_EINGEREIHT: &str = "eingereiht";
pub const FRAME_VERWORFEN: &str = "verworfen";

/// Alle Duo-Prometheus-Metriken
#[derive(Clone)]
pub struct DuoMetrics {
    pub registry: Arc<Registry>,

    pub verbundene_clients: IntGauge,
    pub nachrichten_total: IntCounterVec,
    pub verpasste_zugestellt_total: IntCounter,

    pub signal_frames_total: IntCounterVec,
    pub signal_sitzungen: IntGauge,
}

impl DuoMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Chat ---
        let verbundene_clients = IntGauge::with_opts(Opts::new(
            "duo_verbundene_clients",
            "Anzahl angemeldeter Chat-Teilnehmer",
        ))?;
        registry.register(Box::new(verbundene_clients.clone()))?;

        let nachrichten_total = IntCounterVec::new(
            Opts::new("duo_nachrichten_total", "Gesendete Chat-Nachrichten nach Ergebnis"),
            &["ergebnis"],
        )?;
        registry.register(Box::new(nachrichten_total.clone()))?;

        let verpasste_zugestellt_total = IntCounter::with_opts(Opts::new(
            "duo_verpasste_zugestellt_total",
            "Beim Anmelden nachgereichte Nachrichten",
        ))?;
        registry.register(Box::new(verpasste_zugestellt_total.clone()))?;

        // --- Signaling ---
        let signal_frames_total = IntCounterVec::new(
            Opts::new("duo_signal_frames_total", "Signaling-Frames nach Ergebnis"),
            &["ergebnis"],
        )?;
        registry.register(Box::new(signal_frames_total.clone()))?;

        let signal_sitzungen = IntGauge::with_opts(Opts::new(
            "duo_signal_sitzungen",
            "Signaling-Sitzungen in der Sitzungstabelle",
        ))?;
        registry.register(Box::new(signal_sitzungen.clone()))?;

        // Label-Kombinationen vorbelegen, damit sie ab Start im Export stehen
        for ergebnis in [
            NACHRICHT_ZUGESTELLT,
            NACHRICHT_OFFLINE,
            NACHRICHT_ZURUECKGESTELLT,
            NACHRICHT_FEHLER,
        ] {
            nachrichten_total.with_label_values(&[ergebnis]);
        }
        for ergebnis in [FRAME_WEITERGELEITET, FRAME_EINGEREIHT, FRAME_VERWORFEN] {
            signal_frames_total.with_label_values(&[ergebnis]);
        }

        Ok(Self {
            registry: Arc::new(registry),
            verbundene_clients,
            nachrichten_total,
            verpasste_zugestellt_total,
            signal_frames_total,
            signal_sitzungen,
        })
    }

    pub fn nachricht_zaehlen(&self, ergebnis: &str) {
        self.nachrichten_total.with_label_values(&[ergebnis]).inc();
    }

    pub fn frame_zaehlen(&self, ergebnis: &str) {
        self.signal_frames_total.with_label_values(&[ergebnis]).inc();
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: DuoMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<DuoMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(fehler = %err, "Metriken-Export fehlgeschlagen");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
