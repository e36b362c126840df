//! Gemeinsamer Zustand des Signaling-Servers
//!
//! Wird einmal beim Start gebaut und als `Arc` an Router und
//! WebSocket-Tasks gereicht.

use duo_observability::{DuoMetrics, HealthState};
use std::path::PathBuf;

use crate::registry::SitzungsTabelle;

/// Laufzeit-Konfiguration des Signaling-Servers
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Kapazitaet der ausgehenden Queue pro WebSocket (in Frames)
    pub sende_queue_kapazitaet: usize,
    /// Verzeichnis mit den Client-Seiten, ausgeliefert unter `/v/`
    pub web_verzeichnis: Option<PathBuf>,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            sende_queue_kapazitaet: 256,
            web_verzeichnis: None,
        }
    }
}

pub struct SignalingState {
    pub config: SignalingConfig,
    pub sitzungen: SitzungsTabelle,
    pub metriken: DuoMetrics,
    pub health: HealthState,
}

impl SignalingState {
    pub fn neu(config: SignalingConfig, metriken: DuoMetrics) -> Self {
        Self {
            config,
            sitzungen: SitzungsTabelle::neu(metriken.clone()),
            metriken,
            health: HealthState::neu(),
        }
    }
}
