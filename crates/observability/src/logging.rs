//! Structured Logging Setup via tracing-subscriber
//!
//! Umgebungsvariablen haben Vorrang vor der Konfigurationsdatei:
//! - `DUO_LOG_LEVEL`: Filter-Direktive (z.B. `info` oder `duo_chat=debug`)
//! - `DUO_LOG_FORMAT`: `text` oder `json`

use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "DUO_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "DUO_LOG_FORMAT";

/// Initialisiert das Logging-System (einmal pro Prozess)
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match effektives_format(format).as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_current_span(true)
                .init();
        }
        _ => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Format aus `DUO_LOG_FORMAT`, sonst der konfigurierte Wert
pub fn effektives_format(konfiguriert: &str) -> String {
    std::env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| konfiguriert.to_string())
}

pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}
