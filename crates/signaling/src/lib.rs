//! duo-signaling – WebRTC-Signaling zwischen Sender und Viewer
//!
//! Pro Session-ID gibt es genau eine `SignalSitzung` mit je einem Slot fuer
//! die Rollen sender und viewer. Offer, Answer und ICE-Kandidaten werden an
//! die Gegenrolle weitergeleitet oder, solange diese fehlt, zwischengespeichert.
//!
//! ## Architektur
//!
//! ```text
//! HTTP-Server (SignalingServer, axum)
//!     |
//!     +-- GET /ws          WebSocket, ein Task pro Verbindung
//!     |                      Anmeldung {role, sid} -> Relay-Schleife
//!     +-- GET /v/send      302 -> /v/send.html?sid=…
//!     +-- GET /v/view      302 -> /v/view.html?sid=…
//!     +-- /v/*             statische Seiten (optional)
//!     +-- /health, /metrics
//!
//! SitzungsTabelle  – SessionId -> SignalSitzung (lazy angelegt)
//! SignalSitzung    – Rollen-Slots, Offer/Answer-Cache, ICE-Queues
//! ```

pub mod error;
pub mod http;
pub mod registry;
pub mod session;
pub mod state;
pub mod ws;

// Bequeme Re-Exporte
pub use error::{SignalingError, SignalingResult};
pub use http::{signaling_router, SignalingServer};
pub use registry::SitzungsTabelle;
pub use session::{RoutingErgebnis, SignalHandle, SignalSitzung};
pub use state::{SignalingConfig, SignalingState};
