//! WebSocket-Endpunkt – eine Signaling-Verbindung pro Task
//!
//! Der erste Text-Frame ist die Anmeldung `{"role","sid"}`. Ist sie
//! ungueltig, wird der Socket geschlossen, ohne eine Sitzung anzufassen.
//! Danach laeuft die Relay-Schleife bis der Client trennt, ein kaputter
//! Frame kommt, die Rolle neu belegt wird, die eigene Send-Queue
//! volllaeuft oder der Server herunterfaehrt.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use duo_core::{Rolle, Schliessgrund, SessionId};
use duo_protocol::{Anmeldung, EingehendesFrame};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::{SignalingError, SignalingResult};
use crate::session::SignalHandle;
use crate::state::SignalingState;

/// Zustand des `/ws`-Handlers
#[derive(Clone)]
pub struct WsKontext {
    pub state: Arc<SignalingState>,
    pub shutdown_rx: watch::Receiver<bool>,
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(kontext): State<WsKontext>) -> Response {
    ws.on_upgrade(move |socket| verbindung_verarbeiten(socket, kontext))
}

/// Liest den Anmelde-Frame
///
/// Ping/Pong vor der Anmeldung werden uebersprungen, alles andere ausser
/// einem gueltigen Text-Frame ist ein Fehler.
async fn anmeldung_lesen(lese: &mut SplitStream<WebSocket>) -> SignalingResult<(Rolle, SessionId)> {
    loop {
        match lese.next().await {
            Some(Ok(Message::Text(text))) => {
                return Anmeldung::parsen(&text).map_err(SignalingError::aus_anmeldung);
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Binary(_))) => {
                return Err(SignalingError::UngueltigesFrame("Binaer-Frame statt Anmeldung".into()));
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(SignalingError::UngueltigesFrame("Verbindung vor Anmeldung geschlossen".into()));
            }
            Some(Err(e)) => {
                return Err(SignalingError::UngueltigesFrame(e.to_string()));
            }
        }
    }
}

async fn verbindung_verarbeiten(socket: WebSocket, kontext: WsKontext) {
    let WsKontext { state, mut shutdown_rx } = kontext;
    let (mut schreib, mut lese) = socket.split();

    let (rolle, sid) = match anmeldung_lesen(&mut lese).await {
        Ok(anmeldung) => anmeldung,
        Err(e) => {
            tracing::warn!(fehler = %e, "Signaling-Anmeldung abgelehnt");
            let _ = schreib.send(Message::Close(None)).await;
            return;
        }
    };

    let (handle, mut ausgang) = SignalHandle::paar(state.config.sende_queue_kapazitaet);
    let abbruch = ausgang.abbruch_token();
    let verbindung = handle.id();

    state.sitzungen.anmelden(&sid, rolle, handle);

    loop {
        tokio::select! {
            frame = lese.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => match EingehendesFrame::parsen(&text) {
                        Ok(EingehendesFrame::Nachricht(nachricht)) => {
                            state.sitzungen.routen(&sid, rolle, nachricht);
                        }
                        Ok(EingehendesFrame::Unbekannt(typ)) => {
                            state.sitzungen.unbekannt_verwerfen(&sid, &typ);
                        }
                        Err(e) => {
                            let e = SignalingError::aus_frame(e);
                            tracing::warn!(sid = %sid, rolle = %rolle, fehler = %e, "Ungueltiges Frame – Verbindung wird getrennt");
                            break;
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(sid = %sid, rolle = %rolle, "WebSocket vom Client geschlossen");
                        break;
                    }
                    // Binaer-Frames und Ping/Pong
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(sid = %sid, rolle = %rolle, fehler = %e, "WebSocket-Lesefehler");
                        break;
                    }
                }
            }

            Some(ausgehend) = ausgang.naechste() => {
                if let Err(e) = frame_schreiben(&mut schreib, &ausgehend).await {
                    tracing::warn!(sid = %sid, rolle = %rolle, fehler = %e, "Weiterleiten fehlgeschlagen");
                    break;
                }
            }

            _ = abbruch.cancelled() => {
                match ausgang.schliessgrund() {
                    Some(Schliessgrund::Ueberlastet) => {
                        tracing::warn!(sid = %sid, rolle = %rolle, "Verbindung kommt nicht nach – getrennt");
                    }
                    _ => tracing::info!(sid = %sid, rolle = %rolle, "Verbindung durch neuere Anmeldung verdraengt"),
                }
                break;
            }

            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::debug!(sid = %sid, rolle = %rolle, "Shutdown-Signal – WebSocket wird geschlossen");
                    break;
                }
            }
        }
    }

    state.sitzungen.abmelden(&sid, rolle, verbindung);
    let _ = schreib.send(Message::Close(None)).await;
}

async fn frame_schreiben(
    schreib: &mut SplitSink<WebSocket, Message>,
    nachricht: &duo_protocol::SignalNachricht,
) -> SignalingResult<()> {
    let json = nachricht.to_json().map_err(SignalingError::aus_frame)?;
    schreib
        .send(Message::Text(json))
        .await
        .map_err(|e| SignalingError::Io(std::io::Error::other(e)))
}
