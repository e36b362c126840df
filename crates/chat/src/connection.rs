//! Chat-Verbindung – verarbeitet eine einzelne Client-Verbindung
//!
//! Jede Verbindung laeuft in einem eigenen tokio-Task. Die Schleife wartet
//! auf drei Dinge:
//! - die naechste Eingabezeile des Clients
//! - Zeilen aus der eigenen Send-Queue (Nachrichten und Meldungen anderer)
//! - Verdraengung durch eine neuere Anmeldung bzw. Server-Shutdown
//!
//! Nach jeder Antwort wird die Send-Queue geleert und erst dann der Prompt
//! geschrieben, damit er immer die letzte Ausgabe ist.

use futures_util::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead};

use duo_core::Schliessgrund;
use duo_protocol::chat;

use crate::dispatcher::{Aktion, DispatcherKontext, ZeilenDispatcher};
use crate::presence::ChatHandle;
use crate::state::ChatState;

pub struct ChatVerbindung {
    state: Arc<ChatState>,
    peer_addr: SocketAddr,
}

impl ChatVerbindung {
    pub fn neu(state: Arc<ChatState>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Laeuft bis der Client trennt, `/quit` sendet, verdraengt wird oder
    /// der Server herunterfaehrt
    pub async fn verarbeiten<S>(self, stream: S, mut shutdown_rx: tokio::sync::watch::Receiver<bool>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let peer_addr = self.peer_addr;
        tracing::info!(peer = %peer_addr, "Neue Chat-Verbindung");

        let (lese, mut schreib) = tokio::io::split(stream);
        let mut zeilen = FramedRead::new(
            lese,
            AnyDelimiterCodec::new_with_max_length(
                b"\n".to_vec(),
                b"\n".to_vec(),
                self.state.config.max_zeilenlaenge,
            ),
        );

        let (handle, mut ausgang) = ChatHandle::paar(self.state.config.sende_queue_kapazitaet);
        let abbruch = ausgang.abbruch_token();
        let verbindung = handle.id();

        let dispatcher = ZeilenDispatcher::neu(Arc::clone(&self.state));
        let mut ctx = DispatcherKontext {
            peer_addr,
            handle,
            identitaet: None,
        };

        let [erster, zweiter] = self.state.paar.identitaeten();
        let begruessung = chat::begruessung(erster.als_str(), zweiter.als_str())
            + &dispatcher.prompt(&ctx);

        if let Err(e) = schreib.write_all(begruessung.as_bytes()).await {
            tracing::debug!(peer = %peer_addr, fehler = %e, "Begruessung nicht schreibbar");
            return;
        }

        loop {
            tokio::select! {
                zeile = zeilen.next() => {
                    let zeile = match zeile {
                        Some(Ok(roh)) => zeile_dekodieren(&roh),
                        Some(Err(AnyDelimiterCodecError::MaxChunkLengthExceeded)) => {
                            tracing::warn!(peer = %peer_addr, "Zeile zu lang – Verbindung wird getrennt");
                            break;
                        }
                        Some(Err(AnyDelimiterCodecError::Io(e))) => {
                            tracing::warn!(peer = %peer_addr, fehler = %e, "Lesefehler");
                            break;
                        }
                        None => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    };

                    let text = match dispatcher.verarbeiten(&zeile, &mut ctx).await {
                        Aktion::Antworten(text) => text,
                        Aktion::Beenden => break,
                    };

                    let mut ausgabe = text;
                    while let Some(wartend) = ausgang.try_naechste() {
                        ausgabe.push_str(&wartend);
                    }
                    ausgabe.push_str(&dispatcher.prompt(&ctx));

                    if let Err(e) = schreib.write_all(ausgabe.as_bytes()).await {
                        tracing::warn!(peer = %peer_addr, fehler = %e, "Senden fehlgeschlagen");
                        break;
                    }
                }

                Some(ausgehend) = ausgang.naechste() => {
                    if let Err(e) = schreib.write_all(ausgehend.as_bytes()).await {
                        tracing::warn!(peer = %peer_addr, fehler = %e, "Weiterleiten fehlgeschlagen");
                        break;
                    }
                }

                _ = abbruch.cancelled() => {
                    let meldung = match ausgang.schliessgrund() {
                        Some(Schliessgrund::Ueberlastet) => {
                            tracing::warn!(peer = %peer_addr, "Client liest nicht schnell genug – Verbindung wird getrennt");
                            "Verbindung getrennt: zu viele ungelesene Nachrichten."
                        }
                        _ => {
                            tracing::info!(peer = %peer_addr, "Verbindung durch neuere Anmeldung verdraengt");
                            "Von einer neueren Anmeldung abgeloest."
                        }
                    };
                    let _ = schreib.write_all(chat::system(meldung).as_bytes()).await;
                    break;
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        let _ = schreib
                            .write_all(chat::system("Server wird heruntergefahren.").as_bytes())
                            .await;
                        break;
                    }
                }
            }
        }

        if let Some(identitaet) = ctx.identitaet.take() {
            self.state.abmelden(&identitaet, verbindung);
        }
        let _ = schreib.shutdown().await;

        tracing::info!(peer = %peer_addr, "Verbindungs-Task beendet");
    }
}

/// Eingabezeile ohne Zeilenende; ungueltiges UTF-8 wird ersetzt statt abgelehnt
fn zeile_dekodieren(roh: &[u8]) -> String {
    let roh = roh.strip_suffix(b"\r").unwrap_or(roh);
    String::from_utf8_lossy(roh).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeilenende_und_ungueltiges_utf8() {
        assert_eq!(zeile_dekodieren(b"hallo\r"), "hallo");
        assert_eq!(zeile_dekodieren(b"gr\xfc\xdfe"), "gr\u{fffd}\u{fffd}e");
        assert_eq!(zeile_dekodieren("gr\u{fc}\u{df}e".as_bytes()), "gr\u{fc}\u{df}e");
    }
}
