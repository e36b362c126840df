//! Ende-zu-Ende-Tests ueber In-Memory-Streams und Loopback-TCP

use std::net::SocketAddr;
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::net::TcpStream;
use tokio::sync::watch;

use super::*;
use crate::{ChatServer, ChatVerbindung};

fn test_addr() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

/// Startet eine Verbindung ueber einen Duplex-Stream und gibt die Client-Seite zurueck
fn verbinden(state: &Arc<ChatState>, shutdown: &watch::Sender<bool>) -> DuplexStream {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let verbindung = ChatVerbindung::neu(Arc::clone(state), test_addr());
    let rx = shutdown.subscribe();
    tokio::spawn(async move { verbindung.verarbeiten(server, rx).await });
    client
}

async fn senden(client: &mut (impl tokio::io::AsyncWrite + Unpin), zeile: &str) {
    client
        .write_all(format!("{zeile}\r\n").as_bytes())
        .await
        .expect("Schreiben fehlgeschlagen");
}

async fn einloggen<S>(client: &mut S, name: &str, passwort: &str)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    lesen_bis(client, "Befehle:").await;
    senden(client, &format!("login {name} {passwort}")).await;
    lesen_bis(client, &format!("Angemeldet als {name}")).await;
}

#[tokio::test]
async fn begruessung_und_login_ablauf() {
    let u = umgebung().await;
    let (shutdown, _) = watch::channel(false);
    let mut c = verbinden(&u.state, &shutdown);

    let begruessung = lesen_bis(&mut c, ">> ").await;
    assert!(begruessung.contains("Teilnehmer: alice, bob"));

    senden(&mut c, "hallo").await;
    lesen_bis(&mut c, "Bitte zuerst anmelden").await;

    senden(&mut c, "login alice").await;
    lesen_bis(&mut c, "Verwendung: login").await;

    senden(&mut c, "login mallory geheim").await;
    lesen_bis(&mut c, "Nur alice und bob sind erlaubt.").await;

    senden(&mut c, "login alice falsch").await;
    lesen_bis(&mut c, "Ungueltige Anmeldedaten.").await;
    assert!(!u.state.presence.ist_online(&alice()));

    senden(&mut c, &format!("login alice {PASSWORT_ALICE}")).await;
    let antwort = lesen_bis(&mut c, "\x1b[32m> ").await;
    assert!(antwort.contains("Angemeldet als alice"));
    assert!(u.state.presence.ist_online(&alice()));
}

#[tokio::test]
async fn chat_zwischen_zwei_verbindungen() {
    let u = umgebung().await;
    let (shutdown, _) = watch::channel(false);
    let mut a = verbinden(&u.state, &shutdown);
    let mut b = verbinden(&u.state, &shutdown);

    einloggen(&mut a, "alice", PASSWORT_ALICE).await;
    einloggen(&mut b, "bob", PASSWORT_BOB).await;
    lesen_bis(&mut a, "bob ist beigetreten.").await;

    senden(&mut a, "hallo bob").await;
    lesen_bis(&mut b, "alice: hallo bob").await;

    senden(&mut b, "/quit").await;
    lesen_bis(&mut a, "bob hat den Chat verlassen.").await;

    senden(&mut a, "noch da?").await;
    lesen_bis(&mut a, "Peer ist offline (Nachricht gespeichert).").await;
}

#[tokio::test]
async fn verpasste_nachrichten_kommen_nach_bestaetigung_und_vor_prompt() {
    let u = umgebung().await;
    u.state.senden(&alice(), "erste").await.unwrap();
    u.state.senden(&alice(), "zweite").await.unwrap();

    let (shutdown, _) = watch::channel(false);
    let mut b = verbinden(&u.state, &shutdown);
    lesen_bis(&mut b, "Befehle:").await;
    senden(&mut b, &format!("login bob {PASSWORT_BOB}")).await;
    let ausgabe = lesen_bis(&mut b, "\x1b[36m> ").await;

    let pos = |muster: &str| ausgabe.find(muster).unwrap_or_else(|| panic!("{muster} fehlt"));
    assert!(pos("Angemeldet als bob") < pos("alice: erste"));
    assert!(pos("alice: erste") < pos("alice: zweite"));
    assert!(pos("alice: zweite") < pos("2 Offline-Nachricht"));
    assert!(pos("2 Offline-Nachricht") < pos("\x1b[36m> "));
    assert!(ausgabe.contains("[verpasst "));
}

#[tokio::test]
async fn verlauf_und_videobefehle_ueber_die_leitung() {
    let u = umgebung().await;
    let (shutdown, _) = watch::channel(false);
    let mut a = verbinden(&u.state, &shutdown);
    let mut b = verbinden(&u.state, &shutdown);
    einloggen(&mut a, "alice", PASSWORT_ALICE).await;
    einloggen(&mut b, "bob", PASSWORT_BOB).await;

    senden(&mut a, "eins").await;
    lesen_bis(&mut b, "alice: eins").await;
    senden(&mut b, "/history 5").await;
    lesen_bis(&mut b, "alice: eins").await;

    senden(&mut b, "/acceptvideo").await;
    lesen_bis(&mut b, "Keine offene Videoanfrage.").await;

    senden(&mut a, "/video").await;
    lesen_bis(&mut b, "/acceptvideo oder /declinevideo").await;
    senden(&mut b, "/acceptvideo").await;
    lesen_bis(&mut b, "/v/send?sid=").await;
    lesen_bis(&mut a, "/v/view?sid=").await;
}

#[tokio::test]
async fn zu_lange_nachricht_wird_abgelehnt() {
    let u = umgebung().await;
    let (shutdown, _) = watch::channel(false);
    let mut a = verbinden(&u.state, &shutdown);
    einloggen(&mut a, "alice", PASSWORT_ALICE).await;

    senden(&mut a, &"x".repeat(5000)).await;
    lesen_bis(&mut a, "Nachricht zu lang").await;
    assert!(u.db.verlauf_laden(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn ungueltiges_utf8_wird_ersetzt_statt_getrennt() {
    let u = umgebung().await;
    let (shutdown, _) = watch::channel(false);
    let mut a = verbinden(&u.state, &shutdown);
    let mut b = verbinden(&u.state, &shutdown);
    einloggen(&mut a, "alice", PASSWORT_ALICE).await;
    einloggen(&mut b, "bob", PASSWORT_BOB).await;

    a.write_all(b"gr\xfc\xdfe\r\n").await.unwrap();
    lesen_bis(&mut b, "alice: gr\u{fffd}\u{fffd}e").await;

    senden(&mut a, "weiter").await;
    lesen_bis(&mut b, "alice: weiter").await;
    assert!(u.state.presence.ist_online(&alice()));
}

#[tokio::test]
async fn ueberlange_zeile_trennt_verbindung() {
    let u = umgebung().await;
    let (shutdown, _) = watch::channel(false);
    let mut a = verbinden(&u.state, &shutdown);
    lesen_bis(&mut a, "Befehle:").await;

    a.write_all("y".repeat(9000).as_bytes()).await.unwrap();
    a.write_all(b"\r\n").await.unwrap();

    let mut rest = Vec::new();
    let gelesen = tokio::time::timeout(Duration::from_secs(5), a.read_to_end(&mut rest)).await;
    assert!(gelesen.is_ok(), "Verbindung haette geschlossen werden muessen");
}

#[tokio::test]
async fn neue_anmeldung_verdraengt_alte_verbindung() {
    let u = umgebung().await;
    let (shutdown, _) = watch::channel(false);
    let mut b = verbinden(&u.state, &shutdown);
    let mut a1 = verbinden(&u.state, &shutdown);
    einloggen(&mut b, "bob", PASSWORT_BOB).await;
    einloggen(&mut a1, "alice", PASSWORT_ALICE).await;

    let mut a2 = verbinden(&u.state, &shutdown);
    einloggen(&mut a2, "alice", PASSWORT_ALICE).await;

    lesen_bis(&mut a1, "Von einer neueren Anmeldung abgeloest.").await;
    let mut rest = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), a1.read_to_end(&mut rest))
        .await
        .expect("Alte Verbindung wurde nicht geschlossen")
        .expect("Lesefehler");

    assert!(u.state.presence.ist_online(&alice()));
    assert_eq!(u.state.presence.online_anzahl(), 2);

    // Die neue Verbindung bleibt funktionsfaehig
    senden(&mut b, "an die neue").await;
    lesen_bis(&mut a2, "bob: an die neue").await;
}

#[tokio::test]
async fn shutdown_trennt_verbindungen() {
    let u = umgebung().await;
    let (shutdown, _) = watch::channel(false);
    let mut a = verbinden(&u.state, &shutdown);
    einloggen(&mut a, "alice", PASSWORT_ALICE).await;

    shutdown.send(true).unwrap();
    lesen_bis(&mut a, "Server wird heruntergefahren.").await;
}

#[tokio::test]
async fn tcp_server_ende_zu_ende() {
    let u = umgebung().await;
    let server = ChatServer::binden(u.state.clone(), "127.0.0.1:0".parse().unwrap())
        .await
        .expect("Binden fehlgeschlagen");
    let adresse = server.lokale_adresse().unwrap();
    let (shutdown, rx) = watch::channel(false);
    let server_task = tokio::spawn(server.starten(rx));

    let mut a = TcpStream::connect(adresse).await.expect("Verbinden fehlgeschlagen");
    let mut b = TcpStream::connect(adresse).await.expect("Verbinden fehlgeschlagen");
    einloggen(&mut a, "alice", PASSWORT_ALICE).await;
    einloggen(&mut b, "bob", PASSWORT_BOB).await;

    senden(&mut b, "ueber tcp").await;
    lesen_bis(&mut a, "bob: ueber tcp").await;

    shutdown.send(true).unwrap();
    server_task
        .await
        .expect("Server-Task abgestuerzt")
        .expect("Server beendet mit Fehler");
}
