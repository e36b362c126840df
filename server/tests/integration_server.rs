//! Startet den kompletten Server auf freien Ports und spricht beide Schnittstellen an

use duo_server::{config::ServerConfig, Server};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;

/// Datenbankdatei im Temp-Verzeichnis, wird beim Drop entfernt
struct TempDb(PathBuf);

impl TempDb {
    fn neu(name: &str) -> Self {
        let pfad = std::env::temp_dir().join(format!("duo-{name}-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&pfad);
        Self(pfad)
    }

    fn url(&self) -> String {
        format!("sqlite://{}", self.0.display())
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for endung in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{endung}", self.0.display()));
        }
    }
}

fn test_config(db: &TempDb) -> ServerConfig {
    let mut cfg = ServerConfig::default();
    cfg.chat.bind_adresse = "127.0.0.1".into();
    cfg.chat.port = 0;
    cfg.signaling.bind_adresse = "127.0.0.1".into();
    cfg.signaling.port = 0;
    cfg.signaling.video_basis_url = "http://video.test".into();
    cfg.datenbank.url = db.url();
    cfg.benutzer.erster.initial_passwort = "pa".into();
    cfg.benutzer.zweiter.initial_passwort = "pb".into();
    cfg
}

async fn lesen_bis<R: AsyncRead + Unpin>(leser: &mut R, muster: &str) -> String {
    let mut puffer = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(10), async {
        let mut block = [0u8; 1024];
        while !String::from_utf8_lossy(&puffer).contains(muster) {
            match leser.read(&mut block).await {
                Ok(0) | Err(_) => return,
                Ok(n) => puffer.extend_from_slice(&block[..n]),
            }
        }
    })
    .await;
    let text = String::from_utf8_lossy(&puffer).into_owned();
    assert!(text.contains(muster), "'{muster}' nicht empfangen: {text:?}");
    text
}

async fn http_get(adresse: std::net::SocketAddr, pfad: &str) -> String {
    let mut stream = TcpStream::connect(adresse).await.unwrap();
    stream
        .write_all(format!("GET {pfad} HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").as_bytes())
        .await
        .unwrap();
    let mut antwort = String::new();
    stream.read_to_string(&mut antwort).await.unwrap();
    antwort
}

#[tokio::test]
async fn chat_und_signaling_laufen_gemeinsam() {
    let db = TempDb::neu("gesamt");
    let gebunden = Server::neu(test_config(&db)).binden().await.expect("Server-Aufbau");
    let chat = gebunden.chat_adresse().unwrap();
    let signaling = gebunden.signaling_adresse().unwrap();

    let (shutdown, rx) = watch::channel(false);
    let lauf = tokio::spawn(gebunden.laufen(rx));

    let mut alice = TcpStream::connect(chat).await.unwrap();
    lesen_bis(&mut alice, "Teilnehmer: alice, bob").await;
    alice.write_all(b"login alice pa\r\n").await.unwrap();
    lesen_bis(&mut alice, "Angemeldet als alice").await;
    alice.write_all(b"fuer spaeter\r\n").await.unwrap();
    lesen_bis(&mut alice, "offline").await;

    let mut bob = TcpStream::connect(chat).await.unwrap();
    lesen_bis(&mut bob, ">> ").await;
    bob.write_all(b"login bob pb\r\n").await.unwrap();
    lesen_bis(&mut bob, "alice: fuer spaeter").await;

    alice.write_all(b"/video\r\n").await.unwrap();
    lesen_bis(&mut bob, "/acceptvideo oder /declinevideo").await;
    bob.write_all(b"/acceptvideo\r\n").await.unwrap();
    lesen_bis(&mut bob, "http://video.test/v/send?sid=").await;

    let health = http_get(signaling, "/health").await;
    assert!(health.starts_with("HTTP/1.1 200"), "{health}");
    assert!(health.contains("\"healthy\""));

    let metriken = http_get(signaling, "/metrics").await;
    assert!(metriken.contains("duo_verbundene_clients 2"), "{metriken}");
    assert!(metriken.contains("duo_verpasste_zugestellt_total 1"));

    shutdown.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(10), lauf)
        .await
        .expect("Server hat nicht beendet")
        .expect("Server-Task abgestuerzt")
        .expect("Server mit Fehler beendet");
}

#[tokio::test]
async fn konten_bleiben_ueber_neustart_erhalten() {
    let db = TempDb::neu("neustart");
    let mut cfg = test_config(&db);
    drop(Server::neu(cfg.clone()).binden().await.expect("Erster Start"));

    // Neues Initialpasswort aendert bestehende Konten nicht
    cfg.benutzer.erster.initial_passwort = "anders".into();
    let gebunden = Server::neu(cfg).binden().await.expect("Zweiter Start");
    let chat = gebunden.chat_adresse().unwrap();
    let (_shutdown, rx) = watch::channel(false);
    tokio::spawn(gebunden.laufen(rx));

    let mut alice = TcpStream::connect(chat).await.unwrap();
    lesen_bis(&mut alice, ">> ").await;
    alice.write_all(b"login alice anders\r\n").await.unwrap();
    lesen_bis(&mut alice, "Ungueltige Anmeldedaten.").await;
    alice.write_all(b"login alice pa\r\n").await.unwrap();
    lesen_bis(&mut alice, "Angemeldet als alice").await;
}

#[tokio::test]
async fn ungueltige_konfiguration_startet_nicht() {
    let db = TempDb::neu("ungueltig");
    let mut cfg = test_config(&db);
    cfg.benutzer.zweiter.name = "alice".into();
    assert!(Server::neu(cfg).binden().await.is_err());
}
