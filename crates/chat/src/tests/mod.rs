//! Service- und Verbindungstests fuer duo-chat

mod verbindung_tests;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

use duo_auth::{AuthService, HashKosten};
use duo_core::{FestesPaar, Identitaet, VerbindungsEmpfaenger};
use duo_db::{
    models::{NachrichtRecord, NeueNachricht},
    DbError, DbResult, NachrichtenQueue, SqliteDb,
};
use duo_observability::DuoMetrics;

use crate::{ChatConfig, ChatHandle, ChatState};

pub(crate) const PASSWORT_ALICE: &str = "pw-alice";
pub(crate) const PASSWORT_BOB: &str = "pw bob";

pub(crate) fn alice() -> Identitaet {
    Identitaet::neu("alice")
}

pub(crate) fn bob() -> Identitaet {
    Identitaet::neu("bob")
}

pub(crate) struct TestUmgebung {
    pub state: Arc<ChatState>,
    pub db: Arc<SqliteDb>,
}

/// ChatState auf In-Memory-SQLite mit angelegten Konten alice/bob
pub(crate) async fn umgebung() -> TestUmgebung {
    let db = Arc::new(
        SqliteDb::in_memory()
            .await
            .expect("In-Memory-DB konnte nicht geoeffnet werden"),
    );
    let state = state_mit_queue(db.clone(), db.clone()).await;
    TestUmgebung { state, db }
}

pub(crate) async fn state_mit_queue(
    queue: Arc<dyn NachrichtenQueue>,
    konten: Arc<SqliteDb>,
) -> Arc<ChatState> {
    let auth = AuthService::neu(konten).mit_hash_kosten(HashKosten::GERING);
    auth.standardbenutzer_anlegen(&[("alice", PASSWORT_ALICE), ("bob", PASSWORT_BOB)])
        .await
        .expect("Konten anlegen fehlgeschlagen");

    let paar = FestesPaar::neu("alice", "bob").expect("Paar ungueltig");
    let config = ChatConfig {
        max_zeilenlaenge: 8192,
        sende_queue_kapazitaet: 64,
        video_basis_url: "http://video.test:5001".into(),
    };

    Arc::new(ChatState::neu(
        config,
        Arc::new(paar),
        queue,
        auth,
        DuoMetrics::neu().expect("Metriken konnten nicht erstellt werden"),
    ))
}

/// Meldet `identitaet` direkt an der Registry an (ohne Socket)
pub(crate) fn anmelden(
    state: &ChatState,
    identitaet: Identitaet,
) -> (ChatHandle, VerbindungsEmpfaenger<String>) {
    let (handle, rx) = ChatHandle::paar(64);
    state.anmelden(identitaet, handle.clone());
    (handle, rx)
}

/// Alle bisher eingereihten Zeilen
pub(crate) fn leeren(rx: &mut VerbindungsEmpfaenger<String>) -> Vec<String> {
    let mut zeilen = Vec::new();
    while let Some(z) = rx.try_naechste() {
        zeilen.push(z);
    }
    zeilen
}

/// Liest, bis `muster` im Gelesenen vorkommt (Timeout 5 s)
pub(crate) async fn lesen_bis<R: AsyncRead + Unpin>(leser: &mut R, muster: &str) -> String {
    let mut puffer = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let mut block = [0u8; 1024];
        loop {
            if String::from_utf8_lossy(&puffer).contains(muster) {
                return;
            }
            let n = leser.read(&mut block).await.expect("Lesen fehlgeschlagen");
            if n == 0 {
                return;
            }
            puffer.extend_from_slice(&block[..n]);
        }
    })
    .await;

    let text = String::from_utf8_lossy(&puffer).into_owned();
    assert!(text.contains(muster), "'{muster}' nicht empfangen, gelesen: {text:?}");
    text
}

/// Queue-Double, dessen Schreibzugriffe immer scheitern
pub(crate) struct DefekteQueue;

#[async_trait]
impl NachrichtenQueue for DefekteQueue {
    async fn einreihen(&self, _nachricht: NeueNachricht<'_>) -> DbResult<NachrichtRecord> {
        Err(DbError::intern("Datentraeger voll"))
    }

    async fn als_zugestellt_markieren(&self, _ids: &[i64]) -> DbResult<u64> {
        Err(DbError::intern("Datentraeger voll"))
    }

    async fn unzugestellte_laden(&self, _empfaenger: &str) -> DbResult<Vec<NachrichtRecord>> {
        Ok(Vec::new())
    }

    async fn verlauf_laden(&self, _limit: u32) -> DbResult<Vec<NachrichtRecord>> {
        Ok(Vec::new())
    }
}
