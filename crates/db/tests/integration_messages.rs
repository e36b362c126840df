//! Integration-Tests fuer die NachrichtenQueue (In-Memory SQLite)

use duo_db::{models::NeueNachricht, NachrichtenQueue, SqliteDb};

async fn db() -> SqliteDb {
    SqliteDb::in_memory()
        .await
        .expect("In-Memory DB konnte nicht erstellt werden")
}

fn nachricht<'a>(sender: &'a str, recipient: &'a str, text: &'a str) -> NeueNachricht<'a> {
    NeueNachricht {
        sender,
        recipient,
        text,
    }
}

#[tokio::test]
async fn eingereihte_nachricht_ist_unzugestellt() {
    let db = db().await;

    let n = db
        .einreihen(nachricht("alice", "bob", "hallo"))
        .await
        .expect("Einreihen fehlgeschlagen");
    assert!(!n.delivered);
    assert!(n.id > 0);

    let offen = db.unzugestellte_laden("bob").await.unwrap();
    assert_eq!(offen.len(), 1);
    assert_eq!(offen[0].text, "hallo");
    assert_eq!(offen[0].sender, "alice");

    assert!(db.unzugestellte_laden("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn unzugestellte_in_sendereihenfolge() {
    let db = db().await;
    for text in ["eins", "zwei", "drei"] {
        db.einreihen(nachricht("alice", "bob", text)).await.unwrap();
    }

    let texte: Vec<String> = db
        .unzugestellte_laden("bob")
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.text)
        .collect();
    assert_eq!(texte, ["eins", "zwei", "drei"]);
}

#[tokio::test]
async fn markieren_ist_monoton_und_idempotent() {
    let db = db().await;
    let a = db.einreihen(nachricht("alice", "bob", "a")).await.unwrap();
    let b = db.einreihen(nachricht("alice", "bob", "b")).await.unwrap();

    assert_eq!(db.als_zugestellt_markieren(&[a.id]).await.unwrap(), 1);
    // Bereits zugestellte Nachrichten zaehlen nicht erneut
    assert_eq!(db.als_zugestellt_markieren(&[a.id, b.id]).await.unwrap(), 1);
    assert_eq!(db.als_zugestellt_markieren(&[a.id, b.id]).await.unwrap(), 0);

    assert!(db.unzugestellte_laden("bob").await.unwrap().is_empty());

    let verlauf = db.verlauf_laden(10).await.unwrap();
    assert!(verlauf.iter().all(|n| n.delivered));
}

#[tokio::test]
async fn leere_id_menge_ist_noop() {
    let db = db().await;
    db.einreihen(nachricht("alice", "bob", "x")).await.unwrap();
    assert_eq!(db.als_zugestellt_markieren(&[]).await.unwrap(), 0);
    assert_eq!(db.unzugestellte_laden("bob").await.unwrap().len(), 1);
}

#[tokio::test]
async fn verlauf_neueste_zuerst_mit_limit() {
    let db = db().await;
    for i in 0..5 {
        let text = format!("n{i}");
        let (von, an) = if i % 2 == 0 { ("alice", "bob") } else { ("bob", "alice") };
        db.einreihen(nachricht(von, an, &text)).await.unwrap();
    }

    let verlauf = db.verlauf_laden(3).await.unwrap();
    let texte: Vec<&str> = verlauf.iter().map(|n| n.text.as_str()).collect();
    assert_eq!(texte, ["n4", "n3", "n2"]);
}
