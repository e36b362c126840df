//! SQLite-Implementierung der NachrichtenQueue

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row as _;

use crate::models::{NachrichtRecord, NeueNachricht};
use crate::repository::{DbResult, NachrichtenQueue};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{zeit_formatieren, zeit_parsen};

const SPALTEN: &str = "id, sender, recipient, text, created_at, delivered";

#[async_trait]
impl NachrichtenQueue for SqliteDb {
    async fn einreihen(&self, nachricht: NeueNachricht<'_>) -> DbResult<NachrichtRecord> {
        let jetzt = Utc::now();

        let id = sqlx::query(
            "INSERT INTO messages (sender, recipient, text, created_at, delivered)
             VALUES (?, ?, ?, ?, 0)",
        )
        .bind(nachricht.sender)
        .bind(nachricht.recipient)
        .bind(nachricht.text)
        .bind(zeit_formatieren(&jetzt))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        tracing::trace!(id, sender = nachricht.sender, "Nachricht eingereiht");

        Ok(NachrichtRecord {
            id,
            sender: nachricht.sender.to_string(),
            recipient: nachricht.recipient.to_string(),
            text: nachricht.text.to_string(),
            created_at: jetzt,
            delivered: false,
        })
    }

    async fn als_zugestellt_markieren(&self, ids: &[i64]) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let platzhalter = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "UPDATE messages SET delivered = 1 WHERE delivered = 0 AND id IN ({platzhalter})"
        );
        let mut q = sqlx::query(&sql);
        for id in ids {
            q = q.bind(id);
        }

        Ok(q.execute(&self.pool).await?.rows_affected())
    }

    async fn unzugestellte_laden(&self, empfaenger: &str) -> DbResult<Vec<NachrichtRecord>> {
        let sql = format!(
            "SELECT {SPALTEN} FROM messages
             WHERE recipient = ? AND delivered = 0
             ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(empfaenger)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_nachricht).collect()
    }

    async fn verlauf_laden(&self, limit: u32) -> DbResult<Vec<NachrichtRecord>> {
        let sql = format!(
            "SELECT {SPALTEN} FROM messages ORDER BY created_at DESC, id DESC LIMIT ?"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_nachricht).collect()
    }
}

fn row_to_nachricht(row: &sqlx::sqlite::SqliteRow) -> DbResult<NachrichtRecord> {
    let created_at: String = row.try_get("created_at")?;
    let delivered: i64 = row.try_get("delivered")?;

    Ok(NachrichtRecord {
        id: row.try_get("id")?,
        sender: row.try_get("sender")?,
        recipient: row.try_get("recipient")?,
        text: row.try_get("text")?,
        created_at: zeit_parsen("created_at", &created_at)?,
        delivered: delivered != 0,
    })
}
