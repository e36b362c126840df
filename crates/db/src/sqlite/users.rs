//! SQLite-Implementierung des UserRepository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row as _;

use crate::error::DbError;
use crate::models::{BenutzerRecord, NeuerBenutzer};
use crate::repository::{DbResult, UserRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{zeit_formatieren, zeit_parsen};

#[async_trait]
impl UserRepository for SqliteDb {
    async fn create(&self, data: NeuerBenutzer<'_>) -> DbResult<BenutzerRecord> {
        let jetzt = Utc::now();

        sqlx::query("INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)")
            .bind(data.username)
            .bind(data.password_hash)
            .bind(zeit_formatieren(&jetzt))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("UNIQUE") || msg.contains("unique") {
                    DbError::Eindeutigkeit(format!(
                        "Benutzername '{}' bereits vergeben",
                        data.username
                    ))
                } else {
                    DbError::Sqlx(e)
                }
            })?;

        Ok(BenutzerRecord {
            username: data.username.to_string(),
            password_hash: data.password_hash.to_string(),
            created_at: jetzt,
        })
    }

    async fn get_by_name(&self, username: &str) -> DbResult<Option<BenutzerRecord>> {
        let row = sqlx::query(
            "SELECT username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_benutzer(&r)).transpose()
    }
}

fn row_to_benutzer(row: &sqlx::sqlite::SqliteRow) -> DbResult<BenutzerRecord> {
    let created_at: String = row.try_get("created_at")?;
    Ok(BenutzerRecord {
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        created_at: zeit_parsen("created_at", &created_at)?,
    })
}
