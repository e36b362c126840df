//! SQLite-Backend-Implementierungen fuer alle Repository-Traits

pub mod messages;
pub mod pool;
pub mod users;

pub use pool::SqliteDb;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::DbError;

/// RFC 3339 mit Millisekunden; lexikalische Ordnung = zeitliche Ordnung
pub(crate) fn zeit_formatieren(zeit: &DateTime<Utc>) -> String {
    zeit.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn zeit_parsen(feld: &str, wert: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(wert)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::intern(format!("Ungueltige {feld} '{wert}': {e}")))
}
