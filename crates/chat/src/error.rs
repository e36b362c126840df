//! Fehlertypen fuer das Chat-Crate

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Nachrichten-Queue nicht beschreibbar; die Nachricht ist nicht gespeichert
    #[error("Persistenzfehler: {0}")]
    Persistenz(#[from] duo_db::DbError),

    #[error("Unbekannte Identitaet: {0}")]
    UnbekannteIdentitaet(String),
}

pub type ChatResult<T> = Result<T, ChatError>;
