//! duo-auth – Anmeldung der beiden Teilnehmer
//!
//! - Passwort-Hashing mit Argon2id
//! - AuthService (Anmeldedaten pruefen, Standardkonten anlegen)

pub mod error;
pub mod password;
pub mod service;

pub use error::{AuthError, AuthResult};
pub use password::{passwort_hashen, passwort_hashen_mit, passwort_verifizieren, HashKosten};
pub use service::AuthService;
