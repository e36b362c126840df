//! Passwort-Hashing mit Argon2id
//!
//! Hashes werden als PHC-String gespeichert. Die Verifikation liest
//! Algorithmus und Parameter aus dem String selbst, daher bleiben alte
//! Hashes gueltig, wenn sich die Kosten aendern.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::error::AuthError;

/// Kostenparameter fuer Argon2id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashKosten {
    pub speicher_kib: u32,
    pub iterationen: u32,
}

impl HashKosten {
    /// 64 MiB, 3 Iterationen
    pub const STANDARD: Self = Self {
        speicher_kib: 64 * 1024,
        iterationen: 3,
    };

    /// Minimale Kosten, nur fuer Tests
    pub const GERING: Self = Self {
        speicher_kib: 8,
        iterationen: 1,
    };
}

impl Default for HashKosten {
    fn default() -> Self {
        Self::STANDARD
    }
}

fn argon2_instanz(kosten: HashKosten) -> Result<Argon2<'static>, AuthError> {
    let params = Params::new(kosten.speicher_kib, kosten.iterationen, 1, None)
        .map_err(|e| AuthError::PasswortHashing(format!("Argon2-Parameter ungueltig: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hasht ein Passwort mit Standardkosten und zufaelligem Salt
pub fn passwort_hashen(passwort: &str) -> Result<String, AuthError> {
    passwort_hashen_mit(passwort, HashKosten::STANDARD)
}

pub fn passwort_hashen_mit(passwort: &str, kosten: HashKosten) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    argon2_instanz(kosten)?
        .hash_password(passwort.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswortHashing(e.to_string()))
}

/// Verifiziert ein Passwort gegen einen gespeicherten PHC-Hash
pub fn passwort_verifizieren(passwort: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AuthError::PasswortHashing(format!("Ungueltiges Hash-Format: {e}")))?;

    match Argon2::default().verify_password(passwort.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::PasswortHashing(e.to_string())),
    }
}
