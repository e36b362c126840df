//! Auth-Service fuer Duo
//!
//! Prueft Anmeldedaten gegen das UserRepository und legt beim Start die
//! Konten der beiden Teilnehmer an, falls sie noch fehlen.

use std::sync::Arc;

use duo_db::{models::NeuerBenutzer, UserRepository};

use crate::{
    error::{AuthError, AuthResult},
    password::{passwort_hashen_mit, passwort_verifizieren, HashKosten},
};

/// Auth-Service – Einstiegspunkt fuer alle Anmeldevorgaenge
#[derive(Clone)]
pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    kosten: HashKosten,
}

impl AuthService {
    pub fn neu(user_repo: Arc<dyn UserRepository>) -> Self {
        Self {
            user_repo,
            kosten: HashKosten::STANDARD,
        }
    }

    /// Setzt die Argon2-Kosten fuer neu angelegte Konten
    pub fn mit_hash_kosten(mut self, kosten: HashKosten) -> Self {
        self.kosten = kosten;
        self
    }

    /// Prueft Name und Passwort; unbekannte Benutzer ergeben `false`
    pub async fn verifizieren(&self, username: &str, passwort: &str) -> AuthResult<bool> {
        let Some(benutzer) = self.user_repo.get_by_name(username).await? else {
            return Ok(false);
        };
        passwort_verifizieren(passwort, &benutzer.password_hash)
    }

    /// Wie `verifizieren`, aber falsche Anmeldedaten sind ein Fehler
    pub async fn anmelden(&self, username: &str, passwort: &str) -> AuthResult<()> {
        if self.verifizieren(username, passwort).await? {
            tracing::info!(username = %username, "Benutzer angemeldet");
            Ok(())
        } else {
            tracing::warn!(username = %username, "Fehlgeschlagener Login-Versuch");
            Err(AuthError::UngueltigeAnmeldedaten)
        }
    }

    /// Legt fehlende Konten mit Initialpasswort an
    ///
    /// Bestehende Konten bleiben unveraendert. Gibt die Anzahl neu
    /// angelegter Konten zurueck.
    pub async fn standardbenutzer_anlegen(&self, konten: &[(&str, &str)]) -> AuthResult<usize> {
        let mut angelegt = 0;
        for &(username, passwort) in konten {
            if self.user_repo.get_by_name(username).await?.is_some() {
                continue;
            }
            let password_hash = passwort_hashen_mit(passwort, self.kosten)?;
            self.user_repo
                .create(NeuerBenutzer {
                    username,
                    password_hash: &password_hash,
                })
                .await?;
            tracing::warn!(
                username = %username,
                "Konto mit Initialpasswort angelegt – bitte Passwort aendern"
            );
            angelegt += 1;
        }
        Ok(angelegt)
    }
}
