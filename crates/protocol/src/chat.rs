//! Zeilenbasiertes Chat-Protokoll
//!
//! Der Client schickt eine Zeile pro Eingabe. Vor dem Login wird nur
//! `login <name> <passwort>` akzeptiert, danach Slash-Befehle oder freier
//! Text. Ausgehende Zeilen sind ANSI-eingefaerbt und enden auf `\r\n`.

use chrono::{DateTime, Local, Utc};

/// Standardanzahl fuer `/history` ohne (gueltiges) Argument
pub const VERLAUF_STANDARD: usize = 50;
/// Groesste zulaessige Anzahl fuer `/history N`
pub const VERLAUF_MAXIMUM: usize = 1000;
/// Maximale Laenge einer Chat-Nachricht in Zeichen
pub const MAX_NACHRICHTENLAENGE: usize = 4096;

const RESET: &str = "\x1b[0m";

// ---------------------------------------------------------------------------
// Eingehend
// ---------------------------------------------------------------------------

/// Eingabe vor erfolgreichem Login
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VorLogin {
    /// `login <name> <passwort…>`; das Passwort darf Leerzeichen enthalten
    Login { name: String, passwort: String },
    /// `login` mit zu wenigen Argumenten
    Unvollstaendig,
    /// Alles andere
    Sonstiges,
}

/// Befehl eines angemeldeten Clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Befehl {
    Beenden,
    /// `/history [N]`, N bereits auf den gueltigen Bereich geprueft
    Verlauf(usize),
    VideoAnfragen,
    VideoAnnehmen,
    VideoAblehnen,
    /// Leere Zeile: nur Prompt erneut anzeigen
    Leer,
    Nachricht(String),
}

/// Parst eine Zeile vor dem Login
pub fn vor_login_parsen(zeile: &str) -> VorLogin {
    let zeile = zeile.trim();
    let mut teile = zeile.split_whitespace();
    if teile.next() != Some("login") {
        return VorLogin::Sonstiges;
    }
    let Some(name) = teile.next() else {
        return VorLogin::Unvollstaendig;
    };
    let passwort: Vec<&str> = teile.collect();
    if passwort.is_empty() {
        return VorLogin::Unvollstaendig;
    }
    VorLogin::Login {
        name: name.to_string(),
        passwort: passwort.join(" "),
    }
}

/// Parst eine Zeile eines angemeldeten Clients
pub fn befehl_parsen(zeile: &str) -> Befehl {
    let zeile = zeile.trim();
    let mut teile = zeile.split_whitespace();
    match teile.next() {
        None => Befehl::Leer,
        Some("/quit") if teile.next().is_none() => Befehl::Beenden,
        Some("/video") if teile.next().is_none() => Befehl::VideoAnfragen,
        Some("/acceptvideo") if teile.next().is_none() => Befehl::VideoAnnehmen,
        Some("/declinevideo") if teile.next().is_none() => Befehl::VideoAblehnen,
        Some("/history") => {
            let argumente: Vec<&str> = teile.collect();
            let anzahl = match argumente.as_slice() {
                [n] => n
                    .parse::<usize>()
                    .ok()
                    .filter(|n| (1..=VERLAUF_MAXIMUM).contains(n))
                    .unwrap_or(VERLAUF_STANDARD),
                _ => VERLAUF_STANDARD,
            };
            Befehl::Verlauf(anzahl)
        }
        Some(_) => Befehl::Nachricht(zeile.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Ausgehend
// ---------------------------------------------------------------------------

/// Anzeigefarbe einer Zeile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Farbe {
    /// Erste Identitaet des Paares
    Gruen,
    /// Zweite Identitaet des Paares
    Cyan,
    /// Systemmeldungen
    Gelb,
}

impl Farbe {
    pub fn ansi(self) -> &'static str {
        match self {
            Self::Gruen => "\x1b[32m",
            Self::Cyan => "\x1b[36m",
            Self::Gelb => "\x1b[33m",
        }
    }

    /// Farbe eines Teilnehmers
    pub fn fuer_teilnehmer(ist_erster: bool) -> Self {
        if ist_erster {
            Self::Gruen
        } else {
            Self::Cyan
        }
    }
}

/// Eingefaerbte Zeile inklusive `\r\n`
pub fn zeile(farbe: Farbe, text: &str) -> String {
    format!("{}{}{}\r\n", farbe.ansi(), text, RESET)
}

/// Systemmeldung (gelb)
pub fn system(text: &str) -> String {
    zeile(Farbe::Gelb, text)
}

/// Prompt vor dem Login
pub fn system_prompt() -> String {
    format!("{}>> {}", Farbe::Gelb.ansi(), RESET)
}

/// Persoenlicher Prompt nach dem Login
pub fn prompt(farbe: Farbe) -> String {
    format!("{}> {}", farbe.ansi(), RESET)
}

fn uhrzeit(zeitpunkt: &DateTime<Utc>) -> String {
    zeitpunkt.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// Live-Nachricht bzw. Verlaufszeile: `[HH:MM:SS] sender: text`
pub fn nachricht(farbe: Farbe, zeitpunkt: &DateTime<Utc>, sender: &str, text: &str) -> String {
    zeile(farbe, &format!("[{}] {}: {}", uhrzeit(zeitpunkt), sender, text))
}

/// Nachgereichte Nachricht: `[verpasst HH:MM:SS] sender: text`
pub fn verpasst(farbe: Farbe, zeitpunkt: &DateTime<Utc>, sender: &str, text: &str) -> String {
    zeile(
        farbe,
        &format!("[verpasst {}] {}: {}", uhrzeit(zeitpunkt), sender, text),
    )
}

/// Begruessung direkt nach dem Verbindungsaufbau
pub fn begruessung(erster: &str, zweiter: &str) -> String {
    let mut s = String::new();
    s.push_str(&system("Willkommen bei Duo!"));
    s.push_str(&system("Anmelden mit:  login <name> <passwort>"));
    s.push_str(&system(&format!("Teilnehmer: {erster}, {zweiter}")));
    s.push_str(&system(
        "Befehle: /quit, /history [N], /video, /acceptvideo, /declinevideo",
    ));
    s
}
