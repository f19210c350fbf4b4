//! Zeilenparser der Relay-Konsole
//!
//! Parst zeilenbasierte Befehle im Format:
//!   befehlsname key1=value1 key2="value with spaces" key3=wert3
//!
//! Sonderzeichen in Werten werden mit Backslash escaped:
//!   \s = Leerzeichen, \n = Newline, \\ = Backslash, \" = Anfuehrungszeichen

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{KonsoleError, KonsoleResult};

/// Eine geparste Befehlszeile
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    /// Befehlsname (z.B. "join", "say")
    pub name: String,
    /// Key-Value-Parameter
    pub params: HashMap<String, String>,
}

impl ParsedCommand {
    /// Gibt einen Parameter als String zurueck
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(|s| s.as_str())
    }

    /// Gibt einen Pflicht-Parameter zurueck oder einen Fehler
    pub fn required_param(&self, key: &str) -> KonsoleResult<&str> {
        self.param(key).ok_or_else(|| {
            KonsoleError::UngueltigeEingabe(format!("Pflicht-Parameter fehlt: {key}"))
        })
    }

    /// Parst einen Pflicht-Parameter (z.B. Raum- und Kanal-IDs)
    pub fn parsed_param<T: FromStr>(&self, key: &str) -> KonsoleResult<T> {
        let s = self.required_param(key)?;
        s.parse::<T>().map_err(|_| {
            KonsoleError::UngueltigeEingabe(format!("Ungueltiger Wert fuer '{key}': {s}"))
        })
    }

    /// Parst einen optionalen Parameter
    pub fn optional_param<T: FromStr>(&self, key: &str) -> KonsoleResult<Option<T>> {
        match self.param(key) {
            None => Ok(None),
            Some(_) => self.parsed_param(key).map(Some),
        }
    }

    /// Schalter wie `ssml=1`
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.param(key), Some("1" | "true" | "ja"))
    }
}

/// Parst eine Befehlszeile
///
/// Format: `befehlsname [key=value ...]`
/// Werte koennen mit " " gequotet oder mit \s escaped sein.
pub fn parse_line(line: &str) -> KonsoleResult<ParsedCommand> {
    let line = line.trim();
    if line.is_empty() {
        return Err(KonsoleError::Protokoll("Leere Befehlszeile".into()));
    }

    let tokens = tokenize(line)?;
    let Some((name, rest)) = tokens.split_first() else {
        return Err(KonsoleError::Protokoll("Kein Befehlsname".into()));
    };

    let mut params = HashMap::new();
    for token in rest {
        match token.split_once('=') {
            Some((key, value)) => {
                params.insert(key.to_lowercase(), value.to_string());
            }
            None => {
                return Err(KonsoleError::Protokoll(format!(
                    "Parameter ohne Wert: {token}"
                )))
            }
        }
    }

    Ok(ParsedCommand {
        name: name.to_lowercase(),
        params,
    })
}

/// Zerlegt eine Zeile in Tokens, beachtet quoted Strings und Escapes
fn tokenize(input: &str) -> KonsoleResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            '\\' => match chars.next() {
                Some('s') => current.push(' '),
                Some('n') => current.push('\n'),
                Some('\\') => current.push('\\'),
                Some('"') => current.push('"'),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            _ => current.push(c),
        }
    }

    if in_quotes {
        return Err(KonsoleError::Protokoll(
            "Anfuehrungszeichen nicht geschlossen".into(),
        ));
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    Ok(tokens)
}

/// Kodiert einen Wert fuer die Ausgabe (Escape-Sequenzen einfuegen)
pub fn encode_value(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(' ', "\\s")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
}

/// Erstellt eine Erfolgs-Antwortzeile
pub fn ok_antwort(params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return "ok".to_string();
    }
    let kv: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, encode_value(v)))
        .collect();
    format!("ok {}", kv.join(" "))
}

/// Erstellt eine Fehler-Antwortzeile
pub fn fehler_antwort(code: u32, nachricht: &str) -> String {
    format!("error id={} msg={}", code, encode_value(nachricht))
}
