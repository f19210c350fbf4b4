//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable (hat Vorrang vor der Config-Datei):
//! - `VORLESER_LOG_LEVEL`: Filter-Direktive (trace/debug/info/warn/error
//!   oder z.B. `vorleser_voice=trace`), Standard: info
//! - `VORLESER_LOG_FORMAT`: Format (text/json), Standard: text
//!
//! Ausgabe geht nach stderr; stdout gehoert der Konsole des Relays.

use std::str::FromStr;
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "VORLESER_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "VORLESER_LOG_FORMAT";

/// Ausgabeformat der Logs
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            anders => Err(format!("Unbekanntes Log-Format '{anders}' (text/json)")),
        }
    }
}

/// Initialisiert das Logging-System.
///
/// `VORLESER_LOG_LEVEL` und `VORLESER_LOG_FORMAT` ueberschreiben die
/// uebergebenen Werte. Ein ungueltiger Filter faellt auf `info` zurueck.
/// Ein zweiter Aufruf im selben Prozess ist wirkungslos.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = format_aufloesen(std::env::var(ENV_LOG_FORMAT).ok(), format);

    let ergebnis = match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init(),
    };

    if ergebnis.is_err() {
        tracing::debug!("Logging war bereits initialisiert");
    }
}

/// Umgebung vor Config, ungueltige Werte fallen auf Text zurueck
fn format_aufloesen(aus_env: Option<String>, aus_config: &str) -> LogFormat {
    aus_env
        .as_deref()
        .unwrap_or(aus_config)
        .parse()
        .unwrap_or_default()
}

/// Gibt den konfigurierten Log-Level aus der Umgebung zurueck.
/// Fallback: "info"
pub fn log_level_aus_env() -> String {
    std::env::var(ENV_LOG_LEVEL).unwrap_or_else(|_| "info".to_string())
}

/// Gibt das konfigurierte Log-Format aus der Umgebung zurueck.
/// Fallback: "text"
pub fn log_format_aus_env() -> String {
    std::env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| "text".to_string())
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    format.parse::<LogFormat>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_gueltige_werte() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(log_level_gueltig(level), "{level}");
        }
    }

    #[test]
    fn log_level_ungueltige_werte() {
        assert!(!log_level_gueltig("verbose"));
        assert!(!log_level_gueltig("INFO")); // Gross-/Kleinschreibung
        assert!(!log_level_gueltig(""));
    }

    #[test]
    fn log_format_parsen() {
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("JSON".parse::<LogFormat>().is_err());
        assert!(!log_format_gueltig("xml"));
        assert!(log_format_gueltig("json"));
    }

    #[test]
    fn umgebung_hat_vorrang_vor_config() {
        assert_eq!(format_aufloesen(Some("json".into()), "text"), LogFormat::Json);
        assert_eq!(format_aufloesen(None, "json"), LogFormat::Json);
        assert_eq!(format_aufloesen(Some("xml".into()), "json"), LogFormat::Text);
        assert_eq!(format_aufloesen(None, ""), LogFormat::Text);
    }

    #[test]
    fn log_aus_env_mit_fallback() {
        // Einziger Test, der die Variablen anfasst
        std::env::remove_var(ENV_LOG_LEVEL);
        std::env::remove_var(ENV_LOG_FORMAT);
        assert_eq!(log_level_aus_env(), "info");
        assert_eq!(log_format_aus_env(), "text");

        std::env::set_var(ENV_LOG_LEVEL, "debug");
        std::env::set_var(ENV_LOG_FORMAT, "json");
        assert_eq!(log_level_aus_env(), "debug");
        assert_eq!(log_format_aus_env(), "json");

        std::env::remove_var(ENV_LOG_LEVEL);
        std::env::remove_var(ENV_LOG_FORMAT);
    }

    #[test]
    fn doppelte_initialisierung_ist_harmlos() {
        logging_initialisieren("debug", "text");
        logging_initialisieren("info", "json");
    }
}
