//! Relay-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass das Relay ohne Konfigurationsdatei
//! lauffaehig ist. Verweise auf Umgebungsvariablen (`${VAR}` oder `$VAR`)
//! werden vor dem Parsen ersetzt; unbekannte Variablen werden zu "".

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use vorleser_observability::logging::log_format_gueltig;
use vorleser_protocol::codec::{OpusApplication, OpusConfig, SampleRate};
use vorleser_voice::RegistryConfig;

/// Vollstaendige Relay-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Sessions und Datei-Transport
    pub relay: RelayEinstellungen,
    /// Opus-Encoder
    pub opus: OpusEinstellungen,
    /// Externe Sprachsynthese
    pub synthese: SyntheseEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Sessions und Datei-Transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayEinstellungen {
    /// Abtastrate der Synthese in Hz (8000/12000/16000/24000/48000)
    pub sample_rate: u32,
    /// Pakete, die ein Transport puffert, bevor `read` blockiert
    pub queue_kapazitaet: usize,
    /// Zeitlimit fuer einen kompletten Read (None = unbegrenzt)
    pub sende_timeout_ms: Option<u64>,
    /// Zielverzeichnis des Datei-Transports
    pub ausgabe_verzeichnis: PathBuf,
    /// Abstand zwischen zwei geschriebenen Paketen (0 = ohne Takt)
    pub takt_ms: u64,
    /// Maximal vorgehaltene freie Frame-Puffer
    pub max_idle_frames: usize,
}

impl Default for RelayEinstellungen {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            queue_kapazitaet: 50,
            sende_timeout_ms: None,
            ausgabe_verzeichnis: PathBuf::from("aufnahmen"),
            takt_ms: 20,
            max_idle_frames: 16,
        }
    }
}

/// Opus-Encoder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpusEinstellungen {
    /// Ziel-Bitrate in kbps (6–510)
    pub bitrate_kbps: u16,
    /// Komplexitaet (0–10)
    pub complexity: u8,
    pub fec: bool,
    pub vbr: bool,
    pub application: OpusApplication,
}

impl Default for OpusEinstellungen {
    fn default() -> Self {
        let standard = OpusConfig::default();
        Self {
            bitrate_kbps: standard.bitrate_kbps,
            complexity: standard.complexity,
            fec: standard.fec_enabled,
            vbr: standard.vbr_enabled,
            application: standard.application,
        }
    }
}

/// Externe Sprachsynthese
///
/// Das Programm bekommt den Text auf stdin und schreibt rohes s16le-PCM
/// (Mono, `relay.sample_rate`) nach stdout. In `argumente` werden
/// `{stimme}`, `{tempo}`, `{tonhoehe}` und `{eingabe}` (text/ssml) ersetzt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheseEinstellungen {
    /// Programm (leer = keine Synthese, `say` ist dann nicht verfuegbar)
    pub programm: String,
    pub argumente: Vec<String>,
    /// Stimme, wenn der Befehl keine angibt
    pub stimme: Option<String>,
    /// Zeitlimit fuer einen Syntheseaufruf
    pub timeout_s: u64,
    /// Maximale Eingabegroesse in Bytes
    pub max_eingabe_bytes: usize,
}

impl Default for SyntheseEinstellungen {
    fn default() -> Self {
        Self {
            programm: String::new(),
            argumente: vec![],
            stimme: None,
            timeout_s: 60,
            max_eingabe_bytes: 64 * 1024,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level bzw. Filter-Direktive
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl RelayConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .with_context(|| format!("Konfigurationsfehler in '{pfad}'"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => bail!("Konfigurationsdatei '{pfad}' nicht lesbar: {e}"),
        };

        config.validieren()?;
        Ok(config)
    }

    /// Parst TOML-Text nach Ersetzen der Umgebungsvariablen
    pub fn aus_toml(inhalt: &str) -> anyhow::Result<Self> {
        let expandiert = umgebung_expandieren(inhalt, |name| std::env::var(name).ok());
        Ok(toml::from_str(&expandiert)?)
    }

    /// Prueft Wertebereiche, die serde nicht abdeckt
    pub fn validieren(&self) -> anyhow::Result<()> {
        if self.relay.queue_kapazitaet == 0 {
            bail!("relay.queue_kapazitaet muss mindestens 1 sein");
        }
        self.opus_config()?
            .validieren()
            .map_err(|e| anyhow!("opus: {e}"))?;
        if !log_format_gueltig(&self.logging.format) {
            bail!(
                "logging.format '{}' ist ungueltig (text/json)",
                self.logging.format
            );
        }
        if self.synthese.timeout_s == 0 {
            bail!("synthese.timeout_s muss groesser als 0 sein");
        }
        Ok(())
    }

    /// Abtastrate als Enum
    pub fn sample_rate(&self) -> anyhow::Result<SampleRate> {
        SampleRate::aus_hz(self.relay.sample_rate).ok_or_else(|| {
            anyhow!(
                "relay.sample_rate {} wird nicht unterstuetzt (8000/12000/16000/24000/48000)",
                self.relay.sample_rate
            )
        })
    }

    /// Encoder-Konfiguration aus `[opus]` und `relay.sample_rate`
    pub fn opus_config(&self) -> anyhow::Result<OpusConfig> {
        Ok(OpusConfig {
            bitrate_kbps: self.opus.bitrate_kbps,
            sample_rate: self.sample_rate()?,
            application: self.opus.application,
            fec_enabled: self.opus.fec,
            complexity: self.opus.complexity,
            vbr_enabled: self.opus.vbr,
        })
    }

    pub fn registry_config(&self) -> anyhow::Result<RegistryConfig> {
        Ok(RegistryConfig {
            opus: self.opus_config()?,
            max_idle_frames: self.relay.max_idle_frames,
        })
    }

    pub fn sende_timeout(&self) -> Option<Duration> {
        self.relay.sende_timeout_ms.map(Duration::from_millis)
    }

    pub fn takt(&self) -> Option<Duration> {
        (self.relay.takt_ms > 0).then(|| Duration::from_millis(self.relay.takt_ms))
    }
}

/// Ersetzt `${VAR}` und `$VAR` durch den Wert aus `lookup`
///
/// Unbekannte Variablen werden zu "". Ein `$` ohne gueltigen Namen dahinter
/// bleibt stehen, ebenso ein nicht geschlossenes `${`.
pub fn umgebung_expandieren(text: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut ergebnis = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('$') {
        ergebnis.push_str(&rest[..pos]);
        let nach = &rest[pos + 1..];

        if let Some(klammer) = nach.strip_prefix('{') {
            if let Some(ende) = klammer.find('}') {
                ergebnis.push_str(&lookup(&klammer[..ende]).unwrap_or_default());
                rest = &klammer[ende + 1..];
                continue;
            }
        } else {
            let laenge = nach
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(nach.len());
            if laenge > 0 {
                ergebnis.push_str(&lookup(&nach[..laenge]).unwrap_or_default());
                rest = &nach[laenge..];
                continue;
            }
        }

        ergebnis.push('$');
        rest = nach;
    }

    ergebnis.push_str(rest);
    ergebnis
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "TOKEN" => Some("geheim".into()),
            "DIR" => Some("/tmp/vorleser".into()),
            _ => None,
        }
    }

    #[test]
    fn standard_config_ist_valide() {
        let cfg = RelayConfig::default();
        cfg.validieren().unwrap();
        assert_eq!(cfg.relay.sample_rate, 48_000);
        assert_eq!(cfg.opus_config().unwrap().frame_size(), 960);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.takt(), Some(Duration::from_millis(20)));
        assert_eq!(cfg.sende_timeout(), None);
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [relay]
            sample_rate = 16000
            sende_timeout_ms = 1500

            [opus]
            bitrate_kbps = 32
            application = "audio"
        "#;
        let cfg = RelayConfig::aus_toml(toml).unwrap();
        assert_eq!(cfg.relay.sample_rate, 16_000);
        assert_eq!(cfg.sende_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(cfg.opus.application, OpusApplication::Audio);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.relay.queue_kapazitaet, 50);
        assert_eq!(cfg.opus.complexity, 9);
        assert_eq!(cfg.opus_config().unwrap().frame_size(), 320);
    }

    #[test]
    fn umgebungsvariablen_werden_ersetzt() {
        assert_eq!(umgebung_expandieren("a=${TOKEN}", lookup), "a=geheim");
        assert_eq!(umgebung_expandieren("$DIR/x", lookup), "/tmp/vorleser/x");
        assert_eq!(umgebung_expandieren("${FEHLT}|$FEHLT", lookup), "|");
        assert_eq!(umgebung_expandieren("kosten: 5$", lookup), "kosten: 5$");
        assert_eq!(umgebung_expandieren("$-x ${offen", lookup), "$-x ${offen");
        assert_eq!(umgebung_expandieren("ohne", lookup), "ohne");
    }

    #[test]
    fn ungueltige_werte_werden_abgelehnt() {
        let mut cfg = RelayConfig::default();
        cfg.relay.sample_rate = 44_100;
        assert!(cfg.validieren().is_err());

        let mut cfg = RelayConfig::default();
        cfg.relay.queue_kapazitaet = 0;
        assert!(cfg.validieren().is_err());

        let mut cfg = RelayConfig::default();
        cfg.opus.bitrate_kbps = 600;
        assert!(cfg.validieren().is_err());

        let mut cfg = RelayConfig::default();
        cfg.opus.complexity = 11;
        assert!(cfg.validieren().is_err());

        let mut cfg = RelayConfig::default();
        cfg.logging.format = "xml".into();
        assert!(cfg.validieren().is_err());
    }

    #[test]
    fn fehlende_datei_liefert_standardwerte() {
        let dir = tempfile::tempdir().unwrap();
        let pfad = dir.path().join("gibt-es-nicht.toml");
        let cfg = RelayConfig::laden(pfad.to_str().unwrap()).unwrap();
        assert_eq!(cfg.relay.queue_kapazitaet, 50);
    }

    #[test]
    fn datei_mit_umgebungsvariable_laden() {
        std::env::set_var("VORLESER_TEST_AUSGABE", "/var/lib/vorleser");
        let mut datei = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            datei,
            "[relay]\nausgabe_verzeichnis = \"${{VORLESER_TEST_AUSGABE}}/pakete\""
        )
        .unwrap();

        let cfg = RelayConfig::laden(datei.path().to_str().unwrap()).unwrap();
        assert_eq!(
            cfg.relay.ausgabe_verzeichnis,
            PathBuf::from("/var/lib/vorleser/pakete")
        );
        std::env::remove_var("VORLESER_TEST_AUSGABE");
    }

    #[test]
    fn kaputte_datei_ist_ein_fehler() {
        let mut datei = tempfile::NamedTempFile::new().unwrap();
        writeln!(datei, "[relay\nsample_rate = ").unwrap();
        assert!(RelayConfig::laden(datei.path().to_str().unwrap()).is_err());
    }
}
