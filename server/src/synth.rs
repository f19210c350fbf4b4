//! Sprachsynthese ueber ein externes Programm
//!
//! Der Text geht auf stdin, rohes s16le-PCM kommt von stdout zurueck.
//! Eingabegroesse und Laufzeit sind begrenzt; bei Zeitueberschreitung,
//! Abbruch oder abgelaufener Deadline wird der Prozess beendet.

use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::Handle;
use tracing::debug;
use vorleser_voice::{
    ReadControl, SpeechInput, SpeechSynthesizer, SynthesisError, SynthesisOptions,
};

use crate::config::SyntheseEinstellungen;

/// Wie oft waehrend der Synthese auf Abbruch und Deadline geprueft wird
const ABBRUCH_PRUEFINTERVALL: Duration = Duration::from_millis(20);

/// Synthese durch ein externes Programm
#[derive(Debug, Clone)]
pub struct ProzessSynthese {
    programm: String,
    argumente: Vec<String>,
    stimme: Option<String>,
    timeout: Duration,
    max_eingabe_bytes: usize,
    runtime: Handle,
}

impl ProzessSynthese {
    /// `runtime` treibt Prozess und Zeitlimit; `synthesize` darf nicht auf
    /// einem Worker dieser Runtime laufen (z.B. via `spawn_blocking`)
    pub fn new(einstellungen: &SyntheseEinstellungen, runtime: Handle) -> Self {
        Self {
            programm: einstellungen.programm.clone(),
            argumente: einstellungen.argumente.clone(),
            stimme: einstellungen.stimme.clone(),
            timeout: Duration::from_secs(einstellungen.timeout_s),
            max_eingabe_bytes: einstellungen.max_eingabe_bytes,
            runtime,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Setzt Stimme, Tempo, Tonhoehe und Eingabeart in die Argumentvorlage ein
    pub fn argumente(&self, input: &SpeechInput, options: &SynthesisOptions) -> Vec<String> {
        let stimme = options
            .voice_name
            .as_deref()
            .or(self.stimme.as_deref())
            .unwrap_or_default();
        let tempo = options.speaking_rate_or_default().to_string();
        let tonhoehe = options.pitch_or_default().to_string();
        let eingabe = if input.is_ssml() { "ssml" } else { "text" };

        self.argumente
            .iter()
            .map(|arg| {
                arg.replace("{stimme}", stimme)
                    .replace("{tempo}", &tempo)
                    .replace("{tonhoehe}", &tonhoehe)
                    .replace("{eingabe}", eingabe)
            })
            .collect()
    }

    async fn ausfuehren(
        &self,
        argumente: Vec<String>,
        text: String,
        ctl: &ReadControl,
    ) -> Result<Vec<u8>, SynthesisError> {
        let mut child = Command::new(&self.programm)
            .args(&argumente)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SynthesisError::Fehlgeschlagen(format!("{} nicht startbar: {e}", self.programm))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SynthesisError::Fehlgeschlagen("stdin nicht verfuegbar".into()))?;

        // Eigener Task, damit ein voller stdout-Puffer das Schreiben nicht blockiert
        let schreiber = tokio::spawn(async move {
            stdin.write_all(text.as_bytes()).await?;
            stdin.shutdown().await
        });

        // Verlieren beide Zweige, wird `child` gedroppt und per kill_on_drop beendet
        let ausgabe = tokio::select! {
            ergebnis = tokio::time::timeout(self.timeout, child.wait_with_output()) => ergebnis
                .map_err(|_| {
                    SynthesisError::Fehlgeschlagen(format!(
                        "Zeitlimit von {} ms ueberschritten",
                        self.timeout.as_millis()
                    ))
                })?
                .map_err(|e| SynthesisError::Fehlgeschlagen(format!("Warten fehlgeschlagen: {e}")))?,
            _ = abbruch_abwarten(ctl) => {
                debug!(programm = %self.programm, "Synthese abgebrochen, Prozess wird beendet");
                return Err(SynthesisError::Abgebrochen);
            }
        };

        if !ausgabe.status.success() {
            let stderr = String::from_utf8_lossy(&ausgabe.stderr);
            return Err(SynthesisError::Fehlgeschlagen(format!(
                "{} beendet mit {}: {}",
                self.programm,
                ausgabe.status,
                stderr.trim()
            )));
        }

        match schreiber.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(SynthesisError::Fehlgeschlagen(format!(
                    "Schreiben auf stdin fehlgeschlagen: {e}"
                )))
            }
            Err(e) => {
                return Err(SynthesisError::Fehlgeschlagen(format!(
                    "stdin-Task fehlgeschlagen: {e}"
                )))
            }
        }

        Ok(ausgabe.stdout)
    }
}

impl SpeechSynthesizer for ProzessSynthese {
    fn synthesize(
        &self,
        input: &SpeechInput,
        options: &SynthesisOptions,
        ctl: &ReadControl,
    ) -> Result<Vec<u8>, SynthesisError> {
        if self.programm.is_empty() {
            return Err(SynthesisError::Fehlgeschlagen(
                "Keine Sprachsynthese konfiguriert (synthese.programm)".into(),
            ));
        }
        let text = input.as_str();
        if text.len() > self.max_eingabe_bytes {
            return Err(SynthesisError::UngueltigeOption(format!(
                "Eingabe zu gross: {} Bytes (Grenze {})",
                text.len(),
                self.max_eingabe_bytes
            )));
        }

        let argumente = self.argumente(input, options);
        debug!(programm = %self.programm, ?argumente, bytes = text.len(), "Starte Synthese");

        self.runtime
            .block_on(self.ausfuehren(argumente, text.to_owned(), ctl))
    }
}

/// Kehrt zurueck, sobald `ctl` abgebrochen oder abgelaufen ist
async fn abbruch_abwarten(ctl: &ReadControl) {
    if ctl.cancel.is_none() && ctl.deadline.is_none() {
        return std::future::pending().await;
    }
    let mut takt = tokio::time::interval(ABBRUCH_PRUEFINTERVALL);
    loop {
        takt.tick().await;
        if ctl.check().is_err() {
            return;
        }
    }
}
