//! Sprachsynthese-Schnittstelle
//!
//! Die Synthese liegt ausserhalb dieses Crates. Sie nimmt Text oder SSML
//! plus optionale Stimme, Sprechtempo und Tonhoehe entgegen und liefert
//! rohes PCM: 16 Bit signed, Little-Endian, Mono, in der Abtastrate der Session.

use thiserror::Error;

use crate::control::ReadControl;

/// Standard-Sprechtempo (1.0 = normal)
pub const STANDARD_SPRECHTEMPO: f64 = 1.0;
/// Kleinstes erlaubtes Sprechtempo
pub const MIN_SPRECHTEMPO: f64 = 0.25;
/// Groesstes erlaubtes Sprechtempo
pub const MAX_SPRECHTEMPO: f64 = 4.0;

/// Standard-Tonhoehe in Halbtoenen
pub const STANDARD_TONHOEHE: f64 = 0.0;
pub const MIN_TONHOEHE: f64 = -20.0;
pub const MAX_TONHOEHE: f64 = 20.0;

/// Fehler der Sprachsynthese
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthesisError {
    #[error("Ungueltige Syntheseoption: {0}")]
    UngueltigeOption(String),

    #[error("Synthese fehlgeschlagen: {0}")]
    Fehlgeschlagen(String),

    #[error("Synthese abgebrochen")]
    Abgebrochen,
}

/// Eingabe fuer die Synthese
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechInput {
    /// Klartext
    Text(String),
    /// SSML-Markup
    Ssml(String),
}

impl SpeechInput {
    pub fn as_str(&self) -> &str {
        match self {
            SpeechInput::Text(s) | SpeechInput::Ssml(s) => s,
        }
    }

    pub fn is_ssml(&self) -> bool {
        matches!(self, SpeechInput::Ssml(_))
    }
}

/// Optionale Syntheseparameter; fehlende Werte nehmen den Standard der Synthese
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesisOptions {
    pub voice_name: Option<String>,
    pub speaking_rate: Option<f64>,
    pub pitch: Option<f64>,
}

impl SynthesisOptions {
    pub fn with_voice_name(mut self, name: impl Into<String>) -> Self {
        self.voice_name = Some(name.into());
        self
    }

    pub fn with_speaking_rate(mut self, rate: f64) -> Self {
        self.speaking_rate = Some(rate);
        self
    }

    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = Some(pitch);
        self
    }

    /// Sprechtempo oder Standardwert
    pub fn speaking_rate_or_default(&self) -> f64 {
        self.speaking_rate.unwrap_or(STANDARD_SPRECHTEMPO)
    }

    /// Tonhoehe oder Standardwert
    pub fn pitch_or_default(&self) -> f64 {
        self.pitch.unwrap_or(STANDARD_TONHOEHE)
    }

    /// Prueft die Wertebereiche (NaN ist immer ungueltig)
    pub fn validieren(&self) -> Result<(), SynthesisError> {
        if let Some(rate) = self.speaking_rate {
            if !(MIN_SPRECHTEMPO..=MAX_SPRECHTEMPO).contains(&rate) {
                return Err(SynthesisError::UngueltigeOption(format!(
                    "Sprechtempo {rate} ausserhalb {MIN_SPRECHTEMPO}..={MAX_SPRECHTEMPO}"
                )));
            }
        }
        if let Some(pitch) = self.pitch {
            if !(MIN_TONHOEHE..=MAX_TONHOEHE).contains(&pitch) {
                return Err(SynthesisError::UngueltigeOption(format!(
                    "Tonhoehe {pitch} ausserhalb {MIN_TONHOEHE}..={MAX_TONHOEHE}"
                )));
            }
        }
        if self.voice_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(SynthesisError::UngueltigeOption(
                "Stimmenname darf nicht leer sein".into(),
            ));
        }
        Ok(())
    }
}

/// Erzeugt rohes s16le-PCM aus Text oder SSML
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthetisiert `input`
    ///
    /// Eine lang laufende Synthese soll `ctl` beobachten und bei Abbruch oder
    /// abgelaufener Deadline mit `SynthesisError::Abgebrochen` zurueckkehren.
    fn synthesize(
        &self,
        input: &SpeechInput,
        options: &SynthesisOptions,
        ctl: &ReadControl,
    ) -> Result<Vec<u8>, SynthesisError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardwerte() {
        let opts = SynthesisOptions::default();
        assert_eq!(opts.speaking_rate_or_default(), 1.0);
        assert_eq!(opts.pitch_or_default(), 0.0);
        assert!(opts.validieren().is_ok());
    }

    #[test]
    fn grenzen_sind_inklusive() {
        for rate in [0.25, 4.0] {
            assert!(SynthesisOptions::default()
                .with_speaking_rate(rate)
                .validieren()
                .is_ok());
        }
        for pitch in [-20.0, 20.0] {
            assert!(SynthesisOptions::default().with_pitch(pitch).validieren().is_ok());
        }
    }

    #[test]
    fn ungueltige_werte_werden_abgelehnt() {
        let faelle = [
            SynthesisOptions::default().with_speaking_rate(0.2),
            SynthesisOptions::default().with_speaking_rate(4.5),
            SynthesisOptions::default().with_speaking_rate(f64::NAN),
            SynthesisOptions::default().with_pitch(-20.5),
            SynthesisOptions::default().with_pitch(f64::INFINITY),
            SynthesisOptions::default().with_voice_name("  "),
        ];
        for opts in faelle {
            assert!(
                matches!(opts.validieren(), Err(SynthesisError::UngueltigeOption(_))),
                "{opts:?} haette abgelehnt werden muessen"
            );
        }
    }

    #[test]
    fn eingabe_art() {
        let text = SpeechInput::Text("hallo".into());
        let ssml = SpeechInput::Ssml("<speak>hallo</speak>".into());
        assert!(!text.is_ssml());
        assert!(ssml.is_ssml());
        assert_eq!(text.as_str(), "hallo");
        assert_eq!(ssml.as_str(), "<speak>hallo</speak>");
    }
}
