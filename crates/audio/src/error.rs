//! Fehlertypen fuer den Audio-Hot-Path

use thiserror::Error;

/// Alle moeglichen Fehler der Audio-Verarbeitung
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Codec-Fehler: {0}")]
    CodecFehler(String),

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error("PCM-Frame muss {erwartet} Samples lang sein, war {erhalten}")]
    FrameGroesse { erwartet: usize, erhalten: usize },
}

pub type AudioResult<T> = Result<T, AudioError>;
