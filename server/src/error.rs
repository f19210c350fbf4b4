//! Fehlertypen der Relay-Konsole

use thiserror::Error;
use vorleser_voice::VoiceError;

#[derive(Debug, Error)]
pub enum KonsoleError {
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    #[error("Unbekannter Befehl: {0}")]
    UnbekannterBefehl(String),

    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    #[error("Relay wird heruntergefahren")]
    Herunterfahren,

    #[error("Audiodatei nicht lesbar: {0}")]
    Datei(#[from] std::io::Error),

    #[error("{0}")]
    Voice(#[from] VoiceError),
}

impl KonsoleError {
    /// Fehlercode fuer die Antwortzeile
    pub fn code(&self) -> u32 {
        match self {
            KonsoleError::Protokoll(_) => 1,
            KonsoleError::UnbekannterBefehl(_) => 2,
            KonsoleError::UngueltigeEingabe(_) => 3,
            KonsoleError::Datei(_) => 4,
            KonsoleError::Herunterfahren => 5,
            KonsoleError::Voice(e) => match e {
                VoiceError::JoinFailed(_) => 100,
                VoiceError::AlreadyJoined(_) => 101,
                VoiceError::NotJoined(_) => 102,
                VoiceError::EncodeFailed(_) | VoiceError::EncoderSetup(_) => 103,
                VoiceError::CloseFailed(_) | VoiceError::CloseAllFailed(_) => 104,
                VoiceError::Cancelled => 105,
                VoiceError::DeadlineExceeded => 106,
                VoiceError::TransportClosed => 107,
                VoiceError::Synthesis(_) => 108,
            },
        }
    }
}

pub type KonsoleResult<T> = Result<T, KonsoleError>;
