//! Fehlertypen fuer Sessions und Registry

use std::sync::Arc;
use thiserror::Error;
use vorleser_audio::AudioError;
use vorleser_core::RoomId;

use crate::session::VoiceSession;
use crate::synth::SynthesisError;
use crate::transport::TransportError;

/// Fehler beim Beitreten, Vorlesen oder Verlassen
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("Sprachverbindung konnte nicht aufgebaut werden: {0}")]
    JoinFailed(TransportError),

    /// Der Raum hat bereits eine Session; sie wird mitgeliefert
    #[error("Bereits in {} beigetreten (Sprachkanal {})", raum(.0), sprachkanal(.0))]
    AlreadyJoined(Arc<VoiceSession>),

    #[error("Kein Beitritt in {0}")]
    NotJoined(RoomId),

    #[error("Frame konnte nicht kodiert werden: {0}")]
    EncodeFailed(AudioError),

    #[error("Encoder konnte nicht erstellt werden: {0}")]
    EncoderSetup(AudioError),

    #[error("Sprachverbindung konnte nicht getrennt werden: {0}")]
    CloseFailed(TransportError),

    #[error("{} Session(s) konnten nicht geschlossen werden", anzahl(.0))]
    CloseAllFailed(Vec<VoiceError>),

    #[error("Vorlesen abgebrochen")]
    Cancelled,

    #[error("Zeitlimit beim Senden ueberschritten")]
    DeadlineExceeded,

    #[error("Ausgangs-Queue des Transports ist geschlossen")]
    TransportClosed,

    #[error("Sprachsynthese fehlgeschlagen: {0}")]
    Synthesis(SynthesisError),
}

/// Result-Alias fuer Voice-Operationen
pub type VoiceResult<T> = std::result::Result<T, VoiceError>;

fn raum(session: &Arc<VoiceSession>) -> RoomId {
    session.room_id()
}

fn sprachkanal(session: &Arc<VoiceSession>) -> vorleser_core::ChannelId {
    session.voice_channel_id()
}

fn anzahl(fehler: &[VoiceError]) -> usize {
    fehler.len()
}
