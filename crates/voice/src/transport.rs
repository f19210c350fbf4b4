//! Transport-Schnittstelle – die Sprachverbindung eines Raums
//!
//! Der Transport bietet drei Dinge: ein Speaking-Signal, das vor und nach
//! einem Paket-Burst umgeschaltet wird, eine begrenzte Ausgangs-Queue fuer
//! kodierte Pakete und das Trennen der Verbindung. Ein Send auf die volle
//! Queue blockiert; das ist die Backpressure des Systems.

use bytes::Bytes;
use crossbeam_channel::Sender;
use thiserror::Error;
use vorleser_core::{ChannelId, RoomId};

/// Fehler der Sprachverbindung
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{nachricht}")]
pub struct TransportError {
    nachricht: String,
}

impl TransportError {
    pub fn new(nachricht: impl Into<String>) -> Self {
        Self {
            nachricht: nachricht.into(),
        }
    }

    pub fn nachricht(&self) -> &str {
        &self.nachricht
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Bestehende Sprachverbindung in einem Raum
pub trait VoiceTransport: Send {
    /// Signalisiert Sprechbeginn (`true`) bzw. Sprechende (`false`)
    fn set_speaking(&mut self, speaking: bool) -> Result<(), TransportError>;

    /// Begrenzte Ausgangs-Queue fuer kodierte Pakete
    fn outbound(&self) -> &Sender<Bytes>;

    /// Verlaesst den Sprachkanal
    fn disconnect(&mut self) -> Result<(), TransportError>;
}

/// Baut Sprachverbindungen auf
pub trait VoiceConnector: Send + Sync {
    fn connect(
        &self,
        room: RoomId,
        voice_channel: ChannelId,
    ) -> Result<Box<dyn VoiceTransport>, TransportError>;
}
