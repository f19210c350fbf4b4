//! vorleser-voice – Sprach-Sessions und ihre Registry
//!
//! Eine `VoiceSession` gehoert genau einem Raum und schiebt synthetisierte
//! Sprache Frame fuer Frame ueber einen `VoiceTransport` hinaus. Die
//! `SessionRegistry` stellt sicher, dass pro Raum hoechstens eine Session lebt.
//!
//! ## Module
//! - [`transport`] – Schnittstelle zur Sprachverbindung (Speaking-Signal, Ausgangs-Queue)
//! - [`control`] – Abbruch und Deadline fuer blockierende Sends
//! - [`synth`] – Schnittstelle zur Sprachsynthese
//! - [`session`] – Eine Session pro Raum
//! - [`registry`] – Raum -> Session Zuordnung
//! - [`error`] – Fehlertypen

pub mod control;
pub mod error;
pub mod registry;
pub mod session;
pub mod synth;
pub mod transport;

pub use control::{CancelHandle, CancelToken, ReadControl};
pub use error::{VoiceError, VoiceResult};
pub use registry::{EncoderFactory, RegistryConfig, SessionRegistry};
pub use session::{SessionSpec, SessionState, VoiceSession};
pub use synth::{SpeechInput, SpeechSynthesizer, SynthesisError, SynthesisOptions};
pub use transport::{TransportError, VoiceConnector, VoiceTransport};
