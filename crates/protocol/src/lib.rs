//! vorleser-protocol – Audio-Formatdefinitionen
//!
//! Dieses Crate definiert das feste Linear-PCM-Byte-Layout zwischen
//! Sprachsynthese und Relay sowie die Opus-Konfiguration der Pakete,
//! die an den Voice-Transport gehen.

pub mod codec;
pub mod pcm;

pub use codec::{OpusApplication, OpusConfig, SampleRate, FRAME_DAUER_MS, MAX_PAKET_BYTES};
pub use pcm::{ByteOrder, Sample};
