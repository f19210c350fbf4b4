//! Paket-Encoder
//!
//! `PacketEncoder` ist die Schnittstelle zum nachgelagerten Codec: genau
//! `frame_size()` Samples rein, ein Paket von hoechstens 1276 Bytes raus.
//! `OpusEncoder` kapselt audiopus (libopus) fuer i16-PCM in Mono.

use audiopus::{coder::Encoder, Application, Channels, SampleRate};
use tracing::debug;

use crate::error::{AudioError, AudioResult};
use vorleser_protocol::codec::{OpusApplication, OpusConfig, SampleRate as ProtocolSampleRate};

/// Kodiert einen PCM-Frame fester Laenge in ein Paket
pub trait PacketEncoder: Send {
    /// Erwartete Frame-Groesse in Samples
    fn frame_size(&self) -> usize;

    /// Kodiert `frame` nach `out` und gibt die Paketlaenge in Bytes zurueck
    ///
    /// Die Eingabe muss exakt `frame_size()` Samples lang sein.
    fn encode(&mut self, frame: &[i16], out: &mut [u8]) -> AudioResult<usize>;
}

/// Opus-Encoder: kodiert i16-PCM (Mono) zu Opus-Paketen
pub struct OpusEncoder {
    encoder: Encoder,
    config: OpusConfig,
    frame_size: usize,
}

impl OpusEncoder {
    /// Erstellt einen neuen Encoder mit der gegebenen Konfiguration
    pub fn new(config: OpusConfig) -> AudioResult<Self> {
        config.validieren().map_err(AudioError::Konfiguration)?;

        let sample_rate = protocol_rate_to_audiopus(config.sample_rate);
        let application = protocol_app_to_audiopus(config.application);

        let mut encoder = Encoder::new(sample_rate, Channels::Mono, application)
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        // Bitrate setzen
        encoder
            .set_bitrate(audiopus::Bitrate::BitsPerSecond(
                (config.bitrate_kbps as i32) * 1000,
            ))
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        // Komplexitaet setzen (audiopus 0.2 erwartet u8)
        encoder
            .set_complexity(config.complexity)
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        // VBR
        encoder
            .set_vbr(config.vbr_enabled)
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        // FEC
        encoder
            .set_inband_fec(config.fec_enabled)
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        let frame_size = config.frame_size();

        debug!(
            "OpusEncoder erstellt: {}kbps, {:?}, frame_size={}",
            config.bitrate_kbps, config.sample_rate, frame_size
        );

        Ok(Self {
            encoder,
            config,
            frame_size,
        })
    }

    /// Gibt die aktuelle Konfiguration zurueck
    pub fn config(&self) -> &OpusConfig {
        &self.config
    }
}

impl PacketEncoder for OpusEncoder {
    fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn encode(&mut self, frame: &[i16], out: &mut [u8]) -> AudioResult<usize> {
        if frame.len() != self.frame_size {
            return Err(AudioError::FrameGroesse {
                erwartet: self.frame_size,
                erhalten: frame.len(),
            });
        }

        self.encoder
            .encode(frame, out)
            .map_err(|e| AudioError::CodecFehler(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Konvertierungs-Hilfsfunktionen
// ---------------------------------------------------------------------------

fn protocol_rate_to_audiopus(rate: ProtocolSampleRate) -> SampleRate {
    match rate {
        ProtocolSampleRate::Hz8000 => SampleRate::Hz8000,
        ProtocolSampleRate::Hz12000 => SampleRate::Hz12000,
        ProtocolSampleRate::Hz16000 => SampleRate::Hz16000,
        ProtocolSampleRate::Hz24000 => SampleRate::Hz24000,
        ProtocolSampleRate::Hz48000 => SampleRate::Hz48000,
    }
}

fn protocol_app_to_audiopus(app: OpusApplication) -> Application {
    match app {
        OpusApplication::Voip => Application::Voip,
        OpusApplication::Audio => Application::Audio,
        OpusApplication::RestrictedLowdelay => Application::LowDelay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vorleser_protocol::codec::MAX_PAKET_BYTES;

    #[test]
    fn encoder_konfiguration_48khz() {
        let enc = OpusEncoder::new(OpusConfig::default()).unwrap();
        // 20ms bei 48kHz = 960 Samples
        assert_eq!(enc.frame_size(), 960);
        assert_eq!(enc.config().bitrate_kbps, 64);
    }

    #[test]
    fn encoder_konfiguration_16khz() {
        let config = OpusConfig {
            sample_rate: ProtocolSampleRate::Hz16000,
            bitrate_kbps: 32,
            ..OpusConfig::default()
        };
        let enc = OpusEncoder::new(config).unwrap();
        assert_eq!(enc.frame_size(), 320);
    }

    #[test]
    fn encoder_falscher_frame_size_fehler() {
        let mut enc = OpusEncoder::new(OpusConfig::default()).unwrap();
        let mut paket = [0u8; MAX_PAKET_BYTES];
        // 960 Samples erwartet, aber 100 uebergeben
        let result = enc.encode(&[0i16; 100], &mut paket);
        assert!(matches!(
            result,
            Err(AudioError::FrameGroesse {
                erwartet: 960,
                erhalten: 100
            })
        ));
    }

    #[test]
    fn encoder_kodiert_frame_in_paketgrenze() {
        let mut enc = OpusEncoder::new(OpusConfig::default()).unwrap();
        let frame: Vec<i16> = (0..960)
            .map(|i| ((i as f32 / 960.0 * 40.0).sin() * 8000.0) as i16)
            .collect();

        let mut paket = [0u8; MAX_PAKET_BYTES];
        let n = enc.encode(&frame, &mut paket).expect("Encoding sollte funktionieren");
        assert!(n > 0);
        assert!(n <= MAX_PAKET_BYTES);
    }

    #[test]
    fn encoder_ungueltige_konfiguration() {
        let config = OpusConfig {
            bitrate_kbps: 5, // Ungueltig
            ..OpusConfig::default()
        };
        assert!(matches!(
            OpusEncoder::new(config),
            Err(AudioError::Konfiguration(_))
        ));
    }
}
