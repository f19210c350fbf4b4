//! VoiceSession – die Sprachverbindung eines Raums
//!
//! Zustaende: `Joined` (nach erfolgreichem Verbindungsaufbau) und `Closed`
//! (endgueltig, `close()` ist idempotent).
//!
//! Jede Session hat einen eigenen Mutex, der `read()` und `close()`
//! serialisiert: zwei gleichzeitige Reads verschraenken nie ihre Pakete, und
//! `close()` kann den Transport nicht unter einem laufenden Read abbauen.

use bytes::Bytes;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, trace, warn};
use vorleser_audio::{AudioError, FramePool, FrameSplitter, OpusEncoder, PacketEncoder};
use vorleser_core::{ChannelId, RoomId};
use vorleser_protocol::codec::{OpusConfig, MAX_PAKET_BYTES};

use crate::control::ReadControl;
use crate::error::{VoiceError, VoiceResult};
use crate::synth::{SpeechInput, SpeechSynthesizer, SynthesisOptions};
use crate::transport::{VoiceConnector, VoiceTransport};

/// Zustand einer Session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Joined,
    Closed,
}

/// Raum und Kanaele einer neuen Session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSpec {
    pub room_id: RoomId,
    /// Textkanal, aus dem vorgelesen wird
    pub text_channel_id: ChannelId,
    /// Sprachkanal, in den gesprochen wird
    pub voice_channel_id: ChannelId,
}

struct SessionInner {
    /// `None` nach erfolgreichem `close()`
    transport: Option<Box<dyn VoiceTransport>>,
    encoder: Box<dyn PacketEncoder>,
    pool: FramePool,
}

/// Aktive Sprachverbindung in genau einem Raum
pub struct VoiceSession {
    room_id: RoomId,
    text_channel_id: ChannelId,
    voice_channel_id: ChannelId,
    frame_size: usize,
    geschlossen: AtomicBool,
    inner: Mutex<SessionInner>,
}

impl VoiceSession {
    /// Baut Opus-Encoder und Frame-Pool fuer `opus` auf und verbindet den Transport
    pub fn create(
        spec: SessionSpec,
        opus: &OpusConfig,
        connector: &dyn VoiceConnector,
    ) -> VoiceResult<Self> {
        let encoder = OpusEncoder::new(opus.clone()).map_err(VoiceError::EncoderSetup)?;
        let pool = FramePool::new(opus.frame_size());
        Self::connect(spec, connector, Box::new(encoder), pool)
    }

    /// Verbindet den Transport mit vorhandenem Encoder und Pool
    ///
    /// Encoder und Pool muessen dieselbe Frame-Groesse haben. Schlaegt der
    /// Verbindungsaufbau fehl, entsteht keine Session.
    pub fn connect(
        spec: SessionSpec,
        connector: &dyn VoiceConnector,
        encoder: Box<dyn PacketEncoder>,
        pool: FramePool,
    ) -> VoiceResult<Self> {
        if encoder.frame_size() != pool.frame_size() || pool.frame_size() == 0 {
            return Err(VoiceError::EncoderSetup(AudioError::FrameGroesse {
                erwartet: pool.frame_size(),
                erhalten: encoder.frame_size(),
            }));
        }

        let transport = connector
            .connect(spec.room_id, spec.voice_channel_id)
            .map_err(VoiceError::JoinFailed)?;

        info!(
            raum = %spec.room_id,
            text = %spec.text_channel_id,
            sprache = %spec.voice_channel_id,
            frame_size = pool.frame_size(),
            "Sprachkanal beigetreten"
        );

        Ok(Self {
            room_id: spec.room_id,
            text_channel_id: spec.text_channel_id,
            voice_channel_id: spec.voice_channel_id,
            frame_size: pool.frame_size(),
            geschlossen: AtomicBool::new(false),
            inner: Mutex::new(SessionInner {
                transport: Some(transport),
                encoder,
                pool,
            }),
        })
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn text_channel_id(&self) -> ChannelId {
        self.text_channel_id
    }

    pub fn voice_channel_id(&self) -> ChannelId {
        self.voice_channel_id
    }

    /// Samples pro Frame
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Aktueller Zustand; blockiert nicht waehrend eines laufenden Reads
    pub fn state(&self) -> SessionState {
        if self.geschlossen.load(Ordering::Acquire) {
            SessionState::Closed
        } else {
            SessionState::Joined
        }
    }

    /// Liest rohes s16le-PCM vor und gibt die Anzahl gesendeter Pakete zurueck
    ///
    /// Auf einer geschlossenen Session ein No-op (0 Pakete). Ein Encoder-Fehler
    /// bricht die restlichen Frames ab, bereits gesendete Pakete bleiben
    /// gesendet und die Session bleibt offen.
    pub fn read(&self, pcm: &[u8], ctl: &ReadControl) -> VoiceResult<usize> {
        let mut inner = self.inner.lock();
        let SessionInner {
            transport,
            encoder,
            pool,
        } = &mut *inner;

        let Some(transport) = transport.as_mut() else {
            debug!(raum = %self.room_id, "Session geschlossen, nichts vorgelesen");
            return Ok(0);
        };

        ctl.check()?;

        self.speaking(&mut **transport, true);
        let splitter = FrameSplitter::new(pcm, pool.acquire());
        let ergebnis = pakete_senden(&**transport, &mut **encoder, splitter, ctl);
        self.speaking(&mut **transport, false);

        match &ergebnis {
            Ok(pakete) => debug!(raum = %self.room_id, pakete, bytes = pcm.len(), "Vorgelesen"),
            Err(e) => warn!(raum = %self.room_id, fehler = %e, "Vorlesen abgebrochen"),
        }
        ergebnis
    }

    /// Synthetisiert `input` und liest das Ergebnis vor
    ///
    /// Die Synthese laeuft ausserhalb des Session-Mutex, damit ein laufender
    /// Read nicht auf die Synthese des naechsten warten muss.
    pub fn speak(
        &self,
        synth: &dyn SpeechSynthesizer,
        input: &SpeechInput,
        options: &SynthesisOptions,
        ctl: &ReadControl,
    ) -> VoiceResult<usize> {
        options.validieren().map_err(VoiceError::Synthesis)?;
        ctl.check()?;

        let pcm = match synth.synthesize(input, options, ctl) {
            Ok(pcm) => pcm,
            Err(e) => {
                // Abbruch oder Deadline haben Vorrang vor dem Synthesefehler
                ctl.check()?;
                return Err(VoiceError::Synthesis(e));
            }
        };
        trace!(raum = %self.room_id, bytes = pcm.len(), ssml = input.is_ssml(), "Synthese fertig");

        self.read(&pcm, ctl)
    }

    /// Trennt den Transport; idempotent
    ///
    /// Schlaegt das Trennen fehl, bleibt der Transport erhalten und ein
    /// spaeteres `close()` versucht es erneut.
    pub fn close(&self) -> VoiceResult<()> {
        let mut inner = self.inner.lock();
        let Some(transport) = inner.transport.as_mut() else {
            return Ok(());
        };

        transport.disconnect().map_err(VoiceError::CloseFailed)?;
        inner.transport = None;
        self.geschlossen.store(true, Ordering::Release);

        info!(raum = %self.room_id, sprache = %self.voice_channel_id, "Sprachkanal verlassen");
        Ok(())
    }

    fn speaking(&self, transport: &mut dyn VoiceTransport, speaking: bool) {
        if let Err(e) = transport.set_speaking(speaking) {
            warn!(raum = %self.room_id, speaking, fehler = %e, "Speaking-Signal fehlgeschlagen");
        }
    }
}

/// Kodiert und sendet alle Frames; Abbruch wird zwischen den Frames geprueft
fn pakete_senden(
    transport: &dyn VoiceTransport,
    encoder: &mut dyn PacketEncoder,
    mut splitter: FrameSplitter<'_>,
    ctl: &ReadControl,
) -> VoiceResult<usize> {
    let mut paket = [0u8; MAX_PAKET_BYTES];
    let mut gesendet = 0;

    loop {
        ctl.check()?;
        let Some(frame) = splitter.next_frame() else {
            break;
        };

        let laenge = encoder
            .encode(frame, &mut paket)
            .map_err(VoiceError::EncodeFailed)?;
        ctl.send(transport.outbound(), Bytes::copy_from_slice(&paket[..laenge]))?;

        gesendet += 1;
        trace!(paket = gesendet, laenge, "Paket gesendet");
    }

    Ok(gesendet)
}

impl fmt::Debug for VoiceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceSession")
            .field("room_id", &self.room_id)
            .field("text_channel_id", &self.text_channel_id)
            .field("voice_channel_id", &self.voice_channel_id)
            .field("frame_size", &self.frame_size)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for VoiceSession {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if let Some(mut transport) = inner.transport.take() {
            match transport.disconnect() {
                Ok(()) => debug!(raum = %self.room_id, "Offene Session beim Drop getrennt"),
                Err(e) => warn!(raum = %self.room_id, fehler = %e, "Trennen beim Drop fehlgeschlagen"),
            }
        }
    }
}
