//! SessionRegistry – hoechstens eine Session pro Raum
//!
//! Lookups nehmen den Read-Lock und blockieren sich nicht gegenseitig.
//! `join`, `leave` und `close_all` nehmen den Write-Lock; Existenzpruefung
//! und Einfuegen passieren unter demselben Lock.
//!
//! Eine direkt per `VoiceSession::close()` geschlossene Session gilt als
//! nicht mehr vorhanden: Lookups ueberspringen sie, `join` ersetzt sie und
//! `leave` raeumt sie ab.
//!
//! Alle Sessions einer Registry teilen sich einen `FramePool`.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use vorleser_audio::{AudioResult, FramePool, OpusEncoder, PacketEncoder};
use vorleser_core::{ChannelId, RoomId};
use vorleser_protocol::codec::OpusConfig;

use crate::error::{VoiceError, VoiceResult};
use crate::session::{SessionSpec, SessionState, VoiceSession};
use crate::transport::VoiceConnector;

/// Baut pro Session einen Encoder
pub type EncoderFactory =
    Arc<dyn Fn(&OpusConfig) -> AudioResult<Box<dyn PacketEncoder>> + Send + Sync>;

/// Einstellungen fuer alle Sessions einer Registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Encoder-Einstellungen (bestimmt auch die Frame-Groesse)
    pub opus: OpusConfig,
    /// Maximal vorgehaltene freie Frame-Puffer
    pub max_idle_frames: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            opus: OpusConfig::default(),
            max_idle_frames: vorleser_audio::pool::STANDARD_MAX_FREI,
        }
    }
}

/// Raum -> Session
pub struct SessionRegistry {
    sessions: RwLock<HashMap<RoomId, Arc<VoiceSession>>>,
    connector: Arc<dyn VoiceConnector>,
    encoder_factory: EncoderFactory,
    opus: OpusConfig,
    pool: FramePool,
}

impl SessionRegistry {
    /// Registry mit Opus-Encoder
    pub fn new(config: RegistryConfig, connector: Arc<dyn VoiceConnector>) -> Self {
        let factory: EncoderFactory = Arc::new(|opus: &OpusConfig| {
            let encoder = OpusEncoder::new(opus.clone())?;
            Ok(Box::new(encoder) as Box<dyn PacketEncoder>)
        });
        Self::with_encoder_factory(config, connector, factory)
    }

    /// Registry mit eigener Encoder-Fabrik
    pub fn with_encoder_factory(
        config: RegistryConfig,
        connector: Arc<dyn VoiceConnector>,
        encoder_factory: EncoderFactory,
    ) -> Self {
        let pool = FramePool::with_max_idle(config.opus.frame_size(), config.max_idle_frames);
        Self {
            sessions: RwLock::new(HashMap::new()),
            connector,
            encoder_factory,
            opus: config.opus,
            pool,
        }
    }

    /// Tritt dem Sprachkanal eines Raums bei
    ///
    /// Hat der Raum schon eine Session, bleibt sie unveraendert und wird in
    /// `VoiceError::AlreadyJoined` zurueckgegeben.
    pub fn join(
        &self,
        room: RoomId,
        text_channel: ChannelId,
        voice_channel: ChannelId,
    ) -> VoiceResult<Arc<VoiceSession>> {
        let mut sessions = self.sessions.write();

        if let Some(bestehend) = sessions.get(&room) {
            if aktiv(bestehend) {
                debug!(
                    raum = %room,
                    sprache = %bestehend.voice_channel_id(),
                    "Raum hat bereits eine Session"
                );
                return Err(VoiceError::AlreadyJoined(Arc::clone(bestehend)));
            }
            debug!(raum = %room, "Geschlossene Session wird ersetzt");
            sessions.remove(&room);
        }

        let encoder = (self.encoder_factory)(&self.opus).map_err(VoiceError::EncoderSetup)?;
        let spec = SessionSpec {
            room_id: room,
            text_channel_id: text_channel,
            voice_channel_id: voice_channel,
        };
        let session = Arc::new(VoiceSession::connect(
            spec,
            &*self.connector,
            encoder,
            self.pool.clone(),
        )?);

        sessions.insert(room, Arc::clone(&session));
        info!(raum = %room, aktiv = sessions.len(), "Session registriert");
        Ok(session)
    }

    /// Verlaesst den Sprachkanal eines Raums und gibt dessen ID zurueck
    ///
    /// Schlaegt das Schliessen fehl, bleibt die Session registriert.
    pub fn leave(&self, room: RoomId) -> VoiceResult<ChannelId> {
        let mut sessions = self.sessions.write();
        let session = sessions.get(&room).ok_or(VoiceError::NotJoined(room))?;
        if !aktiv(session) {
            sessions.remove(&room);
            debug!(raum = %room, "Bereits geschlossene Session entfernt");
            return Err(VoiceError::NotJoined(room));
        }

        session.close()?;
        let sprachkanal = session.voice_channel_id();
        sessions.remove(&room);

        info!(raum = %room, aktiv = sessions.len(), "Session entfernt");
        Ok(sprachkanal)
    }

    /// Schliesst alle Sessions und sammelt alle Fehler
    ///
    /// Erfolgreich geschlossene Sessions werden entfernt, fehlgeschlagene
    /// bleiben registriert.
    pub fn close_all(&self) -> VoiceResult<()> {
        let mut sessions = self.sessions.write();
        let vorher = sessions.len();
        let mut fehler = Vec::new();

        sessions.retain(|room, session| match session.close() {
            Ok(()) => false,
            Err(e) => {
                warn!(raum = %room, fehler = %e, "Session konnte nicht geschlossen werden");
                fehler.push(e);
                true
            }
        });

        info!(
            geschlossen = vorher - sessions.len(),
            fehlgeschlagen = fehler.len(),
            "Alle Sessions geschlossen"
        );

        if fehler.is_empty() {
            Ok(())
        } else {
            Err(VoiceError::CloseAllFailed(fehler))
        }
    }

    pub fn get(&self, room: RoomId) -> Option<Arc<VoiceSession>> {
        self.sessions
            .read()
            .get(&room)
            .filter(|s| aktiv(s))
            .cloned()
    }

    /// Textkanal, aus dem im Raum vorgelesen wird
    pub fn text_channel_of(&self, room: RoomId) -> Option<ChannelId> {
        self.sessions
            .read()
            .get(&room)
            .filter(|s| aktiv(s))
            .map(|s| s.text_channel_id())
    }

    /// Anzahl der offenen Sessions
    pub fn len(&self) -> usize {
        self.sessions.read().values().filter(|s| aktiv(s)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Alle Raeume mit Session, aufsteigend sortiert
    pub fn rooms(&self) -> Vec<RoomId> {
        let mut raeume: Vec<RoomId> = self
            .sessions
            .read()
            .iter()
            .filter(|(_, s)| aktiv(s))
            .map(|(room, _)| *room)
            .collect();
        raeume.sort_unstable();
        raeume
    }

    /// Anwesenheitszeile, z.B. "Liest in 3 Raeumen vor"
    pub fn status_line(&self) -> String {
        match self.len() {
            1 => "Liest in 1 Raum vor".to_string(),
            n => format!("Liest in {n} Raeumen vor"),
        }
    }

    /// Gemeinsamer Frame-Pool aller Sessions
    pub fn frame_pool(&self) -> &FramePool {
        &self.pool
    }

    pub fn opus_config(&self) -> &OpusConfig {
        &self.opus
    }
}

fn aktiv(session: &VoiceSession) -> bool {
    session.state() == SessionState::Joined
}
