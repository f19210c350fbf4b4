//! Relay-Konsole – Befehle aus einer Zeile ausfuehren
//!
//! Steht anstelle eines Chat-Gateways: jede Zeile auf stdin ist ein Befehl,
//! jede Antwort eine Zeile auf stdout.
//!
//! - `join raum=<id> text=<id> voice=<id>`
//! - `leave raum=<id>`
//! - `play raum=<id> datei=<pfad>` (rohes s16le-PCM)
//! - `say raum=<id> text=<text> [stimme=] [tempo=] [tonhoehe=] [ssml=1]`
//! - `status`
//! - `quit`

use parking_lot::{Condvar, Mutex};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use vorleser_core::{ChannelId, RoomId};
use vorleser_voice::{
    CancelHandle, CancelToken, ReadControl, SessionRegistry, SpeechInput, SpeechSynthesizer,
    SynthesisOptions, VoiceError, VoiceResult,
};

use crate::error::{KonsoleError, KonsoleResult};
use crate::parser::{fehler_antwort, ok_antwort, parse_line};

/// Ein Konsolen-Befehl
#[derive(Debug, Clone, PartialEq)]
pub enum Befehl {
    Join {
        raum: RoomId,
        text: ChannelId,
        voice: ChannelId,
    },
    Leave {
        raum: RoomId,
    },
    Play {
        raum: RoomId,
        datei: PathBuf,
    },
    Say {
        raum: RoomId,
        eingabe: SpeechInput,
        optionen: SynthesisOptions,
    },
    Status,
    Quit,
}

impl Befehl {
    /// Parst eine Konsolenzeile
    pub fn aus_zeile(zeile: &str) -> KonsoleResult<Self> {
        let cmd = parse_line(zeile)?;
        let befehl = match cmd.name.as_str() {
            "join" => Befehl::Join {
                raum: cmd.parsed_param("raum")?,
                text: cmd.parsed_param("text")?,
                voice: cmd.parsed_param("voice")?,
            },
            "leave" => Befehl::Leave {
                raum: cmd.parsed_param("raum")?,
            },
            "play" => Befehl::Play {
                raum: cmd.parsed_param("raum")?,
                datei: PathBuf::from(cmd.required_param("datei")?),
            },
            "say" => {
                let text = cmd.required_param("text")?.to_string();
                let eingabe = if cmd.flag("ssml") {
                    SpeechInput::Ssml(text)
                } else {
                    SpeechInput::Text(text)
                };
                let optionen = SynthesisOptions {
                    voice_name: cmd.param("stimme").map(str::to_string),
                    speaking_rate: cmd.optional_param("tempo")?,
                    pitch: cmd.optional_param("tonhoehe")?,
                };
                optionen
                    .validieren()
                    .map_err(|e| KonsoleError::UngueltigeEingabe(e.to_string()))?;
                Befehl::Say {
                    raum: cmd.parsed_param("raum")?,
                    eingabe,
                    optionen,
                }
            }
            "status" => Befehl::Status,
            "quit" | "exit" => Befehl::Quit,
            anders => return Err(KonsoleError::UnbekannterBefehl(anders.to_string())),
        };
        Ok(befehl)
    }
}

/// Laufende Befehle und ob das Herunterfahren begonnen hat
#[derive(Debug, Default)]
struct Betrieb {
    laufend: usize,
    beendet: bool,
}

/// Fuehrt Befehle gegen die Session-Registry aus
///
/// Alle Methoden blockieren (Backpressure des Transports) und gehoeren
/// auf einen Blocking-Thread. `herunterfahren` wartet auf alle laufenden
/// Befehle; danach wird jeder Befehl abgelehnt.
pub struct Konsole {
    registry: Arc<SessionRegistry>,
    synthese: Arc<dyn SpeechSynthesizer>,
    abbruch: CancelHandle,
    token: CancelToken,
    sende_timeout: Option<Duration>,
    betrieb: Mutex<Betrieb>,
    leerlauf: Condvar,
}

/// Zaehlt einen Befehl als laufend, bis er gedroppt wird
struct LaufenderBefehl<'a> {
    konsole: &'a Konsole,
}

impl Drop for LaufenderBefehl<'_> {
    fn drop(&mut self) {
        let mut betrieb = self.konsole.betrieb.lock();
        betrieb.laufend -= 1;
        if betrieb.laufend == 0 {
            self.konsole.leerlauf.notify_all();
        }
    }
}

impl Konsole {
    pub fn new(
        registry: Arc<SessionRegistry>,
        synthese: Arc<dyn SpeechSynthesizer>,
        sende_timeout: Option<Duration>,
    ) -> Self {
        let (abbruch, token) = CancelHandle::new();
        Self {
            registry,
            synthese,
            abbruch,
            token,
            sende_timeout,
            betrieb: Mutex::new(Betrieb::default()),
            leerlauf: Condvar::new(),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Fuehrt einen Befehl aus und liefert die Antwortzeile
    pub fn ausfuehren(&self, befehl: &Befehl) -> String {
        let ergebnis = match self.befehl_beginnen() {
            Some(_lauf) => self.ausfuehren_intern(befehl),
            None => Err(KonsoleError::Herunterfahren),
        };
        match ergebnis {
            Ok(antwort) => antwort,
            Err(e) => {
                debug!(?befehl, fehler = %e, "Befehl fehlgeschlagen");
                fehler_antwort(e.code(), &e.to_string())
            }
        }
    }

    fn befehl_beginnen(&self) -> Option<LaufenderBefehl<'_>> {
        let mut betrieb = self.betrieb.lock();
        if betrieb.beendet {
            return None;
        }
        betrieb.laufend += 1;
        Some(LaufenderBefehl { konsole: self })
    }

    fn ausfuehren_intern(&self, befehl: &Befehl) -> KonsoleResult<String> {
        match befehl {
            Befehl::Join { raum, text, voice } => {
                let session = self.registry.join(*raum, *text, *voice)?;
                Ok(ok_antwort(&[
                    ("raum", session.room_id().get().to_string()),
                    ("text", session.text_channel_id().get().to_string()),
                    ("voice", session.voice_channel_id().get().to_string()),
                ]))
            }
            Befehl::Leave { raum } => {
                let voice = self.registry.leave(*raum)?;
                Ok(ok_antwort(&[
                    ("raum", raum.get().to_string()),
                    ("voice", voice.get().to_string()),
                ]))
            }
            Befehl::Play { raum, datei } => {
                let session = self.registry.get(*raum).ok_or(VoiceError::NotJoined(*raum))?;
                let pcm = std::fs::read(datei)?;
                let pakete = session.read(&pcm, &self.read_control())?;
                Ok(ok_antwort(&[("pakete", pakete.to_string())]))
            }
            Befehl::Say {
                raum,
                eingabe,
                optionen,
            } => {
                let session = self.registry.get(*raum).ok_or(VoiceError::NotJoined(*raum))?;
                let pakete = session.speak(
                    &*self.synthese,
                    eingabe,
                    optionen,
                    &self.read_control(),
                )?;
                Ok(ok_antwort(&[("pakete", pakete.to_string())]))
            }
            Befehl::Status => Ok(ok_antwort(&[
                ("sessions", self.registry.len().to_string()),
                ("status", self.registry.status_line()),
            ])),
            Befehl::Quit => Ok(ok_antwort(&[])),
        }
    }

    fn read_control(&self) -> ReadControl {
        let ctl = ReadControl::none().with_cancel(self.token.clone());
        match self.sende_timeout {
            Some(timeout) => ctl.with_timeout(timeout),
            None => ctl,
        }
    }

    /// Bricht laufende Reads ab, wartet auf laufende Befehle und schliesst
    /// danach alle Sessions
    pub fn herunterfahren(&self) -> VoiceResult<()> {
        let mut betrieb = self.betrieb.lock();
        betrieb.beendet = true;
        self.abbruch.cancel();
        info!(
            sessions = self.registry.len(),
            laufend = betrieb.laufend,
            "Relay wird heruntergefahren"
        );
        while betrieb.laufend > 0 {
            self.leerlauf.wait(&mut betrieb);
        }
        drop(betrieb);

        self.registry.close_all()
    }
}
