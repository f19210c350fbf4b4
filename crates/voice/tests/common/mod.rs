//! Gemeinsame Test-Helfer: aufzeichnender Fake-Transport und Fake-Encoder

#![allow(dead_code)]

use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use vorleser_audio::{AudioError, AudioResult, PacketEncoder};
use vorleser_core::{ChannelId, RoomId};
use vorleser_voice::{TransportError, VoiceConnector, VoiceTransport};

/// Beobachtetes Transport-Ereignis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ereignis {
    Verbunden(RoomId, ChannelId),
    Speaking(RoomId, bool),
    Getrennt(RoomId),
}

/// Zeichnet Verbindungen und Speaking-Signale auf
///
/// Die Ausgangs-Queues der Transporte werden pro Raum abgelegt und koennen
/// mit `empfaenger()` abgeholt werden.
pub struct FakeConnector {
    kapazitaet: usize,
    ereignisse: Arc<Mutex<Vec<Ereignis>>>,
    empfaenger: Mutex<HashMap<RoomId, Receiver<Bytes>>>,
    /// Naechster Verbindungsaufbau schlaegt fehl
    pub connect_fehler: AtomicBool,
    /// So viele der naechsten Trennversuche schlagen fehl (ueber alle Raeume)
    pub disconnect_fehler: Arc<AtomicUsize>,
    /// Raeume, deren Trennversuche immer fehlschlagen
    pub disconnect_fehler_raeume: Arc<Mutex<Vec<RoomId>>>,
    pub verbindungen: AtomicUsize,
}

impl FakeConnector {
    pub fn new(kapazitaet: usize) -> Arc<Self> {
        Arc::new(Self {
            kapazitaet,
            ereignisse: Arc::new(Mutex::new(Vec::new())),
            empfaenger: Mutex::new(HashMap::new()),
            connect_fehler: AtomicBool::new(false),
            disconnect_fehler: Arc::new(AtomicUsize::new(0)),
            disconnect_fehler_raeume: Arc::new(Mutex::new(Vec::new())),
            verbindungen: AtomicUsize::new(0),
        })
    }

    pub fn ereignisse(&self) -> Vec<Ereignis> {
        self.ereignisse.lock().clone()
    }

    pub fn speaking_signale(&self, room: RoomId) -> Vec<bool> {
        self.ereignisse
            .lock()
            .iter()
            .filter_map(|e| match e {
                Ereignis::Speaking(r, s) if *r == room => Some(*s),
                _ => None,
            })
            .collect()
    }

    pub fn trennungen(&self, room: RoomId) -> usize {
        self.ereignisse
            .lock()
            .iter()
            .filter(|e| **e == Ereignis::Getrennt(room))
            .count()
    }

    /// Empfangsseite der Ausgangs-Queue eines Raums
    pub fn empfaenger(&self, room: RoomId) -> Receiver<Bytes> {
        self.empfaenger
            .lock()
            .get(&room)
            .cloned()
            .expect("Raum wurde nie verbunden")
    }

    /// Verwirft die Empfangsseite, Sends laufen danach in `TransportClosed`
    pub fn empfaenger_verwerfen(&self, room: RoomId) {
        self.empfaenger.lock().remove(&room);
    }
}

impl VoiceConnector for FakeConnector {
    fn connect(
        &self,
        room: RoomId,
        voice_channel: ChannelId,
    ) -> Result<Box<dyn VoiceTransport>, TransportError> {
        if self.connect_fehler.swap(false, Ordering::SeqCst) {
            return Err(TransportError::new("Gateway nicht erreichbar"));
        }
        self.verbindungen.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = crossbeam_channel::bounded(self.kapazitaet);
        self.empfaenger.lock().insert(room, rx);
        self.ereignisse
            .lock()
            .push(Ereignis::Verbunden(room, voice_channel));

        Ok(Box::new(FakeTransport {
            room,
            tx,
            ereignisse: Arc::clone(&self.ereignisse),
            disconnect_fehler: Arc::clone(&self.disconnect_fehler),
            disconnect_fehler_raeume: Arc::clone(&self.disconnect_fehler_raeume),
        }))
    }
}

pub struct FakeTransport {
    room: RoomId,
    tx: Sender<Bytes>,
    ereignisse: Arc<Mutex<Vec<Ereignis>>>,
    disconnect_fehler: Arc<AtomicUsize>,
    disconnect_fehler_raeume: Arc<Mutex<Vec<RoomId>>>,
}

impl VoiceTransport for FakeTransport {
    fn set_speaking(&mut self, speaking: bool) -> Result<(), TransportError> {
        self.ereignisse
            .lock()
            .push(Ereignis::Speaking(self.room, speaking));
        Ok(())
    }

    fn outbound(&self) -> &Sender<Bytes> {
        &self.tx
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        if self.disconnect_fehler_raeume.lock().contains(&self.room) {
            return Err(TransportError::new("Trennen verweigert"));
        }
        let verbleibend = self.disconnect_fehler.load(Ordering::SeqCst);
        if verbleibend > 0 {
            self.disconnect_fehler.store(verbleibend - 1, Ordering::SeqCst);
            return Err(TransportError::new("Trennen fehlgeschlagen"));
        }
        self.ereignisse.lock().push(Ereignis::Getrennt(self.room));
        Ok(())
    }
}

/// Encoder, dessen Paket die erste und letzte Sample-Stelle des Frames enthaelt
pub struct FakeEncoder {
    frame_size: usize,
    /// Schlaegt beim n-ten Aufruf (0-basiert) fehl
    fehler_bei: Option<usize>,
    aufrufe: usize,
}

impl FakeEncoder {
    pub fn new(frame_size: usize) -> Self {
        Self {
            frame_size,
            fehler_bei: None,
            aufrufe: 0,
        }
    }

    pub fn fehler_bei(mut self, aufruf: usize) -> Self {
        self.fehler_bei = Some(aufruf);
        self
    }
}

impl PacketEncoder for FakeEncoder {
    fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn encode(&mut self, frame: &[i16], out: &mut [u8]) -> AudioResult<usize> {
        let aufruf = self.aufrufe;
        self.aufrufe += 1;
        if self.fehler_bei == Some(aufruf) {
            return Err(AudioError::CodecFehler("kaputt".into()));
        }
        if frame.len() != self.frame_size {
            return Err(AudioError::FrameGroesse {
                erwartet: self.frame_size,
                erhalten: frame.len(),
            });
        }
        out[..2].copy_from_slice(&frame[0].to_le_bytes());
        out[2..4].copy_from_slice(&frame[frame.len() - 1].to_le_bytes());
        Ok(4)
    }
}

/// Erste Sample-Stelle aus einem Fake-Paket
pub fn marke(paket: &[u8]) -> i16 {
    i16::from_le_bytes([paket[0], paket[1]])
}

/// PCM mit einem Frame pro Marke, jeder Frame komplett mit seiner Marke gefuellt
pub fn pcm_mit_marken(marken: &[i16], frame_size: usize) -> Vec<u8> {
    marken
        .iter()
        .flat_map(|&m| std::iter::repeat(m).take(frame_size))
        .flat_map(|s| s.to_le_bytes())
        .collect()
}
