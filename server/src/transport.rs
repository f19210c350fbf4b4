//! Datei-Transport – schreibt Opus-Pakete statt sie zu streamen
//!
//! Jede Verbindung bekommt einen Schreib-Thread, der die Ausgangs-Queue
//! leert und die Pakete nach `<verzeichnis>/<raum>-<sprachkanal>.opus`
//! schreibt: pro Paket eine Laenge als u16 Little-Endian, dann die Bytes.
//! Mit Takt wird hoechstens ein Paket pro Frame-Dauer geschrieben, die
//! begrenzte Queue laeuft also wie bei einem echten Sprachkanal voll.

use bytes::Bytes;
use crossbeam_channel::{select, Receiver, Sender};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};
use vorleser_core::{ChannelId, RoomId};
use vorleser_voice::{TransportError, VoiceConnector, VoiceTransport};

/// Baut Datei-Transporte in einem Verzeichnis auf
#[derive(Debug, Clone)]
pub struct DateiConnector {
    verzeichnis: PathBuf,
    kapazitaet: usize,
    takt: Option<Duration>,
}

impl DateiConnector {
    pub fn new(verzeichnis: impl Into<PathBuf>, kapazitaet: usize, takt: Option<Duration>) -> Self {
        Self {
            verzeichnis: verzeichnis.into(),
            kapazitaet: kapazitaet.max(1),
            takt,
        }
    }

    /// Zieldatei fuer einen Raum und Sprachkanal
    pub fn pfad(&self, room: RoomId, voice_channel: ChannelId) -> PathBuf {
        self.verzeichnis
            .join(format!("{}-{}.opus", room.get(), voice_channel.get()))
    }
}

impl VoiceConnector for DateiConnector {
    fn connect(
        &self,
        room: RoomId,
        voice_channel: ChannelId,
    ) -> Result<Box<dyn VoiceTransport>, TransportError> {
        std::fs::create_dir_all(&self.verzeichnis)?;
        let pfad = self.pfad(room, voice_channel);
        let datei = File::create(&pfad)?;

        let (tx, rx) = crossbeam_channel::bounded(self.kapazitaet);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let takt = self.takt;

        let schreiber = thread::Builder::new()
            .name(format!("vorleser-{}", room.get()))
            .spawn(move || {
                let ergebnis = pakete_schreiben(BufWriter::new(datei), rx, stop_rx, takt);
                if let Err(e) = &ergebnis {
                    error!(raum = %room, fehler = %e, "Datei-Transport abgebrochen");
                }
                ergebnis
            })?;

        info!(raum = %room, datei = %pfad.display(), "Datei-Transport verbunden");

        Ok(Box::new(DateiTransport {
            room,
            pfad,
            tx,
            stop: Some(stop_tx),
            schreiber: Some(schreiber),
            spricht: false,
        }))
    }
}

/// Verbindung, deren Pakete in eine Datei gehen
pub struct DateiTransport {
    room: RoomId,
    pfad: PathBuf,
    tx: Sender<Bytes>,
    /// Drop beendet den Schreib-Thread
    stop: Option<Sender<()>>,
    schreiber: Option<JoinHandle<std::io::Result<u64>>>,
    spricht: bool,
}

impl DateiTransport {
    pub fn pfad(&self) -> &Path {
        &self.pfad
    }
}

impl VoiceTransport for DateiTransport {
    fn set_speaking(&mut self, speaking: bool) -> Result<(), TransportError> {
        if self.schreiber.is_none() {
            return Err(TransportError::new("Transport ist getrennt"));
        }
        if self.spricht != speaking {
            self.spricht = speaking;
            debug!(raum = %self.room, speaking, "Speaking-Status");
        }
        Ok(())
    }

    fn outbound(&self) -> &Sender<Bytes> {
        &self.tx
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.stop.take();
        let Some(schreiber) = self.schreiber.take() else {
            return Ok(());
        };

        match schreiber.join() {
            Ok(Ok(pakete)) => {
                info!(raum = %self.room, pakete, "Datei-Transport getrennt");
                Ok(())
            }
            Ok(Err(e)) => Err(TransportError::new(format!(
                "Schreiben nach {} fehlgeschlagen: {e}",
                self.pfad.display()
            ))),
            Err(_) => Err(TransportError::new("Schreib-Thread ist abgestuerzt")),
        }
    }
}

impl Drop for DateiTransport {
    fn drop(&mut self) {
        self.stop.take();
        if let Some(schreiber) = self.schreiber.take() {
            let _ = schreiber.join();
        }
    }
}

/// Schreib-Schleife; endet bei Stop, geschlossener Queue oder Schreibfehler
///
/// Nach dem Stop wird der Rest der Queue ohne Takt geschrieben.
fn pakete_schreiben<W: Write>(
    mut ziel: W,
    rx: Receiver<Bytes>,
    stop: Receiver<()>,
    takt: Option<Duration>,
) -> std::io::Result<u64> {
    let ticker = match takt {
        Some(d) => crossbeam_channel::tick(d),
        None => crossbeam_channel::never(),
    };
    let mut geschrieben = 0u64;

    loop {
        let paket = select! {
            recv(rx) -> paket => match paket {
                Ok(paket) => paket,
                Err(_) => break,
            },
            recv(stop) -> _ => break,
        };

        if takt.is_some() {
            select! {
                recv(ticker) -> _ => {}
                recv(stop) -> _ => {}
            }
        }

        paket_schreiben(&mut ziel, &paket)?;
        geschrieben += 1;
    }

    for paket in rx.try_iter() {
        paket_schreiben(&mut ziel, &paket)?;
        geschrieben += 1;
    }

    ziel.flush()?;
    Ok(geschrieben)
}

/// Ein Paket mit u16-LE-Laengenpraefix
pub fn paket_schreiben<W: Write>(ziel: &mut W, paket: &[u8]) -> std::io::Result<()> {
    let laenge = u16::try_from(paket.len()).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Paket groesser als 65535 Bytes")
    })?;
    ziel.write_all(&laenge.to_le_bytes())?;
    ziel.write_all(paket)
}

/// Liest eine vom Datei-Transport geschriebene Datei wieder in Pakete
pub fn pakete_lesen(daten: &[u8]) -> Option<Vec<Bytes>> {
    let mut pakete = Vec::new();
    let mut rest = daten;
    while !rest.is_empty() {
        let kopf = rest.get(..2)?;
        let laenge = u16::from_le_bytes([kopf[0], kopf[1]]) as usize;
        let inhalt = rest.get(2..2 + laenge)?;
        pakete.push(Bytes::copy_from_slice(inhalt));
        rest = &rest[2 + laenge..];
    }
    Some(pakete)
}
