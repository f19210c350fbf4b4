//! Frame-Splitter – zerlegt Roh-PCM in Frames fester Groesse
//!
//! Laeuft in Fenstern von `frame_size * 2` Bytes ueber den s16le-Puffer der
//! Sprachsynthese und dekodiert jedes Fenster in denselben geliehenen Puffer.
//! Ein kuerzeres letztes Fenster wird ab dem ersten ungeschriebenen Index
//! mit Stille (0) aufgefuellt.
//!
//! Die Sequenz ist endlich und nicht neu startbar; sie liefert
//! `ceil(len / frame_bytes)` Frames, bei leerer Eingabe keinen.

use tracing::trace;
use vorleser_protocol::pcm::{self, ByteOrder};

use crate::pool::FrameLease;

/// Zerlegt einen PCM-Byte-Puffer in Frames
///
/// Der von `next_frame()` gelieferte Slice ist nur bis zum naechsten Aufruf
/// gueltig – der Konsument muss mit dem Frame fertig sein, bevor der Puffer
/// ueberschrieben wird.
#[derive(Debug)]
pub struct FrameSplitter<'a> {
    pcm: &'a [u8],
    offset: usize,
    frame_bytes: usize,
    frame: FrameLease,
    last_decoded: usize,
}

impl<'a> FrameSplitter<'a> {
    /// Erstellt einen Splitter ueber `pcm` (s16le, Mono) mit geliehenem Frame-Puffer
    pub fn new(pcm: &'a [u8], frame: FrameLease) -> Self {
        let frame_bytes = pcm::samples_to_bytes::<i16>(frame.len());
        Self {
            pcm,
            offset: 0,
            frame_bytes,
            frame,
            last_decoded: 0,
        }
    }

    /// Samples pro Frame
    pub fn frame_size(&self) -> usize {
        self.frame.len()
    }

    /// Gesamtzahl der Frames ueber den ganzen Puffer
    pub fn frame_count(&self) -> usize {
        if self.frame_bytes == 0 {
            return 0;
        }
        self.pcm.len().div_ceil(self.frame_bytes)
    }

    /// Anzahl der noch nicht gelieferten Frames
    pub fn remaining_frames(&self) -> usize {
        if self.frame_bytes == 0 {
            return 0;
        }
        (self.pcm.len() - self.offset).div_ceil(self.frame_bytes)
    }

    /// Anzahl der echten (nicht aufgefuellten) Samples im zuletzt gelieferten Frame
    pub fn last_decoded(&self) -> usize {
        self.last_decoded
    }

    /// Liefert den naechsten Frame oder `None` wenn der Puffer erschoepft ist
    pub fn next_frame(&mut self) -> Option<&[i16]> {
        if self.frame_bytes == 0 || self.offset >= self.pcm.len() {
            return None;
        }

        let ende = (self.offset + self.frame_bytes).min(self.pcm.len());
        let fenster = &self.pcm[self.offset..ende];
        self.offset = ende;

        let dekodiert = pcm::decode::<i16>(&mut self.frame[..], fenster, ByteOrder::Little);
        if dekodiert < self.frame.len() {
            self.frame[dekodiert..].fill(0);
            trace!(
                dekodiert,
                aufgefuellt = self.frame.len() - dekodiert,
                "Letzten Frame mit Stille aufgefuellt"
            );
        }
        self.last_decoded = dekodiert;

        Some(&self.frame[..])
    }

    /// Ruft `f` fuer jeden verbleibenden Frame auf und bricht beim ersten Fehler ab
    pub fn for_each_frame<E, F>(mut self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&[i16]) -> Result<(), E>,
    {
        while let Some(frame) = self.next_frame() {
            f(frame)?;
        }
        Ok(())
    }
}
