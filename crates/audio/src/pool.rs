//! Frame-Pool – wiederverwendbare Sample-Puffer fester Groesse
//!
//! Vermeidet Allokationen im eingeschwungenen Audio-Pfad. Ein Puffer wird
//! per `acquire()` als `FrameLease` ausgeliehen und beim Drop (oder via
//! `release()`) automatisch zurueckgegeben, auch auf Fehlerpfaden.
//! Der Inhalt eines zurueckgegebenen Puffers wird nicht geloescht.
//!
//! Thread-safe: mehrere Sessions teilen sich einen Pool, jeder Puffer hat
//! zu jedem Zeitpunkt hoechstens einen Entleiher.

use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::trace;

/// Standard-Obergrenze fuer freie Puffer im Pool
pub const STANDARD_MAX_FREI: usize = 16;

/// Pool fuer Sample-Puffer einer festen Groesse
///
/// Klonen ist billig – alle Klone teilen denselben Pool.
#[derive(Debug, Clone)]
pub struct FramePool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    /// Samples pro Puffer
    frame_size: usize,
    /// Maximal vorgehaltene freie Puffer (Ueberschuss wird freigegeben)
    max_frei: usize,
    /// Freie Puffer, zuletzt zurueckgegebener oben
    frei: Mutex<Vec<Box<[i16]>>>,
}

impl FramePool {
    /// Erstellt einen Pool fuer Puffer mit `frame_size` Samples
    pub fn new(frame_size: usize) -> Self {
        Self::with_max_idle(frame_size, STANDARD_MAX_FREI)
    }

    /// Erstellt einen Pool, der hoechstens `max_frei` freie Puffer vorhaelt
    pub fn with_max_idle(frame_size: usize, max_frei: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                frame_size,
                max_frei,
                frei: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Gibt die Puffergroesse in Samples zurueck
    pub fn frame_size(&self) -> usize {
        self.inner.frame_size
    }

    /// Leiht einen Puffer aus – wiederverwendet falls vorhanden, sonst neu allokiert
    pub fn acquire(&self) -> FrameLease {
        let wiederverwendet = self.inner.frei.lock().pop();
        let buffer = wiederverwendet.unwrap_or_else(|| {
            trace!(frame_size = self.inner.frame_size, "Frame-Puffer neu allokiert");
            vec![0i16; self.inner.frame_size].into_boxed_slice()
        });

        FrameLease {
            buffer,
            pool: Arc::clone(&self.inner),
        }
    }

    /// Gibt einen Puffer explizit zurueck (gleichbedeutend mit Drop)
    pub fn release(&self, lease: FrameLease) {
        drop(lease);
    }

    /// Anzahl der aktuell freien Puffer
    pub fn idle(&self) -> usize {
        self.inner.frei.lock().len()
    }
}

/// Ausgeliehener Sample-Puffer
///
/// Exklusiv im Besitz des Entleihers; geht beim Drop an den Pool zurueck.
#[derive(Debug)]
pub struct FrameLease {
    buffer: Box<[i16]>,
    pool: Arc<PoolInner>,
}

impl Deref for FrameLease {
    type Target = [i16];

    fn deref(&self) -> &[i16] {
        &self.buffer
    }
}

impl DerefMut for FrameLease {
    fn deref_mut(&mut self) -> &mut [i16] {
        &mut self.buffer
    }
}

impl Drop for FrameLease {
    fn drop(&mut self) {
        let buffer = std::mem::take(&mut self.buffer);
        if buffer.len() != self.pool.frame_size {
            return;
        }

        let mut frei = self.pool.frei.lock();
        if frei.len() < self.pool.max_frei {
            frei.push(buffer);
        }
    }
}
