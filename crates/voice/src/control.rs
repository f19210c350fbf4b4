//! Abbruch und Deadlines fuer das Vorlesen
//!
//! Ein `CancelToken` wird ueber einen Kanal signalisiert, der nie eine
//! Nachricht traegt: sobald der `CancelHandle` abbricht oder gedroppt wird,
//! ist der Kanal getrennt und jedes `recv` auf dem Token kehrt sofort zurueck.
//! Dadurch laesst sich der Abbruch direkt in ein `select!` neben dem
//! blockierenden Paket-Send einhaengen.

use bytes::Bytes;
use crossbeam_channel::{select, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

use crate::error::{VoiceError, VoiceResult};

// ---------------------------------------------------------------------------
// Abbruch
// ---------------------------------------------------------------------------

/// Ausloeser fuer einen Abbruch; Drop bricht ebenfalls ab
#[derive(Debug)]
pub struct CancelHandle {
    tx: Mutex<Option<Sender<()>>>,
}

/// Beobachtet einen `CancelHandle`
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: Receiver<()>,
}

impl CancelHandle {
    /// Erstellt einen Handle mit zugehoerigem Token
    pub fn new() -> (CancelHandle, CancelToken) {
        let (tx, rx) = crossbeam_channel::bounded(0);
        (
            CancelHandle {
                tx: Mutex::new(Some(tx)),
            },
            CancelToken { rx },
        )
    }

    /// Bricht alle Leser dieses Handles ab (idempotent)
    pub fn cancel(&self) {
        self.tx.lock().take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.lock().is_none()
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }
}

// ---------------------------------------------------------------------------
// ReadControl
// ---------------------------------------------------------------------------

/// Abbruch-Token und Deadline fuer einen Read-Aufruf
#[derive(Debug, Clone, Default)]
pub struct ReadControl {
    pub cancel: Option<CancelToken>,
    pub deadline: Option<Instant>,
}

impl ReadControl {
    /// Ohne Abbruch und ohne Deadline: Sends blockieren unbegrenzt
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline relativ zu jetzt
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Prueft Abbruch und Deadline ohne zu blockieren
    pub fn check(&self) -> VoiceResult<()> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(VoiceError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(VoiceError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Blockierender Send auf die Ausgangs-Queue
    ///
    /// Wartet, bis die Queue Platz hat, der Abbruch signalisiert wird oder
    /// die Deadline ablaeuft.
    pub fn send(&self, tx: &Sender<Bytes>, paket: Bytes) -> VoiceResult<()> {
        self.check()?;

        let nie = crossbeam_channel::never::<()>();
        let abbruch = match &self.cancel {
            Some(token) => &token.rx,
            None => &nie,
        };

        match self.deadline {
            Some(deadline) => {
                let rest = deadline.saturating_duration_since(Instant::now());
                select! {
                    send(tx, paket) -> res => res.map_err(|_| VoiceError::TransportClosed),
                    recv(abbruch) -> _ => Err(VoiceError::Cancelled),
                    default(rest) => Err(VoiceError::DeadlineExceeded),
                }
            }
            None => select! {
                send(tx, paket) -> res => res.map_err(|_| VoiceError::TransportClosed),
                recv(abbruch) -> _ => Err(VoiceError::Cancelled),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn cancel_ist_fuer_alle_tokens_sichtbar() {
        let (handle, token) = CancelHandle::new();
        let klon = token.clone();
        assert!(!token.is_cancelled());
        assert!(!handle.is_cancelled());

        handle.cancel();
        handle.cancel();
        assert!(token.is_cancelled());
        assert!(klon.is_cancelled());
        assert!(handle.is_cancelled());
    }

    #[test]
    fn drop_des_handles_bricht_ab() {
        let (handle, token) = CancelHandle::new();
        drop(handle);
        assert!(token.is_cancelled());
    }

    #[test]
    fn send_ohne_kontrolle_liefert_paket() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        ReadControl::none()
            .send(&tx, Bytes::from_static(b"abc"))
            .unwrap();
        assert_eq!(rx.recv().unwrap(), Bytes::from_static(b"abc"));
    }

    #[test]
    fn send_auf_volle_queue_laeuft_in_deadline() {
        let (tx, _rx) = crossbeam_channel::bounded(1);
        tx.send(Bytes::new()).unwrap();

        let ctl = ReadControl::none().with_timeout(Duration::from_millis(30));
        let start = Instant::now();
        let ergebnis = ctl.send(&tx, Bytes::from_static(b"x"));
        assert!(matches!(ergebnis, Err(VoiceError::DeadlineExceeded)));
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn abgelaufene_deadline_wird_vor_dem_send_erkannt() {
        let (tx, rx) = crossbeam_channel::bounded(4);
        let ctl = ReadControl::none().with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(matches!(
            ctl.send(&tx, Bytes::new()),
            Err(VoiceError::DeadlineExceeded)
        ));
        assert!(rx.is_empty());
    }

    #[test]
    fn abbruch_weckt_blockierten_send() {
        let (tx, _rx) = crossbeam_channel::bounded(1);
        tx.send(Bytes::new()).unwrap();

        let (handle, token) = CancelHandle::new();
        let abbrecher = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            handle.cancel();
        });

        let ergebnis = ReadControl::none()
            .with_cancel(token)
            .send(&tx, Bytes::from_static(b"x"));
        assert!(matches!(ergebnis, Err(VoiceError::Cancelled)));
        abbrecher.join().unwrap();
    }

    #[test]
    fn geschlossene_queue_meldet_transport_closed() {
        let (tx, rx) = crossbeam_channel::bounded::<Bytes>(1);
        drop(rx);
        assert!(matches!(
            ReadControl::none().send(&tx, Bytes::new()),
            Err(VoiceError::TransportClosed)
        ));
    }
}
