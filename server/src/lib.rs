//! vorleser-relay – Bibliotheks-Root
//!
//! Deklariert alle Relay-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;
pub mod error;
pub mod konsole;
pub mod parser;
pub mod synth;
pub mod transport;

use anyhow::Result;
use config::RelayConfig;
use konsole::{Befehl, Konsole};
use parser::fehler_antwort;
use std::io::BufRead;
use std::sync::Arc;
use synth::ProzessSynthese;
use tokio::sync::mpsc;
use transport::DateiConnector;
use vorleser_voice::SessionRegistry;

/// Haelt den laufenden Relay-Zustand zusammen
pub struct Relay {
    pub config: RelayConfig,
}

impl Relay {
    /// Erstellt ein neues Relay aus der gegebenen Konfiguration
    pub fn neu(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Baut Registry, Transport und Synthese auf und liest Befehle von stdin
    ///
    /// Laeuft bis `quit`, Ende von stdin oder Ctrl-C. Danach werden laufende
    /// Reads abgebrochen und alle Sessions geschlossen.
    pub async fn starten(self) -> Result<()> {
        let connector = Arc::new(DateiConnector::new(
            &self.config.relay.ausgabe_verzeichnis,
            self.config.relay.queue_kapazitaet,
            self.config.takt(),
        ));
        let registry = Arc::new(SessionRegistry::new(
            self.config.registry_config()?,
            connector,
        ));
        let synthese = Arc::new(ProzessSynthese::new(
            &self.config.synthese,
            tokio::runtime::Handle::current(),
        ));
        let konsole = Arc::new(Konsole::new(
            registry,
            synthese,
            self.config.sende_timeout(),
        ));

        tracing::info!(
            ausgabe = %self.config.relay.ausgabe_verzeichnis.display(),
            sample_rate = self.config.relay.sample_rate,
            queue = self.config.relay.queue_kapazitaet,
            synthese = %self.config.synthese.programm,
            "Relay bereit, Befehle auf stdin"
        );

        let mut zeilen = stdin_zeilen();
        loop {
            tokio::select! {
                zeile = zeilen.recv() => match zeile.transpose()? {
                    Some(zeile) => {
                        if !zeile_verarbeiten(&konsole, &zeile) {
                            break;
                        }
                    }
                    None => {
                        tracing::info!("stdin geschlossen");
                        break;
                    }
                },
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    tracing::info!("Shutdown-Signal empfangen");
                    break;
                }
            }
        }

        let k = Arc::clone(&konsole);
        match tokio::task::spawn_blocking(move || k.herunterfahren()).await? {
            Ok(()) => tracing::info!("Alle Sessions geschlossen"),
            Err(e) => tracing::error!(fehler = %e, "Nicht alle Sessions konnten geschlossen werden"),
        }
        Ok(())
    }
}

/// Verarbeitet eine Zeile; `false` beendet die Konsole
///
/// Befehle laufen auf dem Blocking-Pool, damit ein langer Read die Konsole
/// nicht aufhaelt. Die Konsole zaehlt sie selbst; `herunterfahren` wartet,
/// bis der letzte beendet ist.
fn zeile_verarbeiten(konsole: &Arc<Konsole>, zeile: &str) -> bool {
    if zeile.trim().is_empty() {
        return true;
    }

    match Befehl::aus_zeile(zeile) {
        Ok(Befehl::Quit) => false,
        Ok(befehl) => {
            let konsole = Arc::clone(konsole);
            tokio::task::spawn_blocking(move || {
                println!("{}", konsole.ausfuehren(&befehl));
            });
            true
        }
        Err(e) => {
            println!("{}", fehler_antwort(e.code(), &e.to_string()));
            true
        }
    }
}

/// Liest stdin auf einem eigenen Thread
///
/// Ein blockierender Read auf stdin soll das Herunterfahren der Runtime
/// nicht aufhalten; der Thread endet mit dem Prozess.
fn stdin_zeilen() -> mpsc::Receiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for zeile in std::io::stdin().lock().lines() {
            if tx.blocking_send(zeile).is_err() {
                break;
            }
        }
    });
    rx
}
