//! Codec-Konfiguration fuer die Audio-Uebertragung
//!
//! Definiert die Opus-Konfigurationstypen fuer das Relay. Frames sind
//! fest 20 ms lang; die Sample-Anzahl pro Frame ergibt sich allein aus
//! der Abtastrate und bleibt fuer die Lebensdauer einer Session konstant.

use serde::{Deserialize, Serialize};

/// Dauer eines Frames in Millisekunden
pub const FRAME_DAUER_MS: u32 = 20;

/// Maximale Groesse eines kodierten Opus-Pakets in Bytes
pub const MAX_PAKET_BYTES: usize = 1276;

// ---------------------------------------------------------------------------
// Opus-Konfiguration
// ---------------------------------------------------------------------------

/// Abtastrate fuer Opus
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleRate {
    /// 8 kHz – Schmalband (Telefon-Qualitaet)
    Hz8000 = 8000,
    /// 12 kHz – Mittelband
    Hz12000 = 12000,
    /// 16 kHz – Breitband (gute Sprach-Qualitaet)
    Hz16000 = 16000,
    /// 24 kHz – Superbreitband
    Hz24000 = 24000,
    /// 48 kHz – Vollband (Ausgabeformat der Sprachsynthese)
    #[default]
    Hz48000 = 48000,
}

impl SampleRate {
    /// Wandelt eine Abtastrate in Hz in die Enum-Variante um
    pub fn aus_hz(hz: u32) -> Option<Self> {
        match hz {
            8000 => Some(Self::Hz8000),
            12000 => Some(Self::Hz12000),
            16000 => Some(Self::Hz16000),
            24000 => Some(Self::Hz24000),
            48000 => Some(Self::Hz48000),
            _ => None,
        }
    }

    /// Gibt die Abtastrate in Hz zurueck
    pub fn hz(&self) -> u32 {
        *self as u32
    }

    /// Anzahl der Samples pro 20-ms-Frame (`rate * 20 / 1000`)
    pub fn samples_per_frame(&self) -> usize {
        (self.hz() * FRAME_DAUER_MS / 1000) as usize
    }
}

/// Opus-Anwendungsmodus
///
/// Beeinflusst intern den Opus-Encoder-Algorithmus.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpusApplication {
    /// Optimiert fuer Sprachverstaendlichkeit (VOIP)
    #[default]
    Voip,
    /// Optimiert fuer allgemeine Audio-Qualitaet (Musik)
    Audio,
    /// Minimale Verarbeitungsverzoegerung (Restricted Lowdelay)
    RestrictedLowdelay,
}

/// Vollstaendige Opus-Codec-Konfiguration (immer Mono)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpusConfig {
    /// Ziel-Bitrate in kbps (6–510)
    pub bitrate_kbps: u16,
    /// Abtastrate
    pub sample_rate: SampleRate,
    /// Anwendungsmodus
    pub application: OpusApplication,
    /// Forward Error Correction aktivieren
    pub fec_enabled: bool,
    /// Komplexitaet (0–10, hoeher = bessere Qualitaet, mehr CPU)
    pub complexity: u8,
    /// Variable Bitrate aktivieren
    pub vbr_enabled: bool,
}

impl Default for OpusConfig {
    fn default() -> Self {
        Self {
            bitrate_kbps: 64,
            sample_rate: SampleRate::Hz48000,
            application: OpusApplication::Voip,
            fec_enabled: true,
            complexity: 9,
            vbr_enabled: true,
        }
    }
}

impl OpusConfig {
    /// Validiert die Konfiguration
    pub fn validieren(&self) -> Result<(), String> {
        if self.bitrate_kbps < 6 || self.bitrate_kbps > 510 {
            return Err(format!(
                "Bitrate muss zwischen 6 und 510 kbps liegen (war: {})",
                self.bitrate_kbps
            ));
        }
        if self.complexity > 10 {
            return Err(format!(
                "Komplexitaet muss zwischen 0 und 10 liegen (war: {})",
                self.complexity
            ));
        }
        Ok(())
    }

    /// Anzahl der Samples pro Frame fuer diese Konfiguration
    pub fn frame_size(&self) -> usize {
        self.sample_rate.samples_per_frame()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
