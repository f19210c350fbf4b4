//! vorleser-audio – Audio-Hot-Path
//!
//! Zerlegt synthetisiertes Linear-PCM in 20-ms-Frames und kodiert sie:
//! - Frame-Pool mit RAII-Leihgaben (keine Allokation im eingeschwungenen Zustand)
//! - Frame-Splitter mit Zero-Padding des letzten Teil-Frames
//! - Opus-Encoding hinter dem `PacketEncoder`-Trait

pub mod codec;
pub mod error;
pub mod pool;
pub mod splitter;

// Bequeme Re-Exporte der wichtigsten Typen
pub use codec::{OpusEncoder, PacketEncoder};
pub use error::{AudioError, AudioResult};
pub use pool::{FrameLease, FramePool};
pub use splitter::FrameSplitter;
