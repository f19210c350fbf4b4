//! Linear-PCM Sample-Codec
//!
//! Wandelt zwischen den beiden Sample-Darstellungen (16-Bit-Integer und
//! normalisiertes 32-Bit-Float) und ihrem Byte-Layout um. Die Byte-Reihenfolge
//! ist ein expliziter Parameter; die Sprachsynthese liefert Little-Endian.
//!
//! Alle Funktionen sind total: kurze Ziele schneiden einfach ab.

/// Skalierung zwischen i16 und normalisiertem f32
pub const I16_SCALE: f32 = 32768.0;

/// Byte-Reihenfolge des PCM-Streams
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-Endian (Ausgabeformat der Sprachsynthese)
    #[default]
    Little,
    /// Big-Endian
    Big,
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for i16 {}
    impl Sealed for f32 {}
}

/// Eine PCM-Sample-Darstellung.
///
/// Versiegelt: es gibt genau zwei Implementierungen, `i16` und `f32`.
pub trait Sample: sealed::Sealed + Copy + Default + Send + Sync + 'static {
    /// Breite eines Samples in Bytes
    const BREITE: usize;

    /// Schreibt das Sample in `dst` (exakt `BREITE` Bytes)
    fn schreiben(self, dst: &mut [u8], order: ByteOrder);

    /// Liest ein Sample aus `src` (exakt `BREITE` Bytes)
    fn lesen(src: &[u8], order: ByteOrder) -> Self;
}

impl Sample for i16 {
    const BREITE: usize = 2;

    fn schreiben(self, dst: &mut [u8], order: ByteOrder) {
        let bytes = match order {
            ByteOrder::Little => self.to_le_bytes(),
            ByteOrder::Big => self.to_be_bytes(),
        };
        dst.copy_from_slice(&bytes);
    }

    fn lesen(src: &[u8], order: ByteOrder) -> Self {
        let bytes = [src[0], src[1]];
        match order {
            ByteOrder::Little => i16::from_le_bytes(bytes),
            ByteOrder::Big => i16::from_be_bytes(bytes),
        }
    }
}

impl Sample for f32 {
    const BREITE: usize = 4;

    fn schreiben(self, dst: &mut [u8], order: ByteOrder) {
        let bytes = match order {
            ByteOrder::Little => self.to_le_bytes(),
            ByteOrder::Big => self.to_be_bytes(),
        };
        dst.copy_from_slice(&bytes);
    }

    fn lesen(src: &[u8], order: ByteOrder) -> Self {
        let bytes = [src[0], src[1], src[2], src[3]];
        match order {
            ByteOrder::Little => f32::from_le_bytes(bytes),
            ByteOrder::Big => f32::from_be_bytes(bytes),
        }
    }
}

/// Anzahl der Bytes fuer `samples` Samples
pub fn samples_to_bytes<T: Sample>(samples: usize) -> usize {
    samples * T::BREITE
}

/// Anzahl vollstaendiger Samples in `bytes` Bytes
pub fn bytes_to_samples<T: Sample>(bytes: usize) -> usize {
    bytes / T::BREITE
}

/// Kodiert Samples in Bytes.
///
/// Schreibt `min(dst.len() / BREITE, src.len())` Samples und gibt die Anzahl
/// geschriebener Bytes zurueck.
pub fn encode<T: Sample>(dst: &mut [u8], src: &[T], order: ByteOrder) -> usize {
    let n = bytes_to_samples::<T>(dst.len()).min(src.len());
    for (chunk, &sample) in dst.chunks_exact_mut(T::BREITE).zip(&src[..n]) {
        sample.schreiben(chunk, order);
    }
    samples_to_bytes::<T>(n)
}

/// Dekodiert Bytes in Samples.
///
/// Liest `min(src.len() / BREITE, dst.len())` Samples und gibt deren Anzahl
/// zurueck. Ein unvollstaendiges Sample am Ende von `src` wird ignoriert.
pub fn decode<T: Sample>(dst: &mut [T], src: &[u8], order: ByteOrder) -> usize {
    let n = bytes_to_samples::<T>(src.len()).min(dst.len());
    for (slot, chunk) in dst[..n].iter_mut().zip(src.chunks_exact(T::BREITE)) {
        *slot = T::lesen(chunk, order);
    }
    n
}

/// i16 -> normalisiertes f32
pub fn i16_to_f32(v: i16) -> f32 {
    v as f32 / I16_SCALE
}

/// Normalisiertes f32 -> i16, an den Grenzen geklemmt
pub fn f32_to_i16(v: f32) -> i16 {
    (v * I16_SCALE).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Konvertiert `min(dst.len(), src.len())` Samples von f32 nach i16
pub fn f32_slice_to_i16(dst: &mut [i16], src: &[f32]) -> usize {
    let n = dst.len().min(src.len());
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = f32_to_i16(s);
    }
    n
}

/// Konvertiert `min(dst.len(), src.len())` Samples von i16 nach f32
pub fn i16_slice_to_f32(dst: &mut [f32], src: &[i16]) -> usize {
    let n = dst.len().min(src.len());
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = i16_to_f32(s);
    }
    n
}
