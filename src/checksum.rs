//! Adler-32 over raw bytes.
//!
//! Cheaper than CRC32 and still sensitive to runs of zero bytes, since the
//! second sum keeps accumulating the first even when the input is zero.

const MOD_ADLER: u32 = 65_521;
// Largest n such that 255 n (n + 1) / 2 + (n + 1) (MOD_ADLER - 1) fits a u32.
const NMAX: usize = 5_552;

/// Rolling Adler-32 state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    pub const fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        for chunk in bytes.chunks(NMAX) {
            for &byte in chunk {
                self.a += u32::from(byte);
                self.b += self.a;
            }
            self.a %= MOD_ADLER;
            self.b %= MOD_ADLER;
        }
    }

    pub fn finish(&self) -> u32 {
        (self.b << 16) | self.a
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot Adler-32 of `bytes`. The empty input hashes to 1.
pub fn adler32(bytes: &[u8]) -> u32 {
    let mut st = Adler32::new();
    st.update(bytes);
    st.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(adler32(b""), 1);
        assert_eq!(adler32(b"a"), 0x0062_0062);
        assert_eq!(adler32(b"abc"), 0x024d_0127);
        assert_eq!(adler32(b"Wikipedia"), 0x11e6_0398);
    }

    /// Invariant: zero bytes still move the checksum, so buffers of zeros of
    /// different lengths are distinguishable.
    #[test]
    fn zeros_change_the_sum() {
        let short = adler32(&[0u8; 16]);
        let long = adler32(&[0u8; 17]);
        assert_ne!(short, long);
        assert_ne!(short, adler32(b""));
    }

    /// Invariant: chunked updates agree with the one-shot form, including
    /// across the modulo-reduction boundary.
    #[test]
    fn incremental_matches_one_shot() {
        let data: Vec<u8> = (0..3 * NMAX + 17).map(|i| (i * 31 % 251) as u8).collect();
        let mut st = Adler32::new();
        for part in data.chunks(1000) {
            st.update(part);
        }
        assert_eq!(st.finish(), adler32(&data));
    }

    #[test]
    fn saturated_bytes_do_not_overflow() {
        let data = vec![0xffu8; 4 * NMAX + 3];
        let sum = adler32(&data);
        assert!(sum & 0xffff < MOD_ADLER);
        assert!(sum >> 16 < MOD_ADLER);
    }
}
