//! CRC-32 (IEEE 802.3): reflected polynomial `0xEDB88320`, initial value and
//! final xor `0xFFFFFFFF`.

const POLYNOMIAL: u32 = 0xEDB8_8320;

const TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = (crc >> 1) ^ (POLYNOMIAL & (crc & 1).wrapping_neg());
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// Incremental CRC-32 state.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    state: u32,
}
impl Default for Crc32 {
    fn default() -> Self { Self::new() }
}
impl Crc32 {
    pub const fn new() -> Self { Crc32 { state: !0 } }

    pub fn update(&mut self, bytes: &[u8]) {
        let mut crc = self.state;
        for &byte in bytes {
            crc = (crc >> 8) ^ TABLE[((crc ^ byte as u32) & 0xff) as usize];
        }
        self.state = crc;
    }

    pub fn finish(&self) -> u32 { !self.state }
}

pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(bytes);
    crc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    // one bit at a time, straight from the polynomial
    fn bitwise(bytes: &[u8]) -> u32 {
        let mut crc = !0u32;
        for &byte in bytes {
            crc ^= byte as u32;
            for _ in 0..8 {
                crc = (crc >> 1) ^ (POLYNOMIAL & (crc & 1).wrapping_neg());
            }
        }
        !crc
    }

    #[test]
    fn check_values() {
        assert_eq!(crc32(b""), 0);
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b"The quick brown fox jumps over the lazy dog"), 0x414F_A339);
        assert_eq!(crc32(&[0, 0, 0]), 0xFF41_D912);
    }

    #[test]
    fn table_matches_bitwise() {
        let data = (0..=255u8).cycle().take(4099).collect::<Vec<_>>();
        assert_eq!(crc32(&data), bitwise(&data));
        assert_eq!(crc32(b"hi"), bitwise(b"hi"));
    }

    #[test]
    fn incremental_updates() {
        let mut crc = Crc32::new();
        crc.update(b"1234");
        crc.update(b"");
        crc.update(b"56789");
        assert_eq!(crc.finish(), 0xCBF4_3926);
    }
}
