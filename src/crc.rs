/// Table driven CRC-7 as used by SD command frames and the CSD register.
///
/// Every table entry stays below `0x80`, so a running CRC can be shifted
/// left once and combined with the next byte to index the table.
#[derive(Clone)]
pub struct Crc7 {
    table: [u8; 256],
}

impl Crc7 {
    /// Generator polynomial `x^7 + x^3 + 1`, with the `x^7` term kept.
    pub const POLYNOMIAL: u8 = 0x89;

    /// Generates the lookup table.
    pub const fn new() -> Self {
        let mut table = [0u8; 256];
        let mut i = 0;

        while i < 256 {
            let mut value = if i & 0x80 != 0 {
                i as u8 ^ Self::POLYNOMIAL
            } else {
                i as u8
            };

            let mut bit = 1;
            while bit < 8 {
                value <<= 1;
                if value & 0x80 != 0 {
                    value ^= Self::POLYNOMIAL;
                }
                bit += 1;
            }

            table[i] = value;
            i += 1;
        }

        Crc7 { table }
    }

    /// Lookup table.
    pub fn table(&self) -> &[u8; 256] {
        &self.table
    }

    /// Adds one byte to a running CRC.
    pub fn add(&self, crc: u8, byte: u8) -> u8 {
        self.table[usize::from((crc << 1) ^ byte)]
    }

    /// CRC-7 calculation.
    pub fn checksum(&self, data: &[u8]) -> u8 {
        data.iter().fold(0, |crc, &byte| self.add(crc, byte))
    }
}

impl Default for Crc7 {
    fn default() -> Self {
        Self::new()
    }
}

/// Places a CRC-7 in front of the end bit, as it travels on the wire.
pub const fn crc7_frame_byte(crc: u8) -> u8 {
    (crc << 1) | 0x01
}
