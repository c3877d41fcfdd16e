use crate::consts::{
    csd::{
        CSD_PAYLOAD_SIZE, CSD_SIZE, PERM_WRITE_PROTECT_MASK, TMP_WRITE_PROTECT_MASK,
        WRITE_PROTECT_BYTE,
    },
    BLOCK_SIZE,
};

use bitfield::bitfield;
use size::{consts::KiB, Size};

/// Card Specific Data block.
pub type CsdData = [u8; CSD_SIZE];

bitfield! {
    /// Card Specific Data, version 1.
    pub struct CsdV1(u128);
    pub u8, version, _: 127, 126;
    pub u8, read_block_length, _: 83, 80;
    pub u16, device_size, _: 73, 62;
    pub u8, device_size_multiplier, _: 49, 47;
    pub copy_flag, _: 14;
    pub permanent_write_protection, _: 13;
    pub temporary_write_protection, _: 12;
    pub u8, file_format, _: 11, 10;
    pub u8, crc, _: 7, 1;
}

bitfield! {
    /// Card Specific Data, version 2.
    pub struct CsdV2(u128);
    pub u8, version, _: 127, 126;
    pub u8, read_block_length, _: 83, 80;
    pub u32, device_size, _: 69, 48;
    pub copy_flag, _: 14;
    pub permanent_write_protection, _: 13;
    pub temporary_write_protection, _: 12;
    pub u8, file_format, _: 11, 10;
    pub u8, crc, _: 7, 1;
}

/// Card Specific Data, generic container.
pub enum Csd {
    V1(CsdV1),
    V2(CsdV2),
}

/// Represents capacity provider.
pub trait CapacityProvider {
    /// Returns the card capacity in bytes.
    fn card_capacity(&self) -> Size;

    /// Returns the card capacity in 512-byte blocks.
    fn card_capacity_blocks(&self) -> u64;
}

impl From<CsdData> for CsdV1 {
    fn from(csd_data: CsdData) -> Self {
        CsdV1(u128::from_be_bytes(csd_data))
    }
}

impl From<CsdData> for CsdV2 {
    fn from(csd_data: CsdData) -> Self {
        CsdV2(u128::from_be_bytes(csd_data))
    }
}

impl CapacityProvider for CsdV1 {
    fn card_capacity(&self) -> Size {
        Size::from_bytes(
            (u64::from(self.device_size()) + 1)
                << (self.device_size_multiplier() + self.read_block_length() + 2),
        )
    }

    fn card_capacity_blocks(&self) -> u64 {
        self.card_capacity().bytes() as u64 / u64::from(BLOCK_SIZE)
    }
}

impl CapacityProvider for CsdV2 {
    fn card_capacity(&self) -> Size {
        Size::from_bytes(self.card_capacity_blocks() * u64::from(BLOCK_SIZE))
    }

    fn card_capacity_blocks(&self) -> u64 {
        (u64::from(self.device_size()) + 1) * (KiB as u64)
    }
}

impl CapacityProvider for Csd {
    fn card_capacity(&self) -> Size {
        match self {
            Csd::V1(csd) => csd.card_capacity(),
            Csd::V2(csd) => csd.card_capacity(),
        }
    }

    fn card_capacity_blocks(&self) -> u64 {
        match self {
            Csd::V1(csd) => csd.card_capacity_blocks(),
            Csd::V2(csd) => csd.card_capacity_blocks(),
        }
    }
}

/// Local copy of the CSD register.
///
/// Only the write protection byte is ever interpreted for writing, every
/// other byte is sent back exactly as read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CsdImage(CsdData);

impl CsdImage {
    pub const fn new(data: CsdData) -> Self {
        CsdImage(data)
    }

    /// Raw register bytes.
    pub fn as_bytes(&self) -> &CsdData {
        &self.0
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut CsdData {
        &mut self.0
    }

    /// Bytes programmed by `PROGRAM_CSD`, the CRC byte excluded.
    pub fn payload(&self) -> &[u8] {
        &self.0[..CSD_PAYLOAD_SIZE]
    }

    pub fn clear(&mut self) {
        self.0 = [0; CSD_SIZE];
    }

    /// TMP_WRITE_PROTECT is set.
    pub fn is_locked(&self) -> bool {
        self.0[WRITE_PROTECT_BYTE] & TMP_WRITE_PROTECT_MASK != 0
    }

    /// PERM_WRITE_PROTECT is set, which no host can undo.
    pub fn is_permanently_locked(&self) -> bool {
        self.0[WRITE_PROTECT_BYTE] & PERM_WRITE_PROTECT_MASK != 0
    }

    pub fn set_locked(&mut self, locked: bool) {
        if locked {
            self.0[WRITE_PROTECT_BYTE] |= TMP_WRITE_PROTECT_MASK;
        } else {
            self.0[WRITE_PROTECT_BYTE] &= !TMP_WRITE_PROTECT_MASK;
        }
    }

    /// Flips TMP_WRITE_PROTECT and returns the new state.
    pub fn toggle_lock(&mut self) -> bool {
        let locked = !self.is_locked();
        self.set_locked(locked);
        locked
    }

    /// Decodes the register by its CSD_STRUCTURE field.
    pub fn decode(&self) -> Csd {
        let v1 = CsdV1::from(self.0);
        match v1.version() {
            0 => Csd::V1(v1),
            _ => Csd::V2(CsdV2::from(self.0)),
        }
    }
}

impl From<CsdData> for CsdImage {
    fn from(csd_data: CsdData) -> Self {
        CsdImage(csd_data)
    }
}

impl CapacityProvider for CsdImage {
    fn card_capacity(&self) -> Size {
        self.decode().card_capacity()
    }

    fn card_capacity_blocks(&self) -> u64 {
        self.decode().card_capacity_blocks()
    }
}
