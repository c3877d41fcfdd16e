/// Block length requested from standard capacity cards.
pub const BLOCK_SIZE: u32 = 512;

pub mod commands {
    /// CMD base value.
    pub const CMD_BASE: u8 = 0x40;
    /// ACMD flag.
    pub const ACMD_FLAG: u8 = 0x80;
    /// GO_IDLE_STATE - init card in spi mode if CS low.
    pub const CMD0: u8 = CMD_BASE;
    /// SEND_OP_COND - start initialization of a version 1 card.
    pub const CMD1: u8 = CMD_BASE + 1;
    /// SEND_IF_COND - verify SD Memory Card interface operating condition.
    pub const CMD8: u8 = CMD_BASE + 8;
    /// SEND_CSD - read the Card Specific Data (CSD register).
    pub const CMD9: u8 = CMD_BASE + 9;
    /// SEND_CID - read the Card Identification register.
    pub const CMD10: u8 = CMD_BASE + 10;
    /// SEND_STATUS - read the card status register.
    pub const CMD13: u8 = CMD_BASE + 13;
    /// SET_BLOCKLEN - set the block length in bytes.
    pub const CMD16: u8 = CMD_BASE + 16;
    /// READ_SINGLE_BLOCK - read a single data block from the card.
    pub const CMD17: u8 = CMD_BASE + 17;
    /// PROGRAM_CSD - program the programmable bits of the CSD.
    pub const CMD27: u8 = CMD_BASE + 27;
    /// LOCK_UNLOCK - set/reset the password or lock/unlock the card.
    pub const CMD42: u8 = CMD_BASE + 42;
    /// APP_CMD - escape for application specific command.
    pub const CMD55: u8 = CMD_BASE + 55;
    /// READ_OCR - read the OCR register of a card.
    pub const CMD58: u8 = CMD_BASE + 58;
    /// SD_SEND_OP_COMD - Sends host capacity support information and activates
    /// the card's initialization process.
    pub const ACMD41: u8 = CMD_BASE + ACMD_FLAG + 41;
}

pub mod args {
    /// SEND_IF_COND argument: 2.7-3.6V and check pattern 0xAA.
    pub const IF_COND_CHECK: u32 = 0x0000_01AA;
    /// ACMD41 argument with the HCS bit set.
    pub const HIGH_CAPACITY_SUPPORT: u32 = 1 << 30;
}

pub mod crcs {
    /// Valid CRC byte of `CMD0(0)`.
    pub const GO_IDLE: u8 = 0x95;
    /// Valid CRC byte of `CMD8(0x1AA)`.
    pub const IF_COND: u8 = 0x87;
    /// Placeholder for every other command, cards ignore CRC in SPI mode.
    pub const PLACEHOLDER: u8 = 0x01;
}

pub mod tokens {
    /// Byte clocked out when only clocks are needed.
    pub const IDLE: u8 = 0xFF;
    /// Start data token for read or write single block.
    pub const DATA_START_BLOCK: u8 = 0xFE;
}

pub mod csd {
    /// Size of the CSD register.
    pub const CSD_SIZE: usize = 16;
    /// Bytes of the CSD payload covered by its CRC7.
    pub const CSD_PAYLOAD_SIZE: usize = 15;
    /// Byte holding the write protection bits.
    pub const WRITE_PROTECT_BYTE: usize = 14;
    /// TMP_WRITE_PROTECT within [`WRITE_PROTECT_BYTE`].
    pub const TMP_WRITE_PROTECT_MASK: u8 = 0x10;
    /// PERM_WRITE_PROTECT within [`WRITE_PROTECT_BYTE`].
    pub const PERM_WRITE_PROTECT_MASK: u8 = 0x20;
}
