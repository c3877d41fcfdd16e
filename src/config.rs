/// Represents config for [`SdCard`](crate::SdCard).
pub trait SdCardConfig {
    /// Idle bytes clocked with the card deselected before the first command.
    const POWER_UP_IDLE_BYTES: usize;
    /// Max attempts to get the idle state from GO_IDLE_STATE.
    const GO_IDLE_ATTEMPTS: usize;
    /// Max attempts to read R1.
    const READ_R1_ATTEMPTS: usize;
    /// Max attempts of ACMD41/CMD1 until the card leaves the idle state.
    const INIT_ATTEMPTS: usize;
    /// Max attempts to wait for the data start token.
    const DATA_TOKEN_ATTEMPTS: usize;
    /// Max attempts to wait for the card to finish programming.
    const BUSY_ATTEMPTS: usize;
    /// Count of CRC bytes following a CSD block.
    const CSD_CRC_BYTES: usize;
    /// Fail initialization with a timeout when ACMD41/CMD1 attempts run out.
    const INIT_TIMEOUT_IS_ERROR: bool;
}

/// Default implementation of [`SdCardConfig`](crate::SdCardConfig).
pub struct DefaultSdCardConfig;

impl SdCardConfig for DefaultSdCardConfig {
    const POWER_UP_IDLE_BYTES: usize = 10;
    const GO_IDLE_ATTEMPTS: usize = 10;
    const READ_R1_ATTEMPTS: usize = 10;
    const INIT_ATTEMPTS: usize = 20_000;
    const DATA_TOKEN_ATTEMPTS: usize = 100;
    const BUSY_ATTEMPTS: usize = 0xFFFF;
    const CSD_CRC_BYTES: usize = 2;
    const INIT_TIMEOUT_IS_ERROR: bool = true;
}
