use crate::consts::{commands, crcs};

/// SD command as handed to [`SdCard::send_command`](crate::SdCard::send_command).
///
/// `index` is one of the [`commands`] values: the transmission bit (`0x40`) is
/// already set, and [`commands::ACMD_FLAG`] marks an application command that
/// has to be prefaced by `CMD55`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Command {
    pub index: u8,
    pub arg: u32,
}

impl Command {
    /// Frame length on the wire.
    pub const FRAME_SIZE: usize = 6;

    pub const fn new(index: u8, arg: u32) -> Self {
        Command { index, arg }
    }

    /// `APP_CMD` preface of application commands.
    pub const fn app_prefix() -> Self {
        Self::new(commands::CMD55, 0x0000_0000)
    }

    /// Application command.
    pub const fn is_app(&self) -> bool {
        self.index & commands::ACMD_FLAG != 0
    }

    /// The command as transmitted, application flag stripped.
    pub const fn stripped(&self) -> Self {
        Self::new(self.index & !commands::ACMD_FLAG, self.arg)
    }

    /// Plain command number, e.g. `41` for `ACMD41`.
    pub const fn number(&self) -> u8 {
        self.index & !(commands::ACMD_FLAG | commands::CMD_BASE)
    }

    /// CRC byte, only `CMD0` and `CMD8` are checked before initialization.
    pub const fn crc(&self) -> u8 {
        match self.stripped().index {
            commands::CMD0 => crcs::GO_IDLE,
            commands::CMD8 => crcs::IF_COND,
            _ => crcs::PLACEHOLDER,
        }
    }

    /// Frame: index, big endian argument and CRC byte.
    pub const fn frame(&self) -> [u8; Self::FRAME_SIZE] {
        let arg = self.arg.to_be_bytes();

        [
            self.stripped().index | commands::CMD_BASE,
            arg[0],
            arg[1],
            arg[2],
            arg[3],
            self.crc(),
        ]
    }

    /// Commands followed by a data phase keep the card selected after the response.
    pub const fn keeps_selected(&self) -> bool {
        matches!(
            self.stripped().index,
            commands::CMD17
                | commands::CMD58
                | commands::CMD9
                | commands::CMD13
                | commands::CMD10
                | commands::CMD8
                | commands::CMD42
                | commands::CMD27
        )
    }
}
