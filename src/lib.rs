//! SD card write-protect toggler written in Embedded Rust, derived from the
//! [sdmmc-spi](https://crates.io/crates/sdmmc-spi) driver.
//!
//! This crate talks to an SD card over a (possibly bit-banged) SPI bus, reads
//! its Card Specific Data register and flips the temporary write protection
//! bit (`TMP_WRITE_PROTECT`, bit 4 of CSD byte 14), reporting the outcome as
//! a [`Status`] that a single LED can show.
//!
//! ```ignore
//! let spi = BitBangSpi::new(sck, mosi, miso)?;
//! let card = SdCard::<_, _, DefaultSdCardConfig>::new(spi, cs.into_active_low_switch());
//! let mut locker = SdLocker::new(card);
//!
//! locker.refresh(RetryPolicy::Unbounded, |status| show(status))?;
//! if button_pressed() {
//!     let status = locker.change_state(RetryPolicy::Unbounded, |status| show(status))?;
//! }
//! ```

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

mod bitbang;
mod card;
mod command;
mod config;
mod consts;
mod crc;
mod csd;
mod locker;
mod response;
mod shared_line;
mod status;

#[cfg(test)]
mod sim;

pub use crate::bitbang::BitBangSpi;
pub use crate::card::{ErrorFor, SdCard};
pub use crate::command::Command;
pub use crate::config::{DefaultSdCardConfig, SdCardConfig};
pub use crate::consts::commands;
pub use crate::crc::{crc7_frame_byte, Crc7};
pub use crate::csd::{CapacityProvider, Csd, CsdData, CsdImage, CsdV1, CsdV2};
pub use crate::locker::{RetryPolicy, SdLocker};
pub use crate::response::R1Response;
pub use crate::shared_line::{LineError, SharedLine};
pub use crate::status::{BlinkPattern, Fault, Phase, Status};

/// [`SdCard`] result error.
///
/// `T` - transport error type.
/// `S` - select switch type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<T, S> {
    /// Error from the SPI peripheral.
    Transport(T),
    /// Couldn't set a select.
    SelectError(S),
    /// No card answered the reset, or it never reached the idle state.
    NotDetected,
    /// The card stayed busy for too long.
    Timeout,
    /// Unexpected response or missing data token.
    ReadWriteFail,
}

impl<T, S> Error<T, S> {
    /// Errors reported by the card itself, as opposed to the hardware around it.
    pub fn is_card_error(&self) -> bool {
        matches!(self, Error::NotDetected | Error::Timeout | Error::ReadWriteFail)
    }
}

/// Card type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CardType {
    /// Not initialized, or the card did not answer `READ_OCR`.
    Unknown,
    /// Standard capacity, version 1.
    SD1,
    /// High capacity.
    SDHC,
}
