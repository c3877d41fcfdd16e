use crate::{
    command::Command,
    config::SdCardConfig,
    consts::{args, commands, csd::CSD_PAYLOAD_SIZE, tokens, BLOCK_SIZE},
    crc::{crc7_frame_byte, Crc7},
    csd::{CapacityProvider, CsdImage},
    response::R1Response,
    CardType, Error,
};

use core::marker::PhantomData;
use embedded_hal::blocking::spi::Transfer;
use switch_hal::OutputSwitch;

/// Error type alias.
pub type ErrorFor<Spi, Cs> =
    Error<<Spi as Transfer<u8>>::Error, <Cs as OutputSwitch>::Error>;

/// SD card session: the SPI conversation with a single card.
///
/// Owns the bus, the chip select and everything learnt from the card, so
/// several sessions can live side by side.
///
/// `Spi` - SPI, e.g. [`BitBangSpi`](crate::BitBangSpi).
/// `Cs` - Chip select output switch, `on` selects the card.
/// `Config` - Config implementation of driver config trait.
pub struct SdCard<Spi: Transfer<u8>, Cs: OutputSwitch, Config: SdCardConfig> {
    spi: Spi,
    cs: Cs,
    card_type: CardType,
    csd: CsdImage,
    crc: Crc7,
    config: PhantomData<Config>,
}

impl<Spi: Transfer<u8>, Cs: OutputSwitch, Config: SdCardConfig> SdCard<Spi, Cs, Config>
where
    Spi::Error: core::fmt::Debug,
    Cs::Error: core::fmt::Debug,
{
    /// Creates a new [`SdCard<Spi, Cs, Config>`].
    ///
    /// `spi` - SPI instance.
    /// `cs` - chip select output switch.
    pub fn new(spi: Spi, cs: Cs) -> Self {
        SdCard {
            spi,
            cs,
            card_type: CardType::Unknown,
            csd: CsdImage::default(),
            crc: Crc7::new(),
            config: PhantomData::<Config>,
        }
    }

    /// Releases the bus and the chip select.
    pub fn free(self) -> (Spi, Cs) {
        (self.spi, self.cs)
    }

    /// Card type detected by the last [`init`](Self::init).
    pub fn card_type(&self) -> CardType {
        self.card_type
    }

    /// CSD image from the last successful [`read_csd`](Self::read_csd).
    pub fn csd(&self) -> &CsdImage {
        &self.csd
    }

    /// CSD image that [`write_csd`](Self::write_csd) programs.
    pub fn csd_mut(&mut self) -> &mut CsdImage {
        &mut self.csd
    }

    /// Activate chip select.
    fn select(&mut self) -> Result<(), ErrorFor<Spi, Cs>> {
        self.cs.on().map_err(Error::SelectError)
    }

    /// Deactivate chip select.
    fn unselect(&mut self) -> Result<(), ErrorFor<Spi, Cs>> {
        self.cs.off().map_err(Error::SelectError)
    }

    /// Send one byte and receive one byte.
    fn transfer(&mut self, data: u8) -> Result<u8, ErrorFor<Spi, Cs>> {
        self.spi
            .transfer(&mut [data])
            .map(|b| b[0])
            .map_err(Error::Transport)
    }

    /// Receive a byte from the SD card by clocking out an idle byte.
    fn receive(&mut self) -> Result<u8, ErrorFor<Spi, Cs>> {
        self.transfer(tokens::IDLE)
    }

    /// Send a byte to the SD card.
    fn send(&mut self, data: u8) -> Result<(), ErrorFor<Spi, Cs>> {
        self.transfer(data).map(|_| ())
    }

    /// Send a slice to the SD card.
    fn send_slice(&mut self, data: &[u8]) -> Result<(), ErrorFor<Spi, Cs>> {
        for byte in data.iter() {
            self.send(*byte)?;
        }

        Ok(())
    }

    /// Skip bytes.
    fn skip_bytes(&mut self, count: usize) -> Result<(), ErrorFor<Spi, Cs>> {
        for _ in 0..count {
            self.receive()?;
        }

        Ok(())
    }

    /// Deselect and give the card the clocks it needs to release the bus.
    fn release(&mut self) -> Result<(), ErrorFor<Spi, Cs>> {
        self.unselect()?;
        self.skip_bytes(1)
    }

    /// Send a single frame and poll its R1 response.
    fn send_command_impl(&mut self, command: Command) -> Result<R1Response, ErrorFor<Spi, Cs>> {
        self.release()?;
        self.select()?;
        self.skip_bytes(1)?;

        self.send_slice(&command.frame())?;

        let mut r1 = R1Response::NO_RESPONSE;
        for _ in 0..Config::READ_R1_ATTEMPTS {
            r1 = R1Response(self.receive()?);

            if r1.is_valid() {
                break;
            }
        }

        if !command.keeps_selected() {
            self.release()?;
        }

        Ok(r1)
    }

    /// Send command.
    ///
    /// Application commands ([`commands::ACMD_FLAG`] set) are prefaced by
    /// `CMD55`, whose response is returned instead if it is neither ready nor
    /// idle. A response with the MSB set means the card did not answer.
    pub fn send_command(&mut self, cmd: u8, arg: u32) -> Result<R1Response, ErrorFor<Spi, Cs>> {
        let command = Command::new(cmd, arg);

        if command.is_app() {
            let r1 = self.send_command_impl(Command::app_prefix())?;

            if !r1.is_accepted() {
                debug!("CMD55 rejected before ACMD{}: 0x{:02X}", command.number(), r1.0);
                return Ok(r1);
            }
        }

        self.send_command_impl(command.stripped())
    }

    /// Enter SD to SPI mode.
    fn enter_spi_mode(&mut self) -> Result<(), ErrorFor<Spi, Cs>> {
        let mut r1 = R1Response::NO_RESPONSE;

        for i in 0..Config::GO_IDLE_ATTEMPTS {
            r1 = self.send_command(commands::CMD0, 0x0000_0000)?;

            if r1 == R1Response::IN_IDLE_STATE {
                return Ok(());
            }

            debug!("CMD0 attempt {}: 0x{:02X}", i + 1, r1.0);
        }

        warn!("No card detected, last CMD0 response: 0x{:02X}", r1.0);
        Err(Error::NotDetected)
    }

    /// Repeat an initialization command until the card leaves the idle state.
    fn wait_ready(&mut self, cmd: u8, arg: u32) -> Result<(), ErrorFor<Spi, Cs>> {
        let mut r1 = R1Response::NO_RESPONSE;

        for _ in 0..Config::INIT_ATTEMPTS {
            r1 = self.send_command(cmd, arg)?;

            if r1 == R1Response::READY_STATE {
                return Ok(());
            }
        }

        let number = Command::new(cmd, arg).number();
        if Config::INIT_TIMEOUT_IS_ERROR {
            error!("Card still idle after CMD{}: 0x{:02X}", number, r1.0);
            Err(Error::Timeout)
        } else {
            warn!("Card still idle after CMD{}, continuing: 0x{:02X}", number, r1.0);
            Ok(())
        }
    }

    /// Detect the card type and run its initialization process.
    fn check_type(&mut self) -> Result<CardType, ErrorFor<Spi, Cs>> {
        if self.send_command(commands::CMD8, args::IF_COND_CHECK)? == R1Response::IN_IDLE_STATE {
            // R7 trailer: command version, voltage and check pattern.
            self.skip_bytes(4)?;
            self.wait_ready(commands::ACMD41, args::HIGH_CAPACITY_SUPPORT)?;

            return Ok(CardType::SDHC);
        }

        let r1 = self.send_command(commands::CMD58, 0x0000_0000)?;
        if r1 != R1Response::IN_IDLE_STATE {
            warn!("Unexpected response from CMD58: 0x{:02X}", r1.0);
            return Ok(CardType::Unknown);
        }

        // OCR register.
        self.skip_bytes(4)?;
        self.wait_ready(commands::CMD1, 0x0000_0000)?;
        self.send_command(commands::CMD16, BLOCK_SIZE)?;

        Ok(CardType::SD1)
    }

    /// Initialize SD.
    ///
    /// Resets the card into SPI mode and brings it out of the idle state,
    /// detecting whether it is a version 1 or a high capacity card.
    pub fn init(&mut self) -> Result<CardType, ErrorFor<Spi, Cs>> {
        info!("SD initialize started");

        self.card_type = CardType::Unknown;
        self.unselect()?;
        self.skip_bytes(Config::POWER_UP_IDLE_BYTES)?;

        self.enter_spi_mode()?;
        self.card_type = self.check_type()?;

        self.skip_bytes(1)?;

        info!("SD initialized, type: {}", self.card_type);
        Ok(self.card_type)
    }

    /// Wait for the first byte that is not idle.
    fn wait_for_token(&mut self) -> Result<u8, ErrorFor<Spi, Cs>> {
        let mut token = tokens::IDLE;

        for _ in 0..Config::DATA_TOKEN_ATTEMPTS {
            token = self.receive()?;

            if token != tokens::IDLE {
                break;
            }
        }

        Ok(token)
    }

    /// Read CSD.
    ///
    /// The image is cleared first and stays cleared if the card does not
    /// deliver a data block.
    pub fn read_csd(&mut self) -> Result<&CsdImage, ErrorFor<Spi, Cs>> {
        self.csd.clear();

        let r1 = self.send_command(commands::CMD9, 0x0000_0000)?;
        if r1 != R1Response::READY_STATE {
            warn!("Unexpected response from CMD9: 0x{:02X}", r1.0);
        }

        let token = self.wait_for_token()?;
        if token != tokens::DATA_START_BLOCK {
            error!("No CSD data token, got: 0x{:02X}", token);
            self.release()?;
            return Err(Error::ReadWriteFail);
        }

        let mut data = [tokens::IDLE; 16];
        self.spi.transfer(&mut data).map_err(Error::Transport)?;
        self.skip_bytes(Config::CSD_CRC_BYTES)?;
        self.release()?;

        *self.csd.as_bytes_mut() = data;

        info!(
            "CSD read, locked: {}, capacity: {} blocks",
            self.csd.is_locked(),
            self.csd.card_capacity_blocks()
        );
        Ok(&self.csd)
    }

    /// Write CSD.
    ///
    /// Programs the first 15 bytes of the image followed by their CRC-7.
    pub fn write_csd(&mut self) -> Result<(), ErrorFor<Spi, Cs>> {
        let r1 = self.send_command(commands::CMD27, 0x0000_0000)?;
        if r1 != R1Response::READY_STATE {
            error!("CMD27 rejected: 0x{:02X}", r1.0);
            self.release()?;
            return Err(Error::ReadWriteFail);
        }

        let mut payload = [0; CSD_PAYLOAD_SIZE];
        payload.copy_from_slice(self.csd.payload());
        let crc = self.crc.checksum(&payload);

        self.send(tokens::DATA_START_BLOCK)?;
        self.send_slice(&payload)?;
        self.send(crc7_frame_byte(crc))?;

        // Dummy 16-bit CRC slots, the data response shows up here.
        self.skip_bytes(2)?;

        for _ in 0..Config::BUSY_ATTEMPTS {
            if self.receive()? != 0x00 {
                self.release()?;
                info!("CSD written, locked: {}", self.csd.is_locked());
                return Ok(());
            }
        }

        error!("Card busy after CSD write");
        self.release()?;
        Err(Error::Timeout)
    }
}
