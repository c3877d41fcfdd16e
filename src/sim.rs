//! Simulated SD card in SPI mode for unit tests.

use crate::{card::SdCard, config::SdCardConfig};

use core::convert::Infallible;
use embedded_hal::blocking::spi::Transfer;
use std::{cell::RefCell, collections::VecDeque, rc::Rc, vec::Vec};
use switch_hal::OutputSwitch;

/// Card register used by the simulations, 4 GB SDHC, unlocked.
pub const SDHC_CSD: [u8; 16] = [
    0x40, 0x0E, 0x00, 0x32, 0x5B, 0x59, 0x00, 0x00, 0x1D, 0x69, 0x7F, 0x80, 0x0A, 0x40, 0x00, 0x8B,
];

pub type Shared = Rc<RefCell<Sim>>;

enum DataPhase {
    Command,
    AwaitToken,
    Data(Vec<u8>),
}

/// Card behaviour and everything the host did to it.
pub struct Sim {
    /// Answers commands at all.
    pub present: bool,
    /// Answers CMD8, otherwise behaves like a version 1 card.
    pub sdhc: bool,
    /// CMD0 frames to ignore before answering.
    pub ignored_resets: usize,
    /// ACMD41/CMD1 attempts answered with "idle".
    pub init_polls: usize,
    /// Overrides the CMD55 response.
    pub app_response: Option<u8>,
    /// Overrides the CMD58 response.
    pub ocr_response: Option<u8>,
    /// Idle bytes before each R1.
    pub response_delay: usize,
    /// CMD9 requests answered without a data block.
    pub missing_tokens: usize,
    /// Idle bytes between the CMD9 response and the data token.
    pub token_delay: usize,
    /// Accept CMD27.
    pub accept_program: bool,
    /// Store programmed CSD bytes.
    pub apply_writes: bool,
    /// Busy bytes after a programmed CSD.
    pub busy_polls: usize,

    pub csd: [u8; 16],
    /// Every command frame received.
    pub frames: Vec<[u8; 6]>,
    /// Every CSD data block received, CRC byte included.
    pub written: Vec<[u8; 16]>,
    /// Bytes exchanged, selected or not.
    pub exchanges: usize,
    /// CS transitions to deselected.
    pub releases: usize,
    /// Bytes clocked after the last CSD byte of the latest read until CS
    /// went high.
    pub csd_trailer: usize,

    selected: bool,
    idle: bool,
    app: bool,
    frame: Vec<u8>,
    out: VecDeque<u8>,
    busy: usize,
    phase: DataPhase,
    csd_left: usize,
    in_trailer: bool,
}

impl Sim {
    fn new(sdhc: bool) -> Self {
        Sim {
            present: true,
            sdhc,
            ignored_resets: 0,
            init_polls: 0,
            app_response: None,
            ocr_response: None,
            response_delay: 0,
            missing_tokens: 0,
            token_delay: 1,
            accept_program: true,
            apply_writes: true,
            busy_polls: 3,
            csd: SDHC_CSD,
            frames: Vec::new(),
            written: Vec::new(),
            exchanges: 0,
            releases: 0,
            csd_trailer: 0,
            selected: false,
            idle: false,
            app: false,
            frame: Vec::new(),
            out: VecDeque::new(),
            busy: 0,
            phase: DataPhase::Command,
            csd_left: 0,
            in_trailer: false,
        }
    }

    pub fn sdhc() -> Self {
        Self::new(true)
    }

    pub fn sd1() -> Self {
        Self::new(false)
    }

    /// Nothing ever answers.
    pub fn absent() -> Self {
        Sim {
            present: false,
            ..Self::new(true)
        }
    }

    pub fn into_card<Config: SdCardConfig>(self) -> (SdCard<SimSpi, SimCs, Config>, Shared) {
        let sim = Rc::new(RefCell::new(self));
        let card = SdCard::new(SimSpi(sim.clone()), SimCs(sim.clone()));
        (card, sim)
    }

    /// Command numbers of the received frames.
    pub fn commands(&self) -> Vec<u8> {
        self.frames.iter().map(|frame| frame[0] & 0x3F).collect()
    }

    fn crc7(data: &[u8]) -> u8 {
        let mut crc = 0u8;
        for mut byte in data.iter().cloned() {
            for _bit in 0..8 {
                crc <<= 1;
                if ((byte & 0x80) ^ (crc & 0x80)) != 0 {
                    crc ^= 0x09;
                }
                byte <<= 1;
            }
        }
        ((crc & 0x7F) << 1) | 0x01
    }

    fn reply(&mut self, bytes: &[u8]) {
        self.out.extend(core::iter::repeat(0xFFu8).take(self.response_delay));
        self.out.extend(bytes);
    }

    fn status(&self) -> u8 {
        u8::from(self.idle)
    }

    fn command(&mut self, frame: [u8; 6]) {
        self.frames.push(frame);
        if !self.present {
            return;
        }

        let index = frame[0] & 0x3F;
        let app = core::mem::take(&mut self.app);

        match (app, index) {
            (_, 0) => {
                if self.ignored_resets > 0 {
                    self.ignored_resets -= 1;
                } else {
                    self.idle = true;
                    self.reply(&[0x01]);
                }
            }
            (_, 8) if self.sdhc => {
                let status = self.status();
                self.reply(&[status, 0x00, 0x00, frame[3], frame[4]]);
            }
            (_, 58) => {
                let status = self.ocr_response.unwrap_or(self.status());
                self.reply(&[status, 0x00, 0xFF, 0x80, 0x00]);
            }
            (_, 55) => {
                let status = self.app_response.unwrap_or(self.status());
                self.app = true;
                self.reply(&[status]);
            }
            (true, 41) | (false, 1) => {
                if self.init_polls > 0 {
                    self.init_polls -= 1;
                } else {
                    self.idle = false;
                }
                let status = self.status();
                self.reply(&[status]);
            }
            (_, 16) => self.reply(&[0x00]),
            (_, 9) => {
                self.reply(&[0x00]);
                if self.missing_tokens > 0 {
                    self.missing_tokens -= 1;
                } else {
                    let csd = self.csd;
                    self.out
                        .extend(core::iter::repeat(0xFFu8).take(self.token_delay));
                    self.out.push_back(0xFE);
                    self.out.extend(csd);
                    self.csd_left = self.out.len();
                    self.out.extend([0x12u8, 0x34]);
                }
            }
            (_, 27) if self.accept_program => {
                self.reply(&[0x00]);
                self.phase = DataPhase::AwaitToken;
            }
            _ => {
                let status = self.status() | 0x04;
                self.reply(&[status]);
            }
        }
    }

    fn receive(&mut self, byte: u8) {
        match core::mem::replace(&mut self.phase, DataPhase::Command) {
            DataPhase::Command => {
                if self.frame.is_empty() && byte & 0xC0 != 0x40 {
                    return;
                }

                self.frame.push(byte);
                if self.frame.len() == 6 {
                    let mut frame = [0; 6];
                    frame.copy_from_slice(&self.frame);
                    self.frame.clear();
                    self.command(frame);
                }
            }
            DataPhase::AwaitToken => {
                self.phase = if byte == 0xFE {
                    DataPhase::Data(Vec::new())
                } else {
                    DataPhase::AwaitToken
                };
            }
            DataPhase::Data(mut data) => {
                data.push(byte);
                if data.len() < 16 {
                    self.phase = DataPhase::Data(data);
                    return;
                }

                let mut block = [0; 16];
                block.copy_from_slice(&data);
                self.written.push(block);

                let crc_ok = Self::crc7(&block[..15]) == block[15];
                if crc_ok && self.apply_writes {
                    self.csd[..15].copy_from_slice(&block[..15]);
                }
                self.out.extend([0xFFu8, if crc_ok { 0xE5 } else { 0xEB }]);
                self.busy = self.busy_polls;
            }
        }
    }

    fn exchange(&mut self, byte: u8) -> u8 {
        self.exchanges += 1;

        if !self.selected {
            return 0xFF;
        }

        if self.in_trailer {
            self.csd_trailer += 1;
        }
        if self.csd_left > 0 {
            self.csd_left -= 1;
            if self.csd_left == 0 {
                self.in_trailer = true;
                self.csd_trailer = 0;
            }
        }

        let miso = match self.out.pop_front() {
            Some(miso) => miso,
            None if self.busy > 0 => {
                self.busy -= 1;
                0x00
            }
            None => 0xFF,
        };
        self.receive(byte);

        miso
    }
}

pub struct SimSpi(Shared);

impl Transfer<u8> for SimSpi {
    type Error = Infallible;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Self::Error> {
        let mut sim = self.0.borrow_mut();
        for word in words.iter_mut() {
            *word = sim.exchange(*word);
        }

        Ok(words)
    }
}

pub struct SimCs(Shared);

impl OutputSwitch for SimCs {
    type Error = Infallible;

    fn on(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().selected = true;
        Ok(())
    }

    fn off(&mut self) -> Result<(), Self::Error> {
        let mut sim = self.0.borrow_mut();
        if sim.selected {
            sim.releases += 1;
        }
        sim.selected = false;
        sim.frame.clear();
        sim.out.clear();
        sim.phase = DataPhase::Command;
        sim.csd_left = 0;
        sim.in_trailer = false;
        Ok(())
    }
}
