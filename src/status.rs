/// Work in progress while the card state is not known yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Card initialization failed, retrying.
    Initializing,
    /// CSD read failed, retrying.
    Reading,
}

/// Lock state change that did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// The card rejected the CSD write or never finished it.
    WriteFailed,
    /// The CSD read back after the write shows the old state.
    Unchanged,
}

/// State to show on the LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// Power up or card insertion, shown once before the first read.
    Booting,
    Locked,
    Unlocked,
    Working(Phase),
    Faulted(Fault),
}

impl Status {
    /// Lock state as last read.
    pub const fn from_lock(locked: bool) -> Self {
        if locked {
            Status::Locked
        } else {
            Status::Unlocked
        }
    }

    /// 32 LED frames, MSB first, `1` lights the LED.
    pub const fn pattern(&self) -> u32 {
        match self {
            Status::Booting => 0x844B_0000,
            Status::Locked => 0x8000_0000,
            Status::Unlocked => 0x0000_0000,
            Status::Working(Phase::Initializing) => 0xA000_0000,
            Status::Working(Phase::Reading) => 0xA500_0000,
            Status::Faulted(Fault::Unchanged) => 0x0003_0003,
            Status::Faulted(Fault::WriteFailed) => 0x000F_000F,
        }
    }

    /// How many times the pattern is played in a row.
    pub const fn repeats(&self) -> usize {
        match self {
            Status::Faulted(_) => 3,
            _ => 1,
        }
    }

    pub const fn blink(&self) -> BlinkPattern {
        BlinkPattern::new(self.pattern())
    }
}

/// LED frames of a pattern.
///
/// Playback stops after the last lit frame, so a steady pattern like
/// [`Status::Locked`] is a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkPattern(Option<u32>);

impl BlinkPattern {
    pub const fn new(pattern: u32) -> Self {
        BlinkPattern(Some(pattern))
    }
}

impl Iterator for BlinkPattern {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        let pattern = self.0?;
        self.0 = Some(pattern << 1).filter(|rest| *rest != 0);
        Some(pattern & 0x8000_0000 != 0)
    }
}
