use crate::{
    card::{ErrorFor, SdCard},
    config::SdCardConfig,
    status::{Fault, Phase, Status},
};

use core::ops::ControlFlow;
use embedded_hal::blocking::spi::Transfer;
use switch_hal::OutputSwitch;

/// How long [`SdLocker::refresh`] keeps retrying a failing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RetryPolicy {
    /// Until the step succeeds or the retry callback breaks.
    Unbounded,
    /// At most this many attempts per step. Every step runs at least once,
    /// so `Attempts(0)` behaves like `Attempts(1)`.
    Attempts(u32),
}

impl RetryPolicy {
    /// Whether another attempt may follow `attempts` failed ones.
    fn allows(&self, attempts: u32) -> bool {
        match self {
            RetryPolicy::Unbounded => true,
            RetryPolicy::Attempts(max) => attempts < *max,
        }
    }
}

/// Lock state controller.
///
/// Keeps the CSD image of the card in sync and flips its temporary write
/// protection.
pub struct SdLocker<Spi: Transfer<u8>, Cs: OutputSwitch, Config: SdCardConfig> {
    card: SdCard<Spi, Cs, Config>,
}

impl<Spi: Transfer<u8>, Cs: OutputSwitch, Config: SdCardConfig> SdLocker<Spi, Cs, Config>
where
    Spi::Error: core::fmt::Debug,
    Cs::Error: core::fmt::Debug,
{
    pub fn new(card: SdCard<Spi, Cs, Config>) -> Self {
        SdLocker { card }
    }

    pub fn card(&self) -> &SdCard<Spi, Cs, Config> {
        &self.card
    }

    pub fn into_card(self) -> SdCard<Spi, Cs, Config> {
        self.card
    }

    /// Lock bit of the last CSD read, no bus access.
    pub fn is_locked(&self) -> bool {
        self.card.csd().is_locked()
    }

    /// Lock state to show.
    pub fn status(&self) -> Status {
        Status::from_lock(self.is_locked())
    }

    /// Flips the lock bit and writes the CSD back, returns the requested state.
    ///
    /// A failed write is not retried and the bit is flipped back, so the
    /// image still mirrors the card.
    pub fn toggle(&mut self) -> Result<bool, ErrorFor<Spi, Cs>> {
        if self.card.csd().is_permanently_locked() {
            warn!("Card is permanently write protected");
        }

        let locked = self.card.csd_mut().toggle_lock();
        info!("Setting card lock: {}", locked);

        if let Err(err) = self.card.write_csd() {
            self.card.csd_mut().set_locked(!locked);
            return Err(err);
        }

        Ok(locked)
    }

    fn retry<F, Op>(
        &mut self,
        policy: RetryPolicy,
        phase: Phase,
        on_retry: &mut F,
        mut op: Op,
    ) -> Result<(), ErrorFor<Spi, Cs>>
    where
        F: FnMut(Status) -> ControlFlow<()>,
        Op: FnMut(&mut SdCard<Spi, Cs, Config>) -> Result<(), ErrorFor<Spi, Cs>>,
    {
        let mut attempts = 0u32;

        loop {
            let err = match op(&mut self.card) {
                Ok(()) => return Ok(()),
                Err(err) if err.is_card_error() => err,
                Err(err) => return Err(err),
            };

            attempts = attempts.saturating_add(1);
            if !policy.allows(attempts) {
                warn!("Giving up {} after {} attempts", phase, attempts);
                return Err(err);
            }

            if on_retry(Status::Working(phase)).is_break() {
                warn!("{} cancelled after {} attempts", phase, attempts);
                return Err(err);
            }
        }
    }

    /// Initializes the card and reads its CSD.
    ///
    /// Each failed attempt reports [`Status::Working`] through `on_retry`
    /// before the next one; returning [`ControlFlow::Break`] cancels. Bus
    /// errors are returned at once.
    pub fn refresh<F>(&mut self, policy: RetryPolicy, mut on_retry: F) -> Result<(), ErrorFor<Spi, Cs>>
    where
        F: FnMut(Status) -> ControlFlow<()>,
    {
        self.retry(policy, Phase::Initializing, &mut on_retry, |card| {
            card.init().map(|_| ())
        })?;
        self.retry(policy, Phase::Reading, &mut on_retry, |card| {
            card.read_csd().map(|_| ())
        })
    }

    /// Toggles the lock and reads the card back to verify it.
    ///
    /// Returns the state to show: the new lock state, or the fault when the
    /// write failed or the card did not change. A failed write is reported
    /// as [`Fault::WriteFailed`] only, the card read back then shows the old
    /// state as well.
    pub fn change_state<F>(
        &mut self,
        policy: RetryPolicy,
        on_retry: F,
    ) -> Result<Status, ErrorFor<Spi, Cs>>
    where
        F: FnMut(Status) -> ControlFlow<()>,
    {
        let was_locked = self.is_locked();

        let written = match self.toggle() {
            Ok(_) => true,
            Err(err) if err.is_card_error() => {
                error!("Writing lock state failed");
                false
            }
            Err(err) => return Err(err),
        };

        self.refresh(policy, on_retry)?;

        Ok(if !written {
            Status::Faulted(Fault::WriteFailed)
        } else if self.is_locked() == was_locked {
            warn!("Card lock state did not change");
            Status::Faulted(Fault::Unchanged)
        } else {
            self.status()
        })
    }
}
