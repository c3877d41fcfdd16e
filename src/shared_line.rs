use core::marker::PhantomData;
use embedded_hal::digital::v2::{InputPin, IoPin, OutputPin, PinState};

/// [`SharedLine`] error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError<E> {
    /// Error from the pin.
    Pin(E),
    /// A previous mode switch failed and the pin is gone.
    Unavailable,
}

/// One pin driving an active-low LED and reading an active-low push button.
///
/// The line is an output between calls. [`is_pressed`](Self::is_pressed)
/// turns the LED off, samples the button as an input with pull-up and then
/// brings the LED back to the level it had.
///
/// `Input` - pin in input mode, configured with a pull-up by the HAL.
/// `Output` - pin in push-pull output mode.
pub struct SharedLine<Input, Output> {
    led: Option<Output>,
    lit: bool,
    input: PhantomData<Input>,
}

impl<Input, Output, E> SharedLine<Input, Output>
where
    Input: InputPin<Error = E> + IoPin<Input, Output, Error = E>,
    Output: OutputPin<Error = E> + IoPin<Input, Output, Error = E>,
{
    /// Creates a new [`SharedLine<Input, Output>`] with the LED off.
    pub fn new(mut pin: Output) -> Result<Self, LineError<E>> {
        pin.set_high().map_err(LineError::Pin)?;

        Ok(SharedLine {
            led: Some(pin),
            lit: false,
            input: PhantomData,
        })
    }

    fn led(&mut self) -> Result<&mut Output, LineError<E>> {
        self.led.as_mut().ok_or(LineError::Unavailable)
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    pub fn set_led(&mut self, lit: bool) -> Result<(), LineError<E>> {
        let led = self.led()?;

        if lit {
            led.set_low().map_err(LineError::Pin)?;
        } else {
            led.set_high().map_err(LineError::Pin)?;
        }
        self.lit = lit;

        Ok(())
    }

    /// Samples the button once, without debouncing.
    pub fn is_pressed(&mut self) -> Result<bool, LineError<E>> {
        self.led()?.set_high().map_err(LineError::Pin)?;

        let pin = self.led.take().ok_or(LineError::Unavailable)?;
        let input = pin.into_input_pin().map_err(LineError::Pin)?;
        let pressed = input.is_low();

        let state = if self.lit {
            PinState::Low
        } else {
            PinState::High
        };
        self.led = Some(input.into_output_pin(state).map_err(LineError::Pin)?);

        pressed.map_err(LineError::Pin)
    }

    /// Releases the pin in output mode.
    pub fn free(self) -> Option<Output> {
        self.led
    }
}
