use embedded_hal::{
    blocking::spi::Transfer,
    digital::v2::{InputPin, OutputPin},
};

/// SPI mode 0 master driven from three GPIO lines.
///
/// `Sck` - clock output, idles low.
/// `Mosi` - data output, idles high.
/// `Miso` - data input, should have a pull-up.
///
/// Edge timing comes from the pin access itself, no delays are inserted.
pub struct BitBangSpi<Sck, Mosi, Miso> {
    sck: Sck,
    mosi: Mosi,
    miso: Miso,
}

impl<Sck, Mosi, Miso, E> BitBangSpi<Sck, Mosi, Miso>
where
    Sck: OutputPin<Error = E>,
    Mosi: OutputPin<Error = E>,
    Miso: InputPin<Error = E>,
{
    /// Creates a new [`BitBangSpi<Sck, Mosi, Miso>`] and drives the lines to idle.
    pub fn new(sck: Sck, mosi: Mosi, miso: Miso) -> Result<Self, E> {
        let mut spi = BitBangSpi { sck, mosi, miso };

        spi.mosi.set_high()?;
        spi.sck.set_low()?;

        Ok(spi)
    }

    /// Releases the pins.
    pub fn free(self) -> (Sck, Mosi, Miso) {
        (self.sck, self.mosi, self.miso)
    }

    /// Exchange one byte, MSB first.
    ///
    /// Data out is set up while the clock is low, the card latches it on the
    /// rising edge, and data in is sampled while the clock is high.
    pub fn exchange(&mut self, data: u8) -> Result<u8, E> {
        let mut shift = data;

        for _bit in 0..8 {
            if shift & 0x80 != 0 {
                self.mosi.set_high()?;
            } else {
                self.mosi.set_low()?;
            }

            self.sck.set_high()?;
            shift <<= 1;
            if self.miso.is_high()? {
                shift |= 0x01;
            }
            self.sck.set_low()?;
        }

        Ok(shift)
    }
}

impl<Sck, Mosi, Miso, E> Transfer<u8> for BitBangSpi<Sck, Mosi, Miso>
where
    Sck: OutputPin<Error = E>,
    Mosi: OutputPin<Error = E>,
    Miso: InputPin<Error = E>,
{
    type Error = E;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Self::Error> {
        for word in words.iter_mut() {
            *word = self.exchange(*word)?;
        }

        Ok(words)
    }
}
