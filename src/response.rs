use bitfield::bitfield;

bitfield! {
    /// R1 response bitset.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct R1Response(u8);
    impl Debug;
    pub in_idle_state, _: 0;
    pub erase_reset, _: 1;
    pub illegal_command, _: 2;
    pub command_crc_error, _: 3;
    pub erase_sequence_error, _: 4;
    pub address_error, _: 5;
    pub parameter_error, _: 6;
    pub not_ready, _: 7;
}

impl R1Response {
    /// Card finished initialization, command accepted.
    pub const READY_STATE: Self = R1Response(0x00);
    /// Card is in idle state and running the initializing process.
    pub const IN_IDLE_STATE: Self = R1Response(0x01);
    /// Nothing but idle bytes were clocked back.
    pub const NO_RESPONSE: Self = R1Response(0xFF);

    /// A response always starts with a cleared MSB.
    pub fn is_valid(&self) -> bool {
        !self.not_ready()
    }

    /// Accepted by the card, busy initializing or not.
    pub fn is_accepted(&self) -> bool {
        self.0 <= Self::IN_IDLE_STATE.0
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for R1Response {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "R1(0x{:02X})", self.0)
    }
}
