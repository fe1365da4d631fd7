use crate::Port;

/// Bit 8 of the X tristate register: global interrupt enable.
pub const INTERRUPT_ENABLE: u16 = 0x0100;

/// Data, mask, direction and tristate registers of one parallel port.
///
/// A `mask` bit of 1 blocks CPU writes to that data bit, a `direction` bit
/// of 1 makes the pin an output, and a `tristate` bit of 1 floats an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PortBank {
    port: Port,
    data: u16,
    mask: u16,
    direction: u16,
    tristate: u16,
    input: u16,
}

impl PortBank {
    /// Creates a bank with every register cleared.
    #[must_use]
    pub const fn new(port: Port) -> Self {
        Self {
            port,
            data: 0,
            mask: 0,
            direction: 0,
            tristate: 0,
            input: 0,
        }
    }

    /// Port this bank drives.
    #[must_use]
    pub const fn port(&self) -> Port {
        self.port
    }

    /// Output data latch.
    #[must_use]
    pub const fn data(&self) -> u16 {
        self.data
    }

    /// Write-protect mask.
    #[must_use]
    pub const fn mask(&self) -> u16 {
        self.mask
    }

    /// Direction register (1 = output).
    #[must_use]
    pub const fn direction(&self) -> u16 {
        self.direction
    }

    /// Tristate register. On the X port bit 8 is the interrupt enable.
    #[must_use]
    pub const fn tristate(&self) -> u16 {
        self.tristate
    }

    /// Last input pin values sampled or driven by the host.
    #[must_use]
    pub const fn input(&self) -> u16 {
        self.input
    }

    /// Latches a CPU data write, dropping masked bits.
    pub const fn write_data(&mut self, value: u16) {
        self.data = value & !self.mask & self.pins();
    }

    /// Writes the mask register.
    pub const fn set_mask(&mut self, value: u16) {
        self.mask = value & self.pins();
    }

    /// Writes the direction register.
    pub const fn set_direction(&mut self, value: u16) {
        self.direction = value & self.pins();
    }

    /// Writes the tristate register; the X port also keeps its interrupt enable.
    pub const fn set_tristate(&mut self, value: u16) {
        let writable = match self.port {
            Port::B => self.pins(),
            Port::X => self.pins() | INTERRUPT_ENABLE,
        };
        self.tristate = value & writable;
    }

    /// Latches the input pins.
    pub const fn latch_input(&mut self, value: u16) {
        self.input = value & self.pins();
    }

    /// Value the CPU reads from the data register: inputs XOR the latch, outputs the latch.
    #[must_use]
    pub const fn read_data(&self) -> u16 {
        (((self.input ^ self.data) & !self.direction) | (self.data & self.direction)) & self.pins()
    }

    /// Pins actively driven by the chip.
    #[must_use]
    pub const fn driven_pins(&self) -> u16 {
        self.data & self.direction & !self.tristate & self.pins()
    }

    /// Returns `true` when the X-port interrupt enable bit is set.
    #[must_use]
    pub const fn interrupt_enabled(&self) -> bool {
        self.tristate & INTERRUPT_ENABLE != 0
    }

    const fn pins(&self) -> u16 {
        self.port.pin_mask()
    }
}
