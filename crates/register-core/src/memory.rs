//! Byte-addressed memory seen by the register processor.
//!
//! The address bus is 24 bits wide; multi-byte values are little-endian.
//! Instruction displacements and immediates are the exception: they are
//! stored most significant byte first and assembled by the decoder.

/// Mask applied to every address placed on the bus.
pub const ADDRESS_MASK: u32 = 0x00FF_FFFF;

/// Size of the full 24-bit address space.
pub const ADDRESS_SPACE_BYTES: usize = 0x0100_0000;

/// Memory contract consumed by the interpreter.
///
/// Addresses passed in are already masked to 24 bits. Wider accesses have
/// default implementations in terms of byte accesses so a device only needs
/// to provide `read8`/`write8`.
pub trait RegisterBus {
    /// Reads one byte.
    fn read8(&mut self, addr: u32) -> u8;

    /// Writes one byte.
    fn write8(&mut self, addr: u32, value: u8);

    /// Reads a little-endian 16-bit value.
    fn read16(&mut self, addr: u32) -> u16 {
        let lo = self.read8(addr);
        let hi = self.read8(addr.wrapping_add(1) & ADDRESS_MASK);
        u16::from_le_bytes([lo, hi])
    }

    /// Reads a little-endian 32-bit value.
    fn read32(&mut self, addr: u32) -> u32 {
        let lo = self.read16(addr);
        let hi = self.read16(addr.wrapping_add(2) & ADDRESS_MASK);
        u32::from(lo) | (u32::from(hi) << 16)
    }

    /// Writes a little-endian 16-bit value.
    fn write16(&mut self, addr: u32, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write8(addr, lo);
        self.write8(addr.wrapping_add(1) & ADDRESS_MASK, hi);
    }

    /// Writes a little-endian 32-bit value.
    fn write32(&mut self, addr: u32, value: u32) {
        self.write16(addr, (value & 0xFFFF) as u16);
        self.write16(addr.wrapping_add(2) & ADDRESS_MASK, (value >> 16) as u16);
    }
}

/// Zero-initialised RAM covering the whole 24-bit space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatMemory {
    bytes: Box<[u8]>,
}

impl Default for FlatMemory {
    fn default() -> Self {
        Self {
            bytes: vec![0; ADDRESS_SPACE_BYTES].into_boxed_slice(),
        }
    }
}

impl FlatMemory {
    /// Copies `data` into memory starting at `addr`, wrapping at the top of the space.
    pub fn load(&mut self, addr: u32, data: &[u8]) {
        let mut cursor = addr & ADDRESS_MASK;
        for byte in data {
            self.write8(cursor, *byte);
            cursor = cursor.wrapping_add(1) & ADDRESS_MASK;
        }
    }

    /// Backing store.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl RegisterBus for FlatMemory {
    fn read8(&mut self, addr: u32) -> u8 {
        self.bytes
            .get((addr & ADDRESS_MASK) as usize)
            .copied()
            .unwrap_or(0)
    }

    fn write8(&mut self, addr: u32, value: u8) {
        if let Some(slot) = self.bytes.get_mut((addr & ADDRESS_MASK) as usize) {
            *slot = value;
        }
    }
}
