//! Address spaces seen by the stack processor.
//!
//! Program memory and both stack memories are separate word-organised spaces.
//! The core addresses them with byte addresses (word index shifted left by
//! one) and moves big-endian 16-bit words.

use crate::StackBus;

/// Size in bytes of the program space (64 Ki words).
pub const PROGRAM_SPACE_BYTES: usize = 0x2_0000;

/// Size in bytes of each stack space (256 words, indexed by an 8-bit pointer).
pub const STACK_SPACE_BYTES: usize = 0x200;

/// One of the three independent address spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AddressSpace {
    /// Code and data memory addressed by `pc` and `t`.
    Program,
    /// Data stack memory below `n`, indexed by `k`.
    DataStack,
    /// Return stack memory below `i`, indexed by `j`.
    ReturnStack,
}

impl AddressSpace {
    /// Size of the space's backing store in bytes.
    #[must_use]
    pub const fn size_bytes(self) -> usize {
        match self {
            Self::Program => PROGRAM_SPACE_BYTES,
            Self::DataStack | Self::ReturnStack => STACK_SPACE_BYTES,
        }
    }
}

/// Converts a word index into the byte address placed on the bus.
#[must_use]
pub const fn word_byte_address(word_index: u16) -> u32 {
    (word_index as u32) << 1
}

/// Reads a big-endian word; bytes outside `memory` read as zero.
#[must_use]
pub fn read_u16_be(memory: &[u8], addr: usize) -> u16 {
    let hi = memory.get(addr).copied().unwrap_or(0);
    let lo = memory.get(addr.wrapping_add(1)).copied().unwrap_or(0);
    u16::from_be_bytes([hi, lo])
}

/// Writes a big-endian word; bytes outside `memory` are dropped.
pub fn write_u16_be(memory: &mut [u8], addr: usize, value: u16) {
    let [hi, lo] = value.to_be_bytes();
    if let Some(slot) = memory.get_mut(addr) {
        *slot = hi;
    }
    if let Some(slot) = memory.get_mut(addr.wrapping_add(1)) {
        *slot = lo;
    }
}

/// Zero-initialised RAM for all three spaces with no port devices attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatStackMemory {
    program: Box<[u8]>,
    data_stack: Box<[u8]>,
    return_stack: Box<[u8]>,
}

impl Default for FlatStackMemory {
    fn default() -> Self {
        Self {
            program: vec![0; PROGRAM_SPACE_BYTES].into_boxed_slice(),
            data_stack: vec![0; STACK_SPACE_BYTES].into_boxed_slice(),
            return_stack: vec![0; STACK_SPACE_BYTES].into_boxed_slice(),
        }
    }
}

impl FlatStackMemory {
    /// Copies `words` into program memory starting at word index `origin`.
    pub fn load_words(&mut self, origin: u16, words: &[u16]) {
        let mut index = origin;
        for word in words {
            write_u16_be(&mut self.program, word_byte_address(index) as usize, *word);
            index = index.wrapping_add(1);
        }
    }

    /// Reads the word at `word_index` of `space`.
    #[must_use]
    pub fn word(&self, space: AddressSpace, word_index: u16) -> u16 {
        read_u16_be(self.bytes(space), word_byte_address(word_index) as usize)
    }

    /// Backing bytes of `space`.
    #[must_use]
    pub fn bytes(&self, space: AddressSpace) -> &[u8] {
        match space {
            AddressSpace::Program => &self.program,
            AddressSpace::DataStack => &self.data_stack,
            AddressSpace::ReturnStack => &self.return_stack,
        }
    }

    fn bytes_mut(&mut self, space: AddressSpace) -> &mut [u8] {
        match space {
            AddressSpace::Program => &mut self.program,
            AddressSpace::DataStack => &mut self.data_stack,
            AddressSpace::ReturnStack => &mut self.return_stack,
        }
    }
}

impl StackBus for FlatStackMemory {
    fn read_word(&mut self, space: AddressSpace, addr: u32) -> u16 {
        read_u16_be(self.bytes(space), addr as usize)
    }

    fn write_word(&mut self, space: AddressSpace, addr: u32, value: u16) {
        write_u16_be(self.bytes_mut(space), addr as usize, value);
    }
}

#[cfg(test)]
mod tests {
    use super::{
        read_u16_be, word_byte_address, write_u16_be, AddressSpace, FlatStackMemory,
        PROGRAM_SPACE_BYTES, STACK_SPACE_BYTES,
    };
    use crate::StackBus;

    #[test]
    fn backing_stores_match_space_sizes() {
        let memory = FlatStackMemory::default();
        for space in [
            AddressSpace::Program,
            AddressSpace::DataStack,
            AddressSpace::ReturnStack,
        ] {
            assert_eq!(memory.bytes(space).len(), space.size_bytes());
            assert!(memory.bytes(space).iter().all(|byte| *byte == 0));
        }
        assert_eq!(AddressSpace::Program.size_bytes(), PROGRAM_SPACE_BYTES);
        assert_eq!(AddressSpace::ReturnStack.size_bytes(), STACK_SPACE_BYTES);
    }

    #[test]
    fn words_are_big_endian_at_shifted_addresses() {
        let mut memory = FlatStackMemory::default();
        memory.load_words(0x1000, &[0x8420, 0xBEEF]);

        assert_eq!(word_byte_address(0x1000), 0x2000);
        assert_eq!(memory.bytes(AddressSpace::Program)[0x2000], 0x84);
        assert_eq!(memory.bytes(AddressSpace::Program)[0x2001], 0x20);
        assert_eq!(memory.word(AddressSpace::Program, 0x1001), 0xBEEF);
    }

    #[test]
    fn top_program_word_is_addressable() {
        let mut memory = FlatStackMemory::default();
        memory.load_words(0xFFFF, &[0x1234]);
        assert_eq!(
            memory.read_word(AddressSpace::Program, word_byte_address(0xFFFF)),
            0x1234
        );
    }

    #[test]
    fn spaces_are_independent() {
        let mut memory = FlatStackMemory::default();
        memory.write_word(AddressSpace::DataStack, 0x1FE, 0xAAAA);
        memory.write_word(AddressSpace::ReturnStack, 0x1FE, 0x5555);

        assert_eq!(memory.word(AddressSpace::DataStack, 0xFF), 0xAAAA);
        assert_eq!(memory.word(AddressSpace::ReturnStack, 0xFF), 0x5555);
        assert_eq!(memory.word(AddressSpace::Program, 0xFF), 0);
    }

    #[test]
    fn out_of_range_accesses_are_dropped() {
        let mut bytes = [0u8; 2];
        write_u16_be(&mut bytes, 1, 0xABCD);
        assert_eq!(bytes, [0x00, 0xAB]);
        assert_eq!(read_u16_be(&bytes, 1), 0xAB00);
    }
}
