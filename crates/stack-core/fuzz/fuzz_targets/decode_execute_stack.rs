#![no_main]

use libfuzzer_sys::fuzz_target;
use stack_core::{disassemble, FlatStackMemory, StackCpu, StackRegisters};

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }

    let _ = disassemble(data, u16::from_be_bytes([data[0], data[1]]));

    let words: Vec<u16> = data[4..]
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    let mut memory = FlatStackMemory::default();
    memory.load_words(0x1000, &words);

    let mut cpu = StackCpu::default();
    *cpu.registers_mut() = StackRegisters {
        t: u16::from_be_bytes([data[0], data[1]]),
        n: u16::from_be_bytes([data[2], data[3]]),
        ..StackRegisters::at_boot(0x1000)
    };
    if data[0] & 1 != 0 {
        cpu.request_interrupt();
    }
    let _ = cpu.run(&mut memory, 256, None);
});
