#![no_main]

use libfuzzer_sys::fuzz_target;
use register_core::{disassemble, FlatMemory, RegisterCpu, RegisterFile};

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }

    let _ = disassemble(data, u32::from_le_bytes([data[0], data[1], data[2], 0]));

    let mut memory = FlatMemory::default();
    memory.load(0x1000, &data[4..]);

    let mut cpu = RegisterCpu::default();
    *cpu.registers_mut() = RegisterFile {
        r: [u32::from_le_bytes([data[0], data[1], data[2], data[3]]); 8],
        sp: [0x8000, 0x9000],
        psr: u16::from(data[0] & 0x0F) | (u16::from(data[1] & 0x0B) << 8),
        ..RegisterFile::at_boot(0x1000)
    };
    if data[0] & 0x80 != 0 {
        cpu.set_interrupt_line(true);
    }
    if data[1] & 0x80 != 0 {
        cpu.request_nmi();
    }
    let _ = cpu.run(&mut memory, 256, None);
});
