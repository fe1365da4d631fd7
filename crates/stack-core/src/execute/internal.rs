//! The 16-slot internal register space reached through fetch/store words.

use tracing::{debug, warn};

use crate::{Port, PortError, StackBus, StackCpu};

impl StackCpu {
    pub(super) fn read_internal(&mut self, bus: &mut dyn StackBus, register: u8) -> u16 {
        match register & 0xF {
            0 => self.regs.jk(),
            1 => self.regs.i,
            2 => self.regs.pc,
            3 => 0xFFFF,
            4 | 5 => self.regs.md,
            6 | 7 => self.regs.sr,
            8 => self.sample_port(bus, Port::B),
            9 => self.port_b.mask(),
            10 => self.port_b.direction(),
            11 => self.port_b.tristate(),
            12 => self.sample_port(bus, Port::X),
            13 => self.port_x.mask(),
            14 => self.port_x.direction(),
            _ => self.port_x.tristate() & Port::X.pin_mask(),
        }
    }

    pub(super) fn write_internal(&mut self, bus: &mut dyn StackBus, register: u8, value: u16) {
        match register & 0xF {
            0 => self.regs.set_jk(value),
            1 => self.regs.i = value,
            2 => self.regs.pc = value,
            3 => {}
            4 | 5 => self.regs.md = value,
            6 | 7 => self.regs.sr = value,
            8 => self.drive_port(bus, Port::B, value),
            9 => self.port_b.set_mask(value),
            10 => self.port_b.set_direction(value),
            11 => self.port_b.set_tristate(value),
            12 => self.drive_port(bus, Port::X, value),
            13 => self.port_x.set_mask(value),
            14 => self.port_x.set_direction(value),
            _ => self.port_x.set_tristate(value),
        }
    }

    /// Refreshes the input latch from the host, keeping the cached pins on failure.
    fn sample_port(&mut self, bus: &mut dyn StackBus, port: Port) -> u16 {
        match bus.read_port(port) {
            Ok(pins) => self.bank_mut(port).latch_input(pins),
            Err(err) => log_port_error(port, "read", err),
        }
        self.bank(port).read_data()
    }

    fn drive_port(&mut self, bus: &mut dyn StackBus, port: Port, value: u16) {
        self.bank_mut(port).write_data(value);
        let data = self.bank(port).data();
        if let Err(err) = bus.write_port(port, data) {
            log_port_error(port, "write", err);
        }
    }
}

fn log_port_error(port: Port, access: &str, err: PortError) {
    match err {
        PortError::Unbound => debug!(port = port.name(), access, "no port device bound"),
        PortError::DeviceFailed => warn!(port = port.name(), access, %err, "port device failed"),
    }
}

#[cfg(test)]
mod tests {
    use crate::{AddressSpace, FlatStackMemory, Port, PortError, StackBus, StackCpu};

    /// Flat memory plus a scripted B/X device.
    struct Wired {
        memory: FlatStackMemory,
        b_in: Result<u16, PortError>,
        x_in: Result<u16, PortError>,
        written: Vec<(Port, u16)>,
    }

    impl StackBus for Wired {
        fn read_word(&mut self, space: AddressSpace, addr: u32) -> u16 {
            self.memory.read_word(space, addr)
        }

        fn write_word(&mut self, space: AddressSpace, addr: u32, value: u16) {
            self.memory.write_word(space, addr, value);
        }

        fn read_port(&mut self, port: Port) -> Result<u16, PortError> {
            match port {
                Port::B => self.b_in,
                Port::X => self.x_in,
            }
        }

        fn write_port(&mut self, port: Port, value: u16) -> Result<(), PortError> {
            self.written.push((port, value));
            Ok(())
        }
    }

    fn wired() -> (StackCpu, Wired) {
        (
            StackCpu::default(),
            Wired {
                memory: FlatStackMemory::default(),
                b_in: Ok(0),
                x_in: Ok(0),
                written: Vec::new(),
            },
        )
    }

    #[test]
    fn jk_packs_k_into_high_byte() {
        let (mut cpu, mut bus) = wired();
        cpu.registers_mut().j = 0x12;
        cpu.registers_mut().k = 0x34;
        assert_eq!(cpu.read_internal(&mut bus, 0), 0x3412);

        cpu.write_internal(&mut bus, 0, 0xABCD);
        assert_eq!(cpu.registers().k, 0xAB);
        assert_eq!(cpu.registers().j, 0xCD);
    }

    #[test]
    fn aliased_slots_share_registers() {
        let (mut cpu, mut bus) = wired();
        cpu.write_internal(&mut bus, 5, 0x1111);
        cpu.write_internal(&mut bus, 7, 0x2222);
        assert_eq!(cpu.read_internal(&mut bus, 4), 0x1111);
        assert_eq!(cpu.read_internal(&mut bus, 6), 0x2222);
    }

    #[test]
    fn b_data_xors_inputs_and_passes_outputs() {
        let (mut cpu, mut bus) = wired();
        cpu.write_internal(&mut bus, 10, 0xFF00);
        cpu.write_internal(&mut bus, 8, 0x0F0F);
        bus.b_in = Ok(0x00FF);

        assert_eq!(cpu.read_internal(&mut bus, 8), 0x0FF0);
        assert_eq!(bus.written, vec![(Port::B, 0x0F0F)]);
    }

    #[test]
    fn masked_bits_are_not_written_to_the_port() {
        let (mut cpu, mut bus) = wired();
        cpu.write_internal(&mut bus, 13, 0x0003);
        cpu.write_internal(&mut bus, 12, 0x001F);
        assert_eq!(bus.written, vec![(Port::X, 0x001C)]);
    }

    #[test]
    fn unbound_port_falls_back_to_cached_pins() {
        let (mut cpu, mut bus) = wired();
        bus.x_in = Err(PortError::Unbound);
        cpu.drive_port_x(0x0015);
        assert_eq!(cpu.read_internal(&mut bus, 12), 0x0015);

        bus.b_in = Err(PortError::DeviceFailed);
        cpu.drive_port_b(0xA5A5);
        assert_eq!(cpu.read_internal(&mut bus, 8), 0xA5A5);
    }

    #[test]
    fn x_tristate_hides_interrupt_enable_on_read() {
        let (mut cpu, mut bus) = wired();
        cpu.write_internal(&mut bus, 15, 0x01FF);
        assert!(cpu.port_x().interrupt_enabled());
        assert_eq!(cpu.read_internal(&mut bus, 15), 0x001F);
    }
}
