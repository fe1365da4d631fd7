//! Fetch, decode and dispatch loop of the register processor.
//!
//! Every call to [`RegisterCpu::step`] follows the same order:
//! 1. Service a pending NMI, or the interrupt line when `PSR.I` is set
//! 2. Return early while halted in `WAIT`
//! 3. Prefetch the instruction window at `pc` and decode it
//! 4. Execute; a trap raised on the way is dispatched through the interrupt table
//! 5. Raise the trace trap when `PSR.T` was set at the start of the instruction

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

mod arith;
mod control;
mod integer;
mod string;
mod trap;

pub use arith::{add_with_carry, divide, subtract_with_borrow, ArithResult, DivideOp};

use tracing::{trace, warn};

use crate::decode::{decode, Decoded, Instruction, MAX_INSTRUCTION_BYTES};
use crate::encoding::{Opcode, Width};
use crate::operand::{Base, GenOperand};
use crate::state::PSR_T;
use crate::{
    CoreError, RegisterBus, RegisterConfig, RegisterFile, RunOutcome, RunStop, StepOutcome,
    TraceControl, TraceEvent, TraceSink, Trap, ADDRESS_MASK,
};

/// Bytes read from the bus ahead of each dispatch.
pub const PREFETCH_BYTES: usize = MAX_INSTRUCTION_BYTES + 1;

/// One register processor core: register file plus interrupt and wait latches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterCpu {
    config: RegisterConfig,
    regs: RegisterFile,
    interrupt_line: bool,
    nmi_pending: bool,
    waiting: bool,
}

impl Default for RegisterCpu {
    fn default() -> Self {
        Self::new(RegisterConfig::default())
    }
}

/// Why an instruction did not complete normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    Trap(Trap),
    Abort(CoreError),
}

impl From<Trap> for Fault {
    fn from(trap: Trap) -> Self {
        Self::Trap(trap)
    }
}

impl From<CoreError> for Fault {
    fn from(err: CoreError) -> Self {
        Self::Abort(err)
    }
}

/// Where control goes after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Next {
    /// Fall through to the following instruction.
    Sequential,
    /// Continue at an absolute address.
    Jump(u32),
    /// Dispatch the same instruction again.
    Repeat,
}

/// Resolved operand location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Location {
    Register(u8),
    Memory(u32),
    Immediate(u32),
    TopOfStack,
}

/// Address and encoding of the instruction being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fetch {
    pub(crate) pc: u32,
    pub(crate) next_pc: u32,
    pub(crate) opcode: Opcode,
}

impl Fetch {
    pub(crate) const fn unimplemented(&self) -> Fault {
        Fault::Abort(CoreError::Unimplemented {
            pc: self.pc,
            opcode: self.opcode.raw() & 0x00FF_FFFF,
        })
    }

    pub(crate) const fn relative(&self, displacement: i32) -> u32 {
        self.pc.wrapping_add_signed(displacement) & ADDRESS_MASK
    }
}

impl RegisterCpu {
    /// Creates a core in its reset state.
    #[must_use]
    pub const fn new(config: RegisterConfig) -> Self {
        Self {
            config,
            regs: RegisterFile::at_boot(config.boot_pc & ADDRESS_MASK),
            interrupt_line: false,
            nmi_pending: false,
            waiting: false,
        }
    }

    /// Zeroes every register, reloads `pc` with the boot address and drops pending requests.
    pub const fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// Configuration the core was built with.
    #[must_use]
    pub const fn config(&self) -> &RegisterConfig {
        &self.config
    }

    /// Architectural registers.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// Mutable architectural registers, for hosts and debuggers.
    pub const fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    /// Level of the maskable interrupt line.
    #[must_use]
    pub const fn interrupt_line(&self) -> bool {
        self.interrupt_line
    }

    /// Drives the maskable interrupt line. The request is taken while the line
    /// is high and `PSR.I` is set; the host lowers it once acknowledged.
    pub const fn set_interrupt_line(&mut self, level: bool) {
        self.interrupt_line = level;
    }

    /// Latches a non-maskable interrupt, taken before the next instruction.
    pub const fn request_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Returns `true` while halted by `WAIT`.
    #[must_use]
    pub const fn waiting(&self) -> bool {
        self.waiting
    }

    /// Executes one dispatch, servicing a pending interrupt first.
    ///
    /// A trap raised by the instruction is dispatched before returning and
    /// reported in [`StepOutcome::trap`]. While halted in `WAIT` with no
    /// serviceable interrupt, nothing is fetched and the outcome has
    /// `waiting` set.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] for instructions and addressing modes the core
    /// does not model. Operands decoded before the abort may already have
    /// been read (and a `TOS` operand popped).
    pub fn step(&mut self, bus: &mut dyn RegisterBus) -> Result<StepOutcome, CoreError> {
        let interrupt_taken = self.poll_interrupt(bus).is_some();
        let pc = self.regs.pc;
        if self.waiting {
            return Ok(StepOutcome {
                pc,
                opcode: 0,
                cycles: 0,
                trap: None,
                interrupt_taken,
                waiting: true,
            });
        }

        let window = Self::prefetch(bus, pc);
        let opcode = Opcode::from_bytes(&window).raw();
        let trap = self.dispatch(bus, pc, &window)?.map(|(trap, _)| trap);
        Ok(StepOutcome {
            pc,
            opcode,
            cycles: self.dispatch_cost(),
            trap,
            interrupt_taken,
            waiting: false,
        })
    }

    /// Executes dispatches until `budget` cycles are consumed, the core halts
    /// in `WAIT`, or `sink` breaks.
    ///
    /// A budget of zero returns immediately. A break requested on
    /// [`TraceEvent::InstructionFetch`] leaves the fetched instruction unexecuted.
    ///
    /// # Errors
    ///
    /// Propagates [`CoreError`] from the failing dispatch.
    pub fn run(
        &mut self,
        bus: &mut dyn RegisterBus,
        budget: u32,
        mut sink: Option<&mut dyn TraceSink>,
    ) -> Result<RunOutcome, CoreError> {
        let mut cycles: u32 = 0;
        let mut instructions: u32 = 0;

        while cycles < budget {
            if let Some(return_pc) = self.poll_interrupt(bus) {
                emit(&mut sink, TraceEvent::InterruptServiced { return_pc });
            }
            if self.waiting {
                return Ok(RunOutcome {
                    cycles,
                    instructions,
                    stop: RunStop::Waiting,
                });
            }

            let pc = self.regs.pc;
            let window = Self::prefetch(bus, pc);
            let opcode = Opcode::from_bytes(&window).raw();
            if emit(&mut sink, TraceEvent::InstructionFetch { pc, opcode }) == TraceControl::Break
            {
                return Ok(RunOutcome {
                    cycles,
                    instructions,
                    stop: RunStop::Break { pc },
                });
            }

            if let Some((trap, return_pc)) = self.dispatch(bus, pc, &window)? {
                emit(&mut sink, TraceEvent::TrapTaken { trap, return_pc });
            }
            let spent = self.dispatch_cost();
            cycles = cycles.saturating_add(spent);
            instructions = instructions.saturating_add(1);
            emit(
                &mut sink,
                TraceEvent::InstructionRetired { pc, cycles: spent },
            );
        }

        Ok(RunOutcome {
            cycles,
            instructions,
            stop: RunStop::BudgetExhausted,
        })
    }

    const fn dispatch_cost(&self) -> u32 {
        if self.config.cycles_per_instruction == 0 {
            1
        } else {
            self.config.cycles_per_instruction
        }
    }

    fn prefetch(bus: &mut dyn RegisterBus, pc: u32) -> [u8; PREFETCH_BYTES] {
        let mut window = [0u8; PREFETCH_BYTES];
        for (offset, byte) in window.iter_mut().enumerate() {
            *byte = bus.read8(pc.wrapping_add(offset as u32) & ADDRESS_MASK);
        }
        trace!(pc, opcode = window[0], "fetch");
        window
    }

    /// Decodes and executes the instruction in `window`; returns the trap taken, if any,
    /// with the address saved for its return.
    fn dispatch(
        &mut self,
        bus: &mut dyn RegisterBus,
        pc: u32,
        window: &[u8],
    ) -> Result<Option<(Trap, u32)>, CoreError> {
        let decoded = decode(window).unwrap_or(Decoded {
            opcode: Opcode::from_bytes(window),
            format: None,
            instruction: Instruction::Undefined,
            len: 1,
        });
        let fetch = Fetch {
            pc,
            next_pc: pc.wrapping_add(decoded.len as u32) & ADDRESS_MASK,
            opcode: decoded.opcode,
        };
        let tracing = self.regs.flag(PSR_T);

        match self.execute(bus, &fetch, &decoded) {
            Ok(next) => {
                self.regs.pc = match next {
                    Next::Sequential => fetch.next_pc,
                    Next::Jump(target) => target & ADDRESS_MASK,
                    Next::Repeat => pc,
                };
                if tracing {
                    let return_pc = self.regs.pc;
                    self.take_trap(bus, Trap::Trc, return_pc);
                    return Ok(Some((Trap::Trc, return_pc)));
                }
                Ok(None)
            }
            Err(Fault::Trap(trap)) => {
                self.take_trap(bus, trap, pc);
                Ok(Some((trap, pc)))
            }
            Err(Fault::Abort(err)) => {
                warn!(pc, %err, "instruction aborted");
                Err(err)
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn execute(
        &mut self,
        bus: &mut dyn RegisterBus,
        fetch: &Fetch,
        decoded: &Decoded,
    ) -> Result<Next, Fault> {
        match decoded.instruction {
            Instruction::Branch {
                condition,
                displacement,
            } => Ok(if condition.holds(self.regs.psr) {
                Next::Jump(fetch.relative(displacement))
            } else {
                Next::Sequential
            }),
            Instruction::Control { op, displacement } => {
                self.execute_control(bus, fetch, op, displacement)
            }
            Instruction::RegisterList {
                op,
                mask,
                displacement,
            } => {
                self.execute_register_list(bus, op, mask, displacement);
                Ok(Next::Sequential)
            }
            Instruction::Implied(op) => self.execute_implied(bus, fetch, op),
            Instruction::Quick {
                op,
                width,
                value,
                operand,
            } => self.execute_quick(bus, fetch, op, width, value, operand),
            Instruction::ProcessorRegister {
                op,
                width,
                register,
                operand,
            } => self.execute_processor_register(bus, fetch, op, width, register, operand),
            Instruction::SetCondition {
                condition,
                width,
                operand,
            } => {
                let loc = self.locate(bus, fetch, operand)?;
                let value = u32::from(condition.holds(self.regs.psr));
                self.write(bus, loc, width, value)?;
                Ok(Next::Sequential)
            }
            Instruction::AddCompareBranch {
                width,
                increment,
                index,
                displacement,
            } => self.execute_acb(bus, fetch, width, increment, index, displacement),
            Instruction::Unary { op, width, operand } => {
                self.execute_unary(bus, fetch, op, width, operand)
            }
            Instruction::Binary {
                op,
                width,
                source,
                destination,
            } => self.execute_binary(bus, fetch, op, width, source, destination),
            Instruction::Field {
                op,
                width,
                source,
                destination,
                offset,
                length,
            } => self.execute_field(
                bus,
                fetch,
                op,
                width,
                (source, destination),
                (offset, length),
            ),
            Instruction::Block { .. } => Err(fetch.unimplemented()),
            Instruction::String { op, width, options } => {
                self.execute_string(bus, fetch, op, width, options)
            }
            Instruction::SetConfig { flags } => {
                self.require_supervisor()?;
                self.regs.cfg = flags;
                Ok(Next::Sequential)
            }
            Instruction::Unsupported { format: 8 } => Err(fetch.unimplemented()),
            Instruction::Unsupported { .. } | Instruction::Undefined => Err(Trap::Und.into()),
        }
    }

    pub(crate) const fn require_supervisor(&self) -> Result<(), Fault> {
        if self.regs.user_mode() {
            Err(Fault::Trap(Trap::Ill))
        } else {
            Ok(())
        }
    }

    /// Resolves a general operand to the location it names.
    pub(crate) fn locate(
        &mut self,
        bus: &mut dyn RegisterBus,
        fetch: &Fetch,
        operand: GenOperand,
    ) -> Result<Location, Fault> {
        let addr = |base: u32, displacement: i32| base.wrapping_add_signed(displacement);
        let loc = match operand {
            GenOperand::Register(reg) => Location::Register(reg),
            GenOperand::RegisterRelative {
                register,
                displacement,
            } => Location::Memory(addr(self.regs.r[usize::from(register & 7)], displacement)),
            GenOperand::MemoryRelative {
                base,
                displacement,
                offset,
            } => {
                let pointer = bus.read32(addr(self.base(base, fetch), displacement) & ADDRESS_MASK);
                Location::Memory(addr(pointer, offset))
            }
            GenOperand::Reserved => return Err(Trap::Und.into()),
            GenOperand::Immediate { value, .. } => Location::Immediate(value),
            GenOperand::Absolute(disp) => Location::Memory(disp as u32),
            GenOperand::External { index, offset } => {
                let link_table = bus.read32(u32::from(self.regs.mod_).wrapping_add(4));
                let entry = link_table.wrapping_add_signed(index.wrapping_mul(4));
                let pointer = bus.read32(entry & ADDRESS_MASK);
                Location::Memory(addr(pointer, offset))
            }
            GenOperand::TopOfStack => Location::TopOfStack,
            GenOperand::MemorySpace { base, displacement } => {
                Location::Memory(addr(self.base(base, fetch), displacement))
            }
            GenOperand::ScaledIndex(mode) => {
                return Err(CoreError::ScaledIndexUnimplemented { pc: fetch.pc, mode }.into())
            }
        };
        Ok(match loc {
            Location::Memory(a) => Location::Memory(a & ADDRESS_MASK),
            other => other,
        })
    }

    const fn base(&self, base: Base, fetch: &Fetch) -> u32 {
        match base {
            Base::Fp => self.regs.fp,
            Base::Sp => self.regs.sp(),
            Base::Sb => self.regs.sb,
            Base::Pc => fetch.pc,
        }
    }

    /// Reads `width` bits from `loc`; `TOS` pops.
    pub(crate) fn read(&mut self, bus: &mut dyn RegisterBus, loc: Location, width: Width) -> u32 {
        match loc {
            Location::Register(reg) => self.regs.r[usize::from(reg & 7)] & width.mask(),
            Location::Memory(addr) => read_memory(bus, addr, width),
            Location::Immediate(value) => value & width.mask(),
            Location::TopOfStack => self.pop(bus, width),
        }
    }

    /// Writes `width` bits to `loc`; `TOS` pushes and immediates trap.
    pub(crate) fn write(
        &mut self,
        bus: &mut dyn RegisterBus,
        loc: Location,
        width: Width,
        value: u32,
    ) -> Result<(), Fault> {
        match loc {
            Location::Register(reg) => {
                let slot = &mut self.regs.r[usize::from(reg & 7)];
                *slot = width.merge(*slot, value);
            }
            Location::Memory(addr) => write_memory(bus, addr, width, value),
            Location::Immediate(_) => return Err(Trap::Ill.into()),
            Location::TopOfStack => self.push(bus, width, value),
        }
        Ok(())
    }

    /// Effective address of a memory location; `TOS` names the current stack top.
    pub(crate) const fn address(&self, loc: Location) -> Result<u32, Fault> {
        match loc {
            Location::Memory(addr) => Ok(addr),
            Location::TopOfStack => Ok(self.regs.sp() & ADDRESS_MASK),
            Location::Register(_) | Location::Immediate(_) => Err(Fault::Trap(Trap::Ill)),
        }
    }

    pub(crate) fn read_operand(
        &mut self,
        bus: &mut dyn RegisterBus,
        fetch: &Fetch,
        operand: GenOperand,
        width: Width,
    ) -> Result<u32, Fault> {
        let loc = self.locate(bus, fetch, operand)?;
        Ok(self.read(bus, loc, width))
    }

    pub(crate) fn effective_address(
        &mut self,
        bus: &mut dyn RegisterBus,
        fetch: &Fetch,
        operand: GenOperand,
    ) -> Result<u32, Fault> {
        let loc = self.locate(bus, fetch, operand)?;
        self.address(loc)
    }

    pub(crate) fn push(&mut self, bus: &mut dyn RegisterBus, width: Width, value: u32) {
        let sp = self.regs.sp().wrapping_sub(width.bytes());
        self.regs.set_sp(sp);
        write_memory(bus, sp & ADDRESS_MASK, width, value);
    }

    pub(crate) fn pop(&mut self, bus: &mut dyn RegisterBus, width: Width) -> u32 {
        let sp = self.regs.sp();
        let value = read_memory(bus, sp & ADDRESS_MASK, width);
        self.regs.set_sp(sp.wrapping_add(width.bytes()));
        value
    }

    pub(crate) fn push32(&mut self, bus: &mut dyn RegisterBus, value: u32) {
        self.push(bus, Width::Double, value);
    }

    pub(crate) fn pop32(&mut self, bus: &mut dyn RegisterBus) -> u32 {
        self.pop(bus, Width::Double)
    }
}

fn read_memory(bus: &mut dyn RegisterBus, addr: u32, width: Width) -> u32 {
    match width {
        Width::Byte => u32::from(bus.read8(addr)),
        Width::Word => u32::from(bus.read16(addr)),
        Width::Double => bus.read32(addr),
    }
}

fn write_memory(bus: &mut dyn RegisterBus, addr: u32, width: Width, value: u32) {
    match width {
        Width::Byte => bus.write8(addr, value as u8),
        Width::Word => bus.write16(addr, value as u16),
        Width::Double => bus.write32(addr, value),
    }
}

fn emit(sink: &mut Option<&mut dyn TraceSink>, event: TraceEvent) -> TraceControl {
    sink.as_mut()
        .map_or(TraceControl::Continue, |sink| sink.on_event(event))
}
