use std::fmt;

use log::{debug, trace};

use crate::debug::Breakpoints;
use crate::decode::{Disassembled, Mode, Opcode, decode};
use crate::error::Fault;
use crate::io::Channels;
use crate::memory::{IllegalAddress, Memory, MemoryPolicy};

/// Execution status, observed by the caller between calls to `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Ready to execute the instruction at the program counter.
    Running,
    /// An input instruction found the queue empty. Push input and run again.
    WaitingForInput,
    /// Terminal: opcode 99 executed.
    Halted,
    /// Terminal: an address or opcode fault was raised.
    Faulted,
    /// Suspended before the instruction at a breakpoint. Running again
    /// executes it.
    AtBreakpoint,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Halted | Status::Faulted)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Running => "running",
            Status::WaitingForInput => "waiting for input",
            Status::Halted => "halted",
            Status::Faulted => "faulted",
            Status::AtBreakpoint => "at breakpoint",
        };
        f.write_str(name)
    }
}

/// How the program counter moves after an instruction.
enum Next {
    /// Past the instruction and its parameters.
    Advance,
    /// To an explicit target.
    Jump(i64),
    /// Nowhere: the same instruction runs again on resume.
    Stay,
}

/// An Intcode machine: memory, program counter, relative base, I/O
/// channels and debug state.
///
/// A machine is driven by the caller. `run` executes until the program
/// halts, needs input, reaches a breakpoint or faults; `run_for` does the
/// same but stops after a fixed number of instructions.
#[derive(Debug, Clone)]
pub struct Machine {
    pub(crate) memory: Memory,
    pub(crate) pc: usize,
    relative_base: i64,
    pub(crate) status: Status,
    fault: Option<Fault>,
    io: Channels,
    pub(crate) breakpoints: Breakpoints,
    cycle_count: u64,
    last_opcode: Option<u8>,
    pub(crate) snapshot: Memory,
}

impl Machine {
    pub fn new(program: &[i64], input: &[i64], policy: MemoryPolicy) -> Self {
        let memory = Memory::new(program, policy);
        Self {
            snapshot: memory.clone(),
            memory,
            pc: 0,
            relative_base: 0,
            status: Status::Running,
            fault: None,
            io: Channels::new(input),
            breakpoints: Breakpoints::default(),
            cycle_count: 0,
            last_opcode: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn program_counter(&self) -> usize {
        self.pc
    }

    pub fn relative_base(&self) -> i64 {
        self.relative_base
    }

    /// Number of instructions dispatched so far.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Opcode number of the most recently fetched instruction, including one
    /// that faulted as unknown.
    pub fn last_opcode(&self) -> Option<u8> {
        self.last_opcode
    }

    /// The fault that stopped this machine, if any.
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn last_output(&self) -> Option<i64> {
        self.io.last_output()
    }

    pub fn output_log(&self) -> &[i64] {
        self.io.output_log()
    }

    pub fn take_output(&mut self) -> Vec<i64> {
        self.io.take_output()
    }

    pub fn push_input(&mut self, value: i64) {
        self.io.push_input(value);
    }

    pub fn input_len(&self) -> usize {
        self.io.pending_input()
    }

    /// Run until halted, waiting for input, at a breakpoint, or faulted.
    pub fn run(&mut self) -> Result<Status, Fault> {
        self.run_limited(None)
    }

    /// Like `run`, but execute at most `steps` instructions.
    pub fn run_for(&mut self, steps: usize) -> Result<Status, Fault> {
        self.run_limited(Some(steps))
    }

    pub fn step(&mut self) -> Result<Status, Fault> {
        self.run_for(1)
    }

    pub fn provide_input_and_run(&mut self, value: i64) -> Result<Status, Fault> {
        self.io.push_input(value);
        if self.status == Status::WaitingForInput {
            self.status = Status::Running;
        }
        self.run()
    }

    fn run_limited(&mut self, limit: Option<usize>) -> Result<Status, Fault> {
        if let Some(fault) = self.fault {
            return Err(fault);
        }
        if self.status.is_terminal()
            || (self.status == Status::WaitingForInput && self.io.pending_input() == 0)
        {
            return Ok(self.status);
        }

        let mut executed = 0;
        while limit.is_none_or(|n| executed < n) {
            if self.breakpoints.check(self.pc) {
                debug!("breakpoint at pc = {}", self.pc);
                self.status = Status::AtBreakpoint;
                break;
            }
            self.status = Status::Running;

            if let Err(fault) = self.cycle() {
                debug!("{fault}");
                self.status = Status::Faulted;
                self.fault = Some(fault);
                return Err(fault);
            }
            executed += 1;

            if matches!(self.status, Status::Halted | Status::WaitingForInput) {
                break;
            }
        }
        Ok(self.status)
    }

    /// Fetch, decode and execute the instruction at the program counter.
    fn cycle(&mut self) -> Result<(), Fault> {
        let pc = self.pc;
        let word = self.read(pc as i64)?;
        let instr = decode(word);
        self.last_opcode = Some(instr.opcode);
        let unknown = Fault::UnknownOpcode {
            pc,
            opcode: instr.opcode as i64,
            word,
        };
        let opcode = Opcode::from_code(instr.opcode).ok_or(unknown)?;

        // Parameters the opcode does not take keep the default mode.
        let mut modes = [Mode::Position; 3];
        for (i, mode) in modes.iter_mut().enumerate().take(opcode.param_count()) {
            *mode = instr.mode(i).ok_or(unknown)?;
        }

        if log::log_enabled!(log::Level::Trace) {
            let params: Vec<i64> = (0..opcode.param_count())
                .map(|i| self.memory.peek(pc + 1 + i))
                .collect();
            let line = Disassembled {
                opcode,
                modes: instr.modes,
                params: &params,
            };
            trace!("{pc:5}: {line} (rb = {})", self.relative_base);
        }

        let next = match opcode {
            Opcode::Add => {
                let a = self.load(modes[0], 0)?;
                let b = self.load(modes[1], 1)?;
                self.store(modes[2], 2, a.wrapping_add(b))?;
                Next::Advance
            }
            Opcode::Multiply => {
                let a = self.load(modes[0], 0)?;
                let b = self.load(modes[1], 1)?;
                self.store(modes[2], 2, a.wrapping_mul(b))?;
                Next::Advance
            }
            Opcode::Input => match self.io.consume_input() {
                Some(value) => {
                    self.store(modes[0], 0, value)?;
                    Next::Advance
                }
                None => {
                    debug!("waiting for input at pc = {pc}");
                    self.status = Status::WaitingForInput;
                    Next::Stay
                }
            },
            Opcode::Output => {
                let a = self.load(modes[0], 0)?;
                self.io.emit(a);
                Next::Advance
            }
            Opcode::JumpIfTrue => {
                let a = self.load(modes[0], 0)?;
                let b = self.load(modes[1], 1)?;
                if a != 0 { Next::Jump(b) } else { Next::Advance }
            }
            Opcode::JumpIfFalse => {
                let a = self.load(modes[0], 0)?;
                let b = self.load(modes[1], 1)?;
                if a == 0 { Next::Jump(b) } else { Next::Advance }
            }
            Opcode::LessThan => {
                let a = self.load(modes[0], 0)?;
                let b = self.load(modes[1], 1)?;
                self.store(modes[2], 2, (a < b) as i64)?;
                Next::Advance
            }
            Opcode::Equals => {
                let a = self.load(modes[0], 0)?;
                let b = self.load(modes[1], 1)?;
                self.store(modes[2], 2, (a == b) as i64)?;
                Next::Advance
            }
            Opcode::AdjustBase => {
                let a = self.load(modes[0], 0)?;
                self.relative_base = self.relative_base.wrapping_add(a);
                Next::Advance
            }
            Opcode::Halt => {
                debug!("halted at pc = {pc} after {} cycles", self.cycle_count + 1);
                self.status = Status::Halted;
                Next::Stay
            }
        };

        match next {
            Next::Advance => self.pc += 1 + opcode.param_count(),
            Next::Jump(target) => {
                self.pc = usize::try_from(target)
                    .map_err(|_| Fault::Address { pc, address: target })?;
            }
            Next::Stay => {}
        }
        self.cycle_count += 1;
        Ok(())
    }

    fn address_fault(&self, IllegalAddress(address): IllegalAddress) -> Fault {
        Fault::Address {
            pc: self.pc,
            address,
        }
    }

    fn read(&self, address: i64) -> Result<i64, Fault> {
        self.memory
            .read(address)
            .map_err(|e| self.address_fault(e))
    }

    /// Raw word of parameter `index` (0-based) of the current instruction.
    fn param(&self, index: usize) -> Result<i64, Fault> {
        self.read((self.pc + 1 + index) as i64)
    }

    fn load(&self, mode: Mode, index: usize) -> Result<i64, Fault> {
        let raw = self.param(index)?;
        match mode {
            Mode::Position => self.read(raw),
            Mode::Immediate => Ok(raw),
            Mode::Relative => self.read(raw.saturating_add(self.relative_base)),
        }
    }

    /// Write `value` to the target named by parameter `index`. Immediate
    /// mode names its target the same way position mode does.
    fn store(&mut self, mode: Mode, index: usize, value: i64) -> Result<(), Fault> {
        let raw = self.param(index)?;
        let address = match mode {
            Mode::Position | Mode::Immediate => raw,
            Mode::Relative => raw.saturating_add(self.relative_base),
        };
        let pc = self.pc;
        self.memory
            .write(address, value)
            .map_err(|IllegalAddress(address)| Fault::Address { pc, address })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn arbitrary_programs_never_panic(
            program in prop::collection::vec(-3i64..25_000, 1..64),
            input in prop::collection::vec(any::<i64>(), 0..4)
        ) {
            for policy in [MemoryPolicy::Bounded, MemoryPolicy::Unbounded] {
                let mut vm = Machine::new(&program, &input, policy);
                let _ = vm.run_for(2048);
            }
        }

        #[test]
        fn run_for_respects_step_limit(
            program in prop::collection::vec(0i64..25_000, 1..64),
            limit in 0usize..200
        ) {
            let mut vm = Machine::new(&program, &[1, 2, 3], MemoryPolicy::Unbounded);
            let _ = vm.run_for(limit);
            prop_assert!(vm.cycle_count() <= limit as u64);
        }

        #[test]
        fn bounded_memory_never_grows(
            program in prop::collection::vec(-3i64..25_000, 1..64)
        ) {
            let mut vm = Machine::new(&program, &[7], MemoryPolicy::Bounded);
            let _ = vm.run_for(1024);
            prop_assert_eq!(vm.memory().len(), program.len());
        }
    }
}
