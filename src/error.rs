use thiserror::Error;

/// A terminal execution fault. Once raised, the machine stays `Faulted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    /// A negative address, or under the bounded policy an address past the
    /// end of the original program.
    #[error("illegal address {address} at pc = {pc}")]
    Address { pc: usize, address: i64 },

    /// The instruction word at `pc` does not name a defined opcode, or uses
    /// an addressing mode digit outside 0..=2.
    #[error("unknown opcode {opcode} at pc = {pc} (*pc = {word})")]
    UnknownOpcode { pc: usize, opcode: i64, word: i64 },
}

impl Fault {
    /// Program counter of the instruction that faulted.
    pub fn pc(&self) -> usize {
        match *self {
            Fault::Address { pc, .. } | Fault::UnknownOpcode { pc, .. } => pc,
        }
    }
}
