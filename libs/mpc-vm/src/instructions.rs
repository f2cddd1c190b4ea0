//! The VM's instruction set.

use crate::memory::Address;
use crate::value::Value;
use std::{fmt, sync::Arc};

/// A host-supplied tracing callback invoked by `Debug`. Always ready; never suspends.
pub type DebugHook = Arc<dyn Fn(&crate::memory::Memory) + Send + Sync>;

/// One instruction in a [`crate::process::Process`]'s code.
///
/// Every operand is a [`Address`] into [`crate::memory::Memory`]. Instructions that operate on a
/// batch of `b >= 1` contiguous slots carry that count explicitly; batch 1 is the common case of a
/// single-slot operation.
///
/// `Clone` is cheap (every field is a small copy type, an `Arc`, or a `Vec` of the same) and is
/// used by the dispatch loop to step an instruction without holding a borrow of `Process::code`.
#[derive(Clone)]
pub enum Instruction {
    // --- synchronous ---
    /// `mem[dst] := val`.
    Move {
        /// Destination address.
        dst: Address,
        /// The literal value to store.
        val: Value,
    },
    /// `for i in 0..n: mem[dst+i] := mem[src + i*step]`.
    Copy {
        /// Destination address.
        dst: Address,
        /// Source address.
        src: Address,
        /// Stride between successive source reads.
        step: u32,
        /// Number of slots to copy.
        n: usize,
    },
    /// `dst := lhs + rhs` using [`Value`] arithmetic.
    Add {
        /// Destination address.
        dst: Address,
        /// Left operand address.
        lhs: Address,
        /// Right operand address.
        rhs: Address,
    },
    /// `dst := lhs - rhs` using [`Value`] arithmetic.
    Sub {
        /// Destination address.
        dst: Address,
        /// Left operand address.
        lhs: Address,
        /// Right operand address.
        rhs: Address,
    },
    /// `dst := -lhs`.
    Neg {
        /// Destination address.
        dst: Address,
        /// Operand address.
        lhs: Address,
    },
    /// Public-only exponentiation: `dst := lhs ^ rhs`.
    Exp {
        /// Destination address.
        dst: Address,
        /// Base address.
        lhs: Address,
        /// Exponent address.
        rhs: Address,
    },
    /// Public-only multiplicative inverse: `dst := lhs^-1`.
    Inv {
        /// Destination address.
        dst: Address,
        /// Operand address.
        lhs: Address,
    },
    /// Public-only integer modulo (representative sense): `dst := lhs mod rhs`.
    Mod {
        /// Destination address.
        dst: Address,
        /// Dividend address.
        lhs: Address,
        /// Modulus address.
        rhs: Address,
    },
    /// Multiplication where at least one operand is public.
    MulPub {
        /// Destination address.
        dst: Address,
        /// Left operand address.
        lhs: Address,
        /// Right operand address.
        rhs: Address,
    },
    /// Invokes a host-supplied tracing callback; always ready.
    Debug {
        /// The callback to invoke with a read-only view of memory.
        hook: DebugHook,
    },
    /// Terminates the process, reporting the values at the given addresses.
    Exit {
        /// Addresses of the values to report.
        srcs: Vec<Address>,
    },

    // --- asynchronous ---
    /// Requests `b` independent private random shares.
    GenerateRn {
        /// Destination address of the first share.
        dst: Address,
        /// Number of shares requested.
        b: usize,
    },
    /// Requests `b` independent private random shares of zero.
    GenerateRnZero {
        /// Destination address of the first share.
        dst: Address,
        /// Number of shares requested.
        b: usize,
    },
    /// Requests `b` independent `(rho, sigma)` pairs, stored contiguously.
    GenerateRnTuple {
        /// Destination address of the first pair.
        dst: Address,
        /// Number of pairs requested.
        b: usize,
    },
    /// Private x private multiplication of `b` shares, consuming `b` random tuples at `rns`.
    Mul {
        /// Destination address of the first product share.
        dst: Address,
        /// Left operands' address.
        lhs: Address,
        /// Right operands' address.
        rhs: Address,
        /// Address of the first `(rho, sigma)` tuple to consume.
        rns: Address,
        /// Batch size.
        b: usize,
    },
    /// Multiplies two private shares and opens the result to a public value.
    MulOpen {
        /// Destination address.
        dst: Address,
        /// Left operand address.
        lhs: Address,
        /// Right operand address.
        rhs: Address,
    },
    /// Reveals a private share as a public value.
    Open {
        /// Destination address.
        dst: Address,
        /// Source address of the private share.
        src: Address,
    },

    // --- structural ---
    /// Expanded once at construction time into `body`; never seen by the execution engine after
    /// [`crate::macros::expand`] has run.
    Macro {
        /// The macro's primitive expansion.
        body: Vec<Instruction>,
    },
    /// Opens an async block.
    Async,
    /// Closes an async block.
    Await,
}

impl Instruction {
    /// Whether this instruction may suspend execution.
    pub fn is_async(&self) -> bool {
        matches!(
            self,
            Instruction::GenerateRn { .. }
                | Instruction::GenerateRnZero { .. }
                | Instruction::GenerateRnTuple { .. }
                | Instruction::Mul { .. }
                | Instruction::MulOpen { .. }
                | Instruction::Open { .. }
        )
    }

    /// The batch count `b` this instruction requests, if it is one of the batched asynchronous
    /// instructions subject to [`crate::config::VmConfig::max_batch`].
    pub fn batch(&self) -> Option<usize> {
        match self {
            Instruction::GenerateRn { b, .. }
            | Instruction::GenerateRnZero { b, .. }
            | Instruction::GenerateRnTuple { b, .. }
            | Instruction::Mul { b, .. } => Some(*b),
            _ => None,
        }
    }

    /// A short name for this instruction's variant, used in trace logging.
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Move { .. } => "Move",
            Instruction::Copy { .. } => "Copy",
            Instruction::Add { .. } => "Add",
            Instruction::Sub { .. } => "Sub",
            Instruction::Neg { .. } => "Neg",
            Instruction::Exp { .. } => "Exp",
            Instruction::Inv { .. } => "Inv",
            Instruction::Mod { .. } => "Mod",
            Instruction::MulPub { .. } => "MulPub",
            Instruction::Debug { .. } => "Debug",
            Instruction::Exit { .. } => "Exit",
            Instruction::GenerateRn { .. } => "GenerateRn",
            Instruction::GenerateRnZero { .. } => "GenerateRnZero",
            Instruction::GenerateRnTuple { .. } => "GenerateRnTuple",
            Instruction::Mul { .. } => "Mul",
            Instruction::MulOpen { .. } => "MulOpen",
            Instruction::Open { .. } => "Open",
            Instruction::Macro { .. } => "Macro",
            Instruction::Async => "Async",
            Instruction::Await => "Await",
        }
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
