//! The VM's error taxonomy.

use crate::memory::MemoryError;
use field::FieldError;
use shamir_sharing::ShamirError;

/// An error raised while executing a program. Every variant carries the program counter at
/// which the failure occurred. On any `ExecError`, the engine does not advance the PC; the
/// caller is expected to abandon the process.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// The PC advanced past the end of the code without encountering a terminator.
    #[error("pc {pc}: code overflow, no terminator found")]
    CodeOverflow {
        /// The program counter at the point of failure.
        pc: u64,
    },

    /// Dispatch encountered an instruction variant it does not know how to execute. This should
    /// be unreachable given an exhaustive match over every live variant.
    #[error("pc {pc}: unexpected instruction")]
    UnexpectedInstruction {
        /// The program counter at the point of failure.
        pc: u64,
    },

    /// An instruction required a [`crate::value::Value`] of a specific variant and received
    /// another.
    #[error("pc {pc}: expected a {expected} value")]
    UnexpectedTypeConversion {
        /// The program counter at the point of failure.
        pc: u64,
        /// The variant that was expected.
        expected: &'static str,
    },

    /// A load was attempted from an unset memory slot, or a store to an out-of-range address.
    #[error("pc {pc}: invalid memory address")]
    InvalidMemoryAddress {
        /// The program counter at the point of failure.
        pc: u64,
    },

    /// Arithmetic was attempted between elements, shares, or values defined over different
    /// fields.
    #[error("pc {pc}: field mismatch")]
    FieldMismatch {
        /// The program counter at the point of failure.
        pc: u64,
    },

    /// `Add`/`Sub`/`Mul` was attempted on two private shares held at different indices.
    #[error("pc {pc}: share index mismatch")]
    ShareIndexMismatch {
        /// The program counter at the point of failure.
        pc: u64,
    },

    /// `Div` or `Inv` was attempted on the zero field element.
    #[error("pc {pc}: invalid divisor")]
    InvalidDivisor {
        /// The program counter at the point of failure.
        pc: u64,
    },

    /// An `Fp` was constructed from a modulus that failed the primality test.
    #[error("pc {pc}: non-prime modulus")]
    NonPrimeModulus {
        /// The program counter at the point of failure.
        pc: u64,
    },
}

impl ExecError {
    /// The program counter at which this error occurred.
    pub fn pc(&self) -> u64 {
        match self {
            ExecError::CodeOverflow { pc }
            | ExecError::UnexpectedInstruction { pc }
            | ExecError::UnexpectedTypeConversion { pc, .. }
            | ExecError::InvalidMemoryAddress { pc }
            | ExecError::FieldMismatch { pc }
            | ExecError::ShareIndexMismatch { pc }
            | ExecError::InvalidDivisor { pc }
            | ExecError::NonPrimeModulus { pc } => *pc,
        }
    }

    pub(crate) fn from_field(err: FieldError, pc: u64) -> Self {
        match err {
            FieldError::FieldMismatch => ExecError::FieldMismatch { pc },
            FieldError::InvalidDivisor => ExecError::InvalidDivisor { pc },
            FieldError::NonPrimeModulus => ExecError::NonPrimeModulus { pc },
            FieldError::OutOfRange => ExecError::UnexpectedTypeConversion { pc, expected: "in-range value" },
        }
    }

    pub(crate) fn from_shamir(err: ShamirError, pc: u64) -> Self {
        match err {
            ShamirError::FieldMismatch => ExecError::FieldMismatch { pc },
            ShamirError::IndexMismatch => ExecError::ShareIndexMismatch { pc },
            _ => ExecError::UnexpectedTypeConversion { pc, expected: "compatible shares" },
        }
    }

    pub(crate) fn from_memory(_err: MemoryError, pc: u64) -> Self {
        ExecError::InvalidMemoryAddress { pc }
    }
}
