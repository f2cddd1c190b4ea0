//! The secure multi-party computation virtual machine core: a single-threaded instruction
//! dispatch engine over [`field`] and [`shamir_sharing`] values, suspending at asynchronous
//! instructions via one-shot channels and resuming on redelivery.
//!
//! [`Process`] owns a program's code and memory and drives it one [`Process::exec`] call at a
//! time; each call returns either a suspension (an [`Intent`] the protocol layer must service),
//! termination, or a stall while already-raised intents remain outstanding.

mod config;
mod errors;
mod instructions;
mod intent;
mod macros;
mod memory;
mod metrics;
mod pending;
mod process;
mod value;

pub use config::VmConfig;
pub use errors::ExecError;
pub use instructions::{DebugHook, Instruction};
pub use intent::{Intent, IntentId};
pub use macros::{
    bit_decomposition, bitwise_and, bitwise_not, bitwise_or, bitwise_xor, carry_lookahead_adder, expand, less_than,
    less_than_zero, modulo_2m, propagate_generate, random_bit, truncate, MacroBuilder,
};
pub use memory::{Address, Memory, MemoryError};
pub use metrics::ExecutionMetrics;
pub use process::{Process, ProcessBuildError, Return};
pub use value::Value;
