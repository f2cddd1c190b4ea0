//! The `Process`: owns a program's code, memory, and program counter, and drives execution one
//! dispatch pass at a time via [`Process::exec`].

use crate::{
    config::VmConfig,
    errors::ExecError,
    instructions::Instruction,
    intent::{Intent, IntentId},
    memory::{Address, Memory},
    metrics::ExecutionMetrics,
    pending::{MulOpenPoll, PendingState},
    value::Value,
};
use log::{debug, trace};
use shamir_sharing::Share;
use std::collections::HashMap;
use tokio::sync::oneshot;

/// What one call to [`Process::exec`] reports back to the caller.
#[derive(Debug)]
pub enum Return {
    /// Internal signal only; an exhaustive match target for [`StepOutcome`] plumbing. Never
    /// returned across the `Process::exec` boundary.
    Ready,

    /// The process suspended. `Some(intent)` carries newly-raised work the protocol layer must
    /// service; `None` means the process is still waiting on intents it already raised on a prior
    /// call and has nothing further to ask for right now.
    NotReady(Option<Intent>),

    /// The program ran to completion. Always an [`Intent::Exit`], reporting the values named by
    /// the terminating `Exit` instruction.
    Terminated(Intent),
}

/// A single-threaded MPC virtual machine instance.
///
/// A `Process` is not reentrant: [`Process::exec`] must run to a suspension point or termination
/// before being called again, and the caller is expected to deliver exactly one result per
/// outstanding intent (by its [`IntentId`]) before the next call.
pub struct Process {
    id: [u8; 32],
    memory: Memory,
    code: Vec<Instruction>,
    pc: u64,
    pending: HashMap<u64, PendingState>,
    config: VmConfig,
    metrics: ExecutionMetrics,
}

/// An error constructing a [`Process`] whose memory or instruction batch sizes exceed its
/// [`VmConfig`] bounds.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ProcessBuildError {
    /// The requested memory capacity exceeds `config.max_memory`.
    #[error("requested memory capacity {requested} exceeds the configured maximum {max}")]
    MemoryTooLarge {
        /// The requested capacity.
        requested: usize,
        /// The configured maximum.
        max: usize,
    },

    /// An instruction's batch count exceeds `config.max_batch`.
    #[error("instruction at pc {pc} requests batch {requested}, exceeding the configured maximum {max}")]
    BatchTooLarge {
        /// The program counter of the offending instruction.
        pc: u64,
        /// The requested batch count.
        requested: usize,
        /// The configured maximum.
        max: usize,
    },
}

/// The outcome of executing one non-structural instruction.
enum StepOutcome {
    /// Ran to completion; advance past it.
    Advance,
    /// First visit to an asynchronous instruction: a fresh intent was raised.
    Suspend(Intent),
    /// A previously-raised intent for this instruction has not yet been delivered.
    Stall,
    /// An `Exit` instruction was reached.
    Terminate(Vec<Value>),
}

impl Process {
    /// Constructs a process over `code`, macro-expanding it once up front, and a memory of the
    /// given capacity, under the default [`VmConfig`].
    pub fn new(id: [u8; 32], code: Vec<Instruction>, memory_capacity: usize) -> Result<Self, ProcessBuildError> {
        Self::with_config(id, code, memory_capacity, VmConfig::default())
    }

    /// Same as [`Process::new`] but under an explicit [`VmConfig`].
    pub fn with_config(
        id: [u8; 32],
        code: Vec<Instruction>,
        memory_capacity: usize,
        config: VmConfig,
    ) -> Result<Self, ProcessBuildError> {
        if memory_capacity > config.max_memory {
            return Err(ProcessBuildError::MemoryTooLarge { requested: memory_capacity, max: config.max_memory });
        }
        let code = crate::macros::expand(code);
        for (pc, instruction) in code.iter().enumerate() {
            if let Some(batch) = instruction.batch() {
                if batch > config.max_batch {
                    return Err(ProcessBuildError::BatchTooLarge {
                        pc: pc as u64,
                        requested: batch,
                        max: config.max_batch,
                    });
                }
            }
        }
        debug!("constructed process with {} instructions, memory capacity {memory_capacity}", code.len());
        Ok(Self {
            id,
            memory: Memory::new(memory_capacity),
            code,
            pc: 0,
            pending: HashMap::new(),
            config,
            metrics: ExecutionMetrics::default(),
        })
    }

    /// A fresh, randomly generated process identifier, built from two concatenated UUIDv4s to
    /// fill the 32-byte id space (the correlator in [`IntentId`] needs more entropy than a single
    /// 128-bit UUID provides).
    pub fn random_id() -> [u8; 32] {
        let mut id = [0u8; 32];
        id[..16].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
        id[16..].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
        id
    }

    /// A read-only view of this process's memory, e.g. for inspecting output after termination.
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// The program counter of the next instruction to execute.
    pub fn pc(&self) -> u64 {
        self.pc
    }

    /// The configured bounds this process was constructed under.
    pub fn config(&self) -> VmConfig {
        self.config
    }

    /// Counters of work done so far by this process.
    pub fn metrics(&self) -> ExecutionMetrics {
        self.metrics
    }

    fn intent_id(&self, pc: u64) -> IntentId {
        IntentId::new(self.id, pc)
    }

    /// Runs the dispatch loop until the process suspends, errors, or terminates.
    ///
    /// Synchronous instructions never suspend, so the loop only returns control between an
    /// asynchronous instruction's phases or at a terminator.
    pub fn exec(&mut self) -> Return {
        loop {
            let pc = self.pc;
            if pc as usize >= self.code.len() {
                return Return::NotReady(Some(Intent::Error {
                    iid: self.intent_id(pc),
                    error: ExecError::CodeOverflow { pc },
                }));
            }

            if matches!(self.code[pc as usize], Instruction::Async) {
                debug!("entering async block at pc {pc}");
                match self.run_async_block(pc) {
                    Ok(BlockOutcome::Done(next_pc)) => {
                        self.pc = next_pc;
                        continue;
                    }
                    Ok(BlockOutcome::Suspend(intent)) => {
                        self.metrics.record_suspension();
                        self.metrics.record_intent();
                        return Return::NotReady(Some(intent));
                    }
                    Ok(BlockOutcome::Terminate(exit_pc, values)) => {
                        return Return::Terminated(Intent::Exit { iid: self.intent_id(exit_pc), values })
                    }
                    Err(error) => return Return::NotReady(Some(Intent::Error { iid: self.intent_id(pc), error })),
                }
            }

            let instruction = self.code[pc as usize].clone();
            trace!("dispatching {} at pc {pc}", instruction.name());
            match self.step_one(pc, &instruction) {
                Ok(StepOutcome::Advance) => {
                    self.metrics.record_instruction();
                    self.pc = pc + 1;
                }
                Ok(StepOutcome::Suspend(intent)) => {
                    self.metrics.record_suspension();
                    self.metrics.record_intent();
                    return Return::NotReady(Some(intent));
                }
                Ok(StepOutcome::Stall) => return Return::NotReady(None),
                Ok(StepOutcome::Terminate(values)) => {
                    self.metrics.record_instruction();
                    return Return::Terminated(Intent::Exit { iid: self.intent_id(pc), values });
                }
                Err(error) => return Return::NotReady(Some(Intent::Error { iid: self.intent_id(pc), error })),
            }
        }
    }

    /// Finds the `Await` matching the `Async` at `async_pc`, tracking nested `Async`/`Await`
    /// pairs so an inner block's markers don't prematurely close the outer one.
    fn matching_await(&self, async_pc: u64) -> Result<u64, ExecError> {
        let mut depth = 0u32;
        let mut cursor = async_pc + 1;
        while (cursor as usize) < self.code.len() {
            match &self.code[cursor as usize] {
                Instruction::Async => depth += 1,
                Instruction::Await if depth == 0 => return Ok(cursor),
                Instruction::Await => depth -= 1,
                _ => {}
            }
            cursor += 1;
        }
        Err(ExecError::CodeOverflow { pc: async_pc })
    }

    /// Executes one pass over an `Async`/`Await` block: every instruction in the
    /// block is visited once this call, applying whatever has resolved and raising fresh intents
    /// for whatever hasn't. If anything remains outstanding, the block aggregates every freshly
    /// raised intent into one [`Intent::Await`] and the PC rewinds to the `Async` marker so the
    /// next call replays the block from the top, short-circuiting through already-applied
    /// instructions via their cached [`PendingState`].
    fn run_async_block(&mut self, async_pc: u64) -> Result<BlockOutcome, ExecError> {
        let end_pc = self.matching_await(async_pc)?;
        let mut outstanding = Vec::new();
        let mut fully_resolved = true;
        let mut cursor = async_pc + 1;

        while cursor < end_pc {
            if matches!(&self.code[cursor as usize], Instruction::Async | Instruction::Await) {
                cursor += 1;
                continue;
            }
            let instruction = self.code[cursor as usize].clone();
            trace!("dispatching {} at pc {cursor} (async block at {async_pc})", instruction.name());
            match self.step_one(cursor, &instruction)? {
                StepOutcome::Advance => {
                    self.metrics.record_instruction();
                }
                StepOutcome::Suspend(intent) => {
                    self.metrics.record_suspension();
                    outstanding.push(intent);
                    fully_resolved = false;
                }
                StepOutcome::Stall => fully_resolved = false,
                StepOutcome::Terminate(values) => return Ok(BlockOutcome::Terminate(cursor, values)),
            }
            cursor += 1;
        }

        if fully_resolved {
            debug!("async block at pc {async_pc} fully resolved");
            Ok(BlockOutcome::Done(end_pc + 1))
        } else if outstanding.is_empty() {
            // Nothing new this pass; every still-open instruction was already raised on a prior
            // visit. Nothing further to ask for, but the block isn't done.
            Ok(BlockOutcome::Suspend(Intent::Await { iid: self.intent_id(async_pc), intents: Vec::new() }))
        } else {
            debug!("async block at pc {async_pc} aggregating {} fresh intent(s)", outstanding.len());
            self.metrics.record_intent();
            Ok(BlockOutcome::Suspend(Intent::Await { iid: self.intent_id(async_pc), intents: outstanding }))
        }
    }

    fn load(&self, address: Address, pc: u64) -> Result<Value, ExecError> {
        self.memory.load(address).map(Clone::clone).map_err(|e| ExecError::from_memory(e, pc))
    }

    fn store(&mut self, address: Address, value: Value, pc: u64) -> Result<(), ExecError> {
        self.memory.store(address, value).map_err(|e| ExecError::from_memory(e, pc))
    }

    fn step_one(&mut self, pc: u64, instruction: &Instruction) -> Result<StepOutcome, ExecError> {
        match instruction {
            Instruction::Move { dst, val } => {
                self.store(*dst, val.clone(), pc)?;
                Ok(StepOutcome::Advance)
            }
            Instruction::Copy { dst, src, step, n } => {
                let values: Vec<Value> =
                    (0..*n as u32).map(|i| self.load(src.plus(i * step), pc)).collect::<Result<_, _>>()?;
                self.memory.store_vector(*dst, values).map_err(|e| ExecError::from_memory(e, pc))?;
                Ok(StepOutcome::Advance)
            }
            Instruction::Add { dst, lhs, rhs } => {
                let result = self.load(*lhs, pc)?.checked_add(&self.load(*rhs, pc)?, pc)?;
                self.store(*dst, result, pc)?;
                Ok(StepOutcome::Advance)
            }
            Instruction::Sub { dst, lhs, rhs } => {
                let result = self.load(*lhs, pc)?.checked_sub(&self.load(*rhs, pc)?, pc)?;
                self.store(*dst, result, pc)?;
                Ok(StepOutcome::Advance)
            }
            Instruction::Neg { dst, lhs } => {
                let result = self.load(*lhs, pc)?.checked_neg(pc)?;
                self.store(*dst, result, pc)?;
                Ok(StepOutcome::Advance)
            }
            Instruction::Exp { dst, lhs, rhs } => {
                let base = self.load(*lhs, pc)?;
                let exponent = self.load(*rhs, pc)?;
                let result = base
                    .expect_public(pc)?
                    .checked_exp(exponent.expect_public(pc)?)
                    .map_err(|e| ExecError::from_field(e, pc))?;
                self.store(*dst, Value::Public(result), pc)?;
                Ok(StepOutcome::Advance)
            }
            Instruction::Inv { dst, lhs } => {
                let operand = self.load(*lhs, pc)?;
                let result = operand.expect_public(pc)?.inv().map_err(|e| ExecError::from_field(e, pc))?;
                self.store(*dst, Value::Public(result), pc)?;
                Ok(StepOutcome::Advance)
            }
            Instruction::Mod { dst, lhs, rhs } => {
                let dividend = self.load(*lhs, pc)?;
                let divisor = self.load(*rhs, pc)?;
                let dividend = dividend.expect_public(pc)?;
                let divisor = divisor.expect_public(pc)?;
                if divisor.is_zero() {
                    return Err(ExecError::InvalidDivisor { pc });
                }
                let remainder = dividend.value() % divisor.value();
                let modulus = dividend.modulus().clone();
                self.store(*dst, Value::Public(field::FpElement::from_reduced(remainder, modulus)), pc)?;
                Ok(StepOutcome::Advance)
            }
            Instruction::MulPub { dst, lhs, rhs } => {
                let result = self.load(*lhs, pc)?.checked_mul_pub(&self.load(*rhs, pc)?, pc)?;
                self.store(*dst, result, pc)?;
                Ok(StepOutcome::Advance)
            }
            Instruction::Debug { hook } => {
                (hook.as_ref())(&self.memory);
                Ok(StepOutcome::Advance)
            }
            Instruction::Exit { srcs } => {
                let values: Vec<Value> = srcs.iter().map(|a| self.load(*a, pc)).collect::<Result<_, _>>()?;
                Ok(StepOutcome::Terminate(values))
            }

            Instruction::GenerateRn { dst, b } => self.step_generate_rn(pc, *dst, *b, false),
            Instruction::GenerateRnZero { dst, b } => self.step_generate_rn(pc, *dst, *b, true),
            Instruction::GenerateRnTuple { dst, b } => self.step_generate_rn_tuple(pc, *dst, *b),
            Instruction::Mul { dst, lhs, rhs, rns, b } => self.step_mul(pc, *dst, *lhs, *rhs, *rns, *b),
            Instruction::MulOpen { dst, lhs, rhs } => self.step_mul_open(pc, *dst, *lhs, *rhs),
            Instruction::Open { dst, src } => self.step_open(pc, *dst, *src),

            Instruction::Macro { .. } => Err(ExecError::UnexpectedInstruction { pc }),
            Instruction::Async | Instruction::Await => Err(ExecError::UnexpectedInstruction { pc }),
        }
    }

    fn step_generate_rn(&mut self, pc: u64, dst: Address, b: usize, zero: bool) -> Result<StepOutcome, ExecError> {
        match self.pending.get_mut(&pc) {
            None => {
                let (reply, rx) = oneshot::channel();
                self.pending.insert(pc, PendingState::shares(rx));
                let iid = self.intent_id(pc);
                let intent =
                    if zero { Intent::GenRnZero { iid, batch: b, reply } } else { Intent::GenRn { iid, batch: b, reply } };
                Ok(StepOutcome::Suspend(intent))
            }
            Some(state) => match state.poll_shares() {
                None => Ok(StepOutcome::Stall),
                Some(shares) => {
                    let shares = shares.clone();
                    self.memory.store_vector(dst, shares.into_iter().map(Value::Private)).map_err(|e| ExecError::from_memory(e, pc))?;
                    self.pending.remove(&pc);
                    Ok(StepOutcome::Advance)
                }
            },
        }
    }

    fn step_generate_rn_tuple(&mut self, pc: u64, dst: Address, b: usize) -> Result<StepOutcome, ExecError> {
        match self.pending.get_mut(&pc) {
            None => {
                let (rhos_tx, rhos_rx) = oneshot::channel();
                let (sigmas_tx, sigmas_rx) = oneshot::channel();
                self.pending.insert(pc, PendingState::tuple(rhos_rx, sigmas_rx));
                let iid = self.intent_id(pc);
                Ok(StepOutcome::Suspend(Intent::GenRnTuple { iid, batch: b, rhos: rhos_tx, sigmas: sigmas_tx }))
            }
            Some(state) => match state.poll_tuple() {
                None => Ok(StepOutcome::Stall),
                Some((rhos, sigmas)) => {
                    let pairs: Vec<Value> = rhos
                        .iter()
                        .zip(sigmas.iter())
                        .map(|(rho, sigma)| Value::PrivateRn(rho.clone(), sigma.clone()))
                        .collect();
                    self.memory.store_vector(dst, pairs).map_err(|e| ExecError::from_memory(e, pc))?;
                    self.pending.remove(&pc);
                    Ok(StepOutcome::Advance)
                }
            },
        }
    }

    fn step_mul(
        &mut self,
        pc: u64,
        dst: Address,
        lhs: Address,
        rhs: Address,
        rns: Address,
        b: usize,
    ) -> Result<StepOutcome, ExecError> {
        match self.pending.get_mut(&pc) {
            None => {
                let xs = self.shares_vector(lhs, b, pc)?;
                let ys = self.shares_vector(rhs, b, pc)?;
                let (rhos, sigmas) = self.rn_tuples_vector(rns, b, pc)?;
                let (reply, rx) = oneshot::channel();
                self.pending.insert(pc, PendingState::product(rx));
                let iid = self.intent_id(pc);
                Ok(StepOutcome::Suspend(Intent::Multiply { iid, xs, ys, rhos, sigmas, reply }))
            }
            Some(state) => match state.poll_product() {
                None => Ok(StepOutcome::Stall),
                Some(products) => {
                    let products = products.clone();
                    self.memory.store_vector(dst, products.into_iter().map(Value::Private)).map_err(|e| ExecError::from_memory(e, pc))?;
                    self.pending.remove(&pc);
                    Ok(StepOutcome::Advance)
                }
            },
        }
    }

    fn step_open(&mut self, pc: u64, dst: Address, src: Address) -> Result<StepOutcome, ExecError> {
        match self.pending.get_mut(&pc) {
            None => {
                let share = self.load(src, pc)?.expect_private(pc)?.clone();
                let (reply, rx) = oneshot::channel();
                self.pending.insert(pc, PendingState::opened(rx));
                let iid = self.intent_id(pc);
                Ok(StepOutcome::Suspend(Intent::Open { iid, share, reply }))
            }
            Some(state) => match state.poll_opened() {
                None => Ok(StepOutcome::Stall),
                Some(value) => {
                    self.store(dst, Value::Public(value.clone()), pc)?;
                    self.pending.remove(&pc);
                    Ok(StepOutcome::Advance)
                }
            },
        }
    }

    /// `MulOpen` has no dedicated intent of its own; its pending state sequences a `Multiply`
    /// wait followed by an `Open` wait, raising each leg's intent only once the previous leg has
    /// delivered (see
    /// [`crate::pending::MulOpenSlot`]). The `Multiply` leg carries empty `rhos`/`sigmas`: unlike
    /// `Mul`, `MulOpen` has no `rns` operand, so the protocol layer supplies its own random tuple
    /// for this one product rather than consuming a caller-provided one.
    fn step_mul_open(&mut self, pc: u64, dst: Address, lhs: Address, rhs: Address) -> Result<StepOutcome, ExecError> {
        if !self.pending.contains_key(&pc) {
            let xs = self.shares_vector(lhs, 1, pc)?;
            let ys = self.shares_vector(rhs, 1, pc)?;
            let (reply, rx) = oneshot::channel();
            self.pending.insert(pc, PendingState::mul_open_awaiting_product(rx));
            let iid = self.intent_id(pc);
            return Ok(StepOutcome::Suspend(Intent::Multiply { iid, xs, ys, rhos: Vec::new(), sigmas: Vec::new(), reply }));
        }

        let state = self.pending.get_mut(&pc).expect("just checked present");
        match state.poll_mul_open() {
            MulOpenPoll::Stall => Ok(StepOutcome::Stall),
            MulOpenPoll::ProductReady(share) => {
                let (reply, rx) = oneshot::channel();
                state.set_mul_open_awaiting_open(rx);
                let iid = self.intent_id(pc);
                Ok(StepOutcome::Suspend(Intent::Open { iid, share, reply }))
            }
            MulOpenPoll::Done(value) => {
                let value = value.clone();
                self.store(dst, Value::Public(value), pc)?;
                self.pending.remove(&pc);
                Ok(StepOutcome::Advance)
            }
        }
    }

    fn shares_vector(&self, start: Address, n: usize, pc: u64) -> Result<Vec<Share>, ExecError> {
        (0..n as u32).map(|i| Ok(self.load(start.plus(i), pc)?.expect_private(pc)?.clone())).collect()
    }

    fn rn_tuples_vector(&self, start: Address, n: usize, pc: u64) -> Result<(Vec<Share>, Vec<Share>), ExecError> {
        let mut rhos = Vec::with_capacity(n);
        let mut sigmas = Vec::with_capacity(n);
        for i in 0..n as u32 {
            let (rho, sigma) = self.load(start.plus(i), pc)?.expect_private_rn(pc)?;
            rhos.push(rho.clone());
            sigmas.push(sigma.clone());
        }
        Ok((rhos, sigmas))
    }
}

enum BlockOutcome {
    Done(u64),
    Suspend(Intent),
    Terminate(u64, Vec<Value>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use field::Fp;
    use num_bigint::BigUint;

    fn public(field: &Fp, v: u32) -> Value {
        Value::Public(field.new_in_field(BigUint::from(v)))
    }

    #[test]
    fn pc_only_advances_across_synchronous_instructions() {
        let field = Fp::mersenne61();
        let code = vec![
            Instruction::Move { dst: Address::new(0), val: public(&field, 1) },
            Instruction::Move { dst: Address::new(1), val: public(&field, 2) },
            Instruction::Add { dst: Address::new(2), lhs: Address::new(0), rhs: Address::new(1) },
            Instruction::Exit { srcs: vec![Address::new(2)] },
        ];
        let mut process = Process::new([7u8; 32], code, 3).unwrap();
        assert_eq!(process.pc(), 0);
        match process.exec() {
            Return::Terminated(_) => {}
            other => panic!("expected termination, got {other:?}"),
        }
    }

    #[test]
    fn async_block_rewinds_then_lands_past_the_block_on_completion() {
        let field = Fp::mersenne61();
        let index = 1;
        let code = vec![
            Instruction::Move {
                dst: Address::new(0),
                val: Value::Private(Share::new(index, field.new_in_field(BigUint::from(2u32))).unwrap()),
            },
            Instruction::Async,
            Instruction::Open { dst: Address::new(1), src: Address::new(0) },
            Instruction::Await,
            Instruction::Exit { srcs: vec![Address::new(1)] },
        ];
        let mut process = Process::new([1u8; 32], code, 2).unwrap();

        // First call: Move advances pc to the Async marker (pc 1), then the block's Open
        // instruction raises a fresh intent and the pc rewinds to the Async marker.
        let Return::NotReady(Some(Intent::Await { intents, .. })) = process.exec() else {
            panic!("expected an aggregated Await intent")
        };
        assert_eq!(intents.len(), 1);
        assert_eq!(process.pc(), 1, "pc rewinds to the Async marker while the block is outstanding");

        let Intent::Open { reply, .. } = intents.into_iter().next().unwrap() else {
            panic!("expected an Open intent inside the block")
        };
        reply.send(field.new_in_field(BigUint::from(2u32))).unwrap();

        match process.exec() {
            Return::Terminated(Intent::Exit { values, .. }) => assert_eq!(values, vec![public(&field, 2)]),
            other => panic!("expected termination, got {other:?}"),
        }
        assert_eq!(process.pc(), 4, "pc lands at start (1) + block length (3) once resolved");
    }

    #[test]
    fn same_id_and_pc_always_yield_the_same_intent_id() {
        let a = Process::new([3u8; 32], vec![Instruction::Exit { srcs: vec![] }], 1).unwrap();
        let b = Process::new([3u8; 32], vec![Instruction::Exit { srcs: vec![] }], 1).unwrap();
        assert_eq!(a.intent_id(0), b.intent_id(0));
        assert_ne!(a.intent_id(0), a.intent_id(1));
    }
}
