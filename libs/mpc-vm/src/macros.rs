//! Compile-time macro expansion.
//!
//! A macro is a Rust function that pushes a fixed sequence of primitive instructions onto a
//! [`MacroBuilder`], rather than a node kept around in the executable instruction stream. The
//! [`Instruction::Macro`] variant exists only as a splice point for callers that already hold a
//! prebuilt instruction sequence; [`expand`] walks the stream and inlines those bodies until none
//! remain.

use crate::{instructions::Instruction, memory::Address, value::Value};
use field::Fp;
use num_bigint::BigUint;

/// Replaces every [`Instruction::Macro`] node in `code` with its body, recursively, until none
/// remain.
pub fn expand(code: Vec<Instruction>) -> Vec<Instruction> {
    let mut pending = code;
    loop {
        let mut changed = false;
        let mut next = Vec::with_capacity(pending.len());
        for instruction in pending {
            match instruction {
                Instruction::Macro { body } => {
                    changed = true;
                    next.extend(body);
                }
                other => next.push(other),
            }
        }
        pending = next;
        if !changed {
            return pending;
        }
    }
}

/// Accumulates the primitive instructions emitted by a macro expander, handing out fresh scratch
/// addresses from a bump allocator seeded past the caller's live memory.
pub struct MacroBuilder<'a> {
    field: &'a Fp,
    body: Vec<Instruction>,
    next_scratch: u32,
}

impl<'a> MacroBuilder<'a> {
    /// Starts a builder whose scratch addresses begin at `scratch_base` (the caller is
    /// responsible for ensuring this lies past every address its program otherwise uses).
    pub fn new(field: &'a Fp, scratch_base: u32) -> Self {
        Self { field, body: Vec::new(), next_scratch: scratch_base }
    }

    /// Allocates one fresh scratch address.
    pub fn alloc(&mut self) -> Address {
        let address = Address::new(self.next_scratch);
        self.next_scratch += 1;
        address
    }

    /// Allocates `n` fresh contiguous scratch addresses, returning the first.
    pub fn alloc_range(&mut self, n: usize) -> Address {
        let address = Address::new(self.next_scratch);
        self.next_scratch += n as u32;
        address
    }

    fn push(&mut self, instruction: Instruction) {
        self.body.push(instruction);
    }

    fn push_constant(&mut self, value: BigUint) -> Address {
        let address = self.alloc();
        self.push(Instruction::Move { dst: address, val: Value::Public(self.field.new_in_field(value)) });
        address
    }

    /// Consumes the builder, returning its emitted instructions and the next free scratch
    /// address (so a caller chaining several macros can continue the allocator).
    pub fn finish(self) -> (Vec<Instruction>, u32) {
        (self.body, self.next_scratch)
    }
}

/// Shared-bit NOT: `not(x) = 1 - x`.
pub fn bitwise_not(b: &mut MacroBuilder, dst: Address, src: Address) {
    let one = b.push_constant(BigUint::from(1u32));
    b.push(Instruction::Sub { dst, lhs: one, rhs: src });
}

/// Shared-bit AND: `and(x, y) = x * y`, the one bitwise gate that needs a genuine private
/// multiplication.
pub fn bitwise_and(b: &mut MacroBuilder, dst: Address, x: Address, y: Address) {
    let rns = b.alloc();
    b.push(Instruction::GenerateRnTuple { dst: rns, b: 1 });
    b.push(Instruction::Mul { dst, lhs: x, rhs: y, rns, b: 1 });
}

/// Shared-bit OR: `or(x, y) = x + y - x*y`.
pub fn bitwise_or(b: &mut MacroBuilder, dst: Address, x: Address, y: Address) {
    let and = b.alloc();
    bitwise_and(b, and, x, y);
    let sum = b.alloc();
    b.push(Instruction::Add { dst: sum, lhs: x, rhs: y });
    b.push(Instruction::Sub { dst, lhs: sum, rhs: and });
}

/// Shared-bit XOR: `xor(x, y) = x + y - 2*x*y`.
pub fn bitwise_xor(b: &mut MacroBuilder, dst: Address, x: Address, y: Address) {
    let and = b.alloc();
    bitwise_and(b, and, x, y);
    let two = b.push_constant(BigUint::from(2u32));
    let two_and = b.alloc();
    b.push(Instruction::MulPub { dst: two_and, lhs: two, rhs: and });
    let sum = b.alloc();
    b.push(Instruction::Add { dst: sum, lhs: x, rhs: y });
    b.push(Instruction::Sub { dst, lhs: sum, rhs: two_and });
}

/// Propagate/generate gates for one bit position of a carry adder: `p = a xor b`, `g = a and b`.
pub fn propagate_generate(b: &mut MacroBuilder, p_dst: Address, g_dst: Address, a: Address, bit: Address) {
    bitwise_xor(b, p_dst, a, bit);
    bitwise_and(b, g_dst, a, bit);
}

/// Adds two `n`-bit numbers (LSB-first shared bits at `a`, `b`), writing an `(n+1)`-bit sum
/// (LSB-first, including the final carry-out) starting at `dst`.
///
/// Built from the sequential propagate/generate recurrence rather than a parallel-prefix tree:
/// the carry into bit `i+1` is computed from bit `i` before bit `i+1` starts, which is the
/// textbook ripple-carry form of a carry-lookahead adder's gates.
pub fn carry_lookahead_adder(b: &mut MacroBuilder, dst: Address, a: Address, bits: Address, n: usize) {
    let a_bits: Vec<Address> = (0..n as u32).map(|i| a.plus(i)).collect();
    let other_bits: Vec<Address> = (0..n as u32).map(|i| bits.plus(i)).collect();
    add_with_bits(b, dst, &a_bits, &other_bits, n, None);
}

/// Shared implementation for addition with an optional constant carry-in, reused by
/// [`carry_lookahead_adder`] (carry-in 0) and [`subtract_bits`] (carry-in 1, for two's-complement
/// subtraction).
///
/// `a` and `other` are indexed per-bit rather than addressed by stride, since callers may hold
/// their operand bits scattered across scratch space rather than in one contiguous run; `dst` is
/// always a fresh contiguous range the caller owns outright.
fn add_with_bits(b: &mut MacroBuilder, dst: Address, a: &[Address], other: &[Address], n: usize, carry_in_one: Option<()>) {
    let mut carry: Option<Address> = None;
    for i in 0..n {
        let p = b.alloc();
        let g = b.alloc();
        propagate_generate(b, p, g, a[i], other[i]);
        let sum_bit = dst.plus(i as u32);
        carry = match carry {
            None if carry_in_one.is_some() => {
                // carry-in is the constant 1: sum = p xor 1 = not(p); carry = g or (p and 1) = g or p.
                bitwise_not(b, sum_bit, p);
                let carry_out = b.alloc();
                bitwise_or(b, carry_out, g, p);
                Some(carry_out)
            }
            None => {
                b.push(Instruction::Copy { dst: sum_bit, src: p, step: 0, n: 1 });
                Some(g)
            }
            Some(c) => {
                bitwise_xor(b, sum_bit, p, c);
                let pc = b.alloc();
                bitwise_and(b, pc, p, c);
                let carry_out = b.alloc();
                bitwise_or(b, carry_out, g, pc);
                Some(carry_out)
            }
        };
    }
    if let Some(c) = carry {
        b.push(Instruction::Copy { dst: dst.plus(n as u32), src: c, step: 0, n: 1 });
    }
}

/// Computes `c_bits - r_bits` (both `n`-bit, LSB-first) as two's-complement addition
/// `c + not(r) + 1`, discarding the final carry beyond bit `n - 1`.
fn subtract_bits(b: &mut MacroBuilder, dst: Address, c_bits: &[Address], r_bits: &[Address], n: usize) {
    let not_r_base = b.alloc_range(n);
    let not_r: Vec<Address> = (0..n as u32)
        .map(|i| {
            let addr = not_r_base.plus(i);
            bitwise_not(b, addr, r_bits[i as usize]);
            addr
        })
        .collect();
    add_with_bits(b, dst, c_bits, &not_r, n, Some(()));
}

/// Samples one fresh shared random bit using the quadratic-residue trick: sample `r`, open `r^2`,
/// take the square root with the known sign bit via `r^2 ^ ((p+1)/4)` (assumes the field's modulus
/// is `3 mod 4`, the common case for MPC-sized primes), then `bit = (r / sqrt(r^2) + 1) / 2`.
pub fn random_bit(b: &mut MacroBuilder) -> Address {
    let r = b.alloc();
    b.push(Instruction::GenerateRn { dst: r, b: 1 });

    let rns = b.alloc();
    b.push(Instruction::GenerateRnTuple { dst: rns, b: 1 });
    let r_sq = b.alloc();
    b.push(Instruction::Mul { dst: r_sq, lhs: r, rhs: r, rns, b: 1 });
    let opened_sq = b.alloc();
    b.push(Instruction::Open { dst: opened_sq, src: r_sq });

    let modulus = b.field.modulus().as_ref().clone();
    let exponent = (modulus + BigUint::from(1u32)) / BigUint::from(4u32);
    let exponent_addr = b.push_constant(exponent);
    let sqrt_addr = b.alloc();
    b.push(Instruction::Exp { dst: sqrt_addr, lhs: opened_sq, rhs: exponent_addr });

    let inv_sqrt = b.alloc();
    b.push(Instruction::Inv { dst: inv_sqrt, lhs: sqrt_addr });
    let ratio = b.alloc();
    b.push(Instruction::MulPub { dst: ratio, lhs: r, rhs: inv_sqrt });

    let one = b.push_constant(BigUint::from(1u32));
    let shifted = b.alloc();
    b.push(Instruction::Add { dst: shifted, lhs: ratio, rhs: one });
    let half = b.field.new_in_field(BigUint::from(2u32)).inv().expect("2 is invertible in an odd-characteristic field");
    let half_addr = b.alloc();
    b.push(Instruction::Move { dst: half_addr, val: Value::Public(half) });
    let bit = b.alloc();
    b.push(Instruction::MulPub { dst: bit, lhs: shifted, rhs: half_addr });
    bit
}

fn power_of_two_inverse(b: &MacroBuilder, exponent: usize) -> field::FpElement {
    b.field
        .new_in_field(BigUint::from(1u32) << exponent)
        .inv()
        .expect("power of two is invertible in an odd-characteristic field")
}

/// Decomposes the private share at `src` (an integer in `[0, 2^n)`) into `n` shared bits
/// (LSB-first) starting at `dst`.
///
/// Masks `src` with a fresh private random `n`-bit value `R`, opens `src + R`, then recovers the
/// bits of `src` from the public sum's bits and `R`'s bits via two's-complement subtraction. This
/// omits the statistical security margin a production protocol adds to `R`'s bit length to hide
/// the mod-`p` wraparound; it is exact whenever `src + R < p`.
pub fn bit_decomposition(b: &mut MacroBuilder, dst: Address, src: Address, n: usize) {
    let r_bits: Vec<Address> = (0..n).map(|_| random_bit(b)).collect();

    let mut r_value: Option<Address> = None;
    for (i, &bit) in r_bits.iter().enumerate() {
        let weight = b.push_constant(BigUint::from(1u32) << i);
        let term = b.alloc();
        b.push(Instruction::MulPub { dst: term, lhs: bit, rhs: weight });
        r_value = Some(match r_value {
            None => term,
            Some(acc) => {
                let sum = b.alloc();
                b.push(Instruction::Add { dst: sum, lhs: acc, rhs: term });
                sum
            }
        });
    }
    let r_value = r_value.expect("bit_decomposition requires n > 0");

    let masked = b.alloc();
    b.push(Instruction::Add { dst: masked, lhs: src, rhs: r_value });
    let opened = b.alloc();
    b.push(Instruction::Open { dst: opened, src: masked });

    let c_bits: Vec<Address> = (0..n)
        .map(|i| {
            let bit = b.alloc();
            extract_public_bit(b, bit, opened, i);
            bit
        })
        .collect();

    subtract_bits(b, dst, &c_bits, &r_bits, n);
}

/// Extracts bit `i` of the integer represented by the public value at `src`:
/// `bit = (src mod 2^(i+1) - src mod 2^i) / 2^i`, computed entirely with public instructions.
fn extract_public_bit(b: &mut MacroBuilder, dst: Address, src: Address, i: usize) {
    let hi_modulus = b.push_constant(BigUint::from(1u32) << (i + 1));
    let hi = b.alloc();
    b.push(Instruction::Mod { dst: hi, lhs: src, rhs: hi_modulus });

    let lo_modulus = b.push_constant(BigUint::from(1u32) << i);
    let lo = b.alloc();
    b.push(Instruction::Mod { dst: lo, lhs: src, rhs: lo_modulus });

    let diff = b.alloc();
    b.push(Instruction::Sub { dst: diff, lhs: hi, rhs: lo });

    let inv = power_of_two_inverse(b, i);
    let inv_addr = b.alloc();
    b.push(Instruction::Move { dst: inv_addr, val: Value::Public(inv) });
    b.push(Instruction::MulPub { dst, lhs: diff, rhs: inv_addr });
}

/// Computes `src mod 2^m` for an `n`-bit private value.
pub fn modulo_2m(b: &mut MacroBuilder, dst: Address, src: Address, n: usize, m: usize) {
    let bits = b.alloc_range(n);
    bit_decomposition(b, bits, src, n);

    let mut acc: Option<Address> = None;
    for i in 0..m {
        let bit = bits.plus(i as u32);
        let weight = b.push_constant(BigUint::from(1u32) << i);
        let term = b.alloc();
        b.push(Instruction::MulPub { dst: term, lhs: bit, rhs: weight });
        acc = Some(match acc {
            None => term,
            Some(a) => {
                let sum = b.alloc();
                b.push(Instruction::Add { dst: sum, lhs: a, rhs: term });
                sum
            }
        });
    }
    match acc {
        Some(last) => b.push(Instruction::Copy { dst, src: last, step: 0, n: 1 }),
        None => b.push(Instruction::Move { dst, val: Value::Public(b.field.zero()) }),
    }
}

/// Computes `src >> m` (integer right shift) for an `n`-bit private value: removes the low `m`
/// bits and divides by the public constant `2^m`.
pub fn truncate(b: &mut MacroBuilder, dst: Address, src: Address, n: usize, m: usize) {
    let low = b.alloc();
    modulo_2m(b, low, src, n, m);
    let diff = b.alloc();
    b.push(Instruction::Sub { dst: diff, lhs: src, rhs: low });
    let inv = power_of_two_inverse(b, m);
    let inv_addr = b.alloc();
    b.push(Instruction::Move { dst: inv_addr, val: Value::Public(inv) });
    b.push(Instruction::MulPub { dst, lhs: diff, rhs: inv_addr });
}

/// Tests whether the `n`-bit signed private value at `src` (represented in `(-2^(n-1), 2^(n-1)]`)
/// is negative, by shifting into the unsigned range and inspecting the most significant bit.
pub fn less_than_zero(b: &mut MacroBuilder, dst: Address, src: Address, n: usize) {
    let shift = b.push_constant(BigUint::from(1u32) << (n - 1));
    let shifted = b.alloc();
    b.push(Instruction::Add { dst: shifted, lhs: src, rhs: shift });
    let bits = b.alloc_range(n);
    bit_decomposition(b, bits, shifted, n);
    let msb = bits.plus((n - 1) as u32);
    bitwise_not(b, dst, msb);
}

/// Tests whether `a < b` for `n`-bit signed private values, via `less_than_zero(a - b)`.
pub fn less_than(b: &mut MacroBuilder, dst: Address, a: Address, rhs: Address, n: usize) {
    let diff = b.alloc();
    b.push(Instruction::Sub { dst: diff, lhs: a, rhs });
    less_than_zero(b, dst, diff, n);
}
