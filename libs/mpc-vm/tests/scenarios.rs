//! End-to-end suspend/resume scenarios driving a [`Process`] through its full lifecycle: the
//! asynchronous instructions are serviced here by hand rather than by a real protocol layer, since
//! this crate's contract is the suspend/resume/intent protocol itself, not the cryptography a real
//! multi-party run would perform.

use field::{Fp, FpElement};
use mpc_vm::{Address, ExecError, Instruction, Intent, MacroBuilder, Process, Return, Value};
use num_bigint::BigUint;
use shamir_sharing::Share;

fn public(field: &Fp, v: u64) -> Value {
    Value::Public(field.new_in_field(BigUint::from(v)))
}

fn private(field: &Fp, index: u64, v: u64) -> Value {
    Value::Private(Share::new(index, field.new_in_field(BigUint::from(v))).unwrap())
}

fn element(field: &Fp, v: u64) -> FpElement {
    field.new_in_field(BigUint::from(v))
}

#[test]
fn s1_public_add_terminates_in_one_call() {
    let field = Fp::mersenne61();
    let code = vec![
        Instruction::Move { dst: Address::new(0), val: public(&field, 3) },
        Instruction::Move { dst: Address::new(1), val: public(&field, 4) },
        Instruction::Add { dst: Address::new(2), lhs: Address::new(0), rhs: Address::new(1) },
        Instruction::Exit { srcs: vec![Address::new(2)] },
    ];
    let mut process = Process::new(Process::random_id(), code, 3).unwrap();
    match process.exec() {
        Return::Terminated(Intent::Exit { values, .. }) => assert_eq!(values, vec![public(&field, 7)]),
        other => panic!("expected Terminated, got {other:?}"),
    }
}

#[test]
fn s2_private_add_then_open() {
    let field = Fp::mersenne61();
    let index = 2;
    let code = vec![
        Instruction::Move { dst: Address::new(0), val: private(&field, index, 5) },
        Instruction::Move { dst: Address::new(1), val: private(&field, index, 9) },
        Instruction::Add { dst: Address::new(2), lhs: Address::new(0), rhs: Address::new(1) },
        Instruction::Open { dst: Address::new(3), src: Address::new(2) },
        Instruction::Exit { srcs: vec![Address::new(3)] },
    ];
    let mut process = Process::new(Process::random_id(), code, 4).unwrap();

    let Return::NotReady(Some(Intent::Open { reply, .. })) = process.exec() else {
        panic!("expected an Open intent after the Add")
    };
    reply.send(element(&field, 14)).unwrap();

    match process.exec() {
        Return::Terminated(Intent::Exit { values, .. }) => assert_eq!(values, vec![public(&field, 14)]),
        other => panic!("expected Terminated, got {other:?}"),
    }
}

#[test]
fn s3_multiplication_then_open() {
    let field = Fp::mersenne61();
    let index = 1;
    let code = vec![
        Instruction::Move { dst: Address::new(0), val: private(&field, index, 6) },
        Instruction::Move { dst: Address::new(1), val: private(&field, index, 7) },
        Instruction::Move {
            dst: Address::new(2),
            val: Value::PrivateRn(
                Share::new(index, element(&field, 11)).unwrap(),
                Share::new(index, element(&field, 22)).unwrap(),
            ),
        },
        Instruction::Mul { dst: Address::new(3), lhs: Address::new(0), rhs: Address::new(1), rns: Address::new(2), b: 1 },
        Instruction::Open { dst: Address::new(4), src: Address::new(3) },
        Instruction::Exit { srcs: vec![Address::new(4)] },
    ];
    let mut process = Process::new(Process::random_id(), code, 5).unwrap();

    let Return::NotReady(Some(Intent::Multiply { reply, xs, ys, .. })) = process.exec() else {
        panic!("expected a Multiply intent")
    };
    assert_eq!(xs.len(), 1);
    assert_eq!(ys.len(), 1);
    reply.send(vec![Share::new(index, element(&field, 42)).unwrap()]).unwrap();

    let Return::NotReady(Some(Intent::Open { reply, .. })) = process.exec() else {
        panic!("expected an Open intent after the Multiply")
    };
    reply.send(element(&field, 42)).unwrap();

    match process.exec() {
        Return::Terminated(Intent::Exit { values, .. }) => assert_eq!(values, vec![public(&field, 42)]),
        other => panic!("expected Terminated, got {other:?}"),
    }
}

#[test]
fn s4_batched_multiplication() {
    let field = Fp::mersenne61();
    let index = 3;
    let mut code = vec![Instruction::GenerateRnTuple { dst: Address::new(100), b: 3 }];
    for (i, (x, y)) in [(2u64, 5u64), (3, 6), (4, 7)].into_iter().enumerate() {
        code.push(Instruction::Move { dst: Address::new(i as u32), val: private(&field, index, x) });
        code.push(Instruction::Move { dst: Address::new(10 + i as u32), val: private(&field, index, y) });
    }
    code.push(Instruction::Mul { dst: Address::new(20), lhs: Address::new(0), rhs: Address::new(10), rns: Address::new(100), b: 3 });
    code.push(Instruction::Exit { srcs: vec![Address::new(20), Address::new(21), Address::new(22)] });

    let mut process = Process::new(Process::random_id(), code, 103).unwrap();

    let Return::NotReady(Some(Intent::GenRnTuple { rhos, sigmas, batch, .. })) = process.exec() else {
        panic!("expected a GenRnTuple intent")
    };
    assert_eq!(batch, 3);
    rhos.send((0..3).map(|_| Share::new(index, element(&field, 1)).unwrap()).collect()).unwrap();
    sigmas.send((0..3).map(|_| Share::new(index, element(&field, 2)).unwrap()).collect()).unwrap();

    let Return::NotReady(Some(Intent::Multiply { reply, xs, ys, rhos, sigmas, .. })) = process.exec() else {
        panic!("expected a Multiply intent")
    };
    assert_eq!(xs.len(), 3);
    assert_eq!(ys.len(), 3);
    assert_eq!(rhos.len(), 3);
    assert_eq!(sigmas.len(), 3);
    let products = vec![10u64, 18, 28];
    reply.send(products.iter().map(|v| Share::new(index, element(&field, *v)).unwrap()).collect()).unwrap();

    match process.exec() {
        Return::Terminated(Intent::Exit { values, .. }) => {
            assert_eq!(values, products.iter().map(|v| private(&field, index, *v)).collect::<Vec<_>>())
        }
        other => panic!("expected Terminated, got {other:?}"),
    }
}

#[test]
fn s5_async_block_aggregates_two_multiplications() {
    let field = Fp::mersenne61();
    let index = 1;
    let code = vec![
        Instruction::Move { dst: Address::new(0), val: private(&field, index, 2) },
        Instruction::Move { dst: Address::new(1), val: private(&field, index, 3) },
        Instruction::Move { dst: Address::new(2), val: private(&field, index, 4) },
        Instruction::Move { dst: Address::new(3), val: private(&field, index, 5) },
        Instruction::Move {
            dst: Address::new(4),
            val: Value::PrivateRn(Share::new(index, element(&field, 1)).unwrap(), Share::new(index, element(&field, 2)).unwrap()),
        },
        Instruction::Async,
        Instruction::Mul { dst: Address::new(10), lhs: Address::new(0), rhs: Address::new(1), rns: Address::new(4), b: 1 },
        Instruction::Mul { dst: Address::new(11), lhs: Address::new(2), rhs: Address::new(3), rns: Address::new(4), b: 1 },
        Instruction::Await,
        Instruction::Exit { srcs: vec![Address::new(10), Address::new(11)] },
    ];
    let mut process = Process::new(Process::random_id(), code, 12).unwrap();

    let Return::NotReady(Some(Intent::Await { intents, .. })) = process.exec() else {
        panic!("expected an aggregated Await intent")
    };
    assert_eq!(intents.len(), 2);

    for intent in intents {
        let Intent::Multiply { reply, xs, .. } = intent else { panic!("expected Multiply intents inside the block") };
        assert_eq!(xs.len(), 1);
        reply.send(vec![Share::new(index, element(&field, 6)).unwrap()]).unwrap();
    }

    match process.exec() {
        Return::Terminated(Intent::Exit { values, .. }) => assert_eq!(values.len(), 2),
        other => panic!("expected the block to complete and the process to terminate, got {other:?}"),
    }
}

#[test]
fn s6_bad_type_does_not_advance_pc() {
    let field = Fp::mersenne61();
    let code = vec![
        Instruction::Move {
            dst: Address::new(0),
            val: Value::PrivateRn(Share::new(1, element(&field, 1)).unwrap(), Share::new(1, element(&field, 2)).unwrap()),
        },
        Instruction::Move { dst: Address::new(1), val: public(&field, 9) },
        Instruction::Neg { dst: Address::new(2), lhs: Address::new(0) },
    ];
    let mut process = Process::new(Process::random_id(), code, 3).unwrap();

    let Return::NotReady(Some(Intent::Error { error, .. })) = process.exec() else {
        panic!("expected a fatal Error intent")
    };
    assert!(matches!(error, ExecError::UnexpectedTypeConversion { pc: 2, .. }));
    assert_eq!(process.pc(), 2);
}

/// Services every intent a macro's expansion can raise with an honest (non-adversarial) reply,
/// computed directly from the share values involved rather than a real degree-reduction protocol —
/// matching the module's framing that the cryptographic protocol layer is out of scope here.
fn answer(intent: Intent, field: &Fp, index: u64) {
    match intent {
        Intent::GenRn { batch, reply, .. } => {
            let shares = (0..batch).map(|i| Share::new(index, element(field, i as u64 + 11)).unwrap()).collect();
            reply.send(shares).unwrap();
        }
        Intent::GenRnZero { batch, reply, .. } => {
            let shares = (0..batch).map(|_| Share::new(index, field.zero()).unwrap()).collect();
            reply.send(shares).unwrap();
        }
        Intent::GenRnTuple { batch, rhos, sigmas, .. } => {
            rhos.send((0..batch).map(|_| Share::new(index, element(field, 3)).unwrap()).collect()).unwrap();
            sigmas.send((0..batch).map(|_| Share::new(index, element(field, 5)).unwrap()).collect()).unwrap();
        }
        Intent::Multiply { xs, ys, reply, .. } => {
            let products = xs.iter().zip(ys.iter()).map(|(x, y)| x.checked_mul(y).unwrap()).collect();
            reply.send(products).unwrap();
        }
        Intent::Open { share, reply, .. } => reply.send(share.value().clone()).unwrap(),
        Intent::Await { intents, .. } => intents.into_iter().for_each(|i| answer(i, field, index)),
        Intent::Exit { .. } => unreachable!("Exit is terminal, not an intent to answer"),
        Intent::Error { error, .. } => panic!("macro expansion raised a fatal error: {error:?}"),
    }
}

/// Drives `process` to completion, answering every raised intent along the way, and returns the
/// values named by its `Exit`.
fn drive(process: &mut Process, field: &Fp, index: u64) -> Vec<Value> {
    loop {
        match process.exec() {
            Return::Terminated(Intent::Exit { values, .. }) => return values,
            Return::NotReady(Some(intent)) => answer(intent, field, index),
            other => panic!("unexpected return while driving macro expansion: {other:?}"),
        }
    }
}

fn opened_bits_to_integer(values: &[Value]) -> u64 {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| match v {
            Value::Public(e) => {
                let bit: u64 = if e.is_zero() { 0 } else { 1 };
                bit << i
            }
            other => panic!("expected an opened public bit, got {other:?}"),
        })
        .sum()
}

#[test]
fn bit_decomposition_recovers_a_known_private_value() {
    let field = Fp::mersenne61();
    let index = 2;
    let n = 5;
    let src = Address::new(0);
    let bits = Address::new(50);

    let mut builder = MacroBuilder::new(&field, 200);
    mpc_vm::bit_decomposition(&mut builder, bits, src, n);
    let (body, _next_scratch) = builder.finish();

    let mut code = vec![
        Instruction::Move { dst: src, val: private(&field, index, 13) },
        Instruction::Macro { body },
    ];
    let open_dsts: Vec<Address> = (0..n as u32).map(|i| Address::new(100 + i)).collect();
    for (i, dst) in open_dsts.iter().enumerate() {
        code.push(Instruction::Open { dst: *dst, src: bits.plus(i as u32) });
    }
    code.push(Instruction::Exit { srcs: open_dsts.clone() });

    let mut process = Process::new(Process::random_id(), code, 300).unwrap();
    let values = drive(&mut process, &field, index);

    assert_eq!(opened_bits_to_integer(&values), 13);
}

#[test]
fn carry_lookahead_adder_sums_two_known_private_numbers() {
    let field = Fp::mersenne61();
    let index = 4;
    let n = 4;
    let a_bits = Address::new(0);
    let b_bits = Address::new(10);
    let sum = Address::new(50);

    // 5 (0b0101, LSB first) and 3 (0b0011, LSB first); sum is 8, which needs the adder's carry-out
    // bit (position n) to represent correctly.
    let a_values = [1u64, 0, 1, 0];
    let b_values = [1u64, 1, 0, 0];

    let mut builder = MacroBuilder::new(&field, 200);
    mpc_vm::carry_lookahead_adder(&mut builder, sum, a_bits, b_bits, n);
    let (body, _next_scratch) = builder.finish();

    let mut code = Vec::new();
    for (i, v) in a_values.iter().enumerate() {
        code.push(Instruction::Move { dst: a_bits.plus(i as u32), val: private(&field, index, *v) });
    }
    for (i, v) in b_values.iter().enumerate() {
        code.push(Instruction::Move { dst: b_bits.plus(i as u32), val: private(&field, index, *v) });
    }
    code.push(Instruction::Macro { body });
    let open_dsts: Vec<Address> = (0..(n + 1) as u32).map(|i| Address::new(100 + i)).collect();
    for (i, dst) in open_dsts.iter().enumerate() {
        code.push(Instruction::Open { dst: *dst, src: sum.plus(i as u32) });
    }
    code.push(Instruction::Exit { srcs: open_dsts.clone() });

    let mut process = Process::new(Process::random_id(), code, 300).unwrap();
    let values = drive(&mut process, &field, index);

    assert_eq!(opened_bits_to_integer(&values), 8);
}
