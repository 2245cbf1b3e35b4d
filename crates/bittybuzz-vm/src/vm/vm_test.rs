// SPDX-License-Identifier: MIT

use super::*;
use crate::bytecode::op;
use crate::value::Obj;

fn int_obj(vm: &Vm, idx: HeapIndex) -> i16 {
    match *vm.obj(idx) {
        Obj::Int(v) => v,
        ref other => panic!("expected Int, got {other:?}"),
    }
}

#[test]
fn new_vm_starts_in_no_code_state() {
    let vm = Vm::new(0);
    assert_eq!(vm.state(), State::NoCode);
    assert_eq!(vm.pc(), 0);
}

/// `Int(-21244)` then `Int(8384)`, one opcode at a time against a fresh
/// copy of the operands.
#[test]
fn arithmetic_scenario_matches_literal_expected_results() {
    let cases: &[(u8, i16)] = &[
        (op::ADD, -12860),
        (op::SUB, -29628),
        (op::MUL, 17152),
        (op::DIV, -2),
        (op::MOD, -4476),
        (op::AND, 1),
        (op::OR, 1),
        (op::EQ, 0),
        (op::NEQ, 1),
        (op::GT, 0),
        (op::GTE, 0),
        (op::LT, 1),
        (op::LTE, 1),
    ];
    for &(opcode, expected) in cases {
        let image: &[u8] = &[opcode];
        let mut vm = Vm::new(0);
        vm.state = State::Ready;
        vm.push_int(-21244).unwrap();
        vm.push_int(8384).unwrap();
        vm.step(&image).unwrap();
        let top = vm.top().unwrap();
        assert_eq!(int_obj(&vm, top), expected, "opcode {opcode} produced the wrong result");
    }
}

// Every jump target below is 5 (right after the 5-byte jump instruction)
// with a `NOP` planted there, since `step` re-validates `pc` immediately
// after a jump and would otherwise fault on a target with no instruction.

#[test]
fn jumpz_jumps_on_nil() {
    let image: &[u8] = &[op::JUMPZ, 5, 0, 0, 0, op::NOP];
    let mut vm = Vm::new(0);
    vm.state = State::Ready;
    vm.push_nil().unwrap();
    vm.step(&image).unwrap();
    assert_eq!(vm.pc(), 5);
}

#[test]
fn jumpz_falls_through_on_nonzero_int() {
    let image: &[u8] = &[op::JUMPZ, 5, 0, 0, 0, op::NOP];
    let mut vm = Vm::new(0);
    vm.state = State::Ready;
    vm.push_int(-1).unwrap();
    let sp_before = vm.sp;
    vm.step(&image).unwrap();
    assert_eq!(vm.pc(), 5);
    assert_eq!(vm.sp, sp_before - 1);
}

#[test]
fn jumpnz_falls_through_on_nil() {
    let image: &[u8] = &[op::JUMPNZ, 5, 0, 0, 0, op::NOP];
    let mut vm = Vm::new(0);
    vm.state = State::Ready;
    vm.push_nil().unwrap();
    let sp_before = vm.sp;
    vm.step(&image).unwrap();
    assert_eq!(vm.pc(), 5);
    assert_eq!(vm.sp, sp_before - 1);
}

#[test]
fn pow_with_negative_exponent_yields_int16_min() {
    let image: &[u8] = &[op::POW];
    let mut vm = Vm::new(0);
    vm.state = State::Ready;
    vm.push_int(2).unwrap();
    vm.push_int(-1).unwrap();
    vm.step(&image).unwrap();
    let top = vm.top().unwrap();
    assert_eq!(int_obj(&vm, top), i16::MIN);
}

#[test]
fn done_is_sticky_and_does_not_advance_pc() {
    let image: &[u8] = &[op::DONE, op::NOP];
    let mut vm = Vm::new(0);
    vm.state = State::Ready;
    vm.step(&image).unwrap();
    assert_eq!(vm.state(), State::Done);
    assert_eq!(vm.pc(), 0);
}

#[test]
fn unknown_opcode_faults_with_pc_rewound() {
    // 45 is past JUMPNZ (40) but still `>= PUSHF`, so it decodes as an
    // operand-carrying instruction before dispatch rejects it as unknown.
    let image: &[u8] = &[45, 0, 0, 0, 0];
    let mut vm = Vm::new(0);
    vm.state = State::Ready;
    let err = vm.step(&image).unwrap_err();
    assert_eq!(err, ErrorKind::Instr(45));
    assert_eq!(vm.state(), State::Error);
    assert_eq!(vm.pc(), 0);
}

#[test]
fn push_and_table_roundtrip() {
    // PUSHT; DUP (TPUT consumes the table); PUSHI k; PUSHI v; TPUT; PUSHI k; TGET.
    let image: &[u8] = &[
        op::PUSHT,
        op::DUP,
        op::PUSHI,
        7,
        0,
        0,
        0,
        op::PUSHI,
        42,
        0,
        0,
        0,
        op::TPUT,
        op::PUSHI,
        7,
        0,
        0,
        0,
        op::TGET,
        op::DONE,
    ];
    let mut vm = Vm::new(0);
    vm.state = State::Ready;
    vm.execute(&image).unwrap();
    let top = vm.top().unwrap();
    assert_eq!(int_obj(&vm, top), 42);
}

#[test]
fn stack_overflow_raises_stack_error() {
    let mut vm = Vm::new(0);
    vm.state = State::Ready;
    for _ in 0..STACK_CAP {
        if vm.push_int(1).is_err() {
            break;
        }
    }
    assert_eq!(vm.push_int(1), Err(ErrorKind::Stack));
}

#[test]
fn native_call_scenario() {
    fn double(vm: &mut Vm) -> Result<HeapIndex, ErrorKind> {
        // index 0 is the default activation record's reserved slot; the
        // single argument lands at index 1.
        let arg = crate::array::get(&vm.heap, vm.lsyms, 1).expect("argc checked by caller");
        let v = match *vm.obj(arg) {
            Obj::Int(v) => v,
            _ => unreachable!("test fixture always passes an int"),
        };
        vm.heap.alloc_obj(Obj::Int(v * 2)).ok_or(ErrorKind::OutOfMemory)
    }

    let mut vm = Vm::new(0);
    let id = crate::registry::register(&mut vm, double).unwrap();
    vm.state = State::Ready;

    let closure = vm
        .heap
        .alloc_obj(Obj::NativeClosure(crate::value::ClosureData {
            reference: id,
            actrec: crate::types::NO_ACTREC,
        }))
        .unwrap();
    vm.push(closure).unwrap();
    vm.push_int(21).unwrap();
    vm.push_int(1).unwrap(); // argc

    let image: &[u8] = &[op::CALLC, op::NOP];
    vm.step(&image).unwrap();

    let top = vm.top().unwrap();
    assert_eq!(int_obj(&vm, top), 42);
}
