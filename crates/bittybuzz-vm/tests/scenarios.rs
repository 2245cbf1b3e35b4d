// SPDX-License-Identifier: MIT

//! End-to-end bytecode scenarios exercised through the public crate API
//! only (`Vm::new`/`set_bytecode`/`step`/`execute`/`push_nil`/`pop_value`),
//! mirroring the literal walkthroughs described for the arithmetic, jump,
//! loader, and native-call cases.

use bittybuzz_vm::bytecode::op;
use bittybuzz_vm::value::Obj;
use bittybuzz_vm::{State, Vm};

fn op_u32(opcode: u8, operand: u32) -> Vec<u8> {
    let mut bytes = vec![opcode];
    bytes.extend_from_slice(&operand.to_le_bytes());
    bytes
}

fn empty_prelude_image(mut program: Vec<u8>) -> Vec<u8> {
    let mut image = vec![0, 0, op::NOP];
    image.append(&mut program);
    image
}

#[test]
fn arithmetic_scenario_end_to_end() {
    let mut program = Vec::new();
    program.extend(op_u32(op::PUSHI, (-21244i16) as u16 as u32));
    program.extend(op_u32(op::PUSHI, 8384i16 as u16 as u32));
    program.push(op::ADD);
    program.push(op::DONE);
    let image = empty_prelude_image(program);

    let mut vm = Vm::new(0);
    vm.set_bytecode(&image.as_slice()).unwrap();
    vm.execute(&image.as_slice()).unwrap();
    assert_eq!(vm.state(), State::Done);

    let result = vm.pop_value().unwrap();
    assert!(matches!(vm.heap().obj(result), Obj::Int(-12860)));
}

#[test]
fn jumpz_scenario_skips_the_dead_branch_on_nil() {
    // PUSHNIL; JUMPZ live; PUSHI 999 (dead branch); live: PUSHI 7; DONE
    let mut program = Vec::new();
    program.push(op::PUSHNIL);
    let jumpz_at = program.len();
    program.extend(op_u32(op::JUMPZ, 0)); // patched below
    let dead_branch_at = program.len();
    program.extend(op_u32(op::PUSHI, 999));
    let live_branch_at = program.len();
    program.extend(op_u32(op::PUSHI, 7));
    program.push(op::DONE);

    let prelude_len = 3; // [count_lo, count_hi, NOP]
    #[expect(clippy::cast_possible_truncation, reason = "test fixture, program is tiny")]
    let target = (prelude_len + live_branch_at) as u32;
    let patched = op_u32(op::JUMPZ, target);
    program[jumpz_at..jumpz_at + patched.len()].copy_from_slice(&patched);
    let _ = dead_branch_at;

    let image = empty_prelude_image(program);
    let mut vm = Vm::new(0);
    vm.set_bytecode(&image.as_slice()).unwrap();
    vm.execute(&image.as_slice()).unwrap();
    assert_eq!(vm.state(), State::Done);

    let result = vm.pop_value().unwrap();
    assert!(matches!(vm.heap().obj(result), Obj::Int(7)));
}

#[test]
fn loader_interns_strings_as_lookup_table_entries() {
    let mut image = Vec::new();
    let names = ["a", "b", "c", "d", "e"];
    #[expect(clippy::cast_possible_truncation, reason = "test fixture, names.len() is tiny")]
    image.extend_from_slice(&(names.len() as u16).to_le_bytes());
    for name in names {
        image.extend_from_slice(name.as_bytes());
        image.push(0);
    }
    image.push(op::NOP);
    image.extend(op_u32(op::PUSHS, 2));
    image.push(op::GLOAD);
    image.push(op::DONE);

    let mut vm = Vm::new(0);
    vm.set_bytecode(&image.as_slice()).unwrap();
    vm.execute(&image.as_slice()).unwrap();
    assert_eq!(vm.state(), State::Done);

    let result = vm.pop_value().unwrap();
    assert!(matches!(vm.heap().obj(result), Obj::Int(2)));
}

#[test]
fn native_call_scenario_registers_and_invokes_print_int_val() {
    use bittybuzz_vm::ErrorKind;
    use bittybuzz_vm::types::HeapIndex;

    fn print_int_val(vm: &mut Vm) -> Result<HeapIndex, ErrorKind> {
        Ok(vm.arg(1))
    }

    let mut vm = Vm::new(0);
    let id = bittybuzz_vm::registry::register(&mut vm, print_int_val).unwrap();
    assert_eq!(id, 0);

    let mut program = Vec::new();
    program.extend(op_u32(op::PUSHCN, u32::from(id)));
    program.extend(op_u32(op::PUSHI, 123));
    program.extend(op_u32(op::PUSHI, 1));
    program.push(op::CALLC);
    program.push(op::DONE);
    let image = empty_prelude_image(program);

    vm.set_bytecode(&image.as_slice()).unwrap();
    vm.execute(&image.as_slice()).unwrap();
    assert_eq!(vm.state(), State::Done);

    let result = vm.pop_value().unwrap();
    assert!(matches!(vm.heap().obj(result), Obj::Int(123)));
}
