// SPDX-License-Identifier: MIT

//! Calling convention: `CALLC`/`CALLS`, `RET0`/`RET1`, closure pushes, and
//! method binding.

use super::Vm;
use crate::array;
use crate::error::ErrorKind;
use crate::table;
use crate::types::{HeapIndex, NO_ACTREC};
use crate::value::{ClosureData, Obj};

/// `CALLC`/`CALLS`: pop the argument count, locate the closure `argc`
/// slots below it, build a new local-symbol array, and either invoke a
/// native function synchronously or lay down a bytecode call frame.
pub(super) fn call(vm: &mut Vm, swarm: bool, instr_len: u32) -> Result<(), ErrorKind> {
    let argc_idx = vm.pop()?;
    let argc = match *vm.obj(argc_idx) {
        Obj::Int(v) if v >= 0 => v as usize,
        ref other => {
            return Err(ErrorKind::Type {
                expected: "integer",
                got: other.type_name(),
            });
        }
    };
    let closure_pos = vm.sp - argc as i32;
    if closure_pos < 0 {
        return Err(ErrorKind::Stack);
    }
    let closure_idx = vm.stack[closure_pos as usize];

    let mut args = [HeapIndex::default(); super::STACK_CAP];
    for (i, slot) in args.iter_mut().enumerate().take(argc) {
        *slot = vm.stack[closure_pos as usize + 1 + i];
    }
    vm.sp = closure_pos - 1;

    match *vm.obj(closure_idx) {
        Obj::NativeClosure(c) => {
            let result = call_native(vm, c, &args[..argc])?;
            vm.push(result)?;
            vm.pc += instr_len;
            Ok(())
        }
        Obj::Closure(c) => {
            let return_pc = vm.pc + instr_len;
            enter_closure(vm, c, &args[..argc], swarm, return_pc)
        }
        ref other => Err(ErrorKind::Type {
            expected: "closure",
            got: other.type_name(),
        }),
    }
}

/// Build a fresh local-symbol array seeded with `args` over `c`'s captured
/// activation record, run it through the registry synchronously, and
/// return the result without pushing it — shared by [`call`] and
/// [`invoke`].
fn call_native(vm: &mut Vm, c: ClosureData, args: &[HeapIndex]) -> Result<HeapIndex, ErrorKind> {
    let base = if c.actrec == NO_ACTREC { vm.dflt_actrec } else { c.actrec };
    let new_lsyms = array::lambda_alloc(&mut vm.heap, base)?;
    let nil = vm.nil;
    for &a in args {
        array::push(&mut vm.heap, new_lsyms, a, nil)?;
    }
    let caller_lsyms = vm.lsyms;
    vm.lsyms = new_lsyms;
    let result = crate::registry::call(vm, c.reference)?;
    vm.lsyms = caller_lsyms;
    Ok(result)
}

/// Lay down a scripted-closure call frame: a fresh local-symbol array
/// seeded with `args`, a saved `(return_pc, bp)` marker pair, and a jump to
/// the closure's entry point — shared by [`call`] and [`invoke`].
fn enter_closure(
    vm: &mut Vm,
    c: ClosureData,
    args: &[HeapIndex],
    swarm: bool,
    return_pc: u32,
) -> Result<(), ErrorKind> {
    let base = if c.actrec == NO_ACTREC { vm.dflt_actrec } else { c.actrec };
    let new_lsyms = array::lambda_alloc(&mut vm.heap, base)?;
    let nil = vm.nil;
    for &a in args {
        array::push(&mut vm.heap, new_lsyms, a, nil)?;
    }
    array::mark_swarm(&mut vm.heap, new_lsyms, swarm);
    array::push(&mut vm.heap, vm.lsymts, new_lsyms, nil)?;

    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        reason = "bytecode images stay under 32KiB on the targeted MCUs"
    )]
    let pc_obj = vm
        .heap
        .alloc_obj(Obj::Int(return_pc as i16))
        .ok_or(ErrorKind::OutOfMemory)?;
    vm.push(pc_obj)?;
    #[expect(clippy::cast_possible_truncation, reason = "bp fits STACK_CAP, far under i16::MAX")]
    let bp_obj = vm.heap.alloc_obj(Obj::Int(vm.bp as i16)).ok_or(ErrorKind::OutOfMemory)?;
    vm.push(bp_obj)?;

    vm.bp = vm.sp;
    vm.lsyms = new_lsyms;
    vm.pc = u32::from(c.reference);
    Ok(())
}

/// Invoke `closure_idx` from the host rather than from a `CALLC`/`CALLS`
/// instruction: a native closure runs to completion immediately and its
/// result is pushed; a scripted closure gets a call frame whose return
/// address is the VM's current `pc`, so when the frame unwinds execution
/// simply stops advancing rather than falling into whatever instruction
/// happens to sit there.
pub(super) fn invoke(vm: &mut Vm, closure_idx: HeapIndex, args: &[HeapIndex]) -> Result<(), ErrorKind> {
    match *vm.obj(closure_idx) {
        Obj::NativeClosure(c) => {
            let result = call_native(vm, c, args)?;
            vm.push(result)
        }
        Obj::Closure(c) => {
            let return_pc = vm.pc;
            enter_closure(vm, c, args, false, return_pc)
        }
        ref other => Err(ErrorKind::Type {
            expected: "closure",
            got: other.type_name(),
        }),
    }
}

/// `RET0`/`RET1`: tear down the current frame, restoring `bp`, `pc`, and
/// the caller's local-symbol array; `RET1` re-pushes the value that was on
/// top of the operand stack as the call's result.
pub(super) fn ret(vm: &mut Vm, has_value: bool) -> Result<(), ErrorKind> {
    let retval = if has_value { Some(vm.pop()?) } else { None };

    if vm.bp < 0 {
        return Err(ErrorKind::Ret);
    }
    let bp_idx = vm.pop_unchecked()?;
    let pc_idx = vm.pop_unchecked()?;
    let saved_bp = match *vm.obj(bp_idx) {
        Obj::Int(v) => v,
        _ => return Err(ErrorKind::Ret),
    };
    let saved_pc = match *vm.obj(pc_idx) {
        Obj::Int(v) => v,
        _ => return Err(ErrorKind::Ret),
    };

    // The hook point for popping a swarm stack, left for the (out-of-scope)
    // swarm subsystem to implement. The flag itself is preserved through
    // clone by `array::clone_array`.
    let _is_swarm_return = table::is_swarm(&vm.heap, vm.lsyms);

    array::pop(&mut vm.heap, vm.lsymts);
    vm.lsyms = array::last(&vm.heap, vm.lsymts).unwrap_or(vm.dflt_actrec);

    vm.bp = i32::from(saved_bp);
    vm.pc = u16::from_le_bytes(saved_pc.to_le_bytes()).into();

    if let Some(v) = retval {
        vm.push(v)?;
    }
    Ok(())
}

/// `PUSHCN imm`: push a native closure referencing `flist[imm]`.
pub(super) fn push_native_closure(vm: &mut Vm, operand: u32) -> Result<(), ErrorKind> {
    #[expect(clippy::cast_possible_truncation, reason = "function ids are 16 bits")]
    let reference = operand as u16;
    let idx = vm
        .heap
        .alloc_obj(Obj::NativeClosure(ClosureData {
            reference,
            actrec: NO_ACTREC,
        }))
        .ok_or(ErrorKind::OutOfMemory)?;
    vm.push(idx)
}

/// `PUSHCC imm`: push a scripted closure at bytecode address `imm`, using
/// the VM's default activation record.
pub(super) fn push_scripted_closure(vm: &mut Vm, operand: u32) -> Result<(), ErrorKind> {
    #[expect(clippy::cast_possible_truncation, reason = "bytecode addresses are 16 bits")]
    let reference = operand as u16;
    let idx = vm
        .heap
        .alloc_obj(Obj::Closure(ClosureData {
            reference,
            actrec: NO_ACTREC,
        }))
        .ok_or(ErrorKind::OutOfMemory)?;
    vm.push(idx)
}

/// `PUSHL imm`: push a scripted closure at bytecode address `imm`,
/// capturing the current local symbols by clone.
pub(super) fn push_lambda_closure(vm: &mut Vm, operand: u32) -> Result<(), ErrorKind> {
    #[expect(clippy::cast_possible_truncation, reason = "bytecode addresses are 16 bits")]
    let reference = operand as u16;
    let captured = array::lambda_alloc(&mut vm.heap, vm.lsyms)?;
    let idx = vm
        .heap
        .alloc_obj(Obj::Closure(ClosureData {
            reference,
            actrec: captured,
        }))
        .ok_or(ErrorKind::OutOfMemory)?;
    vm.push(idx)
}

/// Method binding on `TPUT`: if `value` is a closure, clone it with a new
/// activation record that prepends `table` as `self`, leaving the
/// original closure on the stack untouched. Non-closures pass through
/// unchanged.
pub(super) fn bind_method(vm: &mut Vm, table: HeapIndex, value: HeapIndex) -> Result<HeapIndex, ErrorKind> {
    let (reference, actrec, native) = match *vm.obj(value) {
        Obj::Closure(c) => (c.reference, c.actrec, false),
        Obj::NativeClosure(c) => (c.reference, c.actrec, true),
        _ => return Ok(value),
    };
    let nil = vm.nil;
    let base = if actrec == NO_ACTREC { vm.dflt_actrec } else { actrec };

    let new_actrec = array::new_array(&mut vm.heap)?;
    array::push(&mut vm.heap, new_actrec, table, nil)?;
    let n = array::size(&vm.heap, base);
    for i in 0..n {
        let v = array::get(&vm.heap, base, i).unwrap_or(nil);
        array::push(&mut vm.heap, new_actrec, v, nil)?;
    }

    let data = ClosureData {
        reference,
        actrec: new_actrec,
    };
    vm.heap
        .alloc_obj(if native { Obj::NativeClosure(data) } else { Obj::Closure(data) })
        .ok_or(ErrorKind::OutOfMemory)
}
