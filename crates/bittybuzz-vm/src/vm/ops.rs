// SPDX-License-Identifier: MIT

//! Arithmetic, logic, comparison, table, and immediate-push opcode
//! handlers.

use super::Vm;
use crate::error::ErrorKind;
use crate::table;
use crate::types::StringId;
use crate::value::{self, Obj};
use core::cmp::Ordering;

fn pop_int(vm: &mut Vm) -> Result<i16, ErrorKind> {
    let idx = vm.pop()?;
    match *vm.obj(idx) {
        Obj::Int(v) => Ok(v),
        ref other => Err(ErrorKind::Type {
            expected: "integer",
            got: other.type_name(),
        }),
    }
}

/// Arithmetic opcode identity, used by [`arith`].
#[derive(Clone, Copy)]
pub(super) enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

/// `ADD/SUB/MUL/DIV/MOD/POW`: pop two integers, push the 16-bit-wrapping
/// result. `POW` uses repeated multiplication; a negative exponent yields
/// `INT16_MIN`.
pub(super) fn arith(vm: &mut Vm, which: ArithOp) -> Result<(), ErrorKind> {
    let b = pop_int(vm)?;
    let a = pop_int(vm)?;
    let result = match which {
        ArithOp::Add => a.wrapping_add(b),
        ArithOp::Sub => a.wrapping_sub(b),
        ArithOp::Mul => a.wrapping_mul(b),
        ArithOp::Div => {
            if b == 0 {
                return Err(ErrorKind::DivByZero);
            }
            a.wrapping_div(b)
        }
        ArithOp::Mod => {
            if b == 0 {
                return Err(ErrorKind::DivByZero);
            }
            a.wrapping_rem(b)
        }
        ArithOp::Pow => {
            if b < 0 {
                i16::MIN
            } else {
                let mut acc: i16 = 1;
                for _ in 0..b {
                    acc = acc.wrapping_mul(a);
                }
                acc
            }
        }
    };
    vm.push_int(result)
}

/// `UNM`: integer unary minus.
pub(super) fn unary_minus(vm: &mut Vm) -> Result<(), ErrorKind> {
    let a = pop_int(vm)?;
    vm.push_int(a.wrapping_neg())
}

fn truthy(vm: &Vm, idx: crate::types::HeapIndex) -> Result<bool, ErrorKind> {
    vm.obj(idx).is_truthy_int_or_nil().ok_or(ErrorKind::Type {
        expected: "integer or nil",
        got: vm.obj(idx).type_name(),
    })
}

/// Boolean-op identity for [`logic`].
#[derive(Clone, Copy)]
pub(super) enum LogicOp {
    And,
    Or,
}

/// `AND/OR`: truthiness-coerced boolean over `{int, nil}` operands.
pub(super) fn logic(vm: &mut Vm, which: LogicOp) -> Result<(), ErrorKind> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    let (ta, tb) = (truthy(vm, a)?, truthy(vm, b)?);
    let result = match which {
        LogicOp::And => ta && tb,
        LogicOp::Or => ta || tb,
    };
    vm.push_int(i16::from(result))
}

/// `NOT`: truthiness negation over `{int, nil}`.
pub(super) fn not(vm: &mut Vm) -> Result<(), ErrorKind> {
    let a = vm.pop()?;
    let t = truthy(vm, a)?;
    vm.push_int(i16::from(!t))
}

/// `EQ/NEQ/GT/GTE/LT/LTE`: compare via `cmp`, any type pair permitted.
pub(super) fn compare(vm: &mut Vm, accept: impl Fn(Ordering) -> bool) -> Result<(), ErrorKind> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    let ord = value::cmp(vm.obj(a), a, vm.obj(b), b);
    vm.push_int(i16::from(accept(ord)))
}

/// `GLOAD`: `str -> val`, pushing nil if the global is unset.
pub(super) fn gload(vm: &mut Vm) -> Result<(), ErrorKind> {
    let key = vm.pop()?;
    match table::get(&vm.heap, vm.gsyms, key) {
        Some(v) => vm.push(v),
        None => vm.push_nil(),
    }
}

/// `GSTORE`: `val str ->`, storing into the global symbol table.
pub(super) fn gstore(vm: &mut Vm) -> Result<(), ErrorKind> {
    let key = vm.pop()?;
    let value = vm.pop()?;
    let nil = vm.nil;
    table::set(&mut vm.heap, vm.gsyms, key, value, nil)
}

/// `PUSHT`: push a fresh empty table.
pub(super) fn pusht(vm: &mut Vm) -> Result<(), ErrorKind> {
    let t = table::new_table(&mut vm.heap)?;
    vm.push(t)
}

/// `TPUT`: `t k v ->`. If `v` is a closure, bind `t` as `self` into a
/// cloned closure (method binding) before storing; otherwise a plain
/// `table::set`.
pub(super) fn tput(vm: &mut Vm) -> Result<(), ErrorKind> {
    let value = vm.pop()?;
    let key = vm.pop()?;
    let table = vm.pop()?;
    let bound = super::call::bind_method(vm, table, value)?;
    let nil = vm.nil;
    table::set(&mut vm.heap, table, key, bound, nil)
}

/// `TGET`: `t k -> v-or-nil`.
pub(super) fn tget(vm: &mut Vm) -> Result<(), ErrorKind> {
    let key = vm.pop()?;
    let table = vm.pop()?;
    match table::get(&vm.heap, table, key) {
        Some(v) => vm.push(v),
        None => vm.push_nil(),
    }
}

/// `PUSHF imm`: push an opaque half-float with the immediate's low 16 bits.
pub(super) fn pushf(vm: &mut Vm, operand: u32) -> Result<(), ErrorKind> {
    #[expect(clippy::cast_possible_truncation, reason = "half-float payload is 16 bits")]
    let bits = operand as u16;
    vm.push_float(bits)
}

/// `PUSHI imm`: push an integer from the immediate's low 16 bits.
pub(super) fn pushi(vm: &mut Vm, operand: u32) -> Result<(), ErrorKind> {
    #[expect(clippy::cast_possible_truncation, reason = "integer payload is 16 bits")]
    let v = operand as u16 as i16;
    vm.push_int(v)
}

/// `PUSHS imm`: push an interned-string reference by id.
pub(super) fn pushs(vm: &mut Vm, operand: u32) -> Result<(), ErrorKind> {
    #[expect(clippy::cast_possible_truncation, reason = "string ids are 16 bits")]
    let id = operand as u16;
    vm.push_string(StringId::new(id))
}

/// `LLOAD imm`: push the local symbol at `imm`.
pub(super) fn lload(vm: &mut Vm, operand: u32) -> Result<(), ErrorKind> {
    #[expect(clippy::cast_possible_truncation, reason = "local indices fit in usize on every supported target")]
    let i = operand as usize;
    let lsyms = vm.lsyms;
    let value = crate::array::get(&vm.heap, lsyms, i).unwrap_or(vm.nil);
    vm.push(value)
}

/// `LSTORE imm`: pop a value and store it at local index `imm`, growing
/// the local-symbol array with nils if needed.
pub(super) fn lstore(vm: &mut Vm, operand: u32) -> Result<(), ErrorKind> {
    #[expect(clippy::cast_possible_truncation, reason = "local indices fit in usize on every supported target")]
    let i = operand as usize;
    let value = vm.pop()?;
    let lsyms = vm.lsyms;
    let nil = vm.nil;
    crate::array::set(&mut vm.heap, lsyms, i, value, nil)
}

/// `JUMPZ imm`: pop; jump to `imm` if int-zero or nil, else fall through
/// past this instruction.
pub(super) fn jumpz(vm: &mut Vm, target: u32, len: u32) -> Result<(), ErrorKind> {
    let v = vm.pop()?;
    let zero = match *vm.obj(v) {
        Obj::Nil => true,
        Obj::Int(i) => i == 0,
        ref other => {
            return Err(ErrorKind::Type {
                expected: "integer or nil",
                got: other.type_name(),
            });
        }
    };
    vm.pc = if zero { target } else { vm.pc + len };
    Ok(())
}

/// `JUMPNZ imm`: pop; jump to `imm` if int-nonzero, else fall through
/// (nil falls through).
pub(super) fn jumpnz(vm: &mut Vm, target: u32, len: u32) -> Result<(), ErrorKind> {
    let v = vm.pop()?;
    let nonzero = match *vm.obj(v) {
        Obj::Nil => false,
        Obj::Int(i) => i != 0,
        ref other => {
            return Err(ErrorKind::Type {
                expected: "integer or nil",
                got: other.type_name(),
            });
        }
    };
    vm.pc = if nonzero { target } else { vm.pc + len };
    Ok(())
}
