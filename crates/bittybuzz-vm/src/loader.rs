// SPDX-License-Identifier: MIT

//! Bytecode image loading: string-table parsing and prelude execution,
//! following the same string-table-then-prelude control flow a native
//! BittyBuzz host uses to hand a compiled script to the VM.

#[cfg(test)]
#[path = "loader_test.rs"]
mod loader_test;

use crate::bytecode::{self, BytecodeSource, op};
use crate::error::ErrorKind;
use crate::table;
use crate::value::Obj;
use crate::vm::{State, Vm};

/// Read the string-count header, intern each string into the global
/// symbol table as `(string -> int{id})`, then run the bytecode prelude
/// (every instruction up to and including the first `NOP`).
///
/// # Errors
/// Returns [`ErrorKind::Pc`] if the header or a string's byte span runs
/// past the end of `source`, or any error the prelude instructions
/// themselves raise.
pub fn load(vm: &mut Vm, source: &impl BytecodeSource) -> Result<(), ErrorKind> {
    load_strings(vm, source)?;
    vm.state = State::Ready;
    loop {
        let at_nop = bytecode::read_opcode(source, vm.pc)? == op::NOP;
        vm.step(source)?;
        if at_nop || vm.state != State::Ready {
            break;
        }
    }
    Ok(())
}

fn load_strings(vm: &mut Vm, source: &impl BytecodeSource) -> Result<(), ErrorKind> {
    let count_bytes = source.fetch(0, 2).ok_or(ErrorKind::Pc)?;
    let count = u16::from_le_bytes([count_bytes[0], count_bytes[1]]);
    let mut offset: u32 = 2;
    for id in 0..count {
        loop {
            let byte = source.fetch(offset, 1).ok_or(ErrorKind::Pc)?[0];
            offset += 1;
            if byte == 0 {
                break;
            }
        }
        let str_obj = vm
            .heap
            .alloc_obj(Obj::String(crate::types::StringId::new(id)))
            .ok_or(ErrorKind::OutOfMemory)?;
        #[expect(clippy::cast_possible_wrap, reason = "string ids fit i16 for any realistic prelude")]
        let id_obj = vm.heap.alloc_obj(Obj::Int(id as i16)).ok_or(ErrorKind::OutOfMemory)?;
        let nil = vm.nil;
        table::set(&mut vm.heap, vm.gsyms, str_obj, id_obj, nil)?;
    }
    vm.pc = offset;
    Ok(())
}
