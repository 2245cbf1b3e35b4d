// SPDX-License-Identifier: MIT

//! Native-function registry: `flist` and the `CALLC`/`CALLS` dispatch path
//! for native closures.
//!
//! The C original stores `flist` entries as raw function pointers inside
//! `Userdata` heap slots and recovers them with a pointer cast. Rust gives
//! every heap slot a fixed, non-pointer-sized payload, and casting a
//! `usize` back into a `fn` pointer needs `unsafe`. Instead, each `flist`
//! entry's `Userdata` payload is an index into [`crate::vm::Vm`]'s
//! `native_fns` table, which actually holds the function pointers — no
//! transmute needed, at the cost of one extra indirection.

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use crate::array;
use crate::error::ErrorKind;
use crate::types::HeapIndex;
use crate::value::Obj;
use crate::vm::Vm;

/// A native function: receives the VM with `lsyms` already pointing at its
/// argument array, and returns the heap index of its result (the nil
/// singleton if it has none) — the Rust-side equivalent of consuming
/// arguments from the local-symbol array and returning via `RET0`/`RET1`.
pub type NativeFn = fn(&mut Vm) -> Result<HeapIndex, ErrorKind>;

/// Upper bound on distinct native functions a single VM can register.
pub const MAX_NATIVE_FNS: usize = 32;

/// Register `fp`, returning its stable id. Re-registering the same
/// function pointer searches `flist` and returns its existing id rather
/// than appending a duplicate. Also binds the *n*-th registered function
/// as the global with string id `n`.
///
/// # Errors
/// Returns [`ErrorKind::OutOfMemory`] if `flist` or the native-function
/// table is full, or if the global binding can't be allocated.
pub fn register(vm: &mut Vm, fp: NativeFn) -> Result<u16, ErrorKind> {
    for (i, slot) in vm.native_fns[..vm.native_count].iter().enumerate() {
        if slot.is_some_and(|existing| core::ptr::fn_addr_eq(existing, fp)) {
            #[expect(clippy::cast_possible_truncation, reason = "bounded by MAX_NATIVE_FNS")]
            return Ok(i as u16);
        }
    }
    if vm.native_count >= MAX_NATIVE_FNS {
        return Err(ErrorKind::OutOfMemory);
    }
    let id = vm.native_count;
    vm.native_fns[id] = Some(fp);
    vm.native_count += 1;

    let nil = vm.nil;
    let handle = vm.heap.alloc_obj(Obj::Userdata(id)).ok_or(ErrorKind::OutOfMemory)?;
    array::push(&mut vm.heap, vm.flist, handle, nil)?;

    #[expect(clippy::cast_possible_truncation, reason = "bounded by MAX_NATIVE_FNS")]
    let id_u16 = id as u16;
    let key = vm
        .heap
        .alloc_obj(Obj::String(crate::types::StringId::new(id_u16)))
        .ok_or(ErrorKind::OutOfMemory)?;
    let closure = vm
        .heap
        .alloc_obj(Obj::NativeClosure(crate::value::ClosureData {
            reference: id_u16,
            actrec: crate::types::NO_ACTREC,
        }))
        .ok_or(ErrorKind::OutOfMemory)?;
    crate::table::set(&mut vm.heap, vm.gsyms, key, closure, nil)?;

    Ok(id_u16)
}

/// Invoke the native function registered at `reference`.
///
/// # Errors
/// Returns [`ErrorKind::Flist`] if `reference` is out of range of the
/// registered functions, otherwise whatever the function itself returns.
pub fn call(vm: &mut Vm, reference: u16) -> Result<HeapIndex, ErrorKind> {
    let id = usize::from(reference);
    let fp = *vm.native_fns.get(id).ok_or(ErrorKind::Flist)?;
    let fp = fp.ok_or(ErrorKind::Flist)?;
    fp(vm)
}
