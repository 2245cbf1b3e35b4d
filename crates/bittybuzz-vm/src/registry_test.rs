// SPDX-License-Identifier: MIT

use super::*;
use crate::value::Obj;
use crate::vm::Vm;

fn echo_argument(vm: &mut Vm) -> Result<HeapIndex, ErrorKind> {
    array::get(&vm.heap, vm.lsyms, 0).ok_or(ErrorKind::Ret)
}

fn other_fn(vm: &mut Vm) -> Result<HeapIndex, ErrorKind> {
    let _ = vm;
    Ok(HeapIndex::new(0))
}

#[test]
fn register_assigns_sequential_ids() {
    let mut vm = Vm::new(0);
    let a = register(&mut vm, echo_argument).unwrap();
    let b = register(&mut vm, other_fn).unwrap();
    assert_eq!(a, 0);
    assert_eq!(b, 1);
}

#[test]
fn registering_the_same_function_twice_returns_the_same_id() {
    let mut vm = Vm::new(0);
    let a = register(&mut vm, echo_argument).unwrap();
    let b = register(&mut vm, echo_argument).unwrap();
    assert_eq!(a, b);
}

#[test]
fn registration_binds_a_native_closure_global_under_the_string_id() {
    let mut vm = Vm::new(0);
    let id = register(&mut vm, echo_argument).unwrap();
    let key = vm.heap.alloc_obj(Obj::String(crate::types::StringId::new(id))).unwrap();
    let bound = crate::table::get(&vm.heap, vm.gsyms, key).unwrap();
    assert!(matches!(vm.heap.obj(bound), Obj::NativeClosure(_)));
}

#[test]
fn call_invokes_the_registered_function() {
    let mut vm = Vm::new(0);
    let id = register(&mut vm, echo_argument).unwrap();

    let arg = vm.heap.alloc_obj(Obj::Int(123)).unwrap();
    let args_array = array::new_array(&mut vm.heap).unwrap();
    let nil = vm.nil;
    array::push(&mut vm.heap, args_array, arg, nil).unwrap();
    vm.lsyms = args_array;

    let result = call(&mut vm, id).unwrap();
    assert_eq!(result, arg);
}

#[test]
fn call_with_unregistered_reference_is_a_flist_error() {
    let mut vm = Vm::new(0);
    assert_eq!(call(&mut vm, 7), Err(ErrorKind::Flist));
}
