// SPDX-License-Identifier: MIT

//! Dynamic arrays: tables whose keys are the contiguous non-negative
//! integers `0..size`. Backs activation records and the native-function
//! registry.


use crate::error::ErrorKind;
use crate::heap::Heap;
use crate::table;
use crate::types::HeapIndex;
use crate::value::Obj;

fn key_index(heap: &Heap, key: HeapIndex) -> Option<usize> {
    match *heap.obj(key) {
        Obj::Int(v) if v >= 0 => Some(v as usize),
        _ => None,
    }
}

fn locate(heap: &Heap, arr: HeapIndex, i: usize) -> Option<HeapIndex> {
    let mut seg = table::head(heap, arr);
    while !seg.is_none() {
        for cell in heap.seg_cells(seg) {
            if let Some(k) = cell.key() {
                if key_index(heap, k) == Some(i) {
                    return cell.value();
                }
            }
        }
        seg = heap.seg_next(seg);
    }
    None
}

/// Allocate a fresh, empty array.
///
/// # Errors
/// Returns [`ErrorKind::OutOfMemory`] if the object-slot region is full.
pub fn new_array(heap: &mut Heap) -> Result<HeapIndex, ErrorKind> {
    table::new_table(heap)
}

/// Number of elements: the highest present key plus one, relying on the
/// invariant that all lower keys are present.
#[must_use]
pub fn size(heap: &Heap, arr: HeapIndex) -> usize {
    let mut seg = table::head(heap, arr);
    let mut max_plus_one = 0usize;
    while !seg.is_none() {
        for cell in heap.seg_cells(seg) {
            if let Some(k) = cell.key() {
                if let Some(i) = key_index(heap, k) {
                    max_plus_one = max_plus_one.max(i + 1);
                }
            }
        }
        seg = heap.seg_next(seg);
    }
    max_plus_one
}

/// Element at index `i`, if `i < size(arr)`.
#[must_use]
pub fn get(heap: &Heap, arr: HeapIndex, i: usize) -> Option<HeapIndex> {
    locate(heap, arr, i)
}

/// The last element, or `None` if the array is empty.
#[must_use]
pub fn last(heap: &Heap, arr: HeapIndex) -> Option<HeapIndex> {
    let n = size(heap, arr);
    n.checked_sub(1).and_then(|i| get(heap, arr, i))
}

/// Whether the array has no elements.
#[must_use]
pub fn isempty(heap: &Heap, arr: HeapIndex) -> bool {
    size(heap, arr) == 0
}

/// Set `arr[i] = value`. If `i >= size(arr)`, the gap between the old size
/// and `i` is filled with nils first — this is how `LSTORE` grows local
/// symbols on demand.
///
/// # Errors
/// Returns [`ErrorKind::OutOfMemory`] if growth or overwrite needs a heap
/// allocation that the heap cannot satisfy.
pub fn set(heap: &mut Heap, arr: HeapIndex, i: usize, value: HeapIndex, nil: HeapIndex) -> Result<(), ErrorKind> {
    let current = size(heap, arr);
    for j in current..i {
        let key = heap.alloc_obj(Obj::Int(j as i16)).ok_or(ErrorKind::OutOfMemory)?;
        table::upsert(heap, arr, key, nil)?;
    }
    let key = heap.alloc_obj(Obj::Int(i as i16)).ok_or(ErrorKind::OutOfMemory)?;
    table::upsert(heap, arr, key, value)
}

/// Append `value` at index `size(arr)`.
///
/// # Errors
/// Returns [`ErrorKind::OutOfMemory`] if the heap cannot satisfy the
/// allocation.
pub fn push(heap: &mut Heap, arr: HeapIndex, value: HeapIndex, nil: HeapIndex) -> Result<(), ErrorKind> {
    let i = size(heap, arr);
    set(heap, arr, i, value, nil)
}

/// Remove and return the element at index `size(arr) - 1`, or `None` if
/// the array is already empty.
pub fn pop(heap: &mut Heap, arr: HeapIndex) -> Option<HeapIndex> {
    let n = size(heap, arr);
    let i = n.checked_sub(1)?;
    let value = locate(heap, arr, i)?;
    let mut seg = table::head(heap, arr);
    'outer: while !seg.is_none() {
        for (idx, cell) in heap.seg_cells(seg).iter().enumerate() {
            if let Some(k) = cell.key() {
                if key_index(heap, k) == Some(i) {
                    heap.invalidate_cell(seg, idx);
                    break 'outer;
                }
            }
        }
        seg = heap.seg_next(seg);
    }
    Some(value)
}

/// Deep-copy `arr` into a freshly allocated array with the same elements
/// (sharing the element heap indices themselves) and swarm flag, so the
/// flag survives a clone.
///
/// # Errors
/// Returns [`ErrorKind::OutOfMemory`] if the copy cannot be allocated.
pub fn clone_array(heap: &mut Heap, arr: HeapIndex) -> Result<HeapIndex, ErrorKind> {
    let n = size(heap, arr);
    let swarm = table::is_swarm(heap, arr);
    let copy = new_array(heap)?;
    for i in 0..n {
        let value = locate(heap, arr, i).expect("i < size implies present");
        let key = heap.alloc_obj(Obj::Int(i as i16)).ok_or(ErrorKind::OutOfMemory)?;
        table::upsert(heap, copy, key, value)?;
    }
    table::set_swarm(heap, copy, swarm);
    Ok(copy)
}

/// Clone `arr` for use as a captured activation record (closure capture).
///
/// # Errors
/// Returns [`ErrorKind::OutOfMemory`] if the copy cannot be allocated.
pub fn lambda_alloc(heap: &mut Heap, arr: HeapIndex) -> Result<HeapIndex, ErrorKind> {
    clone_array(heap, arr)
}

/// Set or clear the swarm-participation flag on `arr`.
pub fn mark_swarm(heap: &mut Heap, arr: HeapIndex, swarm: bool) {
    table::set_swarm(heap, arr, swarm);
}

/// Linear search: the first index `i` for which `cmp(heap, arr[i], key)`
/// is true. Used by the native registry to search `flist` by pointer
/// identity without `array` needing to know what a pointer is.
#[must_use]
pub fn find(heap: &Heap, arr: HeapIndex, key: HeapIndex, cmp: impl Fn(&Heap, HeapIndex, HeapIndex) -> bool) -> Option<usize> {
    let n = size(heap, arr);
    (0..n).find(|&i| {
        let Some(v) = get(heap, arr, i) else {
            return false;
        };
        cmp(heap, v, key)
    })
}
