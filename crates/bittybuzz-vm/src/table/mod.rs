// SPDX-License-Identifier: MIT

//! Table operations: linked chains of fixed-size key/value segments
//! anchored by a `Table`-tagged heap object.


use crate::error::ErrorKind;
use crate::heap::{ELEMS_PER_TSEG, Heap};
use crate::types::{HeapIndex, NO_TSEG};
use crate::value::{Obj, TableData};

fn table_data(heap: &Heap, table: HeapIndex) -> Result<TableData, ErrorKind> {
    match *heap.obj(table) {
        Obj::Table(t) => Ok(t),
        ref other => Err(ErrorKind::Type {
            expected: "table",
            got: other.type_name(),
        }),
    }
}

/// Look up `key` in `table`. Returns the value's heap index if present.
#[must_use]
pub fn get(heap: &Heap, table: HeapIndex, key: HeapIndex) -> Option<HeapIndex> {
    let data = table_data(heap, table).ok()?;
    let mut seg = data.head;
    while !seg.is_none() {
        for cell in heap.seg_cells(seg) {
            if let Some(k) = cell.key() {
                if heap.values_equal(k, key) {
                    return cell.value();
                }
            }
        }
        seg = heap.seg_next(seg);
    }
    None
}

/// Set `table[key] = value`. Setting `value` to the nil singleton deletes
/// the key.
///
/// # Errors
/// Returns [`ErrorKind::OutOfMemory`] if a new segment is needed but the
/// heap's segment region is exhausted.
pub fn set(
    heap: &mut Heap,
    table: HeapIndex,
    key: HeapIndex,
    value: HeapIndex,
    nil: HeapIndex,
) -> Result<(), ErrorKind> {
    if heap.values_equal(value, nil) {
        delete(heap, table, key);
        Ok(())
    } else {
        upsert(heap, table, key, value)
    }
}

/// Insert or overwrite `table[key] = value` unconditionally — unlike
/// [`set`], a `value` that happens to be nil is stored, not treated as a
/// deletion. Used internally by `array` when growing or cloning, where a
/// gap-filled or captured nil is a real element, not an instruction to
/// remove a key.
///
/// # Errors
/// Returns [`ErrorKind::OutOfMemory`] if a new segment is needed but the
/// heap's segment region is exhausted.
pub(crate) fn upsert(
    heap: &mut Heap,
    table: HeapIndex,
    key: HeapIndex,
    value: HeapIndex,
) -> Result<(), ErrorKind> {
    let data = table_data(heap, table)?;

    // Walk the chain: overwrite an existing cell for `key`, or remember
    // the first empty cell seen along the way.
    let mut seg = data.head;
    let mut first_empty: Option<(crate::types::TsegIndex, usize)> = None;
    while !seg.is_none() {
        for (i, cell) in heap.seg_cells(seg).iter().enumerate() {
            match cell.key() {
                Some(k) if heap.values_equal(k, key) => {
                    heap.set_cell_value(seg, i, value);
                    return Ok(());
                }
                None if first_empty.is_none() => first_empty = Some((seg, i)),
                _ => {}
            }
        }
        seg = heap.seg_next(seg);
    }

    if let Some((seg, i)) = first_empty {
        heap.put_cell(seg, i, key, value);
        return Ok(());
    }

    // No room in any existing segment: allocate a fresh one and link it
    // in at the head (order among segments is otherwise unobserved).
    let new_seg = heap.alloc_seg().ok_or(ErrorKind::OutOfMemory)?;
    heap.put_cell(new_seg, 0, key, value);
    heap.set_seg_next(new_seg, data.head);
    let mut updated = data;
    updated.head = new_seg;
    heap.set_obj(table, Obj::Table(updated));
    Ok(())
}

fn delete(heap: &mut Heap, table: HeapIndex, key: HeapIndex) {
    let Ok(data) = table_data(heap, table) else {
        return;
    };
    let mut seg = data.head;
    while !seg.is_none() {
        for (i, cell) in heap.seg_cells(seg).iter().enumerate() {
            if let Some(k) = cell.key() {
                if heap.values_equal(k, key) {
                    heap.invalidate_cell(seg, i);
                    return;
                }
            }
        }
        seg = heap.seg_next(seg);
    }
}

/// The head segment of `table`'s chain, or [`NO_TSEG`] if empty or `table`
/// isn't a table.
#[must_use]
pub(crate) fn head(heap: &Heap, table: HeapIndex) -> crate::types::TsegIndex {
    table_data(heap, table).map_or(NO_TSEG, |t| t.head)
}

/// Number of valid cells across the table's segment chain.
#[must_use]
pub fn size(heap: &Heap, table: HeapIndex) -> usize {
    let Ok(data) = table_data(heap, table) else {
        return 0;
    };
    let mut seg = data.head;
    let mut count = 0;
    while !seg.is_none() {
        count += heap.seg_cells(seg).iter().filter(|c| c.key().is_some()).count();
        seg = heap.seg_next(seg);
    }
    count
}

/// Whether `table` has been flagged as a swarm local-symbol array.
#[must_use]
pub fn is_swarm(heap: &Heap, table: HeapIndex) -> bool {
    table_data(heap, table).map(|t| t.swarm).unwrap_or(false)
}

/// Set or clear the swarm flag on `table`.
pub fn set_swarm(heap: &mut Heap, table: HeapIndex, swarm: bool) {
    if let Ok(mut data) = table_data(heap, table) {
        data.swarm = swarm;
        heap.set_obj(table, Obj::Table(data));
    }
}

/// Allocate a fresh, empty table object.
///
/// # Errors
/// Returns [`ErrorKind::OutOfMemory`] if the object-slot region is full.
pub fn new_table(heap: &mut Heap) -> Result<HeapIndex, ErrorKind> {
    heap.alloc_obj(Obj::Table(TableData {
        head: NO_TSEG,
        swarm: false,
    }))
    .ok_or(ErrorKind::OutOfMemory)
}

/// Upper bound on distinct keys a single segment can add to `size` without
/// requiring a new allocation — exposed so callers (e.g. `array`) can
/// reason about growth without recomputing `ELEMS_PER_TSEG`.
pub const CELLS_PER_SEGMENT: usize = ELEMS_PER_TSEG;
