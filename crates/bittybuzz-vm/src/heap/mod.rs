// SPDX-License-Identifier: MIT

//! Fixed-capacity heap: object slots and table segments, with a
//! stop-the-world mark-and-sweep collector.
//!
//! A single byte region split at runtime into two growing areas meeting in
//! the middle is rendered here as two independently-capacity-bounded fixed
//! arrays rather than one raw byte buffer carved up by pointer arithmetic —
//! the same "no free list, compact by construction" property holds, it's
//! just expressed with two `[T; N]`s instead of manual layout over
//! `[u8; N]`. See `DESIGN.md` for the full rationale.


use crate::types::{HeapIndex, NO_TSEG, TsegIndex};
use crate::value::{Obj, cmp};

/// Number of object slots in the heap.
pub const OBJECT_SLOTS: usize = 256;

/// Number of table segments in the heap.
pub const TABLE_SEGMENTS: usize = 128;

/// Key/value cells per table segment.
pub const ELEMS_PER_TSEG: usize = 4;

/// Number of temporary roots the collector stages on the operand stack
/// while it runs: the six VM singletons.
pub const GC_ROOT_MARGIN: usize = 6;

#[derive(Clone, Copy)]
struct Slot {
    valid: bool,
    marked: bool,
    obj: Obj,
}

const EMPTY_SLOT: Slot = Slot {
    valid: false,
    marked: false,
    obj: Obj::Nil,
};

/// One key/value cell in a table segment.
#[derive(Clone, Copy, Default)]
pub struct Cell {
    valid: bool,
    key: HeapIndex,
    value: HeapIndex,
}

impl Cell {
    /// The cell's key, if valid.
    #[must_use]
    pub fn key(&self) -> Option<HeapIndex> {
        self.valid.then_some(self.key)
    }

    /// The cell's value, if valid.
    #[must_use]
    pub fn value(&self) -> Option<HeapIndex> {
        self.valid.then_some(self.value)
    }
}

#[derive(Clone, Copy)]
struct Tseg {
    valid: bool,
    marked: bool,
    cells: [Cell; ELEMS_PER_TSEG],
    next: TsegIndex,
}

const EMPTY_CELL: Cell = Cell {
    valid: false,
    key: HeapIndex::new(0),
    value: HeapIndex::new(0),
};

const EMPTY_TSEG: Tseg = Tseg {
    valid: false,
    marked: false,
    cells: [EMPTY_CELL; ELEMS_PER_TSEG],
    next: NO_TSEG,
};

/// The VM's fixed-capacity heap.
pub struct Heap {
    slots: [Slot; OBJECT_SLOTS],
    segs: [Tseg; TABLE_SEGMENTS],
    /// Slots in `[0, obj_top)` have been allocated from at least once.
    obj_top: usize,
    /// Segments in `[0, seg_top)` have been allocated from at least once.
    seg_top: usize,
}

impl Heap {
    /// Create an empty heap.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [EMPTY_SLOT; OBJECT_SLOTS],
            segs: [EMPTY_TSEG; TABLE_SEGMENTS],
            obj_top: 0,
            seg_top: 0,
        }
    }

    /// Reset the heap to empty, as if newly constructed: cleared wholesale,
    /// with no finalizers run over what it held.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Allocate an object slot holding `obj`.
    ///
    /// Scans for a freed slot below the current frontier first; only
    /// advances the frontier (consuming fresh capacity) when none is free.
    pub fn alloc_obj(&mut self, obj: Obj) -> Option<HeapIndex> {
        for (i, slot) in self.slots[..self.obj_top].iter_mut().enumerate() {
            if !slot.valid {
                *slot = Slot {
                    valid: true,
                    marked: false,
                    obj,
                };
                return Some(HeapIndex::new(i as u16));
            }
        }
        if self.obj_top >= OBJECT_SLOTS {
            return None;
        }
        let idx = self.obj_top;
        self.slots[idx] = Slot {
            valid: true,
            marked: false,
            obj,
        };
        self.obj_top += 1;
        Some(HeapIndex::new(idx as u16))
    }

    /// Allocate a table segment.
    pub fn alloc_seg(&mut self) -> Option<TsegIndex> {
        for (i, seg) in self.segs[..self.seg_top].iter_mut().enumerate() {
            if !seg.valid {
                *seg = Tseg {
                    valid: true,
                    ..EMPTY_TSEG
                };
                return Some(TsegIndex::new(i as u16));
            }
        }
        if self.seg_top >= TABLE_SEGMENTS {
            return None;
        }
        let idx = self.seg_top;
        self.segs[idx] = Tseg {
            valid: true,
            ..EMPTY_TSEG
        };
        self.seg_top += 1;
        Some(TsegIndex::new(idx as u16))
    }

    /// Free an object slot directly (used only by table/array deletion
    /// paths that know a slot has become unreachable without waiting for
    /// GC; ordinary reclamation happens through [`Heap::gc`]).
    pub fn free_obj(&mut self, idx: HeapIndex) {
        self.slots[idx.as_usize()].valid = false;
    }

    /// Whether the object slot at `idx` is in use.
    #[must_use]
    pub fn is_valid(&self, idx: HeapIndex) -> bool {
        self.slots[idx.as_usize()].valid
    }

    /// The object at `idx`. Panics if the slot isn't valid: every heap
    /// index the VM hands out is expected to refer to a valid slot, so an
    /// invalid slot here means that invariant was already broken upstream.
    #[must_use]
    pub fn obj(&self, idx: HeapIndex) -> &Obj {
        let slot = &self.slots[idx.as_usize()];
        debug_assert!(slot.valid, "heap index {idx:?} refers to a freed slot");
        &slot.obj
    }

    /// Mutable access to the object at `idx`. See [`Heap::obj`].
    pub fn obj_mut(&mut self, idx: HeapIndex) -> &mut Obj {
        let slot = &mut self.slots[idx.as_usize()];
        debug_assert!(slot.valid, "heap index {idx:?} refers to a freed slot");
        &mut slot.obj
    }

    /// Overwrite the object at `idx` in place (used by method-binding's
    /// closure clone and by table-as-array growth).
    pub fn set_obj(&mut self, idx: HeapIndex, obj: Obj) {
        let slot = &mut self.slots[idx.as_usize()];
        debug_assert!(slot.valid, "heap index {idx:?} refers to a freed slot");
        slot.obj = obj;
    }

    /// Whether two heap values compare equal.
    #[must_use]
    pub fn values_equal(&self, a: HeapIndex, b: HeapIndex) -> bool {
        cmp(self.obj(a), a, self.obj(b), b).is_eq()
    }

    /// Segment cells at `idx`.
    #[must_use]
    pub fn seg_cells(&self, idx: TsegIndex) -> &[Cell; ELEMS_PER_TSEG] {
        &self.segs[idx.as_usize()].cells
    }

    /// Next-segment link for `idx`.
    #[must_use]
    pub fn seg_next(&self, idx: TsegIndex) -> TsegIndex {
        self.segs[idx.as_usize()].next
    }

    /// Set the next-segment link for `idx`.
    pub fn set_seg_next(&mut self, idx: TsegIndex, next: TsegIndex) {
        self.segs[idx.as_usize()].next = next;
    }

    /// Write a key/value pair into an empty cell of segment `idx`, or
    /// overwrite the cell at `cell_idx`. Returns `false` if `cell_idx` is
    /// out of range for this segment.
    pub fn put_cell(&mut self, idx: TsegIndex, cell_idx: usize, key: HeapIndex, value: HeapIndex) -> bool {
        let Some(cell) = self.segs[idx.as_usize()].cells.get_mut(cell_idx) else {
            return false;
        };
        *cell = Cell {
            valid: true,
            key,
            value,
        };
        true
    }

    /// Invalidate a cell (deletion does not compact the segment chain;
    /// orphaned segments are reclaimed by GC).
    pub fn invalidate_cell(&mut self, idx: TsegIndex, cell_idx: usize) {
        if let Some(cell) = self.segs[idx.as_usize()].cells.get_mut(cell_idx) {
            cell.valid = false;
        }
    }

    /// Overwrite the value of an already-valid cell.
    pub fn set_cell_value(&mut self, idx: TsegIndex, cell_idx: usize, value: HeapIndex) {
        if let Some(cell) = self.segs[idx.as_usize()].cells.get_mut(cell_idx) {
            cell.value = value;
        }
    }

    /// Run one mark-and-sweep cycle, treating `roots` as the live set:
    /// clears all marks, transitively marks everything reachable from
    /// `roots`, then frees any unmarked slot or segment.
    pub fn gc(&mut self, roots: &[HeapIndex]) {
        for slot in &mut self.slots[..self.obj_top] {
            slot.marked = false;
        }
        for seg in &mut self.segs[..self.seg_top] {
            seg.marked = false;
        }
        for &root in roots {
            self.mark(root);
        }
        for slot in &mut self.slots[..self.obj_top] {
            if slot.valid && !slot.marked {
                slot.valid = false;
            }
        }
        for seg in &mut self.segs[..self.seg_top] {
            if seg.valid && !seg.marked {
                seg.valid = false;
            }
        }
    }

    fn mark(&mut self, idx: HeapIndex) {
        let i = idx.as_usize();
        if i >= self.obj_top || !self.slots[i].valid || self.slots[i].marked {
            return;
        }
        self.slots[i].marked = true;
        match self.slots[i].obj {
            Obj::Table(t) => self.mark_segment_chain(t.head),
            Obj::Closure(c) | Obj::NativeClosure(c) => {
                if c.actrec != crate::types::NO_ACTREC {
                    self.mark(c.actrec);
                }
            }
            Obj::Nil | Obj::Int(_) | Obj::Float(_) | Obj::String(_) | Obj::Userdata(_) => {}
        }
    }

    fn mark_segment_chain(&mut self, mut seg: TsegIndex) {
        while !seg.is_none() {
            let i = seg.as_usize();
            if i >= self.seg_top || !self.segs[i].valid || self.segs[i].marked {
                return;
            }
            self.segs[i].marked = true;
            let cells = self.segs[i].cells;
            let next = self.segs[i].next;
            for cell in cells {
                if cell.valid {
                    self.mark(cell.key);
                    self.mark(cell.value);
                }
            }
            seg = next;
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
