// SPDX-License-Identifier: MIT

//! Index newtypes for the BittyBuzz heap.
//!
//! The VM never holds a native pointer into the heap: every reference is an
//! index into one of two fixed-size arrays (object slots or table segments).
//! Using distinct newtypes for each index space prevents a table-segment
//! index from being passed where an object-slot index is expected.


use core::fmt;

/// Index of an object slot in the heap's object region.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HeapIndex(u16);

/// Sentinel heap index meaning "no activation record" (a widened `0xFF`
/// actrec sentinel, since `HeapIndex` itself is 16 bits).
pub const NO_ACTREC: HeapIndex = HeapIndex(u16::MAX);

impl HeapIndex {
    /// Build a heap index from a raw slot number.
    #[inline]
    #[must_use]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// The raw slot number.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// The raw slot number as a `usize` for array indexing.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for HeapIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a segment in the heap's table-segment region.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TsegIndex(u16);

/// Sentinel meaning "no next segment" / "table has no segments yet".
pub const NO_TSEG: TsegIndex = TsegIndex(u16::MAX);

impl TsegIndex {
    /// Build a segment index from a raw segment number.
    #[inline]
    #[must_use]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// The raw segment number.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// The raw segment number as a `usize` for array indexing.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Whether this index is the "no segment" sentinel.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == NO_TSEG.0
    }
}

impl fmt::Debug for TsegIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "Tseg(none)")
        } else {
            write!(f, "Tseg({})", self.0)
        }
    }
}

/// Interned-string id, stable for the VM's lifetime.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct StringId(pub u16);

impl StringId {
    /// Build a string id from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// The raw id.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}
