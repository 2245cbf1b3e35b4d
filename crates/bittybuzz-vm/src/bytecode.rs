// SPDX-License-Identifier: MIT

//! Bytecode format for the BittyBuzz VM.
//!
//! Instructions are a 1-byte opcode, optionally followed by a 4-byte
//! little-endian immediate. The immediate boundary falls exactly at
//! [`op::PUSHF`]: every opcode numbered `PUSHF` or higher carries an
//! operand, every opcode below it does not — this split must be preserved
//! for `skip_instr`/decoding to agree with the producing compiler.
//!
//! Bytecode is not held in memory as an owned buffer: it is streamed
//! through the host-supplied [`BytecodeSource::fetch`] callback, since the
//! image can be larger than the MCU's RAM and lives in flash/ROM owned by
//! the host.

#[cfg(test)]
#[path = "bytecode_test.rs"]
mod bytecode_test;

use crate::error::ErrorKind;

/// Opcode numbering, fixed by the producing compiler.
pub mod op {
    pub const NOP: u8 = 0;
    pub const DONE: u8 = 1;
    pub const PUSHNIL: u8 = 2;
    pub const DUP: u8 = 3;
    pub const POP: u8 = 4;
    pub const RET0: u8 = 5;
    pub const RET1: u8 = 6;
    pub const ADD: u8 = 7;
    pub const SUB: u8 = 8;
    pub const MUL: u8 = 9;
    pub const DIV: u8 = 10;
    pub const MOD: u8 = 11;
    pub const POW: u8 = 12;
    pub const UNM: u8 = 13;
    pub const AND: u8 = 14;
    pub const OR: u8 = 15;
    pub const NOT: u8 = 16;
    pub const EQ: u8 = 17;
    pub const NEQ: u8 = 18;
    pub const GT: u8 = 19;
    pub const GTE: u8 = 20;
    pub const LT: u8 = 21;
    pub const LTE: u8 = 22;
    pub const GLOAD: u8 = 23;
    pub const GSTORE: u8 = 24;
    pub const PUSHT: u8 = 25;
    pub const TPUT: u8 = 26;
    pub const TGET: u8 = 27;
    pub const CALLC: u8 = 28;
    pub const CALLS: u8 = 29;
    /// First opcode to carry a 4-byte immediate; see the module doc.
    pub const PUSHF: u8 = 30;
    pub const PUSHI: u8 = 31;
    pub const PUSHS: u8 = 32;
    pub const PUSHCN: u8 = 33;
    pub const PUSHCC: u8 = 34;
    pub const PUSHL: u8 = 35;
    pub const LLOAD: u8 = 36;
    pub const LSTORE: u8 = 37;
    pub const JUMP: u8 = 38;
    pub const JUMPZ: u8 = 39;
    pub const JUMPNZ: u8 = 40;
}

/// Whether the opcode at `opcode` carries a 4-byte immediate operand.
#[inline]
#[must_use]
pub const fn has_operand(opcode: u8) -> bool {
    opcode >= op::PUSHF
}

/// Size in bytes of the instruction whose opcode is `opcode`: 1, or 5 if
/// it carries an operand.
#[inline]
#[must_use]
pub const fn instr_len(opcode: u8) -> u32 {
    if has_operand(opcode) { 5 } else { 1 }
}

/// Host-supplied access to the bytecode image.
///
/// An external `fetch(offset, size) -> bytes` callback valid for sizes 1,
/// 2, and 4, implemented as a trait rather than a bare function pointer so
/// hosts can close over whatever storage backs the image (flash-mapped
/// slice, SPI flash cache, etc.).
pub trait BytecodeSource {
    /// Number of bytes in the image.
    fn len(&self) -> u32;

    /// Read `size` bytes at `offset`. `size` is always 1, 2, or 4.
    /// Returns `None` if `[offset, offset+size)` is out of range.
    fn fetch(&self, offset: u32, size: u8) -> Option<[u8; 4]>;
}

impl BytecodeSource for &[u8] {
    fn len(&self) -> u32 {
        u32::try_from((*self).len()).unwrap_or(u32::MAX)
    }

    fn fetch(&self, offset: u32, size: u8) -> Option<[u8; 4]> {
        let start = usize::try_from(offset).ok()?;
        let end = start.checked_add(usize::from(size))?;
        let bytes = self.get(start..end)?;
        let mut buf = [0u8; 4];
        buf[..bytes.len()].copy_from_slice(bytes);
        Some(buf)
    }
}

/// Read the opcode byte at `offset`.
///
/// # Errors
/// Returns [`ErrorKind::Pc`] if `offset` is out of range.
pub fn read_opcode(source: &impl BytecodeSource, offset: u32) -> Result<u8, ErrorKind> {
    source.fetch(offset, 1).map(|b| b[0]).ok_or(ErrorKind::Pc)
}

/// Read the 4-byte little-endian operand following the opcode at
/// `offset` (i.e. at `offset + 1`), as a raw `u32`.
///
/// # Errors
/// Returns [`ErrorKind::Pc`] if the operand bytes are out of range.
pub fn read_operand_u32(source: &impl BytecodeSource, offset: u32) -> Result<u32, ErrorKind> {
    source
        .fetch(offset + 1, 4)
        .map(u32::from_le_bytes)
        .ok_or(ErrorKind::Pc)
}

/// Read the operand as a signed 32-bit integer.
///
/// # Errors
/// Returns [`ErrorKind::Pc`] if the operand bytes are out of range.
pub fn read_operand_i32(source: &impl BytecodeSource, offset: u32) -> Result<i32, ErrorKind> {
    read_operand_u32(source, offset).map(|bits| bits as i32)
}

/// Read the low 16 bits of the operand, used by jump targets and string
/// ids.
///
/// # Errors
/// Returns [`ErrorKind::Pc`] if the operand bytes are out of range.
pub fn read_operand_u16(source: &impl BytecodeSource, offset: u32) -> Result<u16, ErrorKind> {
    #[expect(clippy::cast_possible_truncation, reason = "explicitly taking the low 16 bits")]
    read_operand_u32(source, offset).map(|bits| bits as u16)
}

/// A single decoded instruction: its opcode, raw 32-bit operand (`0` if
/// it has none), and its length in bytes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Instr {
    pub opcode: u8,
    pub operand: u32,
    pub len: u32,
}

/// Decode the instruction at `offset`.
///
/// # Errors
/// Returns [`ErrorKind::Pc`] if the opcode or, when present, its operand
/// bytes are out of range.
pub fn decode(source: &impl BytecodeSource, offset: u32) -> Result<Instr, ErrorKind> {
    let opcode = read_opcode(source, offset)?;
    let operand = if has_operand(opcode) {
        read_operand_u32(source, offset)?
    } else {
        0
    };
    Ok(Instr {
        opcode,
        operand,
        len: instr_len(opcode),
    })
}
