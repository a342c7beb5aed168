// Copyright (C) 2019  Braiins Systems s.r.o.
//
// This file is part of Braiins Open-Source Initiative (BOSI).
//
// BOSI is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// Please, keep in mind that we may also license BOSI or any part thereof
// under a proprietary license. For more information on the terms and conditions
// of such proprietary license or if you have any other questions, please
// contact us at opensource@braiins.com.

//! Typed access over the FPGA's 5 KB MMIO window: a "direct" (byte-offset) view and an
//! "indirect" (logical-index, resolved through a fixed table) view of the same memory.
//!
//! The indirect table is modeled as plain `static` data, not branching logic: two logical
//! indices can alias to the same word (16 and 17 both resolve to the work FIFO word) and
//! callers must not assume the two views can be collapsed into one.

use crate::error::{Error, ErrorKind, Result};
use crate::logging::macros::*;
use std::path::Path;

/// Size in bytes of the mapped FPGA window.
pub const WINDOW_BYTES: usize = 5120;
/// Size in 32-bit words of the mapped FPGA window.
pub const WINDOW_WORDS: usize = WINDOW_BYTES / 4;

/// Number of entries in the indirect logical-index table.
pub const INDIRECT_TABLE_LEN: usize = 110;

/// Logical index of the work submission FIFO. The only legal index for FIFO bursts.
pub const LOGICAL_WORK_FIFO: usize = 16;
/// Logical index aliasing the same word as [`LOGICAL_WORK_FIFO`]. Must never be used as a
/// FIFO continuation; see the dual-address-space design note.
pub const LOGICAL_WORK_FIFO_SHADOW: usize = 17;

/// Logical index -> word offset. Fixed at build time.
///
/// Only a handful of slots are documented by the silicon bring-up notes this table is
/// reverse-engineered from (13, 16, 17, 18, 20, 35); the remaining entries fall back to an
/// identity mapping (logical index == word offset), which is consistent with every
/// documented entry below index 16. This is recorded as a deliberate simplification in
/// the project's design ledger, not an attempt to infer undocumented silicon behavior.
pub static INDIRECT_TABLE: [u16; INDIRECT_TABLE_LEN] = build_indirect_table();

const fn build_indirect_table() -> [u16; INDIRECT_TABLE_LEN] {
    let mut table = [0u16; INDIRECT_TABLE_LEN];
    let mut i = 0;
    while i < INDIRECT_TABLE_LEN {
        table[i] = i as u16;
        i += 1;
    }
    table[LOGICAL_WORK_FIFO_SHADOW] = LOGICAL_WORK_FIFO as u16;
    table[18] = 33;
    table[20] = 35;
    table[35] = 70;
    table
}

/// Abstraction over the mapped FPGA window, real (mmap-backed) or mock (in-memory).
///
/// Implementations must provide the write-barrier and bounds-checking semantics described
/// in the register file design: writes are followed by a full memory barrier, and
/// out-of-range accesses fail with [`ErrorKind::InvalidRegister`].
pub trait RegisterFile {
    /// Read the 32-bit word at `byte_offset`. `byte_offset` must be a multiple of 4 and
    /// within `0..WINDOW_BYTES`.
    fn read_word(&self, byte_offset: usize) -> Result<u32>;

    /// Write `value` to the 32-bit word at `byte_offset`, followed by a full memory
    /// barrier.
    fn write_word(&self, byte_offset: usize, value: u32) -> Result<()>;

    /// Read through the indirect table. `idx` must be within `0..INDIRECT_TABLE_LEN`.
    fn read_logical(&self, idx: usize) -> Result<u32> {
        let word = resolve_logical(idx)?;
        if idx == LOGICAL_WORK_FIFO_SHADOW {
            warn!("read_logical(17): shadow of the work FIFO word, intent unclear, used anyway");
        }
        self.read_word(word * 4)
    }

    /// Write through the indirect table. `idx` must be within `0..INDIRECT_TABLE_LEN`.
    fn write_logical(&self, idx: usize, value: u32) -> Result<()> {
        let word = resolve_logical(idx)?;
        if idx == LOGICAL_WORK_FIFO_SHADOW {
            warn!("write_logical(17): shadow of the work FIFO word, intent unclear, used anyway");
        }
        self.write_word(word * 4, value)
    }
}

fn resolve_logical(idx: usize) -> Result<usize> {
    INDIRECT_TABLE
        .get(idx)
        .map(|&word| word as usize)
        .ok_or_else(|| ErrorKind::InvalidRegister(idx).into())
}

/// RAII wrapper around an `mmap`-ed FPGA window, grounded on the same open+mmap+Drop-unmap
/// pattern used for the kernel's UIO character devices: open the node, `mmap` it once, and
/// unmap in `Drop`. Unlike a UIO device, the kernel character device this crate talks to
/// supports only `open`/`release`/`mmap` -- there is no sysfs indirection and no IRQ
/// subsystem to drive.
pub struct MmapRegisterFile {
    ptr: *mut u32,
    _file: std::fs::File,
}

// Safety: `ptr` addresses a fixed-size, page-backed MMIO window for the process lifetime;
// all accesses go through volatile reads/writes with an explicit barrier on the write path,
// matching the hardware's own single-writer contract (the Orchestrator serializes itself).
unsafe impl Send for MmapRegisterFile {}
unsafe impl Sync for MmapRegisterFile {}

impl MmapRegisterFile {
    /// Open `device_path`, map [`WINDOW_BYTES`] bytes read-write, and return the handle.
    pub fn open(device_path: &Path) -> Result<Self> {
        use nix::sys::mman::{mmap, MapFlags, ProtFlags};
        use std::os::unix::io::AsRawFd;

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(device_path)
            .map_err(|e| -> Error {
                let msg = format!("opening {}: {}", device_path.display(), e);
                ErrorKind::MmapFailed(msg).into()
            })?;

        let ptr = unsafe {
            mmap(
                std::ptr::null_mut(),
                WINDOW_BYTES,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        }
        .map_err(|e| -> Error {
            let msg = format!("mmap {}: {}", device_path.display(), e);
            ErrorKind::MmapFailed(msg).into()
        })?;

        info!("mapped FPGA window at {:?} ({} bytes)", device_path, WINDOW_BYTES);
        Ok(Self {
            ptr: ptr as *mut u32,
            _file: file,
        })
    }

    fn word_ptr(&self, byte_offset: usize) -> Result<*mut u32> {
        if byte_offset % 4 != 0 || byte_offset >= WINDOW_BYTES {
            return Err(ErrorKind::InvalidRegister(byte_offset).into());
        }
        Ok(unsafe { self.ptr.add(byte_offset / 4) })
    }
}

impl RegisterFile for MmapRegisterFile {
    fn read_word(&self, byte_offset: usize) -> Result<u32> {
        let p = self.word_ptr(byte_offset)?;
        let value = unsafe { std::ptr::read_volatile(p) };
        std::sync::atomic::fence(std::sync::atomic::Ordering::Acquire);
        Ok(value)
    }

    fn write_word(&self, byte_offset: usize, value: u32) -> Result<()> {
        let p = self.word_ptr(byte_offset)?;
        unsafe { std::ptr::write_volatile(p, value) };
        std::sync::atomic::fence(std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MmapRegisterFile {
    fn drop(&mut self) {
        use nix::sys::mman::munmap;
        let _ = unsafe { munmap(self.ptr as *mut libc::c_void, WINDOW_BYTES) };
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::MockRegisterFile;

    #[test]
    fn test_indirect_table_documented_entries() {
        assert_eq!(INDIRECT_TABLE[0], 0);
        assert_eq!(INDIRECT_TABLE[13], 13);
        assert_eq!(INDIRECT_TABLE[16], 16);
        assert_eq!(INDIRECT_TABLE[17], 16);
        assert_eq!(INDIRECT_TABLE[18], 33);
        assert_eq!(INDIRECT_TABLE[20], 35);
        assert_eq!(INDIRECT_TABLE[35], 70);
    }

    #[test]
    fn test_logical_round_trip_all_indices() {
        let regs = MockRegisterFile::new();
        for idx in 0..INDIRECT_TABLE_LEN {
            regs.write_logical(idx, 0xdead_0000 | idx as u32).unwrap();
            assert_eq!(regs.read_logical(idx).unwrap(), 0xdead_0000 | idx as u32);
            let word = INDIRECT_TABLE[idx] as usize;
            assert_eq!(regs.read_word(word * 4).unwrap(), 0xdead_0000 | idx as u32);
        }
    }

    #[test]
    fn test_out_of_range_logical_index_fails() {
        let regs = MockRegisterFile::new();
        assert!(regs.read_logical(INDIRECT_TABLE_LEN).is_err());
        assert!(regs.write_logical(INDIRECT_TABLE_LEN, 0).is_err());
    }

    #[test]
    fn test_direct_offset_must_be_word_aligned_and_in_range() {
        let regs = MockRegisterFile::new();
        assert!(regs.read_word(1).is_err());
        assert!(regs.read_word(WINDOW_BYTES).is_err());
        assert!(regs.write_word(WINDOW_BYTES - 4, 0x1234).is_ok());
    }
}
