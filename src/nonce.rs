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

//! Draining the return-nonce FIFO and decoding its two-word entries into
//! fully-provenanced [`NonceRecord`]s.

use crate::error::Result;
use crate::mmio::RegisterFile;
use packed_struct::prelude::*;
use packed_struct_codegen::PackedStruct;

const RETURN_NONCE: usize = 0x010;
const NONCE_COUNT: usize = 0x018;

/// Metadata word accompanying a raw nonce: `[chain:8 | chip:8 | core:8 | work_id:8]`,
/// high to low.
#[derive(PackedStruct, Debug, Clone, Copy, PartialEq, Eq)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "4", endian = "msb")]
struct NonceMeta {
    #[packed_field(bits = "31:24")]
    chain_id: u8,
    #[packed_field(bits = "23:16")]
    chip_id: u8,
    #[packed_field(bits = "15:8")]
    core_id: u8,
    #[packed_field(bits = "7:0")]
    work_id: u8,
}

/// A fully-decoded nonce, with the chain/chip/core/work_id provenance the FPGA attaches
/// to every return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceRecord {
    pub nonce: u32,
    pub chain_id: u8,
    pub chip_id: u8,
    pub core_id: u8,
    pub work_id: u8,
}

impl NonceRecord {
    fn decode(word0: u32, word1: u32) -> Self {
        let meta = NonceMeta::unpack(&word1.to_be_bytes()).expect("4-byte unpack is infallible");
        Self {
            nonce: word0,
            chain_id: meta.chain_id,
            chip_id: meta.chip_id,
            core_id: meta.core_id,
            work_id: meta.work_id,
        }
    }
}

/// Non-blocking drain of the shared return-nonce FIFO. Disjoint from the Work Submit
/// Engine's registers, so a Collector and Submitter may run concurrently on one chain.
pub struct NonceCollector<'a, R: RegisterFile> {
    regs: &'a R,
}

impl<'a, R: RegisterFile> NonceCollector<'a, R> {
    pub fn new(regs: &'a R) -> Self {
        Self { regs }
    }

    /// Number of nonce entries currently queued.
    pub fn count(&self) -> Result<u16> {
        let raw = self.regs.read_word(NONCE_COUNT)?;
        Ok((raw & 0x7FFF) as u16)
    }

    /// Read and decode a single entry. Does not check `count()` first; callers drive the
    /// polling cadence.
    pub fn read_one(&self) -> Result<NonceRecord> {
        let word0 = self.regs.read_word(RETURN_NONCE)?;
        let word1 = self.regs.read_word(RETURN_NONCE)?;
        Ok(NonceRecord::decode(word0, word1))
    }

    /// Drain up to `max` entries, or fewer if the FIFO holds less. Never blocks.
    pub fn drain(&self, max: usize) -> Result<Vec<NonceRecord>> {
        let available = self.count()? as usize;
        let n = available.min(max);
        let mut records = Vec::with_capacity(n);
        for _ in 0..n {
            records.push(self.read_one()?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::MockRegisterFile;

    #[test]
    fn test_nonce_decode_literal_example() {
        let record = NonceRecord::decode(0xDEAD_BEEF, 0x04_0C_1E_38);
        assert_eq!(record.nonce, 0xDEAD_BEEF);
        assert_eq!(record.chain_id, 4);
        assert_eq!(record.chip_id, 12);
        assert_eq!(record.core_id, 30);
        assert_eq!(record.work_id, 56);
    }

    #[test]
    fn test_count_masks_to_15_bits() {
        let regs = MockRegisterFile::new();
        regs.write_word(NONCE_COUNT, 0xFFFF_8003).unwrap();
        let collector = NonceCollector::new(&regs);
        assert_eq!(collector.count().unwrap(), 3);
    }

    #[test]
    fn test_drain_reads_min_of_count_and_max() {
        let regs = MockRegisterFile::new();
        regs.write_word(NONCE_COUNT, 5).unwrap();
        regs.write_word(RETURN_NONCE, 0x1234_5678).unwrap();
        let collector = NonceCollector::new(&regs);
        let records = collector.drain(2).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_drain_empty_fifo_returns_no_records() {
        let regs = MockRegisterFile::new();
        let collector = NonceCollector::new(&regs);
        assert!(collector.drain(10).unwrap().is_empty());
    }

    #[test]
    fn test_work_id_matches_submitted_id_shifted() {
        let submitted_work_id: u32 = 7;
        let record = NonceRecord::decode(0, (submitted_work_id << 3) & 0xFF);
        assert_eq!(record.work_id as u32, (submitted_work_id << 3) & 0xFF);
    }
}
