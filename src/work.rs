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

//! Assembly and submission of 148-byte work packets into the per-chain work FIFO.

use crate::error::{ErrorKind, Result};
use crate::mmio::{RegisterFile, LOGICAL_WORK_FIFO};
use std::time::{Duration, Instant};

/// Size in bytes of an assembled work packet.
pub const WORK_PACKET_BYTES: usize = 148;
/// Number of 32-bit words an assembled work packet occupies.
pub const WORK_PACKET_WORDS: usize = WORK_PACKET_BYTES / 4;

const BUFFER_SPACE: usize = 0x00C;
const FIFO_POLL_INTERVAL: Duration = Duration::from_millis(1);
const FIFO_TIMEOUT: Duration = Duration::from_secs(1);
const POST_SUBMIT_PACING: Duration = Duration::from_micros(10);

/// Assemble the 148-byte work packet for `chain`/`work_id`, pre-byte-swap.
pub fn assemble_packet(chain: u8, work_id: u32, header12: &[u8; 12], midstates: &[[u8; 32]; 4]) -> [u8; WORK_PACKET_BYTES] {
    let mut packet = [0u8; WORK_PACKET_BYTES];
    packet[0] = 0x01;
    packet[1] = chain | 0x80;
    // bytes 2..4 reserved, already zero
    packet[4..8].copy_from_slice(&(work_id << 3).to_ne_bytes());
    packet[8..20].copy_from_slice(header12);
    for (i, midstate) in midstates.iter().enumerate() {
        let start = 20 + i * 32;
        packet[start..start + 32].copy_from_slice(midstate);
    }
    packet
}

/// Byte-swap every 32-bit word of `packet` to big-endian, in place.
pub fn byte_swap_packet(packet: &mut [u8; WORK_PACKET_BYTES]) {
    for word in packet.chunks_exact_mut(4) {
        word.swap(0, 3);
        word.swap(1, 2);
    }
}

fn packet_words(packet: &[u8; WORK_PACKET_BYTES]) -> [u32; WORK_PACKET_WORDS] {
    let mut words = [0u32; WORK_PACKET_WORDS];
    for (i, chunk) in packet.chunks_exact(4).enumerate() {
        words[i] = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    words
}

/// Submit one unit of work to `chain`'s FIFO.
///
/// Polls the buffer-space bitmask for `chain`'s bit, assembles and byte-swaps the packet,
/// then pushes all 37 words sequentially to the FIFO (logical index 16 only -- logical 17
/// must never be used as a continuation word).
pub fn send_work<R: RegisterFile>(
    regs: &R,
    chain: u8,
    work_id: u32,
    header12: &[u8; 12],
    midstates: &[[u8; 32]; 4],
) -> Result<()> {
    let deadline = Instant::now() + FIFO_TIMEOUT;
    loop {
        let space = regs.read_word(BUFFER_SPACE)?;
        if (space >> chain) & 1 == 1 {
            break;
        }
        if Instant::now() >= deadline {
            return Err(ErrorKind::FifoFull(chain).into());
        }
        std::thread::sleep(FIFO_POLL_INTERVAL);
    }

    let mut packet = assemble_packet(chain, work_id, header12, midstates);
    byte_swap_packet(&mut packet);
    let words = packet_words(&packet);

    for word in words.iter() {
        regs.write_logical(LOGICAL_WORK_FIFO, *word)?;
    }
    std::thread::sleep(POST_SUBMIT_PACING);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::MockRegisterFile;

    fn header() -> [u8; 12] {
        let mut h = [0u8; 12];
        for (i, b) in h.iter_mut().enumerate() {
            *b = i as u8;
        }
        h
    }

    fn midstates() -> [[u8; 32]; 4] {
        let mut ms = [[0u8; 32]; 4];
        for m in ms.iter_mut() {
            for (i, b) in m.iter_mut().enumerate() {
                *b = i as u8;
            }
        }
        ms
    }

    #[test]
    fn test_packet_is_exactly_148_bytes() {
        assert_eq!(assemble_packet(0, 0, &header(), &midstates()).len(), 148);
    }

    #[test]
    fn test_double_byte_swap_is_identity() {
        let original = assemble_packet(0, 7, &header(), &midstates());
        let mut swapped = original;
        byte_swap_packet(&mut swapped);
        byte_swap_packet(&mut swapped);
        assert_eq!(swapped, original);
    }

    #[test]
    fn test_post_swap_first_and_fifth_words() {
        let mut packet = assemble_packet(0, 7, &header(), &midstates());
        byte_swap_packet(&mut packet);
        let words = packet_words(&packet);
        assert_eq!(words[0], 0x0180_0000);
        assert_eq!(words[1], 0x0000_0038);
    }

    #[test]
    fn test_send_work_pushes_37_words_to_fifo_only() {
        let regs = MockRegisterFile::new();
        regs.write_word(BUFFER_SPACE, 0b1).unwrap();
        send_work(&regs, 0, 7, &header(), &midstates()).unwrap();
        // The FIFO word always holds the last value written; verifying it landed at 0x040
        // (word 16) confirms logical index 16, not 17, was used.
        assert_eq!(regs.read_word(0x040).unwrap() & 0xFF, 0x01);
    }

    #[test]
    fn test_send_work_times_out_when_fifo_never_has_space() {
        let regs = MockRegisterFile::new();
        // buffer_space bit for chain 0 never set
        let result = send_work(&regs, 0, 0, &header(), &midstates());
        assert!(result.is_err());
    }
}
