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

//! The 5-bit CRC used to checksum every command frame sent over the UART-over-FPGA
//! channel.

const INITIAL_STATE: u8 = 0x1F;
const POLY_MASK: u8 = 0x05;

/// Compute the Bitmain-style CRC5 of `bytes`, processing exactly `n_bits` bits MSB-first.
///
/// `n_bits` need not be a multiple of 8; only whole bytes are present in `bytes`, and bits
/// beyond `n_bits` in the final byte are not consumed.
pub fn crc5(bytes: &[u8], n_bits: usize) -> u8 {
    let mut state = INITIAL_STATE;
    let mut bits_left = n_bits;
    for &byte in bytes {
        if bits_left == 0 {
            break;
        }
        let bits_in_byte = bits_left.min(8);
        for i in 0..bits_in_byte {
            let bit = (byte >> (7 - i)) & 1;
            if (state >> 4) != bit {
                state = ((state << 1) | bit) ^ POLY_MASK;
            } else {
                state = (state << 1) | bit;
            }
            state &= 0x1F;
        }
        bits_left -= bits_in_byte;
    }
    state
}
