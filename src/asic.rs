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

//! Command-frame construction and the single/broadcast register read/write protocol that
//! rides on top of the UART transport (`crate::transport`).

use crate::crc5::crc5;
use crate::error::{ErrorKind, Result};
use crate::mmio::RegisterFile;
use crate::transport::send_uart;
use std::time::{Duration, Instant};

const NONCE_RETURN: usize = 0x010;
const NONCE_COUNT: usize = 0x018;

const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Addressing mode for a chip-directed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipAddress {
    /// Every chip on the chain.
    All,
    /// A single chip, by its enumerated address.
    One(u8),
}

impl ChipAddress {
    fn is_broadcast(self) -> bool {
        matches!(self, ChipAddress::All)
    }

    fn hw_addr(self) -> u8 {
        match self {
            ChipAddress::All => 0,
            ChipAddress::One(addr) => addr,
        }
    }
}

fn push_crc5(frame: &mut Vec<u8>) {
    let n_bits = frame.len() * 8;
    let crc = crc5(frame, n_bits);
    frame.push(crc);
}

/// Build the 5-byte set-address command frame.
pub fn build_set_address_cmd(addr: u8) -> Vec<u8> {
    let mut frame = vec![0x40, 0x05, addr, 0x00];
    push_crc5(&mut frame);
    frame
}

/// Build the 5-byte chain-inactive command frame.
pub fn build_chain_inactive_cmd() -> Vec<u8> {
    let mut frame = vec![0x53, 0x05, 0x00, 0x00];
    push_crc5(&mut frame);
    frame
}

/// Build the 9-byte write-register command frame (single or broadcast per `chip_address`).
pub fn build_write_register_cmd(chip_address: ChipAddress, reg_addr: u8, value: u32) -> Vec<u8> {
    let opcode = if chip_address.is_broadcast() { 0x51 } else { 0x41 };
    let value_bytes = value.to_be_bytes();
    let mut frame = vec![
        opcode,
        0x09,
        chip_address.hw_addr(),
        reg_addr,
        value_bytes[0],
        value_bytes[1],
        value_bytes[2],
        value_bytes[3],
    ];
    push_crc5(&mut frame);
    frame
}

/// Build the 9-byte read-register command frame (single or broadcast per `chip_address`).
pub fn build_read_register_cmd(chip_address: ChipAddress, reg_addr: u8) -> Vec<u8> {
    let opcode = if chip_address.is_broadcast() { 0x52 } else { 0x42 };
    let mut frame = vec![opcode, 0x09, chip_address.hw_addr(), reg_addr, 0, 0, 0, 0];
    push_crc5(&mut frame);
    frame
}

/// Write `value` to register `reg_addr` on `chip_address`. No response is expected.
pub fn write_register<R: RegisterFile>(
    regs: &R,
    chain: u8,
    chip_address: ChipAddress,
    reg_addr: u8,
    value: u32,
) -> Result<()> {
    let cmd = build_write_register_cmd(chip_address, reg_addr, value);
    send_uart(regs, chain, &cmd)
}

/// Read register `reg_addr` from `chip_address`.
///
/// Bring-up-only: the reply rides on the same return-nonce FIFO used for work nonces
/// during steady-state operation (see the FIFO-sharing design note); callers must not
/// intermix this with work submission.
pub fn read_register<R: RegisterFile>(
    regs: &R,
    chain: u8,
    chip_address: ChipAddress,
    reg_addr: u8,
    timeout: Duration,
) -> Result<u32> {
    let cmd = build_read_register_cmd(chip_address, reg_addr);
    send_uart(regs, chain, &cmd)?;

    let deadline = Instant::now() + timeout;
    loop {
        let count = regs.read_word(NONCE_COUNT)? & 0x7FFF;
        if count >= 1 {
            return regs.read_word(NONCE_RETURN);
        }
        if Instant::now() >= deadline {
            return Err(ErrorKind::RegReadTimeout(chain, timeout).into());
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Read register `reg_addr` with the default (100 ms) timeout.
pub fn read_register_default<R: RegisterFile>(
    regs: &R,
    chain: u8,
    chip_address: ChipAddress,
    reg_addr: u8,
) -> Result<u32> {
    read_register(regs, chain, chip_address, reg_addr, DEFAULT_READ_TIMEOUT)
}

/// Read-modify-write a register under broadcast semantics: read from chip 0 as the
/// representative value, apply `f`, then broadcast-write the result. Not safe if other
/// chips on the chain hold diverging values for this register.
pub fn read_modify_write<R: RegisterFile>(
    regs: &R,
    chain: u8,
    reg_addr: u8,
    f: impl FnOnce(u32) -> u32,
) -> Result<()> {
    let current = read_register_default(regs, chain, ChipAddress::One(0), reg_addr)?;
    let updated = f(current);
    write_register(regs, chain, ChipAddress::All, reg_addr, updated)
}
