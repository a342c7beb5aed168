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

//! Hardware reset-line sequencing and daisy-chain address enumeration.

use crate::asic::{build_chain_inactive_cmd, build_set_address_cmd};
use crate::delay::Delay;
use crate::error::Result;
use crate::logging::macros::*;
use crate::mmio::RegisterFile;
use crate::transport::send_uart;
use std::time::Duration;

/// Direct byte offset of the hashboard reset line (also logical index 13).
pub const RESET_LINE: usize = 0x034;

/// Per-chain state tracked across the bring-up sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainState {
    pub detected: bool,
    pub chips: u8,
    pub baud_phase: BaudPhase,
    pub pll_locked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaudPhase {
    Low,
    High,
}

impl Default for BaudPhase {
    fn default() -> Self {
        BaudPhase::Low
    }
}

fn set_reset_bit<R: RegisterFile>(regs: &R, chain: u8, asserted: bool) -> Result<()> {
    let current = regs.read_word(RESET_LINE)?;
    let mask = 1u32 << chain;
    let updated = if asserted { current | mask } else { current & !mask };
    regs.write_word(RESET_LINE, updated)
}

/// Run the hardware reset-line toggle sequence for `chain`. These delays are
/// hardware-mandated and must not be shortened; `delay` is the real clock in production and
/// a trace recorder in tests.
pub fn hardware_reset<R: RegisterFile>(regs: &R, delay: &dyn Delay, chain: u8) -> Result<()> {
    info!("chain {}: hardware reset sequence starting", chain);
    delay.sleep(Duration::from_millis(700));
    set_reset_bit(regs, chain, true)?;
    delay.sleep(Duration::from_millis(10));
    set_reset_bit(regs, chain, false)?;
    delay.sleep(Duration::from_millis(72));
    set_reset_bit(regs, chain, true)?;
    delay.sleep(Duration::from_millis(10));
    set_reset_bit(regs, chain, false)?;
    delay.sleep(Duration::from_millis(10));
    info!("chain {}: hardware reset sequence complete", chain);
    Ok(())
}

/// Enumerate `chip_count` chips on `chain`. Each chip, in daisy-chain order, is assigned
/// `addr = i * (256 / chip_count)`.
///
/// Returns the number of addressing sends that failed (0 = full success); enumeration
/// continues through failures so a partial chain can still be diagnosed.
pub fn enumerate<R: RegisterFile>(regs: &R, delay: &dyn Delay, chain: u8, chip_count: u8) -> Result<usize> {
    send_uart(regs, chain, &build_chain_inactive_cmd())?;
    delay.sleep(Duration::from_millis(10));

    let interval = 256 / chip_count as u16;
    let mut failures = 0usize;
    for i in 0..chip_count as u16 {
        let addr = (i * interval) as u8;
        if send_uart(regs, chain, &build_set_address_cmd(addr)).is_err() {
            warn!("chain {}: chip {} failed to take address {:#x}", chain, i, addr);
            failures += 1;
        }
        delay.sleep(Duration::from_millis(10));
    }
    info!(
        "chain {}: enumeration complete, {}/{} chips addressed",
        chain,
        chip_count as usize - failures,
        chip_count
    );
    Ok(failures)
}

/// The address (`i * (256 / chip_count)`) assigned to chip `i` of `chip_count` during
/// enumeration.
pub fn enumerated_address(i: u16, chip_count: u16) -> u8 {
    (i * (256 / chip_count)) as u8
}
