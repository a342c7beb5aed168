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

//! The process-wide Driver Context: owns the mapped FPGA window, the parsed
//! [`DriverConfig`], and the per-chain state computed by the Orchestrator. The window is
//! the sole shared mutable state; everything else here is read-only after construction or
//! derived from it.

use crate::chain::ChainState;
use crate::config::DriverConfig;
use crate::delay::Delay;
use crate::error::Result;
use crate::mmio::{MmapRegisterFile, RegisterFile};
use crate::orchestrator;
use crate::power::PowerInterface;

/// Fixed chip count per chain on this hardware.
pub const CHIPS_PER_CHAIN: u8 = 114;

/// Owns the register file and the bring-up state of every configured chain.
pub struct DriverContext<R: RegisterFile> {
    regs: R,
    config: DriverConfig,
    chain_states: Vec<ChainState>,
    initialized: bool,
}

impl DriverContext<MmapRegisterFile> {
    /// Open and `mmap` the device named in `config`, yielding a context with no chains
    /// brought up yet.
    pub fn open(config: DriverConfig) -> Result<Self> {
        let regs = MmapRegisterFile::open(&config.device_path)?;
        Ok(Self::with_register_file(regs, config))
    }
}

impl<R: RegisterFile> DriverContext<R> {
    /// Build a context around an already-open register file (real or mock), for use by
    /// tests and by [`DriverContext::open`].
    pub fn with_register_file(regs: R, config: DriverConfig) -> Self {
        let num_chains = config.num_chains as usize;
        Self {
            regs,
            config,
            chain_states: vec![ChainState::default(); num_chains],
            initialized: false,
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }

    pub fn chain_states(&self) -> &[ChainState] {
        &self.chain_states
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Bring up every configured chain in order, using `power` for the pre-bring-up and
    /// post-bring-up power steps. Aborts on the first chain whose bring-up fails; chains
    /// already brought up keep their state.
    pub fn bring_up_all(&mut self, power: &dyn PowerInterface, delay: &dyn Delay) -> Result<()> {
        power.power_on(self.config.voltage_mv)?;
        for chain in 0..self.config.num_chains {
            power.enable_dc_dc(chain)?;
            let state = orchestrator::bring_up_chain(
                &self.regs,
                delay,
                chain,
                CHIPS_PER_CHAIN,
                self.config.frequency_mhz,
            )?;
            self.chain_states[chain as usize] = state;
        }
        crate::power::ramp_down_voltage(power)?;
        self.initialized = true;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::orchestrator::HASH_ON_PLUG;
    use crate::power::NullPower;
    use crate::test_support::{MockRegisterFile, NoopDelay};

    fn test_config() -> DriverConfig {
        DriverConfig {
            num_chains: 1,
            ..DriverConfig::default()
        }
    }

    #[test]
    fn test_fresh_context_is_not_initialized() {
        let ctx = DriverContext::with_register_file(MockRegisterFile::new(), test_config());
        assert!(!ctx.is_initialized());
        assert_eq!(ctx.chain_states().len(), 1);
    }

    #[test]
    fn test_bring_up_all_marks_context_initialized() {
        let mut ctx = DriverContext::with_register_file(MockRegisterFile::new(), test_config());
        ctx.registers().write_word(HASH_ON_PLUG, 0b1).unwrap();
        ctx.bring_up_all(&NullPower, &NoopDelay).unwrap();
        assert!(ctx.is_initialized());
        assert!(ctx.chain_states()[0].detected);
        assert_eq!(ctx.chain_states()[0].chips, CHIPS_PER_CHAIN);
    }
}
