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

//! The PSU/PIC I²C-over-FPGA power-control subsystem, specified only at its interface to
//! the core (see the scope note in the crate root): this module carries the trait contract
//! the Orchestrator drives, not a concrete I²C backend.

use crate::error::{ErrorKind, Result};
use crate::logging::macros::*;
use std::thread::sleep;
use std::time::Duration;

/// Opaque pre-bring-up and post-bring-up power collaborator. No I²C/PIC protocol
/// implementation lives in this crate; that subsystem is an external collaborator per the
/// scope note. Injected into the Orchestrator so it carries no hidden singleton state.
pub trait PowerInterface {
    /// Power on the rail and ramp to `mv` millivolts.
    fn power_on(&self, mv: u32) -> Result<()>;

    /// Set the rail to `mv` millivolts.
    fn set_voltage(&self, mv: u32) -> Result<()>;

    /// Enable the DC-DC converter feeding `chain`.
    fn enable_dc_dc(&self, chain: u8) -> Result<()>;
}

/// Starting voltage (mV) of the post-bring-up ramp-down.
pub const RAMP_START_MV: u32 = 15_000;
/// Target voltage (mV) of the post-bring-up ramp-down.
pub const RAMP_END_MV: u32 = 13_600;
/// Step size (mV) of the post-bring-up ramp-down.
pub const RAMP_STEP_MV: u32 = 200;
/// Settle time between ramp steps.
pub const RAMP_STEP_DELAY: Duration = Duration::from_millis(100);
/// Settle time after the ramp reaches its target.
pub const RAMP_FINAL_SETTLE: Duration = Duration::from_secs(2);

/// Ramp voltage down from [`RAMP_START_MV`] to [`RAMP_END_MV`] in [`RAMP_STEP_MV`] steps,
/// pausing [`RAMP_STEP_DELAY`] between steps and [`RAMP_FINAL_SETTLE`] at the end. Run once
/// bring-up has completed and the chain is ready for steady-state operation.
pub fn ramp_down_voltage(power: &dyn PowerInterface) -> Result<()> {
    let mut mv = RAMP_START_MV;
    while mv > RAMP_END_MV {
        power.set_voltage(mv)?;
        sleep(RAMP_STEP_DELAY);
        mv -= RAMP_STEP_MV;
    }
    power.set_voltage(RAMP_END_MV)?;
    sleep(RAMP_FINAL_SETTLE);
    info!("voltage ramp complete, settled at {} mV", RAMP_END_MV);
    Ok(())
}

/// No-op [`PowerInterface`] that always succeeds. Used by tests and by the bring-up CLI's
/// `--no-power` escape hatch, where the PSU/PIC collaborator is unavailable or undesired.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPower;

impl PowerInterface for NullPower {
    fn power_on(&self, _mv: u32) -> Result<()> {
        Ok(())
    }

    fn set_voltage(&self, _mv: u32) -> Result<()> {
        Ok(())
    }

    fn enable_dc_dc(&self, _chain: u8) -> Result<()> {
        Ok(())
    }
}

/// A [`PowerInterface`] stand-in that always fails, for testing the Orchestrator's error
/// propagation out of the power layer.
#[cfg(test)]
pub struct FailingPower;

#[cfg(test)]
impl PowerInterface for FailingPower {
    fn power_on(&self, _mv: u32) -> Result<()> {
        Err(ErrorKind::PowerError("power_on: injected failure".into()).into())
    }

    fn set_voltage(&self, _mv: u32) -> Result<()> {
        Err(ErrorKind::PowerError("set_voltage: injected failure".into()).into())
    }

    fn enable_dc_dc(&self, _chain: u8) -> Result<()> {
        Err(ErrorKind::PowerError("enable_dc_dc: injected failure".into()).into())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_null_power_always_succeeds() {
        let power = NullPower;
        assert!(power.power_on(13_600).is_ok());
        assert!(power.set_voltage(13_000).is_ok());
        assert!(power.enable_dc_dc(0).is_ok());
    }

    #[test]
    fn test_ramp_down_voltage_with_null_power() {
        assert!(ramp_down_voltage(&NullPower).is_ok());
    }

    #[test]
    fn test_ramp_down_voltage_propagates_power_error() {
        let result = ramp_down_voltage(&FailingPower);
        assert!(result.is_err());
    }
}
