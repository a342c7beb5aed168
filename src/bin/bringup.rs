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

//! Process entry point: parses [`hashchain_driver::config::DriverConfig`], opens the FPGA
//! device, runs the Orchestrator across every configured chain, and reports per-chain
//! success/failure with a non-zero exit on any failure.

use hashchain_driver::config::DriverConfig;
use hashchain_driver::context::DriverContext;
use hashchain_driver::delay::RealDelay;
use hashchain_driver::power::NullPower;
use hashchain_driver::{error, info};

fn main() {
    let config = DriverConfig::from_args();
    let num_chains = config.num_chains;
    if !config.no_power {
        eprintln!("warning: no PSU/PIC power backend is built into this crate (see the power module's scope note); running as if --no-power was given");
    }

    let mut ctx = match DriverContext::open(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("failed to open FPGA device: {}", e);
            std::process::exit(1);
        }
    };

    // No concrete PowerInterface ships with this crate (§4.J is contract-only); the
    // factory-test harness that consumes this binary in production injects the real PSU/PIC
    // backend in its place.
    match ctx.bring_up_all(&NullPower, &RealDelay) {
        Ok(()) => {
            info!("bring-up complete for {} chain(s)", num_chains);
            for (i, state) in ctx.chain_states().iter().enumerate() {
                println!(
                    "chain {}: detected={} chips={} pll_locked={}",
                    i, state.detected, state.chips, state.pll_locked
                );
            }
        }
        Err(e) => {
            error!("bring-up failed: {}", e);
            eprintln!("bring-up failed: {}", e);
            std::process::exit(1);
        }
    }
}
