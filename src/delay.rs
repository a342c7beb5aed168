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

//! Injectable delay, so the hardware-mandated sleeps in the Bring-Up Orchestrator
//! (`crate::orchestrator`) and the chain reset/enumeration sequences it drives
//! (`crate::chain`) can be driven by a real clock in production and captured by a trace
//! recorder in tests, the same way `crate::power::PowerInterface` is injected rather than
//! hard-wired to a concrete I²C backend.

use std::time::Duration;

/// A single hardware-mandated wait. Implementations must not shorten `duration`; the
/// phases that call this are named, fixed delays, not tunable parameters.
pub trait Delay {
    fn sleep(&self, duration: Duration);
}

/// Sleeps for real. Used by the production bring-up path.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealDelay;

impl Delay for RealDelay {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
