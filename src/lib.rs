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

//! Userspace driver for a 114-ASIC hash chain attached via an FPGA MMIO bridge: chip
//! discovery and addressing, PLL/baud/core bring-up, work submission, and nonce collection.
//!
//! The kernel character driver behind the MMIO window, the PSU/PIC power subsystem, and
//! pool/job-level concerns are external collaborators; see [`power`] for where the power
//! contract is drawn.

pub mod asic;
pub mod chain;
pub mod clocking;
pub mod config;
pub mod context;
pub mod crc5;
pub mod delay;
pub mod error;
pub mod logging;
pub mod mmio;
pub mod nonce;
pub mod orchestrator;
pub mod power;
pub mod transport;
pub mod work;

#[cfg(test)]
pub mod test_support;

pub use context::DriverContext;
pub use error::{Error, ErrorKind, Result};
