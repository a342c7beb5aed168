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

//! Runtime configuration of the driver itself, parsed once at process start: MMIO device
//! path, chain count, target frequency/voltage, and verbosity. Distinct from the
//! explicitly out-of-scope persistent configuration of pool/job state.

use clap::{App, Arg};
use std::path::PathBuf;

/// Kernel character device name the core opens and `mmap`s.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/axi_fpga_dev";

const DEFAULT_CHAINS: &str = "3";
const DEFAULT_FREQUENCY_MHZ: &str = "525.0";
const DEFAULT_VOLTAGE_MV: &str = "13600";

/// Parsed command-line configuration for the `bringup` tool. Read-only after
/// construction; owned by the Driver Context for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    pub device_path: PathBuf,
    pub num_chains: u8,
    pub frequency_mhz: f64,
    pub voltage_mv: u32,
    pub verbosity: u8,
    pub no_power: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(DEFAULT_DEVICE_PATH),
            num_chains: DEFAULT_CHAINS.parse().expect("built-in default parses"),
            frequency_mhz: DEFAULT_FREQUENCY_MHZ.parse().expect("built-in default parses"),
            voltage_mv: DEFAULT_VOLTAGE_MV.parse().expect("built-in default parses"),
            verbosity: 0,
            no_power: false,
        }
    }
}

impl DriverConfig {
    /// Build the `clap::App` definition for the `bringup` binary.
    pub fn app() -> App<'static, 'static> {
        App::new("bringup")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Brings up and drives a hash chain over the FPGA MMIO bridge")
            .arg(
                Arg::with_name("device")
                    .long("device")
                    .value_name("PATH")
                    .help("MMIO character device to open")
                    .default_value(DEFAULT_DEVICE_PATH)
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("chains")
                    .long("chains")
                    .value_name("N")
                    .help("Number of chains to probe")
                    .default_value(DEFAULT_CHAINS)
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("frequency")
                    .long("frequency")
                    .value_name("MHZ")
                    .help("Target chip frequency in MHz")
                    .default_value(DEFAULT_FREQUENCY_MHZ)
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("voltage")
                    .long("voltage")
                    .value_name("MV")
                    .help("Target rail voltage in millivolts")
                    .default_value(DEFAULT_VOLTAGE_MV)
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("no-power")
                    .long("no-power")
                    .help("Skip the power collaborator and use a no-op stand-in")
                    .required(false),
            )
            .arg(
                Arg::with_name("verbose")
                    .short("v")
                    .long("verbose")
                    .help("Increase log verbosity (repeatable)")
                    .multiple(true)
                    .required(false),
            )
    }

    /// Parse `std::env::args()` into a [`DriverConfig`]. Parse failures are `clap`'s own
    /// process-exiting behavior (usage message on stderr, non-zero exit).
    pub fn from_args() -> Self {
        let matches = Self::app().get_matches();

        let device_path = PathBuf::from(
            matches
                .value_of("device")
                .expect("has a default_value"),
        );
        let num_chains = matches
            .value_of("chains")
            .expect("has a default_value")
            .parse()
            .expect("not a valid chain count");
        let frequency_mhz = matches
            .value_of("frequency")
            .expect("has a default_value")
            .parse()
            .expect("not a valid frequency");
        let voltage_mv = matches
            .value_of("voltage")
            .expect("has a default_value")
            .parse()
            .expect("not a valid voltage");
        let verbosity = matches.occurrences_of("verbose") as u8;
        let no_power = matches.is_present("no-power");

        Self {
            device_path,
            num_chains,
            frequency_mhz,
            voltage_mv,
            verbosity,
            no_power,
        }
    }
}
