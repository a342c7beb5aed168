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

//! Error taxonomy for the hash chain bring-up driver.

use failure::{Backtrace, Context, Fail};
use std::fmt::{self, Debug, Display};
use std::io;

pub struct Error {
    inner: Context<ErrorKind>,
}

#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
    /// Device open or mmap of the FPGA window failed.
    #[fail(display = "mmap failed: {}", _0)]
    MmapFailed(String),

    /// Logical register index was out of the 0..110 table range.
    #[fail(display = "invalid register index {}", _0)]
    InvalidRegister(usize),

    /// UART send-trigger bit (0x0C0 bit 31) never cleared.
    #[fail(display = "chain {}: UART timeout", _0)]
    UartTimeout(u8),

    /// No register reply arrived within the caller-supplied timeout.
    #[fail(display = "chain {}: register read timed out after {:?}", _0, _1)]
    RegReadTimeout(u8, std::time::Duration),

    /// `n` chips failed to take their assigned address during enumeration.
    #[fail(display = "chain {}: {} chips failed to enumerate", _0, _1)]
    EnumError(u8, usize),

    /// Requested frequency has no valid divider combination.
    #[fail(display = "PLL: unsupported frequency {} MHz", _0)]
    PllUnsupported(f64),

    /// Work FIFO buffer-space bit never set for the target chain.
    #[fail(display = "chain {}: work FIFO full", _0)]
    FifoFull(u8),

    /// PSU/PIC power-control collaborator reported a failure.
    #[fail(display = "power: {}", _0)]
    PowerError(String),

    /// Generic I/O error not otherwise classified.
    #[fail(display = "IO: {}", _0)]
    Io(String),

    /// Orchestrator phase failed; wraps the underlying cause with the phase name.
    #[fail(display = "phase '{}' failed: {}", _0, _1)]
    Phase(&'static str, String),
}

/// Implement Fail trait instead of using Derive to get more control over the custom type.
/// The main advantage is customization of the Context type, which allows conversion of
/// any error type into this custom error with a general error kind by calling the
/// `context` method on any result type.
impl Fail for Error {
    fn cause(&self) -> Option<&dyn Fail> {
        self.inner.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.inner.backtrace()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Debug::fmt(&self.inner, f)
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        self.inner.get_context().clone()
    }

    /// Wrap `self` with the name of the orchestrator phase it occurred in.
    pub fn in_phase(self, phase: &'static str) -> Self {
        let msg = self.to_string();
        ErrorKind::Phase(phase, msg).into()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            inner: Context::new(kind),
        }
    }
}

impl From<Context<ErrorKind>> for Error {
    fn from(inner: Context<ErrorKind>) -> Self {
        Self { inner }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        let msg = e.to_string();
        Self {
            inner: e.context(ErrorKind::Io(msg)),
        }
    }
}

impl From<nix::Error> for Error {
    fn from(e: nix::Error) -> Self {
        let msg = e.to_string();
        Self {
            inner: e.context(ErrorKind::MmapFailed(msg)),
        }
    }
}

/// A specialized `Result` type bound to [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
