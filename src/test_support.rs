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

//! In-memory stand-ins for [`crate::mmio::RegisterFile`], used by every test in this crate
//! so the driver above the raw `mmap` call can be exercised without hardware.

use crate::delay::Delay;
use crate::error::{ErrorKind, Result};
use crate::mmio::{RegisterFile, WINDOW_WORDS};
use std::cell::RefCell;
use std::time::Duration;

/// Direct byte offset of the UART trigger register (`crate::transport::UART_TRIGGER`,
/// private to that module). A real FPGA clears bit 31 as soon as the send completes; this
/// mock simulates a hardware that completes every send immediately, by stripping the bit
/// right back off on write instead of latching it like an ordinary register.
const UART_TRIGGER: usize = 0x0C0;

/// A plain `[u32; WINDOW_WORDS]` backing store behind the same [`RegisterFile`] trait the
/// real mmap-backed implementation satisfies.
pub struct MockRegisterFile {
    words: RefCell<[u32; WINDOW_WORDS]>,
}

impl MockRegisterFile {
    pub fn new() -> Self {
        Self {
            words: RefCell::new([0u32; WINDOW_WORDS]),
        }
    }
}

impl RegisterFile for MockRegisterFile {
    fn read_word(&self, byte_offset: usize) -> Result<u32> {
        if byte_offset % 4 != 0 || byte_offset >= WINDOW_WORDS * 4 {
            return Err(ErrorKind::InvalidRegister(byte_offset).into());
        }
        Ok(self.words.borrow()[byte_offset / 4])
    }

    fn write_word(&self, byte_offset: usize, value: u32) -> Result<()> {
        if byte_offset % 4 != 0 || byte_offset >= WINDOW_WORDS * 4 {
            return Err(ErrorKind::InvalidRegister(byte_offset).into());
        }
        let value = if byte_offset == UART_TRIGGER { value & !(1 << 31) } else { value };
        self.words.borrow_mut()[byte_offset / 4] = value;
        Ok(())
    }
}

/// One entry of a [`RecordingRegisterFile`]'s trace: either a register write or an injected
/// [`Delay::sleep`] call, in the order they were issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    Write(usize, u32),
    Delay(Duration),
}

/// Decorates any [`RegisterFile`] and records every write and every [`Delay::sleep`] call
/// into a single ordered trace, for golden-trace comparison against the Orchestrator's
/// documented (offset, value, delay) phase sequence. Also implements [`Delay`] itself --
/// pass the same instance as both the `RegisterFile` and the `Delay` a phase function takes,
/// and `trace()`/`delays()` recover the exact interleaving that was issued. Sleeps are
/// recorded, not actually taken, so a bring-up run against this recorder completes
/// instantly regardless of how many hardware-mandated seconds it documents.
pub struct RecordingRegisterFile<R: RegisterFile> {
    inner: R,
    trace: RefCell<Vec<TraceEvent>>,
}

impl<R: RegisterFile> RecordingRegisterFile<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            trace: RefCell::new(Vec::new()),
        }
    }

    /// Every write and delay, in issue order.
    pub fn trace(&self) -> Vec<TraceEvent> {
        self.trace.borrow().clone()
    }

    /// Just the `(offset, value)` pairs, in issue order.
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.trace
            .borrow()
            .iter()
            .filter_map(|e| match *e {
                TraceEvent::Write(offset, value) => Some((offset, value)),
                TraceEvent::Delay(_) => None,
            })
            .collect()
    }

    /// Just the injected delays, in issue order.
    pub fn delays(&self) -> Vec<Duration> {
        self.trace
            .borrow()
            .iter()
            .filter_map(|e| match *e {
                TraceEvent::Delay(d) => Some(d),
                TraceEvent::Write(..) => None,
            })
            .collect()
    }
}

impl<R: RegisterFile> RegisterFile for RecordingRegisterFile<R> {
    fn read_word(&self, byte_offset: usize) -> Result<u32> {
        self.inner.read_word(byte_offset)
    }

    fn write_word(&self, byte_offset: usize, value: u32) -> Result<()> {
        self.trace.borrow_mut().push(TraceEvent::Write(byte_offset, value));
        self.inner.write_word(byte_offset, value)
    }
}

impl<R: RegisterFile> Delay for RecordingRegisterFile<R> {
    fn sleep(&self, duration: Duration) {
        self.trace.borrow_mut().push(TraceEvent::Delay(duration));
    }
}

/// A [`Delay`] that never actually waits. Used by every test that exercises a multi-phase
/// sequence (the Orchestrator, chain reset/enumeration) without caring about timing, so
/// hardware-mandated seconds of sleep don't become seconds of test wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDelay;

impl Delay for NoopDelay {
    fn sleep(&self, _duration: Duration) {}
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_recording_register_file_captures_writes_in_order() {
        let regs = RecordingRegisterFile::new(MockRegisterFile::new());
        regs.write_word(0x000, 0x11).unwrap();
        regs.write_word(0x004, 0x22).unwrap();
        regs.write_logical(13, 0x33).unwrap();
        assert_eq!(regs.writes(), vec![(0x000, 0x11), (0x004, 0x22), (0x034, 0x33)]);
        assert_eq!(regs.read_word(0x034).unwrap(), 0x33);
    }

    #[test]
    fn test_recording_register_file_interleaves_writes_and_delays_in_issue_order() {
        let regs = RecordingRegisterFile::new(MockRegisterFile::new());
        regs.write_word(0x000, 0x11).unwrap();
        regs.sleep(Duration::from_millis(10));
        regs.write_word(0x004, 0x22).unwrap();
        assert_eq!(
            regs.trace(),
            vec![
                TraceEvent::Write(0x000, 0x11),
                TraceEvent::Delay(Duration::from_millis(10)),
                TraceEvent::Write(0x004, 0x22),
            ]
        );
    }

    #[test]
    fn test_noop_delay_does_not_block() {
        NoopDelay.sleep(Duration::from_secs(2));
    }
}
