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

//! Process-wide structured logger. Call sites use the macros in [`macros`] instead of
//! threading a `slog::Logger` through every function signature.

use slog::Drain;

lazy_static::lazy_static! {
    pub static ref LOGGER: slog::Logger = build_logger();
}

fn build_logger() -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_envlogger::LogBuilder::new(drain)
        .parse(&std::env::var("DRIVER_LOG").unwrap_or_default())
        .build();
    let drain = slog_async::Async::new(drain).build().fuse();
    slog::Logger::root(drain, slog::o!())
}

/// Re-exports the standard severity macros bound to the crate-global [`LOGGER`], mirroring
/// the ergonomics of an internal logging facade: call sites write `trace!(...)` without
/// importing or passing a logger handle.
pub mod macros {
    #[macro_export]
    macro_rules! trace {
        ($($args:tt)+) => { slog::trace!($crate::logging::LOGGER, $($args)+) };
    }
    #[macro_export]
    macro_rules! debug {
        ($($args:tt)+) => { slog::debug!($crate::logging::LOGGER, $($args)+) };
    }
    #[macro_export]
    macro_rules! info {
        ($($args:tt)+) => { slog::info!($crate::logging::LOGGER, $($args)+) };
    }
    #[macro_export]
    macro_rules! warn {
        ($($args:tt)+) => { slog::warn!($crate::logging::LOGGER, $($args)+) };
    }
    #[macro_export]
    macro_rules! error {
        ($($args:tt)+) => { slog::error!($crate::logging::LOGGER, $($args)+) };
    }

    pub use crate::debug;
    pub use crate::error;
    pub use crate::info;
    pub use crate::trace;
    pub use crate::warn;
}
