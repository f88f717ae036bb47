// Copyright (C) 2022-2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of gelf-tracing.
//
// gelf-tracing is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// gelf-tracing is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with gelf-tracing.  If
// not, see <http://www.gnu.org/licenses/>.
//! Host severities & GELF level definitions.
//!
//! [`Severity`] is the severity as the host logging framework sees it; [`Level`] replicates the
//! syslog levels GELF uses on the wire (the names used in `<syslog.h>`). The mapping between the
//! two is fixed.

type StdResult<T, E> = std::result::Result<T, E>;

/// Severity levels used by the host logging framework.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Trace,
    /// A profiling block was entered
    ProfileBegin,
    /// A profiling block was exited
    ProfileEnd,
    /// A profiling sample not tied to a begin/end pair
    Profile,
}

impl Severity {
    /// The human-readable name for this severity, as it appears in the `levelName` field.
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Trace => "trace",
            Severity::ProfileBegin => "profile begin",
            Severity::ProfileEnd => "profile end",
            Severity::Profile => "profile",
        }
    }
    /// Map this severity to a GELF level; anything not in the table is [`Level::LOG_INFO`].
    pub fn gelf_level(&self) -> Level {
        match self {
            Severity::Trace | Severity::ProfileBegin | Severity::ProfileEnd => Level::LOG_DEBUG,
            Severity::Info => Level::LOG_INFO,
            Severity::Warning => Level::LOG_WARNING,
            Severity::Error => Level::LOG_ERR,
            _ => Level::LOG_INFO,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{}", self.name())
    }
}

impl std::convert::From<&tracing::Level> for Severity {
    fn from(level: &tracing::Level) -> Self {
        match level {
            &tracing::Level::TRACE | &tracing::Level::DEBUG => Severity::Trace,
            &tracing::Level::INFO => Severity::Info,
            &tracing::Level::WARN => Severity::Warning,
            &tracing::Level::ERROR => Severity::Error,
        }
    }
}

/// GELF uses the eight syslog severity levels for its `level` field. The enumeration values
/// duplicate the constants documented as per the `syslog()` manual [page] & defined in
/// `<syslog.h>`.
///
/// [page]: https://man7.org/linux/man-pages/man3/syslog.3.html
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Level {
    /// system is unusable
    LOG_EMERG,
    /// action must be take immediately
    LOG_ALERT,
    /// critical conditions
    LOG_CRIT,
    /// error conditions
    LOG_ERR,
    /// warning conditions
    LOG_WARNING,
    /// normal, but significant condition
    LOG_NOTICE,
    /// informational message
    LOG_INFO,
    /// debug-level message
    LOG_DEBUG,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                Level::LOG_EMERG => "LOG_EMERG",
                Level::LOG_ALERT => "LOG_ALERT",
                Level::LOG_CRIT => "LOG_CRIT",
                Level::LOG_ERR => "LOG_ERR",
                Level::LOG_WARNING => "LOG_WARNING",
                Level::LOG_NOTICE => "LOG_NOTICE",
                Level::LOG_INFO => "LOG_INFO",
                Level::LOG_DEBUG => "LOG_DEBUG",
            }
        )
    }
}
