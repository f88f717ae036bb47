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
//! [gelf-tracing](crate) errors

use backtrace::Backtrace;

/// [gelf-tracing](crate) error type
///
/// [gelf-tracing](crate) eschews libraries like [thiserror], [anyhow] & [Snafu] in favor of
/// a straightforward enumeration with a few match arms chosen on the basis what the caller will
/// need to respond.
///
/// Only [`Error::Configuration`] is ever fatal; it is returned when a
/// [`GelfTarget`](crate::target::GelfTarget) is constructed. Everything else is a per-record (or
/// per-datagram) failure that [`GelfTarget::export`](crate::target::GelfTarget::export) collects
/// and keeps going.
///
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
/// [Snafu]: https://docs.rs/snafu/latest/snafu
#[non_exhaustive]
pub enum Error {
    /// The pipeline was mis-configured (e.g. no `source`)
    Configuration {
        reason: String,
        back: Backtrace,
    },
    /// A GELF message could not be encoded as JSON
    Serialization {
        source: serde_json::Error,
        back: Backtrace,
    },
    /// An encoded message would need more than the GELF maximum number of chunks
    ChunkLimitExceeded {
        chunks: usize,
        limit: usize,
        back: Backtrace,
    },
    /// Failed to fetch hostname (via libc)
    NoHostname {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// General transport layer error
    Transport {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
}

impl Error {
    pub(crate) fn configuration<S: Into<String>>(reason: S) -> Error {
        Error::Configuration {
            reason: reason.into(),
            back: Backtrace::new(),
        }
    }
    pub(crate) fn transport(err: std::io::Error) -> Error {
        Error::Transport {
            source: Box::new(err),
            back: Backtrace::new(),
        }
    }
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Configuration { reason, .. } => write!(f, "Bad GELF configuration: {}", reason),
            Error::Serialization { source, .. } => {
                write!(f, "While encoding a GELF message, got {}", source)
            }
            Error::ChunkLimitExceeded { chunks, limit, .. } => write!(
                f,
                "GELF message would need {} chunks, but at most {} are allowed",
                chunks, limit
            ),
            Error::NoHostname { source, .. } => {
                write!(f, "Couldn't discover a hostname for this machine: {}", source)
            }
            Error::Transport { source, .. } => write!(f, "Transport error: {}", source),
            _ => write!(f, "Other gelf-tracing error"),
        }
    }
}

impl std::fmt::Debug for Error {
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Configuration { reason: _, back } => write!(f, "{}\n{:#?}", self, back),
            Error::Serialization { source: _, back } => write!(f, "{}\n{:#?}", self, back),
            Error::ChunkLimitExceeded { back, .. } => write!(f, "{}\n{:#?}", self, back),
            Error::NoHostname { source: _, back } => write!(f, "{}\n{:#?}", self, back),
            Error::Transport { source: _, back } => write!(f, "{}\n{:#?}", self, back),
            err => write!(f, "gelf-tracing error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    #[allow(unreachable_patterns)]
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Serialization { source, .. } => Some(source),
            Error::NoHostname { source, .. } | Error::Transport { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

impl std::convert::From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization {
            source: err,
            back: Backtrace::new(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
