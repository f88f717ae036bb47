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
//! Pipeline configuration.
//!
//! [`GelfConfig`] may be built in code:
//!
//! ```rust
//! use gelf_tracing::config::{GelfConfig, CHUNK_SIZE_WAN};
//! let config = GelfConfig::builder()
//!     .source("billing-01")
//!     .host("graylog.internal")
//!     .chunk_size(CHUNK_SIZE_WAN)
//!     .build();
//! assert_eq!(config.port, 12201);
//! ```
//!
//! or deserialized from any [serde] format; every field but `source` has a default.
//!
//! [serde]: https://serde.rs

use crate::error::{Error, Result};

use backtrace::Backtrace;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Conservative datagram size for a LAN
pub const CHUNK_SIZE_LAN: usize = 8154;
/// Conservative datagram size across the Internet
pub const CHUNK_SIZE_WAN: usize = 1420;

/// Default substring that marks the end of a logical transaction
pub const DEFAULT_RESET_MARKER: &str = "end proceed transaction";

/// Everything a [`GelfTarget`](crate::target::GelfTarget) needs to know.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GelfConfig {
    /// The GELF `host` field; required
    pub source: String,
    /// Graylog input host
    pub host: String,
    /// Graylog input port
    pub port: u16,
    /// Default facility; not currently sent
    pub facility: String,
    /// Largest datagram to send, chunk header included
    pub chunk_size: usize,
    /// Additional fields attached to every message
    pub additional_fields: Map<String, Value>,
    /// Reserved: attach the authenticated user's name to every message
    pub add_username: bool,
    /// A record whose text contains this resets the log step counter & request id
    pub reset_marker: String,
}

impl std::default::Default for GelfConfig {
    fn default() -> Self {
        GelfConfig {
            source: String::new(),
            host: "127.0.0.1".to_owned(),
            port: 12201,
            facility: "gelf-tracing".to_owned(),
            chunk_size: CHUNK_SIZE_LAN,
            additional_fields: Map::new(),
            add_username: false,
            reset_marker: DEFAULT_RESET_MARKER.to_owned(),
        }
    }
}

impl GelfConfig {
    pub fn builder() -> GelfConfigBuilder {
        GelfConfigBuilder {
            imp: GelfConfig::default(),
        }
    }
    /// Check the one thing that can make a configuration unusable: a missing `source`.
    pub fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            Err(Error::configuration("graylog source not set"))
        } else {
            Ok(())
        }
    }
}

/// Attempt to figure-out a `source` for this host: the hostname if we can get one as UTF-8,
/// else a local IP address.
fn discover_source() -> Result<String> {
    hostname::get()
        .map_err(|err| Error::NoHostname {
            source: Box::new(err),
            back: Backtrace::new(),
        })
        .and_then(|hn| {
            hn.into_string().map_err(|hn| Error::NoHostname {
                source: format!("{:?} is not valid UTF-8", hn).into(),
                back: Backtrace::new(),
            })
        })
        .or_else(|_err| {
            local_ip_address::local_ip()
                .map(|ip| ip.to_string())
                .map_err(|err| Error::NoHostname {
                    source: Box::new(err),
                    back: Backtrace::new(),
                })
        })
}

pub struct GelfConfigBuilder {
    imp: GelfConfig,
}

impl GelfConfigBuilder {
    pub fn source<S: Into<String>>(mut self, source: S) -> Self {
        self.imp.source = source.into();
        self
    }
    /// Use this machine's hostname (or, failing that, a local IP address) as the source.
    pub fn source_from_hostname(mut self) -> Result<Self> {
        self.imp.source = discover_source()?;
        Ok(self)
    }
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.imp.host = host.into();
        self
    }
    pub fn port(mut self, port: u16) -> Self {
        self.imp.port = port;
        self
    }
    pub fn facility<S: Into<String>>(mut self, facility: S) -> Self {
        self.imp.facility = facility.into();
        self
    }
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.imp.chunk_size = chunk_size;
        self
    }
    pub fn additional_field<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.imp.additional_fields.insert(key.into(), value.into());
        self
    }
    pub fn add_username(mut self, add_username: bool) -> Self {
        self.imp.add_username = add_username;
        self
    }
    pub fn reset_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.imp.reset_marker = marker.into();
        self
    }
    pub fn build(self) -> GelfConfig {
        self.imp
    }
}
