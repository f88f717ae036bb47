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
//! GELF [1.1] messages & their wire encoding.
//!
//! [1.1]: https://go2docs.graylog.org/current/getting_in_log_data/gelf.html
//!
//! On the wire a GELF message is a single JSON object. The fields `version`, `host`,
//! `short_message` & `timestamp` are required; `full_message` & `level` are optional. Anything
//! else is an "additional field" and must be prefixed with an underscore. Graylog accepts only
//! strings & numbers (and booleans) for additional fields, and reserves `_id`.

use crate::{
    error::{Error, Result},
    level::Level,
};

use serde::ser::{Error as _, Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

/// A GELF message, ready to be encoded.
#[derive(Clone, Debug, PartialEq)]
pub struct GelfMessage {
    pub host: String,
    pub short_message: String,
    pub full_message: Option<String>,
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    pub level: Level,
    /// Additional fields, keyed *without* the leading underscore
    pub additional: Map<String, Value>,
}

impl GelfMessage {
    pub const VERSION: &'static str = "1.1";

    pub fn new<H: Into<String>, M: Into<String>>(
        host: H,
        short_message: M,
        timestamp: f64,
        level: Level,
    ) -> GelfMessage {
        GelfMessage {
            host: host.into(),
            short_message: short_message.into(),
            full_message: None,
            timestamp,
            level,
            additional: Map::new(),
        }
    }
    /// Set (or replace) an additional field.
    pub fn set_additional<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.additional.insert(key.into(), value.into());
    }
    /// Encode this message as GELF JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(Error::from)
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key != "id"
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b == b'-')
}

/// Reduce `value` to something Graylog will index: nested values are flattened to their JSON
/// text, & `null` is dropped.
fn wire_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Bool(_) | Value::Number(_) | Value::String(_) => Some(value.clone()),
        Value::Array(_) | Value::Object(_) => Some(Value::String(value.to_string())),
    }
}

impl Serialize for GelfMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if !self.timestamp.is_finite() {
            return Err(S::Error::custom(format!(
                "timestamp {} is not a finite number",
                self.timestamp
            )));
        }
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("version", Self::VERSION)?;
        map.serialize_entry("host", &self.host)?;
        map.serialize_entry("short_message", &self.short_message)?;
        if let Some(full) = &self.full_message {
            map.serialize_entry("full_message", full)?;
        }
        map.serialize_entry("timestamp", &self.timestamp)?;
        map.serialize_entry("level", &(self.level as u8))?;
        for (key, value) in self.additional.iter() {
            if !is_valid_key(key) {
                warn!("Dropping additional field {:?}: not a legal GELF field name", key);
                continue;
            }
            if let Some(value) = wire_value(value) {
                map.serialize_entry(&format!("_{}", key), &value)?;
            }
        }
        map.end()
    }
}
