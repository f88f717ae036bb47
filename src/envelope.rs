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
//! Packaging a message together with structured, filterable fields.
//!
//! Logging APIs generally accept a single, opaque payload per call. An [`Envelope`] carries both
//! the free-text message & a map of additional fields through that one slot; the
//! [`GelfTarget`](crate::target::GelfTarget) unpacks it on the other side, turning every entry in
//! [`Envelope::add`] into a GELF additional field.
//!
//! ```rust
//! use gelf_tracing::envelope::Envelope;
//! use serde_json::json;
//!
//! let env = Envelope::make("payment accepted", [("param", json!(123321))]);
//! assert_eq!(env.message, "payment accepted");
//! assert_eq!(env.add["param"], json!(123321));
//! ```
//!
//! Sent anywhere other than a GELF pipeline (a flat file, say) an [`Envelope`] simply serializes
//! as the nested map `{"message": ..., "add": {...}}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A textual message plus its additional fields
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub message: String,
    #[serde(default)]
    pub add: Map<String, Value>,
}

impl Envelope {
    /// Build an [`Envelope`] from a message & any number of `(name, value)` pairs. Later
    /// duplicates of a name replace earlier ones.
    pub fn make<M, I, K>(message: M, additional_fields: I) -> Envelope
    where
        M: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Envelope {
            message: message.into(),
            add: additional_fields
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        }
    }
    /// Build an [`Envelope`] with no additional fields.
    pub fn text<M: Into<String>>(message: M) -> Envelope {
        Envelope {
            message: message.into(),
            add: Map::new(),
        }
    }
    /// Recognize an [`Envelope`] in an arbitrary value: it must be an object carrying a string
    /// `message` and an object `add`. Other keys are ignored.
    pub fn from_value(value: &Value) -> Option<Envelope> {
        let obj = value.as_object()?;
        let message = obj.get("message")?.as_str()?;
        let add = obj.get("add")?.as_object()?;
        Some(Envelope {
            message: message.to_owned(),
            add: add.clone(),
        })
    }
}
