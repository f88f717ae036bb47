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
//! Log records as handed to the pipeline by the host logging framework.

use crate::{envelope::Envelope, level::Severity};

use chrono::prelude::*;
use serde_json::{Map, Value};

/// What was actually logged.
///
/// The host framework hands us a single opaque slot; it is classified into one of four cases,
/// each of which normalizes to text differently (see [`Payload::normalize`]).
#[derive(Debug)]
pub enum Payload {
    /// Plain text, used as-is
    Text(String),
    /// An error value; rendered as `"Exception: "` followed by the error & its causes
    Exception(Box<dyn std::error::Error + Send + Sync + 'static>),
    /// A message plus additional fields
    Envelope(Envelope),
    /// Anything else; pretty-printed so nothing is silently dropped
    Value(Value),
}

impl Payload {
    pub fn exception<E>(err: E) -> Payload
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Payload::Exception(Box::new(err))
    }

    /// Reduce this payload to text. Envelope fields are copied into `fields`.
    pub fn normalize(&self, fields: &mut Map<String, Value>) -> String {
        match self {
            Payload::Text(text) => text.clone(),
            Payload::Exception(err) => {
                let mut text = format!("Exception: {}", err);
                let mut cause = err.source();
                while let Some(err) = cause {
                    text.push_str(&format!("\nCaused by: {}", err));
                    cause = err.source();
                }
                text
            }
            Payload::Envelope(env) => {
                for (k, v) in env.add.iter() {
                    fields.insert(k.clone(), v.clone());
                }
                env.message.clone()
            }
            Payload::Value(value) => format!("{:#}", value),
        }
    }
}

impl std::convert::From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl std::convert::From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_owned())
    }
}

impl std::convert::From<Envelope> for Payload {
    fn from(env: Envelope) -> Self {
        Payload::Envelope(env)
    }
}

impl std::convert::From<Value> for Payload {
    /// Classify an arbitrary value: strings are text, anything shaped like an [`Envelope`] is one,
    /// and everything else is kept as a value.
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Payload::Text(text),
            value => match Envelope::from_value(&value) {
                Some(env) => Payload::Envelope(env),
                None => Payload::Value(value),
            },
        }
    }
}

/// One log record.
#[derive(Debug)]
pub struct LogRecord {
    pub payload: Payload,
    pub severity: Severity,
    pub category: String,
    /// Seconds since the Unix epoch
    pub timestamp: f64,
}

impl LogRecord {
    /// Construct a record stamped with the current time.
    pub fn new<P, C>(payload: P, severity: Severity, category: C) -> LogRecord
    where
        P: Into<Payload>,
        C: Into<String>,
    {
        let now = Utc::now();
        LogRecord {
            payload: payload.into(),
            severity,
            category: category.into(),
            timestamp: now.timestamp() as f64 + now.timestamp_subsec_micros() as f64 / 1e6,
        }
    }
    pub fn with_timestamp(mut self, timestamp: f64) -> LogRecord {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Inner;
    impl std::fmt::Display for Inner {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "connection reset")
        }
    }
    impl std::error::Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);
    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "payment gateway unavailable")
        }
    }
    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn normalize() {
        let mut fields = Map::new();

        assert_eq!(Payload::from("plain").normalize(&mut fields), "plain");
        assert!(fields.is_empty());

        assert_eq!(
            Payload::exception(Outer(Inner)).normalize(&mut fields),
            "Exception: payment gateway unavailable\nCaused by: connection reset"
        );

        let env = Envelope::make("m", [("k", json!("v"))]);
        assert_eq!(Payload::from(env).normalize(&mut fields), "m");
        assert_eq!(fields["k"], json!("v"));

        let text = Payload::from(json!([1, 2])).normalize(&mut fields);
        assert_eq!(text, "[\n  1,\n  2\n]");
    }

    #[test]
    fn classify() {
        assert!(matches!(Payload::from(json!("s")), Payload::Text(_)));
        assert!(matches!(
            Payload::from(json!({"message": "m", "add": {}})),
            Payload::Envelope(_)
        ));
        assert!(matches!(
            Payload::from(json!({"message": "m"})),
            Payload::Value(_)
        ));
        assert!(matches!(Payload::from(json!(null)), Payload::Value(_)));
    }

    #[test]
    fn timestamps() {
        let rec = LogRecord::new("x", Severity::Info, "app").with_timestamp(1700000000.123456);
        assert_eq!(rec.timestamp, 1700000000.123456);
        assert!(LogRecord::new("x", Severity::Info, "app").timestamp > 1.6e9);
    }
}
