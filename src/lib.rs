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
//! Ship application log records to [Graylog] as [GELF] over UDP
//!
//! [Graylog]: https://graylog.org
//! [GELF]: https://go2docs.graylog.org/current/getting_in_log_data/gelf.html
//!
//! # Introduction
//!
//! GELF (the Graylog Extended Log Format) is a JSON log message schema: a handful of fixed fields
//! (`version`, `host`, `short_message`, `timestamp`, `level` & so on) plus any number of
//! "additional fields" on which Graylog can filter & sort. Over UDP, a message too large for one
//! datagram is split into (at most 128) chunks that the server reassembles.
//!
//! This crate takes generic log records (a payload, a severity, a category & a timestamp),
//! enriches each with request, session, identity & transaction correlation fields supplied by the
//! host application, & sends the result to a Graylog UDP input. Delivery is fire-and-forget.
//!
//! The translation happens in a few steps:
//!
//! 1. the record's [`Payload`](record::Payload) is normalized to text; an
//!    [`Envelope`](envelope::Envelope) contributes its fields as additional fields
//! 2. correlation fields are resolved through a [`ContextProvider`](context::ContextProvider)
//! 3. a [`GelfMessage`](message::GelfMessage) is assembled
//! 4. it is encoded & [chunked](chunk::Chunker)
//! 5. each datagram is handed to a [`Transport`](transport::Transport)
//!
//! [`GelfTarget`](target::GelfTarget) drives all of this.
//!
//! # Usage
//!
//! Hand batches of records directly to a [`GelfTarget`](target::GelfTarget):
//!
//! ```no_run
//! use gelf_tracing::{
//!     config::GelfConfig, envelope::Envelope, level::Severity, record::LogRecord,
//!     target::GelfTarget,
//! };
//! use serde_json::json;
//!
//! let mut target = GelfTarget::new(
//!     GelfConfig::builder()
//!         .source("billing-01")
//!         .host("graylog.internal")
//!         .build(),
//! )
//! .unwrap();
//!
//! let report = target.export(vec![
//!     LogRecord::new("start proceed transaction", Severity::Info, "billing"),
//!     LogRecord::new(
//!         Envelope::make("charged card", [("amount", json!(1250))]),
//!         Severity::Info,
//!         "billing",
//!     ),
//!     LogRecord::new("end proceed transaction", Severity::Info, "billing"),
//! ]);
//! assert!(report.is_ok());
//! ```
//!
//! or install a [`GelfLayer`](layer::GelfLayer) in your [`tracing`] subscriber:
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//!
//! ```no_run
//! use gelf_tracing::{config::GelfConfig, layer::GelfLayer, target::GelfTarget};
//! use tracing::info;
//! use tracing_subscriber::layer::SubscriberExt; // Needed to get `with()`
//! use tracing_subscriber::registry::Registry;
//!
//! let target = GelfTarget::new(
//!     GelfConfig::builder().source_from_hostname().unwrap().build(),
//! )
//! .unwrap();
//! let subscriber = Registry::default().with(GelfLayer::new(target));
//! let _guard = tracing::subscriber::set_default(subscriber);
//!
//! info!(order = 1234, "Hello, world!");
//! ```
//!
//! # Correlation fields
//!
//! Every message carries `logStep`, `ip`, `userID`, `sessionID`, `levelName`, `category`,
//! `requestID`, `requestURI`, `transactionID`, `microtime` & `traceId` as additional fields, and
//! its `short_message` & `full_message` both read:
//!
//! ```text
//! 2023-11-14 22:13:20.123456 [ip][userID][sessionID][levelName][category][requestID][requestURI] [transactionID] text
//! ```
//!
//! Times are rendered in UTC. `logStep` counts records since the last one whose text contained
//! the configured reset marker (by default `"end proceed transaction"`); the request id is
//! computed once & reused until that same reset.

pub mod chunk;
pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod layer;
pub mod level;
pub mod message;
pub mod record;
pub mod target;
pub mod transport;
