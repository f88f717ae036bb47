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
//! The GELF export pipeline.
//!
//! A [`GelfTarget`] takes batches of [`LogRecord`]s from the host logging framework and, for each
//! record in order:
//!
//! 1. normalizes the payload to text (collecting any envelope fields)
//! 2. resolves the correlation fields through its [`ContextProvider`]
//! 3. advances the log step counter (resetting it on the configured marker)
//! 4. assembles a [`GelfMessage`]
//! 5. encodes & (if need be) chunks it
//! 6. sends each datagram
//!
//! Steps 2 (the request id) & 3 mutate [`PipelineState`], which is why records are processed
//! strictly in order & why a [`GelfTarget`] must not be shared between threads without external
//! locking (see [`GelfLayer`](crate::layer::GelfLayer) for one way to do that).
//!
//! A failure on one record is recorded in the [`ExportReport`] & logged; the rest of the batch
//! is still processed.

use crate::{
    chunk::Chunker,
    config::GelfConfig,
    context::{ContextProvider, NullContext, Resolved},
    error::{Error, Result},
    message::GelfMessage,
    record::LogRecord,
    transport::{Transport, UdpTransport},
};

use chrono::prelude::*;
use tracing::{debug, warn};

/// Mutable state threaded across every record a [`GelfTarget`] processes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineState {
    log_step: u64,
    request_id: Option<String>,
}

impl PipelineState {
    /// Number of records processed since the last reset
    pub fn log_step(&self) -> u64 {
        self.log_step
    }
    /// The memoized request id, if one has been computed since the last reset
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

/// A record that could not be (fully) delivered.
#[derive(Debug)]
pub struct RecordFailure {
    /// Position of the record in its batch
    pub index: usize,
    pub error: Error,
}

/// The outcome of one [`GelfTarget::export`] call.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Records processed
    pub records: usize,
    /// Datagrams successfully handed to the transport
    pub datagrams: usize,
    pub failures: Vec<RecordFailure>,
}

impl ExportReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Render `timestamp` as `(YYYY-MM-DD HH:MM:SS.ffffff, microtime)`, in UTC.
///
/// Both use six fractional digits; the microtime is that same rendering with the decimal point
/// removed.
fn split_timestamp(timestamp: f64) -> (String, String) {
    let fixed = format!("{:.6}", timestamp);
    let (secs, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "000000"));
    let date = secs
        .parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| secs.to_owned());
    (format!("{}.{}", date, frac), fixed.replace('.', ""))
}

/// Stands in for a UDP socket we couldn't open, so that the batch is still processed (and every
/// record reports why it wasn't sent).
struct Unopened {
    reason: String,
}

impl Transport for Unopened {
    fn send(&self, _buf: &[u8]) -> Result<usize> {
        Err(Error::transport(std::io::Error::new(
            std::io::ErrorKind::NotConnected,
            self.reason.clone(),
        )))
    }
}

/// Ships [`LogRecord`]s to Graylog.
pub struct GelfTarget<C: ContextProvider = NullContext> {
    config: GelfConfig,
    context: C,
    chunker: Chunker,
    state: PipelineState,
}

impl GelfTarget<NullContext> {
    /// Construct a pipeline with no host application context; fails if `config` has no
    /// `source`.
    pub fn new(config: GelfConfig) -> Result<Self> {
        GelfTarget::with_context(config, NullContext)
    }
}

impl<C: ContextProvider> GelfTarget<C> {
    /// Construct a pipeline resolving correlation fields through `context`; fails if `config`
    /// has no `source`.
    pub fn with_context(config: GelfConfig, context: C) -> Result<Self> {
        config.validate()?;
        Ok(GelfTarget {
            chunker: Chunker::new(config.chunk_size),
            config,
            context,
            state: PipelineState::default(),
        })
    }
    pub fn config(&self) -> &GelfConfig {
        &self.config
    }
    pub fn context(&self) -> &C {
        &self.context
    }
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Send `batch` to the configured Graylog input over a freshly-opened UDP socket.
    pub fn export<I>(&mut self, batch: I) -> ExportReport
    where
        I: IntoIterator<Item = LogRecord>,
    {
        match UdpTransport::new((self.config.host.as_str(), self.config.port)) {
            Ok(transport) => self.export_with(batch, &transport),
            Err(err) => {
                warn!(
                    "Couldn't open a UDP socket to {}:{}: {}",
                    self.config.host, self.config.port, err
                );
                let reason = format!(
                    "no socket to {}:{} ({})",
                    self.config.host, self.config.port, err
                );
                self.export_with(batch, &Unopened { reason })
            }
        }
    }

    /// Send `batch` over `transport`.
    pub fn export_with<I, T>(&mut self, batch: I, transport: &T) -> ExportReport
    where
        I: IntoIterator<Item = LogRecord>,
        T: Transport + ?Sized,
    {
        let mut report = ExportReport::default();
        for (index, record) in batch.into_iter().enumerate() {
            report.records += 1;
            let msg = self.assemble(&record);
            let (sent, result) = self.publish(&msg, transport);
            report.datagrams += sent;
            if let Err(error) = result {
                warn!("Failed to send GELF record {} to Graylog: {}", index, error);
                report.failures.push(RecordFailure { index, error });
            }
        }
        debug!(
            "Exported {} records in {} datagrams ({} failures)",
            report.records,
            report.datagrams,
            report.failures.len()
        );
        report
    }

    /// Build the [`GelfMessage`] for `record`, advancing the pipeline state.
    pub fn assemble(&mut self, record: &LogRecord) -> GelfMessage {
        let mut fields = self.config.additional_fields.clone();
        let text = record.payload.normalize(&mut fields);

        let ctx = Resolved::resolve(&self.context);
        let request_id = self.request_id();
        let level_name = record.severity.name();

        self.state.log_step += 1;
        let log_step = self.state.log_step;
        if !self.config.reset_marker.is_empty() && text.contains(&self.config.reset_marker) {
            self.state.log_step = 0;
            self.state.request_id = None;
        }

        let (date_time, microtime) = split_timestamp(record.timestamp);
        let line = format!(
            "{} [{}][{}][{}][{}][{}][{}][{}] [{}] {}",
            date_time,
            ctx.ip,
            ctx.user_id,
            ctx.session_id,
            level_name,
            record.category,
            request_id,
            ctx.request_uri,
            ctx.transaction_id,
            text
        );

        let mut msg = GelfMessage::new(
            self.config.source.clone(),
            line.clone(),
            record.timestamp,
            record.severity.gelf_level(),
        );
        msg.full_message = Some(line);
        msg.additional = fields;
        msg.set_additional("logStep", log_step);
        msg.set_additional("ip", ctx.ip);
        msg.set_additional("userID", ctx.user_id);
        msg.set_additional("sessionID", ctx.session_id);
        msg.set_additional("levelName", level_name);
        msg.set_additional("category", record.category.clone());
        msg.set_additional("requestID", request_id);
        msg.set_additional("requestURI", ctx.request_uri);
        msg.set_additional("transactionID", ctx.transaction_id);
        msg.set_additional("microtime", microtime);
        msg.set_additional("traceId", ctx.trace_id);
        msg
    }

    /// The request id, computed once & reused until the next reset.
    fn request_id(&mut self) -> String {
        if !self.context.is_attached() {
            return String::new();
        }
        let context = &self.context;
        self.state
            .request_id
            .get_or_insert_with(|| {
                context
                    .inbound_request_id()
                    .unwrap_or_else(|| format!("request_id_{}", uuid::Uuid::new_v4().simple()))
            })
            .clone()
    }

    /// Encode, chunk & send `msg`. Returns the number of datagrams sent along with the first
    /// error encountered; a failed send doesn't stop the remaining chunks.
    fn publish<T>(&self, msg: &GelfMessage, transport: &T) -> (usize, Result<()>)
    where
        T: Transport + ?Sized,
    {
        let datagrams = match msg.to_json().and_then(|buf| self.chunker.split(&buf)) {
            Ok(datagrams) => datagrams,
            Err(err) => return (0, Err(err)),
        };
        let mut sent = 0;
        let mut first_err = None;
        for datagram in datagrams.iter() {
            match transport.send(datagram) {
                Ok(_) => sent += 1,
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }
        match first_err {
            Some(err) => (sent, Err(err)),
            None => (sent, Ok(())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::{
        chunk::{HEADER_LEN, MAGIC},
        config::GelfConfig,
        context::{test::Fixture, Detached},
        envelope::Envelope,
        level::Severity,
    };

    use serde_json::{json, Value};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        datagrams: RefCell<Vec<Vec<u8>>>,
    }

    impl Transport for Recorder {
        fn send(&self, buf: &[u8]) -> Result<usize> {
            self.datagrams.borrow_mut().push(buf.to_vec());
            Ok(buf.len())
        }
    }

    impl Recorder {
        /// Decode every message sent, reassembling chunks
        fn messages(&self) -> Vec<Value> {
            let mut out = Vec::new();
            let mut pending: Vec<u8> = Vec::new();
            for d in self.datagrams.borrow().iter() {
                if d.len() >= HEADER_LEN && d[0..2] == MAGIC {
                    pending.extend_from_slice(&d[HEADER_LEN..]);
                    if d[10] + 1 == d[11] {
                        out.push(serde_json::from_slice(&pending).unwrap());
                        pending.clear();
                    }
                } else {
                    out.push(serde_json::from_slice(d).unwrap());
                }
            }
            out
        }
    }

    struct Broken;

    impl Transport for Broken {
        fn send(&self, _buf: &[u8]) -> Result<usize> {
            Err(Error::transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused",
            )))
        }
    }

    fn config() -> GelfConfig {
        GelfConfig::builder().source("pay-01").build()
    }

    fn record(text: &str) -> LogRecord {
        LogRecord::new(text, Severity::Info, "app\\payments").with_timestamp(1700000000.123456)
    }

    #[test]
    fn requires_source() {
        assert!(matches!(
            GelfTarget::new(GelfConfig::default()),
            Err(Error::Configuration { .. })
        ));
        assert!(GelfTarget::new(config()).is_ok());
        assert!(GelfTarget::with_context(GelfConfig::default(), Detached).is_err());
    }

    #[test]
    fn message_layout() {
        let ctx = Fixture {
            request_id: Some("req-1".to_owned()),
            ..Default::default()
        };
        let mut target = GelfTarget::with_context(config(), ctx).unwrap();
        let rec = Recorder::default();
        let report = target.export_with(vec![record("hello")], &rec);
        assert!(report.is_ok());
        assert_eq!(report.records, 1);
        assert_eq!(report.datagrams, 1);

        let msgs = rec.messages();
        let msg = &msgs[0];
        let line =
            "2023-11-14 22:13:20.123456 [-][-][-][info][app\\payments][req-1][-] [-] hello";
        assert_eq!(msg["version"], json!("1.1"));
        assert_eq!(msg["host"], json!("pay-01"));
        assert_eq!(msg["short_message"], json!(line));
        assert_eq!(msg["full_message"], json!(line));
        assert_eq!(msg["timestamp"], json!(1700000000.123456));
        assert_eq!(msg["level"], json!(6));
        assert_eq!(msg["_logStep"], json!(1));
        assert_eq!(msg["_ip"], json!("-"));
        assert_eq!(msg["_userID"], json!("-"));
        assert_eq!(msg["_sessionID"], json!("-"));
        assert_eq!(msg["_levelName"], json!("info"));
        assert_eq!(msg["_category"], json!("app\\payments"));
        assert_eq!(msg["_requestID"], json!("req-1"));
        assert_eq!(msg["_requestURI"], json!("-"));
        assert_eq!(msg["_transactionID"], json!("-"));
        assert_eq!(msg["_microtime"], json!("1700000000123456"));
        assert_eq!(msg["_traceId"], json!("-"));
    }

    #[test]
    fn envelope_fields() {
        let mut target = GelfTarget::new(
            GelfConfig::builder()
                .source("pay-01")
                .additional_field("env", "prod")
                .additional_field("k", "overridden")
                .build(),
        )
        .unwrap();
        let msg = target.assemble(&LogRecord::new(
            Envelope::make("m", [("k", json!("v")), ("ip", json!("spoofed"))]),
            Severity::Warning,
            "app",
        ));
        assert_eq!(msg.additional["k"], json!("v"));
        assert_eq!(msg.additional["env"], json!("prod"));
        // pipeline fields win
        assert_eq!(msg.additional["ip"], json!("-"));
        assert!(msg.short_message.ends_with("] m"));
        assert_eq!(msg.level as u8, 4);
    }

    #[test]
    fn log_step_and_reset() {
        let mut target = GelfTarget::with_context(config(), Fixture::default()).unwrap();
        let rec = Recorder::default();
        let report = target.export_with(
            vec![
                record("one"),
                record("two"),
                record("done; end proceed transaction 42"),
                record("three"),
                record("four"),
            ],
            &rec,
        );
        assert!(report.is_ok());
        let msgs = rec.messages();
        let steps: Vec<u64> = msgs
            .iter()
            .map(|m| m["_logStep"].as_u64().unwrap())
            .collect();
        assert_eq!(steps, vec![1, 2, 3, 1, 2]);

        let ids: Vec<&str> = msgs
            .iter()
            .map(|m| m["_requestID"].as_str().unwrap())
            .collect();
        assert!(ids[0].starts_with("request_id_"));
        assert_eq!(ids[0], ids[1]);
        assert_eq!(ids[0], ids[2]);
        assert_ne!(ids[2], ids[3]);
        assert_eq!(ids[3], ids[4]);

        assert_eq!(target.state().log_step(), 2);
        assert_eq!(target.state().request_id(), Some(ids[4]));

        // state carries over between export calls
        target.export_with(vec![record("five")], &rec);
        assert_eq!(target.state().log_step(), 3);
    }

    #[test]
    fn custom_reset_marker() {
        let mut target = GelfTarget::new(
            GelfConfig::builder()
                .source("pay-01")
                .reset_marker("txn closed")
                .build(),
        )
        .unwrap();
        target.assemble(&record("a"));
        target.assemble(&record("end proceed transaction"));
        assert_eq!(target.state().log_step(), 2);
        let msg = target.assemble(&record("txn closed"));
        assert_eq!(msg.additional["logStep"], json!(3));
        assert_eq!(target.state().log_step(), 0);
    }

    #[test]
    fn detached() {
        let mut target = GelfTarget::with_context(config(), Detached).unwrap();
        let msg = target.assemble(&record("x"));
        assert_eq!(msg.additional["requestID"], json!(""));
        assert_eq!(msg.additional["ip"], json!(""));
        assert_eq!(msg.additional["traceId"], json!("-"));
        assert_eq!(target.state().request_id(), None);
        assert!(msg
            .short_message
            .starts_with("2023-11-14 22:13:20.123456 [][][][info][app\\payments][][] [-] x"));
    }

    #[test]
    fn full_context() {
        let ctx = Fixture {
            ip: Some("10.1.2.3".to_owned()),
            url: "/checkout?traceId=t-77".to_owned(),
            trace_id: Some("t-77".to_owned()),
            session_id: Some("s-1".to_owned()),
            user_id: Some("42".to_owned()),
            transaction_id: Some("tx-5".to_owned()),
            request_id: Some("r-9".to_owned()),
            ..Default::default()
        };
        let mut target = GelfTarget::with_context(config(), ctx).unwrap();
        let msg = target.assemble(&record("paid"));
        assert_eq!(
            msg.short_message,
            "2023-11-14 22:13:20.123456 [10.1.2.3][42][s-1][info][app\\payments][r-9][/checkout?traceId=t-77] [tx-5] paid"
        );
        assert_eq!(msg.additional["traceId"], json!("t-77"));
    }

    #[test]
    fn chunked() {
        let mut target = GelfTarget::new(
            GelfConfig::builder()
                .source("pay-01")
                .chunk_size(200)
                .build(),
        )
        .unwrap();
        let rec = Recorder::default();
        let big = "x".repeat(1000);
        let report = target.export_with(vec![record(&big)], &rec);
        assert!(report.is_ok());
        assert!(report.datagrams > 1);
        assert!(rec.datagrams.borrow().iter().all(|d| d.len() <= 200));
        let msgs = rec.messages();
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0]["short_message"].as_str().unwrap().ends_with(&big));
    }

    #[test]
    fn failures_are_isolated() {
        let mut target = GelfTarget::new(
            GelfConfig::builder()
                .source("pay-01")
                .chunk_size(100)
                .build(),
        )
        .unwrap();
        let rec = Recorder::default();
        let report = target.export_with(
            vec![
                record("small"),
                record(&"y".repeat(88 * 128 + 1)),
                LogRecord::new("nan", Severity::Info, "app").with_timestamp(f64::NAN),
                record("after"),
            ],
            &rec,
        );
        assert_eq!(report.records, 4);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].index, 1);
        assert!(matches!(
            report.failures[0].error,
            Error::ChunkLimitExceeded { .. }
        ));
        assert_eq!(report.failures[1].index, 2);
        assert!(matches!(
            report.failures[1].error,
            Error::Serialization { .. }
        ));
        // nothing at all was sent for the oversized record
        let msgs = rec.messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1]["_logStep"], json!(4));
        assert_eq!(report.datagrams, rec.datagrams.borrow().len());
    }

    #[test]
    fn transport_errors() {
        let mut target = GelfTarget::new(config()).unwrap();
        let report = target.export_with(vec![record("a"), record("b")], &Broken);
        assert_eq!(report.records, 2);
        assert_eq!(report.datagrams, 0);
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(report.failures[1].error, Error::Transport { .. }));
        assert_eq!(target.state().log_step(), 2);
    }

    #[test]
    fn over_udp() {
        let server = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        server
            .set_read_timeout(Some(std::time::Duration::from_secs(5)))
            .unwrap();
        let mut target = GelfTarget::new(
            GelfConfig::builder()
                .source("pay-01")
                .host("127.0.0.1")
                .port(server.local_addr().unwrap().port())
                .build(),
        )
        .unwrap();
        let report = target.export(vec![record("over the wire")]);
        assert!(report.is_ok());

        let mut buf = vec![0u8; 9000];
        let n = server.recv(&mut buf).unwrap();
        let msg: Value = serde_json::from_slice(&buf[..n]).unwrap();
        assert_eq!(msg["host"], json!("pay-01"));
        assert!(msg["short_message"]
            .as_str()
            .unwrap()
            .ends_with("] over the wire"));
    }

    #[test]
    fn timestamps() {
        assert_eq!(
            split_timestamp(1700000000.123456),
            (
                "2023-11-14 22:13:20.123456".to_owned(),
                "1700000000123456".to_owned()
            )
        );
        assert_eq!(
            split_timestamp(0.5),
            ("1970-01-01 00:00:00.500000".to_owned(), "0500000".to_owned())
        );
    }
}
