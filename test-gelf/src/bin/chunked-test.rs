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
//! Send a batch containing one message large enough to be chunked (over the WAN chunk size) to
//! port 12201 on the local host.

use gelf_tracing::{
    config::{GelfConfig, CHUNK_SIZE_WAN},
    envelope::Envelope,
    level::Severity,
    record::LogRecord,
    target::GelfTarget,
};
use serde_json::json;

pub fn main() {
    let mut target = GelfTarget::new(
        GelfConfig::builder()
            .source("chunked-test")
            .chunk_size(CHUNK_SIZE_WAN)
            .build(),
    )
    .unwrap();

    let report = target.export(vec![
        LogRecord::new("small message", Severity::Info, "chunked-test"),
        LogRecord::new(
            Envelope::make("Lorem ipsum ".repeat(1000), [("size", json!(12000))]),
            Severity::Warning,
            "chunked-test",
        ),
        LogRecord::new("end proceed transaction", Severity::Info, "chunked-test"),
    ]);

    println!(
        "{} records, {} datagrams, {} failures",
        report.records,
        report.datagrams,
        report.failures.len()
    );
    for failure in report.failures.iter() {
        eprintln!("record {}: {}", failure.index, failure.error);
    }
}
