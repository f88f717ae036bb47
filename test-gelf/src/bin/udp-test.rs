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
//! Test writing to a Graylog GELF UDP input on port 12201 on the local host.

use gelf_tracing::{config::GelfConfig, layer::GelfLayer, target::GelfTarget};
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

pub fn main() {
    let target = GelfTarget::new(
        GelfConfig::builder()
            .source_from_hostname()
            .unwrap()
            .build(),
    )
    .unwrap();
    // Setup the real subsriber...
    let subscriber = Registry::default().with(GelfLayer::new(target));
    // and install it.
    let _guard = tracing::subscriber::set_default(subscriber);

    trace!("Hello, 世界!");
    debug!(step = 2, "Hello, 世界!");
    info!(order = 1234, "Hello, 世界!");
    warn!("Hello, 世界!");
    error!("end proceed transaction");
}
