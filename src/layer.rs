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
//! [gelf-tracing](crate) [`Layer`] implementation.
//!
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//!
//! [`GelfLayer`] plays the part of the host logging framework: each [`tracing`] [`Event`] becomes
//! a [`LogRecord`] (message field as the text, any other fields as additional fields, target as
//! the category) that is exported immediately through a [`GelfTarget`].
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
//!
//! ```no_run
//! use gelf_tracing::{config::GelfConfig, layer::GelfLayer, target::GelfTarget};
//! use tracing::info;
//! use tracing_subscriber::layer::SubscriberExt; // Needed to get `with()`
//! use tracing_subscriber::registry::Registry;
//!
//! let target = GelfTarget::new(GelfConfig::builder().source("billing-01").build()).unwrap();
//! let subscriber = Registry::default().with(GelfLayer::new(target));
//! let _guard = tracing::subscriber::set_default(subscriber);
//!
//! info!(order = 1234, "Hello, world!");
//! ```

use crate::{
    context::{ContextProvider, NullContext},
    envelope::Envelope,
    level::Severity,
    record::{LogRecord, Payload},
    target::GelfTarget,
    transport::Transport,
};

use serde_json::{Map, Value};
use tracing::Event;
use tracing_subscriber::layer::Context;

use std::sync::Mutex;

// When the tracing-log feature is enabled, use NormalizeEvent to recover the original target of
// events that originated from the `log` crate.
#[cfg(feature = "tracing-log")]
use tracing_log::NormalizeEvent;

/// Our own diagnostics are never fed back into the pipeline.
const OWN_TARGET: &str = "gelf_tracing";

/// A [`tracing-subscriber`]-compliant [`Layer`] implementation that will send [`Event`]s to
/// Graylog.
///
/// The [`GelfTarget`] sits behind a [`Mutex`], so events from any number of threads are exported
/// one at a time.
///
/// [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
pub struct GelfLayer<C: ContextProvider = NullContext> {
    target: Mutex<GelfTarget<C>>,
    transport: Option<Box<dyn Transport + Send + Sync>>,
}

impl<C: ContextProvider> GelfLayer<C> {
    /// Export each event over a freshly-opened UDP socket to the target's configured input.
    pub fn new(target: GelfTarget<C>) -> Self {
        GelfLayer {
            target: Mutex::new(target),
            transport: None,
        }
    }
    /// Export each event over `transport`.
    pub fn with_transport<T>(target: GelfTarget<C>, transport: T) -> Self
    where
        T: Transport + Send + Sync + 'static,
    {
        GelfLayer {
            target: Mutex::new(target),
            transport: Some(Box::new(transport)),
        }
    }
}

/// Gathers an [`Event`]'s fields: "message" becomes the text, everything else an additional field.
#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Map<String, Value>,
}

impl FieldVisitor {
    fn into_payload(self, name: &str) -> Payload {
        let message = self.message.unwrap_or_else(|| name.to_owned());
        if self.fields.is_empty() {
            Payload::Text(message)
        } else {
            Payload::Envelope(Envelope {
                message,
                add: self.fields,
            })
        }
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields.insert(field.name().to_owned(), value.into());
    }
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields.insert(field.name().to_owned(), value.into());
    }
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.fields.insert(field.name().to_owned(), value.into());
    }
    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields.insert(field.name().to_owned(), value.into());
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_owned());
        } else {
            self.fields.insert(field.name().to_owned(), value.into());
        }
    }
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        // The tracing macros "pre-format" the `message` field, so `value` is really a
        // `std::fmt::Arguments` & prints without enclosing double-quotes.
        let text = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(text);
        } else {
            self.fields.insert(field.name().to_owned(), text.into());
        }
    }
}

/// This is the [`Layer`] implementation.
///
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
impl<S, C> tracing_subscriber::layer::Layer<S> for GelfLayer<C>
where
    S: tracing::Subscriber,
    C: ContextProvider + Send + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        #[cfg(feature = "tracing-log")]
        let normalized_meta = event.normalized_metadata();
        #[cfg(feature = "tracing-log")]
        let meta = normalized_meta.as_ref().unwrap_or_else(|| event.metadata());
        #[cfg(not(feature = "tracing-log"))]
        let meta = event.metadata();

        if meta.target().starts_with(OWN_TARGET) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let record = LogRecord::new(
            visitor.into_payload(meta.name()),
            Severity::from(meta.level()),
            meta.target(),
        );

        let mut target = match self.target.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Failures have already been logged by the target
        let _report = match &self.transport {
            Some(transport) => target.export_with(std::iter::once(record), transport.as_ref()),
            None => target.export(std::iter::once(record)),
        };
    }
}
