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
//! Contextual fields supplied by the host application.
//!
//! Every GELF message is enriched with request, session, identity & transaction correlation
//! fields. None of those are ours to know; the host application supplies them through a
//! [`ContextProvider`], each facet of which may be absent. Absence is never an error: it resolves
//! to a sentinel (`"-"`, or the empty string when there is no host application at all).

/// The request currently being served.
pub trait CurrentRequest {
    /// The client's address, if known
    fn client_ip(&self) -> Option<String>;
    /// The request URL (web-style requests)
    fn url(&self) -> String;
    /// Look up a query parameter (web-style requests)
    fn query_param(&self, name: &str) -> Option<String>;
    /// True for non-interactive, command-line style invocations
    fn is_console(&self) -> bool;
    /// Positional arguments (console-style requests)
    fn positional_args(&self) -> Vec<String>;
}

/// The current user session.
pub trait CurrentSession {
    fn is_active(&self) -> bool;
    fn id(&self) -> String;
}

/// The authenticated identity, if any.
pub trait CurrentIdentity {
    /// `None` for anonymous users
    fn id(&self) -> Option<String>;
}

/// An external payment/transaction subsystem.
pub trait TransactionContext {
    fn current_transaction_id(&self) -> Option<String>;
}

/// Capability object through which the pipeline reaches the host application.
///
/// All methods have defaults describing "host application present, but nothing active", so an
/// implementation need only override what it actually has.
pub trait ContextProvider {
    /// False when there is no host application at all; most fields then resolve to `""`.
    fn is_attached(&self) -> bool {
        true
    }
    fn request(&self) -> Option<&dyn CurrentRequest> {
        None
    }
    fn session(&self) -> Option<&dyn CurrentSession> {
        None
    }
    fn identity(&self) -> Option<&dyn CurrentIdentity> {
        None
    }
    fn transaction(&self) -> Option<&dyn TransactionContext> {
        None
    }
    /// An upstream correlation id (`REQUEST_ID`) to adopt instead of generating one.
    fn inbound_request_id(&self) -> Option<String> {
        None
    }
}

/// A host application with no request, session, identity or transaction subsystem. Honors an
/// inbound `REQUEST_ID` environment variable.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullContext;

impl ContextProvider for NullContext {
    fn inbound_request_id(&self) -> Option<String> {
        std::env::var("REQUEST_ID").ok().filter(|s| !s.is_empty())
    }
}

/// No host application whatsoever.
#[derive(Clone, Copy, Debug, Default)]
pub struct Detached;

impl ContextProvider for Detached {
    fn is_attached(&self) -> bool {
        false
    }
}

const NIL: &str = "-";

/// The correlation fields for one record, minus the request id (which is memoized by the
/// pipeline).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub ip: String,
    pub user_id: String,
    pub session_id: String,
    pub request_uri: String,
    pub trace_id: String,
    pub transaction_id: String,
}

impl Resolved {
    pub fn resolve(ctx: &dyn ContextProvider) -> Resolved {
        Resolved {
            ip: ip(ctx),
            user_id: user_id(ctx),
            session_id: session_id(ctx),
            request_uri: request_uri(ctx),
            trace_id: trace_id(ctx),
            transaction_id: transaction_id(ctx),
        }
    }
}

fn or_nil(s: Option<String>) -> String {
    s.filter(|s| !s.is_empty()).unwrap_or_else(|| NIL.to_owned())
}

fn ip(ctx: &dyn ContextProvider) -> String {
    if !ctx.is_attached() {
        return String::new();
    }
    match ctx.request() {
        Some(req) if !req.is_console() => or_nil(req.client_ip()),
        _ => NIL.to_owned(),
    }
}

fn user_id(ctx: &dyn ContextProvider) -> String {
    if !ctx.is_attached() {
        return String::new();
    }
    or_nil(ctx.identity().and_then(|ident| ident.id()))
}

fn session_id(ctx: &dyn ContextProvider) -> String {
    if !ctx.is_attached() {
        return String::new();
    }
    match ctx.session() {
        Some(session) if session.is_active() => or_nil(Some(session.id())),
        _ => NIL.to_owned(),
    }
}

fn request_uri(ctx: &dyn ContextProvider) -> String {
    if !ctx.is_attached() {
        return String::new();
    }
    match ctx.request() {
        Some(req) if req.is_console() => format!("/{}", req.positional_args().join("?")),
        Some(req) => or_nil(Some(req.url())),
        None => NIL.to_owned(),
    }
}

fn trace_id(ctx: &dyn ContextProvider) -> String {
    match ctx.request() {
        Some(req) if ctx.is_attached() && !req.is_console() => or_nil(req.query_param("traceId")),
        _ => NIL.to_owned(),
    }
}

fn transaction_id(ctx: &dyn ContextProvider) -> String {
    or_nil(ctx.transaction().and_then(|t| t.current_transaction_id()))
}
