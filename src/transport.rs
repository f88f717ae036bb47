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
//! The GELF transport layer.
//!
//! This module defines the [`Transport`] trait that all implementations must support, as well
//! as the UDP implementation. UDP is fire-and-forget: a successful [`Transport::send`] means only
//! that the datagram left this host.
//!
//! # Examples
//!
//! To send GELF datagrams to a Graylog input listening on port 12201 (the default) on localhost:
//!
//! ```rust
//! use gelf_tracing::transport::UdpTransport;
//! let transpo = UdpTransport::local().unwrap();
//! ```
//!
//! On a non-standard port on another host:
//!
//! ```rust
//! use gelf_tracing::transport::UdpTransport;
//! let transpo = UdpTransport::new("some-host.domain.io:5514");
//! assert!(transpo.is_err()); // no such host, after all
//! ```

use crate::error::{Error, Result};

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                      transport mechanisms                                      //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Operations all transport layers must support.
pub trait Transport {
    /// Send one datagram on this transport mechanism.
    fn send(&self, buf: &[u8]) -> Result<usize>;
}

/// Sending GELF messages via UDP datagrams.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Construct a [`Transport`] implementation via UDP at `addr`.
    pub fn new<A: ToSocketAddrs>(addr: A) -> Result<UdpTransport> {
        let addr = addr
            .to_socket_addrs()
            .map_err(Error::transport)?
            .next()
            .ok_or_else(|| {
                Error::transport(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "address resolved to nothing",
                ))
            })?;
        // Bind to any available port on an address of the same family...
        let local: SocketAddr = match addr {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).map_err(Error::transport)?;
        // and connect to the Graylog input at `addr`:
        socket.connect(addr).map_err(Error::transport)?;
        Ok(UdpTransport { socket })
    }
    /// Construct a [`Transport`] implementation via UDP at 127.0.0.1:12201
    pub fn local() -> Result<UdpTransport> {
        UdpTransport::new("127.0.0.1:12201")
    }
}

impl Transport for UdpTransport {
    fn send(&self, buf: &[u8]) -> Result<usize> {
        self.socket.send(buf).map_err(Error::transport)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn loopback() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let transpo = UdpTransport::new(server.local_addr().unwrap()).unwrap();
        assert_eq!(transpo.send(b"{\"version\":\"1.1\"}").unwrap(), 17);

        let mut buf = [0u8; 64];
        let n = server.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"{\"version\":\"1.1\"}");
    }
}
