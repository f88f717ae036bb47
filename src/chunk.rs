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
//! GELF UDP chunking.
//!
//! A GELF message too large for a single datagram is split into at most [`MAX_CHUNKS`] chunks,
//! each prefixed with a twelve byte header:
//!
//! ```text
//! +------+------+----------------------+-----+-------+---------------
//! | 0x1e | 0x0f | message id (8 bytes) | seq | count | chunk bytes...
//! +------+------+----------------------+-----+-------+---------------
//! ```
//!
//! The receiver reassembles chunks sharing a message id in `seq` order. There is no compression
//! here; the chunks carry the raw JSON.

use crate::error::{Error, Result};

use backtrace::Backtrace;
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

/// Magic bytes identifying a chunked GELF datagram
pub const MAGIC: [u8; 2] = [0x1e, 0x0f];
/// Length of the chunk header (magic, message id, sequence number & count)
pub const HEADER_LEN: usize = 12;
/// Graylog discards messages split into more chunks than this
pub const MAX_CHUNKS: usize = 128;

/// Splits encoded GELF messages into datagrams no larger than `chunk_size` bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize) -> Chunker {
        Chunker { chunk_size }
    }
    /// Number of message bytes that fit in one datagram alongside a chunk header; a message no
    /// longer than this is sent whole.
    pub fn max_payload(&self) -> usize {
        self.chunk_size.saturating_sub(HEADER_LEN).max(1)
    }
    /// Split `buf` into datagrams, using a random message id.
    pub fn split(&self, buf: &[u8]) -> Result<Vec<Bytes>> {
        self.split_with_id(buf, rand::random())
    }
    /// Split `buf` into datagrams, tagging any chunks with `id`.
    ///
    /// Returns a single, unadorned datagram when `buf` fits. Fails, without producing anything,
    /// if more than [`MAX_CHUNKS`] chunks would be needed.
    pub fn split_with_id(&self, buf: &[u8], id: [u8; 8]) -> Result<Vec<Bytes>> {
        let max = self.max_payload();
        if buf.len() <= max {
            trace!("{} byte GELF message fits in one datagram", buf.len());
            return Ok(vec![Bytes::copy_from_slice(buf)]);
        }

        let count = (buf.len() + max - 1) / max;
        if count > MAX_CHUNKS {
            return Err(Error::ChunkLimitExceeded {
                chunks: count,
                limit: MAX_CHUNKS,
                back: Backtrace::new(),
            });
        }
        debug!("Splitting {} byte GELF message into {} chunks", buf.len(), count);

        Ok(buf
            .chunks(max)
            .enumerate()
            .map(|(seq, chunk)| {
                let mut datagram = BytesMut::with_capacity(HEADER_LEN + chunk.len());
                datagram.put_slice(&MAGIC);
                datagram.put_slice(&id);
                datagram.put_u8(seq as u8);
                datagram.put_u8(count as u8);
                datagram.put_slice(chunk);
                datagram.freeze()
            })
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ID: [u8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

    #[test]
    fn threshold() {
        let chunker = Chunker::new(100);
        assert_eq!(chunker.max_payload(), 88);

        let under = vec![b'x'; 87];
        let out = chunker.split_with_id(&under, ID).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(&out[0][..], &under[..]);

        let at = vec![b'x'; 88];
        assert_eq!(chunker.split_with_id(&at, ID).unwrap().len(), 1);

        let over: Vec<u8> = (0..89u8).collect();
        let out = chunker.split_with_id(&over, ID).unwrap();
        assert_eq!(out.len(), 2);
        for (seq, datagram) in out.iter().enumerate() {
            assert_eq!(&datagram[0..2], &MAGIC);
            assert_eq!(&datagram[2..10], &ID);
            assert_eq!(datagram[10], seq as u8);
            assert_eq!(datagram[11], 2);
            assert!(datagram.len() <= 100);
        }
        assert_eq!(out[0].len(), 100);
        assert_eq!(out[1].len(), HEADER_LEN + 1);

        // reassembly gives back the original
        let mut whole = Vec::new();
        out.iter().for_each(|d| whole.extend_from_slice(&d[HEADER_LEN..]));
        assert_eq!(whole, over);
    }

    #[test]
    fn chunk_limit() {
        let chunker = Chunker::new(100);
        let most = vec![0u8; 88 * MAX_CHUNKS];
        let out = chunker.split_with_id(&most, ID).unwrap();
        assert_eq!(out.len(), MAX_CHUNKS);
        assert_eq!(out[127][10], 127);
        assert_eq!(out[127][11], 128);

        let too_many = vec![0u8; 88 * MAX_CHUNKS + 1];
        match chunker.split_with_id(&too_many, ID) {
            Err(Error::ChunkLimitExceeded { chunks, limit, .. }) => {
                assert_eq!(chunks, 129);
                assert_eq!(limit, 128);
            }
            other => panic!("expected ChunkLimitExceeded, got {:?}", other),
        }
    }

    #[test]
    fn random_ids() {
        let chunker = Chunker::new(20);
        let buf = vec![0u8; 64];
        let a = chunker.split(&buf).unwrap();
        assert!(a.len() > 1);
        assert!(a.iter().all(|d| d[2..10] == a[0][2..10]));
    }
}
