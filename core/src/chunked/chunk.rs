// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::io;
use std::io::Cursor;
use std::io::Read;

use bytes::Bytes;
use log::warn;

/// Chunk is a length-aware unit of encoded output.
///
/// A chunk yields exactly `size` bytes from its inner reader. Closing a chunk that was not
/// fully read discards the rest, which keeps a shared inner reader positioned at the
/// chunk boundary.
#[derive(Debug)]
pub struct Chunk<R: Read> {
    inner: R,
    size: usize,
    remaining: usize,
}

impl Chunk<Cursor<Bytes>> {
    /// Build a chunk serving already framed bytes.
    pub fn from_bytes(framed: Bytes) -> Self {
        Self::new(framed.len(), Cursor::new(framed))
    }
}

impl<R: Read> Chunk<R> {
    /// Create a chunk of `size` bytes read from `inner`.
    pub fn new(size: usize, inner: R) -> Self {
        Self {
            inner,
            size,
            remaining: size,
        }
    }

    /// Declared size of this chunk.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Bytes not read yet.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Returns true until exactly `size` bytes have been read.
    pub fn has_remaining(&self) -> bool {
        self.remaining > 0
    }

    /// Close the chunk, discarding unread bytes.
    pub fn close(&mut self) -> io::Result<()> {
        self.drain()
    }

    fn drain(&mut self) -> io::Result<()> {
        if self.remaining == 0 {
            return Ok(());
        }

        let skipped = io::copy(
            &mut (&mut self.inner).take(self.remaining as u64),
            &mut io::sink(),
        )?;
        self.remaining -= skipped as usize;
        if self.remaining != 0 {
            return Err(io::Error::other(format!(
                "could not skip the whole chunk: {} of {} bytes left",
                self.remaining, self.size
            )));
        }
        Ok(())
    }
}

impl<R: Read> Read for Chunk<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let max = buf.len().min(self.remaining);
        let n = self.inner.read(&mut buf[..max])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "chunk ended early: {} of {} bytes left",
                    self.remaining, self.size
                ),
            ));
        }
        self.remaining -= n;
        Ok(n)
    }
}

impl<R: Read> Drop for Chunk<R> {
    fn drop(&mut self) {
        if let Err(err) = self.drain() {
            warn!("failed to drain chunk on drop: {err}");
        }
    }
}
