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

use std::fmt::Debug;
use std::fmt::Formatter;
use std::io;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::sync::Arc;

use bytes::Bytes;
use log::debug;

use super::payload::EncodingOptions;
use super::Chunk;
use super::ChunkExtensionProvider;
use super::ChunkFramer;
use super::ChunkHeaderProvider;
use super::ChunkedEncodedPayload;
use super::TrailerProvider;
use crate::checksum::ChecksumReader;
use crate::checksum::SharedChecksum;
use crate::Error;
use crate::Result;

enum State {
    AwaitingChunk,
    ServingChunk {
        chunk: Chunk<Cursor<Bytes>>,
        last: bool,
    },
    Finished,
    /// A previous read failed, the framing state can't be trusted until reset.
    Failed,
}

/// ChunkedEncodedInputStream aws-chunk encodes a blocking byte source.
///
/// Chunks are pulled from the source on demand, one `chunk_size` block at a time, and
/// served through [`Read`]. Once the source is exhausted the final chunk, the trailers and
/// the terminating CRLF are served.
///
/// [`reset`](Self::reset) rewinds the source and every provider so the same bytes can be
/// sent again on retry.
///
/// Any read error is terminal: later reads fail as well until the stream is reset.
pub struct ChunkedEncodedInputStream<R> {
    source: ChecksumReader<R>,
    start: u64,
    chunk_size: usize,
    framer: ChunkFramer,
    checksums: Vec<SharedChecksum>,
    decoded_content_length: Option<u64>,

    buf: Vec<u8>,
    state: State,
}

impl<R> Debug for ChunkedEncodedInputStream<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedEncodedInputStream")
            .field("chunk_size", &self.chunk_size)
            .field("framer", &self.framer)
            .field("decoded_content_length", &self.decoded_content_length)
            .finish_non_exhaustive()
    }
}

impl<R: Read + Seek> ChunkedEncodedInputStream<R> {
    /// Create a new builder.
    pub fn builder() -> ChunkedEncodedInputStreamBuilder<R> {
        ChunkedEncodedInputStreamBuilder::default()
    }

    /// Declared length of the payload before encoding, if any.
    pub fn decoded_content_length(&self) -> Option<u64> {
        self.decoded_content_length
    }

    /// Reset the stream for a new attempt.
    ///
    /// Resets the header, extension and trailer providers, the payload checksums, and
    /// rewinds the source to where it was when the stream was built.
    pub fn reset(&mut self) -> Result<()> {
        self.framer.reset()?;
        for checksum in &self.checksums {
            checksum.reset()?;
        }
        self.source.seek(SeekFrom::Start(self.start))?;
        self.state = State::AwaitingChunk;
        Ok(())
    }

    fn next_chunk(&mut self) -> io::Result<State> {
        let n = read_fully(&mut self.source, &mut self.buf)?;
        if n == 0 {
            debug!("payload source exhausted, serving final chunk");
            let framed = self.framer.encode_final_chunk()?;
            return Ok(State::ServingChunk {
                chunk: Chunk::from_bytes(framed),
                last: true,
            });
        }

        let framed = self.framer.encode_chunk(&self.buf[..n])?;
        Ok(State::ServingChunk {
            chunk: Chunk::from_bytes(framed),
            last: false,
        })
    }
}

impl<R: Read + Seek> ChunkedEncodedInputStream<R> {
    fn read_inner(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match &mut self.state {
                State::ServingChunk { chunk, last } => {
                    let n = chunk.read(buf)?;
                    if n > 0 {
                        return Ok(n);
                    }
                    let last = *last;
                    chunk.close()?;
                    self.state = if last {
                        State::Finished
                    } else {
                        State::AwaitingChunk
                    };
                }
                State::AwaitingChunk => {
                    self.state = self.next_chunk()?;
                }
                State::Finished => return Ok(0),
                State::Failed => {
                    return Err(io::Error::other(
                        "chunked stream failed earlier, reset it before reading again",
                    ))
                }
            }
        }
    }
}

impl<R: Read + Seek> Read for ChunkedEncodedInputStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        self.read_inner(buf).inspect_err(|err| {
            if err.kind() != io::ErrorKind::Interrupted {
                debug!("chunked stream failed: {err}");
                self.state = State::Failed;
            }
        })
    }
}

/// Fill `buf` from `r` until it is full or `r` is exhausted.
fn read_fully(r: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

/// Builder for [`ChunkedEncodedInputStream`].
pub struct ChunkedEncodedInputStreamBuilder<R> {
    source: Option<R>,
    options: EncodingOptions,
}

impl<R> Default for ChunkedEncodedInputStreamBuilder<R> {
    fn default() -> Self {
        Self {
            source: None,
            options: EncodingOptions::default(),
        }
    }
}

impl<R> Debug for ChunkedEncodedInputStreamBuilder<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedEncodedInputStreamBuilder")
            .field("has_source", &self.source.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl<R: Read + Seek> ChunkedEncodedInputStreamBuilder<R> {
    /// Set the payload source.
    pub fn source(mut self, source: R) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the chunk size in bytes, must be positive.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.options.chunk_size = Some(chunk_size);
        self
    }

    /// Replace the default lower-case hex length header.
    pub fn header(mut self, header: Arc<dyn ChunkHeaderProvider>) -> Self {
        self.options.header = Some(header);
        self
    }

    /// Append a chunk extension provider.
    pub fn extension(mut self, extension: Arc<dyn ChunkExtensionProvider>) -> Self {
        self.add_extension(extension);
        self
    }

    /// Append a trailer provider.
    pub fn trailer(mut self, trailer: Arc<dyn TrailerProvider>) -> Self {
        self.add_trailer(trailer);
        self
    }

    /// Build the stream.
    ///
    /// The current position of the source is recorded as the point [`reset`] rewinds to.
    ///
    /// [`reset`]: ChunkedEncodedInputStream::reset
    pub fn build(self) -> Result<ChunkedEncodedInputStream<R>> {
        let (chunk_size, framer) = self.options.validate()?;
        let mut source = self
            .source
            .ok_or_else(|| Error::config_invalid("payload source is required"))?;
        let start = source.stream_position()?;

        Ok(ChunkedEncodedInputStream {
            source: ChecksumReader::new(source, self.options.checksums.clone()),
            start,
            chunk_size,
            framer,
            checksums: self.options.checksums,
            decoded_content_length: self.options.decoded_content_length,

            buf: vec![0; chunk_size],
            state: State::AwaitingChunk,
        })
    }
}

impl<R> ChunkedEncodedPayload for ChunkedEncodedInputStreamBuilder<R> {
    fn add_trailer(&mut self, trailer: Arc<dyn TrailerProvider>) {
        self.options.trailers.push(trailer);
    }

    fn trailers(&self) -> Vec<Arc<dyn TrailerProvider>> {
        self.options.trailers.clone()
    }

    fn add_extension(&mut self, extension: Arc<dyn ChunkExtensionProvider>) {
        self.options.extensions.push(extension);
    }

    fn checksum_payload(&mut self, checksum: SharedChecksum) {
        self.options.checksums.push(checksum);
    }

    fn decoded_content_length(&mut self, length: u64) {
        self.options.decoded_content_length = Some(length);
    }
}
