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

use std::collections::VecDeque;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::pin::Pin;
use std::sync::Arc;
use std::task::ready;
use std::task::Context;
use std::task::Poll;

use bytes::Bytes;
use bytes::BytesMut;
use futures::stream::BoxStream;
use futures::Stream;
use futures::StreamExt;
use log::debug;
use log::trace;

use super::payload::EncodingOptions;
use super::ChunkExtensionProvider;
use super::ChunkFramer;
use super::ChunkHeaderProvider;
use super::ChunkedEncodedPayload;
use super::TrailerProvider;
use crate::checksum::SharedChecksum;
use crate::Error;
use crate::Result;

/// ChunkedEncodedPublisher aws-chunk encodes asynchronous byte streams.
///
/// The publisher itself is immutable configuration. Every call to
/// [`publish`](Self::publish) resets all providers and checksums and returns a fresh
/// [`ChunkedEncodedStream`] with its own buffers, so one publisher serves every attempt of
/// a request.
///
/// Given the same payload bytes the emitted bytes are identical to
/// [`ChunkedEncodedInputStream`](super::ChunkedEncodedInputStream), no matter how the
/// payload is split into buffers upstream.
#[derive(Debug, Clone)]
pub struct ChunkedEncodedPublisher {
    chunk_size: usize,
    add_empty_trailing_chunk: bool,
    framer: ChunkFramer,
    checksums: Vec<SharedChecksum>,
    decoded_content_length: Option<u64>,
}

impl ChunkedEncodedPublisher {
    /// Create a new builder.
    pub fn builder() -> ChunkedEncodedPublisherBuilder {
        ChunkedEncodedPublisherBuilder::default()
    }

    /// Declared length of the payload before encoding, if any.
    pub fn decoded_content_length(&self) -> Option<u64> {
        self.decoded_content_length
    }

    /// Encode `upstream`.
    ///
    /// Upstream errors are reported as [`ErrorKind::Io`](crate::ErrorKind::Io) and end the
    /// encoded stream; no partially framed chunk is ever emitted.
    pub fn publish<S, E>(&self, upstream: S) -> Result<ChunkedEncodedStream>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
        E: Into<anyhow::Error>,
    {
        self.framer.reset()?;
        for checksum in &self.checksums {
            checksum.reset()?;
        }

        let checksums = self.checksums.clone();
        let upstream = upstream
            .map(move |item| {
                let bs = item.map_err(|e| {
                    Error::io("failed to read payload stream").with_source(e)
                })?;
                for checksum in &checksums {
                    checksum.update(&bs)?;
                }
                Ok(bs)
            })
            .boxed();

        Ok(ChunkedEncodedStream {
            upstream: Some(upstream),
            rechunker: Rechunker::new(self.chunk_size),
            pending: VecDeque::new(),
            framer: self.framer.clone(),
            add_empty_trailing_chunk: self.add_empty_trailing_chunk,
            done: false,
        })
    }
}

/// Builder for [`ChunkedEncodedPublisher`].
#[derive(Debug, Default)]
pub struct ChunkedEncodedPublisherBuilder {
    options: EncodingOptions,
    add_empty_trailing_chunk: Option<bool>,
}

impl ChunkedEncodedPublisherBuilder {
    /// Set the chunk size in bytes, must be positive.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.options.chunk_size = Some(chunk_size);
        self
    }

    /// Whether to end the stream with the final chunk and trailers. Defaults to `true`.
    ///
    /// Without it only data chunks are emitted and the caller must terminate the body.
    pub fn add_empty_trailing_chunk(mut self, enabled: bool) -> Self {
        self.add_empty_trailing_chunk = Some(enabled);
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

    /// Build the publisher.
    pub fn build(self) -> Result<ChunkedEncodedPublisher> {
        let (chunk_size, framer) = self.options.validate()?;

        Ok(ChunkedEncodedPublisher {
            chunk_size,
            add_empty_trailing_chunk: self.add_empty_trailing_chunk.unwrap_or(true),
            framer,
            checksums: self.options.checksums,
            decoded_content_length: self.options.decoded_content_length,
        })
    }
}

impl ChunkedEncodedPayload for ChunkedEncodedPublisherBuilder {
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

/// Rechunker slices arbitrarily sized buffers into `chunk_size` blocks.
///
/// At most one partial block is retained between pushes.
#[derive(Debug)]
struct Rechunker {
    chunk_size: usize,
    buf: BytesMut,
}

impl Rechunker {
    fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            buf: BytesMut::with_capacity(chunk_size),
        }
    }

    /// Push `incoming`, returning every block completed by it.
    fn push(&mut self, mut incoming: Bytes) -> Vec<Bytes> {
        let complete = (self.buf.len() + incoming.len()) / self.chunk_size;
        let mut blocks = Vec::with_capacity(complete);

        for _ in 0..complete {
            if self.buf.is_empty() {
                blocks.push(incoming.split_to(self.chunk_size));
            } else {
                let need = self.chunk_size - self.buf.len();
                self.buf.extend_from_slice(&incoming.split_to(need));
                blocks.push(self.buf.split().freeze());
            }
        }
        self.buf.extend_from_slice(&incoming);

        blocks
    }

    /// Take the partial block left behind, if any.
    fn finish(&mut self) -> Option<Bytes> {
        if self.buf.is_empty() {
            return None;
        }
        Some(self.buf.split().freeze())
    }
}

#[derive(Debug)]
enum PendingChunk {
    Data(Bytes),
    Trailing,
}

/// ChunkedEncodedStream is one encoding attempt created by [`ChunkedEncodedPublisher`].
///
/// Work only happens when the stream is polled: upstream is polled for more bytes only
/// after every chunk completed so far has been handed downstream. Dropping the stream
/// drops upstream and every buffered chunk.
pub struct ChunkedEncodedStream {
    upstream: Option<BoxStream<'static, Result<Bytes>>>,
    rechunker: Rechunker,
    pending: VecDeque<PendingChunk>,
    framer: ChunkFramer,
    add_empty_trailing_chunk: bool,
    done: bool,
}

impl Debug for ChunkedEncodedStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedEncodedStream")
            .field("rechunker", &self.rechunker)
            .field("pending", &self.pending.len())
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl ChunkedEncodedStream {
    fn terminate(&mut self) {
        self.upstream = None;
        self.pending.clear();
        self.done = true;
    }
}

impl Stream for ChunkedEncodedStream {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(chunk) = this.pending.pop_front() {
                let framed = match chunk {
                    PendingChunk::Data(bs) => this.framer.encode_chunk(&bs),
                    PendingChunk::Trailing => this.framer.encode_final_chunk(),
                };
                if framed.is_err() {
                    this.terminate();
                }
                return Poll::Ready(Some(framed));
            }

            if this.done {
                return Poll::Ready(None);
            }

            let Some(upstream) = this.upstream.as_mut() else {
                this.done = true;
                continue;
            };

            match ready!(upstream.poll_next_unpin(cx)) {
                Some(Ok(bs)) => {
                    let blocks = this.rechunker.push(bs);
                    trace!("upstream buffer completed {} chunk(s)", blocks.len());
                    this.pending
                        .extend(blocks.into_iter().map(PendingChunk::Data));
                }
                Some(Err(err)) => {
                    this.terminate();
                    return Poll::Ready(Some(Err(err)));
                }
                None => {
                    debug!("upstream completed, flushing remaining data");
                    this.upstream = None;
                    if let Some(rest) = this.rechunker.finish() {
                        this.pending.push_back(PendingChunk::Data(rest));
                    }
                    if this.add_empty_trailing_chunk {
                        this.pending.push_back(PendingChunk::Trailing);
                    }
                    this.done = true;
                }
            }
        }
    }
}
