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

use crate::Result;

/// A `;name=value` annotation on a chunk-size line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkExtension {
    /// Extension name, for example `chunk-signature`.
    pub name: Vec<u8>,
    /// Extension value.
    pub value: Vec<u8>,
}

impl ChunkExtension {
    /// Create a new extension.
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A header-like field sent after the final chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trailer {
    /// Trailer name, for example `x-amz-checksum-sha256`.
    pub name: String,
    /// Trailer values, rendered joined with `,`.
    pub values: Vec<String>,
}

impl Trailer {
    /// Create a new trailer.
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// ChunkHeaderProvider renders the size part of a chunk-size line.
pub trait ChunkHeaderProvider: Debug + Send + Sync + 'static {
    /// Render the header for the given chunk payload.
    fn header(&self, chunk: &[u8]) -> Result<Vec<u8>>;

    /// Reset any state kept between chunks.
    fn reset(&self) -> Result<()> {
        Ok(())
    }
}

/// Lower-case hexadecimal byte count of the chunk payload.
///
/// This is the header used when no other one is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct HexLengthHeader;

impl ChunkHeaderProvider for HexLengthHeader {
    fn header(&self, chunk: &[u8]) -> Result<Vec<u8>> {
        Ok(format!("{:x}", chunk.len()).into_bytes())
    }
}

/// ChunkExtensionProvider computes one extension for every chunk, final chunk included.
///
/// Providers see chunks strictly in stream order. `reset` must bring the provider back to
/// the state it had before the first chunk so that a retried stream encodes identically.
pub trait ChunkExtensionProvider: Debug + Send + Sync + 'static {
    /// Compute the extension for `chunk`.
    fn get(&self, chunk: &[u8]) -> Result<ChunkExtension>;

    /// Reset the provider for a new attempt.
    fn reset(&self) -> Result<()>;
}

/// TrailerProvider computes one trailer field after all payload bytes were encoded.
pub trait TrailerProvider: Debug + Send + Sync + 'static {
    /// Compute the trailer.
    fn get(&self) -> Result<Trailer>;

    /// Reset the provider for a new attempt.
    fn reset(&self) -> Result<()>;
}

/// A trailer whose value is known upfront, like a pre-existing request header.
#[derive(Debug, Clone)]
pub struct StaticTrailerProvider {
    trailer: Trailer,
}

impl StaticTrailerProvider {
    /// Create a provider that always returns `trailer`.
    pub fn new(trailer: Trailer) -> Self {
        Self { trailer }
    }
}

impl TrailerProvider for StaticTrailerProvider {
    fn get(&self) -> Result<Trailer> {
        Ok(self.trailer.clone())
    }

    fn reset(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunked::ChunkedEncodedInputStream;
    use crate::chunked::ChunkedEncodedPublisher;
    use bytes::Bytes;
    use futures::stream;
    use futures::TryStreamExt;
    use std::io::Cursor;
    use std::io::Read;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use test_case::test_case;

    /// Prefixes the upper-case hex length with the index of the chunk.
    #[derive(Debug, Default)]
    struct NumberedHeader {
        next: AtomicUsize,
        resets: AtomicUsize,
    }

    impl ChunkHeaderProvider for NumberedHeader {
        fn header(&self, chunk: &[u8]) -> Result<Vec<u8>> {
            let n = self.next.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{n}-{:X}", chunk.len()).into_bytes())
        }

        fn reset(&self) -> Result<()> {
            self.next.store(0, Ordering::SeqCst);
            self.resets.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    const NUMBERED: &str = "0-C\r\nabcdefghijkl\r\n1-3\r\nmno\r\n2-0\r\n\r\n";

    #[test_case(0, "0")]
    #[test_case(4, "4")]
    #[test_case(15, "f")]
    #[test_case(65536, "10000")]
    fn test_hex_length_header(len: usize, expected: &str) {
        let chunk = vec![b'x'; len];
        let header = HexLengthHeader.header(&chunk).expect("header must be rendered");
        assert_eq!(header, expected.as_bytes());
    }

    #[test]
    fn test_custom_header_with_input_stream() -> anyhow::Result<()> {
        let header = Arc::new(NumberedHeader::default());
        let mut s = ChunkedEncodedInputStream::builder()
            .source(Cursor::new(b"abcdefghijklmno".to_vec()))
            .chunk_size(12)
            .header(header.clone())
            .build()?;

        let mut first = String::new();
        s.read_to_string(&mut first)?;
        assert_eq!(first, NUMBERED);
        assert_eq!(header.resets.load(Ordering::SeqCst), 0);

        s.reset()?;
        assert_eq!(header.resets.load(Ordering::SeqCst), 1);
        let mut second = String::new();
        s.read_to_string(&mut second)?;
        assert_eq!(second, NUMBERED);
        Ok(())
    }

    #[tokio::test]
    async fn test_custom_header_with_publisher() -> anyhow::Result<()> {
        let header = Arc::new(NumberedHeader::default());
        let publisher = ChunkedEncodedPublisher::builder()
            .chunk_size(12)
            .header(header.clone())
            .build()?;

        for attempt in 1..=2 {
            let upstream = stream::iter(
                ["abcdefgh", "ijklmno"]
                    .map(|p| Ok::<_, std::io::Error>(Bytes::from_static(p.as_bytes()))),
            );
            let chunks: Vec<Bytes> = publisher.publish(upstream)?.try_collect().await?;
            assert_eq!(String::from_utf8(chunks.concat())?, NUMBERED);
            // Every publish starts from a reset header.
            assert_eq!(header.resets.load(Ordering::SeqCst), attempt);
        }
        Ok(())
    }
}
