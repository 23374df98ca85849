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

use std::sync::Arc;

use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;
use log::debug;
use log::trace;

use super::ChunkExtensionProvider;
use super::ChunkHeaderProvider;
use super::HexLengthHeader;
use super::TrailerProvider;
use crate::Result;

const CRLF: &[u8] = b"\r\n";

/// ChunkFramer turns chunk payloads into aws-chunked frames.
///
/// The framer owns no stream state of its own; everything that changes from chunk to
/// chunk lives inside the providers. Both the blocking and the async encoder drive the
/// same framer so they can't diverge at the byte level.
#[derive(Debug, Clone)]
pub struct ChunkFramer {
    header: Arc<dyn ChunkHeaderProvider>,
    extensions: Vec<Arc<dyn ChunkExtensionProvider>>,
    trailers: Vec<Arc<dyn TrailerProvider>>,
}

impl Default for ChunkFramer {
    fn default() -> Self {
        Self::new(Arc::new(HexLengthHeader), Vec::new(), Vec::new())
    }
}

impl ChunkFramer {
    /// Create a new framer.
    pub fn new(
        header: Arc<dyn ChunkHeaderProvider>,
        extensions: Vec<Arc<dyn ChunkExtensionProvider>>,
        trailers: Vec<Arc<dyn TrailerProvider>>,
    ) -> Self {
        Self {
            header,
            extensions,
            trailers,
        }
    }

    /// Frame a data chunk:
    ///
    /// ```text
    /// hex-size *( ";" ext-name "=" ext-value ) CRLF chunk-data CRLF
    /// ```
    pub fn encode_chunk(&self, payload: &[u8]) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(payload.len() + 128);
        self.write_chunk_line(&mut buf, payload)?;
        buf.put_slice(payload);
        buf.put_slice(CRLF);

        trace!("framed data chunk of {} bytes", payload.len());
        Ok(buf.freeze())
    }

    /// Frame the final chunk together with the trailer part and the terminating CRLF:
    ///
    /// ```text
    /// "0" *( ";" ext-name "=" ext-value ) CRLF
    /// *( trailer-name ":" trailer-value *( "," trailer-value ) CRLF )
    /// CRLF
    /// ```
    pub fn encode_final_chunk(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(256);
        self.write_chunk_line(&mut buf, &[])?;

        for provider in &self.trailers {
            let trailer = provider.get()?;
            buf.put_slice(trailer.name.as_bytes());
            buf.put_u8(b':');
            for (idx, value) in trailer.values.iter().enumerate() {
                if idx > 0 {
                    buf.put_u8(b',');
                }
                buf.put_slice(value.as_bytes());
            }
            buf.put_slice(CRLF);
        }
        buf.put_slice(CRLF);

        debug!(
            "framed final chunk with {} trailer(s), {} bytes",
            self.trailers.len(),
            buf.len()
        );
        Ok(buf.freeze())
    }

    /// Reset the header, every extension and every trailer provider.
    pub fn reset(&self) -> Result<()> {
        self.header.reset()?;
        for extension in &self.extensions {
            extension.reset()?;
        }
        for trailer in &self.trailers {
            trailer.reset()?;
        }
        Ok(())
    }

    fn write_chunk_line(&self, buf: &mut BytesMut, payload: &[u8]) -> Result<()> {
        buf.put_slice(&self.header.header(payload)?);
        for provider in &self.extensions {
            let ext = provider.get(payload)?;
            buf.put_u8(b';');
            buf.put_slice(&ext.name);
            buf.put_u8(b'=');
            buf.put_slice(&ext.value);
        }
        buf.put_slice(CRLF);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunked::ChunkExtension;
    use crate::chunked::StaticTrailerProvider;
    use crate::chunked::Trailer;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    #[derive(Debug, Default)]
    struct CountingExtension {
        count: AtomicUsize,
    }

    impl ChunkExtensionProvider for CountingExtension {
        fn get(&self, chunk: &[u8]) -> Result<ChunkExtension> {
            let n = self.count.fetch_add(1, Ordering::SeqCst);
            Ok(ChunkExtension::new(
                "n",
                format!("{n}-{}", chunk.len()).into_bytes(),
            ))
        }

        fn reset(&self) -> Result<()> {
            self.count.store(0, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_encode_plain_chunks() -> anyhow::Result<()> {
        let framer = ChunkFramer::default();
        assert_eq!(framer.encode_chunk(b"hello")?, Bytes::from("5\r\nhello\r\n"));
        assert_eq!(
            framer.encode_chunk(&[b'a'; 26])?.len(),
            "1a\r\n".len() + 26 + 2
        );
        assert_eq!(framer.encode_final_chunk()?, Bytes::from("0\r\n\r\n"));
        Ok(())
    }

    #[test]
    fn test_encode_extensions_and_trailers() -> anyhow::Result<()> {
        let ext = Arc::new(CountingExtension::default());
        let framer = ChunkFramer::new(
            Arc::new(HexLengthHeader),
            vec![ext.clone()],
            vec![
                Arc::new(StaticTrailerProvider::new(Trailer::new(
                    "a",
                    vec!["1".to_string(), "2".to_string()],
                ))),
                Arc::new(StaticTrailerProvider::new(Trailer::new("b", vec![]))),
            ],
        );

        assert_eq!(framer.encode_chunk(b"xy")?, Bytes::from("2;n=0-2\r\nxy\r\n"));
        assert_eq!(
            framer.encode_final_chunk()?,
            Bytes::from("0;n=1-0\r\na:1,2\r\nb:\r\n\r\n")
        );

        framer.reset()?;
        assert_eq!(framer.encode_chunk(b"xy")?, Bytes::from("2;n=0-2\r\nxy\r\n"));
        Ok(())
    }
}
