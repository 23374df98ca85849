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

use super::ChunkExtensionProvider;
use super::ChunkFramer;
use super::ChunkHeaderProvider;
use super::HexLengthHeader;
use super::TrailerProvider;
use crate::checksum::SharedChecksum;
use crate::Error;
use crate::Result;

/// ChunkedEncodedPayload is the surface shared by the blocking and the async encoder
/// builders.
///
/// Callers wiring up signatures and checksums only talk to this trait, so the same code
/// configures both execution models.
pub trait ChunkedEncodedPayload {
    /// Append a trailer provider. Trailers are rendered in insertion order.
    fn add_trailer(&mut self, trailer: Arc<dyn TrailerProvider>);

    /// Trailer providers added so far.
    fn trailers(&self) -> Vec<Arc<dyn TrailerProvider>>;

    /// Append a chunk extension provider. Extensions are rendered in insertion order.
    fn add_extension(&mut self, extension: Arc<dyn ChunkExtensionProvider>);

    /// Tee every raw payload byte into `checksum` before chunking.
    fn checksum_payload(&mut self, checksum: SharedChecksum);

    /// Record the payload length before encoding.
    fn decoded_content_length(&mut self, length: u64);
}

/// Options collected by both encoder builders.
#[derive(Debug, Clone, Default)]
pub(crate) struct EncodingOptions {
    pub chunk_size: Option<usize>,
    pub header: Option<Arc<dyn ChunkHeaderProvider>>,
    pub extensions: Vec<Arc<dyn ChunkExtensionProvider>>,
    pub trailers: Vec<Arc<dyn TrailerProvider>>,
    pub checksums: Vec<SharedChecksum>,
    pub decoded_content_length: Option<u64>,
}

impl EncodingOptions {
    /// Validate the options, returning the chunk size and the framer.
    pub fn validate(&self) -> Result<(usize, ChunkFramer)> {
        let chunk_size = match self.chunk_size {
            None => return Err(Error::config_invalid("chunk size is required")),
            Some(0) => return Err(Error::config_invalid("chunk size must be positive")),
            Some(v) => v,
        };

        let header = self
            .header
            .clone()
            .unwrap_or_else(|| Arc::new(HexLengthHeader));

        Ok((
            chunk_size,
            ChunkFramer::new(header, self.extensions.clone(), self.trailers.clone()),
        ))
    }
}
