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

//! aws-chunked encoding.
//!
//! ```text
//! chunked-body = *chunk final-chunk trailer-part CRLF
//! chunk        = hex-size *( ";" ext-name "=" ext-value ) CRLF chunk-data CRLF
//! final-chunk  = "0" *( ";" ext-name "=" ext-value ) CRLF
//! trailer-part = *( trailer-name ":" trailer-value *( "," trailer-value ) CRLF )
//! ```

mod provider;
pub use provider::ChunkExtension;
pub use provider::ChunkExtensionProvider;
pub use provider::ChunkHeaderProvider;
pub use provider::HexLengthHeader;
pub use provider::StaticTrailerProvider;
pub use provider::Trailer;
pub use provider::TrailerProvider;

mod chunk;
pub use chunk::Chunk;

mod framer;
pub use framer::ChunkFramer;

mod checksum_trailer;
pub use checksum_trailer::ChecksumTrailerProvider;

mod payload;
pub use payload::ChunkedEncodedPayload;

mod input_stream;
pub use input_stream::ChunkedEncodedInputStream;
pub use input_stream::ChunkedEncodedInputStreamBuilder;

mod publisher;
pub use publisher::ChunkedEncodedPublisher;
pub use publisher::ChunkedEncodedPublisherBuilder;
pub use publisher::ChunkedEncodedStream;
