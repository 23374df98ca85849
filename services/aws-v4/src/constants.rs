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

// Headers used in aws-chunked requests.
pub const X_AMZ_CONTENT_SHA_256: &str = "x-amz-content-sha256";
pub const X_AMZ_DECODED_CONTENT_LENGTH: &str = "x-amz-decoded-content-length";
pub const X_AMZ_TRAILER: &str = "x-amz-trailer";
pub const X_AMZ_TRAILER_SIGNATURE: &str = "x-amz-trailer-signature";

// Chunk extension carrying the chunk signature.
pub const CHUNK_SIGNATURE: &str = "chunk-signature";

// Content encoding of aws-chunked bodies.
pub const AWS_CHUNKED: &str = "aws-chunked";

// String to sign algorithms.
pub const AWS4_HMAC_SHA256_PAYLOAD: &str = "AWS4-HMAC-SHA256-PAYLOAD";
pub const AWS4_HMAC_SHA256_TRAILER: &str = "AWS4-HMAC-SHA256-TRAILER";

// x-amz-content-sha256 values selecting the streaming mode.
pub const STREAMING_SIGNED_PAYLOAD: &str = "STREAMING-AWS4-HMAC-SHA256-PAYLOAD";
pub const STREAMING_SIGNED_PAYLOAD_TRAILER: &str = "STREAMING-AWS4-HMAC-SHA256-PAYLOAD-TRAILER";
pub const STREAMING_UNSIGNED_PAYLOAD_TRAILER: &str = "STREAMING-UNSIGNED-PAYLOAD-TRAILER";

/// Length of `;chunk-signature=<64 hex chars>`.
pub const CHUNK_SIGNATURE_EXTENSION_LENGTH: u64 = 1 + 15 + 1 + 64;

/// Length of `x-amz-trailer-signature:<64 hex chars>\r\n`.
pub const TRAILER_SIGNATURE_LENGTH: u64 = 23 + 1 + 64 + 2;

/// Chunk size used when none is configured, 128 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 128 * 1024;
