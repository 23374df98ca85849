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
use std::fmt::Display;
use std::fmt::Formatter;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use chunksign_core::checksum::ChecksumAlgorithm;
use chunksign_core::checksum::SharedChecksum;
use chunksign_core::chunked::ChecksumTrailerProvider;
use chunksign_core::chunked::ChunkedEncodedInputStream;
use chunksign_core::chunked::ChunkedEncodedPayload;
use chunksign_core::chunked::ChunkedEncodedPublisher;
use chunksign_core::chunked::ChunkedEncodedStream;
use chunksign_core::chunked::StaticTrailerProvider;
use chunksign_core::chunked::Trailer;
use chunksign_core::utils::Redact;
use chunksign_core::Error;
use chunksign_core::Result;
use futures::Stream;
use http::header::CONTENT_ENCODING;
use http::header::CONTENT_LENGTH;
use http::request::Parts;
use http::HeaderValue;
use log::debug;

use crate::constants::AWS_CHUNKED;
use crate::constants::CHUNK_SIGNATURE_EXTENSION_LENGTH;
use crate::constants::DEFAULT_CHUNK_SIZE;
use crate::constants::STREAMING_SIGNED_PAYLOAD;
use crate::constants::STREAMING_SIGNED_PAYLOAD_TRAILER;
use crate::constants::STREAMING_UNSIGNED_PAYLOAD_TRAILER;
use crate::constants::TRAILER_SIGNATURE_LENGTH;
use crate::constants::X_AMZ_CONTENT_SHA_256;
use crate::constants::X_AMZ_DECODED_CONTENT_LENGTH;
use crate::constants::X_AMZ_TRAILER;
use crate::CredentialScope;
use crate::RollingSigner;
use crate::SigV4ChunkExtensionProvider;
use crate::SigV4TrailerProvider;

/// StreamingMode is the aws-chunked flavour selected by `x-amz-content-sha256`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamingMode {
    /// `STREAMING-AWS4-HMAC-SHA256-PAYLOAD`: signed chunks, no trailers.
    SignedPayload,
    /// `STREAMING-AWS4-HMAC-SHA256-PAYLOAD-TRAILER`: signed chunks and signed trailers.
    SignedPayloadTrailer,
    /// `STREAMING-UNSIGNED-PAYLOAD-TRAILER`: plain chunks and unsigned trailers.
    UnsignedPayloadTrailer,
}

impl StreamingMode {
    /// Value of `x-amz-content-sha256` for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamingMode::SignedPayload => STREAMING_SIGNED_PAYLOAD,
            StreamingMode::SignedPayloadTrailer => STREAMING_SIGNED_PAYLOAD_TRAILER,
            StreamingMode::UnsignedPayloadTrailer => STREAMING_UNSIGNED_PAYLOAD_TRAILER,
        }
    }

    /// Whether chunks and trailers carry signatures.
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            StreamingMode::SignedPayload | StreamingMode::SignedPayloadTrailer
        )
    }

    /// Whether the body ends with a trailer part.
    pub fn has_trailer(&self) -> bool {
        matches!(
            self,
            StreamingMode::SignedPayloadTrailer | StreamingMode::UnsignedPayloadTrailer
        )
    }
}

impl Display for StreamingMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            STREAMING_SIGNED_PAYLOAD => Ok(StreamingMode::SignedPayload),
            STREAMING_SIGNED_PAYLOAD_TRAILER => Ok(StreamingMode::SignedPayloadTrailer),
            STREAMING_UNSIGNED_PAYLOAD_TRAILER => Ok(StreamingMode::UnsignedPayloadTrailer),
            v => Err(Error::request_invalid(format!(
                "{X_AMZ_CONTENT_SHA_256} {v} is not an aws-chunked streaming mode"
            ))),
        }
    }
}

/// PreparedPayload describes a request body after its headers were rewritten for
/// aws-chunked encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPayload {
    mode: StreamingMode,
    decoded_content_length: u64,
    trailers: Vec<Trailer>,
}

impl PreparedPayload {
    /// Create a payload without pre-existing trailers.
    pub fn new(mode: StreamingMode, decoded_content_length: u64) -> Self {
        Self {
            mode,
            decoded_content_length,
            trailers: Vec::new(),
        }
    }

    /// Streaming mode of this payload.
    pub fn mode(&self) -> StreamingMode {
        self.mode
    }

    /// Length of the payload before encoding.
    pub fn decoded_content_length(&self) -> u64 {
        self.decoded_content_length
    }

    /// Trailers moved out of the request headers, in `x-amz-trailer` order.
    pub fn trailers(&self) -> &[Trailer] {
        &self.trailers
    }

    /// Attach the signing key and the seed signature of the signed request.
    pub fn with_signature(
        self,
        signing_key: impl Into<Vec<u8>>,
        seed_signature: impl Into<String>,
    ) -> SigningContext {
        SigningContext {
            payload: self,
            signing_key: signing_key.into(),
            seed_signature: seed_signature.into(),
        }
    }
}

/// SigningContext carries everything a payload needs to be encoded.
#[derive(Clone)]
pub struct SigningContext {
    payload: PreparedPayload,
    signing_key: Vec<u8>,
    seed_signature: String,
}

impl Debug for SigningContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let key = hex::encode(&self.signing_key);
        f.debug_struct("SigningContext")
            .field("payload", &self.payload)
            .field("signing_key", &Redact::from(&key))
            .field("seed_signature", &self.seed_signature)
            .finish()
    }
}

impl SigningContext {
    /// The prepared payload.
    pub fn payload(&self) -> &PreparedPayload {
        &self.payload
    }

    /// The seed signature chunk signatures chain from.
    pub fn seed_signature(&self) -> &str {
        &self.seed_signature
    }
}

/// AwsChunkedV4PayloadSigner encodes request bodies as SigV4 aws-chunked payloads.
///
/// Signing a streaming request happens in two steps:
///
/// 1. [`before_signing`](Self::before_signing) rewrites the request headers so that the
///    canonical request covers the aws-chunked body.
/// 2. After the request was signed, [`sign`](Self::sign) or
///    [`sign_async`](Self::sign_async) encode the body, chaining every chunk signature
///    from the request signature.
#[derive(Debug, Clone)]
pub struct AwsChunkedV4PayloadSigner {
    credential_scope: CredentialScope,
    chunk_size: usize,
    checksum_algorithm: Option<ChecksumAlgorithm>,
}

impl AwsChunkedV4PayloadSigner {
    /// Create a new builder.
    pub fn builder() -> AwsChunkedV4PayloadSignerBuilder {
        AwsChunkedV4PayloadSignerBuilder::default()
    }

    /// Rewrite the headers of `parts` for an aws-chunked body.
    ///
    /// - `Content-Length` moves to `x-amz-decoded-content-length` and is replaced by the
    ///   encoded length.
    /// - Headers named by `x-amz-trailer` move out of the request into the trailer part.
    /// - The checksum trailer, if any, is announced in `x-amz-trailer`.
    /// - `aws-chunked` is prepended to `Content-Encoding`.
    ///
    /// The decoded length is taken from `Content-Length`, then from an existing
    /// `x-amz-decoded-content-length`. Use
    /// [`before_signing_with_payload`](Self::before_signing_with_payload) when neither
    /// header is known.
    pub fn before_signing(&self, parts: &mut Parts) -> Result<PreparedPayload> {
        self.prepare(parts, None)
    }

    /// Same as [`before_signing`](Self::before_signing), but falls back to measuring
    /// `payload` when the request carries no length at all.
    ///
    /// The payload is measured from its current position to its end and left at the
    /// position it had before.
    pub fn before_signing_with_payload<R: Seek>(
        &self,
        parts: &mut Parts,
        payload: &mut R,
    ) -> Result<PreparedPayload> {
        let payload_length = if parts.headers.contains_key(CONTENT_LENGTH)
            || parts.headers.contains_key(X_AMZ_DECODED_CONTENT_LENGTH)
        {
            None
        } else {
            Some(remaining_length(payload)?)
        };
        self.prepare(parts, payload_length)
    }

    fn prepare(&self, parts: &mut Parts, payload_length: Option<u64>) -> Result<PreparedPayload> {
        let mode: StreamingMode = parts
            .headers
            .get(X_AMZ_CONTENT_SHA_256)
            .ok_or_else(|| {
                Error::request_invalid(format!("{X_AMZ_CONTENT_SHA_256} header is required"))
            })?
            .to_str()?
            .parse()?;

        let decoded_content_length = match (
            parts.headers.get(CONTENT_LENGTH),
            parts.headers.get(X_AMZ_DECODED_CONTENT_LENGTH),
            payload_length,
        ) {
            (Some(v), _, _) | (None, Some(v), _) => v.to_str()?.parse::<u64>()?,
            (None, None, Some(length)) => {
                debug!("content length unknown, measured payload of {length} bytes");
                length
            }
            (None, None, None) => {
                return Err(Error::request_invalid(format!(
                    "{X_AMZ_DECODED_CONTENT_LENGTH} header is required when content length is unknown"
                )))
            }
        };

        let trailers = take_trailers(parts, mode)?;
        if mode.has_trailer() {
            if let Some(algorithm) = self.checksum_algorithm {
                parts
                    .headers
                    .append(X_AMZ_TRAILER, HeaderValue::from_static(algorithm.header_name()));
            }
        }

        let content_encoding = match parts.headers.get(CONTENT_ENCODING) {
            Some(v) => {
                let v = v.to_str()?;
                if v.split(',').any(|e| e.trim().eq_ignore_ascii_case(AWS_CHUNKED)) {
                    v.to_string()
                } else {
                    format!("{AWS_CHUNKED},{v}")
                }
            }
            None => AWS_CHUNKED.to_string(),
        };
        parts
            .headers
            .insert(CONTENT_ENCODING, HeaderValue::from_str(&content_encoding)?);

        let encoded_content_length =
            self.encoded_content_length(decoded_content_length, mode, &trailers);
        parts.headers.insert(
            X_AMZ_DECODED_CONTENT_LENGTH,
            HeaderValue::from(decoded_content_length),
        );
        parts
            .headers
            .insert(CONTENT_LENGTH, HeaderValue::from(encoded_content_length));
        debug!(
            "prepared aws-chunked payload in mode {mode}: decoded length {decoded_content_length}, encoded length {encoded_content_length}"
        );

        Ok(PreparedPayload {
            mode,
            decoded_content_length,
            trailers,
        })
    }

    /// Encode a blocking payload.
    ///
    /// The returned stream can be [`reset`](ChunkedEncodedInputStream::reset) to send the
    /// same bytes again.
    pub fn sign<R: Read + Seek>(
        &self,
        payload: R,
        ctx: &SigningContext,
    ) -> Result<ChunkedEncodedInputStream<R>> {
        let mut builder = ChunkedEncodedInputStream::builder()
            .source(payload)
            .chunk_size(self.chunk_size);
        self.configure(&mut builder, ctx)?;
        builder.build()
    }

    /// Encode an async payload.
    pub fn sign_async<S, E>(&self, payload: S, ctx: &SigningContext) -> Result<ChunkedEncodedStream>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
        E: Into<anyhow::Error>,
    {
        self.publisher(ctx)?.publish(payload)
    }

    /// Build a publisher encoding async payloads, every
    /// [`publish`](ChunkedEncodedPublisher::publish) starts a fresh attempt.
    pub fn publisher(&self, ctx: &SigningContext) -> Result<ChunkedEncodedPublisher> {
        let mut builder = ChunkedEncodedPublisher::builder().chunk_size(self.chunk_size);
        self.configure(&mut builder, ctx)?;
        builder.build()
    }

    fn configure(&self, payload: &mut impl ChunkedEncodedPayload, ctx: &SigningContext) -> Result<()> {
        let mode = ctx.payload.mode;
        payload.decoded_content_length(ctx.payload.decoded_content_length);

        for trailer in &ctx.payload.trailers {
            payload.add_trailer(Arc::new(StaticTrailerProvider::new(trailer.clone())));
        }

        if mode.has_trailer() {
            if let Some(algorithm) = self.checksum_algorithm {
                let checksum = SharedChecksum::from_algorithm(algorithm);
                payload.checksum_payload(checksum.clone());
                payload.add_trailer(Arc::new(ChecksumTrailerProvider::new(
                    checksum,
                    algorithm.header_name(),
                )));
            }
        }

        if mode.is_signed() {
            let signer = Arc::new(RollingSigner::new(
                ctx.signing_key.clone(),
                ctx.seed_signature.clone(),
            )?);
            payload.add_extension(Arc::new(SigV4ChunkExtensionProvider::new(
                signer.clone(),
                self.credential_scope.clone(),
            )));

            if mode.has_trailer() {
                let trailers = payload.trailers();
                payload.add_trailer(Arc::new(SigV4TrailerProvider::new(
                    trailers,
                    signer,
                    self.credential_scope.clone(),
                )));
            }
        }

        Ok(())
    }

    /// Exact length of the encoded body of a `decoded_content_length` bytes payload.
    ///
    /// `trailers` are the pre-existing trailers, the checksum and signature trailers are
    /// accounted for by the signer.
    pub fn encoded_content_length(
        &self,
        decoded_content_length: u64,
        mode: StreamingMode,
        trailers: &[Trailer],
    ) -> u64 {
        let chunk_size = self.chunk_size as u64;
        let extension_length = if mode.is_signed() {
            CHUNK_SIGNATURE_EXTENSION_LENGTH
        } else {
            0
        };
        let chunk_length =
            |size: u64| format!("{size:x}").len() as u64 + extension_length + 2 + size + 2;

        let mut length = decoded_content_length / chunk_size * chunk_length(chunk_size);
        let remaining = decoded_content_length % chunk_size;
        if remaining > 0 {
            length += chunk_length(remaining);
        }
        // Final chunk
        length += 1 + extension_length + 2;

        if mode.has_trailer() {
            for trailer in trailers {
                length += (trailer.name.len() + 1 + trailer.values.join(",").len() + 2) as u64;
            }
            if let Some(algorithm) = self.checksum_algorithm {
                length += (algorithm.header_name().len() + 1 + algorithm.encoded_len() + 2) as u64;
            }
            if mode.is_signed() {
                length += TRAILER_SIGNATURE_LENGTH;
            }
        }

        // Terminating CRLF
        length + 2
    }
}

/// Move the headers named by `x-amz-trailer` out of `parts`.
fn take_trailers(parts: &mut Parts, mode: StreamingMode) -> Result<Vec<Trailer>> {
    let names = parts
        .headers
        .get_all(X_AMZ_TRAILER)
        .iter()
        .map(|v| v.to_str())
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .flat_map(|v| v.split(','))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>();
    if names.is_empty() {
        return Ok(Vec::new());
    }
    if !mode.has_trailer() {
        return Err(Error::request_invalid(format!(
            "{X_AMZ_TRAILER} is not allowed in streaming mode {mode}"
        )));
    }

    let mut trailers = Vec::with_capacity(names.len());
    for name in names {
        let values = parts
            .headers
            .get_all(name.as_str())
            .iter()
            .map(|v| v.to_str().map(|v| v.to_string()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if values.is_empty() {
            return Err(Error::request_invalid(format!(
                "trailer {name} is announced in {X_AMZ_TRAILER} but not present in headers"
            )));
        }
        parts.headers.remove(name.as_str());
        trailers.push(Trailer::new(name, values));
    }
    Ok(trailers)
}

/// Builder for [`AwsChunkedV4PayloadSigner`].
#[derive(Debug, Default)]
pub struct AwsChunkedV4PayloadSignerBuilder {
    credential_scope: Option<CredentialScope>,
    chunk_size: Option<usize>,
    checksum_algorithm: Option<ChecksumAlgorithm>,
}

impl AwsChunkedV4PayloadSignerBuilder {
    /// Set the credential scope the request was signed with.
    pub fn credential_scope(mut self, credential_scope: CredentialScope) -> Self {
        self.credential_scope = Some(credential_scope);
        self
    }

    /// Set the chunk size in bytes. Defaults to 128 KiB.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Send a checksum of the payload as a trailer in the trailer modes.
    pub fn checksum_algorithm(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.checksum_algorithm = Some(algorithm);
        self
    }

    /// Build the signer.
    pub fn build(self) -> Result<AwsChunkedV4PayloadSigner> {
        let credential_scope = self
            .credential_scope
            .ok_or_else(|| Error::config_invalid("credential scope is required"))?;
        let chunk_size = self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            return Err(Error::config_invalid("chunk size must be positive"));
        }

        Ok(AwsChunkedV4PayloadSigner {
            credential_scope,
            chunk_size,
            checksum_algorithm: self.checksum_algorithm,
        })
    }
}

/// Bytes left in `payload` from its current position, restoring that position.
fn remaining_length<R: Seek>(payload: &mut R) -> Result<u64> {
    let pos = payload.stream_position()?;
    let end = payload.seek(SeekFrom::End(0))?;
    payload.seek(SeekFrom::Start(pos))?;
    Ok(end.saturating_sub(pos))
}
