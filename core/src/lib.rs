//! Core components for aws-chunked payload encoding.
//!
//! This crate provides the service-neutral half of streaming payload signing: the
//! aws-chunked framing, the blocking and async encoders, and the contracts that
//! signature and checksum providers plug into.
//!
//! ## Overview
//!
//! - **Framing**: [`chunked::ChunkFramer`] renders data chunks, the final chunk and the
//!   trailer part.
//! - **Encoders**: [`chunked::ChunkedEncodedInputStream`] wraps a blocking [`std::io::Read`]
//!   source, [`chunked::ChunkedEncodedPublisher`] wraps a [`futures::Stream`] of
//!   [`bytes::Bytes`]. Both emit the same bytes for the same payload.
//! - **Providers**: [`chunked::ChunkExtensionProvider`] and [`chunked::TrailerProvider`]
//!   compute per-chunk extensions and trailers, resettable for retries.
//!
//! ## Example
//!
//! ```
//! use std::io::{Cursor, Read};
//! use std::sync::Arc;
//! use chunksign_core::checksum::{ChecksumAlgorithm, SharedChecksum};
//! use chunksign_core::chunked::{ChecksumTrailerProvider, ChunkedEncodedInputStream, ChunkedEncodedPayload};
//!
//! # fn main() -> chunksign_core::Result<()> {
//! let checksum = SharedChecksum::from_algorithm(ChecksumAlgorithm::Sha256);
//! let mut builder = ChunkedEncodedInputStream::builder()
//!     .source(Cursor::new(b"hello world".to_vec()))
//!     .chunk_size(8);
//! builder.checksum_payload(checksum.clone());
//! builder.add_trailer(Arc::new(ChecksumTrailerProvider::new(
//!     checksum,
//!     ChecksumAlgorithm::Sha256.header_name(),
//! )));
//!
//! let mut body = String::new();
//! builder.build()?.read_to_string(&mut body)?;
//! assert!(body.starts_with("8\r\nhello wo\r\n3\r\nrld\r\n0\r\n"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Utilities
//!
//! - [`hash`]: Cryptographic hashing utilities
//! - [`time`]: Time formatting utilities
//! - [`checksum`]: Running checksums and the payload tee
//! - [`utils`]: General utilities including data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod checksum;
pub mod chunked;
pub mod hash;
pub mod time;
pub mod utils;

mod error;
pub use error::Error;
pub use error::ErrorKind;
pub use error::Result;
