//! AWS SigV4 aws-chunked payload signing.
//!
//! This crate encodes request bodies in the SigV4 streaming formats: every chunk carries
//! a `chunk-signature` chained from the request signature, and the trailer part can carry
//! checksums plus an `x-amz-trailer-signature`.
//!
//! ## Example
//!
//! ```
//! use std::io::{Cursor, Read};
//! use chunksign_aws_v4::{generate_signing_key, AwsChunkedV4PayloadSigner, CredentialScope};
//! use chunksign_core::checksum::ChecksumAlgorithm;
//! use chunksign_core::time::now;
//!
//! # fn main() -> chunksign_core::Result<()> {
//! let scope = CredentialScope::new("us-east-1", "s3", now());
//! let signer = AwsChunkedV4PayloadSigner::builder()
//!     .credential_scope(scope.clone())
//!     .chunk_size(64 * 1024)
//!     .checksum_algorithm(ChecksumAlgorithm::Sha256)
//!     .build()?;
//!
//! let body = b"hello world".to_vec();
//! let (mut parts, _) = http::Request::put("https://bucket.s3.amazonaws.com/key")
//!     .header("content-length", body.len())
//!     .header("x-amz-content-sha256", "STREAMING-AWS4-HMAC-SHA256-PAYLOAD-TRAILER")
//!     .body(())?
//!     .into_parts();
//!
//! // Rewrite the headers, then sign the request with them.
//! let prepared = signer.before_signing(&mut parts)?;
//! let signing_key = generate_signing_key("secret_access_key", &scope);
//! let seed_signature = "<signature of the request>";
//!
//! let ctx = prepared.with_signature(signing_key, seed_signature);
//! let mut encoded = Vec::new();
//! signer.sign(Cursor::new(body), &ctx)?.read_to_end(&mut encoded)?;
//! assert_eq!(parts.headers["content-length"], encoded.len().to_string().as_str());
//! # Ok(())
//! # }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

mod constants;

mod canonical;
pub use canonical::canonical_headers_string;

mod credential_scope;
pub use credential_scope::generate_signing_key;
pub use credential_scope::CredentialScope;

mod rolling_signer;
pub use rolling_signer::RollingSigner;

mod chunk_extension;
pub use chunk_extension::SigV4ChunkExtensionProvider;

mod trailer;
pub use trailer::SigV4TrailerProvider;

mod payload_signer;
pub use payload_signer::AwsChunkedV4PayloadSigner;
pub use payload_signer::AwsChunkedV4PayloadSignerBuilder;
pub use payload_signer::PreparedPayload;
pub use payload_signer::SigningContext;
pub use payload_signer::StreamingMode;
