use std::io::Cursor;
use std::io::Read;

use anyhow::Result;
use chunksign_aws_v4::PreparedPayload;
use chunksign_aws_v4::StreamingMode;
use chunksign_core::checksum::ChecksumAlgorithm;
use chunksign_core::hash::hex_sha256;
use chunksign_core::hash::EMPTY_STRING_SHA256;
use hmac::Hmac;
use hmac::Mac;
use pretty_assertions::assert_eq;
use sha2::Sha256;

use crate::credential_scope;
use crate::decode;
use crate::init_logger;
use crate::request;
use crate::sign_blocking;
use crate::signed_chunks;
use crate::signer;
use crate::DATA;
use crate::FINAL_CHUNK_SIGNATURE;
use crate::SEED_SIGNATURE;

const SHA256_CHECKSUM: &str = "oVyCkrHRKru75BSGBfeHL732RWGP7lqw6AcqezTxVeI=";

fn hex_hmac(key: &[u8], content: &str) -> String {
    let mut h = Hmac::<Sha256>::new_from_slice(key).expect("hmac accepts any key length");
    h.update(content.as_bytes());
    hex::encode(h.finalize().into_bytes())
}

#[test]
fn test_signed_payload() -> Result<()> {
    init_logger();

    let signer = signer(None)?;
    let mut parts = request("STREAMING-AWS4-HMAC-SHA256-PAYLOAD", &[])?;
    let (_, body) = sign_blocking(&signer, &mut parts)?;

    assert_eq!(body, format!("{}\r\n", signed_chunks()));
    assert_eq!(parts.headers["x-amz-decoded-content-length"], "20");
    assert_eq!(parts.headers["content-length"], body.len().to_string().as_str());
    assert_eq!(parts.headers["content-encoding"], "aws-chunked");
    assert!(parts.headers.get("x-amz-trailer").is_none());
    Ok(())
}

#[test]
fn test_signed_payload_with_checksum_trailer() -> Result<()> {
    init_logger();

    let signer = signer(Some(ChecksumAlgorithm::Sha256))?;
    let mut parts = request("STREAMING-AWS4-HMAC-SHA256-PAYLOAD-TRAILER", &[])?;
    let (_, body) = sign_blocking(&signer, &mut parts)?;

    let expected = format!(
        "{}x-amz-checksum-sha256:{SHA256_CHECKSUM}\r\n\
         x-amz-trailer-signature:cfed3052c77d93f3bfd86d35e917b0787e17409a1fd44945755fd11df2fb8618\r\n\r\n",
        signed_chunks()
    );
    assert_eq!(body, expected);
    assert_eq!(parts.headers["x-amz-trailer"], "x-amz-checksum-sha256");
    assert_eq!(parts.headers["content-length"], body.len().to_string().as_str());
    Ok(())
}

#[test]
fn test_unsigned_payload_with_checksum_trailer() -> Result<()> {
    init_logger();

    let signer = signer(Some(ChecksumAlgorithm::Sha256))?;
    let mut parts = request("STREAMING-UNSIGNED-PAYLOAD-TRAILER", &[])?;
    let (_, body) = sign_blocking(&signer, &mut parts)?;

    let expected = format!(
        "4\r\n{{\"Ta\r\n4\r\nbleN\r\n4\r\name\"\r\n4\r\n: \"f\r\n4\r\noo\"}}\r\n0\r\n\
         x-amz-checksum-sha256:{SHA256_CHECKSUM}\r\n\r\n"
    );
    assert_eq!(body, expected);
    assert_eq!(parts.headers["content-length"], body.len().to_string().as_str());
    Ok(())
}

#[test]
fn test_unsigned_payload_with_existing_trailers() -> Result<()> {
    init_logger();

    let signer = signer(None)?;
    let mut parts = request("STREAMING-UNSIGNED-PAYLOAD-TRAILER", &[])?;
    parts.headers.append("preexistingheader1", "someValue1".parse()?);
    parts.headers.append("preexistingheader1", "someValue2".parse()?);
    parts.headers.append("preexistingheader2", "someValue3".parse()?);
    parts.headers.append("x-amz-trailer", "PreExistingHeader1".parse()?);
    parts.headers.append("x-amz-trailer", "PreExistingHeader2".parse()?);
    let (_, body) = sign_blocking(&signer, &mut parts)?;

    assert!(body.ends_with(
        "0\r\nPreExistingHeader1:someValue1,someValue2\r\nPreExistingHeader2:someValue3\r\n\r\n"
    ));
    assert!(!parts.headers.contains_key("preexistingheader1"));
    assert!(!parts.headers.contains_key("preexistingheader2"));
    assert_eq!(parts.headers["content-length"], body.len().to_string().as_str());
    Ok(())
}

#[test]
fn test_signed_payload_with_existing_trailers_and_checksum() -> Result<()> {
    init_logger();

    let signer = signer(Some(ChecksumAlgorithm::Sha256))?;
    let mut parts = request(
        "STREAMING-AWS4-HMAC-SHA256-PAYLOAD-TRAILER",
        &[
            ("preexistingheader1", "someValue1"),
            ("zzz", "123"),
            ("x-amz-trailer", "zzz, PreExistingHeader1"),
        ],
    )?;
    let (_, body) = sign_blocking(&signer, &mut parts)?;

    let expected = format!(
        "{}zzz:123\r\n\
         PreExistingHeader1:someValue1\r\n\
         x-amz-checksum-sha256:{SHA256_CHECKSUM}\r\n\
         x-amz-trailer-signature:fd1ac03ab9bb669acc7e1a543ea9718ce0785b1e9356180f3b5d395e5e24b34a\r\n\r\n",
        signed_chunks()
    );
    assert_eq!(body, expected);
    assert_eq!(
        parts
            .headers
            .get_all("x-amz-trailer")
            .iter()
            .map(|v| v.to_str())
            .collect::<std::result::Result<Vec<_>, _>>()?,
        vec!["zzz, PreExistingHeader1", "x-amz-checksum-sha256"]
    );
    assert_eq!(parts.headers["content-length"], body.len().to_string().as_str());
    Ok(())
}

#[test]
fn test_reset_replays_identical_bytes() -> Result<()> {
    init_logger();

    let signer = signer(Some(ChecksumAlgorithm::Sha1))?;
    let ctx = PreparedPayload::new(StreamingMode::SignedPayloadTrailer, DATA.len() as u64)
        .with_signature(b"key".to_vec(), SEED_SIGNATURE);
    let mut stream = signer.sign(Cursor::new(DATA), &ctx)?;

    let mut first = Vec::new();
    stream.read_to_end(&mut first)?;

    // Abandon the second attempt halfway.
    let mut partial = [0; 100];
    stream.reset()?;
    stream.read_exact(&mut partial)?;

    stream.reset()?;
    let mut second = Vec::new();
    stream.read_to_end(&mut second)?;

    assert_eq!(first, second);
    assert_eq!(&first[..100], &partial[..]);

    // A fresh stream from the same context yields the same bytes too.
    let mut third = Vec::new();
    signer.sign(Cursor::new(DATA), &ctx)?.read_to_end(&mut third)?;
    assert_eq!(first, third);
    Ok(())
}

#[test]
fn test_signatures_chain_from_seed() -> Result<()> {
    init_logger();

    let scope = credential_scope();
    let mut data = vec![0; 1000];
    rand::Rng::fill(&mut rand::thread_rng(), &mut data[..]);

    let signer = chunksign_aws_v4::AwsChunkedV4PayloadSigner::builder()
        .credential_scope(scope.clone())
        .chunk_size(64)
        .checksum_algorithm(ChecksumAlgorithm::Sha256)
        .build()?;
    let ctx = PreparedPayload::new(StreamingMode::SignedPayloadTrailer, data.len() as u64)
        .with_signature(b"key".to_vec(), SEED_SIGNATURE);
    let mut body = Vec::new();
    signer.sign(Cursor::new(data.clone()), &ctx)?.read_to_end(&mut body)?;

    let decoded = decode(&body)?;
    assert_eq!(decoded.payload(), data);
    assert_eq!(decoded.chunks.len(), 16);
    assert_eq!(decoded.chunks[15].0.len(), 1000 - 15 * 64);

    let mut previous = SEED_SIGNATURE.to_string();
    let chunks = decoded
        .chunks
        .iter()
        .map(|(data, exts)| (data.as_slice(), exts))
        .chain(std::iter::once((&[][..], &decoded.final_extensions)));
    for (data, exts) in chunks {
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256-PAYLOAD\n{}\n{}\n{previous}\n{EMPTY_STRING_SHA256}\n{}",
            scope.datetime(),
            scope.scope(),
            hex_sha256(data)
        );
        let expected = hex_hmac(b"key", &string_to_sign);
        assert_eq!(exts, &vec![("chunk-signature".to_string(), expected.clone())]);
        previous = expected;
    }

    let (name, checksum) = &decoded.trailers[0];
    assert_eq!(name, "x-amz-checksum-sha256");
    let canonical = format!("{name}:{checksum}\n");
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256-TRAILER\n{}\n{}\n{previous}\n{}",
        scope.datetime(),
        scope.scope(),
        hex_sha256(canonical.as_bytes())
    );
    assert_eq!(
        decoded.trailers[1],
        (
            "x-amz-trailer-signature".to_string(),
            hex_hmac(b"key", &string_to_sign)
        )
    );
    Ok(())
}

#[test]
fn test_empty_payload() -> Result<()> {
    init_logger();

    let signer = signer(None)?;
    let mut parts = http::Request::put("http://demo.us-east-1.amazonaws.com/")
        .header("content-length", 0)
        .header("x-amz-content-sha256", "STREAMING-AWS4-HMAC-SHA256-PAYLOAD")
        .body(())?
        .into_parts()
        .0;
    let ctx = signer
        .before_signing(&mut parts)?
        .with_signature(b"key".to_vec(), SEED_SIGNATURE);

    let mut body = String::new();
    signer.sign(Cursor::new(Vec::new()), &ctx)?.read_to_string(&mut body)?;

    let scope = credential_scope();
    let signature = hex_hmac(
        b"key",
        &format!(
            "AWS4-HMAC-SHA256-PAYLOAD\n{}\n{}\n{SEED_SIGNATURE}\n{EMPTY_STRING_SHA256}\n{EMPTY_STRING_SHA256}",
            scope.datetime(),
            scope.scope()
        ),
    );
    assert_eq!(body, format!("0;chunk-signature={signature}\r\n\r\n"));
    assert_eq!(parts.headers["content-length"], "86");
    Ok(())
}

#[test]
fn test_single_final_chunk() -> Result<()> {
    init_logger();

    let signer = signer(None)?;
    let mut parts = request("STREAMING-AWS4-HMAC-SHA256-PAYLOAD", &[])?;
    let (_, body) = sign_blocking(&signer, &mut parts)?;

    let decoded = decode(body.as_bytes())?;
    assert_eq!(decoded.payload(), DATA);
    assert!(decoded.chunks.iter().all(|(data, _)| !data.is_empty()));
    assert_eq!(
        decoded.final_extensions,
        vec![(
            "chunk-signature".to_string(),
            FINAL_CHUNK_SIGNATURE.to_string()
        )]
    );
    assert_eq!(body.matches("\r\n0;").count(), 1);
    Ok(())
}

#[test]
fn test_remainder_chunk() -> Result<()> {
    init_logger();

    let signer = signer(None)?;
    let data = b"{\"TableName\": \"foo\"}\n";
    let ctx = PreparedPayload::new(StreamingMode::SignedPayload, data.len() as u64)
        .with_signature(b"key".to_vec(), SEED_SIGNATURE);

    let mut body = Vec::new();
    signer.sign(Cursor::new(data), &ctx)?.read_to_end(&mut body)?;

    let decoded = decode(&body)?;
    assert_eq!(
        decoded.chunks.iter().map(|(d, _)| d.len()).collect::<Vec<_>>(),
        vec![4, 4, 4, 4, 4, 1]
    );
    assert_eq!(decoded.payload(), data);
    // Chunk signatures only depend on the bytes signed so far.
    assert_eq!(
        decoded.chunks[4].1,
        vec![(
            "chunk-signature".to_string(),
            crate::CHUNK_SIGNATURES[4].to_string()
        )]
    );
    assert_eq!(
        body.len() as u64,
        signer.encoded_content_length(data.len() as u64, StreamingMode::SignedPayload, &[])
    );
    Ok(())
}
