use std::io;

use anyhow::Result;
use bytes::Bytes;
use chunksign_aws_v4::PreparedPayload;
use chunksign_aws_v4::StreamingMode;
use chunksign_core::checksum::ChecksumAlgorithm;
use chunksign_core::chunked::ChunkedEncodedStream;
use chunksign_core::ErrorKind;
use futures::stream;
use futures::StreamExt;
use futures::TryStreamExt;
use pretty_assertions::assert_eq;
use rand::Rng;
use test_case::test_case;

use crate::init_logger;
use crate::request;
use crate::sign_blocking;
use crate::signer;
use crate::DATA;
use crate::SEED_SIGNATURE;

/// Split `data` into randomly sized buffers, empty ones included.
fn random_split(data: &[u8]) -> Vec<Bytes> {
    let mut rng = rand::thread_rng();
    let mut buffers = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let n = rng.gen_range(0..=rest.len().min(9));
        buffers.push(Bytes::copy_from_slice(&rest[..n]));
        rest = &rest[n..];
    }
    buffers
}

async fn collect(stream: ChunkedEncodedStream) -> Result<Vec<u8>> {
    let frames = stream.try_collect::<Vec<Bytes>>().await?;
    Ok(frames.concat())
}

#[test_case("STREAMING-AWS4-HMAC-SHA256-PAYLOAD", None; "signed")]
#[test_case("STREAMING-AWS4-HMAC-SHA256-PAYLOAD-TRAILER", Some(ChecksumAlgorithm::Sha256); "signed trailer")]
#[test_case("STREAMING-UNSIGNED-PAYLOAD-TRAILER", Some(ChecksumAlgorithm::Sha1); "unsigned trailer")]
#[tokio::test]
async fn test_async_matches_blocking(mode: &str, checksum: Option<ChecksumAlgorithm>) {
    init_logger();

    let signer = signer(checksum).expect("signer must be valid");
    let mut parts = request(mode, &[]).expect("request must be valid");
    let (ctx, expected) = sign_blocking(&signer, &mut parts).expect("blocking sign must succeed");

    for _ in 0..20 {
        let upstream = stream::iter(random_split(DATA).into_iter().map(Ok::<_, io::Error>));
        let stream = signer
            .sign_async(upstream, &ctx)
            .expect("async sign must succeed");
        let body = collect(stream).await.expect("stream must succeed");
        assert_eq!(String::from_utf8(body).expect("must be utf-8"), expected);
    }
}

#[tokio::test]
async fn test_publisher_can_be_replayed() -> Result<()> {
    init_logger();

    let signer = signer(Some(ChecksumAlgorithm::Sha256))?;
    let ctx = PreparedPayload::new(StreamingMode::SignedPayloadTrailer, DATA.len() as u64)
        .with_signature(b"key".to_vec(), SEED_SIGNATURE);
    let publisher = signer.publisher(&ctx)?;
    assert_eq!(publisher.decoded_content_length(), Some(DATA.len() as u64));

    let first = collect(publisher.publish(stream::iter(vec![Ok::<_, io::Error>(
        Bytes::from_static(DATA),
    )]))?)
    .await?;

    // Abandon an attempt after the first frame.
    let mut abandoned = publisher.publish(stream::iter(vec![Ok::<_, io::Error>(
        Bytes::from_static(DATA),
    )]))?;
    assert!(abandoned.next().await.is_some());
    drop(abandoned);

    let second = collect(publisher.publish(stream::iter(vec![Ok::<_, io::Error>(
        Bytes::from_static(DATA),
    )]))?)
    .await?;
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn test_empty_upstream() -> Result<()> {
    init_logger();

    let signer = signer(None)?;
    let ctx = PreparedPayload::new(StreamingMode::SignedPayload, 0)
        .with_signature(b"key".to_vec(), SEED_SIGNATURE);

    let upstream = stream::iter(vec![Ok::<_, io::Error>(Bytes::new())]);
    let body = String::from_utf8(collect(signer.sign_async(upstream, &ctx)?).await?)?;

    assert!(body.starts_with("0;chunk-signature="));
    assert!(body.ends_with("\r\n\r\n"));
    assert_eq!(
        body.len() as u64,
        signer.encoded_content_length(0, StreamingMode::SignedPayload, &[])
    );
    Ok(())
}

#[tokio::test]
async fn test_upstream_error_ends_stream() -> Result<()> {
    init_logger();

    let signer = signer(None)?;
    let ctx = PreparedPayload::new(StreamingMode::SignedPayload, DATA.len() as u64)
        .with_signature(b"key".to_vec(), SEED_SIGNATURE);

    let upstream = stream::iter(vec![
        Ok(Bytes::from_static(b"{\"TableName\"")),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
        Ok(Bytes::from_static(b": \"foo\"}")),
    ]);
    let items = signer.sign_async(upstream, &ctx)?.collect::<Vec<_>>().await;

    // Three complete chunks, then the error, then nothing.
    assert_eq!(items.len(), 4);
    assert!(items[..3].iter().all(|item| item.is_ok()));
    let err = items[3].as_ref().expect_err("must be an error");
    assert_eq!(err.kind(), ErrorKind::Io);
    Ok(())
}
