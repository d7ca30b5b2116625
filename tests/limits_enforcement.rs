#![allow(missing_docs)]

use bytes::Bytes;
use futures::stream;
use multiframe::{Limits, MultipartConfig, MultipartError, ParseError, Transcoder};

fn message(parts: usize) -> Bytes {
    let mut body = String::new();
    for index in 0..parts {
        body.push_str(&format!(
            "--LB\r\nContent-Disposition: form-data; name=\"p{index}\"\r\n\r\n{index}\r\n"
        ));
    }
    body.push_str("--LB--\r\n");
    Bytes::from(body)
}

#[tokio::test]
async fn max_parts_stops_the_stream() {
    let transcoder = Transcoder::builder()
        .max_parts(2)
        .build()
        .expect("config should validate");
    let mut multipart = transcoder
        .decode("LB", stream::iter([Ok::<_, MultipartError>(message(3))]))
        .expect("boundary should be valid");

    for _ in 0..2 {
        let part = multipart
            .next_part()
            .await
            .expect("part should parse")
            .expect("part should exist");
        part.body().collect(16).await.expect("body should stream");
    }

    let err = multipart.next_part().await.expect_err("must fail");
    assert!(err.is_recoverable());
    assert!(matches!(err, MultipartError::PartsLimitExceeded { max_parts: 2 }));
    assert!(multipart.next_part().await.expect("stream should be finished").is_none());
}

#[tokio::test]
async fn max_parts_allows_exact_count() {
    let transcoder = Transcoder::builder()
        .max_parts(3)
        .build()
        .expect("config should validate");
    let mut multipart = transcoder
        .decode("LB", stream::iter([Ok::<_, MultipartError>(message(3))]))
        .expect("boundary should be valid");

    let mut count = 0;
    while let Some(part) = multipart.next_part().await.expect("part should parse") {
        part.body().collect(16).await.expect("body should stream");
        count += 1;
    }
    assert_eq!(count, 3);
}

fn header_limited(max_header_bytes: usize) -> Transcoder {
    Transcoder::with_config(MultipartConfig {
        limits: Limits {
            max_header_bytes: Some(max_header_bytes),
            max_parts: None,
        },
        schema: None,
    })
    .expect("config should validate")
}

#[tokio::test]
async fn header_limit_applies_per_part() {
    let header = format!("X-Filler: {}\r\n", "f".repeat(40));
    let body = format!("--LB\r\n{header}\r\none\r\n--LB\r\n{header}\r\ntwo\r\n--LB--\r\n");
    let mut multipart = header_limited(80)
        .decode("LB", stream::iter([Ok::<_, MultipartError>(Bytes::from(body))]))
        .expect("boundary should be valid");

    let mut bodies = Vec::new();
    while let Some(part) = multipart.next_part().await.expect("each header block fits") {
        bodies.push(part.body().collect_text(8).await.expect("text"));
    }
    assert_eq!(bodies, vec!["one".to_owned(), "two".to_owned()]);
}

#[tokio::test]
async fn oversized_header_block_is_rejected() {
    let header = format!("X-Filler: {}\r\n", "f".repeat(40));
    let body = format!("--LB\r\n{header}{header}\r\none\r\n--LB--\r\n");
    let mut multipart = header_limited(80)
        .decode("LB", stream::iter([Ok::<_, MultipartError>(Bytes::from(body))]))
        .expect("boundary should be valid");

    let err = multipart.next_part().await.expect_err("must fail");
    assert!(matches!(
        err,
        MultipartError::Parse(ParseError::HeaderBlockTooLarge { limit: 80 })
    ));
    assert!(multipart.next_part().await.expect("stream should be finished").is_none());
}

#[tokio::test]
async fn unlimited_header_blocks_are_accepted() {
    let body = format!(
        "--LB\r\nX-Huge: {}\r\n\r\nok\r\n--LB--\r\n",
        "h".repeat(64 * 1024)
    );
    let transcoder = Transcoder::builder()
        .limits(Limits::unlimited())
        .build()
        .expect("config should validate");
    let mut multipart = transcoder
        .decode("LB", stream::iter([Ok::<_, MultipartError>(Bytes::from(body))]))
        .expect("boundary should be valid");

    let part = multipart
        .next_part()
        .await
        .expect("part should parse")
        .expect("part should exist");
    assert_eq!(part.body().collect_text(8).await.expect("text"), "ok");
}
