#![allow(missing_docs)]

use bytes::Bytes;
use futures::{stream, StreamExt};
use http::{header, HeaderValue};
use multiframe::{
    Frame, HeaderFields, IterationBehavior, Length, Multipart, MultipartError, ParseError,
    PartSchema, PartStream, ProtocolError, Transcoder, UsageError,
};

fn frames(
    items: Vec<Frame>,
) -> impl futures::Stream<Item = Result<Frame, MultipartError>> + Unpin + Send {
    stream::iter(items.into_iter().map(Ok))
}

fn named(name: &'static str) -> HeaderFields {
    HeaderFields::new().with(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("form-data; name=\"{name}\"")).expect("valid header"),
    )
}

fn bytes_stream(
    body: &'static str,
) -> impl futures::Stream<Item = Result<Bytes, MultipartError>> + Unpin + Send {
    stream::iter([Ok(Bytes::from_static(body.as_bytes()))])
}

#[tokio::test]
async fn streams_each_body_in_order() {
    let mut parts = PartStream::new(frames(vec![
        Frame::HeaderFields(named("first")),
        Frame::BodyChunk(Bytes::from_static(b"he")),
        Frame::BodyChunk(Bytes::from_static(b"llo")),
        Frame::HeaderFields(named("second")),
        Frame::HeaderFields(named("third")),
        Frame::BodyChunk(Bytes::from_static(b"!")),
    ]));

    let mut seen = Vec::new();
    while let Some(part) = parts.next().await {
        let part = part.expect("part should assemble");
        assert_eq!(part.body().iteration_behavior(), IterationBehavior::Single);
        let body = part.body().collect(1024).await.expect("body should stream");
        seen.push((part.name().unwrap_or_default(), body));
    }

    assert_eq!(
        seen,
        vec![
            ("first".to_owned(), Bytes::from_static(b"hello")),
            ("second".to_owned(), Bytes::new()),
            ("third".to_owned(), Bytes::from_static(b"!")),
        ]
    );
}

#[tokio::test]
async fn next_part_before_body_is_drained_is_a_usage_error() {
    let mut parts = PartStream::new(frames(vec![
        Frame::HeaderFields(named("first")),
        Frame::BodyChunk(Bytes::from_static(b"unread")),
        Frame::HeaderFields(named("second")),
    ]));

    let first = parts
        .next()
        .await
        .expect("first part should exist")
        .expect("first part should assemble");

    let err = parts
        .next()
        .await
        .expect("error item should exist")
        .expect_err("must fail");
    assert!(!err.is_recoverable());
    assert!(matches!(
        err,
        MultipartError::Usage(UsageError::NextPartBeforeBodyConsumed)
    ));

    drop(first);
}

#[tokio::test]
async fn partially_read_body_still_blocks_next_part() {
    let mut parts = PartStream::new(frames(vec![
        Frame::HeaderFields(named("first")),
        Frame::BodyChunk(Bytes::from_static(b"one")),
        Frame::BodyChunk(Bytes::from_static(b"two")),
        Frame::HeaderFields(named("second")),
    ]));

    let first = parts
        .next()
        .await
        .expect("first part should exist")
        .expect("first part should assemble");
    let mut body = first.body().iter().expect("first iterator should be granted");
    let chunk = body
        .next()
        .await
        .expect("chunk should exist")
        .expect("chunk should stream");
    assert_eq!(chunk, Bytes::from_static(b"one"));

    let err = parts
        .next()
        .await
        .expect("error item should exist")
        .expect_err("must fail");
    assert!(matches!(
        err,
        MultipartError::Usage(UsageError::NextPartBeforeBodyConsumed)
    ));
}

#[tokio::test]
async fn body_chunk_before_any_header_is_a_protocol_error() {
    let mut parts = PartStream::new(frames(vec![Frame::BodyChunk(Bytes::from_static(b"stray"))]));

    let err = parts
        .next()
        .await
        .expect("error item should exist")
        .expect_err("must fail");
    assert!(!err.is_recoverable());
    assert!(matches!(
        err,
        MultipartError::Protocol(ProtocolError::BodyChunkBeforeHeaders)
    ));
    assert!(parts.next().await.is_none());
}

#[tokio::test]
async fn second_iterator_on_decoded_body_is_rejected() {
    let mut parts = PartStream::new(frames(vec![
        Frame::HeaderFields(named("only")),
        Frame::BodyChunk(Bytes::from_static(b"data")),
    ]));

    let part = parts
        .next()
        .await
        .expect("part should exist")
        .expect("part should assemble");
    let body = part.body().collect(16).await.expect("body should stream");
    assert_eq!(body, Bytes::from_static(b"data"));

    let err = part.body().iter().expect_err("must fail");
    assert!(matches!(
        err,
        MultipartError::Usage(UsageError::IteratorAlreadyCreated)
    ));
    assert!(parts.next().await.is_none());
}

#[tokio::test]
async fn content_length_header_sets_known_length() {
    let body = concat!(
        "--B\r\n",
        "Content-Disposition: form-data; name=\"sized\"\r\n",
        "Content-Length: 5\r\n",
        "\r\n",
        "12345\r\n",
        "--B\r\n",
        "Content-Disposition: form-data; name=\"unsized\"\r\n",
        "\r\n",
        "abc\r\n",
        "--B--\r\n"
    );
    let mut multipart = Multipart::new("B", bytes_stream(body)).expect("boundary should be valid");

    let sized = multipart
        .next_part()
        .await
        .expect("part should parse")
        .expect("part should exist");
    assert_eq!(sized.body().length(), Length::Known(5));
    assert_eq!(sized.content_length(), Some(5));
    assert_eq!(
        sized.body().collect_text(5).await.expect("body should fit"),
        "12345"
    );

    let unsized_part = multipart
        .next_part()
        .await
        .expect("part should parse")
        .expect("part should exist");
    assert_eq!(unsized_part.body().length(), Length::Unknown);
    assert_eq!(
        unsized_part.body().collect_text(16).await.expect("body should fit"),
        "abc"
    );

    assert!(multipart.next_part().await.expect("end should parse").is_none());
}

#[tokio::test]
async fn parse_errors_surface_through_the_body_stream() {
    let body = concat!(
        "--B\r\n",
        "Content-Disposition: form-data; name=\"cut\"\r\n",
        "\r\n",
        "truncated"
    );
    let mut multipart = Multipart::new("B", bytes_stream(body)).expect("boundary should be valid");

    let part = multipart
        .next_part()
        .await
        .expect("headers should parse")
        .expect("part should exist");
    let err = part.body().collect(64).await.expect_err("must fail");
    assert!(err.is_recoverable());
    assert!(matches!(
        err,
        MultipartError::Parse(ParseError::IncompleteMessage)
    ));
}

const TRUNCATED: &str = concat!(
    "--B\r\n",
    "Content-Disposition: form-data; name=\"a\"\r\n",
    "\r\n",
    "truncated"
);

#[tokio::test]
async fn body_failure_is_reported_again_by_next_part() {
    let mut multipart =
        Multipart::new("B", bytes_stream(TRUNCATED)).expect("boundary should be valid");

    let part = multipart
        .next_part()
        .await
        .expect("headers should parse")
        .expect("part should exist");
    let err = part.body().collect(64).await.expect_err("must fail");
    assert!(matches!(err, MultipartError::Parse(ParseError::IncompleteMessage)));

    let err = multipart.next_part().await.expect_err("must not end cleanly");
    assert!(matches!(err, MultipartError::Parse(ParseError::IncompleteMessage)));
    assert!(multipart.next_part().await.expect("stream should be finished").is_none());
}

#[tokio::test]
async fn body_failure_is_not_masked_by_schema_checks() {
    let transcoder = Transcoder::builder()
        .schema(PartSchema::new().exactly_once("a").exactly_once("b"))
        .build()
        .expect("schema should validate");
    let mut multipart = transcoder
        .decode("B", bytes_stream(TRUNCATED))
        .expect("boundary should be valid");

    let part = multipart
        .next_part()
        .await
        .expect("headers should parse")
        .expect("part should exist");
    part.body().collect(64).await.expect_err("must fail");

    let err = multipart.next_part().await.expect_err("must not end cleanly");
    assert!(matches!(err, MultipartError::Parse(ParseError::IncompleteMessage)));
    assert!(multipart.next_part().await.expect("stream should be finished").is_none());
}

#[tokio::test]
async fn malformed_next_header_block_fails_both_consumers() {
    let body = concat!(
        "--B\r\n",
        "Content-Disposition: form-data; name=\"a\"\r\n",
        "\r\n",
        "first\r\n",
        "--B\r\n",
        "bad header\r\n",
        "\r\n",
        "second\r\n",
        "--B--\r\n"
    );
    let mut multipart = Multipart::new("B", bytes_stream(body)).expect("boundary should be valid");

    let part = multipart
        .next_part()
        .await
        .expect("headers should parse")
        .expect("part should exist");
    let err = part.body().collect(64).await.expect_err("must fail");
    assert!(matches!(
        err,
        MultipartError::Parse(ParseError::MalformedHeaderLine { .. })
    ));

    let err = multipart.next_part().await.expect_err("must not end cleanly");
    assert!(matches!(
        err,
        MultipartError::Parse(ParseError::MalformedHeaderLine { .. })
    ));
}

#[tokio::test]
async fn upstream_failure_mid_body_reaches_next_part() {
    let source = stream::iter([
        Ok(Bytes::from_static(
            b"--B\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\npartial",
        )),
        Err(MultipartError::upstream("connection reset")),
    ]);
    let mut multipart = Multipart::new("B", source).expect("boundary should be valid");

    let part = multipart
        .next_part()
        .await
        .expect("headers should parse")
        .expect("part should exist");
    let err = part.body().collect(64).await.expect_err("must fail");
    assert!(matches!(err, MultipartError::Upstream { .. }));

    let err = multipart.next_part().await.expect_err("must not end cleanly");
    assert!(err.to_string().contains("connection reset"));
}
