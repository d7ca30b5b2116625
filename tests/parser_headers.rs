#![allow(missing_docs)]

use http::{header, HeaderValue};
use multiframe::{
    parser::headers::{parse_content_disposition, parse_part_content_type},
    ContentDisposition, HeaderFields, Part,
};

#[test]
fn parses_content_disposition_name_and_filename() {
    let parsed = parse_content_disposition("form-data; name=\"avatar\"; filename=\"face.png\"")
        .expect("header should parse");

    assert_eq!(parsed.disposition, "form-data");
    assert_eq!(parsed.name.as_deref(), Some("avatar"));
    assert_eq!(parsed.filename.as_deref(), Some("face.png"));
}

#[test]
fn parses_escaped_quoted_values() {
    let parsed =
        parse_content_disposition("form-data; name=\"fi\\\"eld\"; filename=\"te\\\\st.txt\"")
            .expect("header should parse");

    assert_eq!(parsed.name.as_deref(), Some("fi\"eld"));
    assert_eq!(parsed.filename.as_deref(), Some("te\\st.txt"));
}

#[test]
fn filename_star_takes_precedence_over_filename() {
    let parsed = parse_content_disposition(
        "form-data; name=\"upload\"; filename=\"fallback.txt\"; filename*=UTF-8''real%20name.txt",
    )
    .expect("header should parse");

    assert_eq!(parsed.filename.as_deref(), Some("real name.txt"));
}

#[test]
fn empty_name_is_treated_as_unnamed() {
    let parsed = parse_content_disposition("form-data; name=\"\"").expect("header should parse");
    assert_eq!(parsed.name, None);
}

#[test]
fn rejects_malformed_content_disposition() {
    let err = parse_content_disposition("form-data; name").expect_err("must fail");
    assert_err_contains(&err.to_string(), "parameter format");
}

#[test]
fn rejects_malformed_percent_encoding_in_filename_star() {
    let err = parse_content_disposition("form-data; name=\"file\"; filename*=UTF-8''bad%2")
        .expect_err("must fail");
    assert_err_contains(&err.to_string(), "percent-encoding");
}

#[test]
fn part_content_type_is_optional() {
    let fields = HeaderFields::new();
    assert_eq!(parse_part_content_type(&fields).expect("should parse"), None);
}

#[test]
fn parses_explicit_part_content_type() {
    let fields = HeaderFields::new().with(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    let mime = parse_part_content_type(&fields)
        .expect("explicit MIME should parse")
        .expect("MIME should be present");
    assert_eq!(mime.essence_str(), "text/plain");
    assert_eq!(mime.get_param("charset").map(|v| v.as_str()), Some("utf-8"));
}

#[test]
fn rejects_invalid_part_content_type() {
    let fields =
        HeaderFields::new().with(header::CONTENT_TYPE, HeaderValue::from_static("not-a/type?"));
    let err = parse_part_content_type(&fields).expect_err("must fail");
    assert_err_contains(&err.to_string(), "invalid part Content-Type");
}

#[test]
fn rendered_disposition_parses_back() {
    let disposition = ContentDisposition::form_data("quote\"d").with_filename("résumé.pdf");
    let value = disposition.to_header_value().expect("value should render");
    let fields = HeaderFields::new().with(header::CONTENT_DISPOSITION, value);

    let parsed = ContentDisposition::from_header_fields(&fields)
        .expect("header should parse")
        .expect("header should be present");
    assert_eq!(parsed, disposition);
}

#[test]
fn form_data_part_exposes_name_filename_and_length() {
    let part = Part::form_data("avatar", "PNG")
        .expect("part should build")
        .with_filename("face.png")
        .expect("filename should render")
        .with_header(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));

    assert_eq!(part.name().as_deref(), Some("avatar"));
    assert_eq!(part.filename().as_deref(), Some("face.png"));
    assert_eq!(part.content_length(), Some(3));
    assert_eq!(
        part.content_type().map(|mime| mime.essence_str().to_owned()),
        Some("image/png".to_owned())
    );
}

fn assert_err_contains(actual: &str, expected_fragment: &str) {
    assert!(
        actual.contains(expected_fragment),
        "expected `{actual}` to contain `{expected_fragment}`"
    );
}
