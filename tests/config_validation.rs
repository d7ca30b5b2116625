#![allow(missing_docs)]

use multiframe::{
    ConfigError, FrameParser, Limits, MultipartBuilder, MultipartConfig, PartSchema, Transcoder,
};

#[test]
fn rejects_blank_schema_part_name() {
    let config = MultipartConfig {
        schema: Some(PartSchema::new().exactly_once("   ")),
        ..MultipartConfig::default()
    };

    let result = config.validate();
    assert!(matches!(result, Err(ConfigError::EmptyPartName)));
}

#[test]
fn rejects_name_under_two_cardinalities() {
    let config = MultipartConfig {
        schema: Some(PartSchema::new().exactly_once("meta").zero_or_more("meta")),
        ..MultipartConfig::default()
    };

    let result = config.validate();
    assert!(matches!(
        result,
        Err(ConfigError::OverlappingPartName { ref name }) if name == "meta"
    ));
}

#[test]
fn rejects_zero_max_header_bytes() {
    let config = MultipartConfig {
        limits: Limits {
            max_header_bytes: Some(0),
            ..Limits::default()
        },
        ..MultipartConfig::default()
    };

    let result = config.validate();
    assert!(matches!(
        result,
        Err(ConfigError::InvalidLimitValue {
            limit: "max_header_bytes"
        })
    ));
}

#[test]
fn rejects_zero_max_parts() {
    let result = MultipartBuilder::new().max_parts(0).build();
    assert!(matches!(
        result,
        Err(ConfigError::InvalidLimitValue { limit: "max_parts" })
    ));
}

#[test]
fn transcoder_with_config_runs_validation() {
    let config = MultipartConfig {
        schema: Some(PartSchema::new().at_most_once("")),
        ..MultipartConfig::default()
    };

    let result = Transcoder::with_config(config);
    assert!(matches!(result, Err(ConfigError::EmptyPartName)));
}

#[test]
fn unlimited_limits_are_valid() {
    let config = MultipartConfig {
        limits: Limits::unlimited(),
        schema: Some(PartSchema::new().exactly_once("a").at_least_once("b")),
    };

    assert!(config.validate().is_ok());
}

#[test]
fn parser_rejects_unusable_boundaries() {
    assert!(matches!(FrameParser::new(""), Err(ConfigError::EmptyBoundary)));
    assert!(matches!(
        FrameParser::new("bad\nboundary"),
        Err(ConfigError::BoundaryContainsNewline)
    ));
    assert!(matches!(
        FrameParser::new("grenzé"),
        Err(ConfigError::NonAsciiBoundary)
    ));
}
