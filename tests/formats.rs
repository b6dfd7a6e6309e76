mod common;

use common::{run_groups, run_groups_with};
use json_conform::{Options, Schema};
use serde_json::json;

#[test]
fn formats_only_annotate_by_default() {
    run_groups(json!([
        {
            "description": "email format is an annotation",
            "schema": {"format": "email"},
            "tests": [
                {"description": "an invalid email still passes", "data": "not an email", "valid": true},
                {"description": "a valid email passes", "data": "joe.bloggs@example.com", "valid": true}
            ]
        },
        {
            "description": "unknown formats are plain annotations",
            "schema": {"format": "x-unknown"},
            "tests": [{"description": "any string", "data": "whatever", "valid": true}]
        }
    ]));
}

#[test]
fn asserted_formats() {
    let options = Options::new().with_format_assertion(true);
    run_groups_with(
        json!([
            {
                "description": "validation of date-time strings",
                "schema": {"format": "date-time"},
                "tests": [
                    {"description": "a valid date-time string", "data": "1963-06-19T08:30:06.283185Z", "valid": true},
                    {"description": "a valid date-time with a leap second, UTC", "data": "1998-12-31T23:59:60Z", "valid": true},
                    {"description": "an invalid day in date-time string", "data": "1990-02-31T15:59:59.123-08:00", "valid": false},
                    {"description": "only RFC3339 not all of ISO 8601 are valid", "data": "2013-350T01:01:01", "valid": false},
                    {"description": "all string formats ignore integers", "data": 12, "valid": true}
                ]
            },
            {
                "description": "validation of IP addresses",
                "schema": {"format": "ipv4"},
                "tests": [
                    {"description": "a valid IP address", "data": "192.168.0.1", "valid": true},
                    {"description": "an IP address with too many components", "data": "127.0.0.0.1", "valid": false},
                    {"description": "leading zeroes should be rejected", "data": "087.10.0.1", "valid": false},
                    {"description": "all string formats ignore objects", "data": {}, "valid": true}
                ]
            },
            {
                "description": "validation of UUIDs",
                "schema": {"format": "uuid"},
                "tests": [
                    {"description": "all upper-case", "data": "2EB8AA08-AA98-11EA-B4AA-73B441D16380", "valid": true},
                    {"description": "wrong length", "data": "2eb8aa08-aa98-11ea-b4aa-73b441d1638", "valid": false}
                ]
            },
            {
                "description": "validation of JSON pointers",
                "schema": {"format": "json-pointer"},
                "tests": [
                    {"description": "a valid JSON-pointer", "data": "/foo/bar~0/baz~1/%a", "valid": true},
                    {"description": "not a valid JSON-pointer (~ not escaped)", "data": "/foo/bar~", "valid": false},
                    {"description": "not a valid JSON-pointer (isn't empty nor starts with /)", "data": "foo", "valid": false}
                ]
            },
            {
                "description": "validation of regular expressions",
                "schema": {"format": "regex"},
                "tests": [
                    {"description": "a valid regular expression", "data": "([abc])+\\s+$", "valid": true},
                    {"description": "a regular expression with unclosed parens is invalid", "data": "^(abc]", "valid": false}
                ]
            }
        ]),
        &options,
    );
}

#[test]
fn custom_format_predicates() {
    let options = Options::new().with_format("even-length", |s: &str| s.chars().count() % 2 == 0);
    let schema = options
        .compile(&json!({"properties": {
            "code": {"format": "even-length"},
            "host": {"format": "ipv4"}
        }}))
        .unwrap();
    assert!(schema.is_valid(&json!({"code": "ab"})));
    assert!(!schema.is_valid(&json!({"code": "abc"})));
    assert!(schema.is_valid(&json!({"code": 3})));
    // registering one predicate leaves the built-in formats annotating
    assert!(schema.is_valid(&json!({"host": "not-an-ip"})));
}

#[test]
fn formats_can_be_asserted_one_name_at_a_time() {
    let schema = Options::new()
        .with_format_asserted("email")
        .compile(&json!({"properties": {"e": {"format": "email"}, "ip": {"format": "ipv4"}}}))
        .unwrap();
    assert!(schema.is_valid(&json!({"e": "joe@example.com"})));
    assert!(!schema.is_valid(&json!({"e": "nope"})));
    assert!(schema.is_valid(&json!({"ip": "not-an-ip"})));

    let overridden = Options::new()
        .with_format("email", json_conform::format::is_email)
        .compile(&json!({"properties": {"e": {"format": "email"}}}))
        .unwrap();
    assert!(!overridden.is_valid(&json!({"e": "nope"})));
}

#[test]
fn asserting_one_unknown_name_is_an_engine_limitation() {
    let err = Options::new()
        .with_format_asserted("x-product-code")
        .compile(&json!({"format": "x-product-code"}))
        .unwrap_err();
    assert!(err.is_engine_limitation(), "{err}");
    // unrelated unknown names still annotate
    let schema = Options::new()
        .with_format_asserted("email")
        .compile(&json!({"format": "x-other"}));
    assert!(schema.is_ok());
}

#[test]
fn custom_format_overrides_builtin() {
    let options = Options::new().with_format("email", |s: &str| s.ends_with("@corp.example"));
    let schema = options.compile(&json!({"format": "email"})).unwrap();
    assert!(schema.is_valid(&json!("ops@corp.example")));
    assert!(!schema.is_valid(&json!("joe@example.com")));
}

#[test]
fn asserting_an_unknown_format_is_an_engine_limitation() {
    let err = Options::new()
        .with_format_assertion(true)
        .compile(&json!({"properties": {"id": {"format": "x-product-code"}}}))
        .unwrap_err();
    assert!(err.is_engine_limitation(), "{err}");
}

#[test]
fn look_around_patterns_are_engine_limitations() {
    for schema in [
        json!({"pattern": "^(?!foo)"}),
        json!({"patternProperties": {"(?<=a)b": {}}}),
    ] {
        let err = Schema::new(&schema).unwrap_err();
        assert!(err.is_engine_limitation(), "{schema}: {err}");
    }
}

#[test]
fn format_annotation_is_reported() {
    let schema = Schema::new(&json!({"properties": {"contact": {"format": "email"}}})).unwrap();
    let output = schema.validate_detailed(&json!({"contact": "nobody"}));
    assert!(output.valid);
    let unit = output
        .annotations
        .iter()
        .find(|unit| unit.keyword == "format")
        .expect("format annotation");
    assert_eq!(unit.instance_location, "/contact");
    assert_eq!(unit.keyword_location, "/properties/contact/format");
    assert_eq!(unit.annotation, Some(json!("email")));
}
