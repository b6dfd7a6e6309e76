use std::sync::Arc;
use std::thread;

use json_conform::{Error, Options, Schema};
use serde_json::{Value, json};

#[test]
fn literal_end_to_end_cases() {
    let integer = json_conform::from_text(r#"{"type": "integer"}"#).unwrap();
    assert!(integer.validate(&json!(1)).is_ok());
    assert!(integer.validate(&json!(1.1)).is_err());

    let heterogeneous = json!({"enum": [6, "foo", [], true, {"foo": 12}]});
    assert!(!json_conform::is_valid(&heterogeneous, &json!({"foo": 12, "boo": 42})));

    let closed = json_conform::from_value(&json!({
        "unevaluatedProperties": false,
        "properties": {"foo": {"type": "string"}}
    }))
    .unwrap();
    assert!(!closed.is_valid(&json!({"foo": "x", "bar": "y"})));
    assert!(closed.is_valid(&json!({"foo": "x"})));

    let refuse =
        json_conform::from_value(&json!({"$ref": "#/$defs/bool", "$defs": {"bool": false}}))
            .unwrap();
    for instance in [json!(null), json!(0), json!("x"), json!([]), json!({})] {
        assert!(!refuse.is_valid(&instance));
    }
}

#[test]
fn parse_errors_are_load_errors() {
    let err = json_conform::from_text("{\"type\": ").unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
    assert!(!err.is_engine_limitation());
    assert!(!err.is_invalid_instance());
}

#[test]
fn failures_carry_structured_locations() {
    let schema = Schema::new(&json!({
        "$id": "https://example.com/order.json",
        "type": "object",
        "properties": {
            "lines": {"type": "array", "items": {"$ref": "#/$defs/line"}}
        },
        "$defs": {
            "line": {"type": "object", "required": ["sku"], "properties": {"qty": {"minimum": 1}}}
        }
    }))
    .unwrap();

    let err = schema.validate(&json!({"lines": [{"sku": "a", "qty": 1}, {"qty": 0}]})).unwrap_err();
    assert!(err.is_invalid_instance());
    let Error::Invalid(invalid) = err else { unreachable!() };

    let required = invalid.by_keyword("required").next().expect("required failure");
    assert_eq!(required.instance_location, "/lines/1");
    assert_eq!(required.keyword_location, "/properties/lines/items/$ref/required");
    assert_eq!(
        required.absolute_keyword_location,
        "https://example.com/order.json#/$defs/line/required"
    );

    let minimum = invalid.by_keyword("minimum").next().expect("minimum failure");
    assert_eq!(minimum.instance_location, "/lines/1/qty");
    assert!(minimum.message.is_some());
}

#[test]
fn custom_keywords_run_only_when_registered() {
    let schema = json!({"properties": {"port": {"x-even": true}}});

    let inert = Schema::new(&schema).unwrap();
    assert!(inert.is_valid(&json!({"port": 8081})));

    let even = |value: &Value, instance: &Value| match (value, instance.as_i64()) {
        (Value::Bool(true), Some(n)) if n % 2 != 0 => Err(format!("{n} is odd")),
        _ => Ok(()),
    };
    let strict = Options::new().with_keyword("x-even", Arc::new(even)).compile(&schema).unwrap();
    assert!(strict.is_valid(&json!({"port": 8080})));
    assert!(strict.is_valid(&json!({"port": "8081"})));

    let err = strict.validate(&json!({"port": 8081})).unwrap_err();
    let Error::Invalid(invalid) = err else { panic!("expected an invalid instance") };
    let unit = &invalid.errors()[0];
    assert_eq!(unit.keyword, "x-even");
    assert_eq!(unit.instance_location, "/port");
    assert_eq!(unit.message.as_deref(), Some("8081 is odd"));
}

#[test]
fn repeated_validation_is_deterministic() {
    let schema = Schema::new(&json!({
        "$defs": {"node": {
            "type": "object",
            "properties": {"next": {"$ref": "#/$defs/node"}},
            "unevaluatedProperties": false
        }},
        "$ref": "#/$defs/node"
    }))
    .unwrap();
    let instances = [
        json!({"next": {"next": {}}}),
        json!({"next": {"next": {"extra": 1}}}),
        json!([]),
    ];
    for instance in &instances {
        let first = schema.validate_detailed(instance);
        let second = schema.validate_detailed(instance);
        assert_eq!(first, second);
        assert_eq!(schema.is_valid(instance), first.valid);
    }
}

#[test]
fn compiled_schema_is_shared_across_threads() {
    let schema = Schema::new(&json!({
        "type": "array",
        "items": {"type": "integer", "multipleOf": 3}
    }))
    .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let schema = schema.clone();
            thread::spawn(move || {
                (0..50)
                    .map(|i| {
                        let instance = json!([3 * i, 3 * (i + t)]);
                        let broken = json!([3 * i + 1]);
                        schema.is_valid(&instance) && !schema.is_valid(&broken)
                    })
                    .all(|ok| ok)
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[test]
fn detailed_output_serializes_in_the_flat_shape() {
    let schema = Schema::new(&json!({
        "$id": "https://example.com/person.json",
        "title": "Person",
        "properties": {"age": {"type": "integer", "minimum": 0}}
    }))
    .unwrap();

    let valid = serde_json::to_value(schema.validate_detailed(&json!({"age": 4}))).unwrap();
    assert_eq!(valid["valid"], json!(true));
    assert!(valid.get("errors").is_none());
    assert_eq!(
        valid["annotations"][0],
        json!({
            "keyword": "title",
            "keywordLocation": "/title",
            "absoluteKeywordLocation": "https://example.com/person.json#/title",
            "instanceLocation": "",
            "annotation": "Person"
        })
    );

    let invalid = serde_json::to_value(schema.validate_detailed(&json!({"age": -1}))).unwrap();
    assert_eq!(invalid["valid"], json!(false));
    assert!(invalid.get("annotations").is_none());
    assert_eq!(invalid["errors"][0]["keywordLocation"], json!("/properties/age/minimum"));
    assert_eq!(invalid["errors"][0]["instanceLocation"], json!("/age"));
}

#[test]
fn base_uri_option_anchors_relative_references() {
    let options = Options::new()
        .with_base_uri("https://example.com/schemas/root.json")
        .with_resource(
            "https://example.com/schemas/common.json",
            json!({"$defs": {"id": {"type": "string", "minLength": 1}}}),
        );
    let schema = options
        .compile(&json!({"properties": {"id": {"$ref": "common.json#/$defs/id"}}}))
        .unwrap();
    assert_eq!(schema.root_uri().as_str(), "https://example.com/schemas/root.json");
    assert_eq!(schema.resource_count(), 2);
    assert!(schema.is_valid(&json!({"id": "a"})));
    assert!(!schema.is_valid(&json!({"id": ""})));
}
