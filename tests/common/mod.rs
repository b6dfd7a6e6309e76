//! Runner for groups shaped like the JSON-Schema-Test-Suite files.
#![allow(dead_code)]

use json_conform::{Options, Schema};
use serde_json::Value;

pub fn run_groups(groups: Value) {
    run_groups_with(groups, &Options::new());
}

pub fn run_groups_with(groups: Value, options: &Options) {
    let groups = groups.as_array().expect("an array of groups");
    for group in groups {
        let description = group["description"].as_str().unwrap_or("<group>");
        let schema = Schema::compile_with(&group["schema"], options)
            .unwrap_or_else(|e| panic!("{description}: schema failed to compile: {e}"));
        for case in group["tests"].as_array().expect("tests") {
            let expected = case["valid"].as_bool().expect("valid flag");
            let actual = schema.is_valid(&case["data"]);
            assert_eq!(
                actual, expected,
                "{description} :: {}",
                case["description"].as_str().unwrap_or("<case>")
            );
            // the raising and non-raising forms must agree
            assert_eq!(schema.validate(&case["data"]).is_ok(), expected);
        }
    }
}
