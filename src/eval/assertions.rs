//! Assertion keywords: pass/fail only, no annotations.
use std::cmp::Ordering;

use serde_json::Value;

use crate::equality::{NumKey, equals, first_duplicate, hash_key, num_key};
use crate::schema::node::{Keyword, PrimitiveType};

/// `Err(message)` when `instance` violates `keyword`. Keywords that do not apply to
/// the instance's type, and non-assertion keywords, pass.
pub(crate) fn check(keyword: &Keyword, instance: &Value) -> Result<(), String> {
    match (keyword, instance) {
        (Keyword::Type(types), _) => {
            if types.iter().any(|t| has_type(*t, instance)) {
                Ok(())
            } else {
                let names: Vec<&str> = types.iter().map(|t| t.name()).collect();
                Err(format!("{instance} is not of type {}", names.join(" or ")))
            }
        }
        (Keyword::Enum { values, keys }, _) => {
            if keys.contains(&hash_key(instance)) {
                Ok(())
            } else {
                Err(format!("{instance} is not one of {}", Value::Array(values.clone())))
            }
        }
        (Keyword::Const(expected), _) => {
            if equals(expected, instance) {
                Ok(())
            } else {
                Err(format!("{instance} is not {expected}"))
            }
        }

        // ---- numbers ----
        (Keyword::MultipleOf(divisor), Value::Number(n)) => {
            if is_multiple(num_key(n), *divisor) {
                Ok(())
            } else {
                Err(format!("{n} is not a multiple of {}", show(*divisor)))
            }
        }
        (Keyword::Maximum(limit), Value::Number(n)) => {
            bound(n, *limit, "greater than the maximum", |o| o != Ordering::Greater)
        }
        (Keyword::ExclusiveMaximum(limit), Value::Number(n)) => {
            let what = "greater than or equal to the exclusive maximum";
            bound(n, *limit, what, |o| o == Ordering::Less)
        }
        (Keyword::Minimum(limit), Value::Number(n)) => {
            bound(n, *limit, "less than the minimum", |o| o != Ordering::Less)
        }
        (Keyword::ExclusiveMinimum(limit), Value::Number(n)) => {
            let what = "less than or equal to the exclusive minimum";
            bound(n, *limit, what, |o| o == Ordering::Greater)
        }

        // ---- strings ----
        (Keyword::MaxLength(max), Value::String(s)) => {
            let len = s.chars().count() as u64;
            if len <= *max {
                Ok(())
            } else {
                Err(format!("string of length {len} is longer than {max}"))
            }
        }
        (Keyword::MinLength(min), Value::String(s)) => {
            let len = s.chars().count() as u64;
            if len >= *min {
                Ok(())
            } else {
                Err(format!("string of length {len} is shorter than {min}"))
            }
        }
        (Keyword::Pattern(pattern), Value::String(s)) => {
            if pattern.is_match(s) {
                Ok(())
            } else {
                Err(format!("{instance} does not match `{}`", pattern.as_str()))
            }
        }

        // ---- arrays ----
        (Keyword::MaxItems(max), Value::Array(items)) => count_at_most(items.len(), *max, "items"),
        (Keyword::MinItems(min), Value::Array(items)) => count_at_least(items.len(), *min, "items"),
        (Keyword::UniqueItems, Value::Array(items)) => match first_duplicate(items) {
            Some((i, j)) => Err(format!("items at {i} and {j} are equal")),
            None => Ok(()),
        },

        // ---- objects ----
        (Keyword::MaxProperties(max), Value::Object(map)) => {
            count_at_most(map.len(), *max, "properties")
        }
        (Keyword::MinProperties(min), Value::Object(map)) => {
            count_at_least(map.len(), *min, "properties")
        }
        (Keyword::Required(names), Value::Object(map)) => {
            let missing: Vec<&str> = names
                .iter()
                .filter(|n| !map.contains_key(*n))
                .map(String::as_str)
                .collect();
            if missing.is_empty() {
                Ok(())
            } else {
                Err(format!("missing required properties: {}", missing.join(", ")))
            }
        }
        (Keyword::DependentRequired(dependencies), Value::Object(map)) => {
            for (property, names) in dependencies {
                if !map.contains_key(property) {
                    continue;
                }
                if let Some(missing) = names.iter().find(|n| !map.contains_key(*n)) {
                    return Err(format!("`{missing}` is required when `{property}` is present"));
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

pub(crate) fn has_type(t: PrimitiveType, instance: &Value) -> bool {
    match (t, instance) {
        (PrimitiveType::Null, Value::Null)
        | (PrimitiveType::Boolean, Value::Bool(_))
        | (PrimitiveType::Object, Value::Object(_))
        | (PrimitiveType::Array, Value::Array(_))
        | (PrimitiveType::Number, Value::Number(_))
        | (PrimitiveType::String, Value::String(_)) => true,
        (PrimitiveType::Integer, Value::Number(n)) => num_key(n).is_integer(),
        _ => false,
    }
}

fn compare(a: NumKey, b: NumKey) -> Ordering {
    match (a, b) {
        (NumKey::Int(x), NumKey::Int(y)) => x.cmp(&y),
        _ => a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Equal),
    }
}

fn bound(
    n: &serde_json::Number,
    limit: NumKey,
    what: &str,
    ok: impl Fn(Ordering) -> bool,
) -> Result<(), String> {
    if ok(compare(num_key(n), limit)) {
        Ok(())
    } else {
        Err(format!("{n} is {what} {}", show(limit)))
    }
}

/// Exact for integers; otherwise the quotient must be integral up to float noise.
/// An overflowing quotient is never a multiple.
fn is_multiple(x: NumKey, divisor: NumKey) -> bool {
    match (x, divisor) {
        (NumKey::Int(x), NumKey::Int(d)) => d != 0 && x % d == 0,
        _ => {
            let q = x.as_f64() / divisor.as_f64();
            q.is_finite() && (q - q.round()).abs() < 1e-9
        }
    }
}

fn show(n: NumKey) -> String {
    match n {
        NumKey::Int(i) => i.to_string(),
        NumKey::Float(f) => f.0.to_string(),
    }
}

fn count_at_most(len: usize, max: u64, what: &str) -> Result<(), String> {
    if len as u64 <= max { Ok(()) } else { Err(format!("has {len} {what}, more than {max}")) }
}

fn count_at_least(len: usize, min: u64, what: &str) -> Result<(), String> {
    if len as u64 >= min { Ok(()) } else { Err(format!("has {len} {what}, fewer than {min}")) }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::node::Pattern;
    use serde_json::json;

    fn n(v: Value) -> NumKey {
        match v {
            Value::Number(n) => num_key(&n),
            _ => unreachable!(),
        }
    }

    #[test]
    fn integer_type_accepts_integral_floats() {
        assert!(has_type(PrimitiveType::Integer, &json!(1)));
        assert!(has_type(PrimitiveType::Integer, &json!(1.0)));
        assert!(!has_type(PrimitiveType::Integer, &json!(1.1)));
        assert!(has_type(PrimitiveType::Number, &json!(1)));
        assert!(!has_type(PrimitiveType::Number, &json!("1")));
    }

    #[test]
    fn multiple_of_handles_floats_and_overflow() {
        assert!(is_multiple(n(json!(10)), n(json!(2))));
        assert!(!is_multiple(n(json!(7)), n(json!(2))));
        assert!(is_multiple(n(json!(4.5)), n(json!(1.5))));
        assert!(!is_multiple(n(json!(35)), n(json!(1.5))));
        assert!(is_multiple(n(json!(0.0075)), n(json!(0.0001))));
        assert!(!is_multiple(n(json!(0.00751)), n(json!(0.0001))));
        assert!(!is_multiple(n(json!(1e308)), n(json!(0.123456789))));
        assert!(is_multiple(n(json!(12391239123u64)), n(json!(1e-8))));
    }

    #[test]
    fn ranges_compare_across_representations() {
        assert!(check(&Keyword::Maximum(n(json!(3.0))), &json!(3)).is_ok());
        assert!(check(&Keyword::ExclusiveMaximum(n(json!(3))), &json!(3.0)).is_err());
        assert!(check(&Keyword::Minimum(n(json!(-2))), &json!(-2.0001)).is_err());
        assert!(check(&Keyword::Minimum(n(json!(1))), &json!("0")).is_ok());
    }

    #[test]
    fn lengths_count_code_points() {
        assert!(check(&Keyword::MaxLength(2), &json!("💩💩")).is_ok());
        assert!(check(&Keyword::MinLength(2), &json!("💩")).is_err());
    }

    #[test]
    fn enum_uses_deep_equality() {
        let values = vec![json!(6), json!("foo"), json!([]), json!(true), json!({"foo": 12})];
        let keyword = Keyword::Enum { keys: values.iter().map(hash_key).collect(), values };
        assert!(check(&keyword, &json!({"foo": 12})).is_ok());
        assert!(check(&keyword, &json!({"foo": 12, "boo": 42})).is_err());
        assert!(check(&keyword, &json!(6.0)).is_ok());
        assert!(check(&keyword, &json!(1)).is_err());
    }

    #[test]
    fn object_and_array_counts() {
        assert!(check(&Keyword::Required(vec!["a".into()]), &json!({"b": 1})).is_err());
        assert!(check(&Keyword::Required(vec!["a".into()]), &json!([])).is_ok());
        let dep = Keyword::DependentRequired(vec![("bar".into(), vec!["foo".into()])]);
        assert!(check(&dep, &json!({"bar": 1})).is_err());
        assert!(check(&dep, &json!({"foo": 1})).is_ok());
        assert!(check(&Keyword::UniqueItems, &json!([1, 1.0])).is_err());
        assert!(check(&Keyword::UniqueItems, &json!([0, false])).is_ok());
        assert!(check(&Keyword::MaxItems(1), &json!([1, 2])).is_err());
        let pattern = Keyword::Pattern(Pattern::compile("^a*$").unwrap());
        assert!(check(&pattern, &json!("abc")).is_err());
        assert!(check(&pattern, &json!(12)).is_ok());
    }
}
