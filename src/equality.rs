//! Deep JSON equality with numeric type erasure.
//!
//! `1 == 1.0`, `true != 1`, object key order is irrelevant. [`HashKey`] is the
//! canonical form behind `equals`, so equal values always share a key; `uniqueItems`
//! and `enum` lookups use it to avoid pairwise comparison.
use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde_json::{Number, Value};

/// Canonical numeric form: exact integers where possible, floats otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NumKey {
    Int(i128),
    Float(OrderedFloat<f64>),
}

// f64 values at or beyond 2^127 no longer fit i128.
const I128_F64_BOUND: f64 = 1.7014118346046923e38;

pub fn num_key(n: &Number) -> NumKey {
    if let Some(i) = n.as_i64() {
        return NumKey::Int(i as i128);
    }
    if let Some(u) = n.as_u64() {
        return NumKey::Int(u as i128);
    }
    let f = n.as_f64().unwrap_or(f64::NAN);
    if f.is_finite() && f.fract() == 0.0 && f.abs() < I128_F64_BOUND {
        NumKey::Int(f as i128)
    } else {
        NumKey::Float(OrderedFloat(f))
    }
}

impl NumKey {
    pub fn as_f64(self) -> f64 {
        match self {
            NumKey::Int(i) => i as f64,
            NumKey::Float(f) => f.0,
        }
    }

    /// Mathematically integral, including floats too large for `Int`.
    pub fn is_integer(self) -> bool {
        match self {
            NumKey::Int(_) => true,
            NumKey::Float(f) => f.0.is_finite() && f.0.fract() == 0.0,
        }
    }
}

/// Total, symmetric deep equality.
pub fn equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => num_key(x) == num_key(y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| equals(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs.iter().all(|(k, x)| ys.get(k).is_some_and(|y| equals(x, y)))
        }
        _ => false,
    }
}

/// Opaque key consistent with [`equals`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashKey {
    Null,
    Bool(bool),
    Number(NumKey),
    String(String),
    Array(Vec<HashKey>),
    Object(BTreeMap<String, HashKey>),
}

pub fn hash_key(v: &Value) -> HashKey {
    match v {
        Value::Null => HashKey::Null,
        Value::Bool(b) => HashKey::Bool(*b),
        Value::Number(n) => HashKey::Number(num_key(n)),
        Value::String(s) => HashKey::String(s.clone()),
        Value::Array(xs) => HashKey::Array(xs.iter().map(hash_key).collect()),
        Value::Object(m) => {
            HashKey::Object(m.iter().map(|(k, v)| (k.clone(), hash_key(v))).collect())
        }
    }
}

/// Index pair of the first duplicate, if any.
pub fn first_duplicate(items: &[Value]) -> Option<(usize, usize)> {
    // scalars dominate in practice; small arrays are cheaper pairwise
    if items.len() <= 8 {
        for i in 0..items.len() {
            for j in (i + 1)..items.len() {
                if equals(&items[i], &items[j]) {
                    return Some((i, j));
                }
            }
        }
        return None;
    }
    let mut seen = std::collections::HashMap::with_capacity(items.len());
    for (j, item) in items.iter().enumerate() {
        if let Some(i) = seen.insert(hash_key(item), j) {
            return Some((i, j));
        }
    }
    None
}

// ------------------------------- Tests ------------------------------------ //
