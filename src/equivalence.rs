//! Value equivalence: structural equality with numbers compared by value.
//!
//! Used to deduplicate `enum` members, as the validator cache key, and to
//! detect schema rewrites that change nothing.

use std::hash::{Hash, Hasher};

use serde_json::{Number, Value};

use crate::number::Decimal;

/// True when `a` and `b` are equivalent.
///
/// Numbers are equal when mathematically equal; objects when they have the
/// same keys with pairwise equivalent values, whatever the insertion order;
/// arrays when they have the same length and are pairwise equivalent in order.
pub fn equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| equivalent(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| equivalent(v, other)))
        }
        _ => false,
    }
}

/// Feed `value` into `state` consistently with [`equivalent`].
pub fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => state.write_u8(0),
        Value::Bool(b) => {
            state.write_u8(1);
            b.hash(state);
        }
        Value::Number(n) => {
            state.write_u8(2);
            match Decimal::from_number(n) {
                Some(d) => d.hash(state),
                None => n.to_string().hash(state),
            }
        }
        Value::String(s) => {
            state.write_u8(3);
            s.hash(state);
        }
        Value::Array(items) => {
            state.write_u8(4);
            state.write_usize(items.len());
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(map) => {
            state.write_u8(5);
            state.write_usize(map.len());
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (key, member) in entries {
                key.hash(state);
                hash_value(member, state);
            }
        }
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    match (Decimal::from_number(a), Decimal::from_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a.to_string() == b.to_string(),
    }
}

/// Owned value usable as a hash key under equivalence.
#[derive(Debug, Clone)]
pub struct Equivalent(pub Value);

impl Equivalent {
    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl PartialEq for Equivalent {
    fn eq(&self, other: &Self) -> bool {
        equivalent(&self.0, &other.0)
    }
}

impl Eq for Equivalent {}

impl Hash for Equivalent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(&self.0, state);
    }
}

impl From<Value> for Equivalent {
    fn from(value: Value) -> Self {
        Equivalent(value)
    }
}
