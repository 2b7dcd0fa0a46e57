use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single dynamically typed cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

/// Numbers compare by value across `Int` and `Float`; other floats by bit
/// pattern so values can key a HashSet.
#[derive(PartialEq, Eq, Hash)]
enum NumKey {
    Int(i64),
    Bits(u64),
}

fn num_key(v: &Value) -> Option<NumKey> {
    match v {
        Value::Int(i) => Some(NumKey::Int(*i)),
        Value::Float(f) => {
            // 2^63 itself does not fit in i64.
            let whole = f.is_finite()
                && f.fract() == 0.0
                && *f >= i64::MIN as f64
                && *f < i64::MAX as f64;
            Some(if whole {
                NumKey::Int(*f as i64)
            } else {
                NumKey::Bits(f.to_bits())
            })
        }
        _ => None,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (a, b) => match (num_key(a), num_key(b)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match num_key(self) {
            Some(key) => {
                0u8.hash(state);
                key.hash(state);
            }
            None => {
                std::mem::discriminant(self).hash(state);
                match self {
                    Value::Bool(b) => b.hash(state),
                    Value::Text(s) => s.hash(state),
                    _ => {}
                }
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn whole_floats_equal_ints() {
        assert_eq!(Value::Int(4), Value::Float(4.0));
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
        assert_ne!(Value::Int(4), Value::Float(4.5));
        assert_ne!(Value::Int(1), Value::Bool(true));
        assert_ne!(Value::Text("4".into()), Value::Int(4));

        let set: HashSet<Value> = [Value::Int(4), Value::Float(4.0), Value::Float(f64::NAN)]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Value::Float(4.0)));
    }

    #[test]
    fn display_matches_python_none() {
        assert_eq!(Value::Null.to_string(), "None");
        assert_eq!(Value::from(Some("x")).to_string(), "x");
    }
}
