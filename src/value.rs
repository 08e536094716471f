//! Tagged value shape used by `set` and `fill`.
//!
//! The reconciliation primitives dispatch on this variant instead of
//! inspecting runtime types: a scalar becomes leaf text, a sequence
//! rebuilds a child list, a map recurses. Maps preserve insertion order so
//! defaults-first key processing is deterministic.

use indexmap::IndexMap;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use std::fmt;

/// A value applied to an element during reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Leaf text.
    Scalar(String),
    /// Ordered list; triggers a full rebuild of the target child list.
    Sequence(Vec<Value>),
    /// Named children, in insertion order.
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn scalar(text: impl Into<String>) -> Self {
        Value::Scalar(text.into())
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(text) => Some(text),
            _ => None,
        }
    }

    /// Short shape name for diagnostics.
    pub fn shape(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Sequence(_) => "sequence",
            Value::Map(_) => "map",
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Scalar(text.to_string())
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Value::Map(iter.into_iter().collect())
    }
}

// Manual Deserialize: patch files are TOML, whose integers, floats and
// booleans all fold into Scalar text since the target documents only hold
// text leaves.
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a scalar, sequence, or map")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
                Ok(Value::Scalar(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
                Ok(Value::Scalar(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
                Ok(Value::Scalar(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
                Ok(Value::Scalar(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
                Ok(Value::Scalar(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
                Ok(Value::Scalar(v.to_string()))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Value::Sequence(items))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
                let mut map = IndexMap::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        values: Value,
    }

    #[test]
    fn deserialize_map_preserves_order() {
        let raw = "values = { zf = \"3\", xf = \"1\", yf = 2 }";
        let wrapper: Wrapper = toml_edit::de::from_str(raw).unwrap();
        let map = wrapper.values.as_map().unwrap();
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["zf", "xf", "yf"]);
        assert_eq!(map["yf"].as_scalar(), Some("2"));
    }

    #[test]
    fn deserialize_sequence_of_maps() {
        let raw = "values = [{ Name = \"a\" }, { Name = \"b\" }]";
        let wrapper: Wrapper = toml_edit::de::from_str(raw).unwrap();
        match wrapper.values {
            Value::Sequence(items) => {
                assert_eq!(items.len(), 2);
                assert!(items[0].as_map().is_some());
            }
            other => panic!("expected sequence, got {}", other.shape()),
        }
    }

    #[test]
    fn scalars_fold_to_text() {
        let raw = "values = true";
        let wrapper: Wrapper = toml_edit::de::from_str(raw).unwrap();
        assert_eq!(wrapper.values.as_scalar(), Some("true"));
    }
}
