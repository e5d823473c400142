//! Mappings from [`Value`] to [`Value`] with enforced key uniqueness.
//!
//! Only the hashable CEL key types (`Bool`, `Int`, `Uint`, `String`) are
//! valid map keys; this is enforced at construction. Iteration order is
//! stabilized as insertion order within a single `MapValue` instance,
//! resolving the open question noted in §9 / SPEC_FULL §4.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::ValueError;
use super::Value;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Uint(u64),
    String(String),
}

impl MapKey {
    pub fn from_value(value: &Value) -> Result<MapKey, ValueError> {
        match value {
            Value::Bool(b) => Ok(MapKey::Bool(*b)),
            Value::Int(i) => Ok(MapKey::Int(*i)),
            Value::Uint(u) => Ok(MapKey::Uint(*u)),
            Value::String(s) => Ok(MapKey::String(s.to_string())),
            other => Err(ValueError::conversion_failure(&other.type_of(), &super::types::Type::Dyn)),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(b) => Value::Bool(*b),
            MapKey::Int(i) => Value::Int(*i),
            MapKey::Uint(u) => Value::Uint(*u),
            MapKey::String(s) => Value::String(s.clone().into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MapValue {
    entries: Vec<(Value, Value)>,
    index: HashMap<MapKey, usize>,
    key_type: Option<super::types::Type>,
    value_type: Option<super::types::Type>,
}

/// Wire shape for `MapValue`: the `index` is derived from `entries` and
/// rebuilt on deserialize rather than carried over the wire (§6.3).
#[derive(serde::Serialize, serde::Deserialize)]
struct MapValueWire {
    entries: Vec<(Value, Value)>,
    key_type: Option<super::types::Type>,
    value_type: Option<super::types::Type>,
}

impl serde::Serialize for MapValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(
            &MapValueWire {
                entries: self.entries.clone(),
                key_type: self.key_type.clone(),
                value_type: self.value_type.clone(),
            },
            serializer,
        )
    }
}

impl<'de> serde::Deserialize<'de> for MapValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = MapValueWire::deserialize(deserializer)?;
        let mut map = MapValue {
            entries: Vec::new(),
            index: HashMap::new(),
            key_type: wire.key_type,
            value_type: wire.value_type,
        };
        for (k, v) in wire.entries {
            map.insert(k, v, true).map_err(serde::de::Error::custom)?;
        }
        Ok(map)
    }
}

impl MapValue {
    pub fn new() -> MapValue {
        MapValue {
            entries: Vec::new(),
            index: HashMap::new(),
            key_type: None,
            value_type: None,
        }
    }

    pub fn typed(key_type: super::types::Type, value_type: super::types::Type) -> MapValue {
        MapValue {
            key_type: Some(key_type),
            value_type: Some(value_type),
            ..MapValue::new()
        }
    }

    pub fn key_type(&self) -> Option<&super::types::Type> {
        self.key_type.as_ref()
    }

    pub fn value_type(&self) -> Option<&super::types::Type> {
        self.value_type.as_ref()
    }

    /// Insert an entry, replacing any prior value for the same key. Returns
    /// an error if the key is a duplicate and `allow_overwrite` is false —
    /// used by the `@mapInsert` runtime behind `transformMap`/
    /// `transformMapEntry` (§4.7), which forbids duplicate keys.
    pub fn insert(
        &mut self,
        key: Value,
        value: Value,
        allow_overwrite: bool,
    ) -> Result<(), ValueError> {
        let map_key = MapKey::from_value(&key)?;
        if let Some(&idx) = self.index.get(&map_key) {
            if !allow_overwrite {
                return Err(ValueError::new(
                    super::error::ErrorKind::Policy,
                    format!("duplicate key {key:?} in map insertion"),
                ));
            }
            self.entries[idx] = (key, value);
            return Ok(());
        }
        self.index.insert(map_key, self.entries.len());
        self.entries.push((key, value));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        let map_key = MapKey::from_value(key).ok()?;
        self.index.get(&map_key).map(|&idx| &self.entries[idx].1)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        MapKey::from_value(key)
            .map(|k| self.index.contains_key(&k))
            .unwrap_or(false)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.entries.iter()
    }

    /// Map iteration per §3.1: iterating a `Map` yields its keys.
    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }
}

impl Default for MapValue {
    fn default() -> Self {
        MapValue::new()
    }
}

impl FromIterator<(Value, Value)> for MapValue {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut map = MapValue::new();
        for (k, v) in iter {
            let _ = map.insert(k, v, true);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_rejected_without_overwrite() {
        let mut map = MapValue::new();
        map.insert(Value::String("a".into()), Value::Int(1), true).unwrap();
        assert!(map
            .insert(Value::String("a".into()), Value::Int(2), false)
            .is_err());
    }

    #[test]
    fn insertion_order_preserved() {
        let map: MapValue = vec![
            (Value::String("b".into()), Value::Int(2)),
            (Value::String("a".into()), Value::Int(1)),
        ]
        .into_iter()
        .collect();

        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec![Value::String("b".into()), Value::String("a".into())]);
    }
}
