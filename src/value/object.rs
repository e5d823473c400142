//! Instances of registered object types (protobuf-message-shaped values per
//! §3.1/§6.2). Field storage mirrors `MapValue`'s insertion-ordered vector +
//! index, since object field sets are themselves small maps keyed by name.
use std::collections::HashMap;

use super::error::ValueError;
use super::Value;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ObjectValue {
    type_name: String,
    fields: HashMap<String, Value>,
}

impl ObjectValue {
    pub fn new(type_name: impl Into<String>) -> ObjectValue {
        ObjectValue {
            type_name: type_name.into(),
            fields: HashMap::new(),
        }
    }

    pub fn with_fields(type_name: impl Into<String>, fields: HashMap<String, Value>) -> ObjectValue {
        ObjectValue {
            type_name: type_name.into(),
            fields,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Field access per §4.1's `select` semantics: unset fields read as the
    /// field's zero value, only an undeclared field name is an error. The
    /// zero-value fallback is the caller's job (it needs the type registry);
    /// this just reports presence.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn get_or_err(&self, name: &str) -> Result<&Value, ValueError> {
        self.fields
            .get(name)
            .ok_or_else(|| ValueError::no_such_field(name))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_field_is_absent_not_error() {
        let obj = ObjectValue::new("my.pkg.Msg");
        assert!(!obj.has_field("name"));
    }

    #[test]
    fn set_and_read_field() {
        let mut obj = ObjectValue::new("my.pkg.Msg");
        obj.set_field("name", Value::String("hi".into()));
        assert_eq!(obj.field("name"), Some(&Value::String("hi".into())));
    }
}
