//! The type adapter / registry (§4.1's "Registry contract"): the bridge
//! between host-native data and CEL values, and between object type names
//! and their field descriptors. Cloneable so an environment extension
//! (`Env::extend`, see `env.rs`) gets an isolated view that can add types
//! without mutating the parent's registry — the same clone-and-layer shape
//! the teacher uses for `Scope::extend`.
use std::collections::HashMap;
use std::rc::Rc;

use super::error::ValueError;
use super::object::ObjectValue;
use super::types::Type;
use super::Value;

#[derive(Clone, Debug, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub field_type: Type,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectDescriptor {
    pub name: String,
    pub fields: Vec<FieldInfo>,
    /// `name -> ordinal` for enum-typed objects; empty for message types.
    pub enum_values: HashMap<String, i64>,
}

impl ObjectDescriptor {
    pub fn message(name: impl Into<String>, fields: Vec<FieldInfo>) -> ObjectDescriptor {
        ObjectDescriptor {
            name: name.into(),
            fields,
            enum_values: HashMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A cloneable map of declared object types, used by the checker to resolve
/// `Select` field types and by the evaluator to construct `Struct` values
/// and look up zero values for unset fields.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    objects: HashMap<String, Rc<ObjectDescriptor>>,
}

impl TypeRegistry {
    pub fn new() -> TypeRegistry {
        TypeRegistry::default()
    }

    pub fn register_object_type(&mut self, descriptor: ObjectDescriptor) {
        self.objects
            .insert(descriptor.name.clone(), Rc::new(descriptor));
    }

    pub fn find_type(&self, name: &str) -> Option<Type> {
        self.objects.get(name).map(|_| Type::Object(name.to_string()))
    }

    pub fn find_field(&self, type_name: &str, field: &str) -> Option<FieldInfo> {
        self.objects.get(type_name)?.field(field).cloned()
    }

    pub fn enum_value(&self, type_name: &str, variant: &str) -> Option<i64> {
        self.objects.get(type_name)?.enum_values.get(variant).copied()
    }

    /// Construct a `Struct`-initialized object value, erroring on any field
    /// name not present in the registered descriptor (§3.3 `Struct`
    /// invariant: fields correspond to declared descriptor entries).
    pub fn new_value(
        &self,
        type_name: &str,
        fields: HashMap<String, Value>,
    ) -> Result<Value, ValueError> {
        let descriptor = self
            .objects
            .get(type_name)
            .ok_or_else(|| ValueError::no_such_field(type_name))?;
        for name in fields.keys() {
            if descriptor.field(name).is_none() {
                return Err(ValueError::no_such_field(name));
            }
        }
        Ok(Value::Object(Rc::new(ObjectValue::with_fields(
            type_name, fields,
        ))))
    }

    /// Zero value for a field left unset on an object literal or read via
    /// `select` (§4.1: unset object fields read as their declared type's
    /// zero value).
    pub fn zero_value(&self, ty: &Type) -> Value {
        match ty {
            Type::Null | Type::Any | Type::Dyn => Value::Null,
            Type::Bool => Value::Bool(false),
            Type::Int => Value::Int(0),
            Type::Uint => Value::Uint(0),
            Type::Double => Value::Double(0.0),
            Type::String => Value::string(""),
            Type::Bytes => Value::Bytes(Rc::from(&[][..])),
            Type::Duration => Value::Duration(super::duration::Duration::from_nanos(0)),
            Type::Timestamp => Value::Timestamp(super::duration::Timestamp::from_unix_nanos(0)),
            Type::List(_) => Value::list(Vec::new()),
            Type::Map(_, _) => Value::Map(Rc::new(super::map::MapValue::new())),
            Type::Wrapper(_) => Value::Null,
            Type::Optional(_) => Value::Optional(Rc::new(super::optional::Optional::none())),
            Type::Object(name) => Value::Object(Rc::new(ObjectValue::new(name.clone()))),
            _ => Value::Null,
        }
    }

    /// Adapt a recognized host-native shape into a `Value`. The real
    /// adapter surface (arbitrary Rust types via a trait) is an extension
    /// concern per §6.4; this covers the primitives the evaluator itself
    /// needs to synthesize (e.g. literal folding results already arrive as
    /// `Value` and don't go through here).
    pub fn native_to_value(&self, native: NativeValue) -> Value {
        match native {
            NativeValue::Null => Value::Null,
            NativeValue::Bool(b) => Value::Bool(b),
            NativeValue::Int(i) => Value::Int(i),
            NativeValue::Uint(u) => Value::Uint(u),
            NativeValue::Double(d) => Value::Double(d),
            NativeValue::String(s) => Value::string(s),
            NativeValue::Bytes(b) => Value::Bytes(Rc::from(b)),
        }
    }
}

/// The small closed set of host-native shapes the registry adapts directly;
/// richer host types are the plugin author's responsibility (§6.4/§6.5).
#[derive(Clone, Debug, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_field_on_construction() {
        let mut registry = TypeRegistry::new();
        registry.register_object_type(ObjectDescriptor::message(
            "my.pkg.Msg",
            vec![FieldInfo {
                name: "name".into(),
                field_type: Type::String,
            }],
        ));
        let mut fields = HashMap::new();
        fields.insert("bogus".to_string(), Value::string("x"));
        assert!(registry.new_value("my.pkg.Msg", fields).is_err());
    }

    #[test]
    fn zero_value_for_int_is_zero() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.zero_value(&Type::Int), Value::Int(0));
    }
}
