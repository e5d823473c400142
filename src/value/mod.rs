//! The CEL runtime value system (§3.1/§4.1): a closed variant set with
//! value semantics, plus the capability methods the evaluator and builtin
//! functions dispatch through. Mirrors the teacher's `typed_ast` split of
//! "one enum, one `impl` block per capability" rather than a trait per
//! capability, since every variant needs every capability's fallback arm.
pub mod adapter;
pub mod duration;
pub mod error;
pub mod list;
pub mod map;
pub mod object;
pub mod optional;
pub mod types;
pub mod unknown;

use std::cmp::Ordering;
use std::rc::Rc;

pub use duration::{Duration, Timestamp};
pub use error::{ErrorKind, ValueError};
pub use list::ListValue;
pub use map::MapValue;
pub use object::ObjectValue;
pub use optional::Optional;
pub use types::Type;
pub use unknown::UnknownSet;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(Rc<str>),
    Bytes(Rc<[u8]>),
    Duration(Duration),
    Timestamp(Timestamp),
    List(Rc<ListValue>),
    Map(Rc<MapValue>),
    Object(Rc<ObjectValue>),
    Type(Type),
    Optional(Rc<Optional>),
    Unknown(UnknownSet),
    Error(Rc<ValueError>),
}

impl Value {
    pub fn error(err: ValueError) -> Value {
        Value::Error(Rc::new(err))
    }

    pub fn string(s: impl Into<Rc<str>>) -> Value {
        Value::String(s.into())
    }

    pub fn list(elements: Vec<Value>) -> Value {
        Value::List(Rc::new(ListValue::new(elements)))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown(_))
    }

    /// Does this value short-circuit further evaluation the way an `Error`
    /// or `Unknown` does? Used by strict call argument evaluation (§4.6).
    pub fn is_exceptional(&self) -> bool {
        self.is_error() || self.is_unknown()
    }

    /// Convenience predicate for call sites that already know the value is
    /// a `Bool` (logical operators, comprehension loop-condition). Treats
    /// anything other than `Bool(true)` as false, which is only safe once
    /// the checker has confirmed the value is boolean-typed.
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    pub fn type_of(&self) -> Type {
        match self {
            Value::Null => Type::Null,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::Uint(_) => Type::Uint,
            Value::Double(_) => Type::Double,
            Value::String(_) => Type::String,
            Value::Bytes(_) => Type::Bytes,
            Value::Duration(_) => Type::Duration,
            Value::Timestamp(_) => Type::Timestamp,
            Value::List(l) => Type::list_of(l.element_type().cloned().unwrap_or(Type::Dyn)),
            Value::Map(m) => Type::map_of(
                m.key_type().cloned().unwrap_or(Type::Dyn),
                m.value_type().cloned().unwrap_or(Type::Dyn),
            ),
            Value::Object(o) => Type::Object(o.type_name().to_string()),
            Value::Type(_) => Type::Type(Box::new(Type::Dyn)),
            Value::Optional(opt) => Type::Optional(Box::new(
                opt.value().map(Value::type_of).unwrap_or(Type::Dyn),
            )),
            Value::Unknown(_) => Type::Dyn,
            Value::Error(_) => Type::Error,
        }
    }

    /// `type()`: the first-class type value. Distinct from `type_of`, which
    /// is the internal classification used by the checker/dispatch.
    pub fn type_value(&self) -> Value {
        Value::Type(self.type_of())
    }

    /// §7 equality: total across comparable pairs, `Error` for incomparable
    /// combinations, NaN-aware (NaN != NaN, never errors).
    pub fn equals(&self, other: &Value) -> Value {
        use Value::*;
        match (self, other) {
            (Null, Null) => Bool(true),
            (Bool(a), Bool(b)) => Bool(a == b),
            (Int(a), Int(b)) => Bool(a == b),
            (Uint(a), Uint(b)) => Bool(a == b),
            (Double(a), Double(b)) => Bool(a == b),
            (Int(a), Uint(b)) | (Uint(b), Int(a)) => Bool(*a >= 0 && *a as u64 == *b),
            (Int(a), Double(b)) | (Double(b), Int(a)) => Bool(*a as f64 == *b),
            (Uint(a), Double(b)) | (Double(b), Uint(a)) => Bool(*a as f64 == *b),
            (String(a), String(b)) => Bool(a == b),
            (Bytes(a), Bytes(b)) => Bool(a == b),
            (Duration(a), Duration(b)) => Bool(a == b),
            (Timestamp(a), Timestamp(b)) => Bool(a == b),
            (List(a), List(b)) => {
                if a.len() != b.len() {
                    return Bool(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.equals(y) {
                        Bool(true) => continue,
                        Bool(false) => return Bool(false),
                        other => return other,
                    }
                }
                Bool(true)
            }
            (Map(a), Map(b)) => {
                if a.len() != b.len() {
                    return Bool(false);
                }
                for (k, v) in a.iter() {
                    match b.get(k) {
                        Some(other_v) => match v.equals(other_v) {
                            Bool(true) => continue,
                            Bool(false) => return Bool(false),
                            other => return other,
                        },
                        None => return Bool(false),
                    }
                }
                Bool(true)
            }
            (Type(a), Type(b)) => Bool(a.does_eq(b)),
            (Error(_), _) | (_, Error(_)) => self.propagate_error(other),
            _ => Value::error(ValueError::incomparable(&self.type_of(), &other.type_of())),
        }
    }

    /// Ordering comparison for the types §3.1(d) declares ordered: numerics
    /// (mixed-kind included), String, Bytes, Bool, Duration, Timestamp.
    /// Returns `Int(-1|0|1)` or `Error` for incomparable pairs. NaN operands
    /// yield `Error`, matching "NaN compares unordered". Mixed `Int`/`Uint`
    /// comparisons widen through `i128` rather than `f64`, so magnitudes
    /// above 2^53 still compare exactly; only comparisons against `Double`
    /// go through floating point, since `Double` itself is already
    /// float-precision.
    pub fn compare(&self, other: &Value) -> Value {
        use Value::*;
        let ordering = match (self, other) {
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (Uint(a), Uint(b)) => Some(a.cmp(b)),
            (Double(a), Double(b)) => a.partial_cmp(b),
            (Int(a), Uint(b)) => Some((*a as i128).cmp(&(*b as i128))),
            (Uint(a), Int(b)) => Some((*a as i128).cmp(&(*b as i128))),
            (Int(a), Double(b)) => (*a as f64).partial_cmp(b),
            (Double(a), Int(b)) => a.partial_cmp(&(*b as f64)),
            (Uint(a), Double(b)) => (*a as f64).partial_cmp(b),
            (Double(a), Uint(b)) => a.partial_cmp(&(*b as f64)),
            (String(a), String(b)) => Some(a.cmp(b)),
            (Bytes(a), Bytes(b)) => Some(a.cmp(b)),
            (Duration(a), Duration(b)) => Some(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        };
        match ordering {
            Some(Ordering::Less) => Int(-1),
            Some(Ordering::Equal) => Int(0),
            Some(Ordering::Greater) => Int(1),
            None => match (self, other) {
                (Error(_), _) | (_, Error(_)) => self.propagate_error(other),
                _ => Value::error(ValueError::incomparable(&self.type_of(), &other.type_of())),
            },
        }
    }

    pub fn size(&self) -> Value {
        match self {
            Value::String(s) => Value::Int(s.chars().count() as i64),
            Value::Bytes(b) => Value::Int(b.len() as i64),
            Value::List(l) => Value::Int(l.len() as i64),
            Value::Map(m) => Value::Int(m.len() as i64),
            Value::Error(_) => self.clone(),
            _ => Value::error(ValueError::no_such_overload("size")),
        }
    }

    pub fn contains(&self, needle: &Value) -> Value {
        match self {
            Value::List(l) => Value::Bool(l.contains(needle)),
            Value::Map(m) => Value::Bool(m.contains_key(needle)),
            Value::Error(_) => self.clone(),
            _ => Value::error(ValueError::no_such_overload("in")),
        }
    }

    /// `get`: index a `List` by `Int`, a `Map` by a typed key, or select a
    /// field on an `Object` by name. `Select` on an object falls back to the
    /// field's zero value when unset; that fallback needs the type
    /// registry, so it lives in `adapter`, not here.
    pub fn get(&self, key: &Value) -> Value {
        match (self, key) {
            (Value::List(l), Value::Int(i)) => {
                if *i < 0 {
                    return Value::error(ValueError::range(format!("index {i} out of range")));
                }
                l.get(*i as usize)
                    .cloned()
                    .unwrap_or_else(|| Value::error(ValueError::range(format!("index {i} out of range"))))
            }
            (Value::Map(m), _) => m
                .get(key)
                .cloned()
                .unwrap_or_else(|| Value::error(ValueError::no_such_key(format!("{key:?}")))),
            (Value::Object(o), Value::String(field)) => match o.get_or_err(field) {
                Ok(v) => v.clone(),
                Err(e) => Value::error(e),
            },
            (Value::Error(_), _) => self.clone(),
            _ => Value::error(ValueError::no_such_overload("index")),
        }
    }

    /// Materialize the iteration sequence: a `List`'s elements, or a
    /// `Map`'s keys (§3.1: "Map ... iterates keys").
    pub fn iterate(&self) -> Result<Vec<Value>, ValueError> {
        match self {
            Value::List(l) => Ok(l.iter().cloned().collect()),
            Value::Map(m) => Ok(m.keys().cloned().collect()),
            other => Err(ValueError::no_such_overload(&format!(
                "iterator on {}",
                other.type_of()
            ))),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Int(i) => *i == 0,
            Value::Uint(u) => *u == 0,
            Value::Double(d) => *d == 0.0,
            Value::String(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            Value::Duration(d) => d.nanos == 0,
            Value::Timestamp(t) => t.unix_nanos == 0,
            Value::List(l) => l.is_empty(),
            Value::Map(m) => m.is_empty(),
            _ => false,
        }
    }

    /// Documented coercions only (§4.1): numeric widenings/narrowings
    /// between Int/Uint/Double, String<->Bytes, and the `string(x)` textual
    /// rendering used by the `string` conversion builtin.
    pub fn convert_to(&self, target: &Type) -> Value {
        use Value::*;
        match (self, target) {
            (v, t) if &v.type_of() == t => v.clone(),
            (Int(i), Type::Uint) => {
                if *i < 0 {
                    Value::error(ValueError::range("cannot convert negative int to uint"))
                } else {
                    Uint(*i as u64)
                }
            }
            (Int(i), Type::Double) => Double(*i as f64),
            (Int(i), Type::String) => Value::string(i.to_string()),
            (Uint(u), Type::Int) => {
                if *u > i64::MAX as u64 {
                    Value::error(ValueError::range("uint overflows int"))
                } else {
                    Int(*u as i64)
                }
            }
            (Uint(u), Type::Double) => Double(*u as f64),
            (Uint(u), Type::String) => Value::string(u.to_string()),
            (Double(d), Type::Int) => {
                if d.is_finite() && *d >= i64::MIN as f64 && *d <= i64::MAX as f64 {
                    Int(*d as i64)
                } else {
                    Value::error(ValueError::range("double out of int range"))
                }
            }
            (Double(d), Type::Uint) => {
                if d.is_finite() && *d >= 0.0 && *d <= u64::MAX as f64 {
                    Uint(*d as u64)
                } else {
                    Value::error(ValueError::range("double out of uint range"))
                }
            }
            (Double(d), Type::String) => Value::string(d.to_string()),
            (String(s), Type::Bytes) => Value::Bytes(Rc::from(s.as_bytes())),
            (Bytes(b), Type::String) => match std::str::from_utf8(b) {
                Ok(s) => Value::string(s.to_string()),
                Err(_) => Value::error(ValueError::conversion_failure(&Type::Bytes, &Type::String)),
            },
            (Bool(b), Type::String) => Value::string(b.to_string()),
            (Duration(d), Type::String) => Value::string(d.to_string()),
            (Timestamp(t), Type::String) => Value::string(t.to_string()),
            (Error(_), _) => self.clone(),
            _ => Value::error(ValueError::conversion_failure(&self.type_of(), target)),
        }
    }

    fn propagate_error(&self, other: &Value) -> Value {
        match self {
            Value::Error(_) => self.clone(),
            _ => other.clone(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        matches!(self.equals(other), Value::Bool(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_uint_cross_equality() {
        assert_eq!(Value::Int(5).equals(&Value::Uint(5)), Value::Bool(true));
        assert_eq!(Value::Int(-1).equals(&Value::Uint(1)), Value::Bool(false));
    }

    #[test]
    fn int_uint_cross_compare_is_exact_above_2_pow_53() {
        // 2^53 + 1 is not exactly representable as f64; an f64-round-tripping
        // comparison would collapse this pair to equal.
        let big = (1i64 << 53) + 1;
        assert_eq!(
            Value::Int(big).compare(&Value::Uint(big as u64 - 1)),
            Value::Int(1)
        );
        assert_eq!(
            Value::Uint(big as u64 - 1).compare(&Value::Int(big)),
            Value::Int(-1)
        );
        assert_eq!(Value::Int(big).compare(&Value::Uint(big as u64)), Value::Int(0));
    }

    #[test]
    fn nan_never_equal_never_errors() {
        let nan = Value::Double(f64::NAN);
        assert_eq!(nan.equals(&nan), Value::Bool(false));
    }

    #[test]
    fn nan_compare_is_error() {
        let nan = Value::Double(f64::NAN);
        assert!(nan.compare(&Value::Double(1.0)).is_error());
    }

    #[test]
    fn incomparable_types_error() {
        let result = Value::Bool(true).equals(&Value::Int(1));
        assert!(result.is_error());
    }

    #[test]
    fn error_propagates_through_equals() {
        let err = Value::error(ValueError::division_by_zero());
        let result = err.equals(&Value::Int(1));
        assert!(result.is_error());
    }

    #[test]
    fn list_index_out_of_range_is_error() {
        let list = Value::list(vec![Value::Int(1)]);
        assert!(list.get(&Value::Int(5)).is_error());
    }

    #[test]
    fn convert_int_to_string() {
        assert_eq!(Value::Int(42).convert_to(&Type::String), Value::string("42"));
    }

    #[test]
    fn negative_int_to_uint_is_range_error() {
        assert!(Value::Int(-1).convert_to(&Type::Uint).is_error());
    }

    #[test]
    fn zero_values() {
        assert!(Value::Int(0).is_zero());
        assert!(!Value::Int(1).is_zero());
        assert!(Value::string("").is_zero());
    }
}
