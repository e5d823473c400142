//! The `optional(T)` value family backing `has()`/`?.`/`[?]` chaining
//! (§4.6). An `Optional` is either empty (`optional.none()`) or wraps a
//! present `Value`; it is distinct from `Value::Null`, which represents an
//! explicit null of a wrapper type.
use super::Value;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Optional {
    None,
    Some(Value),
}

impl Optional {
    pub fn none() -> Optional {
        Optional::None
    }

    pub fn of(value: Value) -> Optional {
        Optional::Some(value)
    }

    pub fn has_value(&self) -> bool {
        matches!(self, Optional::Some(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Optional::Some(v) => Some(v),
            Optional::None => None,
        }
    }

    pub fn or_value(self, default: Value) -> Value {
        match self {
            Optional::Some(v) => v,
            Optional::None => default,
        }
    }

    /// `optional_or` chaining: the first present optional wins.
    pub fn or(self, other: Optional) -> Optional {
        match self {
            Optional::Some(_) => self,
            Optional::None => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn or_prefers_first_present() {
        let a = Optional::of(Value::Int(1));
        let b = Optional::of(Value::Int(2));
        assert_eq!(a.or(b), Optional::Some(Value::Int(1)));
    }

    #[test]
    fn or_falls_through_on_none() {
        let a = Optional::none();
        let b = Optional::of(Value::Int(2));
        assert_eq!(a.or(b), Optional::Some(Value::Int(2)));
    }
}
