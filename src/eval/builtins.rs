//! Dispatch for the core operator functions (arithmetic, comparison,
//! equality, indexing, `size`, `in`, `type`, conversions) that every CEL
//! environment gets regardless of which extension libraries (§6.4, out of
//! scope here) are installed. These are plain Rust functions rather than
//! `Env`-declared bindings so the evaluator can call them directly without
//! an environment handle in scope; `crate::env::stdlib` wires the same
//! behavior into `Env::declarations` for the checker's overload resolution.
use crate::value::types::Type;
use crate::value::{Value, ValueError};

pub fn dispatch(function: &str, target: Option<&Value>, args: &[Value]) -> Value {
    match (function, target, args) {
        ("+", None, [a, b]) => add(a, b),
        ("-", None, [a, b]) => subtract(a, b),
        ("-", None, [a]) => negate(a),
        ("*", None, [a, b]) => multiply(a, b),
        ("/", None, [a, b]) => divide(a, b),
        ("%", None, [a, b]) => modulo(a, b),
        ("==", None, [a, b]) => a.equals(b),
        ("!=", None, [a, b]) => negate_bool(a.equals(b)),
        ("<", None, [a, b]) => compare_to_bool(a, b, |o| o < 0),
        ("<=", None, [a, b]) => compare_to_bool(a, b, |o| o <= 0),
        (">", None, [a, b]) => compare_to_bool(a, b, |o| o > 0),
        (">=", None, [a, b]) => compare_to_bool(a, b, |o| o >= 0),
        ("!", None, [a]) => logical_not(a),
        ("in", None, [a, b]) => b.contains(a),
        ("size", None, [a]) | ("size", Some(a), []) => a.size(),
        ("_[_]", None, [a, b]) => a.get(b),
        ("type", None, [a]) => a.type_value(),
        ("int", None, [a]) => a.convert_to(&Type::Int),
        ("uint", None, [a]) => a.convert_to(&Type::Uint),
        ("double", None, [a]) => a.convert_to(&Type::Double),
        ("string", None, [a]) => a.convert_to(&Type::String),
        ("bytes", None, [a]) => a.convert_to(&Type::Bytes),
        ("bool", None, [a]) => match a {
            Value::Bool(_) => a.clone(),
            Value::String(s) => match s.as_ref() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::error(ValueError::conversion_failure(&Type::String, &Type::Bool)),
            },
            Value::Error(_) => a.clone(),
            _ => Value::error(ValueError::conversion_failure(&a.type_of(), &Type::Bool)),
        },
        _ => Value::error(ValueError::no_such_overload(function)),
    }
}

fn negate_bool(v: Value) -> Value {
    match v {
        Value::Bool(b) => Value::Bool(!b),
        other => other,
    }
}

fn compare_to_bool(a: &Value, b: &Value, pred: impl Fn(i64) -> bool) -> Value {
    match a.compare(b) {
        Value::Int(ordering) => Value::Bool(pred(ordering)),
        other => other,
    }
}

fn logical_not(a: &Value) -> Value {
    match a {
        Value::Bool(b) => Value::Bool(!b),
        Value::Error(_) => a.clone(),
        other => Value::error(ValueError::no_such_overload(&format!("! on {}", other.type_of()))),
    }
}

fn add(a: &Value, b: &Value) -> Value {
    use Value::*;
    match (a, b) {
        (Int(x), Int(y)) => x
            .checked_add(*y)
            .map(Int)
            .unwrap_or_else(|| Value::error(ValueError::integer_overflow())),
        (Uint(x), Uint(y)) => x
            .checked_add(*y)
            .map(Uint)
            .unwrap_or_else(|| Value::error(ValueError::integer_overflow())),
        (Double(x), Double(y)) => Double(x + y),
        (String(x), String(y)) => Value::string(format!("{x}{y}")),
        (Bytes(x), Bytes(y)) => {
            let mut combined = x.to_vec();
            combined.extend_from_slice(y);
            Bytes(combined.into())
        }
        (List(x), List(y)) => {
            let mut combined = x.as_slice().to_vec();
            combined.extend(y.iter().cloned());
            Value::list(combined)
        }
        (Duration(x), Duration(y)) => x
            .checked_add(y)
            .map(Value::Duration)
            .unwrap_or_else(Value::error),
        (Timestamp(x), Duration(y)) => x
            .checked_add(y)
            .map(Value::Timestamp)
            .unwrap_or_else(Value::error),
        (Duration(y), Timestamp(x)) => x
            .checked_add(y)
            .map(Value::Timestamp)
            .unwrap_or_else(Value::error),
        (Error(_), _) | (_, Error(_)) => propagate(a, b),
        _ => Value::error(ValueError::no_such_overload("+")),
    }
}

fn subtract(a: &Value, b: &Value) -> Value {
    use Value::*;
    match (a, b) {
        (Int(x), Int(y)) => x
            .checked_sub(*y)
            .map(Int)
            .unwrap_or_else(|| Value::error(ValueError::integer_overflow())),
        (Uint(x), Uint(y)) => x
            .checked_sub(*y)
            .map(Uint)
            .unwrap_or_else(|| Value::error(ValueError::integer_overflow())),
        (Double(x), Double(y)) => Double(x - y),
        (Duration(x), Duration(y)) => x
            .checked_sub(y)
            .map(Value::Duration)
            .unwrap_or_else(Value::error),
        (Timestamp(x), Duration(y)) => x
            .checked_sub_duration(y)
            .map(Value::Timestamp)
            .unwrap_or_else(Value::error),
        (Timestamp(x), Timestamp(y)) => x
            .checked_sub_timestamp(y)
            .map(Value::Duration)
            .unwrap_or_else(Value::error),
        (Error(_), _) | (_, Error(_)) => propagate(a, b),
        _ => Value::error(ValueError::no_such_overload("-")),
    }
}

fn negate(a: &Value) -> Value {
    use Value::*;
    match a {
        Int(x) => x
            .checked_neg()
            .map(Int)
            .unwrap_or_else(|| Value::error(ValueError::integer_overflow())),
        Double(x) => Double(-x),
        Duration(d) => d.checked_neg().map(Value::Duration).unwrap_or_else(Value::error),
        Error(_) => a.clone(),
        _ => Value::error(ValueError::no_such_overload("-")),
    }
}

fn multiply(a: &Value, b: &Value) -> Value {
    use Value::*;
    match (a, b) {
        (Int(x), Int(y)) => x
            .checked_mul(*y)
            .map(Int)
            .unwrap_or_else(|| Value::error(ValueError::integer_overflow())),
        (Uint(x), Uint(y)) => x
            .checked_mul(*y)
            .map(Uint)
            .unwrap_or_else(|| Value::error(ValueError::integer_overflow())),
        (Double(x), Double(y)) => Double(x * y),
        (Error(_), _) | (_, Error(_)) => propagate(a, b),
        _ => Value::error(ValueError::no_such_overload("*")),
    }
}

fn divide(a: &Value, b: &Value) -> Value {
    use Value::*;
    match (a, b) {
        (Int(_), Int(0)) => Value::error(ValueError::division_by_zero()),
        (Int(x), Int(y)) => x
            .checked_div(*y)
            .map(Int)
            .unwrap_or_else(|| Value::error(ValueError::integer_overflow())),
        (Uint(_), Uint(0)) => Value::error(ValueError::division_by_zero()),
        (Uint(x), Uint(y)) => Uint(x / y),
        (Double(x), Double(y)) => Double(x / y),
        (Error(_), _) | (_, Error(_)) => propagate(a, b),
        _ => Value::error(ValueError::no_such_overload("/")),
    }
}

fn modulo(a: &Value, b: &Value) -> Value {
    use Value::*;
    match (a, b) {
        (Int(_), Int(0)) => Value::error(ValueError::division_by_zero()),
        (Int(x), Int(y)) => x
            .checked_rem(*y)
            .map(Int)
            .unwrap_or_else(|| Value::error(ValueError::integer_overflow())),
        (Uint(_), Uint(0)) => Value::error(ValueError::division_by_zero()),
        (Uint(x), Uint(y)) => Uint(x % y),
        (Error(_), _) | (_, Error(_)) => propagate(a, b),
        _ => Value::error(ValueError::no_such_overload("%")),
    }
}

fn propagate(a: &Value, b: &Value) -> Value {
    if a.is_error() {
        a.clone()
    } else {
        b.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_overflow_is_error() {
        assert!(dispatch("+", None, &[Value::Int(i64::MAX), Value::Int(1)]).is_error());
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(
            dispatch("+", None, &[Value::string("a"), Value::string("b")]),
            Value::string("ab")
        );
    }

    #[test]
    fn division_by_zero_is_error() {
        assert!(dispatch("/", None, &[Value::Int(1), Value::Int(0)]).is_error());
    }

    #[test]
    fn comparison_dispatch() {
        assert_eq!(
            dispatch("<", None, &[Value::Int(1), Value::Int(2)]),
            Value::Bool(true)
        );
    }

    #[test]
    fn in_dispatch_checks_container() {
        let list = Value::list(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(dispatch("in", None, &[Value::Int(2), list]), Value::Bool(true));
    }
}
