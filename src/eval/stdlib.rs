//! The standard library (§6.4 default installation): declares an overload
//! for every core operator so the checker has something to resolve calls
//! against, with bindings that forward to [`super::builtins::dispatch`].
//! Installed into every [`Env`] built through `Env::with_options` unless the
//! caller deliberately omits it — mirrors the teacher's pattern of a
//! default-on `Library`/prelude rather than requiring every caller to
//! declare `+` by hand.
use std::rc::Rc;

use crate::env::{Binding, Env, FunctionOverload, Library};
use crate::value::types::Type;
use crate::value::{Value, ValueError};

use super::builtins;

pub struct Stdlib;

impl Library for Stdlib {
    fn name(&self) -> &str {
        "stdlib"
    }

    fn configure(&self, env: &mut Env) {
        for overload in overloads() {
            let name = overload.0.to_string();
            env.declarations.declare_function(name, overload.1);
        }
    }
}

fn native(name: &'static str) -> Option<Binding> {
    Some(Binding::Variadic(Rc::new(move |args: &[crate::value::Value]| {
        builtins::dispatch(name, None, args)
    })))
}

/// Global overload with no native binding — intercepted at plan time by
/// `plan::Planner` before any binding lookup happens (logical operators and
/// the conditional/optional operators never reach `builtins::dispatch`).
fn unbound(name: &str, params: Vec<Type>, result: Type) -> FunctionOverload {
    FunctionOverload {
        id: format!("{name}_special"),
        member: false,
        receiver_type: None,
        params,
        result,
        binding: None,
    }
}

fn global(id: &str, params: Vec<Type>, result: Type) -> FunctionOverload {
    FunctionOverload {
        id: id.to_string(),
        member: false,
        receiver_type: None,
        params,
        result,
        binding: native(id),
    }
}

fn member(id: &str, receiver: Type, params: Vec<Type>, result: Type) -> FunctionOverload {
    FunctionOverload {
        id: id.to_string(),
        member: true,
        receiver_type: Some(receiver),
        params,
        result,
        binding: native(id),
    }
}

fn overloads() -> Vec<(&'static str, FunctionOverload)> {
    use Type::*;
    let dyn_pair = || vec![Dyn, Dyn];
    vec![
        ("+", global("add_int", vec![Int, Int], Int)),
        ("+", global("add_uint", vec![Uint, Uint], Uint)),
        ("+", global("add_double", vec![Double, Double], Double)),
        ("+", global("add_string", vec![String, String], String)),
        ("+", global("add_bytes", vec![Bytes, Bytes], Bytes)),
        (
            "+",
            global("add_list", vec![Type::list_of(Dyn), Type::list_of(Dyn)], Type::list_of(Dyn)),
        ),
        ("+", global("add_duration", vec![Duration, Duration], Duration)),
        ("+", global("add_timestamp_duration", vec![Timestamp, Duration], Timestamp)),
        ("-", global("sub_int", vec![Int, Int], Int)),
        ("-", global("sub_uint", vec![Uint, Uint], Uint)),
        ("-", global("sub_double", vec![Double, Double], Double)),
        ("-", global("sub_duration", vec![Duration, Duration], Duration)),
        ("-", global("sub_timestamp_duration", vec![Timestamp, Duration], Timestamp)),
        ("-", global("sub_timestamp_timestamp", vec![Timestamp, Timestamp], Duration)),
        ("-", global("neg_int", vec![Int], Int)),
        ("-", global("neg_double", vec![Double], Double)),
        ("-", global("neg_duration", vec![Duration], Duration)),
        ("*", global("mul_int", vec![Int, Int], Int)),
        ("*", global("mul_uint", vec![Uint, Uint], Uint)),
        ("*", global("mul_double", vec![Double, Double], Double)),
        ("/", global("div_int", vec![Int, Int], Int)),
        ("/", global("div_uint", vec![Uint, Uint], Uint)),
        ("/", global("div_double", vec![Double, Double], Double)),
        ("%", global("mod_int", vec![Int, Int], Int)),
        ("%", global("mod_uint", vec![Uint, Uint], Uint)),
        ("==", global("equals", dyn_pair(), Bool)),
        ("!=", global("not_equals", dyn_pair(), Bool)),
        ("<", global("less", dyn_pair(), Bool)),
        ("<=", global("less_or_equal", dyn_pair(), Bool)),
        (">", global("greater", dyn_pair(), Bool)),
        (">=", global("greater_or_equal", dyn_pair(), Bool)),
        ("!", global("logical_not", vec![Bool], Bool)),
        ("in", global("in_list_or_map", dyn_pair(), Bool)),
        ("size", global("size_global", vec![Dyn], Int)),
        ("size", member("size_member", Dyn, vec![], Int)),
        ("_[_]", global("index_list", vec![Type::list_of(Dyn), Int], Dyn)),
        ("_[_]", global("index_map", vec![Type::map_of(Dyn, Dyn), Dyn], Dyn)),
        ("type", global("type_of", vec![Dyn], Type::Type(Box::new(Dyn)))),
        ("int", global("to_int", vec![Dyn], Int)),
        ("uint", global("to_uint", vec![Dyn], Uint)),
        ("double", global("to_double", vec![Dyn], Double)),
        ("string", global("to_string", vec![Dyn], String)),
        ("bytes", global("to_bytes", vec![Dyn], Bytes)),
        ("bool", global("to_bool", vec![Dyn], Bool)),
        ("&&", unbound("&&", vec![Bool, Bool], Bool)),
        ("||", unbound("||", vec![Bool, Bool], Bool)),
        ("_?_:_", unbound("_?_:_", vec![Bool, Dyn, Dyn], Dyn)),
        ("_[?_]", unbound("_[?_]", dyn_pair(), Type::Optional(Box::new(Dyn)))),
        ("_?._", unbound("_?._", dyn_pair(), Type::Optional(Box::new(Dyn)))),
        (
            "@mapInsert",
            FunctionOverload {
                id: "map_insert".into(),
                member: false,
                receiver_type: None,
                params: vec![Type::map_of(Dyn, Dyn), Dyn, Dyn],
                result: Type::map_of(Dyn, Dyn),
                binding: Some(Binding::Variadic(Rc::new(|args: &[Value]| {
                    map_insert(&args[0], &args[1], &args[2])
                }))),
            },
        ),
        (
            "@mapInsertEntry",
            FunctionOverload {
                id: "map_insert_entry".into(),
                member: false,
                receiver_type: None,
                params: vec![Type::map_of(Dyn, Dyn), Type::map_of(Dyn, Dyn)],
                result: Type::map_of(Dyn, Dyn),
                binding: Some(Binding::Variadic(Rc::new(|args: &[Value]| {
                    map_insert_entry(&args[0], &args[1])
                }))),
            },
        ),
    ]
}

/// Backs `@mapInsert`, the privileged function `transformMap`/
/// `transformMapEntry` (§4.7) fold through: inserts `key`/`value` into a
/// copy of `accu`, rejecting a duplicate key rather than overwriting it.
fn map_insert(accu: &Value, key: &Value, value: &Value) -> Value {
    match accu {
        Value::Map(m) => {
            let mut updated = (**m).clone();
            match updated.insert(key.clone(), value.clone(), false) {
                Ok(()) => Value::Map(Rc::new(updated)),
                Err(e) => Value::error(e),
            }
        }
        Value::Error(_) => accu.clone(),
        _ => Value::error(ValueError::no_such_overload("@mapInsert")),
    }
}

/// Backs `@mapInsertEntry`: merges a zero-or-one-entry map produced by a
/// `transformMapEntry` body into `accu`, so a body that emits `{}` skips
/// the current key without error.
fn map_insert_entry(accu: &Value, entry: &Value) -> Value {
    match (accu, entry) {
        (Value::Map(_), Value::Map(e)) if e.is_empty() => accu.clone(),
        (Value::Map(m), Value::Map(e)) => {
            let mut updated = (**m).clone();
            for (k, v) in e.iter() {
                if let Err(err) = updated.insert(k.clone(), v.clone(), false) {
                    return Value::error(err);
                }
            }
            Value::Map(Rc::new(updated))
        }
        (Value::Error(_), _) => accu.clone(),
        (_, Value::Error(_)) => entry.clone(),
        _ => Value::error(ValueError::no_such_overload("@mapInsertEntry")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvOption;

    #[test]
    fn stdlib_declares_arithmetic_overloads() {
        let env = Env::with_options("", vec![EnvOption::Library(Box::new(Stdlib))]);
        assert!(!env.declarations.overloads("+").is_empty());
        assert!(!env.declarations.overloads("&&").is_empty());
    }
}
