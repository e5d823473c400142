//! The CEL type language: primitives, parameterized containers, object
//! types, wrapper/nullable types, type variables and function signatures.
//!
//! Assignability and unification follow §3.2/§4.2 of the specification.
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub enum Type {
    Null,
    Bool,
    Int,
    Uint,
    Double,
    String,
    Bytes,
    Duration,
    Timestamp,
    Any,
    Dyn,
    List(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Object(String),
    /// Nullable wrapper around a primitive, i.e. the union `{primitive, null}`.
    Wrapper(Box<Type>),
    Optional(Box<Type>),
    TypeParam(String),
    Function {
        result: Box<Type>,
        params: Vec<Type>,
    },
    Error,
    /// The type of a first-class `Type` value (cel-go's `TypeType`). Added
    /// to make `type()` total over every `Value` variant; see SPEC_FULL §3.
    Type(Box<Type>),
}

impl Type {
    pub fn list_of(element: Type) -> Type {
        Type::List(Box::new(element))
    }

    pub fn map_of(key: Type, value: Type) -> Type {
        Type::Map(Box::new(key), Box::new(value))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::Null
                | Type::Bool
                | Type::Int
                | Type::Uint
                | Type::Double
                | Type::String
                | Type::Bytes
                | Type::Duration
                | Type::Timestamp
        )
    }

    /// Structural equality collapsing one layer of `Wrapper`, matching the
    /// teacher's `Type::does_eq` reference-collapsing for `Reference`.
    pub fn does_eq(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Wrapper(l), r) => l.does_eq(r) || r == &Type::Null,
            (l, Type::Wrapper(r)) => l.does_eq(r) || l == &Type::Null,
            (Type::List(l), Type::List(r)) => l.does_eq(r),
            (Type::Map(lk, lv), Type::Map(rk, rv)) => lk.does_eq(rk) && lv.does_eq(rv),
            (Type::Optional(l), Type::Optional(r)) => l.does_eq(r),
            (
                Type::Function {
                    result: lr,
                    params: lp,
                },
                Type::Function {
                    result: rr,
                    params: rp,
                },
            ) => lr.does_eq(rr) && lp.len() == rp.len() && lp.iter().zip(rp).all(|(a, b)| a.does_eq(b)),
            _ => self == other,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Null => write!(f, "null_type"),
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Uint => write!(f, "uint"),
            Type::Double => write!(f, "double"),
            Type::String => write!(f, "string"),
            Type::Bytes => write!(f, "bytes"),
            Type::Duration => write!(f, "google.protobuf.Duration"),
            Type::Timestamp => write!(f, "google.protobuf.Timestamp"),
            Type::Any => write!(f, "any"),
            Type::Dyn => write!(f, "dyn"),
            Type::List(elem) => write!(f, "list({elem})"),
            Type::Map(k, v) => write!(f, "map({k},{v})"),
            Type::Object(name) => write!(f, ".{name}"),
            Type::Wrapper(inner) => write!(f, "{inner}?"),
            Type::Optional(inner) => write!(f, "optional({inner})"),
            Type::TypeParam(name) => write!(f, "{name}"),
            Type::Function { result, params } => {
                let params = params
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "({params}) -> {result}")
            }
            Type::Error => write!(f, "*error*"),
            Type::Type(inner) => write!(f, "type({inner})"),
        }
    }
}

/// A mapping of type-variable names to the type they were unified with.
/// Fresh per call-site, matching §4.2's "type variables are fresh per
/// call-site".
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    bindings: HashMap<String, Type>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.bindings.get(name)
    }

    /// Resolve a type through the substitution, recursively replacing bound
    /// type variables and substituting inside parameterized types.
    pub fn apply(&self, ty: &Type) -> Type {
        match ty {
            Type::TypeParam(name) => match self.bindings.get(name) {
                Some(bound) => self.apply(bound),
                None => ty.clone(),
            },
            Type::List(elem) => Type::List(Box::new(self.apply(elem))),
            Type::Map(k, v) => Type::Map(Box::new(self.apply(k)), Box::new(self.apply(v))),
            Type::Wrapper(inner) => Type::Wrapper(Box::new(self.apply(inner))),
            Type::Optional(inner) => Type::Optional(Box::new(self.apply(inner))),
            Type::Type(inner) => Type::Type(Box::new(self.apply(inner))),
            Type::Function { result, params } => Type::Function {
                result: Box::new(self.apply(result)),
                params: params.iter().map(|p| self.apply(p)).collect(),
            },
            other => other.clone(),
        }
    }

    fn bind(&mut self, name: String, ty: Type) -> bool {
        if let Type::TypeParam(other) = &ty {
            if *other == name {
                return true;
            }
        }
        self.bindings.insert(name, ty);
        true
    }
}

/// Attempt to unify `expected` (which may contain type variables) against
/// `actual`, extending `subst` on success. Returns `false` without mutating
/// `subst` further on failure.
pub fn unify(expected: &Type, actual: &Type, subst: &mut Substitution) -> bool {
    let expected = subst.apply(expected);
    let actual = subst.apply(actual);

    match (&expected, &actual) {
        (Type::TypeParam(name), _) => subst.bind(name.clone(), actual),
        (_, Type::TypeParam(name)) => subst.bind(name.clone(), expected),
        (Type::Dyn, _) | (_, Type::Dyn) => true,
        (Type::Error, _) | (_, Type::Error) => true,
        (Type::List(le), Type::List(ra)) => unify(le, ra, subst),
        (Type::Map(lk, lv), Type::Map(rk, rv)) => unify(lk, rk, subst) && unify(lv, rv, subst),
        (Type::Wrapper(l), Type::Wrapper(r)) => unify(l, r, subst),
        (Type::Wrapper(l), r) => unify(l, r, subst),
        (l, Type::Wrapper(r)) => unify(l, r, subst),
        (Type::Optional(l), Type::Optional(r)) => unify(l, r, subst),
        (
            Type::Function {
                result: lr,
                params: lp,
            },
            Type::Function {
                result: rr,
                params: rp,
            },
        ) => {
            lp.len() == rp.len()
                && lp.iter().zip(rp).all(|(a, b)| unify(a, b, subst))
                && unify(lr, rr, subst)
        }
        _ => expected.does_eq(&actual),
    }
}

/// Is `a` assignable to `b`, per §3.2: `b` is `Dyn`; `a == b`; `a` is
/// `Error`; `b` is a wrapper of `a`; `a` is `Null` and `b` is a
/// wrapper/`Any`/`Dyn`; both are parameterized containers whose parameters
/// are mutually assignable; or `b` unifies with `a`.
pub fn is_assignable(a: &Type, b: &Type, subst: &mut Substitution) -> bool {
    if matches!(b, Type::Dyn | Type::Any) {
        return true;
    }
    if a == b {
        return true;
    }
    if matches!(a, Type::Error) {
        return true;
    }
    if let Type::Wrapper(inner) = b {
        if is_assignable(a, inner, subst) {
            return true;
        }
    }
    if matches!(a, Type::Null) && matches!(b, Type::Wrapper(_) | Type::Any | Type::Dyn) {
        return true;
    }
    match (a, b) {
        (Type::List(ea), Type::List(eb)) => is_assignable(ea, eb, subst),
        (Type::Map(ka, va), Type::Map(kb, vb)) => {
            is_assignable(ka, kb, subst) && is_assignable(va, vb, subst)
        }
        (Type::Optional(ia), Type::Optional(ib)) => is_assignable(ia, ib, subst),
        _ => {
            if matches!(b, Type::TypeParam(_)) {
                unify(b, a, subst)
            } else {
                false
            }
        }
    }
}

/// Least upper bound of two types per §4.4/§9: `Dyn` unless the types are
/// equal (object-type LUB across unrelated hierarchies is explicitly left
/// as `Dyn` — see SPEC_FULL §4).
pub fn least_upper_bound(a: &Type, b: &Type) -> Type {
    if a.does_eq(b) {
        a.clone()
    } else {
        match (a, b) {
            (Type::List(ea), Type::List(eb)) => Type::List(Box::new(least_upper_bound(ea, eb))),
            (Type::Map(ka, va), Type::Map(kb, vb)) => Type::Map(
                Box::new(least_upper_bound(ka, kb)),
                Box::new(least_upper_bound(va, vb)),
            ),
            _ => Type::Dyn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_equality() {
        assert!(Type::Int.does_eq(&Type::Int));
        assert!(!Type::Int.does_eq(&Type::Double));
    }

    #[test]
    fn wrapper_collapses_one_layer() {
        assert!(Type::Wrapper(Box::new(Type::Int)).does_eq(&Type::Int));
        assert!(Type::Int.does_eq(&Type::Wrapper(Box::new(Type::Int))));
    }

    #[test]
    fn dyn_accepts_anything() {
        let mut subst = Substitution::new();
        assert!(is_assignable(&Type::String, &Type::Dyn, &mut subst));
        assert!(!is_assignable(&Type::Dyn, &Type::String, &mut subst));
    }

    #[test]
    fn null_assignable_to_wrapper() {
        let mut subst = Substitution::new();
        assert!(is_assignable(
            &Type::Null,
            &Type::Wrapper(Box::new(Type::Int)),
            &mut subst
        ));
    }

    #[test]
    fn unify_binds_type_param() {
        let mut subst = Substitution::new();
        assert!(unify(
            &Type::List(Box::new(Type::TypeParam("T".into()))),
            &Type::List(Box::new(Type::Int)),
            &mut subst
        ));
        assert_eq!(subst.get("T"), Some(&Type::Int));
    }

    #[test]
    fn lub_of_equal_types_is_itself() {
        assert_eq!(least_upper_bound(&Type::Int, &Type::Int), Type::Int);
    }

    #[test]
    fn lub_of_unrelated_object_types_is_dyn() {
        assert_eq!(
            least_upper_bound(&Type::Object("A".into()), &Type::Object("B".into())),
            Type::Dyn
        );
    }

    #[test]
    fn display_function_type() {
        let f = Type::Function {
            result: Box::new(Type::Bool),
            params: vec![Type::Int, Type::String],
        };
        assert_eq!(f.to_string(), "(int, string) -> bool");
    }

    #[test]
    fn display_list_and_optional() {
        assert_eq!(Type::list_of(Type::Int).to_string(), "list(int)");
        assert_eq!(
            Type::Optional(Box::new(Type::String)).to_string(),
            "optional(string)"
        );
        assert_eq!(Type::Wrapper(Box::new(Type::Int)).to_string(), "int?");
    }
}
