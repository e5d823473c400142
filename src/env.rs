//! Environment construction (§6.1): the immutable bundle of declarations,
//! object types and switches the checker and planner compile against.
//! `extend` clones the environment and layers additional options on top,
//! the same clone-and-layer shape as the teacher's `Scope::enter_scope` /
//! `TypeRegistry` cloning, generalized from a lexical stack to a single
//! immutable-with-copy-on-extend snapshot (CEL has no nested lexical scope
//! outside comprehensions, which the checker/evaluator handle separately).
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::value::adapter::{ObjectDescriptor, TypeRegistry};
use crate::value::types::Type;
use crate::value::{Value, ValueError};

/// One overload of a declared function: its parameter/result types and an
/// optional native binding. A function with no binding on any overload is
/// "declared but not bound" — valid for the checker, rejected by the
/// planner if the program actually calls it.
#[derive(Clone)]
pub struct FunctionOverload {
    pub id: String,
    pub member: bool,
    /// The receiver type for a member overload (e.g. `list(T)` for
    /// `list.size()`); unused for global overloads.
    pub receiver_type: Option<Type>,
    pub params: Vec<Type>,
    pub result: Type,
    pub binding: Option<Binding>,
}

/// A native function implementation. `Unary`/`Binary` exist alongside the
/// general `Variadic` form because most builtins are one- or two-argument
/// and a fixed-arity closure reads better at the call site (§6.5).
#[derive(Clone)]
pub enum Binding {
    Unary(Rc<dyn Fn(&Value) -> Value>),
    Binary(Rc<dyn Fn(&Value, &Value) -> Value>),
    Variadic(Rc<dyn Fn(&[Value]) -> Value>),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Binding::Unary(_) => "Unary",
            Binding::Binary(_) => "Binary",
            Binding::Variadic(_) => "Variadic",
        };
        write!(f, "Binding::{kind}(..)")
    }
}

impl fmt::Debug for FunctionOverload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionOverload")
            .field("id", &self.id)
            .field("member", &self.member)
            .field("receiver_type", &self.receiver_type)
            .field("params", &self.params)
            .field("result", &self.result)
            .field("bound", &self.binding.is_some())
            .finish()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Declarations {
    pub variables: HashMap<String, Type>,
    pub functions: HashMap<String, Vec<FunctionOverload>>,
}

impl Declarations {
    pub fn declare_variable(&mut self, name: impl Into<String>, ty: Type) {
        self.variables.insert(name.into(), ty);
    }

    pub fn declare_function(&mut self, name: impl Into<String>, overload: FunctionOverload) {
        self.functions.entry(name.into()).or_default().push(overload);
    }

    pub fn overloads(&self, name: &str) -> &[FunctionOverload] {
        self.functions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Boolean switches (§6.1f): homogeneous aggregate literals, macro-call
/// tracking, extended validations, identifier-escape syntax.
#[derive(Clone, Copy, Debug, Default)]
pub struct Switches {
    pub homogeneous_aggregate_literals: bool,
    pub track_macro_calls: bool,
    pub extended_validations: bool,
    pub identifier_escape_syntax: bool,
}

#[derive(Clone, Debug)]
pub struct Env {
    pub container: String,
    pub declarations: Declarations,
    pub types: TypeRegistry,
    pub switches: Switches,
}

impl Default for Env {
    fn default() -> Self {
        Env {
            container: String::new(),
            declarations: Declarations::default(),
            types: TypeRegistry::new(),
            switches: Switches::default(),
        }
    }
}

/// One configuration option applied during construction or `extend` (§6.1).
pub enum EnvOption {
    Variable(String, Type),
    Function(String, FunctionOverload),
    ObjectType(ObjectDescriptor),
    Library(Box<dyn Library>),
    HomogeneousAggregateLiterals(bool),
    TrackMacroCalls(bool),
    ExtendedValidations(bool),
    IdentifierEscapeSyntax(bool),
}

/// A named bundle of declarations and switches installed as a unit (§6.1e,
/// §6.4). Implementors contribute variables, functions and object types the
/// way a plugin would; see `crate::eval::stdlib` for the built-in library.
pub trait Library {
    fn name(&self) -> &str;
    fn configure(&self, env: &mut Env);
}

impl Env {
    pub fn new(container: impl Into<String>) -> Env {
        Env {
            container: container.into(),
            ..Env::default()
        }
    }

    pub fn with_options(container: impl Into<String>, options: Vec<EnvOption>) -> Env {
        let mut env = Env::new(container);
        env.apply(options);
        env
    }

    /// Clone this environment and layer `options` on top, per §6.1/§5's
    /// "extending an environment clones it and layers additional options".
    pub fn extend(&self, options: Vec<EnvOption>) -> Env {
        let mut env = self.clone();
        env.apply(options);
        env
    }

    fn apply(&mut self, options: Vec<EnvOption>) {
        for option in options {
            match option {
                EnvOption::Variable(name, ty) => self.declarations.declare_variable(name, ty),
                EnvOption::Function(name, overload) => {
                    self.declarations.declare_function(name, overload)
                }
                EnvOption::ObjectType(descriptor) => self.types.register_object_type(descriptor),
                EnvOption::Library(library) => library.configure(self),
                EnvOption::HomogeneousAggregateLiterals(v) => {
                    self.switches.homogeneous_aggregate_literals = v
                }
                EnvOption::TrackMacroCalls(v) => self.switches.track_macro_calls = v,
                EnvOption::ExtendedValidations(v) => self.switches.extended_validations = v,
                EnvOption::IdentifierEscapeSyntax(v) => self.switches.identifier_escape_syntax = v,
            }
        }
    }

    /// §4.4's identifier-resolution candidate order for `name` resolved
    /// inside this environment's container: `container.name`, successively
    /// stripping trailing container segments, then the bare name.
    pub fn resolution_candidates(&self, name: &str) -> Vec<String> {
        if let Some(rest) = name.strip_prefix('.') {
            return vec![rest.to_string()];
        }
        let mut candidates = Vec::new();
        let mut segments: Vec<&str> = self.container.split('.').filter(|s| !s.is_empty()).collect();
        loop {
            if segments.is_empty() {
                candidates.push(name.to_string());
                break;
            }
            candidates.push(format!("{}.{}", segments.join("."), name));
            segments.pop();
        }
        candidates
    }

    pub fn resolve_variable(&self, name: &str) -> Option<(String, Type)> {
        for candidate in self.resolution_candidates(name) {
            if let Some(ty) = self.declarations.variables.get(&candidate) {
                return Some((candidate, ty.clone()));
            }
        }
        None
    }

    pub fn call_unbound(name: &str) -> ValueError {
        ValueError::no_such_overload(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_candidates_strip_container_segments() {
        let env = Env::new("x.y");
        assert_eq!(
            env.resolution_candidates("a.b"),
            vec!["x.y.a.b", "x.a.b", "a.b"]
        );
    }

    #[test]
    fn leading_dot_skips_container() {
        let env = Env::new("x.y");
        assert_eq!(env.resolution_candidates(".a.b"), vec!["a.b"]);
    }

    #[test]
    fn extend_does_not_mutate_parent() {
        let base = Env::new("");
        let extended = base.extend(vec![EnvOption::Variable("x".into(), Type::Int)]);
        assert!(base.resolve_variable("x").is_none());
        assert!(extended.resolve_variable("x").is_some());
    }
}
