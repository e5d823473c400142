//! Activations (§3.5): read-only variable bindings the evaluator resolves
//! attribute paths against. Hierarchical activations stack inner over
//! outer; an activation may also serve *lazy* bindings, computed on first
//! access and memoized — grounded in the same "clone cheaply, mutate via
//! interior cell" shape the teacher uses for shared type slots, here
//! applied to a memoization cache instead of a unification result.
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

pub trait Activation {
    /// Resolve a fully-qualified (already container-resolved) name to a
    /// value, if this activation binds it.
    fn resolve(&self, name: &str) -> Option<Value>;

    /// Does `path` match a registered unknown-attribute pattern? A prefix
    /// match is sufficient per §4.6: "if any prefix of the path matches".
    fn matches_unknown_pattern(&self, _path: &str) -> bool {
        false
    }
}

enum Slot {
    Value(Value),
    Lazy(Rc<dyn Fn() -> Value>),
}

/// A flat activation: a set of eager/lazy bindings plus unknown-attribute
/// patterns, with no parent. The base case of the hierarchy.
pub struct BindingsActivation {
    bindings: HashMap<String, Slot>,
    memo: RefCell<HashMap<String, Value>>,
    unknown_patterns: Vec<String>,
}

impl BindingsActivation {
    pub fn new() -> BindingsActivation {
        BindingsActivation {
            bindings: HashMap::new(),
            memo: RefCell::new(HashMap::new()),
            unknown_patterns: Vec::new(),
        }
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), Slot::Value(value));
    }

    pub fn bind_lazy(&mut self, name: impl Into<String>, thunk: Rc<dyn Fn() -> Value>) {
        self.bindings.insert(name.into(), Slot::Lazy(thunk));
    }

    pub fn mark_unknown(&mut self, pattern: impl Into<String>) {
        self.unknown_patterns.push(pattern.into());
    }
}

impl Default for BindingsActivation {
    fn default() -> Self {
        BindingsActivation::new()
    }
}

impl Activation for BindingsActivation {
    fn resolve(&self, name: &str) -> Option<Value> {
        match self.bindings.get(name)? {
            Slot::Value(v) => Some(v.clone()),
            Slot::Lazy(thunk) => {
                if let Some(cached) = self.memo.borrow().get(name) {
                    return Some(cached.clone());
                }
                let value = thunk();
                self.memo.borrow_mut().insert(name.to_string(), value.clone());
                Some(value)
            }
        }
    }

    fn matches_unknown_pattern(&self, path: &str) -> bool {
        self.unknown_patterns
            .iter()
            .any(|pattern| path == pattern || path.starts_with(&format!("{pattern}.")))
    }
}

/// `inner` shadows `outer`: a lookup tries `inner` first, falling back to
/// `outer` only on a miss. Used for comprehension loop scopes layered over
/// the top-level activation.
pub struct HierarchicalActivation<'a> {
    pub inner: &'a dyn Activation,
    pub outer: &'a dyn Activation,
}

impl<'a> Activation for HierarchicalActivation<'a> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.inner.resolve(name).or_else(|| self.outer.resolve(name))
    }

    fn matches_unknown_pattern(&self, path: &str) -> bool {
        self.inner.matches_unknown_pattern(path) || self.outer.matches_unknown_pattern(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lazy_binding_memoizes() {
        let calls = Rc::new(RefCell::new(0));
        let calls2 = calls.clone();
        let mut activation = BindingsActivation::new();
        activation.bind_lazy(
            "x",
            Rc::new(move || {
                *calls2.borrow_mut() += 1;
                Value::Int(42)
            }),
        );
        assert_eq!(activation.resolve("x"), Some(Value::Int(42)));
        assert_eq!(activation.resolve("x"), Some(Value::Int(42)));
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn inner_shadows_outer() {
        let mut outer = BindingsActivation::new();
        outer.bind("x", Value::Int(1));
        let mut inner = BindingsActivation::new();
        inner.bind("x", Value::Int(2));
        let chained = HierarchicalActivation {
            inner: &inner,
            outer: &outer,
        };
        assert_eq!(chained.resolve("x"), Some(Value::Int(2)));
    }

    #[test]
    fn unknown_pattern_matches_prefix() {
        let mut activation = BindingsActivation::new();
        activation.mark_unknown("request.auth");
        assert!(activation.matches_unknown_pattern("request.auth.token"));
        assert!(!activation.matches_unknown_pattern("request.body"));
    }
}
