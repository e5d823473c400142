//! The planned evaluation tree (§4.5): each node implements a uniform
//! `eval(activation) -> Value` contract. Modeled as a closed enum (like
//! `ast::Expr`) rather than a trait-object tree, so decorators can match on
//! shape directly instead of downcasting — the node id and, for calls, the
//! function name/argument children are plain fields decorators can read
//! and rewrite.
use crate::env::Binding;
use crate::ids::NodeId;
use crate::value::{UnknownSet, Value, ValueError};

use super::activation::{Activation, HierarchicalActivation};
use super::decorators::{CostTracker, StateMap};

#[derive(Clone, Debug)]
pub enum Qualifier {
    Field(String),
    TestOnlyField(String),
    Index(Box<Interpretable>),
}

#[derive(Clone, Debug)]
pub enum Interpretable {
    Constant {
        id: NodeId,
        value: Value,
    },
    /// A resolved attribute path: a head variable name plus a sequence of
    /// field selects / index operations (§4.6's "attribute path").
    Attribute {
        id: NodeId,
        head: String,
        qualifiers: Vec<Qualifier>,
    },
    Call {
        id: NodeId,
        /// Kept for decorator introspection (`as_call`) — dispatch itself
        /// goes through `binding`, resolved once at plan time from the
        /// checked AST's chosen overload (§4.5: "the planner binds each
        /// call to a concrete native implementation").
        function: String,
        binding: Binding,
        target: Option<Box<Interpretable>>,
        args: Vec<Interpretable>,
    },
    LogicalAnd(Box<Interpretable>, Box<Interpretable>),
    LogicalOr(Box<Interpretable>, Box<Interpretable>),
    Conditional {
        cond: Box<Interpretable>,
        then_branch: Box<Interpretable>,
        else_branch: Box<Interpretable>,
    },
    ListConstructor {
        id: NodeId,
        elements: Vec<Interpretable>,
        optional_indices: Vec<usize>,
    },
    MapConstructor {
        id: NodeId,
        entries: Vec<(Interpretable, Interpretable, bool)>,
    },
    ObjectConstructor {
        id: NodeId,
        type_name: String,
        fields: Vec<(String, Interpretable, bool)>,
    },
    ComprehensionFold {
        id: NodeId,
        iter_range: Box<Interpretable>,
        iter_var: String,
        iter_var2: Option<String>,
        accu_var: String,
        accu_init: Box<Interpretable>,
        loop_condition: Box<Interpretable>,
        loop_step: Box<Interpretable>,
        result: Box<Interpretable>,
    },
    /// A field select whose operand didn't flatten into an `Attribute`
    /// path (e.g. selecting off a call result rather than off a variable) —
    /// evaluated via `Value::get` rather than the attribute/unknown-pattern
    /// machinery.
    FieldSelect {
        id: NodeId,
        operand: Box<Interpretable>,
        field: String,
    },
    PresenceTest {
        id: NodeId,
        operand: Box<Interpretable>,
        field: String,
    },
    OptionalSelect {
        id: NodeId,
        operand: Box<Interpretable>,
        field: String,
    },
    OptionalIndex {
        id: NodeId,
        operand: Box<Interpretable>,
        index: Box<Interpretable>,
    },
}

impl Interpretable {
    pub fn id(&self) -> NodeId {
        match self {
            Interpretable::Constant { id, .. }
            | Interpretable::Attribute { id, .. }
            | Interpretable::Call { id, .. }
            | Interpretable::ListConstructor { id, .. }
            | Interpretable::MapConstructor { id, .. }
            | Interpretable::ObjectConstructor { id, .. }
            | Interpretable::ComprehensionFold { id, .. }
            | Interpretable::FieldSelect { id, .. }
            | Interpretable::PresenceTest { id, .. }
            | Interpretable::OptionalSelect { id, .. }
            | Interpretable::OptionalIndex { id, .. } => *id,
            Interpretable::LogicalAnd(lhs, _) | Interpretable::LogicalOr(lhs, _) => lhs.id(),
            Interpretable::Conditional { cond, .. } => cond.id(),
        }
    }

    /// For a `Call`, the function name and argument children — exposed so
    /// decorators can rewrite dispatch without matching the whole enum
    /// (§4.5).
    pub fn as_call(&self) -> Option<(&str, &[Interpretable])> {
        match self {
            Interpretable::Call { function, args, .. } => Some((function.as_str(), args.as_slice())),
            _ => None,
        }
    }

    pub fn eval(&self, activation: &dyn Activation) -> Value {
        self.eval_with(activation, None, None)
    }

    /// As [`eval`](Self::eval), but additionally records every node's
    /// result into `state` and charges `cost` for each builtin dispatch
    /// (§4.6 Observability). Both trackers are optional and cheap to thread
    /// (they're `Rc`-backed handles): `evaluate`/`evaluate_with_state`/
    /// `evaluate_with_cost` on `Program` pick which ones to pass.
    pub fn eval_with(&self, activation: &dyn Activation, state: Option<&StateMap>, cost: Option<&CostTracker>) -> Value {
        let value = match self {
            Interpretable::Constant { value, .. } => value.clone(),
            Interpretable::Attribute { id, head, qualifiers } => {
                eval_attribute(*id, head, qualifiers, activation, state, cost)
            }
            Interpretable::Call {
                binding,
                target,
                args,
                ..
            } => eval_call(binding, target.as_deref(), args, activation, state, cost),
            Interpretable::LogicalAnd(lhs, rhs) => eval_logical_and(lhs, rhs, activation, state, cost),
            Interpretable::LogicalOr(lhs, rhs) => eval_logical_or(lhs, rhs, activation, state, cost),
            Interpretable::Conditional {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_val = cond.eval_with(activation, state, cost);
                match cond_val {
                    Value::Bool(true) => then_branch.eval_with(activation, state, cost),
                    Value::Bool(false) => else_branch.eval_with(activation, state, cost),
                    other => other,
                }
            }
            Interpretable::ListConstructor {
                elements,
                optional_indices,
                ..
            } => eval_list(elements, optional_indices, activation, state, cost),
            Interpretable::MapConstructor { entries, .. } => eval_map(entries, activation, state, cost),
            Interpretable::ObjectConstructor {
                type_name, fields, ..
            } => eval_object(type_name, fields, activation, state, cost),
            Interpretable::ComprehensionFold {
                iter_range,
                iter_var,
                iter_var2,
                accu_var,
                accu_init,
                loop_condition,
                loop_step,
                result,
                ..
            } => eval_comprehension(
                iter_range,
                iter_var,
                iter_var2.as_deref(),
                accu_var,
                accu_init,
                loop_condition,
                loop_step,
                result,
                activation,
                state,
                cost,
            ),
            Interpretable::FieldSelect { operand, field, .. } => {
                eval_field_select(operand, field, activation, state, cost)
            }
            Interpretable::PresenceTest { operand, field, .. } => {
                eval_presence_test(operand, field, activation, state, cost)
            }
            Interpretable::OptionalSelect { operand, field, .. } => {
                eval_optional_select(operand, field, activation, state, cost)
            }
            Interpretable::OptionalIndex { operand, index, .. } => {
                eval_optional_index(operand, index, activation, state, cost)
            }
        };
        if let Some(s) = state {
            s.record(self.id(), value.clone());
        }
        value
    }
}

#[allow(clippy::too_many_arguments)]
fn eval_attribute(
    id: NodeId,
    head: &str,
    qualifiers: &[Qualifier],
    activation: &dyn Activation,
    state: Option<&StateMap>,
    cost: Option<&CostTracker>,
) -> Value {
    if activation.matches_unknown_pattern(head) {
        return Value::Unknown(UnknownSet::single(id));
    }
    let mut current = match activation.resolve(head) {
        Some(v) => v,
        None => return Value::error(ValueError::no_such_attribute(head)),
    };
    let mut path = head.to_string();
    for qualifier in qualifiers {
        if current.is_exceptional() {
            return current;
        }
        match qualifier {
            Qualifier::Field(name) => {
                path.push('.');
                path.push_str(name);
                if activation.matches_unknown_pattern(&path) {
                    return Value::Unknown(UnknownSet::single(id));
                }
                current = current.get(&Value::string(name.clone()));
            }
            Qualifier::TestOnlyField(name) => {
                current = Value::Bool(field_present(&current, name));
            }
            Qualifier::Index(index_expr) => {
                let index = index_expr.eval_with(activation, state, cost);
                current = current.get(&index);
            }
        }
    }
    current
}

fn field_present(value: &Value, field: &str) -> bool {
    match value {
        Value::Object(o) => o.has_field(field),
        Value::Map(m) => m.contains_key(&Value::string(field.to_string())),
        _ => false,
    }
}

fn eval_call(
    binding: &Binding,
    target: Option<&Interpretable>,
    args: &[Interpretable],
    activation: &dyn Activation,
    state: Option<&StateMap>,
    cost: Option<&CostTracker>,
) -> Value {
    let target_val = target.map(|t| t.eval_with(activation, state, cost));
    if let Some(t) = &target_val {
        if t.is_exceptional() {
            return t.clone();
        }
    }

    let mut arg_values = Vec::with_capacity(args.len());
    let mut first_error: Option<Value> = None;
    let mut unknown: Option<Value> = None;
    for arg in args {
        let value = arg.eval_with(activation, state, cost);
        match &value {
            Value::Unknown(set) => {
                unknown = Some(match unknown {
                    Some(Value::Unknown(existing)) => Value::Unknown(existing.merge(set)),
                    _ => value.clone(),
                });
            }
            Value::Error(_) if first_error.is_none() => {
                first_error = Some(value.clone());
            }
            _ => {}
        }
        arg_values.push(value);
    }

    // Unknowns win over errors when merging strict-call results (§4.6).
    if let Some(u) = unknown {
        return u;
    }
    if let Some(e) = first_error {
        return e;
    }

    let mut all_args = Vec::with_capacity(arg_values.len() + 1);
    all_args.extend(target_val);
    all_args.extend(arg_values);

    if let Some(c) = cost {
        c.charge(1);
    }
    match binding {
        Binding::Unary(f) if all_args.len() == 1 => f(&all_args[0]),
        Binding::Binary(f) if all_args.len() == 2 => f(&all_args[0], &all_args[1]),
        Binding::Variadic(f) => f(&all_args),
        _ => Value::error(ValueError::no_such_overload("call")),
    }
}

fn eval_logical_and(
    lhs: &Interpretable,
    rhs: &Interpretable,
    activation: &dyn Activation,
    state: Option<&StateMap>,
    cost: Option<&CostTracker>,
) -> Value {
    let left = lhs.eval_with(activation, state, cost);
    if matches!(left, Value::Bool(false)) {
        return Value::Bool(false);
    }
    let right = rhs.eval_with(activation, state, cost);
    if matches!(right, Value::Bool(false)) {
        return Value::Bool(false);
    }
    match (left, right) {
        (Value::Bool(true), Value::Bool(true)) => Value::Bool(true),
        (Value::Unknown(a), Value::Unknown(b)) => Value::Unknown(a.merge(&b)),
        (Value::Unknown(u), _) | (_, Value::Unknown(u)) => Value::Unknown(u),
        (Value::Error(e), _) | (_, Value::Error(e)) => Value::Error(e),
        _ => Value::error(ValueError::no_such_overload("&&")),
    }
}

fn eval_logical_or(
    lhs: &Interpretable,
    rhs: &Interpretable,
    activation: &dyn Activation,
    state: Option<&StateMap>,
    cost: Option<&CostTracker>,
) -> Value {
    let left = lhs.eval_with(activation, state, cost);
    if matches!(left, Value::Bool(true)) {
        return Value::Bool(true);
    }
    let right = rhs.eval_with(activation, state, cost);
    if matches!(right, Value::Bool(true)) {
        return Value::Bool(true);
    }
    match (left, right) {
        (Value::Bool(false), Value::Bool(false)) => Value::Bool(false),
        (Value::Unknown(a), Value::Unknown(b)) => Value::Unknown(a.merge(&b)),
        (Value::Unknown(u), _) | (_, Value::Unknown(u)) => Value::Unknown(u),
        (Value::Error(e), _) | (_, Value::Error(e)) => Value::Error(e),
        _ => Value::error(ValueError::no_such_overload("||")),
    }
}

fn eval_list(
    elements: &[Interpretable],
    optional_indices: &[usize],
    activation: &dyn Activation,
    state: Option<&StateMap>,
    cost: Option<&CostTracker>,
) -> Value {
    let mut out = Vec::new();
    for (i, elem) in elements.iter().enumerate() {
        let value = elem.eval_with(activation, state, cost);
        if value.is_exceptional() {
            return value;
        }
        if optional_indices.contains(&i) {
            match value {
                Value::Optional(opt) => {
                    if let Some(v) = opt.value() {
                        out.push(v.clone());
                    }
                }
                other => out.push(other),
            }
        } else {
            out.push(value);
        }
    }
    Value::list(out)
}

fn eval_map(
    entries: &[(Interpretable, Interpretable, bool)],
    activation: &dyn Activation,
    state: Option<&StateMap>,
    cost: Option<&CostTracker>,
) -> Value {
    let mut map = crate::value::MapValue::new();
    for (key_expr, value_expr, optional) in entries {
        let key = key_expr.eval_with(activation, state, cost);
        if key.is_exceptional() {
            return key;
        }
        let value = value_expr.eval_with(activation, state, cost);
        if value.is_exceptional() {
            return value;
        }
        if *optional {
            match value {
                Value::Optional(opt) => {
                    if let Some(v) = opt.value() {
                        if let Err(e) = map.insert(key, v.clone(), true) {
                            return Value::error(e);
                        }
                    }
                    continue;
                }
                other => {
                    if let Err(e) = map.insert(key, other, true) {
                        return Value::error(e);
                    }
                    continue;
                }
            }
        }
        if let Err(e) = map.insert(key, value, true) {
            return Value::error(e);
        }
    }
    Value::Map(std::rc::Rc::new(map))
}

fn eval_object(
    type_name: &str,
    fields: &[(String, Interpretable, bool)],
    activation: &dyn Activation,
    state: Option<&StateMap>,
    cost: Option<&CostTracker>,
) -> Value {
    let mut map = std::collections::HashMap::new();
    for (name, value_expr, optional) in fields {
        let value = value_expr.eval_with(activation, state, cost);
        if value.is_exceptional() {
            return value;
        }
        if *optional {
            if let Value::Optional(opt) = &value {
                if let Some(v) = opt.value() {
                    map.insert(name.clone(), v.clone());
                }
                continue;
            }
        }
        map.insert(name.clone(), value);
    }
    Value::Object(std::rc::Rc::new(crate::value::object::ObjectValue::with_fields(
        type_name, map,
    )))
}

#[allow(clippy::too_many_arguments)]
fn eval_comprehension(
    iter_range: &Interpretable,
    iter_var: &str,
    iter_var2: Option<&str>,
    accu_var: &str,
    accu_init: &Interpretable,
    loop_condition: &Interpretable,
    loop_step: &Interpretable,
    result: &Interpretable,
    activation: &dyn Activation,
    state: Option<&StateMap>,
    cost: Option<&CostTracker>,
) -> Value {
    let range = iter_range.eval_with(activation, state, cost);
    if range.is_exceptional() {
        return range;
    }
    let items = match range.iterate() {
        Ok(items) => items,
        Err(e) => return Value::error(e),
    };
    let is_map = matches!(range, Value::Map(_));

    let mut accu = accu_init.eval_with(activation, state, cost);
    if accu.is_exceptional() {
        return accu;
    }

    for (index, item) in items.into_iter().enumerate() {
        let mut loop_scope = super::activation::BindingsActivation::new();
        match iter_var2 {
            // Two-variable form (§4.7): `iter_var` names the domain value
            // (map key or list index), `iter_var2` names the range value
            // (`map.all(k, v, p)`, `list.all(i, v, p)`).
            Some(v2) if is_map => {
                let value = range.get(&item);
                loop_scope.bind(iter_var, item);
                loop_scope.bind(v2, value);
            }
            Some(v2) => {
                loop_scope.bind(iter_var, Value::Int(index as i64));
                loop_scope.bind(v2, item);
            }
            None => loop_scope.bind(iter_var, item),
        }
        let loop_activation = HierarchicalActivation {
            inner: &loop_scope,
            outer: activation,
        };

        let mut accu_scope = super::activation::BindingsActivation::new();
        accu_scope.bind(accu_var, accu.clone());
        let cond_activation = HierarchicalActivation {
            inner: &accu_scope,
            outer: &loop_activation,
        };

        let cond = loop_condition.eval_with(&cond_activation, state, cost);
        match cond {
            Value::Bool(false) => break,
            Value::Bool(true) => {}
            other => return other,
        }

        accu = loop_step.eval_with(&cond_activation, state, cost);
        if accu.is_exceptional() {
            return accu;
        }
    }

    let mut final_scope = super::activation::BindingsActivation::new();
    final_scope.bind(accu_var, accu);
    let final_activation = HierarchicalActivation {
        inner: &final_scope,
        outer: activation,
    };
    result.eval_with(&final_activation, state, cost)
}

fn eval_field_select(
    operand: &Interpretable,
    field: &str,
    activation: &dyn Activation,
    state: Option<&StateMap>,
    cost: Option<&CostTracker>,
) -> Value {
    let value = operand.eval_with(activation, state, cost);
    if value.is_exceptional() {
        return value;
    }
    value.get(&Value::string(field.to_string()))
}

fn eval_presence_test(
    operand: &Interpretable,
    field: &str,
    activation: &dyn Activation,
    state: Option<&StateMap>,
    cost: Option<&CostTracker>,
) -> Value {
    let value = operand.eval_with(activation, state, cost);
    if value.is_exceptional() {
        return value;
    }
    Value::Bool(field_present(&value, field))
}

fn eval_optional_select(
    operand: &Interpretable,
    field: &str,
    activation: &dyn Activation,
    state: Option<&StateMap>,
    cost: Option<&CostTracker>,
) -> Value {
    let value = operand.eval_with(activation, state, cost);
    if value.is_exceptional() {
        return value;
    }
    if field_present(&value, field) {
        Value::Optional(std::rc::Rc::new(crate::value::optional::Optional::of(
            value.get(&Value::string(field.to_string())),
        )))
    } else {
        Value::Optional(std::rc::Rc::new(crate::value::optional::Optional::none()))
    }
}

fn eval_optional_index(
    operand: &Interpretable,
    index: &Interpretable,
    activation: &dyn Activation,
    state: Option<&StateMap>,
    cost: Option<&CostTracker>,
) -> Value {
    let value = operand.eval_with(activation, state, cost);
    if value.is_exceptional() {
        return value;
    }
    let index_val = index.eval_with(activation, state, cost);
    if index_val.is_exceptional() {
        return index_val;
    }
    let present = match &value {
        Value::Map(m) => m.contains_key(&index_val),
        Value::List(l) => match &index_val {
            Value::Int(i) => *i >= 0 && (*i as usize) < l.len(),
            _ => false,
        },
        _ => false,
    };
    if present {
        Value::Optional(std::rc::Rc::new(crate::value::optional::Optional::of(
            value.get(&index_val),
        )))
    } else {
        Value::Optional(std::rc::Rc::new(crate::value::optional::Optional::none()))
    }
}
