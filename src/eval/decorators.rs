//! Plan decorators (§4.6 Observability): ordered `Interpretable ->
//! Interpretable` rewrites applied after planning and before evaluation.
//! Every decorator here must leave the semantic result of evaluating the
//! tree unchanged — they only fold constants or attach bookkeeping.
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::eval::activation::BindingsActivation;
use crate::eval::interpretable::Interpretable;
use crate::ids::NodeId;
use crate::value::Value;

/// Constant-folds any subtree whose every leaf is already a `Constant` and
/// whose call target/args contain no `Attribute`/`ComprehensionFold` (i.e.
/// nothing that could observe activation state) into a single `Constant`.
/// Pre-evaluates bottom-up against an empty activation; anything that
/// would error or go `Unknown` is left unfolded so the real evaluation
/// reports it at the right node.
pub fn fold_constants(node: Interpretable) -> Interpretable {
    match node {
        Interpretable::Call {
            id,
            function,
            binding,
            target,
            args,
        } => {
            let target = target.map(|t| Box::new(fold_constants(*t)));
            let args: Vec<Interpretable> = args.into_iter().map(fold_constants).collect();
            let target_is_const = matches!(target.as_deref(), None | Some(Interpretable::Constant { .. }));
            let args_are_const = args.iter().all(|a| matches!(a, Interpretable::Constant { .. }));
            if target_is_const && args_are_const {
                let rebuilt = Interpretable::Call {
                    id,
                    function: function.clone(),
                    binding,
                    target,
                    args,
                };
                let empty = BindingsActivation::new();
                let value = rebuilt.eval(&empty);
                if value.is_exceptional() {
                    rebuilt
                } else {
                    Interpretable::Constant { id, value }
                }
            } else {
                Interpretable::Call {
                    id,
                    function,
                    binding,
                    target,
                    args,
                }
            }
        }
        Interpretable::ListConstructor {
            id,
            elements,
            optional_indices,
        } => Interpretable::ListConstructor {
            id,
            elements: elements.into_iter().map(fold_constants).collect(),
            optional_indices,
        },
        Interpretable::LogicalAnd(lhs, rhs) => {
            Interpretable::LogicalAnd(Box::new(fold_constants(*lhs)), Box::new(fold_constants(*rhs)))
        }
        Interpretable::LogicalOr(lhs, rhs) => {
            Interpretable::LogicalOr(Box::new(fold_constants(*lhs)), Box::new(fold_constants(*rhs)))
        }
        Interpretable::Conditional {
            cond,
            then_branch,
            else_branch,
        } => Interpretable::Conditional {
            cond: Box::new(fold_constants(*cond)),
            then_branch: Box::new(fold_constants(*then_branch)),
            else_branch: Box::new(fold_constants(*else_branch)),
        },
        other => other,
    }
}

/// Records the last value produced at each node id during a single
/// evaluation — a debugging aid (§4.6's "per-node state map"), not
/// consulted by evaluation itself. Wrap a planned tree with
/// `StateTrackingActivation`-style use is left to callers: this type just
/// owns the shared map a tracking wrapper would populate.
#[derive(Clone, Default)]
pub struct StateMap {
    values: Rc<RefCell<HashMap<NodeId, Value>>>,
}

impl StateMap {
    pub fn new() -> StateMap {
        StateMap::default()
    }

    pub fn record(&self, id: NodeId, value: Value) {
        self.values.borrow_mut().insert(id, value);
    }

    pub fn get(&self, id: NodeId) -> Option<Value> {
        self.values.borrow().get(&id).cloned()
    }

    pub fn snapshot(&self) -> HashMap<NodeId, Value> {
        self.values.borrow().clone()
    }
}

/// A simple per-operation cost accumulator (§4.6): every builtin dispatch
/// counts for one unit, matching the teacher's flat per-instruction cost
/// model rather than a byte- or allocation-weighted one.
#[derive(Clone, Default)]
pub struct CostTracker {
    cost: Rc<RefCell<u64>>,
}

impl CostTracker {
    pub fn new() -> CostTracker {
        CostTracker::default()
    }

    pub fn charge(&self, amount: u64) {
        *self.cost.borrow_mut() += amount;
    }

    pub fn total(&self) -> u64 {
        *self.cost.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::factory::Factory;
    use crate::ast::Literal;
    use crate::env::{Env, EnvOption};
    use crate::eval::plan::plan;
    use crate::eval::stdlib::Stdlib;

    #[test]
    fn folds_constant_arithmetic_into_a_single_node() {
        let mut factory = Factory::new();
        let expr = factory.call(
            "+",
            None,
            vec![factory.literal(Literal::Int(1)), factory.literal(Literal::Int(2))],
        );
        let env = Env::with_options("", vec![EnvOption::Library(Box::new(Stdlib))]);
        let (checked, _diagnostics) = crate::checker::check(&env, expr);
        let interpretable = plan(&env, &checked.unwrap()).unwrap();
        let folded = fold_constants(interpretable);
        assert!(matches!(folded, Interpretable::Constant { value: Value::Int(3), .. }));
    }

    #[test]
    fn state_map_records_and_reads_back() {
        let state = StateMap::new();
        state.record(NodeId(1), Value::Int(7));
        assert_eq!(state.get(NodeId(1)), Some(Value::Int(7)));
        assert_eq!(state.get(NodeId(2)), None);
    }

    #[test]
    fn cost_tracker_accumulates() {
        let tracker = CostTracker::new();
        tracker.charge(2);
        tracker.charge(3);
        assert_eq!(tracker.total(), 5);
    }
}
