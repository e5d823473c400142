//! The evaluation pipeline (§4.5/§6.2): activations, the planned
//! `Interpretable` tree, the planner that produces one from a `CheckedAst`,
//! optional decorators, and the core operator dispatch table. Ties the
//! compile/plan/evaluate boundary together as a `Program` that can be
//! evaluated repeatedly against different activations without re-planning.
pub mod activation;
pub mod builtins;
pub mod decorators;
pub mod interpretable;
pub mod plan;
pub mod stdlib;

use crate::checker::checked_ast::CheckedAst;
use crate::env::Env;

pub use activation::{Activation, BindingsActivation, HierarchicalActivation};
pub use decorators::{CostTracker, StateMap};
pub use interpretable::Interpretable;
pub use plan::PlanError;
pub use stdlib::Stdlib;

use crate::value::Value;

/// Planner options (§6.2): which decorators to run after planning.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlanOptions {
    pub fold_constants: bool,
}

/// A planned, ready-to-run program. Produced once from a `CheckedAst` via
/// [`Program::plan`] and evaluated as many times as needed against
/// different activations — the planning cost (overload resolution,
/// constant folding) isn't repeated per evaluation.
pub struct Program {
    root: Interpretable,
}

impl Program {
    pub fn plan(env: &Env, checked: &CheckedAst, options: PlanOptions) -> Result<Program, PlanError> {
        let mut root = plan::plan(env, checked)?;
        if options.fold_constants {
            root = decorators::fold_constants(root);
        }
        Ok(Program { root })
    }

    pub fn evaluate(&self, activation: &dyn Activation) -> Value {
        self.root.eval(activation)
    }

    /// Evaluate while recording the value produced at every node id in the
    /// tree, for callers that want the §4.6 per-node state map alongside the
    /// result. Does not change the evaluated result.
    pub fn evaluate_with_state(&self, activation: &dyn Activation) -> (Value, StateMap) {
        let state = StateMap::new();
        let result = self.root.eval_with(activation, Some(&state), None);
        (result, state)
    }

    /// Evaluate while charging `cost` one unit per builtin call dispatched
    /// (§4.6's flat per-instruction cost model). Does not change the
    /// evaluated result.
    pub fn evaluate_with_cost(&self, activation: &dyn Activation) -> (Value, CostTracker) {
        let cost = CostTracker::new();
        let result = self.root.eval_with(activation, None, Some(&cost));
        (result, cost)
    }

    /// Evaluate with both the per-node state map and the cost accumulator
    /// wired through a single pass.
    pub fn evaluate_with_observability(&self, activation: &dyn Activation) -> (Value, StateMap, CostTracker) {
        let state = StateMap::new();
        let cost = CostTracker::new();
        let result = self.root.eval_with(activation, Some(&state), Some(&cost));
        (result, state, cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::factory::Factory;
    use crate::ast::Literal;
    use crate::env::EnvOption;

    #[test]
    fn plans_and_evaluates_a_simple_program() {
        let mut factory = Factory::new();
        let expr = factory.call(
            "+",
            None,
            vec![factory.literal(Literal::Int(1)), factory.literal(Literal::Int(2))],
        );
        let env = Env::with_options("", vec![EnvOption::Library(Box::new(Stdlib))]);
        let (checked, diagnostics) = crate::checker::check(&env, expr);
        assert!(diagnostics.is_empty());
        let program = Program::plan(&env, &checked.unwrap(), PlanOptions { fold_constants: true }).unwrap();
        let activation = BindingsActivation::new();
        assert_eq!(program.evaluate(&activation), Value::Int(3));
    }

    #[test]
    fn evaluate_with_state_records_every_node_not_just_the_root() {
        let mut factory = Factory::new();
        let lhs = factory.literal(Literal::Int(1));
        let lhs_id = lhs.id;
        let rhs = factory.literal(Literal::Int(2));
        let rhs_id = rhs.id;
        let expr = factory.call("+", None, vec![lhs, rhs]);
        let env = Env::with_options("", vec![EnvOption::Library(Box::new(Stdlib))]);
        let (checked, diagnostics) = crate::checker::check(&env, expr);
        assert!(diagnostics.is_empty());
        // Disable constant folding so the leaves stay distinct `Constant`
        // nodes and their ids actually show up in the state map.
        let program = Program::plan(&env, &checked.unwrap(), PlanOptions { fold_constants: false }).unwrap();
        let activation = BindingsActivation::new();
        let (result, state) = program.evaluate_with_state(&activation);
        assert_eq!(result, Value::Int(3));
        assert_eq!(state.get(lhs_id), Some(Value::Int(1)));
        assert_eq!(state.get(rhs_id), Some(Value::Int(2)));
    }

    #[test]
    fn evaluate_with_cost_charges_one_per_builtin_call() {
        let mut factory = Factory::new();
        let inner = factory.call(
            "+",
            None,
            vec![factory.literal(Literal::Int(1)), factory.literal(Literal::Int(2))],
        );
        let expr = factory.call("+", None, vec![inner, factory.literal(Literal::Int(3))]);
        let env = Env::with_options("", vec![EnvOption::Library(Box::new(Stdlib))]);
        let (checked, diagnostics) = crate::checker::check(&env, expr);
        assert!(diagnostics.is_empty());
        let program = Program::plan(&env, &checked.unwrap(), PlanOptions { fold_constants: false }).unwrap();
        let activation = BindingsActivation::new();
        let (result, cost) = program.evaluate_with_cost(&activation);
        assert_eq!(result, Value::Int(6));
        assert_eq!(cost.total(), 2);
    }
}
