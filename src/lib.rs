//! `cel-core`: AST, static type checker, runtime value system and
//! tree-walking evaluator for the Common Expression Language.
//!
//! The pipeline an embedder drives is: parse (external collaborator,
//! producing an [`ast::AstNode`] plus [`ast::SourceInfo`]) → [`macros::expand`]
//! → [`checker::check`] against an [`env::Env`] → [`eval::Program::plan`] →
//! [`eval::Program::evaluate`] against an [`eval::Activation`], repeated as
//! many times as needed without re-checking or re-planning.
pub mod ast;
pub mod checker;
pub mod env;
pub mod eval;
pub mod ids;
pub mod lexer;
pub mod macros;
pub mod value;

pub use ast::{AstNode, Expr};
pub use checker::checked_ast::CheckedAst;
pub use checker::check;
pub use env::{Env, EnvOption};
pub use eval::{Activation, BindingsActivation, PlanOptions, Program};
pub use ids::NodeId;
pub use value::Value;
