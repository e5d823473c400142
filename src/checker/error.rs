use std::{error::Error, fmt::Display};

use crate::ids::NodeId;
use crate::lexer::Span;
use crate::value::types::Type;

/// §4.4's diagnostic severities. An error-severity diagnostic anywhere in a
/// run means the checker yields no checked AST.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub node: NodeId,
    pub span: Option<Span>,
    pub error: TypeCheckError,
}

impl Diagnostic {
    pub fn error(node: NodeId, span: Option<Span>, error: TypeCheckError) -> Diagnostic {
        Diagnostic {
            severity: Severity::Error,
            node,
            span,
            error,
        }
    }

    pub fn warning(node: NodeId, span: Option<Span>, error: TypeCheckError) -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            node,
            span,
            error,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.span {
            Some(span) => f.write_str(&span.to_string(self.error.clone())),
            None => write!(f, "{}", self.error),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeCheckError {
    TypeMismatch(TypeMismatch),
    UndefinedVariable(UndefinedVariable),
    UndefinedFunction(UndefinedFunction),
    UndefinedType(UndefinedType),
    NoMatchingOverload(NoMatchingOverload),
    AmbiguousOverload(AmbiguousOverload),
    HeterogeneousLiteral(HeterogeneousLiteral),
    InvalidComprehension(InvalidComprehension),
}

impl Display for TypeCheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeCheckError::TypeMismatch(e) => write!(f, "{e}"),
            TypeCheckError::UndefinedVariable(e) => write!(f, "{e}"),
            TypeCheckError::UndefinedFunction(e) => write!(f, "{e}"),
            TypeCheckError::UndefinedType(e) => write!(f, "{e}"),
            TypeCheckError::NoMatchingOverload(e) => write!(f, "{e}"),
            TypeCheckError::AmbiguousOverload(e) => write!(f, "{e}"),
            TypeCheckError::HeterogeneousLiteral(e) => write!(f, "{e}"),
            TypeCheckError::InvalidComprehension(e) => write!(f, "{e}"),
        }
    }
}

impl Error for TypeCheckError {}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeMismatch {
    pub expected: Type,
    pub actual: Type,
}

impl Display for TypeMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "expected type '{}' but got '{}'", self.expected, self.actual)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UndefinedVariable {
    pub name: String,
}

impl Display for UndefinedVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "undeclared reference to '{}'", self.name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UndefinedFunction {
    pub name: String,
}

impl Display for UndefinedFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "undeclared function '{}'", self.name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UndefinedType {
    pub name: String,
}

impl Display for UndefinedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "undefined type '{}'", self.name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NoMatchingOverload {
    pub function: String,
    pub argument_types: Vec<Type>,
}

impl Display for NoMatchingOverload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let args = self
            .argument_types
            .iter()
            .map(Type::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "no matching overload for '{}({args})'", self.function)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AmbiguousOverload {
    pub function: String,
    pub candidate_count: usize,
}

impl Display for AmbiguousOverload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} overloads of '{}' are viable; result type widened to their least upper bound",
            self.candidate_count, self.function
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeterogeneousLiteral {
    pub kind: &'static str,
}

impl Display for HeterogeneousLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "heterogeneous {} literal under homogeneous-aggregate mode", self.kind)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InvalidComprehension {
    pub reason: String,
}

impl Display for InvalidComprehension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid comprehension: {}", self.reason)
    }
}
