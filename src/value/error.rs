//! Runtime error kinds produced by value operations (§7: the *runtime*
//! error category). Modeled the same way as the checker's `TypeCheckError`:
//! a flat enum of named kinds, each carrying its own payload, with a
//! hand-written `Display` rather than a derive macro.
use std::{error::Error, fmt::Display, sync::Arc};

use super::types::Type;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValueError {
    pub kind: ErrorKind,
    pub message: String,
    pub cause: Option<Arc<ValueError>>,
}

impl ValueError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> ValueError {
        ValueError {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn caused_by(kind: ErrorKind, message: impl Into<String>, cause: ValueError) -> ValueError {
        ValueError {
            kind,
            message: message.into(),
            cause: Some(Arc::new(cause)),
        }
    }

    pub fn no_such_overload(function: &str) -> ValueError {
        ValueError::new(
            ErrorKind::NoSuchOverload,
            format!("no matching overload for '{function}'"),
        )
    }

    pub fn no_such_attribute(name: &str) -> ValueError {
        ValueError::new(
            ErrorKind::NoSuchAttribute,
            format!("no such attribute '{name}'"),
        )
    }

    pub fn no_such_key(key: impl Display) -> ValueError {
        ValueError::new(ErrorKind::NoSuchKey, format!("no such key: {key}"))
    }

    pub fn no_such_field(name: &str) -> ValueError {
        ValueError::new(ErrorKind::NoSuchField, format!("no such field '{name}'"))
    }

    pub fn division_by_zero() -> ValueError {
        ValueError::new(ErrorKind::DivisionByZero, "division by zero")
    }

    pub fn integer_overflow() -> ValueError {
        ValueError::new(ErrorKind::IntegerOverflow, "integer overflow")
    }

    pub fn incomparable(a: &Type, b: &Type) -> ValueError {
        ValueError::new(
            ErrorKind::IncomparableTypes,
            format!("incomparable types: {a} and {b}"),
        )
    }

    pub fn conversion_failure(from: &Type, to: &Type) -> ValueError {
        ValueError::new(
            ErrorKind::ConversionFailure,
            format!("cannot convert {from} to {to}"),
        )
    }

    pub fn range(message: impl Into<String>) -> ValueError {
        ValueError::new(ErrorKind::RangeError, message)
    }

    pub fn invalid_regex(pattern: &str) -> ValueError {
        ValueError::new(ErrorKind::InvalidRegex, format!("invalid regex: {pattern}"))
    }

    pub fn policy(message: impl Into<String>) -> ValueError {
        ValueError::new(ErrorKind::Policy, message)
    }
}

/// Runtime error categories from §7. Parse/check/plan errors are a
/// different, pipeline-aborting family (see `checker::error` /
/// `eval::PlanError`); these are the ones that flow through evaluation as
/// `Value::Error`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    NoSuchOverload,
    NoSuchAttribute,
    NoSuchKey,
    NoSuchField,
    DivisionByZero,
    IntegerOverflow,
    IncomparableTypes,
    ConversionFailure,
    RangeError,
    InvalidRegex,
    /// User-facing messages surfaced by extension function bindings.
    Policy,
}

impl Display for ValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl Error for ValueError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_cause_chain() {
        let inner = ValueError::division_by_zero();
        let outer = ValueError::caused_by(ErrorKind::Policy, "evaluation failed", inner);
        assert_eq!(outer.to_string(), "evaluation failed: division by zero");
    }
}
