//! Evaluation errors.

use chtl_ast::{BinaryOp, CompileError, ErrorKind, Span};

/// Failure while reducing an expression to a [`Value`](crate::Value).
///
/// Every variant is fatal for the generation pass that hit it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// Operand units cannot be combined by the operator.
    #[error("cannot {} '{left}' and '{right}'", .op.verb())]
    UnitMismatch {
        op: BinaryOp,
        /// Unit of the left operand, empty for unitless
        left: String,
        /// Unit of the right operand, empty for unitless
        right: String,
    },

    /// `/` or `%` with a zero divisor, whatever the units.
    #[error("divisor is zero")]
    DivisionByZero,

    /// `Template(Var)` named a template without that property.
    #[error("template '{template}' has no variable '{variable}'")]
    UndefinedVariable { template: String, variable: String },

    /// `Template(Var)` or a usage named a template that is not registered.
    #[error("undefined template '{name}'")]
    UndefinedTemplate { name: String },

    /// A conditional's condition evaluated to something other than a boolean.
    #[error("condition must be a boolean, got {found}")]
    NonBooleanCondition { found: &'static str },

    /// Operator applied to operand types it does not support.
    #[error("cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: String,
        left: &'static str,
        right: &'static str,
    },

    /// Variable references nested beyond the configured limit.
    #[error("evaluation nesting exceeds the limit of {limit} levels")]
    DepthLimit { limit: usize },
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::UnitMismatch { .. } => ErrorKind::UnitMismatch,
            EvalError::DivisionByZero => ErrorKind::DivisionByZero,
            EvalError::UndefinedVariable { .. } => ErrorKind::UndefinedVariable,
            EvalError::UndefinedTemplate { .. } => ErrorKind::UndefinedTemplate,
            EvalError::NonBooleanCondition { .. } => ErrorKind::NonBooleanCondition,
            EvalError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            EvalError::DepthLimit { .. } => ErrorKind::DepthLimit,
        }
    }

    /// Attach a location.
    pub fn into_diagnostic(self, span: Span) -> CompileError {
        CompileError::new(self.kind(), span, self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_operator_and_units() {
        let err = EvalError::UnitMismatch {
            op: BinaryOp::Add,
            left: "px".into(),
            right: "em".into(),
        };
        assert_eq!(err.to_string(), "cannot add 'px' and 'em'");
        assert_eq!(err.kind(), ErrorKind::UnitMismatch);
    }

    #[test]
    fn test_into_diagnostic() {
        let diag = EvalError::DivisionByZero.into_diagnostic(Span::new(0, 3, 9, 2));
        assert_eq!(diag.kind, ErrorKind::DivisionByZero);
        assert_eq!(diag.span.start, 3);
        assert_eq!(diag.message, "divisor is zero");
        assert_eq!(diag.to_string(), "error: division by zero: divisor is zero");
    }
}
