// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Semantic passes over a parsed CHTL [`Program`](chtl_ast::Program).
//!
//! ## Architecture
//!
//! - [`value`]: the [`Value`] type and its unit arithmetic
//! - [`eval`]: [`EvalContext`] bindings and the tree-walking [`Evaluator`]
//! - [`validate`]: the `except` constraint [`Validator`]
//! - [`error`]: [`EvalError`]
//!
//! Both passes only read the program. Evaluation failures are returned as
//! values so the caller decides whether to abort.
//!
//! # Examples
//!
//! ```
//! use chtl_parser::parse_str;
//! use chtl_resolve::{EvalContext, Value};
//!
//! let program = parse_str("[Template] @Var Sizes { gap: 4px * 2; }");
//! let expr = chtl_ast::Expr::new(
//!     chtl_ast::ExprKind::VariableAccess {
//!         template: "Sizes".into(),
//!         variable: "gap".into(),
//!     },
//!     chtl_ast::Span::zero(0),
//! );
//! let value = EvalContext::new(&program).eval(&expr).unwrap();
//! assert_eq!(value, Value::number(8.0, "px"));
//! ```

pub mod error;
pub mod eval;
pub mod validate;
pub mod value;

pub use error::EvalError;
pub use eval::{EvalContext, Evaluator, DEFAULT_EVAL_DEPTH};
pub use validate::{validate, Validator};
pub use value::{format_number, Value};
