//! Abstract syntax tree for CHTL documents.
//!
//! ## Architecture
//!
//! - [`arena`] - per-file node arena (`Ast`, `NodeId`, `NodeRef`)
//! - [`node`] - statement-level node kinds
//! - [`expr`] - property value expressions
//! - [`registry`] - namespace-keyed template/custom tables
//! - [`program`] - the compilation root tying them together

pub mod arena;
pub mod expr;
pub mod node;
pub mod program;
pub mod registry;

pub use arena::{Ast, NodeId, NodeRef};
pub use expr::{BinaryOp, Expr, ExprKind, UnaryOp};
pub use node::{
    Attribute, Constraint, CustomUsage, DefCategory, DefKind, Definition, Element, IfBranch,
    IfChain, Import, Insert, InsertPosition, Namespace, Node, Origin, OriginKind, Selector,
    StyleProperty, StyleRule, Usage,
};
pub use program::{Program, Settings};
pub use registry::{Registry, GLOBAL_NAMESPACE};
