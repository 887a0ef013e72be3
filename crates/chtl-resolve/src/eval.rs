//! Expression evaluation.

use crate::error::EvalError;
use crate::value::Value;
use chtl_ast::{DefCategory, Definition, Expr, ExprKind, Node, NodeRef, Program, GLOBAL_NAMESPACE};
use std::collections::HashMap;
use tracing::trace;

/// Default limit for nested variable references and expression depth.
pub const DEFAULT_EVAL_DEPTH: usize = 256;

/// Binding environment for one evaluation scope.
///
/// Created fresh for every element (and every collected style rule) by the
/// generator and dropped afterwards; nothing in it outlives the pass.
#[derive(Debug, Clone)]
pub struct EvalContext<'p> {
    program: &'p Program,
    namespace: String,
    bindings: HashMap<String, Value>,
    max_depth: usize,
}

impl<'p> EvalContext<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            namespace: GLOBAL_NAMESPACE.to_string(),
            bindings: HashMap::new(),
            max_depth: DEFAULT_EVAL_DEPTH,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Evaluate `expr` in this context.
    pub fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        Evaluator::new(self).eval(expr)
    }
}

/// Tree-walking evaluator over one [`EvalContext`].
pub struct Evaluator<'c, 'p> {
    ctx: &'c EvalContext<'p>,
    depth: usize,
}

impl<'c, 'p> Evaluator<'c, 'p> {
    pub fn new(ctx: &'c EvalContext<'p>) -> Self {
        Self { ctx, depth: 0 }
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        if self.depth >= self.ctx.max_depth {
            return Err(EvalError::DepthLimit {
                limit: self.ctx.max_depth,
            });
        }
        self.depth += 1;
        let result = self.eval_inner(expr);
        self.depth -= 1;
        result
    }

    fn eval_inner(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match &expr.kind {
            ExprKind::Number { value, unit } => Ok(Value::number(*value, unit.clone())),
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Ident(name) => Ok(self
                .ctx
                .lookup(name)
                .cloned()
                .unwrap_or_else(|| Value::Str(name.clone()))),
            ExprKind::Unary { op, operand } => self.eval(operand)?.unary(*op),
            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                left.binary(*op, &right)
            }
            ExprKind::Conditional {
                condition,
                consequence,
                alternative,
            } => {
                let condition = self.eval(condition)?;
                match condition.as_bool() {
                    Some(true) => self.eval(consequence),
                    Some(false) => self.eval(alternative),
                    None => Err(EvalError::NonBooleanCondition {
                        found: condition.type_name(),
                    }),
                }
            }
            ExprKind::VariableAccess { template, variable } => {
                self.eval_variable(template, variable)
            }
            ExprKind::Sequence(terms) => self.eval_joined(terms, " "),
            ExprKind::List(items) => self.eval_joined(items, ", "),
        }
    }

    fn eval_joined(&mut self, exprs: &[Expr], separator: &str) -> Result<Value, EvalError> {
        let mut parts = Vec::with_capacity(exprs.len());
        for expr in exprs {
            parts.push(self.eval(expr)?.to_string());
        }
        Ok(Value::Str(parts.join(separator)))
    }

    /// `Template(Var)`: the last definition of `Var` on the template,
    /// looking through inherited templates.
    fn eval_variable(&mut self, template: &str, variable: &str) -> Result<Value, EvalError> {
        let program = self.ctx.program;
        let namespace = self.ctx.namespace();
        let (def_ref, def) = program
            .lookup(DefCategory::Template, namespace, template)
            .or_else(|| program.lookup(DefCategory::Custom, namespace, template))
            .ok_or_else(|| EvalError::UndefinedTemplate {
                name: template.to_string(),
            })?;

        trace!(template, variable, "variable access");
        match self.find_property(def_ref, def, variable, 0)? {
            Some(expr) => self.eval(expr),
            None => Err(EvalError::UndefinedVariable {
                template: template.to_string(),
                variable: variable.to_string(),
            }),
        }
    }

    /// Own properties win over inherited ones; among inherited definitions
    /// the last one listed wins.
    fn find_property(
        &self,
        at: NodeRef,
        def: &'p Definition,
        name: &str,
        depth: usize,
    ) -> Result<Option<&'p Expr>, EvalError> {
        if depth >= self.ctx.max_depth {
            return Err(EvalError::DepthLimit {
                limit: self.ctx.max_depth,
            });
        }
        let program = self.ctx.program;
        let nodes = || def.body.iter().rev().filter_map(|id| program.node(at.with_node(*id)));

        let own = nodes().find_map(|node| match node {
            Node::StyleProperty(prop) if prop.name == name => prop.value.as_ref(),
            _ => None,
        });
        if own.is_some() {
            return Ok(own);
        }

        for node in nodes() {
            let parent = match node {
                Node::TemplateUsage(usage) => {
                    let namespace = usage.namespace.as_deref().unwrap_or(self.ctx.namespace());
                    program
                        .lookup(DefCategory::Template, namespace, &usage.name)
                        .or_else(|| program.lookup(DefCategory::Custom, namespace, &usage.name))
                }
                Node::CustomUsage(custom) => {
                    let usage = &custom.usage;
                    let namespace = usage.namespace.as_deref().unwrap_or(self.ctx.namespace());
                    program.lookup(DefCategory::Custom, namespace, &usage.name)
                }
                _ => None,
            };
            if let Some((parent_ref, parent)) = parent {
                if let Some(found) = self.find_property(parent_ref, parent, name, depth + 1)? {
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chtl_ast::{BinaryOp, Span};
    use chtl_parser::parse_str;

    fn num(value: f64, unit: &str) -> Expr {
        Expr::new(
            ExprKind::Number {
                value,
                unit: unit.into(),
            },
            Span::zero(0),
        )
    }

    fn ident(name: &str) -> Expr {
        Expr::new(ExprKind::Ident(name.into()), Span::zero(0))
    }

    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            Span::zero(0),
        )
    }

    fn conditional(condition: Expr, consequence: Expr, alternative: Expr) -> Expr {
        Expr::new(
            ExprKind::Conditional {
                condition: Box::new(condition),
                consequence: Box::new(consequence),
                alternative: Box::new(alternative),
            },
            Span::zero(0),
        )
    }

    fn access(template: &str, variable: &str) -> Expr {
        Expr::new(
            ExprKind::VariableAccess {
                template: template.into(),
                variable: variable.into(),
            },
            Span::zero(0),
        )
    }

    #[test]
    fn test_untaken_branch_is_not_evaluated() {
        let program = Program::default();
        let ctx = EvalContext::new(&program);
        let expr = conditional(
            binary(BinaryOp::Gt, num(1.0, ""), num(0.0, "")),
            Expr::new(ExprKind::Str("a".into()), Span::zero(0)),
            access("Missing", "nope"),
        );
        assert_eq!(ctx.eval(&expr).unwrap(), Value::Str("a".into()));
    }

    #[test]
    fn test_non_boolean_condition() {
        let program = Program::default();
        let ctx = EvalContext::new(&program);
        let expr = conditional(num(1.0, ""), ident("a"), ident("b"));
        assert_eq!(
            ctx.eval(&expr).unwrap_err(),
            EvalError::NonBooleanCondition { found: "number" }
        );
    }

    #[test]
    fn test_identifier_bindings_fall_back_to_text() {
        let program = Program::default();
        let mut ctx = EvalContext::new(&program);
        ctx.bind("gap", Value::number(8.0, "px"));
        assert_eq!(ctx.eval(&ident("gap")).unwrap(), Value::number(8.0, "px"));
        assert_eq!(ctx.eval(&ident("red")).unwrap(), Value::Str("red".into()));
        let doubled = binary(BinaryOp::Mul, ident("gap"), num(2.0, ""));
        assert_eq!(ctx.eval(&doubled).unwrap(), Value::number(16.0, "px"));
    }

    #[test]
    fn test_variable_access_prefers_namespace() {
        let program = parse_str(
            "[Template] @Var Theme { color: red; }\n\
             [Namespace] N { [Template] @Var Theme { color: blue; } }",
        );
        assert!(program.diagnostics.is_empty(), "{:?}", program.diagnostics);

        let in_ns = EvalContext::new(&program).with_namespace("N");
        assert_eq!(
            in_ns.eval(&access("Theme", "color")).unwrap(),
            Value::Str("blue".into())
        );
        let global = EvalContext::new(&program);
        assert_eq!(
            global.eval(&access("Theme", "color")).unwrap(),
            Value::Str("red".into())
        );
        let elsewhere = EvalContext::new(&program).with_namespace("other");
        assert_eq!(
            elsewhere.eval(&access("Theme", "color")).unwrap(),
            Value::Str("red".into())
        );
    }

    #[test]
    fn test_variable_access_through_inheritance() {
        let program = parse_str(
            "[Template] @Var Base { size: 10px; color: red; }\n\
             [Template] @Var Theme { @Var Base; color: blue; }",
        );
        let ctx = EvalContext::new(&program);
        assert_eq!(
            ctx.eval(&access("Theme", "size")).unwrap(),
            Value::number(10.0, "px")
        );
        assert_eq!(
            ctx.eval(&access("Theme", "color")).unwrap(),
            Value::Str("blue".into())
        );
    }

    #[test]
    fn test_variable_access_evaluates_expression() {
        let program = parse_str("[Template] @Var Sizes { base: 8px; large: 8px * 3; }");
        let ctx = EvalContext::new(&program);
        assert_eq!(
            ctx.eval(&access("Sizes", "large")).unwrap(),
            Value::number(24.0, "px")
        );
    }

    #[test]
    fn test_missing_template_and_variable_are_distinct() {
        let program = parse_str("[Template] @Var Theme { color: red; }");
        let ctx = EvalContext::new(&program);
        assert_eq!(
            ctx.eval(&access("Nope", "color")).unwrap_err(),
            EvalError::UndefinedTemplate {
                name: "Nope".into()
            }
        );
        assert_eq!(
            ctx.eval(&access("Theme", "size")).unwrap_err(),
            EvalError::UndefinedVariable {
                template: "Theme".into(),
                variable: "size".into()
            }
        );
    }

    #[test]
    fn test_self_reference_hits_depth_limit() {
        let program = parse_str("[Template] @Var Loop { a: Loop(a); }");
        let ctx = EvalContext::new(&program).with_max_depth(16);
        assert_eq!(
            ctx.eval(&access("Loop", "a")).unwrap_err(),
            EvalError::DepthLimit { limit: 16 }
        );
    }

    #[test]
    fn test_sequences_and_lists_join() {
        let program = Program::default();
        let ctx = EvalContext::new(&program);
        let seq = Expr::new(
            ExprKind::Sequence(vec![num(1.0, "px"), ident("solid"), ident("red")]),
            Span::zero(0),
        );
        assert_eq!(ctx.eval(&seq).unwrap(), Value::Str("1px solid red".into()));
        let list = Expr::new(
            ExprKind::List(vec![
                Expr::new(ExprKind::Str("Arial".into()), Span::zero(0)),
                ident("sans-serif"),
            ]),
            Span::zero(0),
        );
        assert_eq!(ctx.eval(&list).unwrap(), Value::Str("Arial, sans-serif".into()));
    }
}
