//! Runtime values and unit arithmetic.
//!
//! # Unit rules
//!
//! | operator  | accepted units                         | result unit        |
//! |-----------|----------------------------------------|--------------------|
//! | `+` `-`   | equal, or one side unitless            | the non-empty unit |
//! | `*`       | at least one side unitless             | the other side's   |
//! | `/`       | divisor unitless or same unit          | dividend's / none  |
//! | `%`       | divisor unitless or same unit          | dividend's         |
//! | `**`      | exponent unitless                      | base's             |
//! | `>` `<`   | as for `+`                             | boolean            |
//!
//! A zero divisor is `DivisionByZero` before units are looked at.

use crate::error::EvalError;
use chtl_ast::{BinaryOp, UnaryOp};
use serde::Serialize;
use std::fmt;

/// Largest magnitude printed through the integer path.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Fractional digits kept when printing non-integral numbers.
const FRACTION_DIGITS: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Empty,
    Number { value: f64, unit: String },
    Str(String),
    Bool(bool),
}

impl Value {
    pub fn number(value: f64, unit: impl Into<String>) -> Self {
        Value::Number {
            value,
            unit: unit.into(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Number { .. } => "number",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Apply a binary operator.
    pub fn binary(&self, op: BinaryOp, rhs: &Value) -> Result<Value, EvalError> {
        let (Value::Number { value: a, unit: ua }, Value::Number { value: b, unit: ub }) =
            (self, rhs)
        else {
            return Err(EvalError::TypeMismatch {
                op: op.symbol().to_string(),
                left: self.type_name(),
                right: rhs.type_name(),
            });
        };
        let (a, b) = (*a, *b);
        let mismatch = || EvalError::UnitMismatch {
            op,
            left: ua.clone(),
            right: ub.clone(),
        };

        match op {
            BinaryOp::Add | BinaryOp::Sub => {
                let unit = common_unit(ua, ub).ok_or_else(mismatch)?;
                let value = if op == BinaryOp::Add { a + b } else { a - b };
                Ok(Value::number(value, unit))
            }
            BinaryOp::Mul => {
                let unit = match (ua.is_empty(), ub.is_empty()) {
                    (true, _) => ub.clone(),
                    (false, true) => ua.clone(),
                    (false, false) => return Err(mismatch()),
                };
                Ok(Value::number(a * b, unit))
            }
            BinaryOp::Div | BinaryOp::Rem => {
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                if !ub.is_empty() && ub != ua {
                    return Err(mismatch());
                }
                if op == BinaryOp::Rem {
                    return Ok(Value::number(a % b, ua.clone()));
                }
                let unit = if ub.is_empty() { ua.clone() } else { String::new() };
                Ok(Value::number(a / b, unit))
            }
            BinaryOp::Pow => {
                if !ub.is_empty() {
                    return Err(mismatch());
                }
                Ok(Value::number(a.powf(b), ua.clone()))
            }
            // Magnitudes only; units are not converted.
            BinaryOp::Gt | BinaryOp::Lt => {
                Ok(Value::Bool(if op == BinaryOp::Gt { a > b } else { a < b }))
            }
        }
    }

    /// Apply a unary operator.
    pub fn unary(&self, op: UnaryOp) -> Result<Value, EvalError> {
        match (op, self) {
            (UnaryOp::Neg, Value::Number { value, unit }) => Ok(Value::number(-value, unit.clone())),
            (UnaryOp::Neg, other) => Err(EvalError::TypeMismatch {
                op: "-".to_string(),
                left: "nothing",
                right: other.type_name(),
            }),
        }
    }
}

/// Unit shared by both operands of an additive operation.
fn common_unit(a: &str, b: &str) -> Option<String> {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => Some(b.to_string()),
        (false, true) => Some(a.to_string()),
        (false, false) if a == b => Some(a.to_string()),
        _ => None,
    }
}

/// Print a magnitude: integers without a fraction, anything else with at
/// most six fractional digits and no trailing zeros.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        // Also folds -0 into 0.
        return format!("{}", value as i64);
    }
    let text = format!("{:.*}", FRACTION_DIGITS, value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        return "0".to_string();
    }
    text.to_string()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Number { value, unit } => write!(f, "{}{}", format_number(*value), unit),
            Value::Str(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(value: f64, unit: &str) -> Value {
        Value::number(value, unit)
    }

    fn parts(value: &Value) -> (f64, &str) {
        match value {
            Value::Number { value, unit } => (*value, unit.as_str()),
            other => panic!("expected number, got {:?}", other),
        }
    }

    #[test]
    fn test_add_then_subtract_restores_value() {
        for (a, b) in [(n(100.0, "px"), n(50.0, "px")), (n(3.5, "em"), n(2.0, ""))] {
            let sum = a.binary(BinaryOp::Add, &b).unwrap();
            let back = sum.binary(BinaryOp::Sub, &b).unwrap();
            let (value, unit) = parts(&back);
            assert!((value - parts(&a).0).abs() < 1e-9);
            assert_eq!(unit, parts(&a).1);
        }
    }

    #[test]
    fn test_unitless_adopts_other_unit() {
        let result = n(10.0, "").binary(BinaryOp::Add, &n(5.0, "px")).unwrap();
        assert_eq!(result, n(15.0, "px"));
    }

    #[test]
    fn test_add_distinct_units_fails() {
        let err = n(1.0, "px").binary(BinaryOp::Add, &n(1.0, "em")).unwrap_err();
        assert!(matches!(err, EvalError::UnitMismatch { op: BinaryOp::Add, .. }));
    }

    #[test]
    fn test_multiply_commutes_with_unitless_side() {
        let a = n(4.0, "px");
        let b = n(2.5, "");
        assert_eq!(
            a.binary(BinaryOp::Mul, &b).unwrap(),
            b.binary(BinaryOp::Mul, &a).unwrap()
        );
        assert_eq!(a.binary(BinaryOp::Mul, &b).unwrap(), n(10.0, "px"));
    }

    #[test]
    fn test_multiply_two_units_fails() {
        for (ua, ub) in [("px", "em"), ("px", "px")] {
            let err = n(2.0, ua).binary(BinaryOp::Mul, &n(3.0, ub)).unwrap_err();
            assert!(matches!(err, EvalError::UnitMismatch { .. }), "{} * {}", ua, ub);
        }
    }

    #[test]
    fn test_division_units() {
        assert_eq!(
            n(100.0, "px").binary(BinaryOp::Div, &n(4.0, "px")).unwrap(),
            n(25.0, "")
        );
        assert_eq!(
            n(100.0, "px").binary(BinaryOp::Div, &n(4.0, "")).unwrap(),
            n(25.0, "px")
        );
        assert!(matches!(
            n(100.0, "px").binary(BinaryOp::Div, &n(4.0, "em")),
            Err(EvalError::UnitMismatch { .. })
        ));
        assert!(matches!(
            n(100.0, "").binary(BinaryOp::Div, &n(4.0, "em")),
            Err(EvalError::UnitMismatch { .. })
        ));
    }

    #[test]
    fn test_division_by_zero_ignores_units() {
        for (ua, ub) in [("", ""), ("px", "px"), ("px", "em"), ("", "px")] {
            let err = n(1.0, ua).binary(BinaryOp::Div, &n(0.0, ub)).unwrap_err();
            assert_eq!(err, EvalError::DivisionByZero, "{} / {}", ua, ub);
        }
        assert_eq!(
            n(1.0, "px").binary(BinaryOp::Rem, &n(0.0, "")).unwrap_err(),
            EvalError::DivisionByZero
        );
    }

    #[test]
    fn test_remainder_and_power() {
        assert_eq!(
            n(10.0, "px").binary(BinaryOp::Rem, &n(3.0, "")).unwrap(),
            n(1.0, "px")
        );
        assert_eq!(
            n(2.0, "px").binary(BinaryOp::Pow, &n(3.0, "")).unwrap(),
            n(8.0, "px")
        );
        assert!(n(2.0, "").binary(BinaryOp::Pow, &n(3.0, "px")).is_err());
    }

    #[test]
    fn test_comparison() {
        assert_eq!(
            n(1.0, "").binary(BinaryOp::Gt, &n(0.0, "")).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            n(10.0, "px").binary(BinaryOp::Lt, &n(5.0, "px")).unwrap(),
            Value::Bool(false)
        );
        let err = Value::Str("a".into())
            .binary(BinaryOp::Gt, &n(1.0, ""))
            .unwrap_err();
        assert_eq!(
            err,
            EvalError::TypeMismatch {
                op: ">".into(),
                left: "string",
                right: "number"
            }
        );
    }

    #[test]
    fn test_compare_distinct_units() {
        assert_eq!(
            n(10.0, "px").binary(BinaryOp::Gt, &n(5.0, "em")).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            n(10.0, "px").binary(BinaryOp::Lt, &n(5.0, "")).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_negation() {
        assert_eq!(n(5.0, "px").unary(UnaryOp::Neg).unwrap(), n(-5.0, "px"));
        assert!(Value::Bool(true).unary(UnaryOp::Neg).is_err());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(150.0), "150");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(1.0 / 3.0), "0.333333");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(-2.25), "-2.25");
        assert_eq!(format_number(-0.0000001), "0");
    }

    #[test]
    fn test_display() {
        assert_eq!(n(150.0, "px").to_string(), "150px");
        assert_eq!(n(33.5, "%").to_string(), "33.5%");
        assert_eq!(Value::Str("red".into()).to_string(), "red");
        assert_eq!(Value::Empty.to_string(), "");
        assert_eq!(Value::Bool(false).to_string(), "false");
    }
}
