//! Condition evaluation.
//!
//! Evaluates one [`ConditionSpec`] against the current string value of a
//! form control. Evaluation never fails: malformed operands and unknown
//! condition kinds evaluate to `false`.
//!
//! Comparison follows form-value semantics rather than strict typing:
//! - `equals` is loose (`"5"` equals `5`, `"1"` equals `true`)
//! - `greater_than` / `less_than` parse the leading numeric prefix of each
//!   operand (`"10px"` is 10) and are `false` when either side is not a number
//! - `in` / `not_in` use exact string membership

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::schema::{ConditionKind, ConditionSpec};

lazy_static! {
    /// A complete decimal literal, as accepted for numeric conversion.
    static ref DECIMAL_LITERAL: Regex = Regex::new(
        r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$"
    ).unwrap();

    /// Leading numeric prefix, as accepted by float prefix parsing.
    static ref NUMERIC_PREFIX: Regex = Regex::new(
        r"^[+-]?(?:Infinity|(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)"
    ).unwrap();
}

/// Evaluate `spec` against the current value of its controlling field.
pub fn evaluate(current: &str, spec: &ConditionSpec) -> bool {
    match &spec.condition {
        ConditionKind::Equals => matches_loosely(current, spec.value.as_ref()),
        ConditionKind::NotEquals => !matches_loosely(current, spec.value.as_ref()),
        ConditionKind::Contains => spec
            .value
            .as_ref()
            .is_some_and(|v| current.contains(&to_js_string(v))),
        ConditionKind::GreaterThan => {
            let (lhs, rhs) = numeric_operands(current, spec.value.as_ref());
            lhs > rhs
        }
        ConditionKind::LessThan => {
            let (lhs, rhs) = numeric_operands(current, spec.value.as_ref());
            lhs < rhs
        }
        ConditionKind::In => spec
            .values
            .as_ref()
            .is_some_and(|values| contains_exact(values, current)),
        ConditionKind::NotIn => spec
            .values
            .as_ref()
            .is_some_and(|values| !contains_exact(values, current)),
        ConditionKind::Unrecognized(kind) => {
            tracing::debug!(condition = %kind, "unrecognized condition kind evaluates to false");
            false
        }
    }
}

/// Loose equality between a form value and a schema operand.
///
/// An absent or `null` operand never matches.
pub fn matches_loosely(current: &str, operand: Option<&Value>) -> bool {
    match operand {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => current == s,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| to_number(current) == n),
        Some(Value::Bool(b)) => to_number(current) == if *b { 1.0 } else { 0.0 },
        Some(other) => current == to_js_string(other),
    }
}

fn contains_exact(values: &[Value], current: &str) -> bool {
    values.iter().any(|v| v.as_str() == Some(current))
}

fn numeric_operands(current: &str, operand: Option<&Value>) -> (f64, f64) {
    let rhs = match operand {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(other) => parse_float(&to_js_string(other)),
        None => f64::NAN,
    };
    (parse_float(current), rhs)
}

/// Convert a complete string to a number.
///
/// Surrounding whitespace is ignored and an empty string is zero; anything
/// that is not entirely a numeric literal is NaN.
pub fn to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }

    if DECIMAL_LITERAL.is_match(trimmed) {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// Parse the leading numeric prefix of a string; NaN when there is none.
pub fn parse_float(s: &str) -> f64 {
    let trimmed = s.trim_start();
    let Some(prefix) = NUMERIC_PREFIX.find(trimmed) else {
        return f64::NAN;
    };

    match prefix.as_str() {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        literal => literal.parse().unwrap_or(f64::NAN),
    }
}

/// String form of a schema operand as it would appear in a form control.
pub fn to_js_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) => format_number(f),
            _ => n.to_string(),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}
