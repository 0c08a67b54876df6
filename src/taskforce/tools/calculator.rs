//! Calculator tool.
//!
//! Evaluates mathematical expressions for executors that need arithmetic
//! without spinning up a code sandbox. Supports the usual operators
//! (`+ - * / % ^`), the constants `pi` and `e`, and the common functions
//! (`sqrt`, `abs`, `ln`, `log`, `exp`, trigonometry in radians, `floor`,
//! `ceil`, `round`, `min`, `max`).
//!
//! Results are formatted to six decimal places with trailing zeros trimmed,
//! so `42.000000` renders as `42` and `0.333333` stays `0.333333`.

use crate::taskforce::tool_protocol::{
    ToolAdapter, ToolMetadata, ToolParameter, ToolParameterType, ToolResult,
};
use async_trait::async_trait;
use evalexpr::ContextWithMutableVariables;
use std::error::Error;
use std::fmt;

/// Error type for calculator operations.
#[derive(Debug, Clone)]
pub struct CalculatorError {
    message: String,
}

impl CalculatorError {
    pub fn new(message: impl Into<String>) -> Self {
        CalculatorError {
            message: message.into(),
        }
    }
}

impl fmt::Display for CalculatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Calculator error: {}", self.message)
    }
}

impl Error for CalculatorError {}

/// A stateless expression evaluator. Cheap to create, safe to share.
#[derive(Clone, Default)]
pub struct Calculator {}

impl Calculator {
    pub fn new() -> Self {
        Calculator {}
    }

    /// Evaluate an expression to a float.
    pub fn evaluate(&self, expression: &str) -> Result<f64, CalculatorError> {
        let prepared = prepare_expression(expression);

        let mut context: evalexpr::HashMapContext = evalexpr::HashMapContext::new();
        let _ = context.set_value(
            "pi".to_string(),
            evalexpr::Value::Float(std::f64::consts::PI),
        );
        let _ = context.set_value("e".to_string(), evalexpr::Value::Float(std::f64::consts::E));

        match evalexpr::eval_with_context(&prepared, &context) {
            Ok(value) => value
                .as_number()
                .map_err(|_| CalculatorError::new("Result is not a number")),
            Err(e) => Err(CalculatorError::new(format!("Evaluation error: {}", e))),
        }
    }

    /// Evaluate and format the result the way the tool reports it.
    pub fn evaluate_formatted(&self, expression: &str) -> Result<String, CalculatorError> {
        let value = self.evaluate(expression)?;
        Ok(format_result(value))
    }
}

/// Rewrite common math notation into evalexpr's namespace.
fn prepare_expression(expression: &str) -> String {
    let mut prepared = expression.trim().to_string();

    // `**` is a frequent model habit for exponentiation.
    prepared = prepared.replace("**", "^");

    // Map bare function names onto evalexpr's math:: builtins. Longer names
    // first so e.g. `asin` is not clobbered by the `sin` rewrite.
    // floor/ceil/round/min/max are top-level evalexpr builtins and need no
    // prefix.
    const FUNCTIONS: &[&str] = &[
        "asinh", "acosh", "atanh", "sinh", "cosh", "tanh", "asin", "acos", "atan2", "atan",
        "sqrt", "exp2", "exp", "log10", "log2", "log", "ln", "sin", "cos", "tan", "abs",
    ];
    for name in FUNCTIONS {
        prepared = replace_function_name(&prepared, name);
    }

    // Integer literals evaluate with integer semantics (so 10/4 == 2); the
    // tool promises real-number arithmetic, so bare integers become floats.
    coerce_ints_to_floats(&prepared)
}

/// Append `.0` to integer literals that are not part of an identifier or an
/// existing float.
fn coerce_ints_to_floats(expr: &str) -> String {
    let chars: Vec<char> = expr.chars().collect();
    let mut out = String::with_capacity(expr.len());
    let mut i = 0;
    while i < chars.len() {
        if !chars[i].is_ascii_digit() {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let in_identifier = i > 0
            && (chars[i - 1].is_alphanumeric() || chars[i - 1] == '_' || chars[i - 1] == '.');
        let mut j = i;
        let mut has_dot = false;
        while j < chars.len() && (chars[j].is_ascii_digit() || chars[j] == '.') {
            has_dot |= chars[j] == '.';
            j += 1;
        }
        out.extend(&chars[i..j]);
        if !in_identifier && !has_dot {
            out.push_str(".0");
        }
        i = j;
    }
    out
}

/// Replace `name(` with `math::name(` wherever `name` is not already part of
/// a longer identifier.
fn replace_function_name(expr: &str, name: &str) -> String {
    let needle = format!("{}(", name);
    let mut out = String::with_capacity(expr.len());
    let mut rest = expr;
    while let Some(pos) = rest.find(&needle) {
        let preceded_by_ident = rest[..pos]
            .chars()
            .next_back()
            .map(|c| c.is_alphanumeric() || c == '_' || c == ':')
            .unwrap_or(false);
        out.push_str(&rest[..pos]);
        if preceded_by_ident {
            out.push_str(&needle);
        } else {
            out.push_str("math::");
            out.push_str(&needle);
        }
        rest = &rest[pos + needle.len()..];
    }
    out.push_str(rest);
    out
}

/// Format with six decimals, trimming trailing zeros and a dangling dot.
fn format_result(value: f64) -> String {
    let formatted = format!("{:.6}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Tool adapter exposing [`Calculator`] to executors.
pub struct CalculatorTool {
    calculator: Calculator,
}

impl CalculatorTool {
    pub fn new() -> Self {
        Self {
            calculator: Calculator::new(),
        }
    }
}

impl Default for CalculatorTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolAdapter for CalculatorTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new("calculator", "Evaluates a mathematical expression").with_parameter(
            ToolParameter::new("expression", ToolParameterType::String)
                .with_description("The mathematical expression to evaluate")
                .required(),
        )
    }

    async fn invoke(&self, args: serde_json::Value) -> ToolResult {
        let expression = match args.get("expression").and_then(|v| v.as_str()) {
            Some(expr) => expr,
            None => return ToolResult::failure("missing required parameter: expression".into()),
        };
        match self.calculator.evaluate_formatted(expression) {
            Ok(result) => ToolResult::success(serde_json::json!({ "result": result })),
            Err(e) => ToolResult::failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_zeros() {
        assert_eq!(format_result(42.0), "42");
        assert_eq!(format_result(2.5), "2.5");
        assert_eq!(format_result(1.0 / 3.0), "0.333333");
    }

    #[test]
    fn namespaces_functions() {
        assert_eq!(prepare_expression("sqrt(16)"), "math::sqrt(16.0)");
        assert_eq!(prepare_expression("2**3"), "2.0^3.0");
    }

    #[test]
    fn leaves_namespaced_calls_alone() {
        assert_eq!(prepare_expression("math::sqrt(4)"), "math::sqrt(4.0)");
    }

    #[test]
    fn float_literals_are_not_mangled() {
        assert_eq!(coerce_ints_to_floats("1.5 + 2"), "1.5 + 2.0");
        assert_eq!(coerce_ints_to_floats("atan2(1, 1)"), "atan2(1.0, 1.0)");
    }
}
