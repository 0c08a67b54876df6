//! Tests for the calculator tool and its adapter.

use taskforce::tool_protocol::ToolAdapter;
use taskforce::tools::calculator::{Calculator, CalculatorTool};

#[test]
fn basic_arithmetic() {
    let calc = Calculator::new();
    assert_eq!(calc.evaluate("2 + 2").unwrap(), 4.0);
    assert_eq!(calc.evaluate("10 / 4").unwrap(), 2.5);
    assert_eq!(calc.evaluate("(10 + 5) * 2").unwrap(), 30.0);
}

#[test]
fn exponentiation_both_spellings() {
    let calc = Calculator::new();
    assert_eq!(calc.evaluate("2^10").unwrap(), 1024.0);
    assert_eq!(calc.evaluate("2**10").unwrap(), 1024.0);
}

#[test]
fn functions_and_constants() {
    let calc = Calculator::new();
    assert_eq!(calc.evaluate("sqrt(16)").unwrap(), 4.0);
    assert!((calc.evaluate("sin(0)").unwrap()).abs() < 1e-12);
    assert!((calc.evaluate("cos(pi)").unwrap() + 1.0).abs() < 1e-12);
    assert!((calc.evaluate("ln(e)").unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn formatted_results_trim_trailing_zeros() {
    let calc = Calculator::new();
    assert_eq!(calc.evaluate_formatted("21*2").unwrap(), "42");
    assert_eq!(calc.evaluate_formatted("5/2").unwrap(), "2.5");
    assert_eq!(calc.evaluate_formatted("1/3").unwrap(), "0.333333");
}

#[test]
fn invalid_expression_is_an_error() {
    let calc = Calculator::new();
    assert!(calc.evaluate("2 +* 2").is_err());
    assert!(calc.evaluate("nonsense_fn(3)").is_err());
}

#[tokio::test]
async fn adapter_returns_result_field() {
    let tool = CalculatorTool::new();
    let result = tool
        .invoke(serde_json::json!({"expression": "21*2"}))
        .await;
    assert!(result.success);
    assert_eq!(result.output["result"], "42");
}

#[tokio::test]
async fn adapter_reports_errors_in_band() {
    let tool = CalculatorTool::new();

    let bad_expr = tool.invoke(serde_json::json!({"expression": "2+*"})).await;
    assert!(!bad_expr.success);
    assert!(bad_expr.error.is_some());

    let missing = tool.invoke(serde_json::json!({})).await;
    assert!(!missing.success);
    assert!(missing.error.unwrap().contains("expression"));
}
