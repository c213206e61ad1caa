//! Calc 工具：安全四则运算
//!
//! 委托 calculator crate 求值；含标识符或不支持符号的表达式返回 UnsafeExpression，绝不求值。

use async_trait::async_trait;
use calculator::CalcError;
use serde_json::Value;

use crate::core::ToolError;
use crate::tools::Tool;

/// Calc 工具：计算只含数字与 + - * / ( ) 的表达式
#[derive(Debug, Default, Clone, Copy)]
pub struct CalcTool;

impl CalcTool {
    /// 同步求值（供测试与非 LLM 调用方直接使用）
    pub fn evaluate(expression: &str) -> Result<String, ToolError> {
        calculator::evaluate_to_string(expression).map_err(|e| match e {
            CalcError::Unsafe(_) => ToolError::UnsafeExpression(e.to_string()),
            other => ToolError::InvalidArguments(format!("calc error: {}", other)),
        })
    }
}

#[async_trait]
impl Tool for CalcTool {
    fn name(&self) -> &str {
        "calc"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression and return the numeric result. Only numbers and + - * / ( ) are allowed. Args: {\"expression\": \"(3+4)*5\"}"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "A math expression to evaluate, e.g. (3+4)*5"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let expression = args
            .get("expression")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim();
        tracing::debug!(expression = %expression, "calc tool");
        Self::evaluate(expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_calc_tool() {
        let tool = CalcTool;
        assert_eq!(tool.execute(json!({"expression": "3+4"})).await.unwrap(), "7");
        assert_eq!(tool.execute(json!({"expression": " 1991 - 1989 "})).await.unwrap(), "2");
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            CalcTool::evaluate("os.system('ls')"),
            Err(ToolError::UnsafeExpression(_))
        ));
        assert!(matches!(CalcTool::evaluate("2 $ 3"), Err(ToolError::UnsafeExpression(_))));
        assert!(matches!(CalcTool::evaluate("1/0"), Err(ToolError::InvalidArguments(_))));
        assert!(matches!(CalcTool::evaluate(""), Err(ToolError::InvalidArguments(_))));
        assert!(matches!(
            CalcTool::evaluate("170141183460469231731687303715884105727 + 1"),
            Err(ToolError::InvalidArguments(_))
        ));
    }
}
