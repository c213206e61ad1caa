//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），由 ToolRegistry 按名注册与查找。
//! invoke 在调用工具前先按参数 schema 校验 args，不匹配时返回 ToolError::InvalidArguments，
//! 由 ReAct 循环作为 Observation 回填给模型，而不是中断循环。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::ToolError;

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 为已校验的 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（用于 JSON 中的 "tool" 字段）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema（供 LLM 生成正确的参数格式，同时用于 invoke 前校验）
    /// 默认返回空对象，表示无参数
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 执行工具
    async fn execute(&self, args: Value) -> Result<String, ToolError>;
}

/// 工具注册表：按名称存储 Arc<dyn Tool>，支持 register / get / invoke / tool_names
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具；同名工具会被替换
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// 按名调用工具：未注册 -> UnknownTool；参数不符合 schema -> InvalidArguments
    pub async fn invoke(&self, name: &str, args: Value) -> Result<String, ToolError> {
        let tool = self.tools.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_string(),
            available: self.tool_names().join(", "),
        })?;
        let args = normalize_args(args);
        validate_args(&tool.parameters_schema(), &args)?;
        tool.execute(args).await
    }

    /// 已注册工具名（按字母序，保证 prompt 稳定）
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// 动态生成工具 schema JSON，拼入 system prompt
    pub fn to_schema_json(&self) -> String {
        let tools: Vec<Value> = self
            .tool_names()
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "parameters": tool.parameters_schema()
                })
            })
            .collect();
        serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string())
    }
}

/// 模型省略 args 或给出 null 时按空对象处理
fn normalize_args(args: Value) -> Value {
    if args.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        args
    }
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        // 未知类型名不做限制
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 按参数 schema 校验 args：顶层类型、required 字段、已声明属性的类型、additionalProperties: false
///
/// 只覆盖工具参数常用的 JSON Schema 子集。
pub fn validate_args(schema: &Value, args: &Value) -> Result<(), ToolError> {
    if let Some(expected) = schema.get("type").and_then(|t| t.as_str()) {
        if !type_matches(expected, args) {
            return Err(ToolError::InvalidArguments(format!(
                "expected {} arguments, got {}",
                expected,
                json_type_name(args)
            )));
        }
    }

    let Some(obj) = args.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for key in required.iter().filter_map(|k| k.as_str()) {
            match obj.get(key) {
                None | Some(Value::Null) => {
                    return Err(ToolError::InvalidArguments(format!(
                        "missing required argument '{}'",
                        key
                    )));
                }
                Some(_) => {}
            }
        }
    }

    let properties = schema.get("properties").and_then(|p| p.as_object());
    let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));

    for (key, value) in obj {
        match properties.and_then(|p| p.get(key)) {
            Some(prop) => {
                if let Some(expected) = prop.get("type").and_then(|t| t.as_str()) {
                    if !type_matches(expected, value) {
                        return Err(ToolError::InvalidArguments(format!(
                            "argument '{}' must be {}, got {}",
                            key,
                            expected,
                            json_type_name(value)
                        )));
                    }
                }
            }
            None if closed => {
                return Err(ToolError::InvalidArguments(format!(
                    "unexpected argument '{}'",
                    key
                )));
            }
            None => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct UpperTool;

    #[async_trait]
    impl Tool for UpperTool {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "Uppercase text"
        }

        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"],
                "additionalProperties": false
            })
        }

        async fn execute(&self, args: Value) -> Result<String, ToolError> {
            Ok(args["text"].as_str().unwrap_or_default().to_uppercase())
        }
    }

    #[tokio::test]
    async fn test_invoke_valid_args() {
        let mut registry = ToolRegistry::new();
        registry.register(UpperTool);
        let out = registry.invoke("upper", json!({"text": "abc"})).await.unwrap();
        assert_eq!(out, "ABC");
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(UpperTool);
        let err = registry.invoke("lower", json!({})).await.unwrap_err();
        assert_eq!(
            err,
            ToolError::UnknownTool {
                name: "lower".to_string(),
                available: "upper".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_invoke_invalid_args_never_executes() {
        let mut registry = ToolRegistry::new();
        registry.register(UpperTool);
        for args in [
            json!({}),
            Value::Null,
            json!({"text": 42}),
            json!({"text": null}),
            json!({"text": "a", "extra": 1}),
            json!(["text"]),
        ] {
            let err = registry.invoke("upper", args.clone()).await.unwrap_err();
            assert!(
                matches!(err, ToolError::InvalidArguments(_)),
                "{args}: {err:?}"
            );
        }
    }

    #[test]
    fn test_validate_types() {
        let schema = json!({
            "type": "object",
            "properties": {
                "n": {"type": "integer"},
                "x": {"type": "number"},
                "flag": {"type": "boolean"}
            }
        });
        assert!(validate_args(&schema, &json!({"n": 3, "x": 1.5, "flag": true})).is_ok());
        assert!(validate_args(&schema, &json!({"n": 1.5})).is_err());
        assert!(validate_args(&schema, &json!({"x": "1"})).is_err());
        // 未声明 additionalProperties: false 时允许额外字段
        assert!(validate_args(&schema, &json!({"other": "ok"})).is_ok());
    }

    #[test]
    fn test_schema_json_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(UpperTool);
        let schema: Value = serde_json::from_str(&registry.to_schema_json()).unwrap();
        assert_eq!(schema[0]["name"], "upper");
        assert_eq!(schema[0]["parameters"]["required"][0], "text");
        assert_eq!(registry.tool_names(), vec!["upper".to_string()]);
    }
}
