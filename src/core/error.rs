//! Agent 错误类型
//!
//! 两层错误：
//! - **ToolError**：工具级错误，不向上抛出，由 ReAct 循环包装为 Observation 回填给模型，让模型自行调整；
//! - **AgentError**：循环级错误（步数耗尽、配置缺失、LLM 调用失败），直接返回给调用方。

use thiserror::Error;

/// 工具调用失败的原因（作为 Observation 文本回填给模型）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    /// 参数不符合工具的参数 schema，或参数值本身无效
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// 计算器拒绝的表达式（含标识符、函数调用或不支持的符号）
    #[error("Unsafe expression: {0}")]
    UnsafeExpression(String),

    /// 外部资料源没有匹配条目
    #[error("Not found: {0}")]
    NotFound(String),

    /// 模型请求了未注册的工具
    #[error("Unknown tool: {name} (available: {available})")]
    UnknownTool { name: String, available: String },

    #[error("Tool timeout: {0}")]
    Timeout(String),

    /// 其他执行失败（网络错误、响应无法解析等）
    #[error("Tool execution failed: {0}")]
    Failed(String),
}

/// ReAct 循环运行过程中返回给调用方的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 达到最大轮数仍未得到最终答案；last_output 为最后一次模型输出（可能为空）
    #[error("Iteration limit exceeded: no final answer after {max_turns} turns")]
    IterationLimitExceeded {
        max_turns: usize,
        last_output: Option<String>,
    },

    /// 配置错误（如缺少 API Key），启动时即失败
    #[error("Config error: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(String),

    /// 违反对话记录的结构约束（tool call 之后必须紧跟一条 tool result）
    #[error("Transcript error: {0}")]
    Transcript(String),
}

impl AgentError {
    /// 步数耗尽时最后一次模型输出，作为尽力而为的答案
    pub fn best_effort_answer(&self) -> Option<&str> {
        match self {
            AgentError::IterationLimitExceeded { last_output, .. } => last_output.as_deref(),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for AgentError {
    fn from(e: config::ConfigError) -> Self {
        AgentError::Config(e.to_string())
    }
}
