//! ReAct Agent - LLM 推理与工具调用交替进行，直到给出最终答案
//!
//! 模块划分：
//! - **agent**: Agent 运行时与编程入口 `run(question)`
//! - **config**: 应用配置加载（TOML + 环境变量）与 API 凭据
//! - **core**: 错误类型（ToolError / AgentError）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 单次 run 的对话记录（Transcript）
//! - **observability**: 日志初始化
//! - **react**: Planner 与 ReAct 主循环
//! - **tools**: 工具注册表、执行器与内置工具（search、calc）

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod tools;

pub use agent::{create_agent, create_agent_from_env, run, Agent};
pub use crate::core::{AgentError, ToolError};
