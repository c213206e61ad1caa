//! Agent 运行时
//!
//! Agent 持有 Planner、ToolExecutor 与循环参数，只含不可变配置，每次 run 都从新的对话记录开始，
//! 多次调用之间不共享可变状态。
//! create_agent 按配置与显式传入的凭据构建 Agent；顶层 run 则从环境加载配置与 API Key 后回答单个问题。

use std::path::Path;
use std::sync::Arc;

use crate::config::{load_config, AppConfig, Credentials};
use crate::core::AgentError;
use crate::llm::{create_llm_from_config, LlmClient};
use crate::react::{build_system_prompt, react_loop, LoopOptions, Planner, ReactResult};
use crate::tools::{default_registry, ToolExecutor, ToolRegistry};

/// ReAct 智能体
pub struct Agent {
    planner: Planner,
    executor: ToolExecutor,
    options: LoopOptions,
}

impl Agent {
    /// 用给定 LLM 与工具注册表构建 Agent；system prompt 由注册表中的工具 schema 生成
    pub fn new(llm: Arc<dyn LlmClient>, registry: ToolRegistry, tool_timeout_secs: u64) -> Self {
        let system_prompt = build_system_prompt(&registry);
        Self {
            planner: Planner::new(llm, system_prompt),
            executor: ToolExecutor::new(registry, tool_timeout_secs),
            options: LoopOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoopOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_llm_timeout(mut self, timeout_secs: u64) -> Self {
        self.planner = self.planner.with_timeout(timeout_secs);
        self
    }

    pub fn options(&self) -> LoopOptions {
        self.options
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.executor.tool_names()
    }

    /// 回答问题，返回最终答案文本
    pub async fn run(&self, question: &str) -> Result<String, AgentError> {
        self.run_with_transcript(question).await.map(|r| r.answer)
    }

    /// 以指定最大轮数回答问题
    pub async fn run_with_max_turns(
        &self,
        question: &str,
        max_turns: usize,
    ) -> Result<String, AgentError> {
        let options = LoopOptions {
            max_turns,
            ..self.options
        };
        react_loop(&self.planner, &self.executor, question, options)
            .await
            .map(|r| r.answer)
    }

    /// 回答问题，同时返回完整对话记录
    pub async fn run_with_transcript(&self, question: &str) -> Result<ReactResult, AgentError> {
        react_loop(&self.planner, &self.executor, question, self.options).await
    }
}

/// 按配置创建 Agent：LLM 客户端（provider / model / 采样参数）、内置工具（search、calc）、循环参数
pub fn create_agent(cfg: &AppConfig, credentials: &Credentials) -> Result<Agent, AgentError> {
    let llm = create_llm_from_config(&cfg.llm, credentials)?;
    let registry = default_registry(&cfg.tools);
    Ok(Agent::new(llm, registry, cfg.tools.tool_timeout_secs)
        .with_llm_timeout(cfg.llm.timeout_secs)
        .with_options(LoopOptions {
            max_turns: cfg.agent.max_turns,
            on_turn_limit: cfg.agent.on_turn_limit,
        }))
}

/// 从配置文件与环境变量构建 Agent；缺少 API Key 时在任何网络请求之前返回 AgentError::Config
pub fn create_agent_from_env(config_path: Option<&Path>) -> Result<Agent, AgentError> {
    let cfg = load_config(config_path)?;
    let credentials = Credentials::from_env(&cfg.llm.provider)?;
    create_agent(&cfg, &credentials)
}

/// 编程入口：加载配置与凭据，回答单个问题
pub async fn run(question: &str) -> Result<String, AgentError> {
    create_agent_from_env(None)?.run(question).await
}
