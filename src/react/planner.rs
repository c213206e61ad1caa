//! Planner：调用 LLM 并解析输出
//!
//! 模型每轮要么输出 JSON Tool Call（{"tool": "calc", "args": {...}}，可包在 ```json 代码块里），
//! 要么输出最终答案（可带 "Final Answer:" 前缀）。parse_llm_output 负责区分这两种情况。

use std::sync::Arc;
use std::time::Duration;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::{Message, ToolCall};
use crate::tools::{tool_call_schema_json, ToolRegistry};

/// 最终答案标记
pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";

/// Planner 输出
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerOutput {
    /// 最终答案（已去掉 Final Answer: 前缀）
    FinalAnswer(String),
    /// 需要执行工具
    ToolCall(ToolCall),
    /// 看起来是工具调用但无法解析（或空回复），附带原因，交给模型重试
    Malformed(String),
}

/// 取 "Final Answer:" 之后的内容（多个标记时取最后一个）；无标记时返回整段文本
pub fn extract_final_answer(text: &str) -> String {
    match text.rfind(FINAL_ANSWER_MARKER) {
        Some(idx) => text[idx + FINAL_ANSWER_MARKER.len()..].trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// 依次从每个 '{' 起流式解析一个 JSON 对象（忽略其后的文本），返回第一个 tool 非空的调用；
/// 推理文字中出现的花括号不会影响后面真正的工具调用
fn find_tool_call(text: &str) -> Option<ToolCall> {
    text.match_indices('{').find_map(|(idx, _)| {
        let mut stream = serde_json::Deserializer::from_str(&text[idx..]).into_iter::<ToolCall>();
        match stream.next() {
            Some(Ok(call)) if !call.tool.trim().is_empty() => Some(ToolCall {
                tool: call.tool.trim().to_string(),
                args: call.args,
            }),
            _ => None,
        }
    })
}

/// 含 "tool" 键的对象无法解析时给出原因（取 "tool" 之前最近的 '{' 作为起点）
fn tool_call_error(text: &str) -> Option<String> {
    let key = text.find("\"tool\"")?;
    let start = text[..key].rfind('{')?;
    let candidate = &text[start..];
    let err = serde_json::Deserializer::from_str(candidate)
        .into_iter::<ToolCall>()
        .next()?
        .err()?;
    Some(format!("invalid tool call JSON ({}): {}", err, candidate))
}

/// 解析 LLM 输出
///
/// - 含 "Final Answer:" -> FinalAnswer
/// - 含可解析且 tool 非空的 JSON 对象（裸 JSON 或 ```json 代码块） -> ToolCall
/// - 含 "tool" 键的对象却无法解析 -> Malformed
/// - 其余文本 -> FinalAnswer
pub fn parse_llm_output(output: &str) -> PlannerOutput {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return PlannerOutput::Malformed("empty reply".to_string());
    }
    if trimmed.contains(FINAL_ANSWER_MARKER) {
        return PlannerOutput::FinalAnswer(extract_final_answer(trimmed));
    }
    if let Some(call) = find_tool_call(trimmed) {
        return PlannerOutput::ToolCall(call);
    }
    match tool_call_error(trimmed) {
        Some(reason) => PlannerOutput::Malformed(reason),
        None => PlannerOutput::FinalAnswer(trimmed.to_string()),
    }
}

/// 构建 system prompt：ReAct 约定 + 可用工具 schema + tool call JSON 格式
pub fn build_system_prompt(registry: &ToolRegistry) -> String {
    format!(
        "You are an assistant that follows the ReAct pattern.\n\
         When you need facts or calculations, call exactly one tool per reply by answering with only a JSON object:\n\
         {{\"tool\": \"<name>\", \"args\": {{...}}}}\n\
         - use search(query) to look up concise factual summaries.\n\
         - use calc(expression) to compute numeric results.\n\
         Tool results come back as messages starting with \"Observation from <tool>:\". \
         If an observation starts with \"Error:\", fix the arguments or try another approach.\n\
         When you know the final response for the user, reply with \"{} <answer>\".\n\
         Be concise and avoid calling tools unnecessarily.\n\n\
         Available tools:\n{}\n\n\
         Tool call format (JSON Schema):\n{}",
        FINAL_ANSWER_MARKER,
        registry.to_schema_json(),
        tool_call_schema_json()
    )
}

/// Planner：持有 LLM、system prompt 与单次请求超时
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    timeout: Duration,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// system + 对话记录 -> LLM 原始输出
    pub async fn plan(&self, transcript: &[Message]) -> Result<String, AgentError> {
        let mut full_messages = Vec::with_capacity(transcript.len() + 1);
        full_messages.push(Message::system(self.system_prompt.clone()));
        full_messages.extend_from_slice(transcript);

        match tokio::time::timeout(self.timeout, self.llm.complete(&full_messages)).await {
            Ok(result) => result.map_err(AgentError::Llm),
            Err(_) => Err(AgentError::Llm(format!(
                "request timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}
