//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按顺序回放预设回复，并记录每次收到的完整消息列表，便于断言 ReAct 循环的行为。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, TokenUsage};
use crate::memory::Message;

/// Mock 客户端：回放脚本；脚本耗尽后若设置了 fallback 则一直返回 fallback，否则返回错误
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<String>>,
    fallback: Option<String>,
    requests: Mutex<Vec<Vec<Message>>>,
    /// 每次调用计入的 (prompt, completion) token 数
    usage_per_call: (u64, u64),
    usage: TokenUsage,
}

impl MockLlmClient {
    /// 依次返回 replies 中的回复
    pub fn scripted<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// 每次都返回同一条回复（如永远请求工具，用于测试最大轮数）
    pub fn repeating(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(reply.into()),
            ..Self::default()
        }
    }

    /// 每次 complete 累计固定的 token 数，模拟真实客户端的用量统计
    pub fn with_usage_per_call(mut self, prompt: u64, completion: u64) -> Self {
        self.usage_per_call = (prompt, completion);
        self
    }

    /// 已收到的请求（每个元素为一次 complete 的完整消息列表）
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
        self.usage.add(self.usage_per_call.0, self.usage_per_call.1);
        let next = self
            .replies
            .lock()
            .map_err(|e| e.to_string())?
            .pop_front();
        next.or_else(|| self.fallback.clone())
            .ok_or_else(|| "mock script exhausted".to_string())
    }
}
