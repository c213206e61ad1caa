//! 对话记录（Transcript）
//!
//! 单次 run 内按顺序追加的 user / assistant / tool 消息，只追加不修改，run 结束即丢弃。
//! 结构约束：携带 tool call 的 assistant 消息之后必须紧跟且仅跟一条 tool result。

use serde::{Deserialize, Serialize};

use crate::core::AgentError;

/// 消息角色（System 仅用于发给 LLM 的请求，不进入 Transcript）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// 模型发起的工具调用：{"tool": "calc", "args": {"expression": "3+4"}}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default = "empty_args")]
    pub args: serde_json::Value,
}

fn empty_args() -> serde_json::Value {
    serde_json::json!({})
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// assistant 消息携带的工具调用
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
    /// tool 消息对应的工具名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn plain(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            tool_call: None,
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content.into())
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content.into())
    }

    /// assistant 发起工具调用；content 为模型原始输出
    pub fn tool_call(content: impl Into<String>, call: ToolCall) -> Self {
        Self {
            tool_call: Some(call),
            ..Self::plain(Role::Assistant, content.into())
        }
    }

    /// 工具执行结果（成功文本或错误文本）
    pub fn tool_result(tool: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(tool.into()),
            ..Self::plain(Role::Tool, content.into())
        }
    }

    pub fn is_tool_call(&self) -> bool {
        self.tool_call.is_some()
    }
}

/// 单次 run 的对话记录
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// 以用户问题开始一段新的对话记录
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(question)],
        }
    }

    /// 追加消息；存在未回复的 tool call 时只接受对应工具的 tool result
    pub fn push(&mut self, msg: Message) -> Result<(), AgentError> {
        match (self.pending_tool_call(), msg.role) {
            (Some(call), Role::Tool) => {
                if msg.name.as_deref() != Some(call.tool.as_str()) {
                    return Err(AgentError::Transcript(format!(
                        "tool result for {:?} does not answer pending call to {}",
                        msg.name, call.tool
                    )));
                }
            }
            (Some(call), role) => {
                return Err(AgentError::Transcript(format!(
                    "{} message appended while call to {} is still pending",
                    role.as_str(),
                    call.tool
                )));
            }
            (None, Role::Tool) => {
                return Err(AgentError::Transcript(
                    "tool result without a preceding tool call".to_string(),
                ));
            }
            (None, Role::System) => {
                return Err(AgentError::Transcript(
                    "system messages are not part of the transcript".to_string(),
                ));
            }
            (None, _) => {}
        }
        self.messages.push(msg);
        Ok(())
    }

    pub fn push_tool_result(
        &mut self,
        tool: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<(), AgentError> {
        self.push(Message::tool_result(tool, content))
    }

    /// 最后一条消息若是 tool call，则返回它（等待 tool result）
    pub fn pending_tool_call(&self) -> Option<&ToolCall> {
        self.messages.last().and_then(|m| m.tool_call.as_ref())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// 最近一条 assistant 消息的文本（步数耗尽时作为尽力而为的答案）
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    /// tool call 次数
    pub fn tool_call_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_tool_call()).count()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc_call() -> ToolCall {
        ToolCall {
            tool: "calc".to_string(),
            args: serde_json::json!({"expression": "3+4"}),
        }
    }

    #[test]
    fn test_starts_with_question() {
        let t = Transcript::new("what is 3+4?");
        assert_eq!(t.len(), 1);
        assert_eq!(t.messages()[0].role, Role::User);
        assert!(t.pending_tool_call().is_none());
    }

    #[test]
    fn test_tool_call_must_be_followed_by_result() {
        let mut t = Transcript::new("q");
        t.push(Message::tool_call("{...}", calc_call())).unwrap();
        assert_eq!(t.pending_tool_call(), Some(&calc_call()));

        // pending 时不能追加其他消息
        assert!(t.push(Message::assistant("7")).is_err());
        assert!(t.push(Message::user("hi")).is_err());
        // 工具名不匹配
        assert!(t.push_tool_result("search", "x").is_err());

        t.push_tool_result("calc", "7").unwrap();
        assert!(t.pending_tool_call().is_none());
        t.push(Message::assistant("7")).unwrap();
        assert_eq!(t.tool_call_count(), 1);
        assert_eq!(t.last_assistant_text(), Some("7"));
    }

    #[test]
    fn test_rejects_orphan_tool_result_and_system() {
        let mut t = Transcript::new("q");
        assert!(t.push_tool_result("calc", "7").is_err());
        assert!(t.push(Message::system("prompt")).is_err());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_tool_call_deserializes_without_args() {
        let call: ToolCall = serde_json::from_str(r#"{"tool": "search"}"#).unwrap();
        assert_eq!(call.args, serde_json::json!({}));
    }
}
