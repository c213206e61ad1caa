//! 短期记忆：单次 run 的对话记录（不跨调用持久化）

pub mod transcript;

pub use transcript::{Message, Role, ToolCall, Transcript};
