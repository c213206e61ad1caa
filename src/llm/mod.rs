//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）

pub mod deepseek;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use deepseek::{create_deepseek_client, DEEPSEEK_BASE_URL, DEEPSEEK_CHAT};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage, OPENAI_DEFAULT_MODEL};
pub use traits::LlmClient;

use crate::config::{Credentials, LlmSection};
use crate::core::AgentError;

/// 按 [llm] 配置与凭据创建客户端
pub fn create_llm_from_config(
    cfg: &LlmSection,
    credentials: &Credentials,
) -> Result<Arc<dyn LlmClient>, AgentError> {
    let client = match cfg.provider.to_lowercase().as_str() {
        "deepseek" => {
            create_deepseek_client(cfg.base_url.as_deref(), cfg.model.as_deref(), credentials)
        }
        "openai" => OpenAiClient::new(
            cfg.base_url.as_deref(),
            cfg.model.as_deref().unwrap_or(OPENAI_DEFAULT_MODEL),
            credentials,
        ),
        other => {
            return Err(AgentError::Config(format!(
                "unknown llm provider '{}' (expected openai or deepseek)",
                other
            )))
        }
    };
    tracing::info!(provider = %cfg.provider, model = %client.model(), "LLM client ready");
    Ok(Arc::new(client.with_sampling(cfg.temperature, cfg.max_tokens)))
}
