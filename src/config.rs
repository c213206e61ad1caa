//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `REACT__*` 覆盖（双下划线表示嵌套，如 `REACT__AGENT__MAX_TURNS=4`）。
//! API Key 不走配置文件，由 [`Credentials`] 单独从环境变量读取，并作为显式参数传给 LLM 客户端。

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::core::AgentError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub tools: ToolsSection,
}

/// [llm] 段：后端选择、模型、采样参数与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai / deepseek
    pub provider: String,
    /// 未设置时按 provider 取默认模型（openai: gpt-4o-mini，deepseek: deepseek-chat）
    pub model: Option<String>,
    /// 自定义 OpenAI 兼容端点；未设置时按 provider 取默认地址
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// 单次 LLM 请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            base_url: None,
            temperature: 0.0,
            max_tokens: 800,
            timeout_secs: 60,
        }
    }
}

/// 达到最大轮数仍无最终答案时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TurnLimitPolicy {
    /// 返回 AgentError::IterationLimitExceeded
    #[default]
    Fail,
    /// 返回最后一条模型输出作为尽力而为的答案
    BestEffort,
}

/// [agent] 段：ReAct 循环参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub max_turns: usize,
    pub on_turn_limit: TurnLimitPolicy,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_turns: 8,
            on_turn_limit: TurnLimitPolicy::Fail,
        }
    }
}

/// [tools] 段：工具超时与 search 配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    pub search: SearchSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
            search: SearchSection::default(),
        }
    }
}

/// [tools.search] 段：Wikipedia 端点、超时、摘要最大字符数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub api_url: String,
    pub summary_url: String,
    pub timeout_secs: u64,
    pub max_chars: usize,
    pub user_agent: String,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            api_url: "https://en.wikipedia.org/w/api.php".to_string(),
            summary_url: "https://en.wikipedia.org/api/rest_v1/page/summary".to_string(),
            timeout_secs: 10,
            max_chars: 800,
            user_agent: concat!("react-agent/", env!("CARGO_PKG_VERSION"), " (educational project)")
                .to_string(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 REACT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path，则追加该文件（必须存在，可覆盖前面的键）
/// 3. 最后叠加环境变量 REACT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<&Path>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("REACT")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

/// 环境变量名
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEEPSEEK_API_KEY_ENV: &str = "DEEPSEEK_API_KEY";

/// LLM API 凭据；Debug 输出不含密钥
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// 从进程环境变量读取 provider 对应的 API Key；缺失即为配置错误
    pub fn from_env(provider: &str) -> Result<Self, AgentError> {
        Self::from_lookup(provider, |name| std::env::var(name).ok())
    }

    /// 按 provider 决定查找顺序：deepseek 先找 DEEPSEEK_API_KEY 再回退 OPENAI_API_KEY
    pub fn from_lookup(
        provider: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AgentError> {
        let names: &[&str] = match provider.to_lowercase().as_str() {
            "deepseek" => &[DEEPSEEK_API_KEY_ENV, OPENAI_API_KEY_ENV],
            "openai" => &[OPENAI_API_KEY_ENV],
            other => {
                return Err(AgentError::Config(format!(
                    "unknown llm provider '{}' (expected openai or deepseek)",
                    other
                )))
            }
        };
        names
            .iter()
            .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
            .map(|key| Self::new(key.trim()))
            .ok_or_else(|| {
                AgentError::Config(format!(
                    "Set {} environment variable and re-run.",
                    names[0]
                ))
            })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}
