//! 工具箱：注册表、执行器与内置工具（search、calc）

pub mod calc;
pub mod executor;
pub mod registry;
pub mod schema;
pub mod search;

pub use calc::CalcTool;
pub use executor::ToolExecutor;
pub use registry::{validate_args, Tool, ToolRegistry};
pub use schema::tool_call_schema_json;
pub use search::SearchTool;

use crate::config::ToolsSection;

/// 内置工具的固定枚举：按名查表，不做开放式反射
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTool {
    Search,
    Calc,
}

impl BuiltinTool {
    pub const ALL: [BuiltinTool; 2] = [BuiltinTool::Search, BuiltinTool::Calc];

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinTool::Search => "search",
            BuiltinTool::Calc => "calc",
        }
    }

    /// 将该工具注册进 registry
    pub fn register_into(&self, registry: &mut ToolRegistry, cfg: &ToolsSection) {
        tracing::debug!(tool = self.name(), "registering builtin tool");
        match self {
            BuiltinTool::Search => registry.register(SearchTool::new(&cfg.search)),
            BuiltinTool::Calc => registry.register(CalcTool),
        }
    }
}

/// 按配置构建默认注册表（search + calc）
pub fn default_registry(cfg: &ToolsSection) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in BuiltinTool::ALL {
        tool.register_into(&mut registry, cfg);
    }
    registry
}
