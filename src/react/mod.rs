//! 认知层：Planner（调用 LLM 并解析输出）与 ReAct 主循环

pub mod loop_;
pub mod planner;

pub use loop_::{react_loop, LoopOptions, ReactResult};
pub use planner::{
    build_system_prompt, extract_final_answer, parse_llm_output, Planner, PlannerOutput,
    FINAL_ANSWER_MARKER,
};
