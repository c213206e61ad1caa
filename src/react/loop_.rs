//! ReAct 主循环
//!
//! Plan -> Act (Tool) -> Observe -> 下一轮 Plan，直到模型给出最终答案或达到最大轮数。
//! 每轮最多一次工具调用；工具错误不会中断循环，而是包装为 "Error: ..." 作为 Observation 回填给模型。

use crate::config::TurnLimitPolicy;
use crate::core::AgentError;
use crate::memory::{Message, Transcript};
use crate::react::{parse_llm_output, Planner, PlannerOutput};
use crate::tools::ToolExecutor;

/// 日志中模型输出 / Observation 预览的最大字符数
const PREVIEW_CHARS: usize = 300;

/// ReAct 循环执行结果：最终答案、完整对话记录与实际使用的轮数
#[derive(Debug)]
pub struct ReactResult {
    pub answer: String,
    pub transcript: Transcript,
    pub turns: usize,
    /// 本次 run 消耗的 (prompt, completion, total) token 数
    pub token_usage: (u64, u64, u64),
}

/// 单次 run 的循环参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOptions {
    /// 最多调用模型的次数；为 0 时直接返回 IterationLimitExceeded
    pub max_turns: usize,
    pub on_turn_limit: TurnLimitPolicy,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            max_turns: 8,
            on_turn_limit: TurnLimitPolicy::Fail,
        }
    }
}

/// LLM 客户端的用量是跨 run 累计的，按 run 开始时的快照求差
fn usage_since(start: (u64, u64, u64), now: (u64, u64, u64)) -> (u64, u64, u64) {
    (
        now.0.saturating_sub(start.0),
        now.1.saturating_sub(start.1),
        now.2.saturating_sub(start.2),
    )
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        format!("{}...", text.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        text.to_string()
    }
}

/// 提示模型按约定格式重新回复
fn correction_prompt(reason: &str) -> String {
    format!(
        "Your last reply could not be used ({}). Reply with a single JSON tool call such as \
         {{\"tool\": \"calc\", \"args\": {{\"expression\": \"1+1\"}}}} or with \"Final Answer: <answer>\".",
        reason
    )
}

/// 执行 ReAct 循环
///
/// 用户问题 -> plan -> 解析输出 ->
/// 若 ToolCall 则执行并追加 tool result；若最终答案则追加并返回；
/// 若输出无法解析则追加纠正提示，由模型决定下一步。
pub async fn react_loop(
    planner: &Planner,
    executor: &ToolExecutor,
    question: &str,
    options: LoopOptions,
) -> Result<ReactResult, AgentError> {
    let mut transcript = Transcript::new(question);
    let mut last_output: Option<String> = None;
    let usage_start = planner.token_usage();

    for turn in 1..=options.max_turns {
        tracing::debug!(turn, max_turns = options.max_turns, "react turn");

        let output = planner.plan(transcript.messages()).await?;
        tracing::info!(turn, "Assistant: {}", preview(&output));

        match parse_llm_output(&output) {
            PlannerOutput::FinalAnswer(answer) => {
                transcript.push(Message::assistant(answer.clone()))?;
                let token_usage = usage_since(usage_start, planner.token_usage());
                let (prompt, completion, total) = token_usage;
                tracing::info!(
                    turns = turn,
                    tool_calls = transcript.tool_call_count(),
                    prompt_tokens = prompt,
                    completion_tokens = completion,
                    total_tokens = total,
                    "final answer"
                );
                return Ok(ReactResult {
                    answer,
                    transcript,
                    turns: turn,
                    token_usage,
                });
            }
            PlannerOutput::ToolCall(call) => {
                tracing::info!(tool = %call.tool, args = %call.args, "Calling tool");
                transcript.push(Message::tool_call(output.clone(), call.clone()))?;

                let observation = match executor.invoke(&call.tool, call.args).await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(tool = %call.tool, error = %e, "tool failed");
                        format!("Error: {}", e)
                    }
                };
                tracing::info!(tool = %call.tool, "Observation: {}", preview(&observation));
                transcript.push_tool_result(call.tool, observation)?;
            }
            PlannerOutput::Malformed(reason) => {
                tracing::warn!(turn, reason = %reason, "unusable model reply");
                transcript.push(Message::assistant(output.clone()))?;
                transcript.push(Message::user(correction_prompt(&reason)))?;
            }
        }

        last_output = Some(output);
    }

    tracing::warn!(max_turns = options.max_turns, "no final answer within turn limit");
    match options.on_turn_limit {
        TurnLimitPolicy::Fail => Err(AgentError::IterationLimitExceeded {
            max_turns: options.max_turns,
            last_output,
        }),
        TurnLimitPolicy::BestEffort => {
            let answer = match last_output {
                Some(last) => format!(
                    "Agent stopped: reached max turns ({}) without a final answer. Last model output:\n{}",
                    options.max_turns, last
                ),
                None => "Agent stopped: reached max turns without a final answer.".to_string(),
            };
            transcript.push(Message::assistant(answer.clone()))?;
            Ok(ReactResult {
                answer,
                transcript,
                turns: options.max_turns,
                token_usage: usage_since(usage_start, planner.token_usage()),
            })
        }
    }
}
