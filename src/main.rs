//! ReAct Agent 命令行入口
//!
//! 初始化日志、加载配置与 API Key，读取一个问题（命令行参数或交互输入），运行 ReAct 循环并打印最终答案。
//! 任何未处理错误都会以非零退出码结束进程。

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use react_agent::config::{load_config, Credentials, TurnLimitPolicy};
use react_agent::memory::{Message, Role};
use react_agent::{create_agent, observability};

/// 交互输入为空时使用的示例问题
const SAMPLE_QUESTION: &str =
    "When was the first public demonstration of the World Wide Web? Also compute 1991 - 1989.";

#[derive(Debug, Parser)]
#[command(name = "react-agent", version, about = "ReAct agent with search and calc tools")]
struct Cli {
    /// 要回答的问题；省略时从标准输入读取
    question: Option<String>,

    /// 配置文件路径（TOML），覆盖 config/default.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// 最大轮数（模型调用次数）
    #[arg(long)]
    max_turns: Option<usize>,

    /// 覆盖 [llm].model
    #[arg(long)]
    model: Option<String>,

    /// 达到最大轮数时返回最后一次模型输出而不是报错
    #[arg(long)]
    best_effort: bool,

    /// 打印完整对话记录
    #[arg(long)]
    transcript: bool,
}

fn prompt_question() -> anyhow::Result<String> {
    print!("Question (enter for sample): ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read question from stdin")?;
    let question = line.trim();
    Ok(if question.is_empty() {
        SAMPLE_QUESTION.to_string()
    } else {
        question.to_string()
    })
}

fn format_message(m: &Message) -> String {
    match (m.role, &m.tool_call, &m.name) {
        (Role::Assistant, Some(call), _) => format!("[assistant -> {}] {}", call.tool, call.args),
        (Role::Tool, _, Some(name)) => format!("[tool:{}] {}", name, m.content),
        (role, _, _) => format!("[{}] {}", role.as_str(), m.content),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // .env 可选
    let _ = dotenvy::dotenv();
    observability::init();

    let cli = Cli::parse();

    let mut cfg = load_config(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(max_turns) = cli.max_turns {
        cfg.agent.max_turns = max_turns;
    }
    if let Some(model) = cli.model {
        cfg.llm.model = Some(model);
    }
    if cli.best_effort {
        cfg.agent.on_turn_limit = TurnLimitPolicy::BestEffort;
    }

    // 缺少 API Key 时在任何网络请求之前失败
    let credentials = Credentials::from_env(&cfg.llm.provider).context("Missing API credential")?;
    let agent = create_agent(&cfg, &credentials).context("Failed to create agent")?;

    let question = match cli.question {
        Some(q) if !q.trim().is_empty() => q,
        _ => prompt_question()?,
    };

    println!("Running...");
    let result = agent
        .run_with_transcript(&question)
        .await
        .context("Agent run failed")?;

    if cli.transcript {
        println!("\n=== Transcript ===");
        for m in result.transcript.messages() {
            println!("{}", format_message(m));
        }
    }

    println!("\n=== Result ===");
    println!("{}", result.answer);

    Ok(())
}
