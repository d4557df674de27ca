//! Delve - Rust 研究型智能体
//!
//! 入口：初始化日志、按配置构建 ResearchAgent；带查询参数时执行一次研究，否则进入交互循环。

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use delve::core::create_agent_builder;
use delve::react::ResearchEvent;
use delve::{ResearchAgent, ResearchArtifact, ResearchResult};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// Delve - research agent: tool loop, parallel analysis, synthesized answer
#[derive(Parser, Debug)]
#[command(name = "delve")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Skip the deep analysis stage
    #[arg(long)]
    no_analysis: bool,

    /// Save the research result as JSON to this path
    #[arg(long)]
    save: Option<PathBuf>,

    /// Extra config file (overrides config/default.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Research query; omit to start interactive mode
    query: Vec<String>,
}

fn print_event(ev: &ResearchEvent) {
    match ev {
        ResearchEvent::Started { query } => eprintln!("🔍 Researching: {query}"),
        ResearchEvent::StepUpdate { step, max_steps } => eprintln!("  step {step}/{max_steps}"),
        ResearchEvent::ToolCall { tool, args } => eprintln!("  🔧 {tool} {args}"),
        ResearchEvent::Observation { tool, preview } => eprintln!("  📄 {tool}: {preview}"),
        ResearchEvent::ToolFailure { tool, reason } => eprintln!("  ⚠️  {tool} failed: {reason}"),
        ResearchEvent::LoopStopped { reason, iterations } => {
            eprintln!("  ⏹  stopped ({reason}) after {iterations} iterations")
        }
        ResearchEvent::Stage { name } => eprintln!("→ {name}"),
        ResearchEvent::AnalysisFinished { status } => eprintln!("  analysis: {status}"),
        ResearchEvent::Error { text } => eprintln!("❌ {text}"),
        _ => {}
    }
}

async fn print_result(agent: &ResearchAgent, result: &ResearchResult) {
    println!("\n{}\n", result.answer);
    println!("⏱  {:.2}s, {} tool calls", result.execution_time, result.step_count);
    if let Some(structured) = result.analysis.structured() {
        println!(
            "📊 confidence {:.2}, {} key findings",
            structured.confidence_score,
            structured.key_findings.len()
        );
        for finding in structured.key_findings.iter().take(3) {
            println!("   - {finding}");
        }
    } else {
        println!("📊 analysis: {}", result.analysis.status());
    }
    let stats = agent.get_memory_stats().await;
    println!(
        "🧠 memory: {} recent turns, {} stored interactions",
        stats.short_term_count, stats.long_term_count
    );
    let (prompt, completion, total) = agent.token_usage();
    if total > 0 {
        println!("🔢 tokens: {total} ({prompt} prompt + {completion} completion)");
    }
}

fn save_artifact(result: &ResearchResult, path: &Path) -> anyhow::Result<()> {
    ResearchArtifact::from_result(result)
        .save(path)
        .with_context(|| format!("Failed to save result to {}", path.display()))?;
    eprintln!("💾 saved to {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    delve::observability::init();
    let args = Args::parse();

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(ev) = event_rx.recv().await {
            print_event(&ev);
        }
    });

    let agent = create_agent_builder(args.config.clone())
        .build()
        .context("Failed to create research agent")?
        .with_event_sender(event_tx);
    let deep = !args.no_analysis;

    if !args.query.is_empty() {
        let query = args.query.join(" ");
        let result = agent.research(&query, deep).await;
        print_result(&agent, &result).await;
        if let Some(path) = &args.save {
            save_artifact(&result, path)?;
        }
        if !result.success {
            anyhow::bail!(result.error.unwrap_or_else(|| "research failed".to_string()));
        }
        return Ok(());
    }

    println!("Delve interactive mode. Type a question, or quit / exit / q to leave.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        match query {
            "" => continue,
            "quit" | "exit" | "q" => break,
            _ => {}
        }
        let result = agent.research(query, deep).await;
        print_result(&agent, &result).await;
        if let Some(path) = &args.save {
            save_artifact(&result, path)?;
        }
    }
    println!("Bye.");
    Ok(())
}
