//! 研究编排器
//!
//! 一次 research() 的流程：读取相关历史 -> 工具调用循环 -> 证据提取 -> 并发分析（可选）
//! -> 综合回答 -> 写入混合记忆。循环失败时直接返回失败结果，不写记忆。

use std::sync::Arc;

use chrono::Local;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::llm::LlmClient;
use crate::memory::{HybridMemory, MemoryStats};
use crate::react::events::send_event;
use crate::react::{AgentLoop, ResearchEvent};
use crate::research::{
    extract, AnalysisOutcome, AnalysisStage, ResearchResult, SynthesisInput, SynthesisStage,
};

pub struct ResearchAgent {
    agent_loop: AgentLoop,
    analysis: AnalysisStage,
    synthesis: SynthesisStage,
    /// 写入经由该锁串行化
    memory: Mutex<HybridMemory>,
    retrieval_k: usize,
    /// 各阶段使用的 LLM 客户端（去重），仅用于 token 统计
    llm_clients: Vec<Arc<dyn LlmClient>>,
    event_tx: Option<UnboundedSender<ResearchEvent>>,
}

impl ResearchAgent {
    pub fn new(
        agent_loop: AgentLoop,
        analysis: AnalysisStage,
        synthesis: SynthesisStage,
        memory: HybridMemory,
        retrieval_k: usize,
    ) -> Self {
        Self {
            agent_loop,
            analysis,
            synthesis,
            memory: Mutex::new(memory),
            retrieval_k,
            llm_clients: Vec::new(),
            event_tx: None,
        }
    }

    pub fn with_llm_clients(mut self, clients: Vec<Arc<dyn LlmClient>>) -> Self {
        self.llm_clients = clients;
        self
    }

    /// 推送过程事件（CLI 展示用）
    pub fn with_event_sender(mut self, tx: UnboundedSender<ResearchEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn stage(&self, name: &str) {
        tracing::debug!(stage = name, "pipeline stage");
        send_event(
            self.event_tx.as_ref(),
            ResearchEvent::Stage {
                name: name.to_string(),
            },
        );
    }

    /// 执行一次研究；任何阶段的失败都体现在返回值中，不会 panic 或返回 Err
    pub async fn research(&self, query: &str, enable_deep_analysis: bool) -> ResearchResult {
        let started = Instant::now();
        let timestamp = Local::now();
        let tx = self.event_tx.as_ref();
        tracing::info!(query, enable_deep_analysis, "research started");
        send_event(
            tx,
            ResearchEvent::Started {
                query: query.to_string(),
            },
        );

        let (past_context, history) = {
            let memory = self.memory.lock().await;
            (
                memory.get_relevant_context(query, self.retrieval_k).await,
                memory.get_short_term_history(),
            )
        };

        let run = match self.agent_loop.run(query, &history, tx).await {
            Ok(run) => run,
            Err(e) => {
                tracing::error!(error = %e, "research failed");
                send_event(tx, ResearchEvent::Error { text: e.to_string() });
                return ResearchResult {
                    query: query.to_string(),
                    answer: format!("Error during research: {e}"),
                    sources: Vec::new(),
                    analysis: AnalysisOutcome::Skipped,
                    step_count: 0,
                    intermediate_steps: Vec::new(),
                    execution_time: started.elapsed().as_secs_f64(),
                    timestamp,
                    success: false,
                    error: Some(e.to_string()),
                };
            }
        };

        self.stage("extract");
        let evidence = extract(&run.trace);

        let analysis = if enable_deep_analysis && evidence.has_data {
            self.stage("analysis");
            self.analysis.run(query, &evidence).await
        } else {
            tracing::info!(has_data = evidence.has_data, "analysis skipped");
            AnalysisOutcome::Skipped
        };
        send_event(
            tx,
            ResearchEvent::AnalysisFinished {
                status: analysis.status().to_string(),
            },
        );

        self.stage("synthesis");
        let answer = self
            .synthesis
            .run(SynthesisInput {
                query,
                evidence: &evidence.text,
                analysis: &analysis,
                past_context: &past_context,
                sources: &evidence.sources,
                raw_output: &run.output,
            })
            .await;

        self.stage("memory");
        let mut metadata = serde_json::Map::new();
        metadata.insert("sources".into(), serde_json::json!(evidence.sources));
        metadata.insert("analysis_status".into(), analysis.status().into());
        metadata.insert(
            "execution_time".into(),
            serde_json::json!(started.elapsed().as_secs_f64()),
        );
        metadata.insert("step_count".into(), run.trace.len().into());
        self.memory
            .lock()
            .await
            .add_interaction(query, &answer, metadata)
            .await;

        let execution_time = started.elapsed().as_secs_f64();
        tracing::info!(
            execution_time,
            steps = run.trace.len(),
            analysis = analysis.status(),
            "research completed"
        );
        send_event(tx, ResearchEvent::Completed { execution_time });

        ResearchResult {
            query: query.to_string(),
            answer,
            sources: evidence.sources,
            analysis,
            step_count: run.trace.len(),
            intermediate_steps: run.trace,
            execution_time,
            timestamp,
            success: true,
            error: None,
        }
    }

    pub async fn get_memory_stats(&self) -> MemoryStats {
        self.memory.lock().await.stats()
    }

    pub async fn clear_memory(&self) {
        self.memory.lock().await.clear();
        tracing::info!("memory cleared");
    }

    /// 当前摘要全文
    pub async fn memory_summary(&self) -> String {
        self.memory.lock().await.get_summary()
    }

    /// 累计 token 使用：(prompt, completion, total)，汇总所有阶段的客户端
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm_clients
            .iter()
            .map(|c| c.token_usage())
            .fold((0, 0, 0), |acc, u| (acc.0 + u.0, acc.1 + u.1, acc.2 + u.2))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::config::AppConfig;
    use crate::core::AgentBuilder;
    use crate::llm::{KeywordEmbedder, LlmClient, LlmError, ScriptedLlmClient};
    use crate::memory::Message;
    use crate::tools::{Tool, ToolRegistry};

    use super::*;

    const TOOL_CALL: &str = r#"{"tool": "encyclopedia", "args": {"topic": "graphene"}}"#;
    const ANALYSIS: &str = r#"{"key_findings":["Graphene is a single layer of carbon"],"data_quality":"medium","confidence_score":0.7,"recommendations":[],"sources_used":["https://en.wikipedia.org/wiki/Graphene"]}"#;

    struct Encyclopedia;

    #[async_trait]
    impl Tool for Encyclopedia {
        fn name(&self) -> &str {
            "encyclopedia"
        }
        fn description(&self) -> &str {
            "looks up a topic"
        }
        async fn execute(&self, _args: Value) -> Result<String, String> {
            Ok("Graphene is an allotrope of carbon consisting of a single layer of atoms. \
                https://en.wikipedia.org/wiki/Graphene"
                .into())
        }
    }

    fn builder(llm: Arc<dyn LlmClient>) -> AgentBuilder {
        let mut tools = ToolRegistry::new();
        tools.register(Encyclopedia);
        let mut cfg = AppConfig::default();
        cfg.retry.initial_delay_ms = 1;
        AgentBuilder::new(cfg)
            .with_llm(llm)
            .with_embedder(Arc::new(KeywordEmbedder::default()))
            .with_tools(tools)
    }

    fn build(llm: Arc<ScriptedLlmClient>) -> ResearchAgent {
        builder(llm).build().unwrap()
    }

    /// 摘要调用变慢，其余委托给脚本客户端
    struct SlowSummary {
        inner: ScriptedLlmClient,
        delay: std::time::Duration,
    }

    #[async_trait]
    impl LlmClient for SlowSummary {
        async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
            if messages.iter().any(|m| m.content.contains("Progressively summarize")) {
                tokio::time::sleep(self.delay).await;
            }
            self.inner.complete(messages).await
        }
    }

    /// 每次调用报告固定的 token 用量
    struct Metered {
        inner: ScriptedLlmClient,
        usage: (u64, u64, u64),
    }

    #[async_trait]
    impl LlmClient for Metered {
        async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
            self.inner.complete(messages).await
        }

        fn token_usage(&self) -> (u64, u64, u64) {
            self.usage
        }
    }

    fn scripted() -> ScriptedLlmClient {
        ScriptedLlmClient::new()
            .on("matches this JSON Schema", ANALYSIS)
            .on("Assess the quality", "Medium")
            .on("Progressively summarize", "User asked about graphene.")
            .on_sequence(
                "Available tools",
                vec![Ok(TOOL_CALL.into()), Ok("Graphene is a carbon monolayer.".into())],
            )
            .on("Executive Summary", "## Executive Summary\nGraphene is one atom thick.")
    }

    #[tokio::test]
    async fn test_research_runs_full_pipeline() {
        let llm = Arc::new(scripted());
        let agent = build(llm.clone());
        let result = agent.research("what is graphene", true).await;

        assert!(result.success);
        assert!(result.error.is_none());
        assert_eq!(result.step_count, 1);
        assert_eq!(result.analysis.status(), "completed");
        assert!(result.answer.starts_with("## Executive Summary"));
        assert!(result.answer.contains("**Sources:**\n1. https://en.wikipedia.org/wiki/Graphene\n"));
        assert_eq!(
            result.sources,
            vec!["https://en.wikipedia.org/wiki/Graphene", "Tool: encyclopedia"]
        );
        assert_eq!(llm.calls_for("Executive Summary"), 1);

        let stats = agent.get_memory_stats().await;
        assert_eq!(stats.short_term_count, 1);
        assert_eq!(stats.long_term_count, 1);
        assert_eq!(stats.summary_snippet, "User asked about graphene.");
    }

    #[tokio::test]
    async fn test_analysis_disabled_is_skipped() {
        let llm = Arc::new(scripted());
        let agent = build(llm.clone());
        let result = agent.research("what is graphene", false).await;
        assert_eq!(result.analysis.status(), "skipped");
        assert_eq!(llm.calls_for("matches this JSON Schema"), 0);
        assert_eq!(llm.calls_for("Assess the quality"), 0);
    }

    #[tokio::test]
    async fn test_agent_failure_returns_error_result_without_memory_write() {
        let llm = Arc::new(ScriptedLlmClient::new().on_sequence(
            "Available tools",
            vec![Err(LlmError::Terminal("connection refused".into()))],
        ));
        let agent = build(llm);
        let result = agent.research("anything", true).await;

        assert!(!result.success);
        assert!(result.answer.starts_with("Error during research: "));
        assert!(result.error.as_deref().unwrap_or("").contains("connection refused"));
        assert_eq!(agent.get_memory_stats().await.short_term_count, 0);
    }

    #[tokio::test]
    async fn test_events_are_streamed() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let agent = build(Arc::new(scripted())).with_event_sender(tx);
        agent.research("what is graphene", true).await;
        drop(agent);

        let mut kinds = Vec::new();
        while let Some(ev) = rx.recv().await {
            kinds.push(serde_json::to_value(&ev).unwrap()["type"].as_str().unwrap().to_string());
        }
        assert_eq!(kinds.first().map(String::as_str), Some("started"));
        assert_eq!(kinds.last().map(String::as_str), Some("completed"));
        assert!(kinds.iter().any(|k| k == "tool_call"));
        assert!(kinds.iter().any(|k| k == "analysis_finished"));
    }

    #[tokio::test]
    async fn test_clear_memory() {
        let agent = build(Arc::new(scripted()));
        agent.research("what is graphene", false).await;
        agent.clear_memory().await;
        let stats = agent.get_memory_stats().await;
        assert_eq!(stats.short_term_count, 0);
        assert_eq!(stats.long_term_count, 0);
        assert!(agent.memory_summary().await.is_empty());
    }

    #[tokio::test]
    async fn test_execution_time_includes_memory_write() {
        let llm = Arc::new(SlowSummary {
            inner: scripted(),
            delay: std::time::Duration::from_millis(300),
        });
        let agent = builder(llm).build().unwrap();
        let wall = std::time::Instant::now();
        let result = agent.research("what is graphene", false).await;
        let wall = wall.elapsed().as_secs_f64();

        assert!(result.success);
        assert!(result.execution_time >= 0.3, "got {}", result.execution_time);
        assert!(result.execution_time <= wall);
    }

    #[tokio::test]
    async fn test_token_usage_counts_shared_client_once() {
        let llm: Arc<dyn LlmClient> = Arc::new(Metered {
            inner: scripted(),
            usage: (100, 40, 140),
        });
        let agent = builder(llm).build().unwrap();
        assert_eq!(agent.token_usage(), (100, 40, 140));
    }

    #[tokio::test]
    async fn test_token_usage_sums_separate_synthesis_client() {
        let planner: Arc<dyn LlmClient> = Arc::new(Metered {
            inner: scripted(),
            usage: (100, 40, 140),
        });
        let writer: Arc<dyn LlmClient> = Arc::new(Metered {
            inner: scripted(),
            usage: (10, 5, 15),
        });
        let agent = builder(planner).with_synthesis_llm(writer).build().unwrap();
        assert_eq!(agent.token_usage(), (110, 45, 155));
    }
}
