//! Agent 构建器：按配置组装 LLM、嵌入、工具与各流水线阶段
//!
//! CLI 与测试共用同一套初始化逻辑；测试可通过 with_* 注入替身。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::agent::ResearchAgent;
use crate::config::AppConfig;
use crate::core::ResearchError;
use crate::llm::{create_embedder_from_config, EmbeddingProvider, KeywordEmbedder, LlmClient, MockLlmClient, OpenAiClient};
use crate::memory::HybridMemory;
use crate::react::{AgentLoop, Planner, DEFAULT_SYSTEM_PROMPT};
use crate::research::{AnalysisStage, SynthesisStage};
use crate::tools::{research_tools, ToolExecutor, ToolRegistry};

pub struct AgentBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    synthesis_llm: Option<Arc<dyn LlmClient>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    tools: Option<ToolRegistry>,
}

fn has_openai_key() -> bool {
    std::env::var("OPENAI_API_KEY")
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false)
}

impl AgentBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            synthesis_llm: None,
            embedder: None,
            tools: None,
        }
    }

    /// 注入主 LLM；未单独设置时综合阶段也使用它
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_synthesis_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.synthesis_llm = Some(llm);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// 替换默认的六个研究工具
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    /// 按 [llm] 配置创建客户端：provider=mock 或缺少 OPENAI_API_KEY 时使用离线 Mock
    pub fn build_llm(&self, temperature: f32) -> Result<Arc<dyn LlmClient>, ResearchError> {
        let llm = &self.config.llm;
        match llm.provider.to_lowercase().as_str() {
            "mock" => Ok(Arc::new(MockLlmClient)),
            "openai" if has_openai_key() => {
                tracing::info!(model = %llm.model, temperature, "using OpenAI-compatible LLM");
                Ok(Arc::new(
                    OpenAiClient::new(llm.base_url.as_deref(), &llm.model, None)
                        .with_temperature(temperature)
                        .with_max_tokens(llm.max_tokens)
                        .with_request_timeout(Duration::from_secs(llm.timeouts.request)),
                ))
            }
            "openai" => {
                tracing::warn!("OPENAI_API_KEY not set, using Mock LLM");
                Ok(Arc::new(MockLlmClient))
            }
            other => Err(ResearchError::ConfigError(format!(
                "unknown llm provider '{other}' (expected openai or mock)"
            ))),
        }
    }

    pub fn build_embedder(&self) -> Arc<dyn EmbeddingProvider> {
        if !self.config.embedding.enabled {
            return Arc::new(KeywordEmbedder::default());
        }
        create_embedder_from_config(
            self.config.llm.base_url.as_deref(),
            &self.config.embedding.model,
            None,
        )
    }

    pub fn build_tool_registry(&self) -> ToolRegistry {
        research_tools(&self.config.tools)
    }

    pub fn build(self) -> Result<ResearchAgent, ResearchError> {
        let llm = match &self.llm {
            Some(llm) => llm.clone(),
            None => self.build_llm(self.config.llm.temperature)?,
        };
        let synthesis_llm = match (&self.synthesis_llm, &self.llm) {
            (Some(s), _) => s.clone(),
            (None, Some(llm)) => llm.clone(),
            (None, None) => self.build_llm(self.config.llm.synthesis_temperature)?,
        };
        let embedder = self.embedder.clone().unwrap_or_else(|| self.build_embedder());
        let tools = match self.tools {
            Some(ref t) => t.clone(),
            None => self.build_tool_registry(),
        };

        let cfg = self.config;
        let base_prompt = cfg
            .agent
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let planner = Planner::new(llm.clone(), base_prompt, &tools);
        tracing::info!(tools = ?tools.tool_names(), "tool registry ready");
        let executor = ToolExecutor::new(Arc::new(tools), cfg.tools.tool_timeout_secs);
        let agent_loop = AgentLoop::new(
            planner,
            executor,
            cfg.agent.max_iterations,
            cfg.agent.max_execution_time(),
        );

        let analysis = AnalysisStage::new(
            llm.clone(),
            cfg.retry.to_policy(),
            cfg.analysis.max_evidence_chars,
        );
        let mut llm_clients = vec![llm.clone()];
        if !Arc::ptr_eq(&llm, &synthesis_llm) {
            llm_clients.push(synthesis_llm.clone());
        }
        let synthesis = SynthesisStage::new(synthesis_llm, cfg.synthesis.clone());
        let memory = HybridMemory::new(llm, embedder, cfg.memory.clone());

        Ok(ResearchAgent::new(
            agent_loop,
            analysis,
            synthesis,
            memory,
            cfg.memory.retrieval_k,
        )
        .with_llm_clients(llm_clients))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// 便捷函数：加载配置（失败时回退默认值）并创建 AgentBuilder
pub fn create_agent_builder(config_path: Option<PathBuf>) -> AgentBuilder {
    let config = crate::config::load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    AgentBuilder::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_is_config_error() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "carrier-pigeon".into();
        let err = AgentBuilder::new(cfg).build_llm(0.1).err().unwrap();
        assert!(matches!(err, ResearchError::ConfigError(_)));
    }

    #[test]
    fn test_default_registry_has_research_tools() {
        let builder = AgentBuilder::new(AppConfig::default());
        assert_eq!(builder.build_tool_registry().len(), 6);
    }

    #[tokio::test]
    async fn test_mock_provider_builds_agent() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".into();
        cfg.embedding.enabled = false;
        let agent = AgentBuilder::new(cfg).build().unwrap();
        let stats = agent.get_memory_stats().await;
        assert_eq!(stats.short_term_count, 0);
    }
}
