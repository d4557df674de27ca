//! 混合记忆：短期窗口 + 滚动摘要 + 语义长期存储
//!
//! 唯一写入口 add_interaction 依次更新三层；读取均为只读，检索失败一律返回空上下文。

use std::sync::Arc;

use serde::Serialize;

use crate::config::MemorySection;
use crate::core::ResearchError;
use crate::llm::{EmbeddingProvider, LlmClient};
use crate::memory::{
    ConversationTurn, IndexStrategy, LongTermStore, MemoryRecord, RollingSummary, SemanticIndex,
    ShortTermMemory,
};

const CONTEXT_HEADER: &str = "Relevant past context:\n";
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";
const SNIPPET_CHARS: usize = 200;

/// get_memory_stats 的返回值
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MemoryStats {
    pub short_term_count: usize,
    pub long_term_count: usize,
    pub summary_snippet: String,
}

pub struct HybridMemory {
    short_term: ShortTermMemory,
    summary: RollingSummary,
    long_term: LongTermStore,
    index: Option<SemanticIndex>,
    /// 增量写入失败后置位，下次写入改为全量重建
    index_stale: bool,
    llm: Arc<dyn LlmClient>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: MemorySection,
}

impl HybridMemory {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: MemorySection,
    ) -> Self {
        Self {
            short_term: ShortTermMemory::new(config.window),
            summary: RollingSummary::new(),
            long_term: LongTermStore::new(),
            index: None,
            index_stale: false,
            llm,
            embedder,
            config,
        }
    }

    /// 写入一轮交互
    pub async fn add_interaction(
        &mut self,
        query: &str,
        response: &str,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) {
        let turn = ConversationTurn {
            input: query.to_string(),
            output: response.to_string(),
        };
        self.short_term.push(turn.clone());

        if let Err(e) = self.summary.fold(self.llm.as_ref(), &turn).await {
            tracing::warn!(error = %e, "summary update failed, keeping previous summary");
        }

        if !self.config.enable_long_term {
            return;
        }
        self.long_term
            .append(MemoryRecord::interaction(query, response, metadata));

        match self.config.index_strategy {
            IndexStrategy::BatchRebuild => {
                let every = self.config.rebuild_every.max(1);
                if self.long_term.len() % every == 0 {
                    self.rebuild_index().await;
                }
            }
            IndexStrategy::Incremental if self.index_stale => {
                self.index_stale = !self.rebuild_index().await;
            }
            IndexStrategy::Incremental => self.upsert_latest().await,
        }
    }

    /// 全量重建索引；失败时保留旧索引并返回 false
    async fn rebuild_index(&mut self) -> bool {
        match SemanticIndex::build(self.embedder.as_ref(), self.long_term.records()).await {
            Ok(index) => {
                tracing::debug!(documents = index.len(), "semantic index rebuilt");
                self.index = Some(index);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "semantic index rebuild failed, keeping previous index");
                false
            }
        }
    }

    async fn upsert_latest(&mut self) {
        let Some(record) = self.long_term.last().cloned() else {
            return;
        };
        let index = self.index.get_or_insert_with(SemanticIndex::default);
        if let Err(e) = index.upsert(self.embedder.as_ref(), &record).await {
            tracing::warn!(error = %e, "incremental index upsert failed, rebuilding on next write");
            self.index_stale = true;
        }
    }

    /// 检索相关历史；无索引或检索失败返回空串
    pub async fn get_relevant_context(&self, query: &str, k: usize) -> String {
        self.search_context(query, k).await.unwrap_or_else(|e| {
            tracing::debug!(error = %e, "memory retrieval failed");
            String::new()
        })
    }

    async fn search_context(&self, query: &str, k: usize) -> Result<String, ResearchError> {
        let Some(index) = &self.index else {
            return Ok(String::new());
        };
        let hits = index
            .search(self.embedder.as_ref(), query, k)
            .await
            .map_err(|e| ResearchError::MemoryRead(e.to_string()))?;
        if hits.is_empty() {
            return Ok(String::new());
        }
        let docs: Vec<&str> = hits.iter().map(|h| h.content.as_str()).collect();
        Ok(format!("{CONTEXT_HEADER}{}", docs.join(CONTEXT_SEPARATOR)))
    }

    pub fn get_short_term_history(&self) -> Vec<ConversationTurn> {
        self.short_term.turns()
    }

    pub fn get_summary(&self) -> String {
        self.summary.text().to_string()
    }

    pub fn clear(&mut self) {
        self.short_term.clear();
        self.summary.clear();
        self.long_term.clear();
        self.index = None;
        self.index_stale = false;
    }

    pub fn stats(&self) -> MemoryStats {
        let summary = self.summary.text();
        let summary_snippet = if summary.chars().count() > SNIPPET_CHARS {
            format!("{}...", summary.chars().take(SNIPPET_CHARS).collect::<String>())
        } else {
            summary.to_string()
        };
        MemoryStats {
            short_term_count: self.short_term.len(),
            long_term_count: self.long_term.len(),
            summary_snippet,
        }
    }

    /// 当前索引覆盖的文档数
    pub fn indexed_count(&self) -> usize {
        self.index.as_ref().map(SemanticIndex::len).unwrap_or(0)
    }
}
