//! 语义索引：对长期记忆文档做向量化并按余弦相似度检索
//!
//! 默认策略为批量重建（每 N 次追加整体重建一次），增量 upsert 需显式开启。

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::llm::{EmbeddingProvider, LlmError};
use crate::memory::MemoryRecord;

/// 索引维护策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStrategy {
    /// 每 rebuild_every 次追加后对全部文档重建
    #[default]
    #[serde(rename = "batch")]
    BatchRebuild,
    /// 每次追加立即嵌入并写入索引
    Incremental,
}

/// 检索命中
#[derive(Debug, Clone)]
pub struct ScoredDoc {
    pub content: String,
    pub score: f32,
}

/// 内存向量索引：(文档内容, 向量)
#[derive(Debug, Default)]
pub struct SemanticIndex {
    entries: Vec<(String, Vec<f32>)>,
}

impl SemanticIndex {
    /// 对全部文档重新嵌入
    pub async fn build(
        embedder: &dyn EmbeddingProvider,
        records: &[MemoryRecord],
    ) -> Result<Self, LlmError> {
        let texts: Vec<String> = records.iter().map(|r| r.content.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(LlmError::Terminal(format!(
                "embedding count mismatch: {} documents, {} vectors",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(Self {
            entries: texts.into_iter().zip(vectors).collect(),
        })
    }

    /// 增量写入单条文档
    pub async fn upsert(
        &mut self,
        embedder: &dyn EmbeddingProvider,
        record: &MemoryRecord,
    ) -> Result<(), LlmError> {
        let vector = embedder.embed(&record.content).await?;
        self.entries.push((record.content.clone(), vector));
        Ok(())
    }

    /// 取相似度最高的 k 条，分数相同时保持写入顺序
    pub async fn search(
        &self,
        embedder: &dyn EmbeddingProvider,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredDoc>, LlmError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let q = embedder.embed(query).await?;
        let mut scored: Vec<ScoredDoc> = self
            .entries
            .iter()
            .map(|(content, v)| ScoredDoc {
                content: content.clone(),
                score: cosine_similarity(&q, v),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 余弦相似度；维度不一致或零向量时为 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::KeywordEmbedder;

    fn record(q: &str, a: &str) -> MemoryRecord {
        MemoryRecord::interaction(q, a, Default::default())
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[tokio::test]
    async fn test_build_and_search_ranks_relevant_first() {
        let embedder = KeywordEmbedder::default();
        let docs = vec![
            record("best pasta recipes", "boil water, add salt"),
            record("quantum computing qubits", "superposition and entanglement"),
            record("rust borrow checker", "ownership rules"),
        ];
        let index = SemanticIndex::build(&embedder, &docs).await.unwrap();
        assert_eq!(index.len(), 3);
        let hits = index.search(&embedder, "qubits entanglement", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].content.contains("quantum"));
    }

    #[tokio::test]
    async fn test_upsert_appends() {
        let embedder = KeywordEmbedder::default();
        let mut index = SemanticIndex::default();
        index.upsert(&embedder, &record("a b", "c d")).await.unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_strategy_serde_names() {
        let s: IndexStrategy = serde_json::from_str("\"batch\"").unwrap();
        assert_eq!(s, IndexStrategy::BatchRebuild);
        let s: IndexStrategy = serde_json::from_str("\"incremental\"").unwrap();
        assert_eq!(s, IndexStrategy::Incremental);
    }
}
