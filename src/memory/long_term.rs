//! 长期记忆：进程内的交互文档列表
//!
//! 每轮交互写成一条 MemoryRecord，只追加不修改，仅 clear() 时清空；
//! 检索由 SemanticIndex 负责，见 index.rs。

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 记录类型：目前只有交互
pub const KIND_INTERACTION: &str = "interaction";

/// 一条长期记忆文档
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: Uuid,
    pub content: String,
    pub timestamp: DateTime<Local>,
    pub kind: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl MemoryRecord {
    /// 文档内容为 "Query: …\n\nResponse: …"；metadata 合并 timestamp、type 与调用方附加字段
    pub fn interaction(
        query: &str,
        response: &str,
        extra: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let timestamp = Local::now();
        let mut metadata = serde_json::Map::new();
        metadata.insert("timestamp".into(), timestamp.to_rfc3339().into());
        metadata.insert("type".into(), KIND_INTERACTION.into());
        metadata.extend(extra);
        Self {
            id: Uuid::new_v4(),
            content: format!("Query: {query}\n\nResponse: {response}"),
            timestamp,
            kind: KIND_INTERACTION.to_string(),
            metadata,
        }
    }
}

/// 追加式文档存储
#[derive(Debug, Default)]
pub struct LongTermStore {
    records: Vec<MemoryRecord>,
}

impl LongTermStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: MemoryRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[MemoryRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&MemoryRecord> {
        self.records.last()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
