//! 研究结果存档：把一次研究的回答、来源、分析与工具调用次数写成 JSON 文件

use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::research::ResearchResult;

/// 落盘的研究存档（CLI --save）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchArtifact {
    pub query: String,
    pub answer: String,
    pub sources: Vec<String>,
    /// 分析阶段结论（含 status 字段）
    pub analysis: serde_json::Value,
    /// 工具调用次数（不保存调用明细）
    pub intermediate_steps: usize,
    pub execution_time: f64,
    pub timestamp: DateTime<Local>,
    pub success: bool,
}

impl ResearchArtifact {
    pub fn from_result(result: &ResearchResult) -> Self {
        Self {
            query: result.query.clone(),
            answer: result.answer.clone(),
            sources: result.sources.clone(),
            analysis: serde_json::to_value(&result.analysis).unwrap_or_default(),
            intermediate_steps: result.intermediate_steps.len(),
            execution_time: result.execution_time,
            timestamp: result.timestamp,
            success: result.success,
        }
    }

    /// 写入 JSON 文件；父目录不存在时自动创建
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
