//! 研究流水线的数据类型：证据包、结构化分析结果、分析阶段结论、最终结果

use chrono::{DateTime, Local};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::llm::StructuredOutput;
use crate::react::ToolInvocationRecord;

/// 从工具调用记录中提取的证据
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvidenceBundle {
    pub text: String,
    /// URL 与 "Tool: <name>" 标记，按首次出现去重，最多 10 条
    pub sources: Vec<String>,
    /// false 表示没有任何足够长的观察，text 为占位文本
    pub has_data: bool,
}

/// 数据质量等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    #[serde(alias = "High", alias = "HIGH")]
    High,
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "Low", alias = "LOW")]
    Low,
}

/// 结构化分析结果（由 LLM 按 JSON Schema 产出）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    /// Main findings
    pub key_findings: Vec<String>,
    /// Overall data quality: high, medium or low
    pub data_quality: DataQuality,
    /// Confidence between 0 and 1
    pub confidence_score: f32,
    /// Suggested next steps
    pub recommendations: Vec<String>,
    /// Sources used in the analysis
    pub sources_used: Vec<String>,
}

impl StructuredOutput for AnalysisResult {
    fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(format!(
                "confidence_score {} is outside [0, 1]",
                self.confidence_score
            ));
        }
        Ok(())
    }
}

/// 分析阶段结论，按 status 字段区分
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Completed {
        structured: AnalysisResult,
        quality: String,
    },
    /// 任一分支失败；另一分支若成功则保留其结果
    Failed {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        structured: Option<AnalysisResult>,
        #[serde(skip_serializing_if = "Option::is_none")]
        quality: Option<String>,
    },
    Skipped,
}

impl AnalysisOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            AnalysisOutcome::Completed { .. } => "completed",
            AnalysisOutcome::Failed { .. } => "failed",
            AnalysisOutcome::Skipped => "skipped",
        }
    }

    pub fn structured(&self) -> Option<&AnalysisResult> {
        match self {
            AnalysisOutcome::Completed { structured, .. } => Some(structured),
            AnalysisOutcome::Failed { structured, .. } => structured.as_ref(),
            AnalysisOutcome::Skipped => None,
        }
    }

    pub fn quality(&self) -> Option<&str> {
        match self {
            AnalysisOutcome::Completed { quality, .. } => Some(quality),
            AnalysisOutcome::Failed { quality, .. } => quality.as_deref(),
            AnalysisOutcome::Skipped => None,
        }
    }
}

/// research() 的返回值
#[derive(Debug, Clone, Serialize)]
pub struct ResearchResult {
    pub query: String,
    pub answer: String,
    pub sources: Vec<String>,
    pub analysis: AnalysisOutcome,
    /// 工具调用次数
    pub step_count: usize,
    pub intermediate_steps: Vec<ToolInvocationRecord>,
    /// 秒
    pub execution_time: f64,
    pub timestamp: DateTime<Local>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::parse_structured;

    #[test]
    fn test_analysis_result_accepts_capitalized_quality() {
        let r: AnalysisResult = parse_structured(
            r#"{"key_findings":["a"],"data_quality":"High","confidence_score":0.8,"recommendations":[],"sources_used":[]}"#,
        )
        .unwrap();
        assert_eq!(r.data_quality, DataQuality::High);
    }

    #[test]
    fn test_analysis_result_rejects_out_of_range_confidence() {
        let err = parse_structured::<AnalysisResult>(
            r#"{"key_findings":[],"data_quality":"low","confidence_score":85,"recommendations":[],"sources_used":[]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("outside [0, 1]"));
    }

    #[test]
    fn test_outcome_serializes_status_tag() {
        let v = serde_json::to_value(AnalysisOutcome::Skipped).unwrap();
        assert_eq!(v, serde_json::json!({"status": "skipped"}));

        let failed = AnalysisOutcome::Failed {
            error: "boom".into(),
            structured: None,
            quality: Some("Medium".into()),
        };
        let v = serde_json::to_value(&failed).unwrap();
        assert_eq!(v["status"], "failed");
        assert_eq!(v["quality"], "Medium");
        assert!(v.get("structured").is_none());
    }
}
