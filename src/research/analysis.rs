//! 分析阶段：结构化分析与数据质量评估两个分支并发执行
//!
//! 结构化分支按 AnalysisResult 的 JSON Schema 约束输出，校验失败或瞬时错误按 RetryPolicy 重试；
//! 两个分支都结束后才汇总，任一失败即整体 failed，成功分支的结果保留。

use std::sync::Arc;

use crate::core::fanout::{join_settled, Settled};
use crate::core::{ResearchError, RetryPolicy};
use crate::llm::{complete_structured, LlmClient};
use crate::memory::Message;
use crate::research::{AnalysisOutcome, AnalysisResult, EvidenceBundle};

const ANALYST_PROMPT: &str = "You are a professional AI research analyst.

Your job:
1. Analyze the provided data objectively.
2. Identify important patterns, trends and insights.
3. Judge the quality and reliability of the data.
4. Recommend next steps.

Always base conclusions on concrete evidence, separate facts from opinions, \
point out gaps in the data and suggest how to verify the information.";

const QUALITY_PROMPT: &str = "Assess the quality of the research data below.

Check:
1. Completeness (is there enough information?)
2. Reliability (are the sources trustworthy?)
3. Consistency (are there contradictions?)
4. Recency (is the information current?)

Answer with High, Medium or Low followed by a short explanation.";

pub struct AnalysisStage {
    llm: Arc<dyn LlmClient>,
    retry: RetryPolicy,
    max_evidence_chars: usize,
}

impl AnalysisStage {
    pub fn new(llm: Arc<dyn LlmClient>, retry: RetryPolicy, max_evidence_chars: usize) -> Self {
        Self {
            llm,
            retry,
            max_evidence_chars,
        }
    }

    fn truncated_evidence(&self, evidence: &EvidenceBundle) -> String {
        evidence.text.chars().take(self.max_evidence_chars).collect()
    }

    async fn structured_analysis(
        &self,
        topic: &str,
        data: &str,
        sources: &str,
    ) -> Result<AnalysisResult, ResearchError> {
        let messages = [
            Message::system(ANALYST_PROMPT),
            Message::user(format!(
                "Analyze the following data.\n\nTOPIC: {topic}\n\nDATA COLLECTED:\n{data}\n\nSOURCES:\n{sources}"
            )),
        ];
        self.retry
            .run_if(
                || complete_structured::<AnalysisResult>(self.llm.as_ref(), &messages),
                ResearchError::is_retryable,
            )
            .await
    }

    async fn quality_check(&self, data: &str, sources: &str) -> Result<String, ResearchError> {
        let messages = [
            Message::system(QUALITY_PROMPT),
            Message::user(format!("DATA: {data}\nSOURCES: {sources}")),
        ];
        Ok(self.llm.complete(&messages).await?.trim().to_string())
    }

    /// 对证据运行两个分析分支
    pub async fn run(&self, topic: &str, evidence: &EvidenceBundle) -> AnalysisOutcome {
        let data = self.truncated_evidence(evidence);
        let sources = evidence.sources.join("\n");

        let (structured, quality) = join_settled(
            self.structured_analysis(topic, &data, &sources),
            self.quality_check(&data, &sources),
        )
        .await;

        match (structured, quality) {
            (Settled::Ok(structured), Settled::Ok(quality)) => {
                tracing::info!(
                    findings = structured.key_findings.len(),
                    confidence = structured.confidence_score,
                    "analysis completed"
                );
                AnalysisOutcome::Completed {
                    structured,
                    quality,
                }
            }
            (structured, quality) => {
                let mut errors = Vec::new();
                let structured = match structured {
                    Settled::Ok(s) => Some(s),
                    Settled::Err(e) => {
                        errors.push(format!("structured analysis: {e}"));
                        None
                    }
                };
                let quality = match quality {
                    Settled::Ok(q) => Some(q),
                    Settled::Err(e) => {
                        errors.push(format!("quality check: {e}"));
                        None
                    }
                };
                let error = ResearchError::Analysis(errors.join("; ")).to_string();
                tracing::warn!(error = %error, "analysis failed");
                AnalysisOutcome::Failed {
                    error,
                    structured,
                    quality,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::llm::{LlmError, ScriptedLlmClient};

    const VALID: &str = r#"{"key_findings":["Rust 1.0 shipped in 2015"],"data_quality":"high","confidence_score":0.9,"recommendations":["read the RFCs"],"sources_used":["https://blog.rust-lang.org"]}"#;
    const OUT_OF_RANGE: &str = r#"{"key_findings":[],"data_quality":"low","confidence_score":85,"recommendations":[],"sources_used":[]}"#;

    fn evidence() -> EvidenceBundle {
        EvidenceBundle {
            text: "[wikipedia]\nRust is a multi-paradigm programming language focused on safety.\n"
                .to_string(),
            sources: vec!["Tool: wikipedia".to_string()],
            has_data: true,
        }
    }

    fn stage(llm: Arc<ScriptedLlmClient>, attempts: usize) -> AnalysisStage {
        let retry = RetryPolicy::default()
            .with_max_attempts(attempts)
            .with_initial_delay(Duration::from_millis(1));
        AnalysisStage::new(llm, retry, 3000)
    }

    #[tokio::test]
    async fn test_both_branches_complete() {
        let llm = Arc::new(
            ScriptedLlmClient::new()
                .on("matches this JSON Schema", VALID)
                .on("Assess the quality", "High: consistent sources"),
        );
        let outcome = stage(llm, 3).run("rust", &evidence()).await;
        match outcome {
            AnalysisOutcome::Completed { structured, quality } => {
                assert_eq!(structured.key_findings.len(), 1);
                assert_eq!(quality, "High: consistent sources");
            }
            other => panic!("expected completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_output_is_retried_until_valid() {
        let llm = Arc::new(
            ScriptedLlmClient::new()
                .on_sequence(
                    "matches this JSON Schema",
                    vec![Ok(OUT_OF_RANGE.into()), Ok("not json".into()), Ok(VALID.into())],
                )
                .on("Assess the quality", "Medium"),
        );
        let outcome = stage(llm.clone(), 3).run("rust", &evidence()).await;
        assert_eq!(outcome.status(), "completed");
        assert_eq!(llm.calls_for("matches this JSON Schema"), 3);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_fails_but_keeps_quality() {
        let llm = Arc::new(
            ScriptedLlmClient::new()
                .on("matches this JSON Schema", OUT_OF_RANGE)
                .on("Assess the quality", "Low"),
        );
        let outcome = stage(llm.clone(), 3).run("rust", &evidence()).await;
        match &outcome {
            AnalysisOutcome::Failed { error, structured, quality } => {
                assert!(error.starts_with("Analysis failed: structured analysis"));
                assert!(structured.is_none());
                assert_eq!(quality.as_deref(), Some("Low"));
            }
            other => panic!("expected failed, got {other:?}"),
        }
        assert_eq!(llm.calls_for("matches this JSON Schema"), 3);
    }

    #[tokio::test]
    async fn test_terminal_error_is_not_retried() {
        let llm = Arc::new(
            ScriptedLlmClient::new()
                .on_sequence(
                    "matches this JSON Schema",
                    vec![Err(LlmError::Terminal("bad request".into()))],
                )
                .on("Assess the quality", "High"),
        );
        let outcome = stage(llm.clone(), 3).run("rust", &evidence()).await;
        assert_eq!(outcome.status(), "failed");
        assert_eq!(llm.calls_for("matches this JSON Schema"), 1);
    }

    #[tokio::test]
    async fn test_quality_failure_keeps_structured() {
        let llm = Arc::new(
            ScriptedLlmClient::new()
                .on("matches this JSON Schema", VALID)
                .on_sequence(
                    "Assess the quality",
                    vec![Err(LlmError::Transient("timeout".into()))],
                ),
        );
        let outcome = stage(llm, 3).run("rust", &evidence()).await;
        assert_eq!(outcome.status(), "failed");
        assert!(outcome.structured().is_some());
        assert!(outcome.quality().is_none());
    }

    #[tokio::test]
    async fn test_evidence_is_truncated() {
        let llm = Arc::new(ScriptedLlmClient::new());
        let stage = AnalysisStage::new(llm, RetryPolicy::no_retry(), 10);
        let ev = EvidenceBundle {
            text: "z".repeat(100),
            sources: vec![],
            has_data: true,
        };
        assert_eq!(stage.truncated_evidence(&ev).len(), 10);
    }
}
