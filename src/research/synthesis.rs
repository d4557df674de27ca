//! 综合阶段：把查询、证据、分析结果与历史上下文合成一份结构化回答
//!
//! 生成后确定性地追加来源列表；LLM 失败时回退为工具循环的原始输出。

use std::sync::Arc;

use crate::config::SynthesisSection;
use crate::core::ResearchError;
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::research::AnalysisOutcome;

const SYNTHESIZER_PROMPT: &str = "You are an excellent AI research synthesizer.

Task: combine all research findings into one complete, coherent response.

Guidelines:
1. Integrate information from multiple sources smoothly.
2. Highlight key insights and important findings.
3. Acknowledge uncertainties and conflicting information.
4. Structure the response clearly with headings.
5. Cite sources when referencing specific facts.
6. End with actionable insights or recommendations.

Format:
- Executive Summary (2-3 sentences)
- Main Findings (organized by themes)
- Analysis & Insights
- Limitations & Gaps
- Recommendations
- Sources";

/// 综合阶段的输入
#[derive(Debug, Clone, Copy)]
pub struct SynthesisInput<'a> {
    pub query: &'a str,
    pub evidence: &'a str,
    pub analysis: &'a AnalysisOutcome,
    pub past_context: &'a str,
    pub sources: &'a [String],
    /// 工具循环的原始回答，失败时作为回退
    pub raw_output: &'a str,
}

pub struct SynthesisStage {
    llm: Arc<dyn LlmClient>,
    config: SynthesisSection,
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

impl SynthesisStage {
    pub fn new(llm: Arc<dyn LlmClient>, config: SynthesisSection) -> Self {
        Self { llm, config }
    }

    fn build_messages(&self, input: &SynthesisInput<'_>) -> [Message; 2] {
        let analysis = input
            .analysis
            .structured()
            .and_then(|s| serde_json::to_string_pretty(s).ok())
            .unwrap_or_else(|| "{}".to_string());
        let quality = input.analysis.quality().unwrap_or("");
        let past_context = if input.past_context.trim().is_empty() {
            "None".to_string()
        } else {
            truncate(input.past_context, self.config.max_context_chars)
        };

        [
            Message::system(SYNTHESIZER_PROMPT),
            Message::user(format!(
                "ORIGINAL QUERY: {}\n\nRESEARCH FINDINGS:\n{}\n\nANALYSIS RESULTS:\n{}\n\n\
                 QUALITY ASSESSMENT:\n{}\n\nRELEVANT PAST CONTEXT:\n{}\n\n\
                 Combine everything into one comprehensive answer.",
                input.query,
                truncate(input.evidence, self.config.max_findings_chars),
                analysis,
                quality,
                past_context
            )),
        ]
    }

    /// 追加编号来源列表（最多 max_listed_sources 条）
    fn append_sources(&self, answer: &mut String, sources: &[String]) {
        if sources.is_empty() {
            return;
        }
        answer.push_str("\n\n**Sources:**\n");
        for (i, source) in sources.iter().take(self.config.max_listed_sources).enumerate() {
            answer.push_str(&format!("{}. {}\n", i + 1, source));
        }
    }

    async fn try_synthesize(&self, input: &SynthesisInput<'_>) -> Result<String, ResearchError> {
        let messages = self.build_messages(input);
        let mut answer = self
            .llm
            .complete(&messages)
            .await
            .map_err(|e| ResearchError::Synthesis(e.to_string()))?;
        if answer.trim().is_empty() {
            return Err(ResearchError::Synthesis("empty completion".to_string()));
        }
        self.append_sources(&mut answer, input.sources);
        Ok(answer)
    }

    /// 生成最终回答；失败时返回 raw_output 原文
    pub async fn run(&self, input: SynthesisInput<'_>) -> String {
        match self.try_synthesize(&input).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "synthesis failed, falling back to agent output");
                input.raw_output.to_string()
            }
        }
    }
}
