//! Planner：组装 system prompt、调用 LLM、解析工具调用
//!
//! 输出为 JSON `{"tool": "...", "args": {...}}`（可包在 ```json 代码块中）时视为工具调用，
//! 其余文本视为最终回答。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::ResearchError;
use crate::llm::{LlmClient, LlmError};
use crate::memory::Message;
use crate::tools::{tool_call_schema_json, ToolRegistry};

/// 默认研究助手提示词
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional AI research assistant.

Workflow:
1. Understand the question and decide its scope.
2. Plan which tools to use and in which order.
3. Gather information from several sources (web, Wikipedia, academic papers).
4. Evaluate and compare what you found.
5. Answer with a complete, well-sourced response.

Rules:
- Cite sources for specific claims.
- Say so when information is uncertain.
- Compare multiple sources when possible.
- Separate facts from opinions.
- Suggest further research when needed.

Tool usage tips:
- web_search: current events, general information
- wikipedia: background and overviews
- arxiv_search: scientific research
- web_scraper: detailed content from a specific URL
- data_analyzer: numerical analysis
- citation_checker: verification";

/// LLM 返回的工具调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Planner 输出
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerOutput {
    /// 最终回答
    Response(String),
    ToolCall(ToolCall),
}

/// 解析 LLM 输出
///
/// 仅在 ```json 代码块或以 `{` 开头的文本中尝试提取工具调用，其余文本一律视为最终回答；
/// 提取到 JSON 但无法解析时返回 ResearchError::Parse。
pub fn parse_llm_output(output: &str) -> Result<PlannerOutput, ResearchError> {
    let trimmed = output.trim();

    let json_str = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        rest.find("```")
            .map(|end| rest[..end].trim())
            .unwrap_or(rest.trim())
    } else if trimmed.starts_with('{') {
        match trimmed.rfind('}') {
            Some(end) => &trimmed[..=end],
            None => trimmed,
        }
    } else {
        return Ok(PlannerOutput::Response(trimmed.to_string()));
    };

    let parsed: ToolCall = serde_json::from_str(json_str)
        .map_err(|e| ResearchError::Parse(format!("{e}: {json_str}")))?;

    if parsed.tool.trim().is_empty() {
        Ok(PlannerOutput::Response(trimmed.to_string()))
    } else {
        Ok(PlannerOutput::ToolCall(parsed))
    }
}

/// 持有 LLM 与拼好的 system prompt（基础提示词 + 工具清单 + 调用格式）
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, base_prompt: &str, registry: &ToolRegistry) -> Self {
        let system_prompt = format!(
            "{base_prompt}\n\nAvailable tools:\n{}\n\nTool call format (JSON Schema):\n{}\n\n\
             To use a tool, reply with only a JSON object {{\"tool\": \"<name>\", \"args\": {{...}}}}. \
             Tool results come back as observations. When you have enough information, \
             reply with the final answer as plain text.",
            registry.describe_for_prompt(),
            tool_call_schema_json()
        );
        Self { llm, system_prompt }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub async fn plan(&self, messages: &[Message]) -> Result<String, LlmError> {
        let mut full = Vec::with_capacity(messages.len() + 1);
        full.push(Message::system(self.system_prompt.clone()));
        full.extend_from_slice(messages);
        self.llm.complete(&full).await
    }
}
