//! web_search：通过 Serper (google.serper.dev) 检索 Google 结果

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::SearchSection;
use crate::tools::http::{build_client, str_arg, truncate_chars};
use crate::tools::Tool;

const SERPER_ENDPOINT: &str = "https://google.serper.dev/search";

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct SerperResponse {
    answer_box: Option<AnswerBox>,
    knowledge_graph: Option<KnowledgeGraph>,
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct AnswerBox {
    answer: Option<String>,
    snippet: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct KnowledgeGraph {
    title: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OrganicResult {
    title: String,
    link: String,
    snippet: String,
}

pub struct WebSearchTool {
    client: Client,
    api_key: Option<String>,
    max_results: usize,
    max_result_chars: usize,
}

impl WebSearchTool {
    pub fn new(config: &SearchSection) -> Self {
        Self {
            client: build_client(config.timeout_secs),
            api_key: config.resolved_serper_key(),
            max_results: config.max_results,
            max_result_chars: config.max_result_chars,
        }
    }
}

fn format_results(resp: &SerperResponse, max_results: usize) -> String {
    let mut out = Vec::new();
    if let Some(answer) = resp
        .answer_box
        .as_ref()
        .and_then(|a| a.answer.clone().or_else(|| a.snippet.clone()))
    {
        out.push(format!("Answer: {answer}"));
    }
    if let Some(kg) = &resp.knowledge_graph {
        if let (Some(title), Some(desc)) = (&kg.title, &kg.description) {
            out.push(format!("{title}: {desc}"));
        }
    }
    for (i, r) in resp.organic.iter().take(max_results).enumerate() {
        out.push(format!("{}. {}\n   {}\n   Link: {}", i + 1, r.title, r.snippet, r.link));
    }
    if out.is_empty() {
        "No good search result found".to_string()
    } else {
        out.join("\n")
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search Google for up-to-date information. Returns top results with snippets and links. Use for recent events or general knowledge."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {"query": {"type": "string", "description": "search query"}},
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let query = str_arg(&args, "query").ok_or_else(|| "Missing query".to_string())?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| "SERPER_API_KEY is not configured".to_string())?;

        tracing::info!(query = %query, "web search");
        let resp = self
            .client
            .post(SERPER_ENDPOINT)
            .header("X-API-KEY", api_key)
            .json(&serde_json::json!({"q": query, "num": self.max_results}))
            .send()
            .await
            .map_err(|e| format!("Request failed: {e}"))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let body: SerperResponse = resp
            .json()
            .await
            .map_err(|e| format!("Invalid response: {e}"))?;
        Ok(truncate_chars(
            &format_results(&body, self.max_results),
            self.max_result_chars,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_results() {
        let resp: SerperResponse = serde_json::from_value(serde_json::json!({
            "answerBox": {"answer": "42"},
            "organic": [
                {"title": "A", "link": "https://a.org", "snippet": "first"},
                {"title": "B", "link": "https://b.org", "snippet": "second"}
            ]
        }))
        .unwrap();
        let text = format_results(&resp, 1);
        assert!(text.starts_with("Answer: 42"));
        assert!(text.contains("1. A\n   first\n   Link: https://a.org"));
        assert!(!text.contains("b.org"));
    }

    #[tokio::test]
    async fn test_missing_key_is_error() {
        let tool = WebSearchTool {
            client: build_client(1),
            api_key: None,
            max_results: 5,
            max_result_chars: 100,
        };
        let err = tool.execute(serde_json::json!({"query": "rust"})).await.unwrap_err();
        assert!(err.contains("SERPER_API_KEY"));
    }
}
