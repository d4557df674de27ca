//! web_scraper：抓取指定 URL，提取可读文本或链接列表
//!
//! GET 请求带超时与 User-Agent；HTML 用 html2text 转文本，结果按字符数截断。

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;

use crate::tools::http::{build_client, html_to_text, looks_like_html, str_arg, truncate_chars};
use crate::tools::Tool;

const MAX_LINKS: usize = 50;

static HREF_RE: OnceLock<Regex> = OnceLock::new();

fn href_re() -> &'static Regex {
    HREF_RE.get_or_init(|| Regex::new(r#"(?i)<a\s[^>]*href\s*=\s*["']([^"']+)["']"#).unwrap())
}

/// 页面中的 <a href> 列表（最多 MAX_LINKS 个）
fn extract_links(html: &str) -> Vec<String> {
    href_re()
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .take(MAX_LINKS)
        .collect()
}

pub struct WebScraperTool {
    client: Client,
    max_result_chars: usize,
}

impl WebScraperTool {
    pub fn new(timeout_secs: u64, max_result_chars: usize) -> Self {
        Self {
            client: build_client(timeout_secs),
            max_result_chars,
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, String> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("Invalid URL: {url}"));
        }
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Error scraping {url}: {e}"))?;
        if !resp.status().is_success() {
            return Err(format!("Error scraping {url}: HTTP {}", resp.status()));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| format!("Error scraping {url}: {e}"))?;
        Ok(body.trim_start_matches('\u{FEFF}').to_string())
    }
}

#[async_trait]
impl Tool for WebScraperTool {
    fn name(&self) -> &str {
        "web_scraper"
    }

    fn description(&self) -> &str {
        "Scrape content from a specific URL. extract_type is 'text' (readable page text, default) or 'links' (JSON list of hyperlinks)."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "URL to scrape"},
                "extract_type": {"type": "string", "enum": ["text", "links"], "default": "text"}
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let url = str_arg(&args, "url").ok_or_else(|| "Missing url".to_string())?;
        let extract_type = args
            .get("extract_type")
            .and_then(Value::as_str)
            .unwrap_or("text");

        tracing::info!(url = %url, extract_type, "web scraper fetch");
        let body = self.fetch(&url).await?;

        match extract_type {
            "links" => Ok(serde_json::to_string(&extract_links(&body)).unwrap_or_default()),
            _ => {
                let text = if looks_like_html(&body) {
                    html_to_text(&body)
                } else {
                    body
                };
                Ok(truncate_chars(&text, self.max_result_chars))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_links() {
        let html = r#"<p><a href="https://a.org/x">A</a> <A class="c" HREF='/rel'>B</A></p>"#;
        assert_eq!(extract_links(html), vec!["https://a.org/x", "/rel"]);
    }

    #[tokio::test]
    async fn test_rejects_non_http_url() {
        let tool = WebScraperTool::new(1, 100);
        let err = tool
            .execute(serde_json::json!({"url": "file:///etc/passwd"}))
            .await
            .unwrap_err();
        assert!(err.starts_with("Invalid URL"));
    }
}
