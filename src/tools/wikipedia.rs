//! wikipedia：MediaWiki 搜索 + REST summary，返回前几个词条的摘要

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::tools::http::{build_client, str_arg, truncate_chars};
use crate::tools::Tool;

const API_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";
const SUMMARY_ENDPOINT: &str = "https://en.wikipedia.org/api/rest_v1/page/summary/";
const TOP_K: usize = 3;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: SearchQuery,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PageSummary {
    title: String,
    extract: String,
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: PageUrl,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: String,
}

pub struct WikipediaTool {
    client: Client,
    max_result_chars: usize,
}

impl WikipediaTool {
    pub fn new(timeout_secs: u64, max_result_chars: usize) -> Self {
        Self {
            client: build_client(timeout_secs),
            max_result_chars,
        }
    }

    async fn search_titles(&self, query: &str) -> Result<Vec<String>, String> {
        let resp: SearchResponse = self
            .client
            .get(API_ENDPOINT)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("format", "json"),
                ("srsearch", query),
                ("srlimit", "3"),
            ])
            .send()
            .await
            .map_err(|e| format!("Request failed: {e}"))?
            .json()
            .await
            .map_err(|e| format!("Invalid search response: {e}"))?;
        Ok(resp.query.search.into_iter().map(|h| h.title).take(TOP_K).collect())
    }

    async fn summary(&self, title: &str) -> Result<PageSummary, String> {
        let mut url = Url::parse(SUMMARY_ENDPOINT).map_err(|e| e.to_string())?;
        url.path_segments_mut()
            .map_err(|_| "invalid summary endpoint".to_string())?
            .pop_if_empty()
            .push(&title.replace(' ', "_"));
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Request failed: {e}"))?
            .json()
            .await
            .map_err(|e| format!("Invalid summary response: {e}"))
    }
}

fn format_page(page: &PageSummary) -> String {
    let mut s = format!("Page: {}\nSummary: {}", page.title, page.extract.trim());
    if let Some(urls) = &page.content_urls {
        s.push_str(&format!("\nURL: {}", urls.desktop.page));
    }
    s
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "Look up a topic, person or event on Wikipedia. Returns page summaries. Good for background and overviews."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {"query": {"type": "string", "description": "topic or keywords"}},
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let query = str_arg(&args, "query").ok_or_else(|| "Missing query".to_string())?;
        let titles = self.search_titles(&query).await?;
        if titles.is_empty() {
            return Ok("No good Wikipedia Search Result was found".to_string());
        }
        let mut pages = Vec::new();
        for title in &titles {
            match self.summary(title).await {
                Ok(page) if !page.extract.trim().is_empty() => pages.push(format_page(&page)),
                Ok(_) => {}
                Err(e) => tracing::debug!(title = %title, error = %e, "wikipedia summary skipped"),
            }
        }
        if pages.is_empty() {
            return Ok("No good Wikipedia Search Result was found".to_string());
        }
        Ok(truncate_chars(&pages.join("\n\n"), self.max_result_chars))
    }
}
