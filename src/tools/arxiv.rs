//! arxiv_search：查询 export.arxiv.org Atom 接口，返回前 3 篇论文的元数据与摘要

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;

use crate::tools::http::{build_client, str_arg, truncate_chars};
use crate::tools::Tool;

const ARXIV_ENDPOINT: &str = "http://export.arxiv.org/api/query";
const TOP_K: usize = 3;

#[derive(Debug, Clone, PartialEq)]
struct Paper {
    published: String,
    title: String,
    authors: Vec<String>,
    summary: String,
    link: String,
}

static ENTRY_RE: OnceLock<Regex> = OnceLock::new();
static AUTHOR_RE: OnceLock<Regex> = OnceLock::new();

fn entry_re() -> &'static Regex {
    ENTRY_RE.get_or_init(|| Regex::new(r"(?s)<entry>(.*?)</entry>").unwrap())
}

fn author_re() -> &'static Regex {
    AUTHOR_RE.get_or_init(|| Regex::new(r"(?s)<name>(.*?)</name>").unwrap())
}

fn tag(entry: &str, name: &str) -> String {
    let open = format!("<{name}>");
    let close = format!("</{name}>");
    entry
        .find(&open)
        .and_then(|start| {
            let rest = &entry[start + open.len()..];
            rest.find(&close).map(|end| &rest[..end])
        })
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

fn parse_feed(xml: &str) -> Vec<Paper> {
    entry_re()
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|m| {
            let entry = m.as_str();
            Paper {
                published: tag(entry, "published").chars().take(10).collect(),
                title: tag(entry, "title"),
                authors: author_re()
                    .captures_iter(entry)
                    .filter_map(|a| a.get(1).map(|n| n.as_str().trim().to_string()))
                    .collect(),
                summary: tag(entry, "summary"),
                link: tag(entry, "id"),
            }
        })
        .take(TOP_K)
        .collect()
}

fn format_paper(p: &Paper) -> String {
    format!(
        "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}\nLink: {}",
        p.published,
        p.title,
        p.authors.join(", "),
        p.summary,
        p.link
    )
}

pub struct ArxivTool {
    client: Client,
    max_result_chars: usize,
}

impl ArxivTool {
    pub fn new(timeout_secs: u64, max_result_chars: usize) -> Self {
        Self {
            client: build_client(timeout_secs),
            max_result_chars,
        }
    }
}

#[async_trait]
impl Tool for ArxivTool {
    fn name(&self) -> &str {
        "arxiv_search"
    }

    fn description(&self) -> &str {
        "Search scientific papers on arXiv. Returns title, authors, summary and link for relevant papers. Use for research papers and scientific studies."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {"query": {"type": "string", "description": "keywords or research topic"}},
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let query = str_arg(&args, "query").ok_or_else(|| "Missing query".to_string())?;
        let search = format!("all:{query}");
        let max = TOP_K.to_string();
        let body = self
            .client
            .get(ARXIV_ENDPOINT)
            .query(&[
                ("search_query", search.as_str()),
                ("start", "0"),
                ("max_results", max.as_str()),
            ])
            .send()
            .await
            .map_err(|e| format!("Request failed: {e}"))?
            .text()
            .await
            .map_err(|e| format!("Read body: {e}"))?;

        let papers = parse_feed(&body);
        if papers.is_empty() {
            return Ok("No good Arxiv Result was found".to_string());
        }
        let text = papers.iter().map(format_paper).collect::<Vec<_>>().join("\n\n");
        Ok(truncate_chars(&text, self.max_result_chars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/2401.00001v1</id>
    <published>2024-01-01T00:00:00Z</published>
    <title>Fault-tolerant
      quantum computing</title>
    <summary>  We show a thing.  </summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed() {
        let papers = parse_feed(FEED);
        assert_eq!(papers.len(), 1);
        let p = &papers[0];
        assert_eq!(p.title, "Fault-tolerant quantum computing");
        assert_eq!(p.published, "2024-01-01");
        assert_eq!(p.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(p.link, "http://arxiv.org/abs/2401.00001v1");
        assert!(format_paper(p).contains("Summary: We show a thing."));
    }

    #[test]
    fn test_empty_feed() {
        assert!(parse_feed("<feed></feed>").is_empty());
    }
}
