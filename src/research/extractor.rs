//! 证据提取：把工具调用 trace 整理成分析与综合阶段使用的文本和来源列表

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::react::ToolInvocationRecord;
use crate::research::EvidenceBundle;

/// 短于等于该字符数的观察不计入证据
const MIN_OBSERVATION_CHARS: usize = 50;
const MAX_SOURCES: usize = 10;
pub const NO_DATA: &str = "No data collected";

static URL_RE: OnceLock<Regex> = OnceLock::new();

fn url_re() -> &'static Regex {
    URL_RE.get_or_init(|| Regex::new(r#"https?://[^\s<>"'`{}|\\^\[\]]+"#).unwrap())
}

/// 去掉句末标点与不成对的右括号
fn clean_url(raw: &str) -> &str {
    let mut url = raw;
    loop {
        let trimmed = url.trim_end_matches(&['.', ',', ';', ':', '!', '?'][..]);
        let trimmed = if trimmed.ends_with(')')
            && trimmed.matches(')').count() > trimmed.matches('(').count()
        {
            &trimmed[..trimmed.len() - 1]
        } else {
            trimmed
        };
        if trimmed.len() == url.len() {
            return url;
        }
        url = trimmed;
    }
}

pub fn extract_urls(text: &str) -> Vec<&str> {
    url_re()
        .find_iter(text)
        .map(|m| clean_url(m.as_str()))
        .filter(|u| u.len() > "https://".len())
        .collect()
}

/// 插入有序去重集合
#[derive(Default)]
struct OrderedSet {
    items: Vec<String>,
    seen: HashSet<String>,
}

impl OrderedSet {
    fn insert(&mut self, item: &str) {
        if self.seen.insert(item.to_string()) {
            self.items.push(item.to_string());
        }
    }
}

/// 从 trace 中提取证据与来源
pub fn extract(trace: &[ToolInvocationRecord]) -> EvidenceBundle {
    let pieces: Vec<String> = trace
        .iter()
        .filter(|r| r.outcome.text().chars().count() > MIN_OBSERVATION_CHARS)
        .map(|r| format!("[{}]\n{}\n", r.tool_name, r.outcome.text()))
        .collect();

    let mut sources = OrderedSet::default();
    for record in trace {
        for url in extract_urls(record.outcome.text()) {
            sources.insert(url);
        }
        sources.insert(&format!("Tool: {}", record.tool_name));
    }
    let mut sources = sources.items;
    sources.truncate(MAX_SOURCES);

    let has_data = !pieces.is_empty();
    EvidenceBundle {
        text: if has_data {
            pieces.join("\n---\n")
        } else {
            NO_DATA.to_string()
        },
        sources,
        has_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::react::ToolOutcome;

    fn record(tool: &str, text: &str) -> ToolInvocationRecord {
        ToolInvocationRecord {
            tool_name: tool.to_string(),
            arguments: serde_json::Value::Null,
            outcome: ToolOutcome::Observation(text.to_string()),
        }
    }

    #[test]
    fn test_empty_trace() {
        let ev = extract(&[]);
        assert_eq!(ev.text, NO_DATA);
        assert!(!ev.has_data);
        assert!(ev.sources.is_empty());
    }

    #[test]
    fn test_short_observations_are_not_evidence() {
        let ev = extract(&[record("web_search", "nothing found")]);
        assert!(!ev.has_data);
        assert_eq!(ev.text, NO_DATA);
        assert_eq!(ev.sources, vec!["Tool: web_search"]);
    }

    #[test]
    fn test_long_observations_are_tagged_and_joined() {
        let a = "a".repeat(60);
        let b = "b".repeat(51);
        let ev = extract(&[record("wikipedia", &a), record("arxiv_search", &b)]);
        assert!(ev.has_data);
        assert_eq!(ev.text, format!("[wikipedia]\n{a}\n\n---\n[arxiv_search]\n{b}\n"));
    }

    #[test]
    fn test_exactly_fifty_chars_is_excluded() {
        let ev = extract(&[record("t", &"x".repeat(50))]);
        assert!(!ev.has_data);
    }

    #[test]
    fn test_sources_dedup_in_first_seen_order() {
        let ev = extract(&[
            record("web_search", "see https://a.org/x, and https://b.org/y."),
            record("web_search", "again https://a.org/x"),
            record("wikipedia", "URL: https://en.wikipedia.org/wiki/Rust_(programming_language)"),
        ]);
        assert_eq!(
            ev.sources,
            vec![
                "https://a.org/x",
                "https://b.org/y",
                "Tool: web_search",
                "https://en.wikipedia.org/wiki/Rust_(programming_language)",
                "Tool: wikipedia",
            ]
        );
    }

    #[test]
    fn test_sources_capped_at_ten() {
        let urls: Vec<String> = (0..15).map(|i| format!("https://site{i}.com")).collect();
        let ev = extract(&[record("web_search", &urls.join(" "))]);
        assert_eq!(ev.sources.len(), 10);
        assert_eq!(ev.sources[0], "https://site0.com");
    }

    #[test]
    fn test_clean_url_trailing_punctuation() {
        assert_eq!(clean_url("https://a.org/x)."), "https://a.org/x");
        assert_eq!(clean_url("https://a.org/f(x)"), "https://a.org/f(x)");
    }
}
