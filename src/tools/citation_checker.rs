//! citation_checker：基于来源特征的启发式可信度评估

use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;

use crate::tools::Tool;

const RELIABLE_DOMAINS: [&str; 4] = ["edu", "gov", "org", "ac.uk"];
const RESEARCH_MARKERS: [&str; 4] = ["study", "research", "journal", "published"];

/// 基础分 0.5；可信域名 +0.2，研究性关键词 +0.15，声明含数字 +0.1，上限 1.0
fn confidence(claim: &str, source: &str) -> f32 {
    let source = source.to_lowercase();
    let mut score: f32 = 0.5;
    if RELIABLE_DOMAINS.iter().any(|d| source.contains(d)) {
        score += 0.2;
    }
    if RESEARCH_MARKERS.iter().any(|w| source.contains(w)) {
        score += 0.15;
    }
    if claim.chars().any(|c| c.is_ascii_digit()) {
        score += 0.1;
    }
    score.min(1.0)
}

fn reliability(score: f32) -> &'static str {
    if score > 0.7 {
        "high"
    } else if score > 0.4 {
        "medium"
    } else {
        "low"
    }
}

#[derive(Debug, Default)]
pub struct CitationCheckerTool;

#[async_trait]
impl Tool for CitationCheckerTool {
    fn name(&self) -> &str {
        "citation_checker"
    }

    fn description(&self) -> &str {
        "Assess how reliable a claim is given its source. Returns a confidence score (0-1) and a reliability label."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "claim": {"type": "string", "description": "statement to check"},
                "source": {"type": "string", "description": "where the statement comes from (URL or citation)"}
            },
            "required": ["claim", "source"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let claim = args.get("claim").and_then(Value::as_str).unwrap_or("").trim();
        let source = args.get("source").and_then(Value::as_str).unwrap_or("").trim();
        if claim.is_empty() || source.is_empty() {
            return Err("Missing claim or source".to_string());
        }

        let score = confidence(claim, source);
        Ok(serde_json::json!({
            "confidence": score,
            "source": source,
            "claim": claim,
            "reliability": reliability(score),
            "timestamp": Local::now().to_rfc3339(),
        })
        .to_string())
    }
}
