//! data_analyzer：对文本 / JSON 数据做简单统计

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::tools::Tool;

static NUMBER_RE: OnceLock<Regex> = OnceLock::new();

fn number_re() -> &'static Regex {
    NUMBER_RE.get_or_init(|| Regex::new(r"-?\d+\.?\d*").unwrap())
}

fn statistics(data: &str) -> String {
    let numbers: Vec<f64> = number_re()
        .find_iter(data)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    if numbers.is_empty() {
        return "No numerical data found".to_string();
    }
    let sum: f64 = numbers.iter().sum();
    let min = numbers.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = numbers.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    serde_json::json!({
        "count": numbers.len(),
        "mean": sum / numbers.len() as f64,
        "min": min,
        "max": max,
        "sum": sum,
    })
    .to_string()
}

fn summary(data: &str) -> String {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::Array(items)) => format!("Data structure: array, Size: {}", items.len()),
        Ok(Value::Object(map)) => format!("Data structure: object, Size: {}", map.len()),
        _ => format!("Text length: {} characters", data.chars().count()),
    }
}

#[derive(Debug, Default)]
pub struct DataAnalyzerTool;

#[async_trait]
impl Tool for DataAnalyzerTool {
    fn name(&self) -> &str {
        "data_analyzer"
    }

    fn description(&self) -> &str {
        "Analyze numeric or textual data (JSON, CSV or text). analysis_type: 'statistics' (count/mean/min/max/sum of numbers) or 'summary' (structure and size)."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "data": {"type": "string", "description": "data to analyze"},
                "analysis_type": {"type": "string", "enum": ["statistics", "trends", "comparison", "summary"]}
            },
            "required": ["data", "analysis_type"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let data = match args.get("data") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => return Err("Missing data".to_string()),
        };
        let analysis_type = args
            .get("analysis_type")
            .and_then(Value::as_str)
            .unwrap_or("summary");

        Ok(match analysis_type {
            "statistics" => statistics(&data),
            "summary" => summary(&data),
            _ => format!("Analyzed {} characters of data", data.chars().count()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_statistics() {
        let out = DataAnalyzerTool
            .execute(serde_json::json!({"data": "growth 10, 20 and -6", "analysis_type": "statistics"}))
            .await
            .unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["count"], 3);
        assert_eq!(v["sum"], 24.0);
        assert_eq!(v["min"], -6.0);
        assert_eq!(v["max"], 20.0);
        assert_eq!(v["mean"], 8.0);
    }

    #[tokio::test]
    async fn test_statistics_without_numbers() {
        let out = DataAnalyzerTool
            .execute(serde_json::json!({"data": "no digits", "analysis_type": "statistics"}))
            .await
            .unwrap();
        assert_eq!(out, "No numerical data found");
    }

    #[test]
    fn test_summary_shapes() {
        assert_eq!(summary("[1,2,3]"), "Data structure: array, Size: 3");
        assert_eq!(summary("{\"a\":1}"), "Data structure: object, Size: 1");
        assert_eq!(summary("hello"), "Text length: 5 characters");
    }

    #[tokio::test]
    async fn test_other_analysis_type() {
        let out = DataAnalyzerTool
            .execute(serde_json::json!({"data": "abcd", "analysis_type": "trends"}))
            .await
            .unwrap();
        assert_eq!(out, "Analyzed 4 characters of data");
    }
}
