//! 结构化输出：schemars 生成 JSON Schema 注入提示词，返回文本解析为强类型并校验
//!
//! 解析或校验失败返回 ResearchError::Validation（可重试），提供方错误返回 ResearchError::Llm。

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;

use crate::core::ResearchError;
use crate::llm::LlmClient;
use crate::memory::Message;

/// 可由 LLM 直接产出的结构体：反序列化后再做业务校验
pub trait StructuredOutput: DeserializeOwned + JsonSchema {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// 返回 T 的 JSON Schema 字符串
pub fn schema_json<T: JsonSchema>() -> String {
    let schema = schema_for!(T);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// 从模型输出中取出 JSON 主体（```json 代码块或首个 { 到最后一个 }）
pub fn extract_json_block(output: &str) -> Option<&str> {
    let trimmed = output.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

/// 解析并校验模型输出
pub fn parse_structured<T: StructuredOutput>(output: &str) -> Result<T, ResearchError> {
    let json = extract_json_block(output)
        .ok_or_else(|| ResearchError::Validation("no JSON object in output".to_string()))?;
    let value: T = serde_json::from_str(json)
        .map_err(|e| ResearchError::Validation(format!("{e}: {json}")))?;
    value.validate().map_err(ResearchError::Validation)?;
    Ok(value)
}

/// 单次结构化调用：在消息末尾追加 schema 约束，调用 LLM 并解析
pub async fn complete_structured<T: StructuredOutput>(
    llm: &dyn LlmClient,
    messages: &[Message],
) -> Result<T, ResearchError> {
    let mut full = messages.to_vec();
    full.push(Message::system(format!(
        "Respond with a single JSON object that matches this JSON Schema. Output only the JSON.\n{}",
        schema_json::<T>()
    )));
    let output = llm.complete(&full).await?;
    parse_structured(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Score {
        value: f32,
    }

    impl StructuredOutput for Score {
        fn validate(&self) -> Result<(), String> {
            if (0.0..=1.0).contains(&self.value) {
                Ok(())
            } else {
                Err(format!("value {} out of range", self.value))
            }
        }
    }

    #[test]
    fn test_extract_fenced_json() {
        let out = "Here you go:\n```json\n{\"value\": 0.5}\n```\nthanks";
        assert_eq!(extract_json_block(out), Some("{\"value\": 0.5}"));
    }

    #[test]
    fn test_parse_valid() {
        let s: Score = parse_structured("{\"value\": 0.25}").unwrap();
        assert!((s.value - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        let err = parse_structured::<Score>("{\"value\": 85}").unwrap_err();
        assert!(matches!(err, ResearchError::Validation(_)));
    }

    #[test]
    fn test_parse_rejects_prose() {
        let err = parse_structured::<Score>("I cannot answer that").unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_schema_mentions_fields() {
        assert!(schema_json::<Score>().contains("value"));
    }
}
