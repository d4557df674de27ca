//! Mock / Scripted LLM 客户端（无需 API）
//!
//! MockLlmClient 按提示词中的阶段标记给出固定回答，保证离线也能跑通整条研究流水线；
//! ScriptedLlmClient 供测试使用：按子串规则返回预置的成功 / 失败序列，并记录调用次数。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, Role};

/// 离线客户端：不调用工具，直接根据提示词阶段回答
#[derive(Debug, Default)]
pub struct MockLlmClient;

fn last_user(messages: &[Message]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("(no input)")
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let joined: String = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if joined.contains("JSON Schema") && joined.contains("key_findings") {
            return Ok(serde_json::json!({
                "key_findings": ["Offline mode: no live data was gathered"],
                "data_quality": "low",
                "confidence_score": 0.2,
                "recommendations": ["Set OPENAI_API_KEY to enable live research"],
                "sources_used": []
            })
            .to_string());
        }
        if joined.contains("Assess the quality") {
            return Ok("Overall quality: Low. Offline mode, no external sources.".to_string());
        }
        if joined.contains("Progressively summarize") {
            let preview: String = last_user(messages).chars().take(160).collect();
            return Ok(format!("Conversation so far: {preview}"));
        }

        Ok(format!(
            "(offline mock) No live model is configured, so no research was performed for: {}",
            last_user(messages)
        ))
    }
}

struct Rule {
    pattern: String,
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: AtomicUsize,
}

/// 规则驱动的测试客户端
///
/// 将全部消息内容拼接后按注册顺序匹配第一个包含 pattern 的规则；
/// 每条规则的响应队列依次弹出，最后一项会被重复返回。无规则命中时返回 fallback。
pub struct ScriptedLlmClient {
    rules: Vec<Rule>,
    fallback: String,
    total_calls: AtomicUsize,
}

impl Default for ScriptedLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            fallback: "OK".to_string(),
            total_calls: AtomicUsize::new(0),
        }
    }

    /// 命中 pattern 时固定返回 text
    pub fn on(self, pattern: impl Into<String>, text: impl Into<String>) -> Self {
        self.on_sequence(pattern, vec![Ok(text.into())])
    }

    /// 命中 pattern 时按顺序返回 responses（最后一项重复）
    pub fn on_sequence(
        mut self,
        pattern: impl Into<String>,
        responses: Vec<Result<String, LlmError>>,
    ) -> Self {
        self.rules.push(Rule {
            pattern: pattern.into(),
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        });
        self
    }

    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = text.into();
        self
    }

    /// 某条规则被命中的次数
    pub fn calls_for(&self, pattern: &str) -> usize {
        self.rules
            .iter()
            .find(|r| r.pattern == pattern)
            .map(|r| r.calls.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        let joined: String = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let Some(rule) = self.rules.iter().find(|r| joined.contains(&r.pattern)) else {
            return Ok(self.fallback.clone());
        };
        rule.calls.fetch_add(1, Ordering::SeqCst);

        let mut queue = rule
            .responses
            .lock()
            .map_err(|_| LlmError::Terminal("scripted client poisoned".to_string()))?;
        match queue.len() {
            0 => Ok(self.fallback.clone()),
            1 => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(self.fallback.clone())),
            _ => queue
                .pop_front()
                .unwrap_or_else(|| Ok(self.fallback.clone())),
        }
    }
}
