//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock / Scripted）实现 LlmClient::complete；
//! 错误区分瞬时（可重试）与终止（不可重试）两类。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Message;

/// 补全提供方返回的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// 超时、限流、5xx 等，可重试
    #[error("transient provider error: {0}")]
    Transient(String),

    /// 鉴权失败、请求非法、端点不可达等，不可重试
    #[error("provider error: {0}")]
    Terminal(String),
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Transient(_))
    }
}

/// LLM 客户端 trait：非流式补全
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
