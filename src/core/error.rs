//! 研究流水线错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：工具错误、解析错误在循环内转为 Observation 继续；
//! 仅 AgentExecution（如 LLM 不可达）会终止整个流水线。

use thiserror::Error;

use crate::llm::LlmError;

/// 流水线各阶段可能出现的错误
#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// 规划输出无法解析为工具调用
    #[error("Parse error: {0}")]
    Parse(String),

    /// 循环级失败，致命
    #[error("Agent execution failed: {0}")]
    AgentExecution(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    /// 结构化输出未通过 schema 校验（可重试）
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("Memory read failed: {0}")]
    MemoryRead(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl ResearchError {
    /// 是否值得重试：校验失败与瞬时 LLM 错误可重试，其余不可
    pub fn is_retryable(&self) -> bool {
        match self {
            ResearchError::Validation(_) => true,
            ResearchError::Llm(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 将文本作为 Observation 写回上下文，循环继续
    Observe(String),
    /// 终止当前循环
    Abort,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ResearchError::Validation("bad json".into()).is_retryable());
        assert!(ResearchError::Llm(LlmError::Transient("503".into())).is_retryable());
        assert!(!ResearchError::Llm(LlmError::Terminal("401".into())).is_retryable());
        assert!(!ResearchError::AgentExecution("down".into()).is_retryable());
    }
}
