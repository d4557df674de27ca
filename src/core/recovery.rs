//! 错误恢复引擎
//!
//! 根据 ResearchError 类型返回 RecoveryAction，供工具调用循环决定是把错误作为 Observation 继续，还是终止。

use crate::core::{RecoveryAction, ResearchError};

/// 可解析的工具调用格式示例，写入解析失败的 Observation
const TOOL_CALL_HINT: &str =
    r#"To call a tool reply with only {"tool": "<name>", "args": {...}}; otherwise reply with the final answer as plain text."#;

/// 语义化错误恢复：工具与解析错误降级为 Observation，其余终止
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &ResearchError) -> RecoveryAction {
        match err {
            ResearchError::ToolExecutionFailed(msg) => RecoveryAction::Observe(format!("Error: {msg}")),
            ResearchError::ToolTimeout(tool) => {
                RecoveryAction::Observe(format!("Error: tool '{tool}' timed out"))
            }
            ResearchError::UnknownTool(tool) => RecoveryAction::Observe(format!(
                "Error: '{tool}' is not a valid tool, choose one of the available tools"
            )),
            ResearchError::Parse(raw) => RecoveryAction::Observe(format!(
                "Could not parse LLM output: {raw}. {TOOL_CALL_HINT}"
            )),
            _ => RecoveryAction::Abort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;

    #[test]
    fn test_recovery_parse_error() {
        let engine = RecoveryEngine::new();
        let action = engine.handle(&ResearchError::Parse("{tool: }".to_string()));
        match action {
            RecoveryAction::Observe(msg) => {
                assert!(msg.starts_with("Could not parse"));
                assert!(msg.contains("\"tool\""));
            }
            _ => panic!("Expected Observe"),
        }
    }

    #[test]
    fn test_recovery_tool_failure() {
        let engine = RecoveryEngine::new();
        let action = engine.handle(&ResearchError::ToolExecutionFailed("404".to_string()));
        assert_eq!(action, RecoveryAction::Observe("Error: 404".to_string()));
    }

    #[test]
    fn test_recovery_unknown_tool() {
        let engine = RecoveryEngine::new();
        let action = engine.handle(&ResearchError::UnknownTool("fake_tool".to_string()));
        assert!(matches!(action, RecoveryAction::Observe(m) if m.contains("fake_tool")));
    }

    #[test]
    fn test_recovery_llm_error_aborts() {
        let engine = RecoveryEngine::new();
        let err = ResearchError::Llm(LlmError::Terminal("unreachable".to_string()));
        assert_eq!(engine.handle(&err), RecoveryAction::Abort);
    }
}
