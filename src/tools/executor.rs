//! 工具执行器
//!
//! 持有 ToolRegistry 与单次调用超时；未知工具、超时、工具失败分别映射为 ResearchError，
//! 每次调用输出一条结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::ResearchError;
use crate::tools::ToolRegistry;

pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 执行指定工具并输出审计日志
    pub async fn execute(
        &self,
        tool_name: &str,
        args: serde_json::Value,
    ) -> Result<String, ResearchError> {
        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| ResearchError::UnknownTool(tool_name.to_string()))?;

        let start = Instant::now();
        let args_preview = args_preview(&args);
        let result = timeout(self.timeout, tool.execute(args)).await;

        let (ok, outcome) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit, "tool");

        match result {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(e)) => Err(ResearchError::ToolExecutionFailed(e)),
            Err(_) => Err(ResearchError::ToolTimeout(tool_name.to_string())),
        }
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use async_trait::async_trait;
    use serde_json::Value;

    struct Slow;

    #[async_trait]
    impl Tool for Slow {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "sleeps"
        }
        async fn execute(&self, _args: Value) -> Result<String, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".into())
        }
    }

    struct Failing;

    #[async_trait]
    impl Tool for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn description(&self) -> &str {
            "always fails"
        }
        async fn execute(&self, _args: Value) -> Result<String, String> {
            Err("HTTP 503".into())
        }
    }

    fn executor(timeout_secs: u64) -> ToolExecutor {
        let mut reg = ToolRegistry::new();
        reg.register(Slow);
        reg.register(Failing);
        ToolExecutor::new(Arc::new(reg), timeout_secs)
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = executor(1).execute("nope", Value::Null).await.unwrap_err();
        assert!(matches!(err, ResearchError::UnknownTool(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_tool_failure_mapped() {
        let err = executor(1).execute("failing", Value::Null).await.unwrap_err();
        assert!(matches!(err, ResearchError::ToolExecutionFailed(msg) if msg == "HTTP 503"));
    }

    #[tokio::test]
    async fn test_timeout_mapped() {
        let err = executor(1).execute("slow", Value::Null).await.unwrap_err();
        assert!(matches!(err, ResearchError::ToolTimeout(name) if name == "slow"));
    }
}
