//! 研究过程事件：供 CLI 等前端展示思考、工具调用、观察与阶段切换

use serde::Serialize;

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResearchEvent {
    /// 开始一次研究
    Started { query: String },
    /// 工具循环步数更新
    StepUpdate { step: usize, max_steps: usize },
    /// 正在调用 LLM 规划
    Thinking,
    /// 规划输出（预览）
    ThinkingContent { text: String },
    ToolCall {
        tool: String,
        args: serde_json::Value,
    },
    /// 工具返回（预览，避免过长）
    Observation { tool: String, preview: String },
    ToolFailure { tool: String, reason: String },
    /// 错误恢复动作（Observe / Abort）
    Recovery { action: String, detail: String },
    /// 工具循环因步数或时间上限提前结束
    LoopStopped { reason: String, iterations: usize },
    /// 流水线阶段切换：extract / analysis / synthesis / memory
    Stage { name: String },
    /// 分析阶段结束（completed / failed / skipped）
    AnalysisFinished { status: String },
    Completed { execution_time: f64 },
    /// 致命错误
    Error { text: String },
}

/// 可选通道上发送事件，接收端关闭时静默丢弃
pub fn send_event(
    tx: Option<&tokio::sync::mpsc::UnboundedSender<ResearchEvent>>,
    ev: ResearchEvent,
) {
    if let Some(t) = tx {
        let _ = t.send(ev);
    }
}

/// 按字符截断预览
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let v = serde_json::to_value(ResearchEvent::Observation {
            tool: "wikipedia".into(),
            preview: "Page: Rust".into(),
        })
        .unwrap();
        assert_eq!(v["type"], "observation");
        assert_eq!(v["tool"], "wikipedia");
    }

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("你好世界", 2), "你好...");
        assert_eq!(preview("short", 10), "short");
    }
}
