//! 工具调用 JSON Schema（schemars 生成），注入 planner 的 system prompt

use schemars::{schema_for, JsonSchema};

/// 与 planner 解析的 `{"tool": "...", "args": {...}}` 一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallFormat {
    /// 工具名，如 web_search、wikipedia、arxiv_search
    pub tool: String,
    /// 工具参数对象，字段依工具的 args schema 而定
    pub args: serde_json::Map<String, serde_json::Value>,
}

pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(ToolCallFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_has_tool_and_args() {
        let s = tool_call_schema_json();
        assert!(s.contains("\"tool\""));
        assert!(s.contains("\"args\""));
    }
}
