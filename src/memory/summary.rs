//! 滚动摘要：每轮交互调用一次 LLM，把新内容折叠进已有摘要

use crate::llm::{LlmClient, LlmError};
use crate::memory::{ConversationTurn, Message};

const SUMMARY_PROMPT: &str = "Progressively summarize the lines of conversation provided, \
adding onto the previous summary and returning a new summary.";

#[derive(Debug, Clone, Default)]
pub struct RollingSummary {
    text: String,
}

impl RollingSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// 折叠一轮交互；失败时保留原摘要并返回错误
    pub async fn fold(&mut self, llm: &dyn LlmClient, turn: &ConversationTurn) -> Result<(), LlmError> {
        let messages = [
            Message::system(SUMMARY_PROMPT),
            Message::user(format!(
                "Current summary:\n{}\n\nNew lines of conversation:\nHuman: {}\nAI: {}\n\nNew summary:",
                self.text, turn.input, turn.output
            )),
        ];
        let updated = llm.complete(&messages).await?;
        self.text = updated.trim().to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;

    fn turn() -> ConversationTurn {
        ConversationTurn {
            input: "q".into(),
            output: "a".into(),
        }
    }

    #[tokio::test]
    async fn test_fold_replaces_text() {
        let llm = ScriptedLlmClient::new().on("Progressively summarize", "  user asked q  ");
        let mut s = RollingSummary::new();
        s.fold(&llm, &turn()).await.unwrap();
        assert_eq!(s.text(), "user asked q");
    }

    #[tokio::test]
    async fn test_failed_fold_keeps_previous() {
        let llm = ScriptedLlmClient::new().on_sequence(
            "Progressively summarize",
            vec![Ok("first".into()), Err(LlmError::Terminal("down".into()))],
        );
        let mut s = RollingSummary::new();
        s.fold(&llm, &turn()).await.unwrap();
        assert!(s.fold(&llm, &turn()).await.is_err());
        assert_eq!(s.text(), "first");
    }
}
