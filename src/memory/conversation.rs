//! 短期记忆：对话消息与最近 K 轮交互窗口
//!
//! 每轮交互为一个 (input, output) 对，窗口满时淘汰最旧的一轮。

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 一轮交互
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub input: String,
    pub output: String,
}

impl ConversationTurn {
    /// 展开为 user + assistant 两条消息，供 planner 作为对话历史
    pub fn to_messages(&self) -> [Message; 2] {
        [
            Message::user(self.input.clone()),
            Message::assistant(self.output.clone()),
        ]
    }
}

/// 最近 K 轮交互；K = 0 时不保留任何历史
#[derive(Clone, Debug)]
pub struct ShortTermMemory {
    turns: VecDeque<ConversationTurn>,
    window: usize,
}

impl ShortTermMemory {
    pub fn new(window: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(window),
            window,
        }
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.window {
            self.turns.pop_front();
        }
    }

    /// 时间顺序（旧 -> 新）
    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
