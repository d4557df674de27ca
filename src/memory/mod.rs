//! 记忆层：短期窗口、滚动摘要、长期存储与语义索引

pub mod conversation;
pub mod hybrid;
pub mod index;
pub mod long_term;
pub mod summary;
pub mod tokenizer;

pub use conversation::{ConversationTurn, Message, Role, ShortTermMemory};
pub use hybrid::{HybridMemory, MemoryStats};
pub use index::{cosine_similarity, IndexStrategy, ScoredDoc, SemanticIndex};
pub use long_term::{LongTermStore, MemoryRecord};
pub use summary::RollingSummary;
