//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock / Scripted）、结构化输出、嵌入

pub mod embedding;
pub mod mock;
pub mod openai;
pub mod structured;
pub mod traits;

pub use embedding::{create_embedder_from_config, EmbeddingProvider, KeywordEmbedder, OpenAiEmbedder};
pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use structured::{complete_structured, parse_structured, schema_json, StructuredOutput};
pub use traits::{LlmClient, LlmError};
