//! Delve - Rust 研究型智能体
//!
//! 模块划分：
//! - **agent**: 研究编排器（research / get_memory_stats / clear_memory）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误与恢复、重试策略、并发汇合、Agent 构建
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock / Scripted）、结构化输出、嵌入
//! - **memory**: 短期窗口、滚动摘要、长期存储与语义索引
//! - **react**: Planner、工具调用主循环、过程事件
//! - **research**: 证据提取、并发分析、综合回答、结果存档
//! - **tools**: 工具箱（web_search、wikipedia、arxiv_search、web_scraper、data_analyzer、citation_checker）与执行器

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod research;
pub mod tools;

pub use agent::ResearchAgent;
pub use research::{ResearchArtifact, ResearchResult};
