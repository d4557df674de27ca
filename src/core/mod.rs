//! 核心层：错误与恢复、重试策略、并发汇合、Agent 构建

pub mod builder;
pub mod error;
pub mod fanout;
pub mod recovery;
pub mod retry;

pub use builder::{create_agent_builder, AgentBuilder};
pub use error::{RecoveryAction, ResearchError};
pub use fanout::{join_settled, Settled};
pub use recovery::RecoveryEngine;
pub use retry::RetryPolicy;
