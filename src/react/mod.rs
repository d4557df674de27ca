//! 认知层：Planner、工具调用主循环、过程事件

pub mod events;
pub mod loop_;
pub mod planner;

pub use events::ResearchEvent;
pub use loop_::{AgentLoop, AgentRun, StopReason, ToolInvocationRecord, ToolOutcome};
pub use planner::{parse_llm_output, Planner, PlannerOutput, ToolCall, DEFAULT_SYSTEM_PROMPT};
