//! 工具调用主循环
//!
//! Plan -> Act (Tool) -> Observe -> 下一轮 Plan，直到给出最终回答，或触达最大步数 / 最长执行时间。
//! 工具错误与解析错误经 RecoveryEngine 转为 Observation 继续；只有规划阶段的 LLM 失败会终止循环。
//! 截止时间同时约束规划与工具调用，到点时正在进行的调用被直接丢弃，不写入 trace。

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{timeout_at, Instant};

use crate::core::{RecoveryAction, RecoveryEngine, ResearchError};
use crate::memory::{ConversationTurn, Message};
use crate::react::events::{preview, send_event};
use crate::react::{parse_llm_output, Planner, PlannerOutput, ResearchEvent};
use crate::tools::ToolExecutor;

const OBSERVATION_PREVIEW_CHARS: usize = 200;
const THINKING_PREVIEW_CHARS: usize = 800;

/// 单次工具调用的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum ToolOutcome {
    Observation(String),
    Error(String),
}

impl ToolOutcome {
    pub fn text(&self) -> &str {
        match self {
            ToolOutcome::Observation(t) | ToolOutcome::Error(t) => t,
        }
    }
}

/// trace 中的一条记录，只追加
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocationRecord {
    pub tool_name: String,
    pub arguments: serde_json::Value,
    pub outcome: ToolOutcome,
}

/// 循环结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Finished,
    IterationLimit,
    TimeLimit,
}

impl StopReason {
    fn describe(self) -> &'static str {
        match self {
            StopReason::Finished => "finished",
            StopReason::IterationLimit => "iteration limit",
            StopReason::TimeLimit => "time limit",
        }
    }
}

/// 循环输出：最终（或部分）回答 + 工具调用记录
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub output: String,
    pub trace: Vec<ToolInvocationRecord>,
    pub iterations: usize,
    pub stop_reason: StopReason,
}

pub struct AgentLoop {
    planner: Planner,
    executor: ToolExecutor,
    recovery: RecoveryEngine,
    max_iterations: usize,
    max_execution_time: Duration,
}

impl AgentLoop {
    pub fn new(
        planner: Planner,
        executor: ToolExecutor,
        max_iterations: usize,
        max_execution_time: Duration,
    ) -> Self {
        Self {
            planner,
            executor,
            recovery: RecoveryEngine::new(),
            max_iterations,
            max_execution_time,
        }
    }

    /// 执行一次查询；chat_history 为短期记忆中的历史轮次（旧 -> 新）
    pub async fn run(
        &self,
        query: &str,
        chat_history: &[ConversationTurn],
        event_tx: Option<&UnboundedSender<ResearchEvent>>,
    ) -> Result<AgentRun, ResearchError> {
        let deadline = Instant::now() + self.max_execution_time;
        let mut messages: Vec<Message> = chat_history
            .iter()
            .flat_map(ConversationTurn::to_messages)
            .collect();
        messages.push(Message::user(query.to_string()));

        let mut trace: Vec<ToolInvocationRecord> = Vec::new();
        let mut iterations = 0;
        let mut last_output = String::new();

        let partial = |reason: StopReason,
                       iterations: usize,
                       trace: Vec<ToolInvocationRecord>,
                       last_output: &str| {
            tracing::warn!(reason = reason.describe(), iterations, "agent loop stopped early");
            send_event(
                event_tx,
                ResearchEvent::LoopStopped {
                    reason: reason.describe().to_string(),
                    iterations,
                },
            );
            let mut output = format!(
                "Agent stopped ({}) after {} iterations.",
                reason.describe(),
                iterations
            );
            if !last_output.trim().is_empty() {
                output.push_str("\n\n");
                output.push_str(last_output.trim());
            }
            AgentRun {
                output,
                trace,
                iterations,
                stop_reason: reason,
            }
        };

        loop {
            if iterations >= self.max_iterations {
                return Ok(partial(StopReason::IterationLimit, iterations, trace, &last_output));
            }
            if Instant::now() >= deadline {
                return Ok(partial(StopReason::TimeLimit, iterations, trace, &last_output));
            }

            send_event(
                event_tx,
                ResearchEvent::StepUpdate {
                    step: iterations + 1,
                    max_steps: self.max_iterations,
                },
            );
            send_event(event_tx, ResearchEvent::Thinking);

            let output = match timeout_at(deadline, self.planner.plan(&messages)).await {
                Err(_) => {
                    return Ok(partial(StopReason::TimeLimit, iterations, trace, &last_output))
                }
                Ok(Err(e)) => {
                    send_event(event_tx, ResearchEvent::Error { text: e.to_string() });
                    return Err(ResearchError::AgentExecution(e.to_string()));
                }
                Ok(Ok(o)) => o,
            };
            iterations += 1;
            last_output = output.clone();
            send_event(
                event_tx,
                ResearchEvent::ThinkingContent {
                    text: preview(&output, THINKING_PREVIEW_CHARS),
                },
            );

            match parse_llm_output(&output) {
                Ok(PlannerOutput::Response(answer)) => {
                    tracing::info!(iterations, tool_calls = trace.len(), "agent loop finished");
                    return Ok(AgentRun {
                        output: answer,
                        trace,
                        iterations,
                        stop_reason: StopReason::Finished,
                    });
                }
                Ok(PlannerOutput::ToolCall(tc)) => {
                    send_event(
                        event_tx,
                        ResearchEvent::ToolCall {
                            tool: tc.tool.clone(),
                            args: tc.args.clone(),
                        },
                    );
                    let result =
                        match timeout_at(deadline, self.executor.execute(&tc.tool, tc.args.clone()))
                            .await
                        {
                            Err(_) => {
                                return Ok(partial(
                                    StopReason::TimeLimit,
                                    iterations,
                                    trace,
                                    &last_output,
                                ))
                            }
                            Ok(r) => r,
                        };

                    let outcome = match result {
                        Ok(text) => ToolOutcome::Observation(text),
                        Err(e) => match self.recovery.handle(&e) {
                            RecoveryAction::Observe(text) => {
                                send_event(
                                    event_tx,
                                    ResearchEvent::ToolFailure {
                                        tool: tc.tool.clone(),
                                        reason: e.to_string(),
                                    },
                                );
                                ToolOutcome::Error(text)
                            }
                            RecoveryAction::Abort => {
                                send_event(event_tx, ResearchEvent::Error { text: e.to_string() });
                                return Err(ResearchError::AgentExecution(e.to_string()));
                            }
                        },
                    };

                    send_event(
                        event_tx,
                        ResearchEvent::Observation {
                            tool: tc.tool.clone(),
                            preview: preview(outcome.text(), OBSERVATION_PREVIEW_CHARS),
                        },
                    );
                    messages.push(Message::assistant(output));
                    messages.push(Message::user(format!(
                        "Observation from {}: {}",
                        tc.tool,
                        outcome.text()
                    )));
                    trace.push(ToolInvocationRecord {
                        tool_name: tc.tool,
                        arguments: tc.args,
                        outcome,
                    });
                }
                Err(e) => match self.recovery.handle(&e) {
                    RecoveryAction::Observe(text) => {
                        send_event(
                            event_tx,
                            ResearchEvent::Recovery {
                                action: "Observe".to_string(),
                                detail: preview(&text, OBSERVATION_PREVIEW_CHARS),
                            },
                        );
                        messages.push(Message::assistant(output));
                        messages.push(Message::user(text));
                    }
                    RecoveryAction::Abort => {
                        send_event(event_tx, ResearchEvent::Error { text: e.to_string() });
                        return Err(ResearchError::AgentExecution(e.to_string()));
                    }
                },
            }
        }
    }
}
