//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `DELVE__*` 覆盖（双下划线表示嵌套，如 `DELVE__AGENT__MAX_ITERATIONS=8`）。
//! 配置在启动时构建一次，经构造函数显式传递，不存在进程级全局配置。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::core::RetryPolicy;
use crate::memory::IndexStrategy;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub embedding: EmbeddingSection,
    pub agent: AgentSection,
    pub memory: MemorySection,
    pub retry: RetrySection,
    pub analysis: AnalysisSection,
    pub synthesis: SynthesisSection,
    pub tools: ToolsSection,
}

/// [llm] 段：模型、端点、采样参数与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai（任意 OpenAI 兼容端点）/ mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    /// 综合阶段使用稍高的温度
    pub synthesis_temperature: f32,
    pub max_tokens: u32,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            temperature: 0.1,
            synthesis_temperature: 0.3,
            max_tokens: 4000,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [embedding] 段：长期记忆语义索引使用的嵌入模型
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingSection {
    pub enabled: bool,
    pub model: String,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "text-embedding-3-small".to_string(),
        }
    }
}

/// [agent] 段：工具调用循环的资源上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub max_iterations: usize,
    pub max_execution_time_secs: u64,
    /// 覆盖内置系统提示词
    pub system_prompt: Option<String>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            max_execution_time_secs: 300,
            system_prompt: None,
        }
    }
}

impl AgentSection {
    pub fn max_execution_time(&self) -> Duration {
        Duration::from_secs(self.max_execution_time_secs)
    }
}

/// [memory] 段：短期窗口、长期存储与索引重建策略
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    /// 短期记忆保留的轮数 K
    pub window: usize,
    pub enable_long_term: bool,
    /// 每追加多少条文档重建一次索引
    pub rebuild_every: usize,
    pub index_strategy: IndexStrategy,
    /// 检索相关上下文时取 top-k
    pub retrieval_k: usize,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            window: 10,
            enable_long_term: true,
            rebuild_every: 5,
            index_strategy: IndexStrategy::BatchRebuild,
            retrieval_k: 3,
        }
    }
}

/// [retry] 段：结构化输出校验失败时的重试策略
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: usize,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetrySection {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.max_attempts)
            .with_initial_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_multiplier(self.multiplier)
            .with_jitter(self.jitter)
    }
}

/// [analysis] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    /// 送入分析阶段的证据最大字符数
    pub max_evidence_chars: usize,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            max_evidence_chars: 3000,
        }
    }
}

/// [synthesis] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisSection {
    pub max_findings_chars: usize,
    pub max_context_chars: usize,
    /// 回答末尾附加的来源条数
    pub max_listed_sources: usize,
}

impl Default for SynthesisSection {
    fn default() -> Self {
        Self {
            max_findings_chars: 2000,
            max_context_chars: 500,
            max_listed_sources: 5,
        }
    }
}

/// [tools] 段：单次工具调用超时与各研究工具参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub tool_timeout_secs: u64,
    pub search: SearchSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
            search: SearchSection::default(),
        }
    }
}

/// [tools.search] 段：搜索 API Key、结果条数、超时、抓取最大字符数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    /// 未设置时读取 SERPER_API_KEY
    pub serper_api_key: Option<String>,
    pub max_results: usize,
    pub timeout_secs: u64,
    pub max_result_chars: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            serper_api_key: None,
            max_results: 5,
            timeout_secs: 30,
            max_result_chars: 5000,
        }
    }
}

impl SearchSection {
    pub fn resolved_serper_key(&self) -> Option<String> {
        self.serper_api_key
            .clone()
            .or_else(|| std::env::var("SERPER_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// 从 config 目录加载配置，环境变量 DELVE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 DELVE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("DELVE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
