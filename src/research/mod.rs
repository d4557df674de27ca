//! 研究流水线：证据提取、并发分析、综合回答与结果存档

pub mod analysis;
pub mod artifact;
pub mod extractor;
pub mod synthesis;
pub mod types;

pub use analysis::AnalysisStage;
pub use artifact::ResearchArtifact;
pub use extractor::{extract, extract_urls, NO_DATA};
pub use synthesis::{SynthesisInput, SynthesisStage};
pub use types::{AnalysisOutcome, AnalysisResult, DataQuality, EvidenceBundle, ResearchResult};
