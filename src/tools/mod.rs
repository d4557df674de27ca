//! 工具箱：Tool trait、注册表、执行器与研究工具集

pub mod arxiv;
pub mod citation_checker;
pub mod data_analyzer;
pub mod executor;
pub mod http;
pub mod registry;
pub mod schema;
pub mod web_scraper;
pub mod web_search;
pub mod wikipedia;

pub use arxiv::ArxivTool;
pub use citation_checker::CitationCheckerTool;
pub use data_analyzer::DataAnalyzerTool;
pub use executor::ToolExecutor;
pub use registry::{Tool, ToolRegistry};
pub use schema::tool_call_schema_json;
pub use web_scraper::WebScraperTool;
pub use web_search::WebSearchTool;
pub use wikipedia::WikipediaTool;

use crate::config::ToolsSection;

/// 注册全部六个研究工具
pub fn research_tools(config: &ToolsSection) -> ToolRegistry {
    let search = &config.search;
    let mut registry = ToolRegistry::new();
    registry.register(WebSearchTool::new(search));
    registry.register(WikipediaTool::new(search.timeout_secs, search.max_result_chars));
    registry.register(ArxivTool::new(search.timeout_secs, search.max_result_chars));
    registry.register(WebScraperTool::new(search.timeout_secs, search.max_result_chars));
    registry.register(DataAnalyzerTool);
    registry.register(CitationCheckerTool);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_tools_registered() {
        let registry = research_tools(&ToolsSection::default());
        assert_eq!(
            registry.tool_names(),
            vec![
                "arxiv_search",
                "citation_checker",
                "data_analyzer",
                "web_scraper",
                "web_search",
                "wikipedia"
            ]
        );
    }
}
