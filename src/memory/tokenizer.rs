//! 分词：中英文混合，用于离线关键词嵌入
//!
//! 含 CJK 字符时使用 jieba-rs 搜索引擎模式分词，否则按非字母数字字符切分。

use std::sync::OnceLock;

use jieba_rs::Jieba;

static JIEBA: OnceLock<Jieba> = OnceLock::new();

fn get_jieba() -> &'static Jieba {
    JIEBA.get_or_init(Jieba::new)
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}' |
        '\u{3400}'..='\u{4DBF}' |
        '\u{F900}'..='\u{FAFF}' |
        '\u{3040}'..='\u{309F}' |
        '\u{30A0}'..='\u{30FF}'
    )
}

pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}

/// 分词并小写化，丢弃单字符的拉丁 token 与纯标点
pub fn tokenize(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    if contains_cjk(text) {
        get_jieba()
            .cut_for_search(text, true)
            .into_iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| {
                let first = s.chars().next().unwrap_or(' ');
                is_cjk(first) || (s.chars().count() > 1 && s.chars().any(char::is_alphanumeric))
            })
            .collect()
    } else {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|s| s.chars().count() > 1)
            .map(|s| s.to_lowercase())
            .collect()
    }
}
