//! 文本分类 - 业务能力层
//!
//! 判断一行文字是界面标签、解释性语句，还是可能的答案本身。
//! 词表来自配置，可以单独调整和测试。

use regex::Regex;

use crate::config::Vocabulary;
use crate::error::{ConfigError, Result};

/// 一行文字的类别
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextClass {
    /// 界面标签（"Show answer"、"Check" 等）
    Meta,
    /// 解释性语句
    Explanation,
    /// 可能的答案
    Literal,
}

pub struct TextClassifier {
    meta_phrases: Vec<String>,
    explanation_keywords: Vec<String>,
    /// "<词> is <整数>"
    is_number: Regex,
}

impl TextClassifier {
    pub fn new(vocabulary: &Vocabulary) -> Result<Self> {
        Ok(Self {
            meta_phrases: lowercase_all(&vocabulary.meta_phrases),
            explanation_keywords: lowercase_all(&vocabulary.explanation_keywords),
            is_number: compile(r"\w+\s+is\s+\d+")?,
        })
    }

    /// 先判断元文本，再判断解释，顺序不能颠倒
    pub fn classify(&self, line: &str) -> TextClass {
        if self.is_meta(line) {
            TextClass::Meta
        } else if self.is_explanation(line) {
            TextClass::Explanation
        } else {
            TextClass::Literal
        }
    }

    pub fn is_meta(&self, line: &str) -> bool {
        let line = line.trim();
        let lower = line.to_lowercase();
        self.meta_phrases.iter().any(|phrase| *phrase == lower)
            || (lower == "answer" && line.chars().count() < 10)
    }

    pub fn is_explanation(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        if self
            .explanation_keywords
            .iter()
            .any(|keyword| lower.contains(keyword.as_str()))
        {
            return true;
        }
        // 短的 "X is 2" 可能就是答案，长的才是解释
        self.is_number.is_match(&lower) && line.chars().count() > 15
    }
}

/// 词表统一去空白、转小写，丢弃空项
pub(crate) fn lowercase_all(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

pub(crate) fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| {
        ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> TextClassifier {
        TextClassifier::new(&Vocabulary::default()).unwrap()
    }

    #[test]
    fn test_meta_is_exact_and_case_insensitive() {
        let c = classifier();
        assert_eq!(c.classify("Show answer"), TextClass::Meta);
        assert_eq!(c.classify("ANSWER"), TextClass::Meta);
        assert_eq!(c.classify("  Check "), TextClass::Meta);
        assert_eq!(c.classify("Press again"), TextClass::Meta);
        // 只是包含标签词的行不算
        assert_ne!(c.classify("Check the answer"), TextClass::Meta);
    }

    #[test]
    fn test_explanation_keywords() {
        let c = classifier();
        assert_eq!(
            c.classify("The loop body executes 3 times"),
            TextClass::Explanation
        );
        assert_eq!(
            c.classify("x is initialized to 0"),
            TextClass::Explanation
        );
        assert_eq!(c.classify("enum Color"), TextClass::Literal);
    }

    #[test]
    fn test_word_is_number_depends_on_length() {
        let c = classifier();
        assert_eq!(c.classify("x is 2"), TextClass::Literal);
        assert_eq!(c.classify("FURNACE_ON is 2 here"), TextClass::Explanation);
    }

    #[test]
    fn test_custom_vocabulary() {
        let vocabulary = Vocabulary {
            meta_phrases: vec!["Reveal".to_string()],
            explanation_keywords: vec!["therefore".to_string()],
            ..Vocabulary::default()
        };
        let c = TextClassifier::new(&vocabulary).unwrap();
        assert_eq!(c.classify("reveal"), TextClass::Meta);
        assert_eq!(c.classify("therefore 7"), TextClass::Explanation);
        // 默认词表里的 "because" 不再生效
        assert_eq!(c.classify("because"), TextClass::Literal);
    }
}
