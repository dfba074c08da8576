//! 答案提取 - 业务能力层
//!
//! 从"显示答案"后出现的区域中找出答案原文。规则按优先级排列，先命中者胜出：
//!
//! 1. 代码块原文
//! 2. 逐行扫描：纯数字、声明语句、去掉标签前缀后的短文本
//! 3. 第一条不是界面标签的短行
//! 4. 解释里的 "<词> is <整数>" 中的整数

use regex::Regex;
use tracing::debug;

use crate::config::Vocabulary;
use crate::error::Result;
use crate::infrastructure::{Document, NodeRef, Role};
use crate::models::{AnswerCandidate, CandidateKind};
use crate::services::text_classifier::{compile, TextClass, TextClassifier};
use crate::utils::logging::truncate_text;

/// 行长度超过此值视为解释
const MAX_LINE_CHARS: usize = 100;
/// 短答案的长度上限（不含）
const MAX_ANSWER_CHARS: usize = 50;

pub struct AnswerExtractor {
    classifier: TextClassifier,
    label_prefix: Option<Regex>,
    digits: Regex,
    enum_declaration: Regex,
    enum_variable: Regex,
    assignment: Regex,
    short_shape: Regex,
    number_in_prose: Regex,
    ordinal_prefix: Regex,
    whitespace: Regex,
    enum_shape: Regex,
}

impl AnswerExtractor {
    pub fn new(vocabulary: &Vocabulary) -> Result<Self> {
        let prefixes = vocabulary
            .label_prefixes
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");
        let label_prefix = if prefixes.is_empty() {
            None
        } else {
            Some(compile(&format!(r"(?i)^(?:{prefixes}):?\s*"))?)
        };

        Ok(Self {
            classifier: TextClassifier::new(vocabulary)?,
            label_prefix,
            digits: compile(r"^\d+$")?,
            enum_declaration: compile(r"enum\s+\w+\s*\{[^}]*\}\s*;?")?,
            enum_variable: compile(r"^enum\s+\w+\s+\w+\s*;?$")?,
            assignment: compile(r"^\w+\s*=\s*\w+\s*;?$")?,
            short_shape: compile(r"^[A-Za-z0-9_\s\-.,:;]+$")?,
            number_in_prose: compile(r"(\w+)\s+is\s+(\d+)")?,
            // "3) " 或 "3. "；"3.14" 不算序号
            ordinal_prefix: compile(r"^\d+(?:\)\s*|\.\s+)")?,
            whitespace: compile(r"\s+")?,
            enum_shape: compile(r"enum\s+\w+")?,
        })
    }

    pub fn classifier(&self) -> &TextClassifier {
        &self.classifier
    }

    /// 对一个答案区域应用提取规则
    ///
    /// `code` 为区域内第一个代码块的文本，`text` 为整个区域的文本。
    pub fn extract_text(&self, code: Option<&str>, text: &str) -> Option<AnswerCandidate> {
        if let Some(code) = code.map(str::trim) {
            if !code.is_empty() && !self.classifier.is_meta(code) {
                debug!("   ✅ 代码块: {:?}", truncate_text(code, 60));
                return Some(AnswerCandidate::new(code, CandidateKind::CodeLiteral));
            }
        }

        let text = text.trim();
        let lines: Vec<&str> = text
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        debug!("🔍 从 {} 行中提取", lines.len());

        for line in &lines {
            if let Some(candidate) = self.scan_line(line) {
                return Some(candidate);
            }
        }

        // 兜底：第一条不是标签的短行
        for line in &lines {
            if !self.classifier.is_meta(line) && line.chars().count() < MAX_ANSWER_CHARS {
                let cleaned = self.strip_label(line);
                if !cleaned.is_empty() {
                    debug!("   ✅ 兜底选择: {:?}", cleaned);
                    return Some(AnswerCandidate::new(cleaned, CandidateKind::ShortText));
                }
            }
        }

        // 最后：解释里的 "FURNACE_ON is 2"
        if let Some(caps) = self.number_in_prose.captures(text) {
            let number = &caps[2];
            debug!("   ✅ 从解释中取出数字: {:?}", number);
            return Some(AnswerCandidate::new(number, CandidateKind::NumericLiteral));
        }

        None
    }

    fn scan_line(&self, line: &str) -> Option<AnswerCandidate> {
        if self.classifier.is_meta(line) {
            debug!("   ⏭️  {}: {:?}", CandidateKind::RejectedMeta, line);
            return None;
        }

        if self.digits.is_match(line) {
            debug!("   ✅ 数字: {:?}", line);
            return Some(AnswerCandidate::new(line, CandidateKind::NumericLiteral));
        }

        if self.enum_declaration.is_match(line)
            || self.enum_variable.is_match(line)
            || self.assignment.is_match(line)
        {
            debug!("   ✅ 声明语句: {:?}", line);
            return Some(AnswerCandidate::new(
                with_semicolon(line),
                CandidateKind::DeclarationLiteral,
            ));
        }

        if line.chars().count() > MAX_LINE_CHARS
            || self.classifier.classify(line) == TextClass::Explanation
        {
            debug!(
                "   ⏭️  {}: {:?}",
                CandidateKind::RejectedExplanation,
                truncate_text(line, 60)
            );
            return None;
        }

        let stripped = self.strip_label(line);
        let length = stripped.chars().count();
        if length > 0
            && length < MAX_ANSWER_CHARS
            && !self.classifier.is_meta(&stripped)
            && self.short_shape.is_match(&stripped)
        {
            debug!("   ✅ 短答案: {:?}", stripped);
            return Some(AnswerCandidate::new(stripped, CandidateKind::ShortText));
        }

        None
    }

    fn strip_label(&self, line: &str) -> String {
        match &self.label_prefix {
            Some(prefix) => prefix.replace(line, "").trim().to_string(),
            None => line.trim().to_string(),
        }
    }

    /// 去掉标签前缀和序号前缀，折叠空白；enum 声明和代码块保持原样
    pub fn clean(&self, candidate: AnswerCandidate) -> AnswerCandidate {
        if candidate.kind == CandidateKind::CodeLiteral || self.enum_shape.is_match(&candidate.text) {
            return candidate;
        }
        let text = self.strip_label(&candidate.text);
        let text = self.ordinal_prefix.replace(&text, "");
        let text = self.whitespace.replace_all(&text, " ");
        AnswerCandidate::new(text.trim(), candidate.kind)
    }

    /// 从页面上的一个答案区域提取（未清理）
    pub async fn extract<D: Document>(
        &self,
        doc: &D,
        region: NodeRef,
    ) -> Result<Option<AnswerCandidate>> {
        let code = match doc.find_first(Some(region), Role::CodeBlock).await? {
            Some(block) => Some(doc.text(block).await?),
            None => None,
        };
        let text = doc.text(region).await?;
        Ok(self.extract_text(code.as_deref(), &text))
    }

    /// 解析一道题的答案
    ///
    /// 先按优先级尝试可见的答案区域，再尝试全部答案区域；结果经过清理。
    pub async fn resolve<D: Document>(
        &self,
        doc: &D,
        question: NodeRef,
    ) -> Result<Option<AnswerCandidate>> {
        let regions = doc.find_all(Some(question), Role::AnswerRegion).await?;

        let mut found = None;
        for &region in &regions {
            if doc.is_visible(region).await? {
                found = self.extract(doc, region).await?;
                if found.is_some() {
                    break;
                }
            }
        }

        if found.is_none() {
            debug!("🔄 可见区域中没有答案，尝试全部区域");
            for &region in &regions {
                found = self.extract(doc, region).await?;
                if found.is_some() {
                    break;
                }
            }
        }

        Ok(found
            .map(|candidate| self.clean(candidate))
            .filter(|candidate| !candidate.text.is_empty()))
    }
}

fn with_semicolon(line: &str) -> String {
    if line.ends_with(';') {
        line.to_string()
    } else {
        format!("{line};")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> AnswerExtractor {
        AnswerExtractor::new(&Vocabulary::default()).unwrap()
    }

    fn extract(text: &str) -> Option<String> {
        let e = extractor();
        e.extract_text(None, text).map(|c| e.clean(c).text)
    }

    #[test]
    fn test_label_then_number() {
        assert_eq!(extract("Answer\n42").as_deref(), Some("42"));
    }

    #[test]
    fn test_enum_declaration_gets_semicolon() {
        assert_eq!(
            extract("enum Color { RED, GREEN, BLUE }").as_deref(),
            Some("enum Color { RED, GREEN, BLUE };")
        );
        assert_eq!(
            extract("enum Color { RED,   GREEN };").as_deref(),
            Some("enum Color { RED,   GREEN };")
        );
    }

    #[test]
    fn test_enum_variable_and_assignment() {
        assert_eq!(extract("enum Color shirt").as_deref(), Some("enum Color shirt;"));
        assert_eq!(extract("x = 5").as_deref(), Some("x = 5;"));
        assert_eq!(extract("Solution\nlight = GREEN;").as_deref(), Some("light = GREEN;"));
    }

    #[test]
    fn test_explanation_falls_back_to_number_in_prose() {
        let text = "FURNACE_ON is 2 because it represents the second state in the loop";
        assert_eq!(extract(text).as_deref(), Some("2"));

        let candidate = extractor().extract_text(None, text).unwrap();
        assert_eq!(candidate.kind, CandidateKind::NumericLiteral);
    }

    #[test]
    fn test_code_block_returned_verbatim() {
        let e = extractor();
        let code = "  int  x = 5;\n  int y;  ";
        let candidate = e
            .extract_text(Some(code), "Answer\nint  x = 5;\nint y;\nBecause x is declared first")
            .unwrap();
        assert_eq!(candidate.kind, CandidateKind::CodeLiteral);
        assert_eq!(e.clean(candidate).text, "int  x = 5;\n  int y;");
    }

    #[test]
    fn test_meta_code_block_ignored() {
        let e = extractor();
        let candidate = e.extract_text(Some("Check"), "Check\n7").unwrap();
        assert_eq!(candidate.text, "7");
    }

    #[test]
    fn test_label_prefix_stripped() {
        assert_eq!(extract("Correct answer: blue").as_deref(), Some("blue"));
        assert_eq!(extract("answer:   3.14").as_deref(), Some("3.14"));
    }

    #[test]
    fn test_ordinal_prefix_and_whitespace_cleanup() {
        let e = extractor();
        let cleaned = e.clean(AnswerCandidate::new("3)  red   and blue", CandidateKind::ShortText));
        assert_eq!(cleaned.text, "red and blue");
        let cleaned = e.clean(AnswerCandidate::new("2. green", CandidateKind::ShortText));
        assert_eq!(cleaned.text, "green");
        let decimal = e.clean(AnswerCandidate::new("3.14", CandidateKind::ShortText));
        assert_eq!(decimal.text, "3.14");
    }

    #[test]
    fn test_long_lines_skipped() {
        let long = "a".repeat(120);
        let text = format!("{long}\nok");
        assert_eq!(extract(&text).as_deref(), Some("ok"));
    }

    #[test]
    fn test_fallback_accepts_non_shape_line() {
        // 含有 "()" 不符合短答案形状，但兜底仍会返回
        assert_eq!(extract("Show answer\nprintf(\"%d\")").as_deref(), Some("printf(\"%d\")"));
    }

    #[test]
    fn test_nothing_found() {
        assert_eq!(extract("Show answer\nCheck\nNext"), None);
        assert_eq!(extract(""), None);
    }

    #[test]
    fn test_meta_lines_never_returned() {
        let vocabulary = Vocabulary::default();
        for phrase in &vocabulary.meta_phrases {
            let text = format!("{phrase}\n{}", phrase.to_uppercase());
            let result = extract(&text);
            assert!(
                result.as_deref().map(|r| r.to_lowercase()) != Some(phrase.to_lowercase()),
                "{phrase} was returned"
            );
        }
    }

    #[test]
    fn test_digit_lines_unchanged() {
        for digits in ["0", "7", "42", "007", "123456789"] {
            assert_eq!(extract(&format!("Answer\n{digits}")).as_deref(), Some(digits));
        }
    }
}
