use std::fmt;

use serde::{Deserialize, Serialize};

/// 候选答案的分类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateKind {
    /// 代码块原文
    CodeLiteral,
    /// 纯数字
    NumericLiteral,
    /// enum 声明 / enum 变量声明 / 赋值语句
    DeclarationLiteral,
    /// 简短文本
    ShortText,
    /// 界面标签，被拒绝
    RejectedMeta,
    /// 解释性语句，被拒绝
    RejectedExplanation,
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CandidateKind::CodeLiteral => "code-literal",
            CandidateKind::NumericLiteral => "numeric-literal",
            CandidateKind::DeclarationLiteral => "declaration-literal",
            CandidateKind::ShortText => "short-text",
            CandidateKind::RejectedMeta => "rejected-meta",
            CandidateKind::RejectedExplanation => "rejected-explanation",
        };
        f.write_str(name)
    }
}

/// 从答案区域中提取出的文本
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerCandidate {
    pub text: String,
    pub kind: CandidateKind,
}

impl AnswerCandidate {
    pub fn new(text: impl Into<String>, kind: CandidateKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

impl fmt::Display for AnswerCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} [{}]", self.text, self.kind)
    }
}
