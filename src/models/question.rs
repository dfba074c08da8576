use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::infrastructure::{NodeIdentity, NodeRef};

/// 题目容器的身份键
///
/// 页面不保证提供稳定 id：有 id 时用 id，否则退回到"标签 + 位置 + class"。
/// 位置键在页面重排后可能变化，此时同一道题会被当成新题。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerKey(String);

impl ContainerKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn from_identity(identity: &NodeIdentity) -> Self {
        if let Some(id) = identity.stable_id.as_deref().filter(|id| !id.trim().is_empty()) {
            return Self(format!("{}#{}", identity.tag, id.trim()));
        }
        let raw = format!(
            "{}_{}_{}_{}",
            identity.tag, identity.top, identity.left, identity.class_name
        );
        Self(whitespace_re().replace_all(&raw, "_").into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex must compile"))
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 题型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    /// 单选 / 多选
    Choice,
    /// 填空
    FreeText,
    /// 无法识别，按填空处理
    Unknown,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::Choice => write!(f, "choice"),
            QuestionKind::FreeText => write!(f, "free-text"),
            QuestionKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// 一个题目组件实例
#[derive(Clone, Debug)]
pub struct QuestionContainer {
    pub node: NodeRef,
    pub key: ContainerKey,
    /// 本轮中的序号（从 0 开始）
    pub index: usize,
}

/// 选择题中的一个选项
#[derive(Clone, Debug, PartialEq)]
pub struct ChoiceOption {
    /// 选项文字
    pub text: String,
    /// 被点击的元素（label 或 input 本身）
    pub element: NodeRef,
    /// 关联的 input，label 内嵌或通过 `for` 指向
    pub controls: Vec<NodeRef>,
    /// 在本次尝试列表中的位置
    pub index: usize,
}
