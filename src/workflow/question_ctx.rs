//! 题目处理上下文
//!
//! 封装"我正在处理第几轮的第几题"这一信息

use std::fmt::Display;

use crate::models::{ContainerKey, QuestionContainer};

/// 题目处理上下文
///
/// 只用于日志前缀和账本查询，不持有页面资源
#[derive(Debug, Clone)]
pub struct QuestionCtx {
    /// 第几轮处理（从1开始）
    pub pass: u64,

    /// 题目在本轮中的索引（从1开始，仅用于日志显示）
    pub question_index: usize,

    /// 题目容器的身份键
    pub key: ContainerKey,
}

impl QuestionCtx {
    /// 创建新的题目上下文
    pub fn new(pass: u64, question_index: usize, key: ContainerKey) -> Self {
        Self {
            pass,
            question_index,
            key,
        }
    }

    pub fn for_container(pass: u64, container: &QuestionContainer) -> Self {
        Self::new(pass, container.index + 1, container.key.clone())
    }
}

impl Display for QuestionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[第 {} 轮 题目#{}]", self.pass, self.question_index)
    }
}
