//! 题型判断 - 业务能力层

use crate::error::Result;
use crate::infrastructure::{Document, NodeRef, Role};
use crate::models::QuestionKind;
use crate::services::page_probe::PageProbe;

/// 判断结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// 已经显示为正确，无需处理
    AlreadyCorrect,
    Kind(QuestionKind),
}

pub struct QuestionClassifier;

impl QuestionClassifier {
    /// 有单选框 / 复选框即为选择题；否则有文本框即为填空；都没有则未知
    pub async fn kind<D: Document>(doc: &D, question: NodeRef) -> Result<QuestionKind> {
        if !doc.find_all(Some(question), Role::ChoiceInput).await?.is_empty() {
            return Ok(QuestionKind::Choice);
        }
        if !doc.find_all(Some(question), Role::TextEntry).await?.is_empty() {
            return Ok(QuestionKind::FreeText);
        }
        Ok(QuestionKind::Unknown)
    }

    pub async fn classify<D: Document>(
        doc: &D,
        probe: &PageProbe,
        question: NodeRef,
    ) -> Result<Classification> {
        if probe.is_answered(doc, question).await? {
            return Ok(Classification::AlreadyCorrect);
        }
        Ok(Classification::Kind(Self::kind(doc, question).await?))
    }
}
