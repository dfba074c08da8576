//! 页面探测 - 业务能力层
//!
//! 查找确认按钮、"显示答案"按钮，读取判定标记。

use crate::config::Vocabulary;
use crate::error::Result;
use crate::infrastructure::{Document, NodeRef, Role};
use crate::services::text_classifier::lowercase_all;

/// "显示答案"按钮已处理的标记
pub const PROCESSED_MARKER: &str = "auto-processed";
/// 确认按钮已点击的标记
pub const SUBMITTED_MARKER: &str = "auto-clicked";

pub struct PageProbe {
    confirm_labels: Vec<String>,
    reveal_labels: Vec<String>,
    incorrect_classes: Vec<String>,
}

impl PageProbe {
    pub fn new(vocabulary: &Vocabulary) -> Self {
        Self {
            confirm_labels: lowercase_all(&vocabulary.confirm_labels),
            reveal_labels: lowercase_all(&vocabulary.reveal_labels),
            incorrect_classes: vocabulary.incorrect_classes.clone(),
        }
    }

    pub fn is_confirm_label(&self, text: &str) -> bool {
        let lower = text.trim().to_lowercase();
        self.confirm_labels.iter().any(|label| *label == lower)
    }

    pub fn is_reveal_label(&self, text: &str) -> bool {
        let lower = text.trim().to_lowercase();
        self.reveal_labels.iter().any(|label| *label == lower)
    }

    /// 题目内第一个可见的确认按钮（不管是否已点击过）
    pub async fn find_confirm_control<D: Document>(
        &self,
        doc: &D,
        question: NodeRef,
    ) -> Result<Option<NodeRef>> {
        for button in doc.find_all(Some(question), Role::Button).await? {
            if self.is_confirm_label(&doc.text(button).await?) && doc.is_visible(button).await? {
                return Ok(Some(button));
            }
        }
        Ok(None)
    }

    /// 页面上所有可见的"显示答案"按钮
    pub async fn find_reveal_buttons<D: Document>(&self, doc: &D) -> Result<Vec<NodeRef>> {
        let mut found = Vec::new();
        for button in doc.find_all(None, Role::Button).await? {
            if self.is_reveal_label(&doc.text(button).await?) && doc.is_visible(button).await? {
                found.push(button);
            }
        }
        Ok(found)
    }

    /// 题目已经答对。只认窄的完成标记，答案区域（如 `.correct-answer`）不算
    pub async fn is_answered<D: Document>(&self, doc: &D, question: NodeRef) -> Result<bool> {
        self.has_clean_marker(doc, question, Role::AnsweredMarker).await
    }

    /// 存在不带错误 class 的正确标记
    pub async fn shows_correct<D: Document>(&self, doc: &D, question: NodeRef) -> Result<bool> {
        self.has_clean_marker(doc, question, Role::CorrectMarker).await
    }

    async fn has_clean_marker<D: Document>(
        &self,
        doc: &D,
        question: NodeRef,
        role: Role,
    ) -> Result<bool> {
        'markers: for marker in doc.find_all(Some(question), role).await? {
            for class in &self.incorrect_classes {
                if doc.has_class(marker, class).await? {
                    continue 'markers;
                }
            }
            return Ok(true);
        }
        Ok(false)
    }

    pub async fn shows_incorrect<D: Document>(&self, doc: &D, question: NodeRef) -> Result<bool> {
        Ok(!doc
            .find_all(Some(question), Role::IncorrectMarker)
            .await?
            .is_empty())
    }

    /// 有正确标记且没有错误标记
    pub async fn is_graded_correct<D: Document>(&self, doc: &D, question: NodeRef) -> Result<bool> {
        Ok(self.shows_correct(doc, question).await? && !self.shows_incorrect(doc, question).await?)
    }
}
