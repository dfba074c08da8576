//! 填空提交 - 业务能力层
//!
//! 把答案写进文本控件，稍后点击确认按钮一次。
//!
//! 宿主页面的组件不一定能感知单一的写入方式，所以这里把能用的方式都用上：
//! 直接赋值、原型 setter、再补发 input / change / keyup / blur 事件。

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::infrastructure::{ControlKind, Document, DomEvent, NodeRef, Role, ValueWrite};
use crate::models::{ContainerKey, ProcessedLedger};
use crate::services::page_probe::{PageProbe, SUBMITTED_MARKER};
use crate::utils::logging::truncate_text;

/// 填写结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillOutcome {
    /// 已写入该控件
    Filled(NodeRef),
    /// 没有答案可写
    NoAnswer,
    /// 题目里没有可见的文本控件
    NoControl,
    /// 控件存在，但写入方式不可用（例如编辑器实例不存在）
    Unavailable(NodeRef),
}

/// 确认按钮的状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmState {
    /// 可以点击
    Ready(NodeRef),
    /// 没有确认按钮
    Missing,
    /// 已经点过
    Used(NodeRef),
}

pub struct TextFillSubmitter;

impl TextFillSubmitter {
    /// 题目内第一个可见的文本控件（按配置的优先级）
    pub async fn find_control<D: Document>(doc: &D, question: NodeRef) -> Result<Option<NodeRef>> {
        for control in doc.find_all(Some(question), Role::TextControl).await? {
            if doc.is_visible(control).await? {
                return Ok(Some(control));
            }
        }
        Ok(None)
    }

    /// 写入答案；找不到控件或没有答案时不做任何修改
    pub async fn fill<D: Document>(
        doc: &D,
        question: NodeRef,
        answer: Option<&str>,
    ) -> Result<FillOutcome> {
        let Some(answer) = answer.filter(|a| !a.trim().is_empty()) else {
            return Ok(FillOutcome::NoAnswer);
        };
        let Some(control) = Self::find_control(doc, question).await? else {
            return Ok(FillOutcome::NoControl);
        };
        let Some(kind) = doc.control_kind(control).await? else {
            return Ok(FillOutcome::Unavailable(control));
        };

        debug!("写入控件 {} ({:?})", control, kind);
        let written = match kind {
            ControlKind::Input | ControlKind::TextArea => {
                doc.focus(control).await?;
                if !doc.write_value(control, "", ValueWrite::Direct).await? {
                    return Ok(FillOutcome::Unavailable(control));
                }
                doc.write_value(control, answer, ValueWrite::Direct).await?;
                if !doc.write_value(control, answer, ValueWrite::NativeSetter).await? {
                    debug!("原型 setter 不可用，仅使用直接赋值");
                }
                for event in [DomEvent::Input, DomEvent::Change, DomEvent::KeyUp, DomEvent::Blur] {
                    doc.dispatch(control, event).await?;
                }
                true
            }
            ControlKind::ContentEditable => {
                doc.focus(control).await?;
                doc.write_value(control, "", ValueWrite::TextContent).await?;
                let written = doc.write_value(control, answer, ValueWrite::TextContent).await?;
                if written {
                    doc.dispatch(control, DomEvent::Input).await?;
                    doc.dispatch(control, DomEvent::Change).await?;
                }
                written
            }
            ControlKind::CodeEditor => doc.write_value(control, answer, ValueWrite::CodeEditor).await?,
        };

        if !written {
            warn!("⚠️ 控件 {} 无法写入", control);
            return Ok(FillOutcome::Unavailable(control));
        }
        info!("✅ 已填写: {:?}", truncate_text(answer, 60));
        Ok(FillOutcome::Filled(control))
    }

    /// 找到未使用过的确认按钮
    pub async fn find_unused_confirm<D: Document>(
        doc: &D,
        probe: &PageProbe,
        question: NodeRef,
    ) -> Result<ConfirmState> {
        let Some(button) = probe.find_confirm_control(doc, question).await? else {
            return Ok(ConfirmState::Missing);
        };
        if doc.has_class(button, SUBMITTED_MARKER).await? {
            Ok(ConfirmState::Used(button))
        } else {
            Ok(ConfirmState::Ready(button))
        }
    }

    /// 点击确认按钮并做标记，同一按钮只点一次；返回是否点击
    pub async fn submit<D: Document>(
        doc: &D,
        button: NodeRef,
        key: &ContainerKey,
        ledger: &mut ProcessedLedger,
    ) -> Result<bool> {
        if doc.has_class(button, SUBMITTED_MARKER).await? {
            return Ok(false);
        }
        info!("🚀 提交...");
        doc.click(button).await?;
        doc.add_class(button, SUBMITTED_MARKER).await?;
        ledger.mark_complete(key);
        Ok(true)
    }
}
