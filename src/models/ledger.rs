//! 已处理记录
//!
//! 一个页面会话内，同一个身份键在同一阶段只会被处理一次。
//! 所有访问都在单个协作时间线上同步完成，先查后插即可保证这一点。

use std::collections::HashSet;
use std::fmt;

use crate::models::ContainerKey;

/// 记录所属的处理阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LedgerPhase {
    /// 已请求显示答案
    RevealRequested,
    /// 已安排填写 / 作答
    AnswerFilled,
    /// 已到达终态（答对或尝试用尽）
    Completed,
}

impl fmt::Display for LedgerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerPhase::RevealRequested => write!(f, "reveal-requested"),
            LedgerPhase::AnswerFilled => write!(f, "answer-filled"),
            LedgerPhase::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Default)]
pub struct ProcessedLedger {
    reveal_requested: HashSet<ContainerKey>,
    answer_filled: HashSet<ContainerKey>,
    completed: HashSet<ContainerKey>,
}

impl ProcessedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn partition(&self, phase: LedgerPhase) -> &HashSet<ContainerKey> {
        match phase {
            LedgerPhase::RevealRequested => &self.reveal_requested,
            LedgerPhase::AnswerFilled => &self.answer_filled,
            LedgerPhase::Completed => &self.completed,
        }
    }

    fn partition_mut(&mut self, phase: LedgerPhase) -> &mut HashSet<ContainerKey> {
        match phase {
            LedgerPhase::RevealRequested => &mut self.reveal_requested,
            LedgerPhase::AnswerFilled => &mut self.answer_filled,
            LedgerPhase::Completed => &mut self.completed,
        }
    }

    /// 插入记录；已存在时返回 `false`，调用方应跳过处理
    pub fn insert(&mut self, phase: LedgerPhase, key: &ContainerKey) -> bool {
        let partition = self.partition_mut(phase);
        if partition.contains(key) {
            return false;
        }
        partition.insert(key.clone())
    }

    pub fn contains(&self, phase: LedgerPhase, key: &ContainerKey) -> bool {
        self.partition(phase).contains(key)
    }

    pub fn is_complete(&self, key: &ContainerKey) -> bool {
        self.contains(LedgerPhase::Completed, key)
    }

    pub fn mark_complete(&mut self, key: &ContainerKey) -> bool {
        self.insert(LedgerPhase::Completed, key)
    }

    pub fn len(&self, phase: LedgerPhase) -> usize {
        self.partition(phase).len()
    }

    pub fn is_empty(&self) -> bool {
        self.reveal_requested.is_empty() && self.answer_filled.is_empty() && self.completed.is_empty()
    }

    /// 清空所有阶段（显式重置或页面跳转）
    pub fn clear(&mut self) {
        self.reveal_requested.clear();
        self.answer_filled.clear();
        self.completed.clear();
    }
}
