//! 选择题试错 - 流程层
//!
//! 无法直接提取答案时，按文档顺序逐个尝试选项：选中 → 确认 → 观察判定。
//! 每次进入"选中"阶段计一次尝试，尝试次数超过选项数的两倍即终止。
//!
//! 状态机本身不等待，`advance` 执行完当前阶段后返回下一阶段应在多久之后执行，
//! 由调度器负责排期。

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{ms, Timing, Vocabulary};
use crate::error::Result;
use crate::infrastructure::{Document, NodeRef, Role};
use crate::models::{ChoiceOption, ProcessedLedger};
use crate::services::{PageProbe, SUBMITTED_MARKER};
use crate::utils::logging::truncate_text;
use crate::workflow::question_ctx::QuestionCtx;

/// 试错阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrialPhase {
    /// 选中当前选项
    Selecting,
    /// 点击确认按钮
    Confirming,
    /// 读取判定结果
    AwaitingResult,
}

/// 单道题的试错游标
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrialState {
    pub cursor: usize,
    pub attempts: usize,
    /// 尝试上限，选项数的两倍
    pub ceiling: usize,
    pub phase: TrialPhase,
}

impl TrialState {
    pub fn new(option_count: usize) -> Self {
        Self {
            cursor: 0,
            attempts: 0,
            ceiling: option_count * 2,
            phase: TrialPhase::Selecting,
        }
    }
}

/// 一次进行中的试错
#[derive(Clone, Debug)]
pub struct TrialRun {
    pub ctx: QuestionCtx,
    pub question: NodeRef,
    pub options: Vec<ChoiceOption>,
    pub state: TrialState,
}

/// 用尽的原因
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExhaustReason {
    /// 没有找到任何选项
    NoOptions,
    /// 所有选项都试过了
    OptionsExhausted,
    /// 达到尝试上限
    AttemptCeiling,
}

impl fmt::Display for ExhaustReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExhaustReason::NoOptions => write!(f, "没有可选项"),
            ExhaustReason::OptionsExhausted => write!(f, "所有选项均已尝试"),
            ExhaustReason::AttemptCeiling => write!(f, "达到尝试上限"),
        }
    }
}

/// 终态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrialOutcome {
    Correct { attempts: usize },
    Exhausted { attempts: usize, reason: ExhaustReason },
}

/// `advance` 的结果
#[derive(Debug)]
pub enum TrialStep {
    /// 在 `after` 之后继续推进
    Continue { run: TrialRun, after: Duration },
    Finished(TrialOutcome),
}

pub struct ChoiceTrialEngine {
    probe: PageProbe,
    selection_settle: Duration,
    result_settle: Duration,
    retry: Duration,
    no_confirm_retry: Duration,
}

impl ChoiceTrialEngine {
    pub fn new(timing: &Timing, vocabulary: &Vocabulary) -> Self {
        Self {
            probe: PageProbe::new(vocabulary),
            selection_settle: ms(timing.selection_settle_ms),
            result_settle: ms(timing.result_settle_ms),
            retry: ms(timing.retry_ms),
            no_confirm_retry: ms(timing.no_confirm_retry_ms),
        }
    }

    /// 收集选项，建立试错游标
    pub async fn start<D: Document>(
        &self,
        doc: &D,
        ctx: QuestionCtx,
        question: NodeRef,
    ) -> Result<TrialRun> {
        let options = collect_options(doc, question).await?;
        info!("{} 📋 找到 {} 个选项", ctx, options.len());
        Ok(TrialRun {
            ctx,
            question,
            state: TrialState::new(options.len()),
            options,
        })
    }

    /// 执行当前阶段；到达终态时在账本中标记完成
    pub async fn advance<D: Document>(
        &self,
        doc: &D,
        mut run: TrialRun,
        ledger: &mut ProcessedLedger,
    ) -> Result<TrialStep> {
        let ctx = run.ctx.clone();
        let step = match run.state.phase {
            TrialPhase::Selecting => self.select(doc, run).await?,
            TrialPhase::Confirming => self.confirm(doc, run).await?,
            TrialPhase::AwaitingResult => {
                if self.probe.is_graded_correct(doc, run.question).await? {
                    TrialStep::Finished(TrialOutcome::Correct {
                        attempts: run.state.attempts,
                    })
                } else {
                    info!("{} ❌ 选项 {} 不正确，尝试下一个", run.ctx, run.state.cursor + 1);
                    run.state.cursor += 1;
                    run.state.phase = TrialPhase::Selecting;
                    TrialStep::Continue {
                        run,
                        after: self.retry,
                    }
                }
            }
        };
        if let TrialStep::Finished(outcome) = &step {
            if let TrialOutcome::Correct { attempts } = outcome {
                info!("{} ✅ 回答正确，共尝试 {} 次", ctx, attempts);
            }
            ledger.mark_complete(&ctx.key);
        }
        Ok(step)
    }

    async fn select<D: Document>(&self, doc: &D, mut run: TrialRun) -> Result<TrialStep> {
        run.state.attempts += 1;
        let attempts = run.state.attempts;

        if run.options.is_empty() {
            return Ok(exhausted(&run, ExhaustReason::NoOptions));
        }
        if attempts > run.state.ceiling {
            return Ok(exhausted(&run, ExhaustReason::AttemptCeiling));
        }
        if self.probe.shows_correct(doc, run.question).await? {
            return Ok(TrialStep::Finished(TrialOutcome::Correct {
                attempts: attempts - 1,
            }));
        }
        let Some(option) = run.options.get(run.state.cursor) else {
            return Ok(exhausted(&run, ExhaustReason::OptionsExhausted));
        };

        info!(
            "{} 🎯 点击选项 {}/{}: {:?}",
            run.ctx,
            run.state.cursor + 1,
            run.options.len(),
            truncate_text(&option.text, 30)
        );
        if !option.controls.contains(&option.element) {
            doc.click(option.element).await?;
        }
        for &control in &option.controls {
            doc.set_checked(control, true).await?;
            doc.click(control).await?;
        }

        run.state.phase = TrialPhase::Confirming;
        Ok(TrialStep::Continue {
            run,
            after: self.selection_settle,
        })
    }

    async fn confirm<D: Document>(&self, doc: &D, mut run: TrialRun) -> Result<TrialStep> {
        match self.probe.find_confirm_control(doc, run.question).await? {
            Some(button) => {
                debug!("{} 🚀 点击确认按钮 {}", run.ctx, button);
                doc.remove_class(button, SUBMITTED_MARKER).await?;
                doc.click(button).await?;
                run.state.phase = TrialPhase::AwaitingResult;
                Ok(TrialStep::Continue {
                    run,
                    after: self.result_settle,
                })
            }
            None => {
                warn!("{} ⚠️ 没有找到确认按钮，跳过选项 {}", run.ctx, run.state.cursor + 1);
                run.state.cursor += 1;
                run.state.phase = TrialPhase::Selecting;
                Ok(TrialStep::Continue {
                    run,
                    after: self.no_confirm_retry,
                })
            }
        }
    }
}

fn exhausted(run: &TrialRun, reason: ExhaustReason) -> TrialStep {
    warn!("{} ⚠️ 试错结束: {}", run.ctx, reason);
    TrialStep::Finished(TrialOutcome::Exhausted {
        attempts: run.state.attempts.saturating_sub(1),
        reason,
    })
}

/// 优先使用可见的选项标签；一个都没有时退回到可见的单选框 / 复选框
async fn collect_options<D: Document>(doc: &D, question: NodeRef) -> Result<Vec<ChoiceOption>> {
    let labels = doc.find_visible(Some(question), Role::ChoiceLabel).await?;
    let mut options = Vec::with_capacity(labels.len());

    if labels.is_empty() {
        debug!("没有选项标签，改用输入框");
        for (index, input) in doc
            .find_visible(Some(question), Role::ChoiceInput)
            .await?
            .into_iter()
            .enumerate()
        {
            let text = doc.attribute(input, "value").await?.unwrap_or_default();
            options.push(ChoiceOption {
                text,
                element: input,
                controls: vec![input],
                index,
            });
        }
        return Ok(options);
    }

    for (index, label) in labels.into_iter().enumerate() {
        let mut controls = doc.find_all(Some(label), Role::ChoiceInput).await?;
        controls.truncate(1);
        if let Some(target) = doc.attribute(label, "for").await? {
            if let Some(node) = doc.element_by_id(&target).await? {
                if !controls.contains(&node) {
                    controls.push(node);
                }
            }
        }
        options.push(ChoiceOption {
            text: doc.trimmed_text(label).await?,
            element: label,
            controls,
            index,
        });
    }
    Ok(options)
}
