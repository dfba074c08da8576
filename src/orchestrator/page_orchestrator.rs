//! 页面处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责一个页面会话内所有题目的调度，是页面级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **显示答案**：每轮先双击所有"显示答案"按钮
//! 2. **分发题目**：发现题目容器，按题型交给试错引擎或填空提交
//! 3. **去重**：持有 `ProcessedLedger`，同一题同一阶段只处理一次
//! 4. **跳转检测**：地址变化时作废旧任务，清空账本
//! 5. **统计输出**：汇总为 `PassReport`
//!
//! 所有任务都排在同一个 `Scheduler` 上，按到期时间逐个执行。
//! 单个任务出错只记录日志和计数，不会中断其他题目。

use std::fmt;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::{ms, Config, Timing};
use crate::error::{AppError, Result};
use crate::infrastructure::{Document, NodeRef, Role};
use crate::models::{
    AnswerCandidate, ContainerKey, LedgerPhase, ProcessedLedger, QuestionContainer, QuestionKind,
};
use crate::services::{
    AnswerExtractor, Classification, ConfirmState, FillOutcome, PageProbe, QuestionClassifier,
    TextFillSubmitter, PROCESSED_MARKER, SUBMITTED_MARKER,
};
use crate::workflow::{
    ChoiceTrialEngine, Clock, QuestionCtx, Scheduler, TrialOutcome, TrialRun, TrialStep,
};

/// 一次或多次处理的统计
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    /// 点击过的"显示答案"按钮
    pub revealed: usize,
    /// 安排处理的题目
    pub questions_seen: usize,
    /// 已经是正确状态而跳过
    pub skipped_correct: usize,
    pub choice_correct: usize,
    pub choice_exhausted: usize,
    pub text_submitted: usize,
    /// 没有提取到答案
    pub extraction_misses: usize,
    /// 找不到控件或无法写入
    pub fill_failures: usize,
    /// 因跳转、重置或节点失效而丢弃的任务
    pub stale_dropped: usize,
    pub errors: usize,
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "👀 显示答案: {}", self.revealed)?;
        writeln!(f, "📋 题目: {}", self.questions_seen)?;
        writeln!(f, "⏭️ 已正确跳过: {}", self.skipped_correct)?;
        writeln!(
            f,
            "🎯 选择题: 正确 {} / 用尽 {}",
            self.choice_correct, self.choice_exhausted
        )?;
        writeln!(f, "✍️ 填空已提交: {}", self.text_submitted)?;
        writeln!(
            f,
            "⚠️ 未找到答案: {} / 填写失败: {}",
            self.extraction_misses, self.fill_failures
        )?;
        write!(
            f,
            "🗑️ 丢弃任务: {} / ❌ 错误: {}",
            self.stale_dropped, self.errors
        )
    }
}

/// 诊断结果：一道题当前会被如何处理
#[derive(Clone, Debug)]
pub struct InspectEntry {
    pub index: usize,
    pub key: ContainerKey,
    pub classification: Classification,
    pub answer: Option<AnswerCandidate>,
}

impl fmt::Display for InspectEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.classification {
            Classification::AlreadyCorrect => "already-correct".to_string(),
            Classification::Kind(kind) => kind.to_string(),
        };
        match &self.answer {
            Some(answer) => write!(f, "题目 {} [{}] {} → {}", self.index + 1, kind, self.key, answer),
            None => write!(f, "题目 {} [{}] {} → (无答案)", self.index + 1, kind, self.key),
        }
    }
}

/// 运行状态
#[derive(Clone, Debug)]
pub struct Status {
    pub pass: u64,
    pub epoch: u64,
    pub pass_pending: bool,
    pub queued_tasks: usize,
    pub revealed: usize,
    pub filled: usize,
    pub completed: usize,
    pub report: PassReport,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "第 {} 轮 / 页面 {} / 运行中: {} / 排队任务: {}",
            self.pass, self.epoch, self.pass_pending, self.queued_tasks
        )?;
        writeln!(
            f,
            "账本: 显示答案 {} / 已填写 {} / 已完成 {}",
            self.revealed, self.filled, self.completed
        )?;
        write!(f, "{}", self.report)
    }
}

enum Task {
    StartPass,
    RevealClick { button: NodeRef, second: bool },
    FillPhase,
    Process { ctx: QuestionCtx, question: NodeRef },
    Trial(Box<TrialRun>),
    Submit { ctx: QuestionCtx, question: NodeRef },
    Confirm { ctx: QuestionCtx, button: NodeRef },
}

impl Task {
    fn ctx(&self) -> Option<&QuestionCtx> {
        match self {
            Task::Process { ctx, .. } | Task::Submit { ctx, .. } | Task::Confirm { ctx, .. } => {
                Some(ctx)
            }
            Task::Trial(run) => Some(&run.ctx),
            Task::StartPass | Task::RevealClick { .. } | Task::FillPhase => None,
        }
    }
}

/// 排队中的任务，带有创建时的页面代数
pub struct ScheduledTask {
    epoch: u64,
    task: Task,
}

pub struct PageOrchestrator<D, C> {
    doc: D,
    scheduler: Scheduler<C, ScheduledTask>,
    ledger: ProcessedLedger,
    extractor: AnswerExtractor,
    probe: PageProbe,
    trials: ChoiceTrialEngine,
    timing: Timing,
    epoch: u64,
    pass: u64,
    pass_pending: bool,
    last_location: Option<String>,
    last_mutations: Option<u64>,
    report: PassReport,
}

impl<D: Document, C: Clock> PageOrchestrator<D, C> {
    pub fn new(doc: D, clock: C, config: &Config) -> Result<Self> {
        Ok(Self {
            doc,
            scheduler: Scheduler::new(clock),
            ledger: ProcessedLedger::new(),
            extractor: AnswerExtractor::new(&config.vocabulary)?,
            probe: PageProbe::new(&config.vocabulary),
            trials: ChoiceTrialEngine::new(&config.timing, &config.vocabulary),
            timing: config.timing.clone(),
            epoch: 0,
            pass: 0,
            pass_pending: false,
            last_location: None,
            last_mutations: None,
            report: PassReport::default(),
        })
    }

    pub fn doc(&self) -> &D {
        &self.doc
    }

    pub fn ledger(&self) -> &ProcessedLedger {
        &self.ledger
    }

    pub fn report(&self) -> &PassReport {
        &self.report
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn is_pass_pending(&self) -> bool {
        self.pass_pending
    }

    /// 没有排队中的任务
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_empty()
    }

    pub fn status(&self) -> Status {
        Status {
            pass: self.pass,
            epoch: self.epoch,
            pass_pending: self.pass_pending,
            queued_tasks: self.scheduler.len(),
            revealed: self.ledger.len(LedgerPhase::RevealRequested),
            filled: self.ledger.len(LedgerPhase::AnswerFilled),
            completed: self.ledger.len(LedgerPhase::Completed),
            report: self.report.clone(),
        }
    }

    /// 立即开始一轮处理；上一轮尚未进入填写阶段时不做任何事
    pub fn run(&mut self) -> bool {
        self.schedule_pass(Duration::ZERO)
    }

    /// 在 `delay` 之后开始一轮处理
    pub fn schedule_pass(&mut self, delay: Duration) -> bool {
        if self.pass_pending {
            info!("⏳ 上一轮仍在进行，忽略本次运行请求");
            return false;
        }
        self.pass_pending = true;
        self.schedule(delay, Task::StartPass);
        true
    }

    /// 清空账本、排队任务和页面上的标记，允许重新处理所有题目
    pub async fn reset(&mut self) -> Result<()> {
        self.ledger.clear();
        self.pass_pending = false;
        self.epoch += 1;
        let dropped = self.scheduler.clear();
        self.report.stale_dropped += dropped;
        let unmarked = self.doc.clear_class(PROCESSED_MARKER).await?
            + self.doc.clear_class(SUBMITTED_MARKER).await?;
        info!("✅ 已重置（丢弃 {} 个任务，清除 {} 个标记）", dropped, unmarked);
        Ok(())
    }

    /// 列出每道可见题目的题型和提取到的答案，不做任何修改
    pub async fn inspect(&self) -> Result<Vec<InspectEntry>> {
        let questions = self.doc.find_visible(None, Role::QuestionContainer).await?;
        info!("🔍 找到 {} 道题", questions.len());

        let mut entries = Vec::with_capacity(questions.len());
        for (index, question) in questions.into_iter().enumerate() {
            match self.inspect_one(index, question).await {
                Ok(entry) => {
                    info!("{}", entry);
                    entries.push(entry);
                }
                Err(e) => warn!("⚠️ 题目 {} 诊断失败: {}", index + 1, e),
            }
        }
        Ok(entries)
    }

    async fn inspect_one(&self, index: usize, question: NodeRef) -> Result<InspectEntry> {
        let key = ContainerKey::from_identity(&self.doc.identity(question).await?);
        let classification = QuestionClassifier::classify(&self.doc, &self.probe, question).await?;
        let answer = self.extractor.resolve(&self.doc, question).await?;
        Ok(InspectEntry {
            index,
            key,
            classification,
            answer,
        })
    }

    /// 地址变化时作废旧任务、清空账本并安排新一轮；返回是否发生了跳转
    pub async fn check_navigation(&mut self) -> Result<bool> {
        let location = self.doc.location().await?;
        let Some(previous) = self.last_location.replace(location.clone()) else {
            return Ok(false);
        };
        if previous == location {
            return Ok(false);
        }

        self.epoch += 1;
        self.ledger.clear();
        self.pass_pending = false;
        let dropped = self.scheduler.clear();
        self.report.stale_dropped += dropped;
        info!("🔀 页面跳转: {} → {}（丢弃 {} 个任务）", previous, location, dropped);
        self.schedule_pass(ms(self.timing.navigation_ms));
        Ok(true)
    }

    /// 页面在空闲时发生了变更则安排新一轮；返回是否安排了
    pub async fn check_mutations(&mut self) -> Result<bool> {
        let count = self.doc.mutation_count().await?;
        let previous = self.last_mutations.replace(count);
        let changed = matches!(previous, Some(p) if count > p);
        if !changed || !self.is_idle() || self.pass_pending {
            return Ok(false);
        }
        debug!("页面发生 {} 次变更", count - previous.unwrap_or(count));
        Ok(self.schedule_pass(ms(self.timing.mutation_debounce_ms)))
    }

    /// 等待下一个到期的任务；取消不会丢失任务
    pub async fn next_task(&mut self) -> Option<ScheduledTask> {
        self.scheduler.next().await
    }

    /// 执行一个任务，错误只记录不返回
    pub async fn execute(&mut self, scheduled: ScheduledTask) {
        if scheduled.epoch != self.epoch {
            self.report.stale_dropped += 1;
            return;
        }
        let prefix = scheduled.task.ctx().map(|ctx| ctx.to_string()).unwrap_or_default();
        match self.handle(scheduled.task).await {
            Ok(()) => {}
            Err(AppError::StaleNode(node)) => {
                warn!("{} ⚠️ 节点 {} 已失效，跳过", prefix, node);
                self.report.stale_dropped += 1;
            }
            Err(e) => {
                error!("{} ❌ 处理失败: {}", prefix, e);
                self.report.errors += 1;
            }
        }
    }

    /// 执行下一个任务；没有任务时返回 `false`
    pub async fn step(&mut self) -> bool {
        match self.next_task().await {
            Some(task) => {
                self.execute(task).await;
                true
            }
            None => false,
        }
    }

    /// 执行到没有任务为止，返回这段时间的统计
    pub async fn drain(&mut self) -> PassReport {
        while self.step().await {}
        std::mem::take(&mut self.report)
    }

    fn schedule(&mut self, delay: Duration, task: Task) {
        let epoch = self.epoch;
        self.scheduler.schedule(delay, ScheduledTask { epoch, task });
    }

    async fn handle(&mut self, task: Task) -> Result<()> {
        match task {
            Task::StartPass => self.start_pass().await,
            Task::RevealClick { button, second } => {
                self.doc.click(button).await?;
                if !second {
                    self.schedule(
                        ms(self.timing.second_click_ms),
                        Task::RevealClick {
                            button,
                            second: true,
                        },
                    );
                }
                Ok(())
            }
            Task::FillPhase => self.fill_phase().await,
            Task::Process { ctx, question } => self.process(ctx, question).await,
            Task::Trial(run) => self.advance_trial(*run).await,
            Task::Submit { ctx, question } => self.prepare_submit(ctx, question).await,
            Task::Confirm { ctx, button } => {
                if self.ledger.is_complete(&ctx.key) {
                    self.report.stale_dropped += 1;
                    return Ok(());
                }
                if TextFillSubmitter::submit(&self.doc, button, &ctx.key, &mut self.ledger).await? {
                    info!("{} ✅ 已提交", ctx);
                    self.report.text_submitted += 1;
                }
                Ok(())
            }
        }
    }

    /// 第一步：双击所有"显示答案"按钮；填写阶段在固定延迟后开始
    async fn start_pass(&mut self) -> Result<()> {
        self.pass += 1;
        info!("\n{}", "=".repeat(60));
        info!("🚀 第 {} 轮处理开始", self.pass);
        info!("{}", "=".repeat(60));

        self.schedule(ms(self.timing.reveal_settle_ms), Task::FillPhase);

        let buttons = self.probe.find_reveal_buttons(&self.doc).await?;
        info!("📝 找到 {} 个\"显示答案\"按钮", buttons.len());
        for (index, button) in buttons.into_iter().enumerate() {
            // 标记会改变 class，进而改变位置键，所以先看标记
            if self.doc.has_class(button, PROCESSED_MARKER).await? {
                continue;
            }
            let key = ContainerKey::from_identity(&self.doc.identity(button).await?);
            if !self.ledger.insert(LedgerPhase::RevealRequested, &key) {
                continue;
            }
            self.doc.add_class(button, PROCESSED_MARKER).await?;
            self.schedule(
                ms(self.timing.click_stagger_ms * index as u64),
                Task::RevealClick {
                    button,
                    second: false,
                },
            );
            self.report.revealed += 1;
        }
        Ok(())
    }

    /// 第二步：为每道尚未处理的题目安排处理，题目之间错开固定间隔
    async fn fill_phase(&mut self) -> Result<()> {
        self.pass_pending = false;

        let questions = self.doc.find_visible(None, Role::QuestionContainer).await?;
        info!("📋 找到 {} 个题目容器", questions.len());

        for (index, question) in questions.into_iter().enumerate() {
            let container = QuestionContainer {
                node: question,
                key: ContainerKey::from_identity(&self.doc.identity(question).await?),
                index,
            };
            let ctx = QuestionCtx::for_container(self.pass, &container);
            if !self.ledger.insert(LedgerPhase::AnswerFilled, &container.key) {
                debug!("{} ⏭️ 已处理过", ctx);
                continue;
            }
            self.schedule(
                ms(self.timing.question_stagger_ms * index as u64),
                Task::Process {
                    ctx,
                    question: container.node,
                },
            );
            self.report.questions_seen += 1;
        }
        Ok(())
    }

    async fn process(&mut self, ctx: QuestionCtx, question: NodeRef) -> Result<()> {
        if self.ledger.is_complete(&ctx.key) {
            self.report.stale_dropped += 1;
            return Ok(());
        }
        info!("{} 📌 开始处理", ctx);

        let kind = match QuestionClassifier::classify(&self.doc, &self.probe, question).await? {
            Classification::AlreadyCorrect => {
                info!("{} ✅ 已经正确，跳过", ctx);
                self.ledger.mark_complete(&ctx.key);
                self.report.skipped_correct += 1;
                return Ok(());
            }
            Classification::Kind(kind) => kind,
        };

        match kind {
            QuestionKind::Choice => {
                info!("{} 🔘 选择题", ctx);
                let run = self.trials.start(&self.doc, ctx, question).await?;
                self.schedule(Duration::ZERO, Task::Trial(Box::new(run)));
            }
            QuestionKind::FreeText | QuestionKind::Unknown => {
                if kind == QuestionKind::Unknown {
                    info!("{} ❓ 无法识别题型，按填空处理", ctx);
                } else {
                    info!("{} ✍️ 填空题", ctx);
                }
                self.fill_text(ctx, question).await?;
            }
        }
        Ok(())
    }

    async fn fill_text(&mut self, ctx: QuestionCtx, question: NodeRef) -> Result<()> {
        let Some(answer) = self.extractor.resolve(&self.doc, question).await? else {
            warn!("{} ❌ 未找到答案", ctx);
            self.report.extraction_misses += 1;
            return Ok(());
        };
        info!("{} 💡 答案: {}", ctx, answer);

        match TextFillSubmitter::fill(&self.doc, question, Some(&answer.text)).await? {
            FillOutcome::Filled(_) => {
                self.schedule(ms(self.timing.submit_ms), Task::Submit { ctx, question });
            }
            FillOutcome::NoAnswer => {
                self.report.extraction_misses += 1;
            }
            FillOutcome::NoControl => {
                warn!("{} ⚠️ 没有找到输入框", ctx);
                self.report.fill_failures += 1;
            }
            FillOutcome::Unavailable(control) => {
                warn!("{} ⚠️ 输入框 {} 无法写入", ctx, control);
                self.report.fill_failures += 1;
            }
        }
        Ok(())
    }

    async fn prepare_submit(&mut self, ctx: QuestionCtx, question: NodeRef) -> Result<()> {
        if self.ledger.is_complete(&ctx.key) {
            self.report.stale_dropped += 1;
            return Ok(());
        }
        match TextFillSubmitter::find_unused_confirm(&self.doc, &self.probe, question).await? {
            ConfirmState::Ready(button) => {
                self.schedule(ms(self.timing.confirm_ms), Task::Confirm { ctx, button });
            }
            ConfirmState::Used(button) => debug!("{} 确认按钮 {} 已点击过", ctx, button),
            ConfirmState::Missing => warn!("{} ⚠️ 没有找到确认按钮", ctx),
        }
        Ok(())
    }

    async fn advance_trial(&mut self, run: TrialRun) -> Result<()> {
        if self.ledger.is_complete(&run.ctx.key) {
            self.report.stale_dropped += 1;
            return Ok(());
        }
        match self.trials.advance(&self.doc, run, &mut self.ledger).await? {
            TrialStep::Continue { run, after } => {
                self.schedule(after, Task::Trial(Box::new(run)));
            }
            TrialStep::Finished(TrialOutcome::Correct { .. }) => {
                self.report.choice_correct += 1;
            }
            TrialStep::Finished(TrialOutcome::Exhausted { .. }) => {
                self.report.choice_exhausted += 1;
            }
        }
        Ok(())
    }
}
