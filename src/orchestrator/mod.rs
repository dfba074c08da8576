//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责任务调度和运行模式，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理应用生命周期（初始化、运行）
//! - 管理浏览器资源（Browser、JsExecutor、CdpDocument）
//! - watch 模式的轮询和命令处理
//! - 输出最终统计信息
//!
//! ### `page_orchestrator` - 页面处理器
//! - 每轮双击"显示答案"，再遍历题目容器
//! - 按题型分发给 `ChoiceTrialEngine` 或 `TextFillSubmitter`
//! - 持有 `ProcessedLedger` 和 `Scheduler`
//! - 检测跳转，作废旧任务
//!
//! ## 层次关系
//!
//! ```text
//! app (浏览器 + 运行模式)
//!     ↓
//! page_orchestrator (一个页面会话)
//!     ↓
//! workflow (Scheduler / ChoiceTrialEngine)
//!     ↓
//! services (能力层：extract / classify / fill)
//!     ↓
//! infrastructure (基础设施：Document / JsExecutor)
//! ```

pub mod app;
pub mod page_orchestrator;

// 重新导出主要类型
pub use app::{App, Command};
pub use page_orchestrator::{InspectEntry, PageOrchestrator, PassReport, ScheduledTask, Status};
