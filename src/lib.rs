//! # Quiz Autocomplete
//!
//! 一个用于自动完成网页练习题的 Rust 应用程序：显示答案、提取答案、填写并提交，
//! 无法提取答案的选择题逐个选项试错。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `Document` - 可查询、可修改的文档树抽象
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `CdpDocument` - 通过 JsExecutor 实现 Document
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，一次只处理一道题
//! - `TextClassifier` - 判断一行文字是界面标签、解释还是答案
//! - `AnswerExtractor` - 从答案区域提取答案
//! - `QuestionClassifier` - 判断题型
//! - `TextFillSubmitter` - 填写并提交
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义跨越多个延迟的处理流程
//! - `Scheduler` / `Clock` - 延迟队列，测试中使用虚拟时钟
//! - `ChoiceTrialEngine` - 选择题试错状态机
//! - `QuestionCtx` - 上下文封装（pass + question_index + key）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/page_orchestrator` - 页面处理器，持有账本和调度器
//! - `orchestrator/app` - 应用入口，管理浏览器资源和运行模式
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{connect_to_browser_and_page, launch_browser};
pub use config::Config;
pub use error::{AppError, Result};
pub use infrastructure::{CdpDocument, Document, JsExecutor};
pub use models::{ContainerKey, ProcessedLedger, QuestionKind};
pub use orchestrator::{App, PageOrchestrator, PassReport};
pub use workflow::{ChoiceTrialEngine, QuestionCtx, Scheduler, TokioClock, VirtualClock};
