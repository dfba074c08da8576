//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责浏览器资源和运行模式。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：写日志头、连接或启动浏览器、创建 `CdpDocument`
//! 2. **watch 模式**：启动后运行一轮，轮询地址和页面变更，读取标准输入的命令
//! 3. **run 模式**：运行一轮并等所有任务结束
//! 4. **inspect 模式**：只输出诊断信息
//!
//! ## 设计特点
//!
//! - **资源所有者**：唯一持有 Browser 的模块
//! - **向下委托**：题目处理全部委托给 `PageOrchestrator`

use anyhow::{Context, Result};
use chromiumoxide::Browser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::browser;
use crate::config::{ms, Config};
use crate::infrastructure::{CdpDocument, JsExecutor};
use crate::orchestrator::page_orchestrator::{InspectEntry, PageOrchestrator, PassReport};
use crate::utils::logging::{init_log_file, log_startup};
use crate::workflow::TokioClock;

/// 标准输入命令
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Run,
    Reset,
    Inspect,
    Status,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "run" => Some(Command::Run),
            "reset" => Some(Command::Reset),
            "inspect" | "debug" => Some(Command::Inspect),
            "status" => Some(Command::Status),
            "quit" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    _browser: Browser,
    orchestrator: PageOrchestrator<CdpDocument, TokioClock>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        log_startup(&config);

        config.selectors.validate()?;

        // 连接或启动浏览器
        let (browser, page) = if config.launch_browser {
            browser::launch_browser(
                &config.target_url,
                config.headless,
                config.chrome_executable.as_deref(),
            )
            .await?
        } else {
            browser::connect_to_browser_and_page(
                config.browser_debug_port,
                Some(&config.target_url),
                None,
            )
            .await?
        };

        // 创建 JsExecutor（持有 page）
        let executor = JsExecutor::new(page);
        let document = CdpDocument::new(executor, config.selectors.clone());
        let orchestrator = PageOrchestrator::new(document, TokioClock::new(), &config)
            .context("创建页面处理器失败")?;

        Ok(Self {
            config,
            _browser: browser,
            orchestrator,
        })
    }

    /// 常驻模式：处理标准输入命令，直到 `quit` 或输入结束
    pub async fn watch(mut self) -> Result<()> {
        self.orchestrator.check_navigation().await?;
        self.orchestrator.check_mutations().await?;
        self.orchestrator
            .schedule_pass(ms(self.config.timing.startup_ms));
        info!("💡 命令: run / reset / inspect / status / quit");

        let mut poll = interval(ms(self.config.timing.poll_interval_ms));
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;

        loop {
            tokio::select! {
                Some(task) = self.orchestrator.next_task(), if !self.orchestrator.is_idle() => {
                    self.orchestrator.execute(task).await;
                }
                _ = poll.tick() => {
                    if let Err(e) = self.poll_page().await {
                        warn!("⚠️ 检查页面状态失败: {}", e);
                    }
                }
                line = lines.next_line(), if stdin_open => {
                    match line? {
                        Some(line) => {
                            if !self.handle_line(&line).await? {
                                break;
                            }
                        }
                        None => stdin_open = false,
                    }
                }
            }
        }

        print_final_stats(self.orchestrator.report(), &self.config);
        Ok(())
    }

    /// 运行一轮，等所有任务结束后退出
    pub async fn run_once(mut self) -> Result<PassReport> {
        self.orchestrator.check_navigation().await?;
        self.orchestrator.run();
        let report = self.orchestrator.drain().await;
        print_final_stats(&report, &self.config);
        Ok(report)
    }

    /// 只输出诊断信息
    pub async fn inspect(&self) -> Result<Vec<InspectEntry>> {
        Ok(self.orchestrator.inspect().await?)
    }

    async fn poll_page(&mut self) -> Result<()> {
        if !self.orchestrator.check_navigation().await? {
            self.orchestrator.check_mutations().await?;
        }
        Ok(())
    }

    /// 处理一行命令；返回 `false` 表示退出
    async fn handle_line(&mut self, line: &str) -> Result<bool> {
        if line.trim().is_empty() {
            return Ok(true);
        }
        let Some(command) = Command::parse(line) else {
            warn!("⚠️ 未知命令: {}", line.trim());
            return Ok(true);
        };
        match command {
            Command::Run => {
                self.orchestrator.run();
            }
            Command::Reset => self.orchestrator.reset().await?,
            Command::Inspect => {
                self.orchestrator.inspect().await?;
            }
            Command::Status => info!("\n{}", self.orchestrator.status()),
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }
}

// ========== 日志辅助函数 ==========

fn print_final_stats(report: &PassReport, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("\n{}", report);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", config.output_log_file);
}
