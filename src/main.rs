use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use quiz_autocomplete::config::Config;
use quiz_autocomplete::orchestrator::App;
use quiz_autocomplete::utils::logging;

#[derive(Parser, Debug)]
#[command(name = "quiz-autocomplete", version, about = "自动完成网页练习题")]
struct Args {
    #[command(subcommand)]
    command: Option<Mode>,

    /// 显示详细日志（覆盖 VERBOSE_LOGGING）
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// 常驻：启动后运行一轮，跳转或页面变化时再运行，读取标准输入命令（默认）
    Watch,
    /// 运行一轮后退出
    Run,
    /// 只输出每道题的题型和答案，不做任何修改
    Inspect,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 加载配置
    let mut config = Config::load()?;
    config.verbose_logging |= args.verbose;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let app = App::initialize(config).await?;
    match args.command.unwrap_or(Mode::Watch) {
        Mode::Watch => app.watch().await?,
        Mode::Run => {
            app.run_once().await?;
        }
        Mode::Inspect => {
            let entries = app.inspect().await?;
            info!("🔍 共诊断 {} 道题", entries.len());
        }
    }

    Ok(())
}
