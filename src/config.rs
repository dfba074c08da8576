use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::infrastructure::Role;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 目标URL
    pub target_url: String,
    /// 是否自行启动浏览器（否则连接已打开的浏览器）
    pub launch_browser: bool,
    /// 自行启动时是否无头
    pub headless: bool,
    /// 浏览器可执行文件路径（为空时由 chromiumoxide 自动探测）
    pub chrome_executable: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 启发式配置文件（TOML）
    pub heuristics_file: Option<String>,
    // --- 以下三项可由启发式配置文件覆盖 ---
    pub timing: Timing,
    pub vocabulary: Vocabulary,
    pub selectors: Selectors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            target_url: "https://learn.zybooks.com/".to_string(),
            launch_browser: false,
            headless: false,
            chrome_executable: None,
            verbose_logging: false,
            output_log_file: "autocomplete.log".to_string(),
            heuristics_file: None,
            timing: Timing::default(),
            vocabulary: Vocabulary::default(),
            selectors: Selectors::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            target_url: std::env::var("TARGET_URL").unwrap_or(default.target_url),
            launch_browser: std::env::var("LAUNCH_BROWSER").ok().and_then(|v| v.parse().ok()).unwrap_or(default.launch_browser),
            headless: std::env::var("HEADLESS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.headless),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(default.chrome_executable),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            heuristics_file: std::env::var("HEURISTICS_FILE").ok().or(default.heuristics_file),
            ..default
        }
    }

    /// 读取环境变量，并合并启发式配置文件（如果设置了 `HEURISTICS_FILE`）
    pub fn load() -> Result<Self> {
        let mut config = Self::from_env();
        if let Some(path) = config.heuristics_file.clone() {
            let overrides = HeuristicsFile::from_path(Path::new(&path))?;
            config.apply(overrides);
        }
        Ok(config)
    }

    /// 用配置文件中的内容覆盖当前配置
    pub fn apply(&mut self, overrides: HeuristicsFile) {
        self.timing = overrides.timing;
        self.vocabulary = overrides.vocabulary;
        self.selectors = overrides.selectors;
    }
}

/// 启发式配置文件的结构，缺省字段取默认值
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HeuristicsFile {
    pub timing: Timing,
    pub vocabulary: Vocabulary,
    pub selectors: Selectors,
}

impl HeuristicsFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, &path.display().to_string())
    }

    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        let file = toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
            path: origin.to_string(),
            source,
        })?;
        Ok(file)
    }
}

/// 所有延迟，单位毫秒
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timing {
    /// 启动后首次运行前的等待
    pub startup_ms: u64,
    /// 轮询地址栏的间隔
    pub poll_interval_ms: u64,
    /// 检测到跳转后再次运行前的等待
    pub navigation_ms: u64,
    /// 点击"显示答案"后到开始填写的等待
    pub reveal_settle_ms: u64,
    /// 相邻"显示答案"按钮之间的错开
    pub click_stagger_ms: u64,
    /// 同一按钮第二次点击的间隔
    pub second_click_ms: u64,
    /// 相邻题目之间的错开
    pub question_stagger_ms: u64,
    /// 选中选项后到点击确认的等待
    pub selection_settle_ms: u64,
    /// 点击确认后到读取判定结果的等待
    pub result_settle_ms: u64,
    /// 判定错误后尝试下一个选项前的等待
    pub retry_ms: u64,
    /// 找不到确认按钮时尝试下一个选项前的等待
    pub no_confirm_retry_ms: u64,
    /// 填写后到查找确认按钮的等待
    pub submit_ms: u64,
    /// 找到确认按钮后到点击的等待
    pub confirm_ms: u64,
    /// 检测到页面变更后再次运行前的等待
    pub mutation_debounce_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            startup_ms: 3000,
            poll_interval_ms: 1000,
            navigation_ms: 2000,
            reveal_settle_ms: 800,
            click_stagger_ms: 100,
            second_click_ms: 150,
            question_stagger_ms: 300,
            selection_settle_ms: 300,
            result_settle_ms: 500,
            retry_ms: 300,
            no_confirm_retry_ms: 200,
            submit_ms: 250,
            confirm_ms: 150,
            mutation_debounce_ms: 1000,
        }
    }
}

/// 毫秒转 `Duration`
pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// 文本启发式使用的词表
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Vocabulary {
    /// 界面标签，整行匹配（不区分大小写）即视为元文本
    pub meta_phrases: Vec<String>,
    /// 出现即视为解释性语句的关键词
    pub explanation_keywords: Vec<String>,
    /// 答案行前可能出现的标签前缀
    pub label_prefixes: Vec<String>,
    /// 确认按钮的文字
    pub confirm_labels: Vec<String>,
    /// "显示答案"按钮的文字
    pub reveal_labels: Vec<String>,
    /// 带有这些 class 的判定标记不算作正确
    pub incorrect_classes: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            meta_phrases: strings(&[
                "answer",
                "show answer",
                "correct answer",
                "solution",
                "check",
                "submit",
                "next",
                "question",
                "press again",
            ]),
            explanation_keywords: strings(&[
                "loop",
                "body",
                "execute",
                "time",
                "gotten",
                "initialized",
                "will be",
                "as follows",
                "true",
                "false",
                "because",
                "thus",
                "first",
                "second",
                "third",
                "input",
                "relevant",
                "additional",
                "declares",
                "assigned",
                "integer value",
                "named values",
                "within",
            ]),
            label_prefixes: strings(&["answer", "solution", "correct answer"]),
            confirm_labels: strings(&["check", "submit"]),
            reveal_labels: strings(&["show answer", "show answers"]),
            incorrect_classes: strings(&["incorrect", "zb-incorrect"]),
        }
    }
}

/// 每个角色对应的 CSS 选择器，列表顺序即优先级
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Selectors {
    pub question_container: Vec<String>,
    pub button: Vec<String>,
    pub choice_label: Vec<String>,
    pub choice_input: Vec<String>,
    pub text_entry: Vec<String>,
    pub text_control: Vec<String>,
    pub answer_region: Vec<String>,
    pub code_block: Vec<String>,
    pub answered_marker: Vec<String>,
    pub correct_marker: Vec<String>,
    pub incorrect_marker: Vec<String>,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            question_container: strings(&[
                r#".question-set-question, .zb-activity, .question-container, [class*="question"]"#,
            ]),
            button: strings(&["button"]),
            choice_label: strings(&[r#"label, .choice, .option, [role="radio"]"#]),
            choice_input: strings(&[r#"input[type="radio"], input[type="checkbox"]"#]),
            text_entry: strings(&[r#"input[type="text"], input[type="number"], textarea"#]),
            text_control: strings(&[
                r#"input[type="text"]"#,
                r#"input[type="number"]"#,
                ".short-answer-input",
                "textarea",
                ".zb-text-area",
                r#"div[contenteditable="true"]"#,
                ".CodeMirror",
            ]),
            answer_region: strings(&[
                ".forfeit-answer",
                ".forfeit-content",
                ".correct-answer",
                ".solution-content",
                ".answer-key",
            ]),
            code_block: strings(&["code, pre, .code, .forfeit-code, samp, .zb-code"]),
            answered_marker: strings(&[".correct, .answered-correctly, .zb-correct"]),
            correct_marker: strings(&[
                r#".correct, .answered-correctly, .zb-correct, [class*="correct"]"#,
            ]),
            incorrect_marker: strings(&[
                r#".incorrect, .zb-incorrect, .wrong, [class*="incorrect"]"#,
            ]),
        }
    }
}

impl Selectors {
    pub fn for_role(&self, role: Role) -> &[String] {
        match role {
            Role::QuestionContainer => &self.question_container,
            Role::Button => &self.button,
            Role::ChoiceLabel => &self.choice_label,
            Role::ChoiceInput => &self.choice_input,
            Role::TextEntry => &self.text_entry,
            Role::TextControl => &self.text_control,
            Role::AnswerRegion => &self.answer_region,
            Role::CodeBlock => &self.code_block,
            Role::AnsweredMarker => &self.answered_marker,
            Role::CorrectMarker => &self.correct_marker,
            Role::IncorrectMarker => &self.incorrect_marker,
        }
    }

    /// 确认每个角色至少有一个选择器
    pub fn validate(&self) -> Result<()> {
        for role in Role::ALL {
            if self.for_role(role).iter().all(|s| s.trim().is_empty()) {
                return Err(ConfigError::MissingSelectors {
                    role: role.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
