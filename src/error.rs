use thiserror::Error;

use crate::infrastructure::NodeRef;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),

    /// 页面内脚本执行失败（脚本自身抛出异常）
    #[error("脚本执行失败: {message}")]
    Script { message: String },

    /// 脚本返回值无法解析
    #[error("脚本返回值解析失败: {0}")]
    Decode(#[from] serde_json::Error),

    /// 节点引用已失效（页面重新渲染或跳转）
    #[error("节点 {0} 已失效")]
    StaleNode(NodeRef),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 文件操作错误
    #[error("文件错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: chromiumoxide::error::CdpError,
    },
    /// 浏览器配置失败
    #[error("浏览器配置失败: {0}")]
    ConfigurationFailed(String),
    /// CDP 调用失败
    #[error("CDP 调用失败: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 正则表达式无效
    #[error("无效的正则表达式 `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    /// 某个角色没有配置任何选择器
    #[error("角色 {role} 没有配置选择器")]
    MissingSelectors { role: String },
}

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::Cdp(err))
    }
}

impl AppError {
    /// 创建脚本执行错误
    pub fn script(message: impl Into<String>) -> Self {
        AppError::Script {
            message: message.into(),
        }
    }
}

/// 应用程序结果类型
pub type Result<T> = std::result::Result<T, AppError>;
