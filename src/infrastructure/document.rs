//! 文档能力抽象 - 基础设施层
//!
//! 页面被看作一棵可查询、可修改的元素树。引擎只通过这里的 trait 与页面交互，
//! 既可以由真实浏览器（`CdpDocument`）实现，也可以由测试里的内存页面实现。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 元素句柄，只在同一个页面会话内有效
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeRef(pub u32);

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 元素在题目中扮演的角色，由实现方映射到具体的选择器
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// 题目容器
    QuestionContainer,
    /// 任意按钮
    Button,
    /// 可点击的选项（label / .choice / .option）
    ChoiceLabel,
    /// 单选框 / 复选框
    ChoiceInput,
    /// 判定题型用的文本输入框
    TextEntry,
    /// 填写答案用的控件，按优先级排列
    TextControl,
    /// 点击"显示答案"后出现的区域
    AnswerRegion,
    /// 代码 / 预格式化块
    CodeBlock,
    /// 题目已答对的标记，只用于跳过已完成的题目
    AnsweredMarker,
    /// 判分结果里的正确标记
    CorrectMarker,
    /// 错误标记
    IncorrectMarker,
}

impl Role {
    pub const ALL: [Role; 11] = [
        Role::QuestionContainer,
        Role::Button,
        Role::ChoiceLabel,
        Role::ChoiceInput,
        Role::TextEntry,
        Role::TextControl,
        Role::AnswerRegion,
        Role::CodeBlock,
        Role::AnsweredMarker,
        Role::CorrectMarker,
        Role::IncorrectMarker,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Role::QuestionContainer => "question_container",
            Role::Button => "button",
            Role::ChoiceLabel => "choice_label",
            Role::ChoiceInput => "choice_input",
            Role::TextEntry => "text_entry",
            Role::TextControl => "text_control",
            Role::AnswerRegion => "answer_region",
            Role::CodeBlock => "code_block",
            Role::AnsweredMarker => "answered_marker",
            Role::CorrectMarker => "correct_marker",
            Role::IncorrectMarker => "incorrect_marker",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 计算元素身份所需的信息
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct NodeIdentity {
    pub tag: String,
    pub top: f64,
    pub left: f64,
    pub class_name: String,
    /// 页面提供的稳定标识（id / data-id），可能不存在
    pub stable_id: Option<String>,
}

/// 文本控件的种类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlKind {
    Input,
    TextArea,
    ContentEditable,
    CodeEditor,
}

/// 写入控件值的方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueWrite {
    /// 直接给 value 赋值
    Direct,
    /// 调用原型上的 value setter，框架才能感知
    NativeSetter,
    /// 设置 textContent（contenteditable）
    TextContent,
    /// 通过代码编辑器自身的接口写入
    CodeEditor,
}

/// 合成事件
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DomEvent {
    Input,
    Change,
    KeyUp,
    Blur,
}

impl DomEvent {
    pub fn name(self) -> &'static str {
        match self {
            DomEvent::Input => "input",
            DomEvent::Change => "change",
            DomEvent::KeyUp => "keyup",
            DomEvent::Blur => "blur",
        }
    }
}

/// 可查询、可修改的文档树
///
/// `find_all` 的结果先按选择器优先级、再按文档顺序排列。
#[allow(async_fn_in_trait)]
pub trait Document {
    /// 当前地址
    async fn location(&self) -> Result<String>;

    /// 在 `scope`（为空时为整个页面）内查找扮演 `role` 的元素
    async fn find_all(&self, scope: Option<NodeRef>, role: Role) -> Result<Vec<NodeRef>>;

    async fn is_visible(&self, node: NodeRef) -> Result<bool>;

    /// 元素的文本内容（保留换行）
    async fn text(&self, node: NodeRef) -> Result<String>;

    async fn has_class(&self, node: NodeRef, class: &str) -> Result<bool>;

    async fn add_class(&self, node: NodeRef, class: &str) -> Result<()>;

    async fn remove_class(&self, node: NodeRef, class: &str) -> Result<()>;

    /// 从整个页面移除某个 class，返回受影响的元素数量
    async fn clear_class(&self, class: &str) -> Result<usize>;

    async fn attribute(&self, node: NodeRef, name: &str) -> Result<Option<String>>;

    async fn element_by_id(&self, id: &str) -> Result<Option<NodeRef>>;

    async fn identity(&self, node: NodeRef) -> Result<NodeIdentity>;

    /// 元素作为文本控件的种类，不是文本控件时为 `None`
    async fn control_kind(&self, node: NodeRef) -> Result<Option<ControlKind>>;

    async fn click(&self, node: NodeRef) -> Result<()>;

    async fn set_checked(&self, node: NodeRef, checked: bool) -> Result<()>;

    async fn focus(&self, node: NodeRef) -> Result<()>;

    /// 按指定方式写入值；该方式对此元素不可用时返回 `false`
    async fn write_value(&self, node: NodeRef, value: &str, how: ValueWrite) -> Result<bool>;

    async fn dispatch(&self, node: NodeRef, event: DomEvent) -> Result<()>;

    /// 页面子树发生变更的累计次数
    async fn mutation_count(&self) -> Result<u64>;

    async fn find_first(&self, scope: Option<NodeRef>, role: Role) -> Result<Option<NodeRef>> {
        Ok(self.find_all(scope, role).await?.into_iter().next())
    }

    async fn find_visible(&self, scope: Option<NodeRef>, role: Role) -> Result<Vec<NodeRef>> {
        let mut visible = Vec::new();
        for node in self.find_all(scope, role).await? {
            if self.is_visible(node).await? {
                visible.push(node);
            }
        }
        Ok(visible)
    }

    /// 去掉首尾空白的文本
    async fn trimmed_text(&self, node: NodeRef) -> Result<String> {
        Ok(self.text(node).await?.trim().to_string())
    }
}
