//! 内存中的假页面，用于在没有浏览器的情况下驱动引擎
//!
//! 节点按创建顺序即文档顺序。点击确认按钮时，根据预先登记的判分规则
//! 在题目里显示正确或错误标记。

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};

use quiz_autocomplete::config::Config;
use quiz_autocomplete::error::{AppError, Result};
use quiz_autocomplete::infrastructure::{
    ControlKind, Document, DomEvent, NodeIdentity, NodeRef, Role, ValueWrite,
};
use quiz_autocomplete::orchestrator::PageOrchestrator;
use quiz_autocomplete::workflow::VirtualClock;

#[derive(Clone, Debug, Default)]
pub struct FakeNode {
    pub parent: Option<NodeRef>,
    pub roles: Vec<Role>,
    pub classes: BTreeSet<String>,
    pub visible: bool,
    pub text: String,
    pub attributes: HashMap<String, String>,
    pub control: Option<ControlKind>,
    pub value: String,
    pub checked: bool,
    pub detached: bool,
}

impl FakeNode {
    pub fn new(text: &str) -> Self {
        Self {
            visible: true,
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.insert(class.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn control(mut self, kind: ControlKind) -> Self {
        self.control = Some(kind);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// 页面上发生的修改，按时间顺序记录
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Click(NodeRef),
    Check(NodeRef),
    Write(NodeRef, String, ValueWrite),
    Dispatch(NodeRef, DomEvent),
    Focus(NodeRef),
}

enum Expectation {
    /// 选中此 input 即为正确；`None` 表示永远不对
    Choice(Option<NodeRef>),
    /// 控件的值等于答案即为正确
    Text { control: NodeRef, answer: String },
}

struct Grader {
    marker: NodeRef,
    expectation: Expectation,
}

/// 一道选择题的节点
pub struct ChoiceFixture {
    pub question: NodeRef,
    pub labels: Vec<NodeRef>,
    pub inputs: Vec<NodeRef>,
    pub confirm: Option<NodeRef>,
}

/// 一道填空题的节点
pub struct TextFixture {
    pub question: NodeRef,
    pub reveal: Option<NodeRef>,
    pub region: NodeRef,
    pub control: NodeRef,
    pub confirm: NodeRef,
}

pub struct FakePage {
    nodes: RefCell<Vec<FakeNode>>,
    location: RefCell<String>,
    mutations: Cell<u64>,
    actions: RefCell<Vec<Action>>,
    graders: RefCell<HashMap<NodeRef, Grader>>,
    /// 第二次点击后显示的答案区域
    reveals: RefCell<HashMap<NodeRef, NodeRef>>,
    editor_ready: Cell<bool>,
}

impl FakePage {
    pub fn new(location: &str) -> Self {
        Self {
            nodes: RefCell::new(Vec::new()),
            location: RefCell::new(location.to_string()),
            mutations: Cell::new(0),
            actions: RefCell::new(Vec::new()),
            graders: RefCell::new(HashMap::new()),
            reveals: RefCell::new(HashMap::new()),
            editor_ready: Cell::new(true),
        }
    }

    pub fn add(&self, parent: Option<NodeRef>, mut node: FakeNode) -> NodeRef {
        node.parent = parent;
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(node);
        self.touch();
        NodeRef(nodes.len() as u32 - 1)
    }

    pub fn question(&self) -> NodeRef {
        self.add(
            None,
            FakeNode::new("")
                .role(Role::QuestionContainer)
                .class("question-set-question"),
        )
    }

    /// 选择题：`correct` 为正确选项的下标
    pub fn choice_question(
        &self,
        options: &[&str],
        correct: Option<usize>,
        with_confirm: bool,
    ) -> ChoiceFixture {
        let question = self.question();
        let mut labels = Vec::new();
        let mut inputs = Vec::new();
        for text in options {
            let label = self.add(Some(question), FakeNode::new(text).role(Role::ChoiceLabel));
            let input = self.add(
                Some(label),
                FakeNode::new("").role(Role::ChoiceInput).attr("type", "radio"),
            );
            labels.push(label);
            inputs.push(input);
        }
        let marker = self.add(Some(question), FakeNode::new(""));
        let confirm = with_confirm.then(|| self.button(question, "Check"));
        if let Some(button) = confirm {
            self.graders.borrow_mut().insert(
                button,
                Grader {
                    marker,
                    expectation: Expectation::Choice(correct.map(|i| inputs[i])),
                },
            );
        }
        ChoiceFixture {
            question,
            labels,
            inputs,
            confirm,
        }
    }

    /// 填空题：答案区域默认隐藏，双击"Show answer"后显示
    pub fn text_question(&self, region_text: &str, code: Option<&str>, answer: &str) -> TextFixture {
        let question = self.question();
        let reveal = self.button(question, "Show answer");
        let region = self.add(
            Some(question),
            FakeNode::new(region_text)
                .role(Role::AnswerRegion)
                .class("forfeit-answer")
                .hidden(),
        );
        if let Some(code) = code {
            self.add(Some(region), FakeNode::new(code).role(Role::CodeBlock));
        }
        let control = self.add(
            Some(question),
            FakeNode::new("")
                .role(Role::TextEntry)
                .role(Role::TextControl)
                .control(ControlKind::Input),
        );
        let marker = self.add(Some(question), FakeNode::new(""));
        let confirm = self.button(question, "Check");
        self.graders.borrow_mut().insert(
            confirm,
            Grader {
                marker,
                expectation: Expectation::Text {
                    control,
                    answer: answer.to_string(),
                },
            },
        );
        self.reveals.borrow_mut().insert(reveal, region);
        TextFixture {
            question,
            reveal: Some(reveal),
            region,
            control,
            confirm,
        }
    }

    pub fn button(&self, parent: NodeRef, label: &str) -> NodeRef {
        self.add(Some(parent), FakeNode::new(label).role(Role::Button))
    }

    pub fn mark_correct(&self, question: NodeRef) -> NodeRef {
        self.add(
            Some(question),
            FakeNode::new("")
                .role(Role::AnsweredMarker)
                .role(Role::CorrectMarker)
                .class("zb-correct"),
        )
    }

    /// 给已有节点追加角色和 class，模拟一个元素同时命中多个选择器
    pub fn decorate(&self, node: NodeRef, role: Role, class: &str) {
        let mut nodes = self.nodes.borrow_mut();
        let n = &mut nodes[node.0 as usize];
        n.roles.push(role);
        n.classes.insert(class.to_string());
    }

    pub fn strip_role(&self, node: NodeRef, role: Role) {
        self.nodes.borrow_mut()[node.0 as usize]
            .roles
            .retain(|r| *r != role);
    }

    pub fn navigate(&self, location: &str) {
        *self.location.borrow_mut() = location.to_string();
    }

    pub fn detach(&self, node: NodeRef) {
        self.nodes.borrow_mut()[node.0 as usize].detached = true;
        self.touch();
    }

    pub fn set_editor_ready(&self, ready: bool) {
        self.editor_ready.set(ready);
    }

    pub fn node(&self, node: NodeRef) -> FakeNode {
        self.nodes.borrow()[node.0 as usize].clone()
    }

    pub fn value(&self, node: NodeRef) -> String {
        self.node(node).value
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.borrow().clone()
    }

    pub fn clicks(&self, node: NodeRef) -> usize {
        self.actions
            .borrow()
            .iter()
            .filter(|a| **a == Action::Click(node))
            .count()
    }

    /// 被选中（set_checked）的 input，按时间顺序
    pub fn checked_order(&self) -> Vec<NodeRef> {
        self.actions
            .borrow()
            .iter()
            .filter_map(|a| match a {
                Action::Check(node) => Some(*node),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self, node: NodeRef) -> Vec<(String, ValueWrite)> {
        self.actions
            .borrow()
            .iter()
            .filter_map(|a| match a {
                Action::Write(n, value, how) if *n == node => Some((value.clone(), *how)),
                _ => None,
            })
            .collect()
    }

    pub fn dispatched(&self, node: NodeRef) -> Vec<DomEvent> {
        self.actions
            .borrow()
            .iter()
            .filter_map(|a| match a {
                Action::Dispatch(n, event) if *n == node => Some(*event),
                _ => None,
            })
            .collect()
    }

    pub fn shows_role(&self, question: NodeRef, role: Role) -> bool {
        let nodes = self.nodes.borrow();
        (0..nodes.len()).any(|i| {
            nodes[i].roles.contains(&role) && self.is_within(&nodes, NodeRef(i as u32), question)
        })
    }

    fn touch(&self) {
        self.mutations.set(self.mutations.get() + 1);
    }

    fn record(&self, action: Action) {
        self.actions.borrow_mut().push(action);
        self.touch();
    }

    fn live(&self, node: NodeRef) -> Result<()> {
        match self.nodes.borrow().get(node.0 as usize) {
            Some(n) if !n.detached => Ok(()),
            _ => Err(AppError::StaleNode(node)),
        }
    }

    fn is_within(&self, nodes: &[FakeNode], node: NodeRef, scope: NodeRef) -> bool {
        let mut current = nodes[node.0 as usize].parent;
        while let Some(parent) = current {
            if parent == scope {
                return true;
            }
            current = nodes[parent.0 as usize].parent;
        }
        false
    }

    fn root_of(&self, nodes: &[FakeNode], node: NodeRef) -> NodeRef {
        let mut current = node;
        while let Some(parent) = nodes[current.0 as usize].parent {
            current = parent;
        }
        current
    }

    fn check_input(&self, node: NodeRef) {
        let mut nodes = self.nodes.borrow_mut();
        if !nodes[node.0 as usize].roles.contains(&Role::ChoiceInput) {
            return;
        }
        let root = self.root_of(&nodes, node);
        for i in 0..nodes.len() {
            let other = NodeRef(i as u32);
            if nodes[i].roles.contains(&Role::ChoiceInput) && self.root_of(&nodes, other) == root {
                nodes[i].checked = false;
            }
        }
        nodes[node.0 as usize].checked = true;
    }

    fn grade(&self, button: NodeRef) {
        let graders = self.graders.borrow();
        let Some(grader) = graders.get(&button) else {
            return;
        };
        let mut nodes = self.nodes.borrow_mut();
        let correct = match &grader.expectation {
            Expectation::Choice(Some(input)) => nodes[input.0 as usize].checked,
            Expectation::Choice(None) => false,
            Expectation::Text { control, answer } => nodes[control.0 as usize].value == *answer,
        };
        nodes[grader.marker.0 as usize].roles = if correct {
            vec![Role::AnsweredMarker, Role::CorrectMarker]
        } else {
            vec![Role::IncorrectMarker]
        };
    }

    fn reveal(&self, button: NodeRef) {
        let Some(region) = self.reveals.borrow().get(&button).copied() else {
            return;
        };
        if self.clicks(button) >= 2 {
            self.nodes.borrow_mut()[region.0 as usize].visible = true;
        }
    }
}

impl Document for FakePage {
    async fn location(&self) -> Result<String> {
        Ok(self.location.borrow().clone())
    }

    async fn find_all(&self, scope: Option<NodeRef>, role: Role) -> Result<Vec<NodeRef>> {
        if let Some(scope) = scope {
            self.live(scope)?;
        }
        let nodes = self.nodes.borrow();
        Ok((0..nodes.len())
            .map(|i| NodeRef(i as u32))
            .filter(|&node| {
                let n = &nodes[node.0 as usize];
                !n.detached
                    && n.roles.contains(&role)
                    && scope.map_or(true, |s| self.is_within(&nodes, node, s))
            })
            .collect())
    }

    async fn is_visible(&self, node: NodeRef) -> Result<bool> {
        self.live(node)?;
        let nodes = self.nodes.borrow();
        let mut current = Some(node);
        while let Some(n) = current {
            if !nodes[n.0 as usize].visible {
                return Ok(false);
            }
            current = nodes[n.0 as usize].parent;
        }
        Ok(true)
    }

    async fn text(&self, node: NodeRef) -> Result<String> {
        self.live(node)?;
        let nodes = self.nodes.borrow();
        let mut parts = vec![nodes[node.0 as usize].text.clone()];
        for i in 0..nodes.len() {
            if self.is_within(&nodes, NodeRef(i as u32), node) {
                parts.push(nodes[i].text.clone());
            }
        }
        Ok(parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn has_class(&self, node: NodeRef, class: &str) -> Result<bool> {
        self.live(node)?;
        Ok(self.nodes.borrow()[node.0 as usize].classes.contains(class))
    }

    async fn add_class(&self, node: NodeRef, class: &str) -> Result<()> {
        self.live(node)?;
        self.nodes.borrow_mut()[node.0 as usize]
            .classes
            .insert(class.to_string());
        self.touch();
        Ok(())
    }

    async fn remove_class(&self, node: NodeRef, class: &str) -> Result<()> {
        self.live(node)?;
        self.nodes.borrow_mut()[node.0 as usize].classes.remove(class);
        self.touch();
        Ok(())
    }

    async fn clear_class(&self, class: &str) -> Result<usize> {
        let mut removed = 0;
        for node in self.nodes.borrow_mut().iter_mut() {
            if node.classes.remove(class) {
                removed += 1;
            }
        }
        self.touch();
        Ok(removed)
    }

    async fn attribute(&self, node: NodeRef, name: &str) -> Result<Option<String>> {
        self.live(node)?;
        Ok(self.nodes.borrow()[node.0 as usize]
            .attributes
            .get(name)
            .cloned())
    }

    async fn element_by_id(&self, id: &str) -> Result<Option<NodeRef>> {
        let nodes = self.nodes.borrow();
        Ok((0..nodes.len())
            .find(|&i| !nodes[i].detached && nodes[i].attributes.get("id").map(String::as_str) == Some(id))
            .map(|i| NodeRef(i as u32)))
    }

    async fn identity(&self, node: NodeRef) -> Result<NodeIdentity> {
        self.live(node)?;
        let nodes = self.nodes.borrow();
        let n = &nodes[node.0 as usize];
        Ok(NodeIdentity {
            tag: if n.roles.contains(&Role::Button) {
                "BUTTON".to_string()
            } else {
                "DIV".to_string()
            },
            top: f64::from(node.0) * 40.0,
            left: 8.0,
            class_name: n.classes.iter().cloned().collect::<Vec<_>>().join(" "),
            stable_id: n.attributes.get("id").cloned(),
        })
    }

    async fn control_kind(&self, node: NodeRef) -> Result<Option<ControlKind>> {
        self.live(node)?;
        Ok(self.nodes.borrow()[node.0 as usize].control)
    }

    async fn click(&self, node: NodeRef) -> Result<()> {
        self.live(node)?;
        self.record(Action::Click(node));
        self.check_input(node);
        self.grade(node);
        self.reveal(node);
        Ok(())
    }

    async fn set_checked(&self, node: NodeRef, checked: bool) -> Result<()> {
        self.live(node)?;
        self.record(Action::Check(node));
        if checked {
            self.check_input(node);
        } else {
            self.nodes.borrow_mut()[node.0 as usize].checked = false;
        }
        Ok(())
    }

    async fn focus(&self, node: NodeRef) -> Result<()> {
        self.live(node)?;
        self.record(Action::Focus(node));
        Ok(())
    }

    async fn write_value(&self, node: NodeRef, value: &str, how: ValueWrite) -> Result<bool> {
        self.live(node)?;
        let kind = self.nodes.borrow()[node.0 as usize].control;
        let supported = matches!(
            (kind, how),
            (
                Some(ControlKind::Input | ControlKind::TextArea),
                ValueWrite::Direct | ValueWrite::NativeSetter
            ) | (Some(ControlKind::ContentEditable), ValueWrite::TextContent)
        ) || (kind == Some(ControlKind::CodeEditor)
            && how == ValueWrite::CodeEditor
            && self.editor_ready.get());
        if !supported {
            return Ok(false);
        }
        self.record(Action::Write(node, value.to_string(), how));
        self.nodes.borrow_mut()[node.0 as usize].value = value.to_string();
        Ok(true)
    }

    async fn dispatch(&self, node: NodeRef, event: DomEvent) -> Result<()> {
        self.live(node)?;
        self.record(Action::Dispatch(node, event));
        Ok(())
    }

    async fn mutation_count(&self) -> Result<u64> {
        Ok(self.mutations.get())
    }
}

pub fn orchestrator(page: FakePage) -> PageOrchestrator<FakePage, VirtualClock> {
    PageOrchestrator::new(page, VirtualClock::new(), &Config::default())
        .expect("default config is valid")
}
