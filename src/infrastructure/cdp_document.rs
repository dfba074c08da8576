//! 基于 CDP 的文档实现
//!
//! 通过 `JsExecutor` 在页面内执行脚本。页面里维护一个节点登记表
//! （`window.__qaRegistry`），把元素映射为整数句柄；同时挂一个
//! `MutationObserver` 统计子树变更次数。页面跳转后登记表随之消失，
//! 旧句柄会被报告为失效。

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::config::Selectors;
use crate::error::{AppError, Result};
use crate::infrastructure::document::{
    ControlKind, Document, DomEvent, NodeIdentity, NodeRef, Role, ValueWrite,
};
use crate::infrastructure::JsExecutor;

const PRELUDE: &str = r#"
(() => {
    if (window.__qaRegistry) return;
    // 句柄只弱引用元素，脱离文档的元素可以被回收
    const registry = { nodes: new Map(), ids: new WeakMap(), next: 0, puts: 0, mutations: 0 };
    registry.sweep = () => {
        for (const [id, ref] of registry.nodes) {
            const el = ref.deref();
            if (!el || !el.isConnected) registry.nodes.delete(id);
        }
    };
    registry.put = (el) => {
        let id = registry.ids.get(el);
        if (id === undefined || !registry.nodes.has(id)) {
            id = registry.next++;
            registry.nodes.set(id, new WeakRef(el));
            registry.ids.set(el, id);
            if (++registry.puts % 256 === 0) registry.sweep();
        }
        return id;
    };
    registry.get = (id) => {
        const ref = registry.nodes.get(id);
        const el = ref && ref.deref();
        if (!el || !el.isConnected) {
            registry.nodes.delete(id);
            const err = new Error('stale node ' + id);
            err.qaStale = id;
            throw err;
        }
        return el;
    };
    registry.visible = (el) => !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);
    new MutationObserver((records) => { registry.mutations += records.length; })
        .observe(document.documentElement, { subtree: true, childList: true, attributes: true });
    window.__qaRegistry = registry;
})();
"#;

/// 页面脚本的统一返回结构
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    ok: Option<JsonValue>,
    #[serde(default)]
    stale: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

/// 真实浏览器页面上的 `Document`
pub struct CdpDocument {
    executor: JsExecutor,
    selectors: Selectors,
}

impl CdpDocument {
    pub fn new(executor: JsExecutor, selectors: Selectors) -> Self {
        Self {
            executor,
            selectors,
        }
    }

    /// 执行一段函数体，`R` 为登记表
    async fn run<T: DeserializeOwned>(&self, body: &str) -> Result<T> {
        let script = format!(
            r#"{PRELUDE}
(() => {{
    const R = window.__qaRegistry;
    try {{
        return {{ ok: (() => {{ {body} }})() }};
    }} catch (e) {{
        if (e && e.qaStale !== undefined) return {{ stale: e.qaStale }};
        return {{ error: String(e) }};
    }}
}})()"#
        );

        let envelope: Envelope = self.executor.eval_as(script).await?;
        if let Some(id) = envelope.stale {
            return Err(AppError::StaleNode(NodeRef(id)));
        }
        if let Some(message) = envelope.error {
            return Err(AppError::script(message));
        }
        let value = envelope.ok.unwrap_or(JsonValue::Null);
        Ok(serde_json::from_value(value)?)
    }
}

impl Document for CdpDocument {
    async fn location(&self) -> Result<String> {
        self.run("return location.href;").await
    }

    async fn find_all(&self, scope: Option<NodeRef>, role: Role) -> Result<Vec<NodeRef>> {
        let selectors = json!(self.selectors.for_role(role));
        let scope = json!(scope);
        debug!("查找 {} (scope: {})", role, scope);
        self.run(&format!(
            r#"
            const scope = {scope};
            const root = scope === null ? document : R.get(scope);
            const seen = new Set();
            const out = [];
            for (const sel of {selectors}) {{
                for (const el of root.querySelectorAll(sel)) {{
                    if (!seen.has(el)) {{
                        seen.add(el);
                        out.push(R.put(el));
                    }}
                }}
            }}
            return out;
            "#
        ))
        .await
    }

    async fn is_visible(&self, node: NodeRef) -> Result<bool> {
        self.run(&format!("return R.visible(R.get({}));", node.0)).await
    }

    async fn text(&self, node: NodeRef) -> Result<String> {
        // innerText 保留块级元素之间的换行，未渲染的元素退回 textContent
        self.run(&format!(
            "const el = R.get({}); return el.innerText || el.textContent || '';",
            node.0
        ))
        .await
    }

    async fn has_class(&self, node: NodeRef, class: &str) -> Result<bool> {
        self.run(&format!(
            "return R.get({}).classList.contains({});",
            node.0,
            json!(class)
        ))
        .await
    }

    async fn add_class(&self, node: NodeRef, class: &str) -> Result<()> {
        self.run(&format!(
            "R.get({}).classList.add({}); return null;",
            node.0,
            json!(class)
        ))
        .await
    }

    async fn remove_class(&self, node: NodeRef, class: &str) -> Result<()> {
        self.run(&format!(
            "R.get({}).classList.remove({}); return null;",
            node.0,
            json!(class)
        ))
        .await
    }

    async fn clear_class(&self, class: &str) -> Result<usize> {
        let class = json!(class);
        self.run(&format!(
            r#"
            const els = document.querySelectorAll('.' + CSS.escape({class}));
            els.forEach((el) => el.classList.remove({class}));
            return els.length;
            "#
        ))
        .await
    }

    async fn attribute(&self, node: NodeRef, name: &str) -> Result<Option<String>> {
        self.run(&format!(
            "return R.get({}).getAttribute({});",
            node.0,
            json!(name)
        ))
        .await
    }

    async fn element_by_id(&self, id: &str) -> Result<Option<NodeRef>> {
        self.run(&format!(
            "const el = document.getElementById({}); return el ? R.put(el) : null;",
            json!(id)
        ))
        .await
    }

    async fn identity(&self, node: NodeRef) -> Result<NodeIdentity> {
        self.run(&format!(
            r#"
            const el = R.get({});
            const rect = el.getBoundingClientRect();
            return {{
                tag: el.tagName,
                top: rect.top,
                left: rect.left,
                class_name: typeof el.className === 'string' ? el.className : '',
                stable_id: el.id || (el.dataset && el.dataset.id) || null,
            }};
            "#,
            node.0
        ))
        .await
    }

    async fn control_kind(&self, node: NodeRef) -> Result<Option<ControlKind>> {
        self.run(&format!(
            r#"
            const el = R.get({});
            if (el.classList.contains('CodeMirror')) return 'code-editor';
            if (el.tagName === 'TEXTAREA') return 'text-area';
            if (el.tagName === 'INPUT') return 'input';
            if (el.isContentEditable) return 'content-editable';
            return null;
            "#,
            node.0
        ))
        .await
    }

    async fn click(&self, node: NodeRef) -> Result<()> {
        self.run(&format!("R.get({}).click(); return null;", node.0))
            .await
    }

    async fn set_checked(&self, node: NodeRef, checked: bool) -> Result<()> {
        self.run(&format!(
            "R.get({}).checked = {}; return null;",
            node.0, checked
        ))
        .await
    }

    async fn focus(&self, node: NodeRef) -> Result<()> {
        self.run(&format!("R.get({}).focus(); return null;", node.0))
            .await
    }

    async fn write_value(&self, node: NodeRef, value: &str, how: ValueWrite) -> Result<bool> {
        let value = json!(value);
        let body = match how {
            ValueWrite::Direct => format!(
                "const el = R.get({}); if (!('value' in el)) return false; el.value = {value}; return true;",
                node.0
            ),
            ValueWrite::NativeSetter => format!(
                r#"
                const el = R.get({});
                const proto = el.tagName === 'TEXTAREA'
                    ? HTMLTextAreaElement.prototype
                    : HTMLInputElement.prototype;
                const descriptor = Object.getOwnPropertyDescriptor(proto, 'value');
                if (!descriptor || !descriptor.set || !(el instanceof proto.constructor)) return false;
                descriptor.set.call(el, {value});
                return true;
                "#,
                node.0
            ),
            ValueWrite::TextContent => format!(
                "R.get({}).textContent = {value}; return true;",
                node.0
            ),
            ValueWrite::CodeEditor => format!(
                r#"
                const cm = R.get({}).CodeMirror;
                if (!cm) return false;
                cm.setValue({value});
                cm.refresh();
                return true;
                "#,
                node.0
            ),
        };
        self.run(&body).await
    }

    async fn dispatch(&self, node: NodeRef, event: DomEvent) -> Result<()> {
        let constructor = match event {
            DomEvent::KeyUp => "KeyboardEvent",
            DomEvent::Input | DomEvent::Change | DomEvent::Blur => "Event",
        };
        self.run(&format!(
            "R.get({}).dispatchEvent(new {constructor}({}, {{ bubbles: true }})); return null;",
            node.0,
            json!(event.name())
        ))
        .await
    }

    async fn mutation_count(&self) -> Result<u64> {
        self.run("return R.mutations;").await
    }
}
