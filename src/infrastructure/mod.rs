pub mod cdp_document;
pub mod document;
pub mod js_executor;

pub use cdp_document::CdpDocument;
pub use document::{ControlKind, Document, DomEvent, NodeIdentity, NodeRef, Role, ValueWrite};
pub use js_executor::JsExecutor;
