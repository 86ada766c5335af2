//! inkpad-editor-core: a schema-driven rich-text engine without UI
//! dependencies.
//!
//! This crate provides:
//! - `Schema` - named node and mark kinds with attributes, content rules,
//!   and HTML parse/render rules
//! - `Document` - an immutable-by-convention tree, changed only through
//!   committed `Transaction`s
//! - `Command` - semantic edits, chained into single undo steps
//! - `ExtensionRegistry` - bundles of kinds, commands, shortcuts, input
//!   rules and change hooks
//! - HTML export/import with a round-trip guarantee, and Markdown paste
//! - `NodeViews` - asynchronous, failure-isolated rendering of opaque nodes
//! - `EditorSession` - the facade a host drives

pub mod commands;
pub mod config;
pub mod error;
pub mod extension;
pub mod extensions;
pub mod history;
pub mod html;
pub mod input_rules;
pub mod keymap;
pub mod markdown;
pub mod model;
pub mod node_view;
pub mod schema;
pub mod session;
pub mod transform;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;

pub use commands::{Command, CommandEnv, CustomCommand};
pub use config::{ConfigError, EditorConfig};
pub use error::{CommandError, ImportDegraded, PersistError, Rejection, RenderError, SchemaError, StepError};
pub use extension::{DocumentChange, Extension, ExtensionRegistry, ShortcutBinding};
pub use html::{ImportReport, ParsedHtml, from_html, to_html};
pub use keymap::{Key, KeyCombo, KeydownResult, Modifiers, Platform};
pub use model::{Child, Document, Mark, MarkSet, Node, Position, Selection, TextRun};
pub use node_view::{NodeViews, Renderer, ViewState};
pub use schema::{AttrValue, Attrs, MarkKind, NodeKind, Schema};
pub use session::{ClipboardData, EditorSession, Pasted};
pub use smol_str::SmolStr;
pub use transform::{ChangeOrigin, EditorState, Transaction};
