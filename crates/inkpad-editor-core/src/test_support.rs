//! Shared fixtures for unit tests.

use crate::extension::ExtensionRegistry;
use crate::extensions::{BUILTIN_NAMES, resolve};
use crate::keymap::Platform;
use crate::model::{Child, Document, Node};
use crate::schema::{Attrs, Schema};

/// Registry with every built-in extension.
pub fn registry() -> ExtensionRegistry {
    let mut registry = ExtensionRegistry::new(Platform::Other);
    for extension in resolve(BUILTIN_NAMES).unwrap().extensions {
        registry.register(extension).unwrap();
    }
    registry
}

/// The full built-in schema.
pub fn schema() -> Schema {
    (**registry().schema()).clone()
}

pub fn doc_with(schema: &Schema, blocks: Vec<Node>) -> Document {
    Document::from_blocks(schema, blocks).unwrap()
}

/// A paragraph holding unmarked `text`.
pub fn p(schema: &Schema, text: &str) -> Node {
    node(schema, "paragraph", Attrs::new(), text)
}

/// A textblock of `kind` holding unmarked `text`.
pub fn node(schema: &Schema, kind: &str, attrs: Attrs, text: &str) -> Node {
    let content: Vec<Child> = if text.is_empty() {
        Vec::new()
    } else {
        vec![schema.text(text, [])]
    };
    schema.create_node(kind, &attrs, content).unwrap()
}
