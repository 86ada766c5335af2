use std::sync::Arc;

use super::inline;
use super::node::{Child, Node};
use super::position::{Position, Selection};
use crate::error::{SchemaError, StepError};
use crate::schema::{Attrs, ROOT, Schema};

/// A document: one root node of the reserved root kind.
///
/// The root is shared between snapshots, so history entries and
/// transactions clone cheaply and copy on first write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Arc<Node>,
}

impl Document {
    pub fn new(root: Node) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    /// A document holding one empty paragraph.
    pub fn empty(schema: &Schema) -> Result<Self, SchemaError> {
        Self::from_blocks(schema, Vec::new())
    }

    /// Wrap `blocks` in a root, adding an empty paragraph if there are none.
    pub fn from_blocks(schema: &Schema, blocks: Vec<Node>) -> Result<Self, SchemaError> {
        let mut content: Vec<Child> = blocks.into_iter().map(Child::Node).collect();
        if content.is_empty() {
            content.push(Child::Node(schema.empty_textblock()?));
        }
        Ok(Self::new(schema.create_node(ROOT, &Attrs::new(), content)?))
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub(crate) fn root_mut(&mut self) -> &mut Node {
        Arc::make_mut(&mut self.root)
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        self.root.node_at(path)
    }

    pub fn check(&self, schema: &Schema) -> Result<(), StepError> {
        self.root.check(schema)
    }

    /// Visit every node below the root in document order. Returning `false`
    /// from `f` skips that node's descendants.
    pub fn walk<'a>(&'a self, mut f: impl FnMut(&[usize], &'a Node) -> bool) {
        let mut path = Vec::new();
        walk_node(&self.root, &mut path, &mut f);
    }

    /// Paths of all textblocks in document order.
    pub fn textblocks(&self, schema: &Schema) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        self.walk(|path, node| {
            let textblock = schema
                .node_kind(node.kind())
                .is_ok_and(|kind| kind.is_textblock());
            if textblock {
                out.push(path.to_vec());
            }
            !textblock
        });
        out
    }

    /// Opaque nodes (block and inline) in document order.
    pub fn opaque_nodes(&self, schema: &Schema) -> Vec<(Vec<usize>, &Node)> {
        let mut out = Vec::new();
        self.walk(|path, node| {
            if schema
                .node_kind(node.kind())
                .is_ok_and(|kind| kind.is_opaque())
            {
                out.push((path.to_vec(), node));
            }
            true
        });
        out
    }

    pub fn start(&self, schema: &Schema) -> Option<Position> {
        self.textblocks(schema)
            .into_iter()
            .next()
            .map(|path| Position::new(path, 0))
    }

    pub fn end(&self, schema: &Schema) -> Option<Position> {
        let path = self.textblocks(schema).pop()?;
        let len = self.node_at(&path)?.inline_len();
        Some(Position::new(path, len))
    }

    /// Whether `pos` points into a textblock within its bounds.
    pub fn is_valid_position(&self, schema: &Schema, pos: &Position) -> bool {
        self.node_at(&pos.path).is_some_and(|node| {
            schema
                .node_kind(node.kind())
                .is_ok_and(|kind| kind.is_textblock())
                && pos.offset <= node.inline_len()
        })
    }

    /// Nearest valid position: same textblock clamped, else the first
    /// textblock after it, else the document end.
    pub fn clamp_position(&self, schema: &Schema, pos: &Position) -> Option<Position> {
        if let Some(node) = self.node_at(&pos.path) {
            if schema
                .node_kind(node.kind())
                .is_ok_and(|kind| kind.is_textblock())
            {
                return Some(Position::new(pos.path.clone(), pos.offset.min(node.inline_len())));
            }
        }
        self.textblocks(schema)
            .into_iter()
            .find(|path| *path >= pos.path)
            .map(|path| Position::new(path, 0))
            .or_else(|| self.end(schema))
    }

    pub fn clamp_selection(&self, schema: &Schema, selection: &Selection) -> Option<Selection> {
        Some(Selection::new(
            self.clamp_position(schema, &selection.anchor)?,
            self.clamp_position(schema, &selection.head)?,
        ))
    }

    /// Plain text between two positions, with `block_separator` between
    /// textblocks and `\n` for hard breaks.
    pub fn text_between(
        &self,
        schema: &Schema,
        from: &Position,
        to: &Position,
        block_separator: &str,
    ) -> String {
        let (from, to) = if to < from { (to, from) } else { (from, to) };
        let mut parts = Vec::new();
        for path in self.textblocks(schema) {
            if path < from.path || path > to.path {
                continue;
            }
            let Some(block) = self.node_at(&path) else {
                continue;
            };
            let start = if path == from.path { from.offset } else { 0 };
            let end = if path == to.path {
                to.offset
            } else {
                block.inline_len()
            };
            parts.push(inline::text_between(block.content(), start, end, "\n"));
        }
        parts.join(block_separator)
    }

    /// Full plain text, blocks separated by blank lines.
    pub fn plain_text(&self, schema: &Schema) -> String {
        match (self.start(schema), self.end(schema)) {
            (Some(start), Some(end)) => self.text_between(schema, &start, &end, "\n\n"),
            _ => String::new(),
        }
    }
}

fn walk_node<'a>(
    node: &'a Node,
    path: &mut Vec<usize>,
    f: &mut impl FnMut(&[usize], &'a Node) -> bool,
) {
    for (index, child) in node.content().iter().enumerate() {
        if let Child::Node(child) = child {
            path.push(index);
            if f(path, child) {
                walk_node(child, path, f);
            }
            path.pop();
        }
    }
}
