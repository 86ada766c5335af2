//! Read-only queries over a document and selection.
//!
//! These back toolbar state, so they never fail: heterogeneous or empty
//! selections simply answer `false`.

use super::document::Document;
use super::inline;
use super::node::{MarkSet, Node};
use super::position::Selection;
use crate::schema::{Attrs, Schema};

/// The covered inline range of one textblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRange {
    pub path: Vec<usize>,
    pub from: usize,
    pub to: usize,
}

/// Textblocks touched by the selection, in document order.
pub fn selected_textblocks(doc: &Document, schema: &Schema, selection: &Selection) -> Vec<BlockRange> {
    let start = selection.start();
    let end = selection.end();
    doc.textblocks(schema)
        .into_iter()
        .filter(|path| *path >= start.path && *path <= end.path)
        .filter_map(|path| {
            let len = doc.node_at(&path)?.inline_len();
            let from = if path == start.path { start.offset.min(len) } else { 0 };
            let to = if path == end.path { end.offset.min(len) } else { len };
            Some(BlockRange { path, from, to })
        })
        .collect()
}

/// Ancestors of `path` from the root's child down to the node itself.
pub fn ancestors<'a>(doc: &'a Document, path: &[usize]) -> Vec<(Vec<usize>, &'a Node)> {
    (1..=path.len())
        .filter_map(|depth| {
            let prefix = &path[..depth];
            doc.node_at(prefix).map(|node| (prefix.to_vec(), node))
        })
        .collect()
}

/// Deepest ancestor-or-self of `path` satisfying `pred`.
pub fn find_ancestor<'a>(
    doc: &'a Document,
    path: &[usize],
    pred: impl Fn(&Node) -> bool,
) -> Option<(Vec<usize>, &'a Node)> {
    ancestors(doc, path)
        .into_iter()
        .rev()
        .find(|(_, node)| pred(node))
}

/// Whether a mark matching `kind` and `filter` covers the selection.
///
/// A caret answers from the stored marks, or the marks it would type
/// with. A range answers true only if every markable text run inside it
/// carries the mark.
pub fn is_mark_active(
    doc: &Document,
    schema: &Schema,
    selection: &Selection,
    stored: Option<&MarkSet>,
    kind: &str,
    filter: &Attrs,
) -> bool {
    if selection.is_collapsed() {
        if let Some(stored) = stored {
            return stored.contains_matching(kind, filter);
        }
        let caret = selection.start();
        return doc
            .node_at(&caret.path)
            .is_some_and(|block| inline::marks_at(block.content(), caret.offset).contains_matching(kind, filter));
    }
    let mut seen = false;
    for range in selected_textblocks(doc, schema, selection) {
        let Some(block) = doc.node_at(&range.path) else {
            continue;
        };
        let markable = schema
            .node_kind(block.kind())
            .is_ok_and(|kind| kind.allows_marks());
        if !markable {
            continue;
        }
        for marks in inline::marks_in(block.content(), range.from, range.to) {
            seen = true;
            if !marks.contains_matching(kind, filter) {
                return false;
            }
        }
    }
    seen
}

/// Whether every selected textblock sits inside (or is) a node matching
/// `kind` and `filter`.
pub fn is_node_active(
    doc: &Document,
    schema: &Schema,
    selection: &Selection,
    kind: &str,
    filter: &Attrs,
) -> bool {
    let blocks = selected_textblocks(doc, schema, selection);
    !blocks.is_empty()
        && blocks
            .iter()
            .all(|range| find_ancestor(doc, &range.path, |node| node.matches(kind, filter)).is_some())
}
