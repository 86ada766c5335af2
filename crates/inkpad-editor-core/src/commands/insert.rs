use super::{caret_marks, parent_of};
use crate::error::{CommandError, Rejection};
use crate::model::{Child, Node, Position, TextRun};
use crate::schema::{Attrs, Category, DEFAULT_TEXTBLOCK, LINE_BREAK, NodeKind};
use crate::transform::{Step, Transaction, conform_inline};

/// Where the caret lands after inserting blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Placement {
    /// Start of the first textblock inside the inserted nodes.
    Start,
    /// End of the last textblock inside the inserted nodes, or after them.
    End,
    /// Start of the first textblock after the inserted nodes.
    After,
}

pub(crate) fn delete_selection(tr: &mut Transaction) -> Result<(), CommandError> {
    if tr.selection().is_collapsed() {
        return Err(Rejection::EmptySelection.into());
    }
    let from = tr.selection().start().clone();
    let to = tr.selection().end().clone();
    tr.step(Step::DeleteRange {
        from: from.clone(),
        to,
    })?;
    tr.set_caret(from);
    Ok(())
}

/// Insert text at the caret, replacing the selection. Typed text carries
/// the caret marks.
pub(crate) fn insert_text(tr: &mut Transaction, text: &str) -> Result<(), CommandError> {
    if text.is_empty() {
        return delete_selection(tr).map_err(|_| Rejection::EmptyInsert.into());
    }
    // Marks are read before deleting, so replacing a bold word keeps bold.
    let marks = caret_marks(tr);
    if !tr.selection().is_collapsed() {
        delete_selection(tr)?;
    }
    let caret = tr.selection().head.clone();
    let schema = tr.schema_arc().clone();
    let block = tr
        .doc()
        .node_at(&caret.path)
        .ok_or_else(|| Rejection::NotFound("textblock".into()))?;
    let kind = schema.node_kind(block.kind())?;
    let marks = if kind.allows_marks() { marks } else { Default::default() };
    let mut content = vec![Child::Text(TextRun::new(text, marks))];
    if kind.allows_marks() && text.contains('\n') {
        // Rich text breaks lines with nodes, one position per newline.
        let breaks = schema
            .node_kind(LINE_BREAK)
            .is_ok_and(|line_break| schema.allows(kind, line_break));
        if !breaks {
            return Err(Rejection::NotAllowedHere(LINE_BREAK.into()).into());
        }
        content = conform_inline(&schema, kind, content).content;
    }

    tr.step(Step::ReplaceInline {
        block: caret.path.clone(),
        from: caret.offset,
        to: caret.offset,
        content,
    })?;
    tr.set_caret(Position::new(caret.path, caret.offset + text.chars().count()));
    Ok(())
}

pub(super) fn execute_insert_node(
    tr: &mut Transaction,
    kind: &str,
    attrs: &Attrs,
    content: &[Child],
) -> Result<(), CommandError> {
    let schema = tr.schema_arc().clone();
    let node_kind = schema.node_kind(kind)?;
    let node = Node::new(node_kind.name.clone(), node_kind.resolve_attrs(attrs)?, fill_content(tr, node_kind, content)?);

    match node_kind.category {
        Category::Inline => {
            if !tr.selection().is_collapsed() {
                delete_selection(tr)?;
            }
            let caret = tr.selection().head.clone();
            let allowed = tr
                .doc()
                .node_at(&caret.path)
                .and_then(|block| schema.node_kind(block.kind()).ok())
                .is_some_and(|block| schema.allows(block, node_kind));
            if !allowed {
                return Err(Rejection::NotAllowedHere(node_kind.name.clone()).into());
            }
            tr.step(Step::ReplaceInline {
                block: caret.path.clone(),
                from: caret.offset,
                to: caret.offset,
                content: vec![Child::Node(node)],
            })?;
            tr.set_caret(Position::new(caret.path, caret.offset + 1));
            Ok(())
        }
        Category::Block => {
            let placement = if node_kind.is_textblock() || !node_kind.is_leaf() {
                Placement::End
            } else {
                Placement::After
            };
            insert_blocks(tr, vec![node], placement)
        }
    }
}

/// Containers inserted without content get one empty paragraph.
fn fill_content(tr: &Transaction, kind: &NodeKind, content: &[Child]) -> Result<Vec<Child>, CommandError> {
    if !content.is_empty() || kind.is_leaf() || kind.is_textblock() {
        return Ok(content.to_vec());
    }
    Ok(vec![Child::Node(tr.schema().empty_textblock()?)])
}

pub(super) fn execute_insert_content(tr: &mut Transaction, nodes: &[Node]) -> Result<(), CommandError> {
    let schema = tr.schema_arc().clone();
    if let [single] = nodes {
        let kind = schema.node_kind(single.kind())?;
        if kind.is_textblock() {
            if single.content().is_empty() {
                return Err(Rejection::EmptyInsert.into());
            }
            if !tr.selection().is_collapsed() {
                delete_selection(tr)?;
            }
            let caret = tr.selection().head.clone();
            tr.step(Step::ReplaceInline {
                block: caret.path.clone(),
                from: caret.offset,
                to: caret.offset,
                content: single.content().to_vec(),
            })?;
            tr.set_caret(Position::new(caret.path, caret.offset + single.inline_len()));
            return Ok(());
        }
    }
    insert_blocks(tr, nodes.to_vec(), Placement::End)
}

/// Insert block nodes at the caret.
///
/// The textblock at the caret is split around the insertion point, or
/// replaced when empty. If its parent cannot hold the nodes, they go after
/// the nearest ancestor whose parent can.
pub(super) fn insert_blocks(tr: &mut Transaction, nodes: Vec<Node>, placement: Placement) -> Result<(), CommandError> {
    let Some(first) = nodes.first() else {
        return Err(Rejection::EmptyInsert.into());
    };
    let first_kind = first.kind_name().clone();
    if !tr.selection().is_collapsed() {
        delete_selection(tr)?;
    }
    let schema = tr.schema_arc().clone();
    let kinds = nodes
        .iter()
        .map(|node| schema.node_kind(node.kind()))
        .collect::<Result<Vec<_>, _>>()?;
    let fits = |parent: &Node| {
        schema
            .node_kind(parent.kind())
            .is_ok_and(|parent_kind| kinds.iter().all(|kind| schema.allows(parent_kind, kind)))
    };

    let caret = tr.selection().head.clone();
    let block_len = tr.doc().node_at(&caret.path).map_or(0, Node::inline_len);
    let mut parent = parent_of(&caret.path);
    let index = caret.path.last().copied().unwrap_or(0);

    let (index, replace) = if tr.doc().node_at(&parent).is_some_and(|p| fits(p)) {
        if block_len == 0 {
            (index, true)
        } else if caret.offset == 0 {
            (index, false)
        } else if caret.offset >= block_len {
            (index + 1, false)
        } else {
            tr.step(Step::Split {
                at: caret.clone(),
                depth: 1,
                tail: None,
            })?;
            (index + 1, false)
        }
    } else {
        loop {
            let Some(ancestor) = parent.pop() else {
                return Err(Rejection::NotAllowedHere(first_kind).into());
            };
            if tr.doc().node_at(&parent).is_some_and(|p| fits(p)) {
                break (ancestor + 1, false);
            }
        }
    };

    let count = nodes.len();
    tr.step(Step::ReplaceChildren {
        parent: parent.clone(),
        from: index,
        to: index + usize::from(replace),
        nodes,
    })?;
    place_caret(tr, &parent, index, count, placement)
}

/// Move the caret relative to `count` nodes inserted at `parent[index]`.
pub(super) fn place_caret(
    tr: &mut Transaction,
    parent: &[usize],
    index: usize,
    count: usize,
    placement: Placement,
) -> Result<(), CommandError> {
    let schema = tr.schema_arc().clone();
    let blocks = tr.doc().textblocks(&schema);
    let inserted = |path: &Vec<usize>| {
        path.len() > parent.len()
            && path.starts_with(parent)
            && (index..index + count).contains(&path[parent.len()])
    };
    let inside = match placement {
        Placement::Start => blocks.iter().find(|path| inserted(path)).map(|path| Position::new(path.clone(), 0)),
        Placement::End => blocks.iter().rev().find(|path| inserted(path)).map(|path| {
            let len = tr.doc().node_at(path).map_or(0, Node::inline_len);
            Position::new(path.clone(), len)
        }),
        Placement::After => None,
    };
    let target = match inside {
        Some(position) => position,
        None => {
            let mut next = parent.to_vec();
            next.push(index + count);
            match blocks.iter().find(|path| **path >= next) {
                Some(path) => Position::new(path.clone(), 0),
                None => {
                    // Nothing to type into after the insertion yet.
                    tr.step(Step::ReplaceChildren {
                        parent: parent.to_vec(),
                        from: index + count,
                        to: index + count,
                        nodes: vec![schema.empty_textblock()?],
                    })?;
                    Position::new(next, 0)
                }
            }
        }
    };
    tr.set_caret(target);
    Ok(())
}

/// Split the textblock at the caret. Inside a list item the item is split
/// too; splitting at the end of a heading continues with a paragraph. In a
/// plain-text block (code) a newline is inserted instead.
pub(super) fn execute_split_block(tr: &mut Transaction) -> Result<(), CommandError> {
    if !tr.selection().is_collapsed() {
        delete_selection(tr)?;
    }
    let schema = tr.schema_arc().clone();
    let caret = tr.selection().head.clone();
    let block = tr
        .doc()
        .node_at(&caret.path)
        .ok_or_else(|| Rejection::NotFound("textblock".into()))?;
    let kind = schema.node_kind(block.kind())?;
    if !kind.allows_marks() {
        return insert_text(tr, "\n");
    }
    let len = block.inline_len();
    let at_end = caret.offset >= len;
    let tail = if at_end && kind.name != DEFAULT_TEXTBLOCK {
        let paragraph = schema.node_kind(DEFAULT_TEXTBLOCK)?;
        Some((paragraph.name.clone(), paragraph.resolve_attrs(&Attrs::new())?))
    } else {
        None
    };

    let in_item = caret.path.len() >= 2
        && tr
            .doc()
            .node_at(&parent_of(&caret.path))
            .and_then(|parent| schema.node_kind(parent.kind()).ok())
            .is_some_and(|parent| parent.in_group("list_item"));
    let depth = if in_item { 2 } else { 1 };

    tr.step(Step::Split {
        at: caret.clone(),
        depth,
        tail,
    })?;

    let mut next = caret.path.clone();
    let top = next.len() - depth;
    next[top] += 1;
    for index in next.iter_mut().skip(top + 1) {
        *index = 0;
    }
    tr.set_caret(Position::new(next, 0));
    Ok(())
}
