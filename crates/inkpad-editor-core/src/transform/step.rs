//! Primitive edits. Every step validates the region it touched, so a
//! document that went through steps always satisfies the schema.

use smol_str::SmolStr;

use crate::error::StepError;
use crate::model::{Child, Mark, MarkSet, Node, Position, TextRun, inline};
use crate::schema::{Attrs, LINE_BREAK, NodeKind, Schema};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Replace `from..to` of a textblock's inline content.
    ReplaceInline {
        block: Vec<usize>,
        from: usize,
        to: usize,
        content: Vec<Child>,
    },
    AddMark {
        block: Vec<usize>,
        from: usize,
        to: usize,
        mark: Mark,
    },
    RemoveMark {
        block: Vec<usize>,
        from: usize,
        to: usize,
        kind: SmolStr,
    },
    /// Change a node's kind and attributes, keeping its content.
    SetMarkup {
        path: Vec<usize>,
        kind: SmolStr,
        attrs: Attrs,
    },
    /// Replace children `from..to` of the node at `parent`.
    ReplaceChildren {
        parent: Vec<usize>,
        from: usize,
        to: usize,
        nodes: Vec<Node>,
    },
    /// Delete everything between two textblock positions, joining the
    /// remainder of the last block onto the first.
    DeleteRange { from: Position, to: Position },
    /// Split the textblock at `at` and `depth - 1` of its ancestors. The new
    /// textblock optionally takes a different kind.
    Split {
        at: Position,
        depth: usize,
        tail: Option<(SmolStr, Attrs)>,
    },
}

impl Step {
    /// Apply to `root` in place and validate the touched subtree.
    pub fn apply(&self, root: &mut Node, schema: &Schema) -> Result<(), StepError> {
        let scope = match self {
            Self::ReplaceInline {
                block,
                from,
                to,
                content,
            } => {
                let node = textblock_mut(root, schema, block, *from, *to)?;
                let replaced = inline::replace(node.content(), *from, *to, content.clone());
                *node.content_mut() = replaced;
                block.clone()
            }
            Self::AddMark {
                block,
                from,
                to,
                mark,
            } => {
                let node = textblock_mut(root, schema, block, *from, *to)?;
                let marked = inline::map_marks(node.content(), *from, *to, |marks| {
                    marks.clone().with(mark.clone(), schema)
                });
                *node.content_mut() = marked;
                block.clone()
            }
            Self::RemoveMark {
                block,
                from,
                to,
                kind,
            } => {
                let node = textblock_mut(root, schema, block, *from, *to)?;
                let unmarked =
                    inline::map_marks(node.content(), *from, *to, |marks| marks.clone().without(kind));
                *node.content_mut() = unmarked;
                block.clone()
            }
            Self::SetMarkup { path, kind, attrs } => {
                let node = root
                    .node_at_mut(path)
                    .ok_or_else(|| StepError::InvalidPath(path.clone()))?;
                node.set_markup(kind.clone(), attrs.clone());
                parent_of(path)
            }
            Self::ReplaceChildren {
                parent,
                from,
                to,
                nodes,
            } => {
                let node = root
                    .node_at_mut(parent)
                    .ok_or_else(|| StepError::InvalidPath(parent.clone()))?;
                if from > to || *to > node.child_count() {
                    return Err(StepError::InvalidOffset {
                        kind: node.kind_name().clone(),
                        offset: *to,
                        len: node.child_count(),
                    });
                }
                node.content_mut()
                    .splice(*from..*to, nodes.iter().cloned().map(Child::Node));
                parent.clone()
            }
            Self::DeleteRange { from, to } => delete_range(root, schema, from, to)?,
            Self::Split { at, depth, tail } => split(root, schema, at, *depth, tail.as_ref())?,
        };

        let scope_node = root
            .node_at(&scope)
            .ok_or_else(|| StepError::InvalidPath(scope.clone()))?;
        scope_node.check(schema)
    }
}

fn parent_of(path: &[usize]) -> Vec<usize> {
    path[..path.len().saturating_sub(1)].to_vec()
}

fn textblock_mut<'a>(
    root: &'a mut Node,
    schema: &Schema,
    path: &[usize],
    from: usize,
    to: usize,
) -> Result<&'a mut Node, StepError> {
    let node = root
        .node_at_mut(path)
        .ok_or_else(|| StepError::InvalidPath(path.to_vec()))?;
    if !schema.node_kind(node.kind())?.is_textblock() {
        return Err(StepError::NotTextblock(node.kind_name().clone()));
    }
    let len = node.inline_len();
    if from > to || to > len {
        return Err(StepError::InvalidOffset {
            kind: node.kind_name().clone(),
            offset: to.max(from),
            len,
        });
    }
    Ok(node)
}

/// Inline content adapted to a textblock kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Conformed {
    pub content: Vec<Child>,
    /// Inline nodes the kind cannot hold, dropped.
    pub dropped: Vec<SmolStr>,
    /// Marks were removed for a plain-text kind.
    pub stripped_marks: bool,
}

/// Adapt inline content to what `kind` accepts, for commands that move
/// content between block kinds. Plain-text kinds lose marks and turn line
/// breaks into newlines; rich kinds turn newlines into line breaks, or
/// spaces when they take no line break. Other disallowed nodes are dropped.
pub(crate) fn conform_inline(schema: &Schema, kind: &NodeKind, content: Vec<Child>) -> Conformed {
    let rich = kind.allows_marks();
    let line_break = schema
        .node_kind(LINE_BREAK)
        .ok()
        .filter(|line_break| schema.allows(kind, line_break));
    let mut out = Conformed::default();
    let mut children = Vec::with_capacity(content.len());
    for child in content {
        match child {
            Child::Text(run) if !rich => {
                out.stripped_marks |= !run.marks().is_empty();
                children.push(Child::Text(TextRun::new(run.text(), MarkSet::new())));
            }
            Child::Text(run) if run.text().contains('\n') => {
                for (index, line) in run.text().split('\n').enumerate() {
                    if index > 0 {
                        children.push(match line_break {
                            Some(line_break) => Child::Node(Node::new(
                                line_break.name.clone(),
                                line_break.resolve_attrs(&Attrs::new()).unwrap_or_default(),
                                Vec::new(),
                            )),
                            None => Child::Text(TextRun::new(" ", run.marks().clone())),
                        });
                    }
                    children.push(Child::Text(TextRun::new(line, run.marks().clone())));
                }
            }
            Child::Text(run) => children.push(Child::Text(run)),
            Child::Node(node) if !rich && node.kind() == LINE_BREAK => {
                children.push(Child::Text(TextRun::new("\n", MarkSet::new())));
            }
            Child::Node(node) => {
                let allowed = schema
                    .node_kind(node.kind())
                    .is_ok_and(|child_kind| schema.allows(kind, child_kind));
                if allowed {
                    children.push(Child::Node(node));
                } else {
                    out.dropped.push(node.kind_name().clone());
                }
            }
        }
    }
    out.content = inline::normalize(children);
    out
}

fn common_prefix(a: &[usize], b: &[usize]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn delete_range(
    root: &mut Node,
    schema: &Schema,
    from: &Position,
    to: &Position,
) -> Result<Vec<usize>, StepError> {
    if from.path == to.path {
        let node = textblock_mut(root, schema, &from.path, from.offset, to.offset)?;
        let remaining = inline::replace(node.content(), from.offset, to.offset, Vec::new());
        *node.content_mut() = remaining;
        return Ok(from.path.clone());
    }

    let depth = common_prefix(&from.path, &to.path);
    if depth >= from.path.len() || depth >= to.path.len() || from.path[depth] >= to.path[depth] {
        return Err(StepError::InvalidPath(to.path.clone()));
    }
    let ancestor_path = from.path[..depth].to_vec();
    let (first, last) = (from.path[depth], to.path[depth]);

    let ancestor = root
        .node_at(&ancestor_path)
        .ok_or_else(|| StepError::InvalidPath(ancestor_path.clone()))?;
    let left = ancestor
        .child_node(first)
        .ok_or_else(|| StepError::InvalidPath(from.path.clone()))?;
    let right = ancestor
        .child_node(last)
        .ok_or_else(|| StepError::InvalidPath(to.path.clone()))?;

    let end_block = right
        .node_at(&to.path[depth + 1..])
        .ok_or_else(|| StepError::InvalidPath(to.path.clone()))?;
    let (_, tail) = inline::split(end_block.content(), to.offset);

    let start_kind = root
        .node_at(&from.path)
        .ok_or_else(|| StepError::InvalidPath(from.path.clone()))
        .and_then(|node| Ok(schema.node_kind(node.kind())?))?;
    // Joining blocks of different kinds keeps what the first one can hold.
    let tail = conform_inline(schema, start_kind, tail).content;

    let joined = keep_before(left, &from.path[depth + 1..], from.offset, tail)?;
    let rest = keep_after(right, &to.path[depth + 1..]);

    let mut replacement = vec![Child::Node(joined)];
    replacement.extend(rest.map(Child::Node));
    let ancestor = root
        .node_at_mut(&ancestor_path)
        .ok_or_else(|| StepError::InvalidPath(ancestor_path.clone()))?;
    ancestor.content_mut().splice(first..=last, replacement);
    Ok(ancestor_path)
}

/// The node with everything after the textblock at `rel` removed, and that
/// textblock truncated at `offset` with `tail` appended.
fn keep_before(node: &Node, rel: &[usize], offset: usize, tail: Vec<Child>) -> Result<Node, StepError> {
    match rel.split_first() {
        None => {
            let (mut head, _) = inline::split(node.content(), offset);
            head.extend(tail);
            Ok(node.with_content(inline::normalize(head)))
        }
        Some((index, rest)) => {
            let child = node
                .child_node(*index)
                .ok_or_else(|| StepError::InvalidPath(rel.to_vec()))?;
            let mut content = node.content()[..*index].to_vec();
            content.push(Child::Node(keep_before(child, rest, offset, tail)?));
            Ok(node.with_content(content))
        }
    }
}

/// The node with everything up to and including the textblock at `rel`
/// removed. `None` when nothing remains.
fn keep_after(node: &Node, rel: &[usize]) -> Option<Node> {
    let (index, rest) = rel.split_first()?;
    let mut content = Vec::new();
    if let Some(kept) = node.child_node(*index).and_then(|child| keep_after(child, rest)) {
        content.push(Child::Node(kept));
    }
    content.extend(node.content().iter().skip(index + 1).cloned());
    (!content.is_empty()).then(|| node.with_content(content))
}

fn split(
    root: &mut Node,
    schema: &Schema,
    at: &Position,
    depth: usize,
    tail: Option<&(SmolStr, Attrs)>,
) -> Result<Vec<usize>, StepError> {
    if depth == 0 || depth > at.path.len() {
        return Err(StepError::InvalidPath(at.path.clone()));
    }
    let block = root
        .node_at(&at.path)
        .ok_or_else(|| StepError::InvalidPath(at.path.clone()))?;
    if !schema.node_kind(block.kind())?.is_textblock() {
        return Err(StepError::NotTextblock(block.kind_name().clone()));
    }
    let top = at.path.len() - depth;
    let parent_path = at.path[..top].to_vec();
    let index = at.path[top];
    let parent = root
        .node_at_mut(&parent_path)
        .ok_or_else(|| StepError::InvalidPath(parent_path.clone()))?;
    let node = parent
        .child_node(index)
        .ok_or_else(|| StepError::InvalidPath(at.path.clone()))?;
    let (left, right) = split_node(node, &at.path[top + 1..], at.offset, tail)?;
    parent
        .content_mut()
        .splice(index..=index, [Child::Node(left), Child::Node(right)]);
    Ok(parent_path)
}

fn split_node(
    node: &Node,
    rel: &[usize],
    offset: usize,
    tail: Option<&(SmolStr, Attrs)>,
) -> Result<(Node, Node), StepError> {
    match rel.split_first() {
        None => {
            let (head, rest) = inline::split(node.content(), offset);
            let left = node.with_content(inline::normalize(head));
            let mut right = node.with_content(inline::normalize(rest));
            if let Some((kind, attrs)) = tail {
                right.set_markup(kind.clone(), attrs.clone());
            }
            Ok((left, right))
        }
        Some((index, rest)) => {
            let child = node
                .child_node(*index)
                .ok_or_else(|| StepError::InvalidPath(rel.to_vec()))?;
            let (l, r) = split_node(child, rest, offset, tail)?;
            let mut left = node.content()[..*index].to_vec();
            left.push(Child::Node(l));
            let mut right = vec![Child::Node(r)];
            right.extend(node.content().iter().skip(index + 1).cloned());
            Ok((node.with_content(left), node.with_content(right)))
        }
    }
}
