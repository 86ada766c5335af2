use smol_str::SmolStr;

use super::{block_range, parent_of, selected_blocks};
use crate::error::{CommandError, Rejection};
use crate::model::{Child, Node, query};
use crate::schema::{AttrValue, Attrs, ContentRule, DEFAULT_TEXTBLOCK, NodeKind, Schema};
use crate::transform::{Step, Transaction, conform_inline};

/// Attributes of `node` that `target` also declares, overlaid with `given`.
fn carry_attrs(node: &Node, target: &NodeKind, given: &Attrs) -> Attrs {
    let mut attrs: Attrs = node
        .attrs()
        .iter()
        .filter(|(name, value)| {
            target
                .attr_spec(name)
                .is_some_and(|spec| spec.accepts(value) && spec.in_range(value))
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    attrs.extend(given.iter().map(|(k, v)| (k.clone(), v.clone())));
    attrs
}

pub(super) fn execute_set_block_type(tr: &mut Transaction, kind: &str, attrs: &Attrs) -> Result<(), CommandError> {
    let schema = tr.schema_arc().clone();
    let target = schema.node_kind(kind)?;
    // Validate attributes up front so bad input is a schema error even on
    // an empty selection.
    target.resolve_attrs(attrs)?;
    if !target.is_textblock() {
        return Err(Rejection::NotAllowedHere(target.name.clone()).into());
    }

    let mut plan = Vec::new();
    for range in selected_blocks(tr) {
        let Some(block) = tr.doc().node_at(&range.path) else {
            continue;
        };
        let parent = tr
            .doc()
            .node_at(&parent_of(&range.path))
            .map(|parent| schema.node_kind(parent.kind()))
            .transpose()?;
        if !parent.is_some_and(|parent| schema.allows(parent, target)) {
            return Err(Rejection::NotAllowedHere(target.name.clone()).into());
        }
        let resolved = target.resolve_attrs(&carry_attrs(block, target, attrs))?;
        let conformed = conform_inline(&schema, target, block.content().to_vec()).content;
        let content = (conformed.as_slice() != block.content()).then_some((conformed, block.inline_len()));
        plan.push((range.path, resolved, content));
    }

    for (path, resolved, content) in plan {
        if let Some((content, len)) = content {
            tr.step(Step::ReplaceInline {
                block: path.clone(),
                from: 0,
                to: len,
                content,
            })?;
        }
        tr.step(Step::SetMarkup {
            path,
            kind: target.name.clone(),
            attrs: resolved,
        })?;
    }
    Ok(())
}

pub(super) fn execute_toggle_block(tr: &mut Transaction, kind: &str, attrs: &Attrs) -> Result<(), CommandError> {
    let active = {
        let blocks = selected_blocks(tr);
        !blocks.is_empty()
            && blocks.iter().all(|range| {
                tr.doc()
                    .node_at(&range.path)
                    .is_some_and(|block| block.matches(kind, attrs))
            })
    };
    if active && kind != DEFAULT_TEXTBLOCK {
        execute_set_block_type(tr, DEFAULT_TEXTBLOCK, &Attrs::new())
    } else {
        execute_set_block_type(tr, kind, attrs)
    }
}

pub(super) fn execute_wrap_in(tr: &mut Transaction, kind: &str, attrs: &Attrs) -> Result<(), CommandError> {
    let schema = tr.schema_arc().clone();
    let wrapper = schema.node_kind(kind)?;
    let wrapper_attrs = wrapper.resolve_attrs(attrs)?;
    if !matches!(wrapper.content, ContentRule::Blocks(_)) {
        return Err(Rejection::NotAllowedHere(wrapper.name.clone()).into());
    }

    let (mut parent, mut first, mut last) = block_range(tr);
    // Climb until the wrapper fits its parent and the wrapped blocks fit it.
    let children = loop {
        let parent_node = tr
            .doc()
            .node_at(&parent)
            .ok_or_else(|| Rejection::NotFound("parent".into()))?;
        let parent_kind = schema.node_kind(parent_node.kind())?;
        let children = parent_node.content().get(first..=last).unwrap_or_default();
        let children_fit = !children.is_empty()
            && children.iter().all(|child| {
                child
                    .as_node()
                    .and_then(|node| schema.node_kind(node.kind()).ok())
                    .is_some_and(|child_kind| schema.allows(wrapper, child_kind))
            });
        if children_fit && schema.allows(parent_kind, wrapper) {
            break children.to_vec();
        }
        let Some(index) = parent.pop() else {
            return Err(Rejection::NotAllowedHere(wrapper.name.clone()).into());
        };
        first = index;
        last = index;
    };

    let node = Node::new(wrapper.name.clone(), wrapper_attrs, children);
    tr.step(Step::ReplaceChildren {
        parent,
        from: first,
        to: last + 1,
        nodes: vec![node],
    })?;
    Ok(())
}

/// Replace the node at `path` with its children.
fn lift(tr: &mut Transaction, path: &[usize]) -> Result<(), CommandError> {
    let node = tr
        .doc()
        .node_at(path)
        .cloned()
        .ok_or_else(|| Rejection::NotFound("node".into()))?;
    let index = path.last().copied().ok_or_else(|| Rejection::NotFound("parent".into()))?;
    tr.step(Step::ReplaceChildren {
        parent: parent_of(path),
        from: index,
        to: index + 1,
        nodes: node.children().cloned().collect(),
    })?;
    Ok(())
}

pub(super) fn execute_toggle_wrap(tr: &mut Transaction, kind: &str, attrs: &Attrs) -> Result<(), CommandError> {
    let start = tr.selection().start().path.clone();
    let existing = query::find_ancestor(tr.doc(), &start, |node| node.kind() == kind)
        .map(|(path, node)| (path, node.matches(kind, attrs), node.attrs().clone()));
    match existing {
        Some((path, true, _)) => lift(tr, &path),
        // Same container with different attributes: retarget it in place.
        Some((path, false, current)) => {
            let schema = tr.schema_arc().clone();
            let mut merged = current;
            merged.extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
            let resolved = schema.node_kind(kind)?.resolve_attrs(&merged)?;
            tr.step(Step::SetMarkup {
                path,
                kind: kind.into(),
                attrs: resolved,
            })?;
            Ok(())
        }
        None => execute_wrap_in(tr, kind, attrs),
    }
}

pub(super) fn execute_toggle_list(tr: &mut Transaction, list: &str, item: &str) -> Result<(), CommandError> {
    let schema = tr.schema_arc().clone();
    let list_kind = schema.node_kind(list)?;
    let item_kind = schema.node_kind(item)?;
    let start = tr.selection().start().path.clone();
    let end = tr.selection().end().path.clone();

    let existing = query::find_ancestor(tr.doc(), &start, |node| {
        schema
            .node_kind(node.kind())
            .is_ok_and(|kind| kind.in_group("list"))
    })
    .map(|(path, node)| (path, node.clone()));

    match existing {
        Some((list_path, list_node)) if list_node.kind() == list => {
            lift_items(tr, &list_path, &list_node, &start, &end)
        }
        Some((list_path, list_node)) => {
            let items = list_node
                .children()
                .map(|old| -> Result<Child, CommandError> {
                    let attrs = item_kind.resolve_attrs(&carry_attrs(old, item_kind, &Attrs::new()))?;
                    Ok(Child::Node(Node::new(item_kind.name.clone(), attrs, old.content().to_vec())))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let list_attrs = list_kind.resolve_attrs(&carry_attrs(&list_node, list_kind, &Attrs::new()))?;
            let converted = Node::new(list_kind.name.clone(), list_attrs, items);
            replace_node(tr, &list_path, vec![converted])
        }
        None => wrap_in_list(tr, &schema, list_kind, item_kind),
    }
}

/// Move the items the selection covers out of the list at `list_path`,
/// splitting the list around them.
fn lift_items(
    tr: &mut Transaction,
    list_path: &[usize],
    list_node: &Node,
    start: &[usize],
    end: &[usize],
) -> Result<(), CommandError> {
    let depth = list_path.len();
    let count = list_node.child_count();
    if count == 0 {
        return Err(Rejection::NotFound(list_node.kind_name().clone()).into());
    }
    let first = start.get(depth).copied().unwrap_or(0).min(count - 1);
    let last = if end.starts_with(list_path) {
        end.get(depth).copied().unwrap_or(first)
    } else {
        count - 1
    };
    let last = last.clamp(first, count - 1);

    let content = list_node.content();
    let mut nodes = Vec::new();
    if first > 0 {
        nodes.push(list_node.with_content(content[..first].to_vec()));
    }
    for item in content[first..=last].iter().filter_map(Child::as_node) {
        nodes.extend(item.children().cloned());
    }
    if last + 1 < count {
        nodes.push(list_node.with_content(content[last + 1..].to_vec()));
    }
    replace_node(tr, list_path, nodes)
}

fn wrap_in_list(
    tr: &mut Transaction,
    schema: &Schema,
    list_kind: &NodeKind,
    item_kind: &NodeKind,
) -> Result<(), CommandError> {
    let (parent, first, last) = block_range(tr);
    let parent_node = tr
        .doc()
        .node_at(&parent)
        .ok_or_else(|| Rejection::NotFound("parent".into()))?;
    let parent_kind = schema.node_kind(parent_node.kind())?;
    if !schema.allows(parent_kind, list_kind) {
        return Err(Rejection::NotAllowedHere(list_kind.name.clone()).into());
    }
    let item_attrs = item_kind.resolve_attrs(&Attrs::new())?;
    let items: Vec<Child> = parent_node
        .content()
        .get(first..=last)
        .unwrap_or_default()
        .iter()
        .filter_map(Child::as_node)
        .map(|block| Child::Node(Node::new(item_kind.name.clone(), item_attrs.clone(), vec![Child::Node(block.clone())])))
        .collect();
    let list = Node::new(list_kind.name.clone(), list_kind.resolve_attrs(&Attrs::new())?, items);
    tr.step(Step::ReplaceChildren {
        parent,
        from: first,
        to: last + 1,
        nodes: vec![list],
    })?;
    Ok(())
}

fn replace_node(tr: &mut Transaction, path: &[usize], nodes: Vec<Node>) -> Result<(), CommandError> {
    let index = path.last().copied().ok_or_else(|| Rejection::NotFound("parent".into()))?;
    tr.step(Step::ReplaceChildren {
        parent: parent_of(path),
        from: index,
        to: index + 1,
        nodes,
    })?;
    Ok(())
}

pub(super) fn execute_update_attributes(tr: &mut Transaction, kind: &str, attrs: &Attrs) -> Result<(), CommandError> {
    let schema = tr.schema_arc().clone();
    let node_kind = schema.node_kind(kind)?;
    let mut targets: Vec<(Vec<usize>, Attrs)> = Vec::new();
    for range in selected_blocks(tr) {
        if let Some((path, node)) = query::find_ancestor(tr.doc(), &range.path, |node| node.kind() == kind) {
            if !targets.iter().any(|(seen, _)| *seen == path) {
                targets.push((path, node.attrs().clone()));
            }
        }
    }
    if targets.is_empty() {
        return Err(Rejection::NotFound(node_kind.name.clone()).into());
    }
    for (path, current) in targets {
        let mut merged = current;
        merged.extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
        tr.step(Step::SetMarkup {
            path,
            kind: node_kind.name.clone(),
            attrs: node_kind.resolve_attrs(&merged)?,
        })?;
    }
    Ok(())
}

pub(super) fn execute_set_textblock_attr(
    tr: &mut Transaction,
    name: &SmolStr,
    value: &AttrValue,
) -> Result<(), CommandError> {
    let schema = tr.schema_arc().clone();
    let mut plan = Vec::new();
    for range in selected_blocks(tr) {
        let Some(block) = tr.doc().node_at(&range.path) else {
            continue;
        };
        let kind = schema.node_kind(block.kind())?;
        if kind.attr_spec(name).is_none() {
            continue;
        }
        let mut merged = block.attrs().clone();
        merged.insert(name.clone(), value.clone());
        plan.push((range.path, kind.name.clone(), kind.resolve_attrs(&merged)?));
    }
    if plan.is_empty() {
        return Err(Rejection::NotFound(name.clone()).into());
    }
    for (path, kind, attrs) in plan {
        tr.step(Step::SetMarkup { path, kind, attrs })?;
    }
    Ok(())
}

pub(super) fn execute_update_node_attrs(
    tr: &mut Transaction,
    path: &[usize],
    attrs: &Attrs,
) -> Result<(), CommandError> {
    let schema = tr.schema_arc().clone();
    let node = tr
        .doc()
        .node_at(path)
        .filter(|_| !path.is_empty())
        .ok_or_else(|| Rejection::NotFound("node".into()))?;
    let kind = schema.node_kind(node.kind())?;
    let mut merged = node.attrs().clone();
    merged.extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
    let resolved = kind.resolve_attrs(&merged)?;
    tr.step(Step::SetMarkup {
        path: path.to_vec(),
        kind: kind.name.clone(),
        attrs: resolved,
    })?;
    Ok(())
}
