//! Editor commands.
//!
//! A [`Command`] is a semantic edit, decoupled from how it was triggered
//! (toolbar, shortcut, input rule, extension). Executing one appends steps
//! to a [`Transaction`]; the session commits or discards the result. A
//! command that does not apply returns a [`Rejection`] and leaves no
//! observable change.

mod blocks;
mod insert;
mod marks;
mod table;

use std::collections::HashMap;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::error::{CommandError, Rejection, SchemaError};
use crate::model::{Child, MarkSet, Node, Position, inline, query};
use crate::schema::{AttrValue, Attrs};
use crate::transform::Transaction;

pub(crate) use insert::{delete_selection, insert_text};
pub(crate) use marks::caret_marks;

/// A command contributed by an extension, invoked by name.
pub trait CustomCommand: Send + Sync {
    fn apply(&self, tr: &mut Transaction, env: &CommandEnv<'_>, params: &Attrs) -> Result<(), CommandError>;
}

impl<F> CustomCommand for F
where
    F: Fn(&mut Transaction, &CommandEnv<'_>, &Attrs) -> Result<(), CommandError> + Send + Sync,
{
    fn apply(&self, tr: &mut Transaction, env: &CommandEnv<'_>, params: &Attrs) -> Result<(), CommandError> {
        self(tr, env, params)
    }
}

pub type CustomCommands = HashMap<SmolStr, Arc<dyn CustomCommand>>;

/// What a command can see besides the transaction.
#[derive(Clone, Copy, Default)]
pub struct CommandEnv<'a> {
    custom: Option<&'a CustomCommands>,
}

impl<'a> CommandEnv<'a> {
    pub fn new(custom: &'a CustomCommands) -> Self {
        Self {
            custom: Some(custom),
        }
    }

    pub fn custom(&self, name: &str) -> Option<&'a Arc<dyn CustomCommand>> {
        self.custom.and_then(|map| map.get(name))
    }
}

impl std::fmt::Debug for CommandEnv<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.custom.map(|m| m.keys().collect()).unwrap_or_default();
        f.debug_struct("CommandEnv").field("custom", &names).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkParams {
    pub kind: SmolStr,
    pub attrs: Attrs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeParams {
    pub kind: SmolStr,
    pub attrs: Attrs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertNodeParams {
    pub kind: SmolStr,
    pub attrs: Attrs,
    pub content: Vec<Child>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableParams {
    pub rows: usize,
    pub cols: usize,
    pub with_header_row: bool,
}

impl Default for TableParams {
    fn default() -> Self {
        Self {
            rows: 3,
            cols: 3,
            with_header_row: true,
        }
    }
}

/// All editor commands.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Command {
    // === Marks ===
    /// Add the mark over the selection, or remove it if the whole
    /// selection already carries it with these attributes. At a caret the
    /// stored marks are toggled instead.
    ToggleMark(MarkParams),

    /// Add the mark, replacing any mark of the same kind.
    SetMark(MarkParams),

    UnsetMark { kind: SmolStr },

    // === Blocks ===
    /// Convert the selected textblocks.
    SetBlockType(NodeParams),

    /// Convert the selected textblocks, or turn them back into paragraphs
    /// when they already match.
    ToggleBlock(NodeParams),

    /// Wrap the selected blocks in a container.
    WrapIn(NodeParams),

    /// Lift out of the nearest matching container, or wrap in one.
    ToggleWrap(NodeParams),

    /// Turn the selection into a list, convert the list kind, or lift the
    /// covered items out of it.
    ToggleList { list: SmolStr, item: SmolStr },

    /// Merge attributes into the nearest ancestor of `kind`.
    UpdateAttributes(NodeParams),

    /// Set one attribute on every selected textblock whose kind declares it.
    SetTextblockAttr { name: SmolStr, value: AttrValue },

    /// Merge attributes into the node at `path`.
    UpdateNodeAttrs { path: Vec<usize>, attrs: Attrs },

    // === Editing ===
    InsertText(String),

    InsertNode(InsertNodeParams),

    /// Insert parsed content (paste). A single textblock is inserted inline.
    InsertContent(Vec<Node>),

    InsertTable(TableParams),

    /// Split the textblock at the caret (Enter).
    SplitBlock,

    DeleteSelection,

    // === Tables ===
    FocusNextCell,
    FocusPreviousCell,
    AddRowAfter,
    DeleteRow,

    // === History ===
    Undo,
    Redo,

    /// A command registered by an extension.
    Custom { name: SmolStr, params: Attrs },
}

impl Command {
    pub fn toggle_mark(kind: impl Into<SmolStr>) -> Self {
        Self::ToggleMark(MarkParams {
            kind: kind.into(),
            attrs: Attrs::new(),
        })
    }

    pub fn toggle_mark_with(kind: impl Into<SmolStr>, attrs: Attrs) -> Self {
        Self::ToggleMark(MarkParams {
            kind: kind.into(),
            attrs,
        })
    }

    pub fn set_mark(kind: impl Into<SmolStr>, attrs: Attrs) -> Self {
        Self::SetMark(MarkParams {
            kind: kind.into(),
            attrs,
        })
    }

    pub fn unset_mark(kind: impl Into<SmolStr>) -> Self {
        Self::UnsetMark { kind: kind.into() }
    }

    pub fn set_block_type(kind: impl Into<SmolStr>, attrs: Attrs) -> Self {
        Self::SetBlockType(NodeParams {
            kind: kind.into(),
            attrs,
        })
    }

    pub fn toggle_block(kind: impl Into<SmolStr>, attrs: Attrs) -> Self {
        Self::ToggleBlock(NodeParams {
            kind: kind.into(),
            attrs,
        })
    }

    pub fn wrap_in(kind: impl Into<SmolStr>, attrs: Attrs) -> Self {
        Self::WrapIn(NodeParams {
            kind: kind.into(),
            attrs,
        })
    }

    pub fn toggle_wrap(kind: impl Into<SmolStr>, attrs: Attrs) -> Self {
        Self::ToggleWrap(NodeParams {
            kind: kind.into(),
            attrs,
        })
    }

    pub fn toggle_list(list: impl Into<SmolStr>, item: impl Into<SmolStr>) -> Self {
        Self::ToggleList {
            list: list.into(),
            item: item.into(),
        }
    }

    pub fn update_attributes(kind: impl Into<SmolStr>, attrs: Attrs) -> Self {
        Self::UpdateAttributes(NodeParams {
            kind: kind.into(),
            attrs,
        })
    }

    pub fn insert_text(text: impl Into<String>) -> Self {
        Self::InsertText(text.into())
    }

    pub fn insert_node(kind: impl Into<SmolStr>, attrs: Attrs) -> Self {
        Self::InsertNode(InsertNodeParams {
            kind: kind.into(),
            attrs,
            content: Vec::new(),
        })
    }

    pub fn custom(name: impl Into<SmolStr>, params: Attrs) -> Self {
        Self::Custom {
            name: name.into(),
            params,
        }
    }

    // === Toolbar vocabulary over the built-in schema ===

    pub fn set_paragraph() -> Self {
        Self::set_block_type("paragraph", Attrs::new())
    }

    pub fn toggle_heading(level: u8) -> Self {
        Self::toggle_block("heading", crate::attrs! { "level" => level })
    }

    /// `None` resets to the default alignment.
    pub fn set_text_align(align: Option<&str>) -> Self {
        Self::SetTextblockAttr {
            name: "text_align".into(),
            value: align.into(),
        }
    }

    pub fn toggle_bullet_list() -> Self {
        Self::toggle_list("bullet_list", "list_item")
    }

    pub fn toggle_ordered_list() -> Self {
        Self::toggle_list("ordered_list", "list_item")
    }

    pub fn toggle_task_list() -> Self {
        Self::toggle_list("task_list", "task_item")
    }

    pub fn toggle_blockquote() -> Self {
        Self::toggle_wrap("blockquote", Attrs::new())
    }

    pub fn set_code_block(language: Option<&str>) -> Self {
        Self::toggle_block("code_block", crate::attrs! { "language" => language })
    }

    pub fn set_link(href: &str) -> Self {
        Self::set_mark("link", crate::attrs! { "href" => href })
    }

    pub fn set_image(src: &str, alt: Option<&str>) -> Self {
        Self::insert_node("image", crate::attrs! { "src" => src, "alt" => alt })
    }

    pub fn insert_table(rows: usize, cols: usize, with_header_row: bool) -> Self {
        Self::InsertTable(TableParams {
            rows,
            cols,
            with_header_row,
        })
    }

    pub fn set_horizontal_rule(style: &str) -> Self {
        Self::insert_node("horizontal_rule", crate::attrs! { "style" => style })
    }

    pub fn set_admonition(admonition_type: &str) -> Self {
        Self::wrap_in("blockquote", crate::attrs! { "admonition_type" => admonition_type })
    }

    pub fn toggle_highlight(color: &str) -> Self {
        Self::toggle_mark_with("highlight", crate::attrs! { "color" => color })
    }

    pub fn insert_math_block(latex: &str) -> Self {
        Self::insert_node("math_block", crate::attrs! { "latex" => latex })
    }

    pub fn insert_math_inline(latex: &str) -> Self {
        Self::insert_node("math_inline", crate::attrs! { "latex" => latex })
    }

    /// Insert a diagram seeded with the template for `diagram_type`.
    pub fn insert_diagram(diagram_type: &str) -> Self {
        let code = crate::extensions::diagram_template(diagram_type);
        Self::insert_node(
            "diagram",
            crate::attrs! { "code" => code, "diagram_type" => diagram_type },
        )
    }

    pub fn insert_collapsible_section(title: &str) -> Self {
        Self::InsertNode(InsertNodeParams {
            kind: "collapsible_section".into(),
            attrs: crate::attrs! { "title" => title, "open" => true },
            content: Vec::new(),
        })
    }

    pub fn is_history(&self) -> bool {
        matches!(self, Self::Undo | Self::Redo)
    }

    /// Execute against a transaction. On error the transaction may hold
    /// partial steps and must be discarded.
    pub fn apply(&self, tr: &mut Transaction, env: &CommandEnv<'_>) -> Result<(), CommandError> {
        execute_command(tr, self, env)
    }
}

/// Central dispatch for all commands.
fn execute_command(tr: &mut Transaction, command: &Command, env: &CommandEnv<'_>) -> Result<(), CommandError> {
    match command {
        Command::ToggleMark(params) => marks::execute_toggle_mark(tr, &params.kind, &params.attrs),
        Command::SetMark(params) => marks::execute_set_mark(tr, &params.kind, &params.attrs),
        Command::UnsetMark { kind } => marks::execute_unset_mark(tr, kind),
        Command::SetBlockType(params) => blocks::execute_set_block_type(tr, &params.kind, &params.attrs),
        Command::ToggleBlock(params) => blocks::execute_toggle_block(tr, &params.kind, &params.attrs),
        Command::WrapIn(params) => blocks::execute_wrap_in(tr, &params.kind, &params.attrs),
        Command::ToggleWrap(params) => blocks::execute_toggle_wrap(tr, &params.kind, &params.attrs),
        Command::ToggleList { list, item } => blocks::execute_toggle_list(tr, list, item),
        Command::UpdateAttributes(params) => {
            blocks::execute_update_attributes(tr, &params.kind, &params.attrs)
        }
        Command::SetTextblockAttr { name, value } => blocks::execute_set_textblock_attr(tr, name, value),
        Command::UpdateNodeAttrs { path, attrs } => blocks::execute_update_node_attrs(tr, path, attrs),
        Command::InsertText(text) => insert::insert_text(tr, text),
        Command::InsertNode(params) => {
            insert::execute_insert_node(tr, &params.kind, &params.attrs, &params.content)
        }
        Command::InsertContent(nodes) => insert::execute_insert_content(tr, nodes),
        Command::InsertTable(params) => table::execute_insert_table(tr, *params),
        Command::SplitBlock => insert::execute_split_block(tr),
        Command::DeleteSelection => insert::delete_selection(tr),
        Command::FocusNextCell => table::execute_focus_cell(tr, 1),
        Command::FocusPreviousCell => table::execute_focus_cell(tr, -1),
        Command::AddRowAfter => table::execute_add_row_after(tr),
        Command::DeleteRow => table::execute_delete_row(tr),
        // The session owns history; inside a transaction it cannot apply.
        Command::Undo | Command::Redo => Err(Rejection::HistoryInChain.into()),
        Command::Custom { name, params } => {
            let command = env
                .custom(name)
                .ok_or_else(|| SchemaError::UnknownCommand(name.clone()))?;
            command.apply(tr, env, params)
        }
    }
}

fn parent_of(path: &[usize]) -> Vec<usize> {
    path[..path.len().saturating_sub(1)].to_vec()
}

/// Common ancestor path and child range covering the selected textblocks.
fn block_range(tr: &Transaction) -> (Vec<usize>, usize, usize) {
    let start = &tr.selection().start().path;
    let end = &tr.selection().end().path;
    if start == end {
        let index = start.last().copied().unwrap_or(0);
        return (parent_of(start), index, index);
    }
    let depth = start.iter().zip(end).take_while(|(a, b)| a == b).count();
    let depth = depth.min(start.len().saturating_sub(1)).min(end.len().saturating_sub(1));
    (start[..depth].to_vec(), start[depth], end[depth])
}

/// Select the whole content of the first textblock inside `path`.
fn select_inside(tr: &mut Transaction, path: &[usize]) -> Result<(), CommandError> {
    let schema = tr.schema_arc().clone();
    let target = tr
        .doc()
        .textblocks(&schema)
        .into_iter()
        .find(|block| block.starts_with(path))
        .ok_or_else(|| Rejection::NotFound("textblock".into()))?;
    let len = tr.doc().node_at(&target).map_or(0, Node::inline_len);
    tr.set_selection(crate::model::Selection::new(
        Position::new(target.clone(), 0),
        Position::new(target, len),
    ));
    Ok(())
}

/// Marks the next typed text would carry, ignoring stored marks.
fn marks_before_caret(tr: &Transaction) -> MarkSet {
    let caret = &tr.selection().head;
    tr.doc()
        .node_at(&caret.path)
        .map(|block| inline::marks_at(block.content(), caret.offset))
        .unwrap_or_default()
}

fn selected_blocks(tr: &Transaction) -> Vec<query::BlockRange> {
    query::selected_textblocks(tr.doc(), tr.schema(), tr.selection())
}

#[cfg(test)]
mod tests;
