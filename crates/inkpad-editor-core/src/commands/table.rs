//! Table commands. Outside a table they reject without touching anything.

use super::insert::{Placement, insert_blocks, place_caret};
use super::{TableParams, parent_of, select_inside};
use crate::error::{CommandError, Rejection};
use crate::model::{Child, Node, Position, query};
use crate::schema::{Attrs, Schema};
use crate::transform::{Step, Transaction};

const TABLE: &str = "table";
const ROW: &str = "table_row";
const CELL: &str = "table_cell";
const HEADER: &str = "table_header";
/// Group shared by data and header cells.
const CELL_GROUP: &str = "cell";

struct CellContext {
    table: Vec<usize>,
    row: usize,
    col: usize,
}

fn cell_context(tr: &Transaction) -> Result<CellContext, CommandError> {
    let schema = tr.schema();
    let head = &tr.selection().head.path;
    let (cell, _) = query::find_ancestor(tr.doc(), head, |node| {
        schema
            .node_kind(node.kind())
            .is_ok_and(|kind| kind.in_group(CELL_GROUP))
    })
    .ok_or(Rejection::NotInTable)?;
    if cell.len() < 3 {
        return Err(Rejection::NotInTable.into());
    }
    let row = parent_of(&cell);
    Ok(CellContext {
        table: parent_of(&row),
        row: row[row.len() - 1],
        col: cell[cell.len() - 1],
    })
}

/// Paths of every cell of the table at `table`, row by row.
fn cells_in_order(table_node: &Node, table: &[usize]) -> Vec<Vec<usize>> {
    let mut cells = Vec::new();
    for (r, row) in table_node.content().iter().enumerate() {
        let Some(row) = row.as_node() else { continue };
        for c in 0..row.child_count() {
            let mut path = table.to_vec();
            path.extend([r, c]);
            cells.push(path);
        }
    }
    cells
}

fn cell(schema: &Schema, kind: &str) -> Result<Node, CommandError> {
    Ok(schema.create_node(kind, &Attrs::new(), vec![Child::Node(schema.empty_textblock()?)])?)
}

fn row(schema: &Schema, kind: &str, cols: usize) -> Result<Node, CommandError> {
    let cells = (0..cols)
        .map(|_| cell(schema, kind).map(Child::Node))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(schema.create_node(ROW, &Attrs::new(), cells)?)
}

pub(super) fn execute_insert_table(tr: &mut Transaction, params: TableParams) -> Result<(), CommandError> {
    if params.rows == 0 || params.cols == 0 {
        return Err(Rejection::EmptyInsert.into());
    }
    let schema = tr.schema_arc().clone();
    let rows = (0..params.rows)
        .map(|r| {
            let kind = if r == 0 && params.with_header_row { HEADER } else { CELL };
            row(&schema, kind, params.cols).map(Child::Node)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let table = schema.create_node(TABLE, &Attrs::new(), rows)?;
    insert_blocks(tr, vec![table], Placement::Start)
}

/// Move to the next (`step > 0`) or previous cell and select its content.
pub(super) fn execute_focus_cell(tr: &mut Transaction, step: isize) -> Result<(), CommandError> {
    let ctx = cell_context(tr)?;
    let table = tr
        .doc()
        .node_at(&ctx.table)
        .ok_or(Rejection::NotInTable)?;
    let cells = cells_in_order(table, &ctx.table);
    let mut current = ctx.table.clone();
    current.extend([ctx.row, ctx.col]);
    let index = cells
        .iter()
        .position(|path| *path == current)
        .ok_or(Rejection::NotInTable)?;
    let target = index
        .checked_add_signed(step)
        .and_then(|i| cells.get(i))
        .cloned()
        .ok_or(Rejection::NoAdjacentCell)?;
    select_inside(tr, &target)
}

pub(super) fn execute_add_row_after(tr: &mut Transaction) -> Result<(), CommandError> {
    let ctx = cell_context(tr)?;
    let schema = tr.schema_arc().clone();
    let mut row_path = ctx.table.clone();
    row_path.push(ctx.row);
    let cols = tr
        .doc()
        .node_at(&row_path)
        .map(Node::child_count)
        .ok_or(Rejection::NotInTable)?;
    // New rows are data rows even below a header row.
    let new_row = row(&schema, CELL, cols)?;
    tr.step(Step::ReplaceChildren {
        parent: ctx.table,
        from: ctx.row + 1,
        to: ctx.row + 1,
        nodes: vec![new_row],
    })?;
    Ok(())
}

/// Delete the row at the caret. Deleting the only row deletes the table.
pub(super) fn execute_delete_row(tr: &mut Transaction) -> Result<(), CommandError> {
    let ctx = cell_context(tr)?;
    let rows = tr
        .doc()
        .node_at(&ctx.table)
        .map(Node::child_count)
        .ok_or(Rejection::NotInTable)?;

    if rows <= 1 {
        let parent = parent_of(&ctx.table);
        let index = ctx.table[ctx.table.len() - 1];
        let siblings = tr.doc().node_at(&parent).map_or(0, Node::child_count);
        let schema = tr.schema_arc().clone();
        // A container must not end up empty.
        let nodes = if siblings == 1 {
            vec![schema.empty_textblock()?]
        } else {
            Vec::new()
        };
        let count = nodes.len();
        tr.step(Step::ReplaceChildren {
            parent: parent.clone(),
            from: index,
            to: index + 1,
            nodes,
        })?;
        return match count {
            0 => place_caret_near(tr, &parent, index),
            _ => place_caret(tr, &parent, index, count, Placement::Start),
        };
    }

    tr.step(Step::ReplaceChildren {
        parent: ctx.table.clone(),
        from: ctx.row,
        to: ctx.row + 1,
        nodes: Vec::new(),
    })?;
    let mut next_row = ctx.table;
    next_row.push(ctx.row.min(rows - 2));
    let col = ctx.col;
    let cols = tr.doc().node_at(&next_row).map_or(0, Node::child_count);
    next_row.push(col.min(cols.saturating_sub(1)));
    let schema = tr.schema_arc().clone();
    let target = tr
        .doc()
        .textblocks(&schema)
        .into_iter()
        .find(|path| path.starts_with(&next_row))
        .ok_or(Rejection::NotInTable)?;
    tr.set_caret(Position::new(target, 0));
    Ok(())
}

/// Caret at the textblock that now occupies `parent[index]`, or the last
/// textblock before it.
fn place_caret_near(tr: &mut Transaction, parent: &[usize], index: usize) -> Result<(), CommandError> {
    let schema = tr.schema_arc().clone();
    let blocks = tr.doc().textblocks(&schema);
    let mut at = parent.to_vec();
    at.push(index);
    if let Some(path) = blocks.iter().find(|path| **path >= at) {
        tr.set_caret(Position::new(path.clone(), 0));
        return Ok(());
    }
    let path = blocks
        .last()
        .cloned()
        .ok_or_else(|| Rejection::NotFound("textblock".into()))?;
    let len = tr.doc().node_at(&path).map_or(0, Node::inline_len);
    tr.set_caret(Position::new(path, len));
    Ok(())
}
