use super::{marks_before_caret, selected_blocks};
use crate::error::{CommandError, Rejection};
use crate::model::{Mark, MarkSet, inline, query};
use crate::schema::Attrs;
use crate::transform::{Step, Transaction};

/// Marks the next typed text picks up: stored marks if any, otherwise the
/// marks of the text before the caret.
pub(crate) fn caret_marks(tr: &Transaction) -> MarkSet {
    match tr.stored_marks() {
        Some(stored) => stored.clone(),
        None => marks_before_caret(tr),
    }
}

/// Selected ranges that can carry marks and contain at least one char.
fn markable_ranges(tr: &Transaction) -> Vec<query::BlockRange> {
    selected_blocks(tr)
        .into_iter()
        .filter(|range| range.from < range.to)
        .filter(|range| {
            tr.doc()
                .node_at(&range.path)
                .and_then(|block| tr.schema().node_kind(block.kind()).ok())
                .is_some_and(|kind| kind.allows_marks())
        })
        .filter(|range| {
            tr.doc().node_at(&range.path).is_some_and(|block| {
                !inline::marks_in(block.content(), range.from, range.to).is_empty()
            })
        })
        .collect()
}

pub(super) fn execute_toggle_mark(tr: &mut Transaction, kind: &str, attrs: &Attrs) -> Result<(), CommandError> {
    let mark = tr.schema().create_mark(kind, attrs)?;
    if tr.selection().is_collapsed() {
        let current = caret_marks(tr);
        let next = if current.contains(&mark) {
            current.without(kind)
        } else {
            current.with(mark, tr.schema())
        };
        tr.set_stored_marks(Some(next));
        return Ok(());
    }

    let active = query::is_mark_active(tr.doc(), tr.schema(), tr.selection(), None, kind, mark.attrs());
    if active {
        remove_mark(tr, kind)
    } else {
        add_mark(tr, mark)
    }
}

pub(super) fn execute_set_mark(tr: &mut Transaction, kind: &str, attrs: &Attrs) -> Result<(), CommandError> {
    let mark = tr.schema().create_mark(kind, attrs)?;
    if tr.selection().is_collapsed() {
        let next = caret_marks(tr).with(mark, tr.schema());
        tr.set_stored_marks(Some(next));
        return Ok(());
    }
    add_mark(tr, mark)
}

pub(super) fn execute_unset_mark(tr: &mut Transaction, kind: &str) -> Result<(), CommandError> {
    tr.schema().mark_kind(kind)?;
    if tr.selection().is_collapsed() {
        let next = caret_marks(tr).without(kind);
        tr.set_stored_marks(Some(next));
        return Ok(());
    }
    remove_mark(tr, kind)
}

fn add_mark(tr: &mut Transaction, mark: Mark) -> Result<(), CommandError> {
    let ranges = markable_ranges(tr);
    if ranges.is_empty() {
        return Err(Rejection::NothingToMark(mark.kind().into()).into());
    }
    for range in ranges {
        tr.step(Step::AddMark {
            block: range.path,
            from: range.from,
            to: range.to,
            mark: mark.clone(),
        })?;
    }
    Ok(())
}

fn remove_mark(tr: &mut Transaction, kind: &str) -> Result<(), CommandError> {
    let ranges = markable_ranges(tr);
    if ranges.is_empty() {
        return Err(Rejection::NothingToMark(kind.into()).into());
    }
    for range in ranges {
        tr.step(Step::RemoveMark {
            block: range.path,
            from: range.from,
            to: range.to,
            kind: kind.into(),
        })?;
    }
    Ok(())
}
