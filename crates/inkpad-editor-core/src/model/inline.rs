//! Operations on textblock content (text runs and inline nodes).
//!
//! Offsets are in chars, with each inline node occupying one position.
//! Every function that produces content returns it normalized: no empty
//! runs and no adjacent runs with identical marks.

use super::node::{Child, MarkSet, TextRun};

/// Convert a char offset to a byte offset, clamping to the string end.
pub(crate) fn char_to_byte(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(byte, _)| byte)
}

pub fn inline_len(content: &[Child]) -> usize {
    content.iter().map(Child::inline_len).sum()
}

/// Drop empty runs and merge neighbours that share a mark set.
pub fn normalize(content: Vec<Child>) -> Vec<Child> {
    let mut out: Vec<Child> = Vec::with_capacity(content.len());
    for child in content {
        match child {
            Child::Text(run) if run.text.is_empty() => {}
            Child::Text(run) => {
                if let Some(Child::Text(previous)) = out.last_mut() {
                    if previous.marks == run.marks {
                        previous.text.push_str(&run.text);
                        continue;
                    }
                }
                out.push(Child::Text(run));
            }
            node => out.push(node),
        }
    }
    out
}

/// Split content at `offset`.
pub fn split(content: &[Child], offset: usize) -> (Vec<Child>, Vec<Child>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut pos = 0;
    for child in content {
        let len = child.inline_len();
        if pos + len <= offset {
            left.push(child.clone());
        } else if pos >= offset {
            right.push(child.clone());
        } else if let Child::Text(run) = child {
            let at = char_to_byte(&run.text, offset - pos);
            left.push(Child::Text(TextRun::new(&run.text[..at], run.marks.clone())));
            right.push(Child::Text(TextRun::new(&run.text[at..], run.marks.clone())));
        } else {
            right.push(child.clone());
        }
        pos += len;
    }
    (left, right)
}

pub fn slice(content: &[Child], from: usize, to: usize) -> Vec<Child> {
    let (_, rest) = split(content, from);
    let (middle, _) = split(&rest, to.saturating_sub(from));
    normalize(middle)
}

/// Replace `from..to` with `insert`.
pub fn replace(content: &[Child], from: usize, to: usize, insert: Vec<Child>) -> Vec<Child> {
    let (mut out, rest) = split(content, from);
    let (_, right) = split(&rest, to.saturating_sub(from));
    out.extend(insert);
    out.extend(right);
    normalize(out)
}

/// Rewrite the marks of every text run inside `from..to`.
pub fn map_marks(
    content: &[Child],
    from: usize,
    to: usize,
    f: impl Fn(&MarkSet) -> MarkSet,
) -> Vec<Child> {
    let (mut out, rest) = split(content, from);
    let (middle, right) = split(&rest, to.saturating_sub(from));
    out.extend(middle.into_iter().map(|child| match child {
        Child::Text(run) => Child::Text(TextRun::new(run.text.clone(), f(&run.marks))),
        node => node,
    }));
    out.extend(right);
    normalize(out)
}

/// Mark sets of every text run overlapping `from..to`.
pub fn marks_in(content: &[Child], from: usize, to: usize) -> Vec<&MarkSet> {
    let mut out = Vec::new();
    let mut pos = 0;
    for child in content {
        let len = child.inline_len();
        if pos < to && pos + len > from {
            if let Child::Text(run) = child {
                out.push(&run.marks);
            }
        }
        pos += len;
    }
    out
}

/// Marks a caret at `offset` would type with: those of the run before it,
/// or of the first run when at the start.
pub fn marks_at(content: &[Child], offset: usize) -> MarkSet {
    if offset == 0 {
        return content
            .first()
            .and_then(Child::as_text)
            .map(|run| run.marks.clone())
            .unwrap_or_default();
    }
    let mut pos = 0;
    for child in content {
        let len = child.inline_len();
        if offset > pos && offset <= pos + len {
            return child
                .as_text()
                .map(|run| run.marks.clone())
                .unwrap_or_default();
        }
        pos += len;
    }
    MarkSet::new()
}

/// Plain text of `from..to`. Inline nodes contribute `leaf`.
pub fn text_between(content: &[Child], from: usize, to: usize, leaf: &str) -> String {
    let mut out = String::new();
    for child in slice(content, from, to) {
        match child {
            Child::Text(run) => out.push_str(&run.text),
            Child::Node(_) => out.push_str(leaf),
        }
    }
    out
}

/// Text immediately before `offset`, back to the nearest inline node.
pub fn text_before(content: &[Child], offset: usize) -> (String, MarkSet) {
    let (left, _) = split(content, offset);
    let mut text = String::new();
    let mut marks = MarkSet::new();
    for child in left.iter().rev() {
        match child {
            Child::Text(run) => {
                if text.is_empty() {
                    marks = run.marks.clone();
                }
                text.insert_str(0, &run.text);
            }
            Child::Node(_) => break,
        }
    }
    (text, marks)
}
