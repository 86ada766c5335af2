//! Text-level helpers: alignment shortcuts, footnotes, emoji and
//! typography input rules.

use std::collections::BTreeSet;

use smol_str::{SmolStr, format_smolstr};

use crate::commands::{Command, CommandEnv, caret_marks, insert_text};
use crate::error::{CommandError, Rejection};
use crate::extension::Extension;
use crate::input_rules::{emoji_rules, typography_rules};
use crate::model::{Child, Document};
use crate::schema::Attrs;
use crate::transform::Transaction;

pub(super) fn text_align() -> Extension {
    let mut extension = Extension::new("text_align");
    for (key, align) in [("l", "left"), ("e", "center"), ("r", "right"), ("j", "justify")] {
        extension = extension.shortcut(format!("Mod-Shift-{key}"), move || Command::set_text_align(Some(align)));
    }
    extension
}

/// Footnote targets already referenced from the document.
fn footnote_ids(doc: &Document) -> BTreeSet<SmolStr> {
    let mut ids = BTreeSet::new();
    doc.walk(|_, node| {
        for child in node.content() {
            let Child::Text(run) = child else { continue };
            let href = run.marks().get("link").and_then(|link| link.attr("href")).and_then(|v| v.as_str());
            if let Some(id) = href.and_then(|href| href.strip_prefix('#')) {
                if id.starts_with("fn-") {
                    ids.insert(SmolStr::new(id));
                }
            }
        }
        true
    });
    ids
}

/// Insert a footnote reference: superscript text linking to `#{id}`.
///
/// Without an `id` the next free `fn-{n}` is used, and the text defaults
/// to `n`.
fn insert_footnote(tr: &mut Transaction, _env: &CommandEnv<'_>, params: &Attrs) -> Result<(), CommandError> {
    let schema = tr.schema_arc().clone();
    let head = &tr.selection().head;
    let allows_marks = tr
        .doc()
        .node_at(&head.path)
        .and_then(|block| schema.node_kind(block.kind()).ok())
        .is_some_and(|kind| kind.allows_marks());
    if !allows_marks {
        return Err(Rejection::NotAllowedHere("footnote".into()).into());
    }

    let existing = footnote_ids(tr.doc());
    let mut number = existing.len() + 1;
    while existing.contains(&format_smolstr!("fn-{number}")) {
        number += 1;
    }
    let id = match params.get("id").and_then(|v| v.as_str()) {
        Some(id) => SmolStr::new(id),
        None => format_smolstr!("fn-{number}"),
    };
    let content = match params.get("content").and_then(|v| v.as_str()) {
        Some(content) if !content.is_empty() => content.to_string(),
        _ => number.to_string(),
    };

    let base = caret_marks(tr);
    let marks = base
        .clone()
        .with(schema.create_mark("superscript", &Attrs::new())?, &schema)
        .with(
            schema.create_mark("link", &crate::attrs! { "href" => format!("#{id}") })?,
            &schema,
        );
    tr.set_stored_marks(Some(marks));
    insert_text(tr, &content)?;
    // Typing after the reference continues outside it.
    tr.set_stored_marks(Some(base));
    tracing::debug!(target: "inkpad::command", %id, "inserted footnote");
    Ok(())
}

pub(super) fn footnote() -> Extension {
    Extension::new("footnote")
        .command("insert_footnote", insert_footnote)
        .shortcut("Mod-Shift-f", || Command::custom("insert_footnote", Attrs::new()))
}

fn insert_emoji(tr: &mut Transaction, _env: &CommandEnv<'_>, params: &Attrs) -> Result<(), CommandError> {
    let emoji = params
        .get("emoji")
        .and_then(|v| v.as_str())
        .filter(|emoji| !emoji.is_empty())
        .ok_or(Rejection::EmptyInsert)?;
    insert_text(tr, emoji)
}

pub(super) fn emoji() -> Extension {
    Extension::new("emoji")
        .command("insert_emoji", insert_emoji)
        .input_rules(emoji_rules())
}

pub(super) fn typography() -> Extension {
    Extension::new("typography").input_rules(typography_rules())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{Position, Selection};
    use crate::test_support::{doc_with, p, schema};
    use crate::transform::EditorState;

    fn transaction(text: &str, offset: usize) -> Transaction {
        let schema = Arc::new(schema());
        let mut state = EditorState::new(doc_with(&schema, vec![p(&schema, text)]), &schema);
        state.selection = Selection::collapsed(Position::new(vec![0], offset));
        Transaction::new(&state, schema)
    }

    #[test]
    fn test_footnotes_are_numbered() {
        let mut tr = transaction("See here", 8);
        let env = CommandEnv::default();
        insert_footnote(&mut tr, &env, &Attrs::new()).unwrap();
        insert_footnote(&mut tr, &env, &Attrs::new()).unwrap();

        let ids = footnote_ids(tr.doc());
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), ["fn-1", "fn-2"]);
        assert_eq!(tr.doc().root().text_content(), "See here12");
        // The next typed text is not part of the reference.
        assert_eq!(tr.stored_marks(), Some(&Default::default()));
    }

    #[test]
    fn test_footnote_rejected_in_code_block() {
        let schema = Arc::new(schema());
        let code = schema
            .create_node("code_block", &Attrs::new(), vec![schema.text("x", [])])
            .unwrap();
        let state = EditorState::new(doc_with(&schema, vec![code]), &schema);
        let mut tr = Transaction::new(&state, schema);
        assert!(matches!(
            insert_footnote(&mut tr, &CommandEnv::default(), &Attrs::new()),
            Err(CommandError::Rejected(Rejection::NotAllowedHere(_)))
        ));
    }

    #[test]
    fn test_insert_emoji_requires_emoji() {
        let mut tr = transaction("", 0);
        let env = CommandEnv::default();
        assert!(insert_emoji(&mut tr, &env, &Attrs::new()).is_err());
        insert_emoji(&mut tr, &env, &crate::attrs! { "emoji" => "🎉" }).unwrap();
        assert_eq!(tr.doc().root().text_content(), "🎉");
    }
}
