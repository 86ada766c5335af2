use super::*;
use crate::attrs;
use crate::error::StepError;
use crate::extension::ExtensionRegistry;
use crate::html::{from_html, to_html};
use crate::model::Selection;
use crate::test_support::registry;
use crate::transform::{EditorState, Step};

struct Harness {
    registry: ExtensionRegistry,
    state: EditorState,
}

impl Harness {
    fn new(html: &str) -> Self {
        let registry = registry();
        let doc = from_html(registry.schema(), html).unwrap().doc;
        let state = EditorState::new(doc, registry.schema());
        Self { registry, state }
    }

    fn select(&mut self, path: &[usize], from: usize, to: usize) {
        self.state.selection = Selection::new(Position::new(path, from), Position::new(path, to));
        self.state.stored_marks = None;
    }

    fn caret(&mut self, path: &[usize], offset: usize) {
        self.select(path, offset, offset);
    }

    /// Apply `command`, committing only on success.
    fn run(&mut self, command: Command) -> Result<(), CommandError> {
        let mut tr = Transaction::new(&self.state, self.registry.schema().clone());
        command.apply(&mut tr, &CommandEnv::new(self.registry.commands()))?;
        self.state = tr.into_state();
        self.state.doc.check(self.registry.schema()).unwrap();
        Ok(())
    }

    fn rejects(&mut self, command: Command) -> Rejection {
        let before = self.state.clone();
        match self.run(command) {
            Err(CommandError::Rejected(rejection)) => {
                assert_eq!(self.state, before);
                rejection
            }
            other => panic!("expected a rejection, got {other:?}"),
        }
    }

    fn html(&self) -> String {
        to_html(self.registry.schema(), &self.state.doc)
    }

    fn kinds(&self) -> Vec<&str> {
        self.state.doc.root().children().map(Node::kind).collect()
    }

    fn head(&self) -> &Position {
        &self.state.selection.head
    }
}

#[test]
fn test_toggle_heading() {
    let mut h = Harness::new("<p>Hello</p>");
    h.caret(&[0], 2);
    h.run(Command::toggle_heading(2)).unwrap();
    assert_eq!(h.html(), "<h2>Hello</h2>");
    h.run(Command::toggle_heading(2)).unwrap();
    assert_eq!(h.html(), "<p>Hello</p>");
}

#[test]
fn test_heading_level_is_bounded() {
    let mut h = Harness::new("<p>Hello</p>");
    h.caret(&[0], 2);
    assert!(matches!(
        h.run(Command::toggle_heading(7)),
        Err(CommandError::Schema(SchemaError::AttrOutOfRange { min: 1, max: 6, .. }))
    ));
    assert!(matches!(
        h.run(Command::toggle_heading(0)),
        Err(CommandError::Schema(SchemaError::AttrOutOfRange { .. }))
    ));
    assert_eq!(h.html(), "<p>Hello</p>");
    h.run(Command::toggle_heading(6)).unwrap();
    assert_eq!(h.html(), "<h6>Hello</h6>");
}

#[test]
fn test_insert_text_newline_becomes_line_break() {
    let mut h = Harness::new("<p>ab</p>");
    h.caret(&[0], 1);
    h.run(Command::insert_text("x\ny")).unwrap();
    assert_eq!(h.html(), "<p>ax<br>yb</p>");
    assert_eq!(h.head(), &Position::new([0], 4));
}

#[test]
fn test_newlines_survive_code_block_toggle() {
    let mut h = Harness::new("<pre><code>a\nb</code></pre>");
    h.caret(&[0], 0);
    h.run(Command::set_paragraph()).unwrap();
    assert_eq!(h.html(), "<p>a<br>b</p>");
    h.run(Command::set_code_block(None)).unwrap();
    assert_eq!(h.html(), "<pre><code>a\nb</code></pre>");
}

#[test]
fn test_replace_inline_rejects_disallowed_content() {
    let h = Harness::new("<pre><code>ab</code></pre>");
    let schema = h.registry.schema().clone();
    let image = schema
        .create_node("image", &attrs! { "src" => "i.png" }, Vec::new())
        .unwrap();
    let mut tr = Transaction::new(&h.state, schema.clone());
    let result = tr.step(Step::ReplaceInline {
        block: vec![0],
        from: 1,
        to: 1,
        content: vec![image.into()],
    });
    assert!(matches!(
        result,
        Err(StepError::InvalidChild { parent, child }) if parent == "code_block" && child == "image"
    ));

    let bold = schema.create_mark("bold", &Attrs::new()).unwrap();
    let result = tr.step(Step::ReplaceInline {
        block: vec![0],
        from: 1,
        to: 1,
        content: vec![schema.text("x", [bold])],
    });
    assert!(matches!(result, Err(StepError::MarksNotAllowed(kind)) if kind == "code_block"));
    assert_eq!(tr.into_state().doc, h.state.doc);
}

#[test]
fn test_code_block_drops_marks() {
    let mut h = Harness::new("<p>a <strong>b</strong></p>");
    h.caret(&[0], 0);
    h.run(Command::set_code_block(Some("rust"))).unwrap();
    assert_eq!(h.html(), "<pre><code class=\"language-rust\">a b</code></pre>");
}

#[test]
fn test_list_toggling() {
    let mut h = Harness::new("<p>one</p>");
    h.caret(&[0], 0);
    h.run(Command::toggle_bullet_list()).unwrap();
    assert_eq!(h.html(), "<ul><li><p>one</p></li></ul>");

    h.caret(&[0, 0, 0], 0);
    h.run(Command::toggle_ordered_list()).unwrap();
    assert_eq!(h.html(), "<ol><li><p>one</p></li></ol>");

    h.run(Command::toggle_ordered_list()).unwrap();
    assert_eq!(h.html(), "<p>one</p>");
}

#[test]
fn test_lift_middle_item_splits_list() {
    let mut h = Harness::new("<ul><li><p>a</p></li><li><p>b</p></li><li><p>c</p></li></ul>");
    h.caret(&[0, 1, 0], 0);
    h.run(Command::toggle_bullet_list()).unwrap();
    assert_eq!(
        h.html(),
        "<ul><li><p>a</p></li></ul><p>b</p><ul><li><p>c</p></li></ul>"
    );
}

#[test]
fn test_admonition_wraps_and_retargets() {
    let mut h = Harness::new("<p>Careful</p>");
    h.caret(&[0], 0);
    h.run(Command::set_admonition("warning")).unwrap();
    let quote = h.state.doc.node_at(&[0]).unwrap();
    assert_eq!(quote.kind(), "blockquote");
    assert_eq!(quote.attr("admonition_type"), Some(&AttrValue::from("warning")));

    // Toggling a different type retargets the same container.
    h.caret(&[0, 0], 0);
    h.run(Command::toggle_wrap("blockquote", attrs! { "admonition_type" => "tip" }))
        .unwrap();
    assert_eq!(h.kinds(), ["blockquote"]);
    assert_eq!(
        h.state.doc.node_at(&[0]).unwrap().attr("admonition_type"),
        Some(&AttrValue::from("tip"))
    );
}

#[test]
fn test_toggle_blockquote_lifts() {
    let mut h = Harness::new("<blockquote><p>quoted</p></blockquote>");
    h.caret(&[0, 0], 1);
    h.run(Command::toggle_blockquote()).unwrap();
    assert_eq!(h.html(), "<p>quoted</p>");
}

#[test]
fn test_text_align() {
    let mut h = Harness::new("<p>Hi</p>");
    h.caret(&[0], 0);
    h.run(Command::set_text_align(Some("center"))).unwrap();
    assert_eq!(
        h.state.doc.node_at(&[0]).unwrap().attr("text_align"),
        Some(&AttrValue::from("center"))
    );
    assert!(h.html().contains("text-align: center"));
    h.run(Command::set_text_align(None)).unwrap();
    assert_eq!(h.html(), "<p>Hi</p>");
}

#[test]
fn test_update_attributes_on_ancestor() {
    let mut h = Harness::new("<h1>Title</h1>");
    h.caret(&[0], 1);
    h.run(Command::update_attributes("heading", attrs! { "level" => 3 }))
        .unwrap();
    assert_eq!(h.html(), "<h3>Title</h3>");
    assert_eq!(
        h.rejects(Command::update_attributes("table", Attrs::new())),
        Rejection::NotFound("table".into())
    );
}

#[test]
fn test_split_block() {
    let mut h = Harness::new("<p>Hello</p>");
    h.caret(&[0], 2);
    h.run(Command::SplitBlock).unwrap();
    assert_eq!(h.html(), "<p>He</p><p>llo</p>");
    assert_eq!(h.head(), &Position::new([1], 0));
}

#[test]
fn test_split_heading_end_continues_as_paragraph() {
    let mut h = Harness::new("<h1>T</h1>");
    h.caret(&[0], 1);
    h.run(Command::SplitBlock).unwrap();
    assert_eq!(h.html(), "<h1>T</h1><p></p>");
}

#[test]
fn test_split_list_item() {
    let mut h = Harness::new("<ul><li><p>ab</p></li></ul>");
    h.caret(&[0, 0, 0], 1);
    h.run(Command::SplitBlock).unwrap();
    assert_eq!(h.html(), "<ul><li><p>a</p></li><li><p>b</p></li></ul>");
    assert_eq!(h.head(), &Position::new([0, 1, 0], 0));
}

#[test]
fn test_split_in_code_inserts_newline() {
    let mut h = Harness::new("<pre><code>ab</code></pre>");
    h.caret(&[0], 1);
    h.run(Command::SplitBlock).unwrap();
    assert_eq!(h.html(), "<pre><code>a\nb</code></pre>");
}

#[test]
fn test_insert_text_keeps_replaced_marks() {
    let mut h = Harness::new("<p><strong>bold</strong></p>");
    h.select(&[0], 0, 4);
    h.run(Command::insert_text("x")).unwrap();
    assert_eq!(h.html(), "<p><strong>x</strong></p>");
}

#[test]
fn test_insert_text_with_markup_stays_literal() {
    let mut h = Harness::new("<p></p>");
    h.caret(&[0], 0);
    h.run(Command::insert_text("> not a quote")).unwrap();
    assert_eq!(h.kinds(), ["paragraph"]);
    assert_eq!(h.html(), "<p>&gt; not a quote</p>");
}

#[test]
fn test_toggle_mark_in_code_block_rejected() {
    let mut h = Harness::new("<pre><code>let</code></pre>");
    h.select(&[0], 0, 3);
    assert_eq!(
        h.rejects(Command::toggle_mark("bold")),
        Rejection::NothingToMark("bold".into())
    );
}

#[test]
fn test_insert_inline_image() {
    let mut h = Harness::new("<p>ab</p>");
    h.caret(&[0], 1);
    h.run(Command::set_image("a.png", Some("A"))).unwrap();
    let block = h.state.doc.node_at(&[0]).unwrap();
    assert_eq!(block.inline_len(), 3);
    assert_eq!(block.child_node(1).map(Node::kind), Some("image"));
    assert_eq!(h.head(), &Position::new([0], 2));
}

#[test]
fn test_insert_horizontal_rule_adds_paragraph_after() {
    let mut h = Harness::new("<p>ab</p>");
    h.caret(&[0], 2);
    h.run(Command::set_horizontal_rule("dashed")).unwrap();
    assert_eq!(h.kinds(), ["paragraph", "horizontal_rule", "paragraph"]);
    assert_eq!(h.head(), &Position::new([2], 0));
    assert!(h.html().contains("<hr class=\"hr-dashed\">"));
}

#[test]
fn test_insert_collapsible_section() {
    let mut h = Harness::new("<p></p>");
    h.caret(&[0], 0);
    h.run(Command::insert_collapsible_section("More")).unwrap();
    let section = h.state.doc.node_at(&[0]).unwrap();
    assert_eq!(section.kind(), "collapsible_section");
    assert_eq!(section.attr("title"), Some(&AttrValue::from("More")));
    assert_eq!(h.head(), &Position::new([0, 0], 0));
}

#[test]
fn test_insert_table_and_navigate() {
    let mut h = Harness::new("<p></p>");
    h.caret(&[0], 0);
    h.run(Command::insert_table(2, 2, true)).unwrap();
    assert_eq!(h.kinds(), ["table"]);
    let table = h.state.doc.node_at(&[0]).unwrap();
    assert_eq!(table.node_at(&[0, 0]).map(Node::kind), Some("table_header"));
    assert_eq!(table.node_at(&[1, 1]).map(Node::kind), Some("table_cell"));
    assert_eq!(h.head(), &Position::new([0, 0, 0, 0], 0));

    h.run(Command::FocusNextCell).unwrap();
    assert_eq!(h.head(), &Position::new([0, 0, 1, 0], 0));
    h.run(Command::FocusNextCell).unwrap();
    assert_eq!(h.head(), &Position::new([0, 1, 0, 0], 0));
    h.run(Command::FocusPreviousCell).unwrap();
    assert_eq!(h.head(), &Position::new([0, 0, 1, 0], 0));

    h.caret(&[0, 1, 1, 0], 0);
    assert_eq!(h.rejects(Command::FocusNextCell), Rejection::NoAdjacentCell);
}

#[test]
fn test_add_row_after_uses_data_cells() {
    let mut h = Harness::new("<table><tbody><tr><th><p>H</p></th><th><p>I</p></th></tr></tbody></table>");
    h.caret(&[0, 0, 0, 0], 0);
    h.run(Command::AddRowAfter).unwrap();
    let table = h.state.doc.node_at(&[0]).unwrap();
    assert_eq!(table.child_count(), 2);
    assert_eq!(table.node_at(&[1, 1]).map(Node::kind), Some("table_cell"));
}

#[test]
fn test_delete_row() {
    let mut h = Harness::new(
        "<table><tbody><tr><td><p>a</p></td></tr><tr><td><p>b</p></td></tr></tbody></table>",
    );
    h.caret(&[0, 0, 0, 0], 0);
    h.run(Command::DeleteRow).unwrap();
    assert_eq!(h.html(), "<table><tbody><tr><td><p>b</p></td></tr></tbody></table>");
    assert_eq!(h.head(), &Position::new([0, 0, 0, 0], 0));

    // The last row takes the table with it.
    h.run(Command::DeleteRow).unwrap();
    assert_eq!(h.html(), "<p></p>");
}

#[test]
fn test_table_commands_outside_table() {
    let mut h = Harness::new("<p>text</p>");
    h.caret(&[0], 1);
    for command in [
        Command::FocusNextCell,
        Command::FocusPreviousCell,
        Command::AddRowAfter,
        Command::DeleteRow,
    ] {
        assert_eq!(h.rejects(command), Rejection::NotInTable);
    }
}

#[test]
fn test_history_commands_reject_inside_transaction() {
    let mut h = Harness::new("<p>text</p>");
    assert_eq!(h.rejects(Command::Undo), Rejection::HistoryInChain);
    assert_eq!(h.rejects(Command::Redo), Rejection::HistoryInChain);
}

#[test]
fn test_programmer_errors_are_schema_errors() {
    let mut h = Harness::new("<p>text</p>");
    h.caret(&[0], 1);
    assert!(matches!(
        h.run(Command::toggle_block("sparkle", Attrs::new())),
        Err(CommandError::Schema(SchemaError::UnknownKind(kind))) if kind == "sparkle"
    ));
    assert!(matches!(
        h.run(Command::set_block_type("heading", attrs! { "level" => "big" })),
        Err(CommandError::Schema(SchemaError::AttrType { .. }))
    ));
    assert!(matches!(
        h.run(Command::custom("no_such_command", Attrs::new())),
        Err(CommandError::Schema(SchemaError::UnknownCommand(name))) if name == "no_such_command"
    ));
}

#[test]
fn test_footnotes_number_deterministically() {
    let mut h = Harness::new("<p>See</p>");
    h.caret(&[0], 3);
    h.run(Command::custom("insert_footnote", Attrs::new())).unwrap();
    h.run(Command::custom("insert_footnote", Attrs::new())).unwrap();
    let html = h.html();
    assert!(html.contains("href=\"#fn-1\""), "{html}");
    assert!(html.contains("href=\"#fn-2\""), "{html}");
    assert_eq!(html.matches("<sup>").count(), 2, "{html}");
}

#[test]
fn test_insert_emoji() {
    let mut h = Harness::new("<p>hi</p>");
    h.caret(&[0], 2);
    h.run(Command::custom("insert_emoji", attrs! { "emoji" => "🎉" })).unwrap();
    assert_eq!(h.html(), "<p>hi🎉</p>");
    assert_eq!(
        h.rejects(Command::custom("insert_emoji", Attrs::new())),
        Rejection::EmptyInsert
    );
}
