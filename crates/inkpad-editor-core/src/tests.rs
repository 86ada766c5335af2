//! Behaviour that spans the model, commands, serialization and sessions.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use n0_future::boxed::BoxFuture;

use crate::commands::Command;
use crate::config::EditorConfig;
use crate::error::{PersistError, RenderError};
use crate::extensions::{Persist, SaveStatus, Snapshot};
use crate::html::{from_html, to_html};
use crate::keymap::Platform;
use crate::model::{Document, Position, Selection};
use crate::schema::{AttrValue, Attrs, Schema};
use crate::session::EditorSession;
use crate::test_support::{doc_with, p, schema};

const KITCHEN_SINK: &str = concat!(
    "<h2 style=\"text-align: center\">Centered</h2>",
    "<p>Plain <a href=\"https://example.com\">link</a>, ",
    "<mark data-color=\"green\" class=\"highlight highlight-green\">hi</mark>, ",
    "x<sup>2</sup>, H<sub>2</sub>O, <u>under</u> <s>gone</s> <code>code</code></p>",
    "<blockquote data-admonition-type=\"warning\" class=\"admonition admonition-warning\"><p>Careful</p></blockquote>",
    "<ul><li><p>one</p></li><li><p>two</p></li></ul>",
    "<ol start=\"3\"><li><p>three</p></li></ol>",
    "<ul data-type=\"taskList\"><li data-type=\"taskItem\" data-checked=\"true\"><p>done</p></li></ul>",
    "<pre><code class=\"language-rust\">fn main() {\n    let a = 1 &lt; 2;\n}</code></pre>",
    "<hr class=\"hr-dashed\">",
    "<p><img src=\"a.png\" alt=\"A\"> after<br>break</p>",
    "<table><tbody><tr><th><p>H</p></th></tr><tr><td><p>C</p></td></tr></tbody></table>",
    "<details class=\"collapsible-section\" open><summary class=\"collapsible-title\">More</summary>",
    "<div class=\"collapsible-content\"><p>Hidden</p></div></details>",
    "<div class=\"math-block\" data-latex=\"x^2\"></div>",
    "<p>Inline <span class=\"math-inline\" data-latex=\"y\"></span> math</p>",
    "<div class=\"mermaid-diagram\" data-mermaid=\"graph TD\" data-type=\"flowchart\"></div>",
);

fn config() -> EditorConfig {
    EditorConfig {
        platform: Platform::Other,
        ..EditorConfig::default()
    }
}

fn select(session: &mut EditorSession, path: &[usize], from: usize, to: usize) {
    session.set_selection(Selection::new(Position::new(path, from), Position::new(path, to)));
}

#[test]
fn test_round_trip_law() {
    let schema = schema();
    let first = from_html(&schema, KITCHEN_SINK).unwrap();
    first.doc.check(&schema).unwrap();
    assert!(first.report.is_clean(), "{:?}", first.report);

    let exported = to_html(&schema, &first.doc);
    let second = from_html(&schema, &exported).unwrap();
    assert!(second.report.is_clean(), "{:?}", second.report);
    assert_eq!(second.doc, first.doc);
}

/// Export, re-import, and compare structurally.
fn assert_round_trips(schema: &Schema, doc: &Document) {
    doc.check(schema).unwrap();
    let html = to_html(schema, doc);
    let back = from_html(schema, &html).unwrap();
    assert!(back.report.is_clean(), "{html}: {:?}", back.report);
    assert_eq!(&back.doc, doc, "{html}");
}

#[test]
fn test_round_trip_keeps_string_attributes_verbatim() {
    let schema = schema();
    let diagram = schema
        .create_node(
            "diagram",
            &crate::attrs! { "code" => "graph TD\n  A-->B\n", "diagram_type" => "flowchart" },
            Vec::new(),
        )
        .unwrap();
    let math = schema
        .create_node("math_block", &crate::attrs! { "latex" => " x^2 " }, Vec::new())
        .unwrap();
    let section = schema
        .create_node(
            "collapsible_section",
            &crate::attrs! { "title" => " Spaced ", "open" => true },
            vec![p(&schema, "inside").into()],
        )
        .unwrap();
    let image = schema
        .create_node("image", &crate::attrs! { "src" => "a.png", "alt" => " A ", "title" => "t\n" }, Vec::new())
        .unwrap();
    let link = schema
        .create_mark("link", &crate::attrs! { "href" => " https://example.com " })
        .unwrap();
    let paragraph = schema
        .create_node(
            "paragraph",
            &Attrs::new(),
            vec![schema.text("see ", []), image.into(), schema.text("here", [link])],
        )
        .unwrap();
    let doc = doc_with(&schema, vec![diagram, math, section, paragraph]);
    assert_round_trips(&schema, &doc);
}

#[test]
fn test_round_trip_every_heading_level() {
    let schema = schema();
    let headings = (1..=6)
        .map(|level| {
            schema
                .create_node("heading", &crate::attrs! { "level" => level }, vec![schema.text("T", [])])
                .unwrap()
        })
        .collect();
    assert_round_trips(&schema, &doc_with(&schema, headings));

    let (mut session, _) = EditorSession::from_html(config(), Vec::new(), "<p>T</p>").unwrap();
    for level in 1..=6 {
        session.set_selection(Selection::collapsed(Position::new([0], 1)));
        assert!(session.run(Command::toggle_heading(level)).unwrap());
        assert_eq!(session.to_html(), format!("<h{level}>T</h{level}>"));
        assert_round_trips(session.schema(), session.doc());
    }
}

#[test]
fn test_round_trip_mixed_exclusive_marks() {
    let schema = schema();
    let mark = |kind: &str, attrs: Attrs| schema.create_mark(kind, &attrs).unwrap();
    let paragraph = schema
        .create_node(
            "paragraph",
            &Attrs::new(),
            vec![
                schema.text("a", [mark("bold", Attrs::new())]),
                schema.text("b", [mark("bold", Attrs::new()), mark("superscript", Attrs::new())]),
                // Subscript displaces the superscript it excludes.
                schema.text("c", [mark("superscript", Attrs::new()), mark("subscript", Attrs::new())]),
                schema.text(
                    "d",
                    [mark("italic", Attrs::new()), mark("highlight", crate::attrs! { "color" => "green" })],
                ),
            ],
        )
        .unwrap();
    let doc = doc_with(&schema, vec![paragraph]);
    let c = doc.node_at(&[0]).unwrap().content()[2].as_text().unwrap();
    assert!(c.marks().has("subscript") && !c.marks().has("superscript"));
    assert_round_trips(&schema, &doc);
}

#[test]
fn test_round_trip_of_command_built_text() {
    let mut session = EditorSession::new(config(), Vec::new()).unwrap();
    assert!(session.run(Command::insert_text("one\ntwo")).unwrap());
    assert_eq!(session.to_html(), "<p>one<br>two</p>");
    assert_eq!(session.selection().head, Position::new([0], 7));

    select(&mut session, &[0], 0, 3);
    assert!(session.run(Command::toggle_mark("superscript")).unwrap());
    select(&mut session, &[0], 1, 3);
    assert!(session.run(Command::toggle_mark("subscript")).unwrap());
    assert_eq!(session.to_html(), "<p><sup>o</sup><sub>ne</sub><br>two</p>");
    assert_round_trips(session.schema(), session.doc());
}

#[test]
fn test_definition_list_enabled_from_config() {
    let mut config = EditorConfig::from_toml("platform = \"other\"\n").unwrap();
    config.extensions.push("definition_list".into());
    let mut session = EditorSession::new(config, Vec::new()).unwrap();
    assert!(session.run(Command::custom("insert_definition_list", Attrs::new())).unwrap());
    assert_eq!(session.doc().root().child_node(0).map(|node| node.kind()), Some("definition_list"));
    assert_round_trips(session.schema(), session.doc());

    let plain = EditorSession::new(self::config(), Vec::new()).unwrap();
    assert!(!plain.schema().has_node("definition_list"));
}

#[test]
fn test_export_is_idempotent() {
    let schema = schema();
    let doc = from_html(&schema, KITCHEN_SINK).unwrap().doc;
    let once = to_html(&schema, &doc);
    assert_eq!(to_html(&schema, &doc), once);
    // Exporting the re-imported document is byte-stable too.
    let again = to_html(&schema, &from_html(&schema, &once).unwrap().doc);
    assert_eq!(again, once);
}

#[test]
fn test_scenario_heading_and_bold() {
    let html = "<h1>Title</h1><p>Hello <strong>world</strong></p>";
    let schema = schema();
    let doc = from_html(&schema, html).unwrap().doc;

    let heading = doc.node_at(&[0]).unwrap();
    assert_eq!(heading.kind(), "heading");
    assert_eq!(heading.attr("level"), Some(&AttrValue::Int(1)));
    assert_eq!(heading.text_content(), "Title");

    let paragraph = doc.node_at(&[1]).unwrap();
    let runs: Vec<_> = paragraph
        .content()
        .iter()
        .filter_map(|child| child.as_text())
        .map(|run| (run.text(), run.marks().has("bold")))
        .collect();
    assert_eq!(runs, [("Hello ", false), ("world", true)]);

    assert_eq!(to_html(&schema, &doc), html);
}

#[test]
fn test_chain_atomicity() {
    let (mut session, _) = EditorSession::from_html(config(), Vec::new(), "<p>Hello</p>").unwrap();
    select(&mut session, &[0], 0, 5);
    let before = session.state().clone();

    let applied = session
        .chain()
        .then(Command::toggle_mark("bold"))
        .then(Command::FocusNextCell)
        .run()
        .unwrap();
    assert!(!applied);
    assert_eq!(session.state(), &before);
    assert!(!session.can_undo());
}

#[test]
fn test_toggle_symmetry() {
    let (mut session, _) = EditorSession::from_html(config(), Vec::new(), "<p>Hello <em>big</em> world</p>").unwrap();
    select(&mut session, &[0], 2, 12);
    let before = session.state().clone();

    assert!(session.run(Command::toggle_mark("bold")).unwrap());
    assert!(session.is_mark_active("bold", &Attrs::new()));
    assert!(session.run(Command::toggle_mark("bold")).unwrap());
    assert_eq!(session.doc(), &before.doc);
    assert_eq!(session.selection(), &before.selection);
}

#[test]
fn test_partial_mark_toggle_applies_everywhere() {
    let (mut session, _) =
        EditorSession::from_html(config(), Vec::new(), "<p>ab<strong>cd</strong></p>").unwrap();
    select(&mut session, &[0], 0, 4);
    assert!(!session.is_mark_active("bold", &Attrs::new()));
    assert!(session.run(Command::toggle_mark("bold")).unwrap());
    assert_eq!(session.to_html(), "<p><strong>abcd</strong></p>");
}

#[test]
fn test_table_commands_reject_outside_table() {
    let (mut session, _) = EditorSession::from_html(config(), Vec::new(), "<p>Hello</p>").unwrap();
    session.set_selection(Selection::collapsed(Position::new([0], 2)));
    let before = session.state().clone();
    for command in [
        Command::FocusNextCell,
        Command::FocusPreviousCell,
        Command::AddRowAfter,
        Command::DeleteRow,
    ] {
        assert!(!session.run(command).unwrap());
    }
    assert_eq!(session.state(), &before);
}

#[test]
fn test_markup_in_typed_text_stays_text() {
    let mut session = EditorSession::new(config(), Vec::new()).unwrap();
    assert!(session.handle_text_input("# not a heading").unwrap());
    assert_eq!(session.to_html(), "<p># not a heading</p>");
}

#[tokio::test]
async fn test_opaque_render_failure_is_isolated() {
    let html = concat!(
        "<p>before</p>",
        "<div class=\"mermaid-diagram\" data-mermaid=\"bad\" data-type=\"flowchart\"></div>",
        "<p>after</p>",
    );
    let (mut session, _) = EditorSession::from_html(config(), Vec::new(), html).unwrap();
    session
        .register_renderer("diagram", |_attrs: Attrs| async move {
            Err::<String, _>(RenderError::Failed("parse error".into()))
        })
        .unwrap();
    session.settle_node_views().await;

    let shown = session.export_html();
    assert!(shown.starts_with("<p>before</p><div"), "{shown}");
    assert!(shown.ends_with("</div><p>after</p>"), "{shown}");
    assert!(shown.contains("data-render-state=\"error\""), "{shown}");
    assert!(shown.contains("<span class=\"node-view-error\">parse error</span>"), "{shown}");
    assert_eq!(shown.matches("node-view-error").count(), 1);

    // Editing continues, and stored HTML never carries view state.
    let stored = session.to_html();
    assert!(!stored.contains("data-render-state"), "{stored}");
    assert_eq!(&from_html(session.schema(), &stored).unwrap().doc, session.doc());
    session.set_selection(Selection::collapsed(Position::new([2], 5)));
    assert!(session.handle_text_input("!").unwrap());
    assert!(session.to_html().ends_with("<p>after!</p>"));
}

#[tokio::test]
async fn test_node_view_rerenders_on_content_change() {
    let html = "<div class=\"mermaid-diagram\" data-mermaid=\"one\" data-type=\"flowchart\"></div>";
    let (mut session, _) = EditorSession::from_html(config(), Vec::new(), html).unwrap();
    session
        .register_renderer("diagram", |attrs: Attrs| async move {
            let code = attrs.get("code").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            Ok::<_, RenderError>(format!("<svg>{code}</svg>"))
        })
        .unwrap();
    session.settle_node_views().await;
    assert!(session.export_html().contains("<svg>one</svg>"));

    let update = Command::UpdateNodeAttrs {
        path: vec![0],
        attrs: crate::attrs! { "code" => "two" },
    };
    assert!(session.run(update).unwrap());
    session.settle_node_views().await;
    let shown = session.export_html();
    assert!(shown.contains("<svg>two</svg>"), "{shown}");
    assert!(!shown.contains("<svg>one</svg>"));
}

#[derive(Default)]
struct Recorder {
    saved: Mutex<Vec<Snapshot>>,
}

impl Persist for Recorder {
    fn persist(&self, snapshot: Snapshot) -> BoxFuture<Result<(), PersistError>> {
        if let Ok(mut saved) = self.saved.lock() {
            saved.push(snapshot);
        }
        Box::pin(async { Ok(()) })
    }
}

impl Recorder {
    fn saved(&self) -> Vec<Snapshot> {
        self.saved.lock().unwrap().clone()
    }
}

#[tokio::test(start_paused = true)]
async fn test_autosave_persists_latest_after_idle() {
    let recorder = Arc::new(Recorder::default());
    let mut session = EditorSession::new(config(), Vec::new()).unwrap();
    let mut status = session.enable_autosave(recorder.clone()).unwrap();

    session.handle_text_input("a").unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    session.handle_text_input("b").unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(recorder.saved().is_empty());

    tokio::time::sleep(Duration::from_secs(5)).await;
    let saved = recorder.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].html, "<p>ab</p>");
    assert_eq!(*status.borrow_and_update(), SaveStatus::Saved { revision: 2 });
}

#[tokio::test(start_paused = true)]
async fn test_destroy_drops_pending_save() {
    let recorder = Arc::new(Recorder::default());
    let mut session = EditorSession::new(config(), Vec::new()).unwrap();
    session.enable_autosave(recorder.clone()).unwrap();

    session.handle_text_input("draft").unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    session.destroy();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(recorder.saved().is_empty());
}
