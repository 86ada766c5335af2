//! One-way Markdown import for pasted plain text.
//!
//! Markdown is rendered to HTML and then goes through the HTML importer, so
//! everything the importer guarantees holds here too. Task list items are
//! rewritten into the `data-type` markup the schema reads.

use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;

use crate::error::SchemaError;
use crate::html::{ImportReport, ParsedHtml, from_html, parse_fragment};
use crate::model::Node;
use crate::schema::Schema;

/// Some line starts with `#`, `>`, `-`, `*` or a digit.
static MARKDOWN_HINT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[#>\-*\d]").unwrap());

pub fn looks_like_markdown(text: &str) -> bool {
    MARKDOWN_HINT.is_match(text)
}

fn options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

pub fn markdown_to_html(markdown: &str) -> String {
    let events: Vec<Event<'_>> = Parser::new_ext(markdown, options()).collect();
    let events = rewrite(events);
    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, events.into_iter());
    html
}

pub fn from_markdown(schema: &Schema, markdown: &str) -> Result<ParsedHtml, SchemaError> {
    from_html(schema, &markdown_to_html(markdown))
}

pub fn parse_markdown_fragment(schema: &Schema, markdown: &str) -> Result<(Vec<Node>, ImportReport), SchemaError> {
    parse_fragment(schema, &markdown_to_html(markdown))
}

/// Checkbox state of the list item starting at `item`, if it has one.
fn task_marker(events: &[Event<'_>], item: usize) -> Option<bool> {
    events.get(item + 1..)?.iter().take(2).find_map(|event| match event {
        Event::TaskListMarker(checked) => Some(*checked),
        _ => None,
    })
}

fn rewrite(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let markers: Vec<Option<bool>> = (0..events.len()).map(|at| task_marker(&events, at)).collect();
    let mut out = Vec::with_capacity(events.len());
    // Whether each open list / item is a task list / task item.
    let mut lists: Vec<bool> = Vec::new();
    let mut items: Vec<bool> = Vec::new();
    let mut trim_next = false;

    for (at, event) in events.into_iter().enumerate() {
        match event {
            Event::Start(Tag::List(None)) => {
                // Decided by the first item.
                let task = markers.get(at + 1).copied().flatten().is_some();
                lists.push(task);
                if task {
                    out.push(Event::Html(CowStr::Borrowed("<ul data-type=\"taskList\">\n")));
                } else {
                    out.push(Event::Start(Tag::List(None)));
                }
            }
            Event::Start(Tag::List(start)) => {
                lists.push(false);
                out.push(Event::Start(Tag::List(start)));
            }
            Event::End(TagEnd::List(ordered)) => {
                if lists.pop() == Some(true) {
                    out.push(Event::Html(CowStr::Borrowed("</ul>\n")));
                } else {
                    out.push(Event::End(TagEnd::List(ordered)));
                }
            }
            Event::Start(Tag::Item) => {
                let task = lists.last() == Some(&true);
                items.push(task);
                if task {
                    let checked = markers[at].unwrap_or(false);
                    out.push(Event::Html(
                        format!("<li data-type=\"taskItem\" data-checked=\"{checked}\">").into(),
                    ));
                } else {
                    out.push(Event::Start(Tag::Item));
                }
            }
            Event::End(TagEnd::Item) => {
                if items.pop() == Some(true) {
                    out.push(Event::Html(CowStr::Borrowed("</li>\n")));
                } else {
                    out.push(Event::End(TagEnd::Item));
                }
            }
            Event::TaskListMarker(_) => trim_next = true,
            Event::Text(text) if trim_next => {
                trim_next = false;
                out.push(Event::Text(text.trim_start().to_owned().into()));
            }
            Event::End(TagEnd::CodeBlock) => {
                // The renderer terminates code with a newline the block never had.
                if let Some(Event::Text(text)) = out.last_mut() {
                    let stripped = text.strip_suffix('\n').map(str::to_owned);
                    if let Some(stripped) = stripped {
                        *text = stripped.into();
                    }
                }
                out.push(Event::End(TagEnd::CodeBlock));
            }
            other => {
                trim_next = false;
                out.push(other);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::to_html;
    use crate::schema::AttrValue;
    use crate::test_support::schema;

    #[test]
    fn test_markdown_heuristic() {
        assert!(looks_like_markdown("# Title"));
        assert!(looks_like_markdown("intro\n- item"));
        assert!(looks_like_markdown("> quoted"));
        assert!(looks_like_markdown("1. first"));
        assert!(!looks_like_markdown("just some text"));
        assert!(!looks_like_markdown("  # indented"));
    }

    #[test]
    fn test_markdown_import() {
        let schema = schema();
        let markdown = "# Title\n\nSome **bold** and ~~gone~~ text.\n\n- [x] done\n- [ ] todo\n\n1. one\n2. two\n\n```rust\nfn main() {}\n```\n";
        let parsed = from_markdown(&schema, markdown).unwrap();
        assert!(parsed.report.is_clean(), "{:?}", parsed.report);
        parsed.doc.check(&schema).unwrap();

        let kinds: Vec<_> = parsed.doc.root().children().map(Node::kind).collect();
        assert_eq!(
            kinds,
            ["heading", "paragraph", "task_list", "ordered_list", "code_block"]
        );
        let tasks = parsed.doc.node_at(&[2]).unwrap();
        let checked: Vec<_> = tasks.children().map(|item| item.attr("checked").cloned()).collect();
        assert_eq!(
            checked,
            [Some(AttrValue::Bool(true)), Some(AttrValue::Bool(false))]
        );
        assert_eq!(tasks.text_content(), "donetodo");

        let code = parsed.doc.node_at(&[4]).unwrap();
        assert_eq!(code.attr("language"), Some(&AttrValue::from("rust")));
        assert_eq!(code.text_content(), "fn main() {}");

        let html = to_html(&schema, &parsed.doc);
        assert!(html.contains("<p>Some <strong>bold</strong> and <s>gone</s> text.</p>"), "{html}");
    }

    #[test]
    fn test_markdown_table() {
        let schema = schema();
        let (blocks, report) = parse_markdown_fragment(&schema, "| A | B |\n|---|---|\n| 1 | 2 |\n").unwrap();
        assert!(report.is_clean(), "{report:?}");
        let [table] = &blocks[..] else {
            panic!("expected one table, got {blocks:?}");
        };
        assert_eq!(table.kind(), "table");
        assert_eq!(table.child_count(), 2);
        assert_eq!(table.node_at(&[0, 0]).unwrap().kind(), "table_header");
        assert_eq!(table.node_at(&[1, 1]).unwrap().text_content(), "2");
    }
}
