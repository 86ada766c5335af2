//! Block-level extensions: images, task lists, tables, admonitions,
//! collapsible sections and definition lists.

use crate::commands::{Command, CommandEnv};
use crate::error::CommandError;
use crate::extension::Extension;
use crate::schema::{
    Allowed, AttrOutput, AttrSource, AttrSpec, AttrTarget, AttrType, Attrs, Condition, ContentRule,
    Layout, NodeKind, ParseContent, ParseRule, RenderRule, Selector, TagSpec,
};
use crate::transform::Transaction;

fn attribute(name: &str) -> AttrSource {
    AttrSource::Attribute(name.into())
}

fn output(attr: &str, html: &str) -> AttrOutput {
    AttrOutput::new(attr, AttrTarget::Attribute(html.into()))
}

/// Images are inline, so they sit inside paragraphs.
pub(super) fn image() -> Extension {
    Extension::new("image").node(
        NodeKind::inline("image")
            .attr(AttrSpec::required("src", AttrType::Str))
            .attr(AttrSpec::nullable("alt", AttrType::Str))
            .attr(AttrSpec::nullable("title", AttrType::Str))
            .parse(
                ParseRule::tag("img")
                    .attr("src", attribute("src"))
                    .attr("alt", attribute("alt"))
                    .attr("title", attribute("title")),
            )
            .render(
                RenderRule::void("img")
                    .attr(output("src", "src"))
                    .attr(output("alt", "alt"))
                    .attr(output("title", "title")),
            ),
    )
}

pub(super) fn task_list() -> Extension {
    let item = NodeKind::block("task_item")
        .group("list_item")
        .content(ContentRule::blocks())
        .attr(AttrSpec::optional("checked", AttrType::Bool, false))
        .parse(
            ParseRule::new(
                Selector::tag("li").with(Condition::AttrEquals("data-type".into(), "taskItem".into())),
            )
            .attr("checked", attribute("data-checked")),
        )
        .render(
            RenderRule::container("li")
                .static_attr("data-type", "taskItem")
                .attr(output("checked", "data-checked")),
        );
    let list = NodeKind::block("task_list")
        .group("list")
        .content(ContentRule::Blocks(Allowed::only(["task_item"])))
        .parse(ParseRule::new(
            Selector::tag("ul").with(Condition::AttrEquals("data-type".into(), "taskList".into())),
        ))
        .render(RenderRule::container("ul").static_attr("data-type", "taskList"));
    Extension::new("task_list")
        .node(item)
        .node(list)
        .shortcut("Mod-Shift-9", Command::toggle_task_list)
}

fn cell(name: &str, tag: &str) -> NodeKind {
    NodeKind::block(name)
        .group("cell")
        .content(ContentRule::blocks())
        .attr(AttrSpec::optional("colspan", AttrType::Int, 1))
        .attr(AttrSpec::optional("rowspan", AttrType::Int, 1))
        .parse(
            ParseRule::tag(tag)
                .attr("colspan", attribute("colspan"))
                .attr("rowspan", attribute("rowspan")),
        )
        .render(
            RenderRule::container(tag)
                .attr(output("colspan", "colspan").omit_default())
                .attr(output("rowspan", "rowspan").omit_default()),
        )
}

/// Tables always export a `<tbody>`; `<thead>` and `<tfoot>` on import are
/// read through as if their rows sat in the body.
pub(super) fn table() -> Extension {
    Extension::new("table")
        .node(cell("table_cell", "td"))
        .node(cell("table_header", "th"))
        .node(
            NodeKind::block("table_row")
                .content(ContentRule::Blocks(Allowed::only(["table_cell", "table_header"])))
                .parse(ParseRule::tag("tr"))
                .render(RenderRule::container("tr")),
        )
        .node(
            NodeKind::block("table")
                .content(ContentRule::Blocks(Allowed::only(["table_row"])))
                .parse(ParseRule::tag("table"))
                .render(RenderRule::with_layout(
                    TagSpec::Fixed("table".into()),
                    Layout::Nested {
                        tag: "tbody".into(),
                        attrs: Vec::new(),
                    },
                )),
        )
}

/// Cell navigation. Outside a table these reject, so the keys fall through
/// to their default behaviour.
pub(super) fn table_navigation() -> Extension {
    Extension::new("table_navigation")
        .shortcut("Tab", || Command::FocusNextCell)
        .shortcut("Shift-Tab", || Command::FocusPreviousCell)
        .shortcut("Mod-Enter", || Command::AddRowAfter)
        .shortcut("Mod-Backspace", || Command::DeleteRow)
}

/// Admonition shortcuts. The `admonition_type` attribute itself lives on
/// the starter kit's blockquote.
pub(super) fn admonition() -> Extension {
    let mut extension = Extension::new("admonition");
    for (key, kind) in [("n", "note"), ("w", "warning"), ("i", "info"), ("t", "tip")] {
        extension = extension.shortcut(format!("Mod-Shift-{key}"), move || Command::set_admonition(kind));
    }
    extension
}

pub(super) fn collapsible() -> Extension {
    Extension::new("collapsible").node(
        NodeKind::block("collapsible_section")
            .content(ContentRule::blocks())
            .attr(AttrSpec::optional("title", AttrType::Str, "Click to expand"))
            .attr(AttrSpec::optional("open", AttrType::Bool, false))
            .parse(
                ParseRule::tag("details")
                    .attr("title", AttrSource::ChildText("summary".into()))
                    .attr("open", AttrSource::Flag("open".into()))
                    .content(ParseContent::Inner {
                        selector: Selector::tag("div").class("collapsible-content"),
                        skip: vec![Selector::tag("summary")],
                    }),
            )
            .render(
                RenderRule::with_layout(
                    TagSpec::Fixed("details".into()),
                    Layout::Titled {
                        summary_tag: "summary".into(),
                        summary_class: Some("collapsible-title".into()),
                        title_attr: "title".into(),
                        body_tag: "div".into(),
                        body_class: Some("collapsible-content".into()),
                    },
                )
                .class("collapsible-section")
                .attr(AttrOutput::new("open", AttrTarget::Flag("open".into()))),
            ),
    )
}

/// Insert a one-entry definition list with placeholder text.
fn insert_definition_list(tr: &mut Transaction, env: &CommandEnv<'_>, _params: &Attrs) -> Result<(), CommandError> {
    let schema = tr.schema_arc().clone();
    let term = schema.create_node("definition_term", &Attrs::new(), vec![schema.text("Term", [])])?;
    let paragraph = schema.create_node("paragraph", &Attrs::new(), vec![schema.text("Definition", [])])?;
    let description = schema.create_node("definition_description", &Attrs::new(), vec![paragraph.into()])?;
    let item = schema.create_node("definition_item", &Attrs::new(), vec![term.into(), description.into()])?;
    let list = schema.create_node("definition_list", &Attrs::new(), vec![item.into()])?;
    Command::InsertContent(vec![list]).apply(tr, env)
}

/// `<dl>` lists of term and description pairs. Each pair sits in its own
/// `div.definition-item`. Off unless named in the config.
pub(super) fn definition_list() -> Extension {
    let term = NodeKind::block("definition_term")
        .content(ContentRule::rich_text())
        .parse(ParseRule::tag("dt"))
        .render(RenderRule::container("dt").class("definition-term"));
    let description = NodeKind::block("definition_description")
        .content(ContentRule::blocks())
        .parse(ParseRule::tag("dd"))
        .render(RenderRule::container("dd").class("definition-description"));
    let item = NodeKind::block("definition_item")
        .content(ContentRule::Blocks(Allowed::only([
            "definition_term",
            "definition_description",
        ])))
        .parse(ParseRule::new(Selector::tag("div").class("definition-item")))
        .render(RenderRule::container("div").class("definition-item"));
    let list = NodeKind::block("definition_list")
        .content(ContentRule::Blocks(Allowed::only(["definition_item"])))
        .parse(ParseRule::tag("dl"))
        .render(RenderRule::container("dl").class("definition-list"));
    Extension::new("definition_list")
        .node(term)
        .node(description)
        .node(item)
        .node(list)
        .command("insert_definition_list", insert_definition_list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::ExtensionRegistry;
    use crate::html::{from_html, to_html};
    use crate::keymap::Platform;
    use crate::model::{Position, Selection};
    use crate::transform::EditorState;

    fn registry() -> ExtensionRegistry {
        let mut registry = ExtensionRegistry::new(Platform::Other);
        for name in ["starter_kit", "definition_list"] {
            registry.register(crate::extensions::builtin(name).unwrap()).unwrap();
        }
        registry
    }

    const LIST: &str = concat!(
        r#"<dl class="definition-list"><div class="definition-item">"#,
        r#"<dt class="definition-term">Rust</dt>"#,
        r#"<dd class="definition-description"><p>A language</p></dd>"#,
        "</div></dl>",
    );

    #[test]
    fn test_definition_list_round_trips() {
        let registry = registry();
        let parsed = from_html(registry.schema(), LIST).unwrap();
        assert!(parsed.report.is_clean(), "{:?}", parsed.report);
        assert_eq!(parsed.doc.node_at(&[0, 0, 0]).map(|n| n.kind()), Some("definition_term"));
        assert_eq!(to_html(registry.schema(), &parsed.doc), LIST);
    }

    #[test]
    fn test_insert_definition_list() {
        let registry = registry();
        let doc = from_html(registry.schema(), "<p></p>").unwrap().doc;
        let mut state = EditorState::new(doc, registry.schema());
        state.selection = Selection::collapsed(Position::new(vec![0], 0));
        let mut tr = Transaction::new(&state, registry.schema().clone());
        Command::custom("insert_definition_list", Attrs::new())
            .apply(&mut tr, &CommandEnv::new(registry.commands()))
            .unwrap();
        insta::assert_snapshot!(
            to_html(registry.schema(), tr.doc()),
            @r#"<dl class="definition-list"><div class="definition-item"><dt class="definition-term">Term</dt><dd class="definition-description"><p>Definition</p></dd></div></dl>"#
        );
    }
}
