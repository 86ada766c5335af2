//! Core document structure: paragraphs, headings, quotes, lists, code and
//! the basic marks, with their usual shortcuts.

use crate::commands::Command;
use crate::extension::Extension;
use crate::schema::{
    Allowed, AttrOutput, AttrSource, AttrSpec, AttrTarget, AttrType, Condition, ContentRule, Layout,
    MarkKind, NodeKind, ParseContent, ParseRule, RenderRule, Selector, TagSpec,
};

/// Nullable `text_align` shared by paragraphs and headings.
fn text_align() -> AttrSpec {
    AttrSpec::nullable("text_align", AttrType::Str)
}

fn text_align_output() -> AttrOutput {
    AttrOutput::new("text_align", AttrTarget::Style("text-align".into()))
}

fn doc() -> NodeKind {
    NodeKind::block(crate::schema::ROOT)
        .content(ContentRule::blocks())
        .render(RenderRule::fragment())
}

fn paragraph() -> NodeKind {
    NodeKind::block("paragraph")
        .content(ContentRule::rich_text())
        .attr(text_align())
        .parse(ParseRule::tag("p").attr("text_align", AttrSource::Style("text-align".into())))
        .render(RenderRule::container("p").attr(text_align_output()))
}

fn heading() -> NodeKind {
    let mut kind = NodeKind::block("heading")
        .content(ContentRule::rich_text())
        .attr(AttrSpec::optional("level", AttrType::Int, 1).within(1, 6))
        .attr(text_align())
        .render(
            RenderRule::with_layout(
                TagSpec::Leveled {
                    prefix: "h".into(),
                    attr: "level".into(),
                },
                Layout::Container,
            )
            .attr(text_align_output()),
        );
    for level in 1..=6 {
        kind = kind.parse(
            ParseRule::tag(format!("h{level}"))
                .attr("level", AttrSource::TagLevel)
                .attr("text_align", AttrSource::Style("text-align".into())),
        );
    }
    kind
}

/// Blockquotes double as admonitions when `admonition_type` is set. The
/// `div.admonition` form is only read, never written.
fn blockquote() -> NodeKind {
    NodeKind::block("blockquote")
        .content(ContentRule::blocks())
        .attr(AttrSpec::nullable("admonition_type", AttrType::Str))
        .parse(
            ParseRule::tag("blockquote")
                .attr("admonition_type", AttrSource::Attribute("data-admonition-type".into())),
        )
        .parse(
            ParseRule::new(Selector::tag("div").class("admonition"))
                .attr("admonition_type", AttrSource::ClassPrefix("admonition-".into()))
                .content(ParseContent::Inner {
                    selector: Selector::tag("div").class("admonition-content"),
                    skip: vec![Selector::tag("div").class("admonition-title")],
                }),
        )
        .render(
            RenderRule::container("blockquote")
                .attr(AttrOutput::new(
                    "admonition_type",
                    AttrTarget::Attribute("data-admonition-type".into()),
                ))
                .attr(AttrOutput::new(
                    "admonition_type",
                    AttrTarget::Class("admonition admonition-".into()),
                )),
        )
}

fn list_item() -> NodeKind {
    NodeKind::block("list_item")
        .group("list_item")
        .content(ContentRule::blocks())
        .parse(ParseRule::new(
            Selector::tag("li").with(Condition::LacksAttr("data-type".into())),
        ))
        .render(RenderRule::container("li"))
}

fn bullet_list() -> NodeKind {
    NodeKind::block("bullet_list")
        .group("list")
        .content(ContentRule::Blocks(Allowed::only(["list_item"])))
        .parse(ParseRule::new(
            Selector::tag("ul").with(Condition::LacksAttr("data-type".into())),
        ))
        .render(RenderRule::container("ul"))
}

fn ordered_list() -> NodeKind {
    NodeKind::block("ordered_list")
        .group("list")
        .content(ContentRule::Blocks(Allowed::only(["list_item"])))
        .attr(AttrSpec::optional("start", AttrType::Int, 1))
        .parse(ParseRule::tag("ol").attr("start", AttrSource::Attribute("start".into())))
        .render(
            RenderRule::container("ol")
                .attr(AttrOutput::new("start", AttrTarget::Attribute("start".into())).omit_default()),
        )
}

fn code_block() -> NodeKind {
    NodeKind::block("code_block")
        .content(ContentRule::plain_text())
        .attr(AttrSpec::nullable("language", AttrType::Str))
        .parse(
            ParseRule::tag("pre")
                .attr(
                    "language",
                    AttrSource::ChildClassPrefix {
                        tag: "code".into(),
                        prefix: "language-".into(),
                    },
                )
                .content(ParseContent::Text),
        )
        .render(RenderRule::with_layout(
            TagSpec::Fixed("pre".into()),
            Layout::Nested {
                tag: "code".into(),
                attrs: vec![AttrOutput::new("language", AttrTarget::Class("language-".into()))],
            },
        ))
}

fn horizontal_rule() -> NodeKind {
    NodeKind::block("horizontal_rule")
        .attr(AttrSpec::optional("style", AttrType::Str, "solid"))
        .parse(ParseRule::tag("hr").attr("style", AttrSource::ClassPrefix("hr-".into())))
        .render(RenderRule::void("hr").attr(AttrOutput::new("style", AttrTarget::Class("hr-".into()))))
}

fn hard_break() -> NodeKind {
    NodeKind::inline(crate::schema::LINE_BREAK)
        .parse(ParseRule::tag("br"))
        .render(RenderRule::void("br"))
}

fn mark(name: &str, tags: &[&str]) -> MarkKind {
    let mut kind = MarkKind::new(name).render(RenderRule::container(tags[0]));
    for tag in tags {
        kind = kind.parse(ParseRule::tag(*tag));
    }
    kind
}

pub(super) fn extension() -> Extension {
    let mut extension = Extension::new("starter_kit")
        .node(doc())
        .node(paragraph())
        .node(heading())
        .node(blockquote())
        .node(list_item())
        .node(bullet_list())
        .node(ordered_list())
        .node(code_block())
        .node(horizontal_rule())
        .node(hard_break())
        .mark(mark("bold", &["strong", "b"]))
        .mark(mark("code", &["code"]))
        .mark(mark("italic", &["em", "i"]))
        .mark(mark("strike", &["s", "del", "strike"]))
        .shortcut("Mod-b", || Command::toggle_mark("bold"))
        .shortcut("Mod-i", || Command::toggle_mark("italic"))
        .shortcut("Mod-Shift-s", || Command::toggle_mark("strike"))
        .shortcut("Mod-e", || Command::toggle_mark("code"))
        .shortcut("Mod-Alt-0", Command::set_paragraph)
        .shortcut("Mod-Shift-7", Command::toggle_ordered_list)
        .shortcut("Mod-Shift-8", Command::toggle_bullet_list)
        .shortcut("Mod-Shift-b", Command::toggle_blockquote)
        .shortcut("Mod-Alt-c", || Command::set_code_block(None))
        .shortcut("Mod-Shift--", || Command::set_horizontal_rule("solid"))
        .shortcut("Enter", || Command::SplitBlock)
        .shortcut("Shift-Enter", || Command::insert_node(crate::schema::LINE_BREAK, Default::default()))
        .shortcut("Backspace", || Command::DeleteSelection)
        .shortcut("Delete", || Command::DeleteSelection)
        .shortcut("Mod-z", || Command::Undo)
        .shortcut("Mod-Shift-z", || Command::Redo)
        .shortcut("Mod-y", || Command::Redo);
    for level in 1..=6u8 {
        extension = extension.shortcut(format!("Mod-Alt-{level}"), move || Command::toggle_heading(level));
    }
    extension
}
