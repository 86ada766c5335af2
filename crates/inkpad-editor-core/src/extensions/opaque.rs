//! Opaque kinds whose body comes from an external renderer: math and
//! diagrams.

use crate::commands::Command;
use crate::extension::Extension;
use crate::schema::{
    AttrOutput, AttrSource, AttrSpec, AttrTarget, AttrType, Condition, Layout, NodeKind, ParseContent,
    ParseRule, RenderRule, Selector, TagSpec,
};

pub const DEFAULT_DIAGRAM_TYPE: &str = "flowchart";

pub const DIAGRAM_TYPES: &[&str] = &["flowchart", "sequence", "gantt", "pie", "mindmap"];

/// Starter source for a new diagram. Unknown types get the flowchart.
pub fn diagram_template(diagram_type: &str) -> &'static str {
    match diagram_type {
        "sequence" => {
            "sequenceDiagram\n    participant A as Alice\n    participant B as Bob\n    A->>B: Hello Bob!\n    B-->>A: Hello Alice!"
        }
        "gantt" => {
            "gantt\n    title Project Timeline\n    dateFormat  YYYY-MM-DD\n    section Planning\n    Research    :a1, 2024-01-01, 30d\n    Design      :after a1, 20d"
        }
        "pie" => "pie title Favorite Colors\n    \"Red\" : 42\n    \"Blue\" : 35\n    \"Green\" : 23",
        "mindmap" => {
            "mindmap\n  root((Project))\n    Planning\n      Research\n      Analysis\n    Development\n      Frontend\n      Backend\n    Testing\n      Unit Tests\n      Integration"
        }
        _ => {
            "flowchart TD\n    A[Start] --> B{Decision}\n    B -->|Yes| C[Process]\n    B -->|No| D[End]\n    C --> D"
        }
    }
}

/// A math kind: `tag.class[data-latex]`, reading the older `data-math`
/// attribute too.
fn math_kind(name: &str, block: bool, tag: &str, class: &str) -> NodeKind {
    let kind = if block {
        NodeKind::block(name)
    } else {
        NodeKind::inline(name)
    };
    kind.attr(AttrSpec::optional("latex", AttrType::Str, ""))
        .opaque("latex")
        .parse(
            ParseRule::new(
                Selector::tag(tag)
                    .class(class)
                    .with(Condition::HasAttr("data-latex".into())),
            )
            .attr("latex", AttrSource::Attribute("data-latex".into()))
            .content(ParseContent::Ignore),
        )
        .parse(
            ParseRule::new(Selector::tag(tag).with(Condition::HasAttr("data-math".into())))
                .attr("latex", AttrSource::Attribute("data-math".into()))
                .content(ParseContent::Ignore),
        )
        .render(
            RenderRule::with_layout(TagSpec::Fixed(tag.into()), Layout::Opaque)
                .class(class)
                .attr(AttrOutput::new("latex", AttrTarget::Attribute("data-latex".into()))),
        )
}

pub(super) fn math() -> Extension {
    Extension::new("math")
        .node(math_kind("math_block", true, "div", "math-block"))
        .node(math_kind("math_inline", false, "span", "math-inline"))
        .shortcut("Mod-Shift-m", || Command::insert_math_inline(""))
        .shortcut("Mod-Shift-M", || Command::insert_math_block(""))
}

pub(super) fn diagram() -> Extension {
    Extension::new("diagram").node(
        NodeKind::block("diagram")
            .attr(AttrSpec::optional("code", AttrType::Str, ""))
            .attr(AttrSpec::optional("diagram_type", AttrType::Str, DEFAULT_DIAGRAM_TYPE))
            .opaque("code")
            .parse(
                ParseRule::new(Selector::tag("div").with(Condition::HasAttr("data-mermaid".into())))
                    .attr("code", AttrSource::Attribute("data-mermaid".into()))
                    .attr("diagram_type", AttrSource::Attribute("data-type".into()))
                    .content(ParseContent::Ignore),
            )
            .render(
                RenderRule::with_layout(TagSpec::Fixed("div".into()), Layout::Opaque)
                    .class("mermaid-diagram")
                    .attr(AttrOutput::new("code", AttrTarget::Attribute("data-mermaid".into())))
                    .attr(AttrOutput::new(
                        "diagram_type",
                        AttrTarget::Attribute("data-type".into()),
                    )),
            ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagram_templates() {
        for diagram_type in DIAGRAM_TYPES {
            assert!(!diagram_template(diagram_type).is_empty());
        }
        assert!(diagram_template("sequence").starts_with("sequenceDiagram"));
        assert_eq!(diagram_template("unknown"), diagram_template(DEFAULT_DIAGRAM_TYPE));
    }

    #[test]
    fn test_math_kinds_are_opaque() {
        let extension = math();
        let mut registry = crate::extension::ExtensionRegistry::new(crate::keymap::Platform::Other);
        registry.register(extension).unwrap();
        let block = registry.schema().node_kind("math_block").unwrap();
        assert_eq!(block.opaque.as_deref(), Some("latex"));
        assert!(block.is_leaf());
    }
}
