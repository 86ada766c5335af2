//! Extra marks.

use crate::commands::Command;
use crate::extension::Extension;
use crate::schema::{
    AttrOutput, AttrSource, AttrSpec, AttrTarget, AttrType, Condition, MarkKind, ParseRule, RenderRule,
    Selector,
};

pub(super) fn underline() -> Extension {
    Extension::new("underline")
        .mark(
            MarkKind::new("underline")
                .parse(ParseRule::tag("u"))
                .render(RenderRule::container("u")),
        )
        .shortcut("Mod-u", || Command::toggle_mark("underline"))
}

pub(super) fn link() -> Extension {
    Extension::new("link").mark(
        MarkKind::new("link")
            .attr(AttrSpec::required("href", AttrType::Str))
            .attr(AttrSpec::nullable("target", AttrType::Str))
            .parse(
                ParseRule::new(Selector::tag("a").with(Condition::HasAttr("href".into())))
                    .attr("href", AttrSource::Attribute("href".into()))
                    .attr("target", AttrSource::Attribute("target".into())),
            )
            .render(
                RenderRule::container("a")
                    .attr(AttrOutput::new("href", AttrTarget::Attribute("href".into())))
                    .attr(AttrOutput::new("target", AttrTarget::Attribute("target".into()))),
            ),
    )
}

/// Superscript and subscript, which never share a run.
pub(super) fn script() -> Extension {
    Extension::new("script")
        .mark(
            MarkKind::new("superscript")
                .excludes("subscript")
                .parse(ParseRule::tag("sup"))
                .render(RenderRule::container("sup")),
        )
        .mark(
            MarkKind::new("subscript")
                .parse(ParseRule::tag("sub"))
                .render(RenderRule::container("sub")),
        )
        .shortcut("Mod-.", || Command::toggle_mark("superscript"))
        .shortcut("Mod-,", || Command::toggle_mark("subscript"))
}

pub(super) fn text_style() -> Extension {
    Extension::new("text_style").mark(
        MarkKind::new("text_color")
            .attr(AttrSpec::required("color", AttrType::Str))
            .parse(
                ParseRule::new(Selector::tag("span").with(Condition::HasStyle("color".into())))
                    .attr("color", AttrSource::Style("color".into())),
            )
            .render(
                RenderRule::container("span")
                    .attr(AttrOutput::new("color", AttrTarget::Style("color".into()))),
            ),
    )
}

/// Coloured highlight. `span.highlight` is the legacy form and is read only.
pub(super) fn highlight() -> Extension {
    let kind = MarkKind::new("highlight")
        .attr(AttrSpec::optional("color", AttrType::Str, "yellow"))
        .parse(ParseRule::tag("mark").attr("color", AttrSource::Attribute("data-color".into())))
        .parse(
            ParseRule::new(Selector::tag("span").class("highlight"))
                .attr("color", AttrSource::ClassPrefix("highlight-".into())),
        )
        .render(
            RenderRule::container("mark")
                .class("highlight")
                .attr(AttrOutput::new("color", AttrTarget::Attribute("data-color".into())))
                .attr(AttrOutput::new("color", AttrTarget::Class("highlight-".into()))),
        );
    let mut extension = Extension::new("highlight").mark(kind);
    for (key, color) in [("h", "yellow"), ("y", "yellow"), ("g", "green"), ("b", "blue"), ("p", "pink")] {
        extension = extension.shortcut(format!("Mod-Shift-{key}"), move || Command::toggle_highlight(color));
    }
    extension
}
