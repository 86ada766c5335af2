//! Document to HTML.
//!
//! Output is a pure function of the document (plus node-view state when
//! given), so exporting an unchanged document is byte-stable. Marks open in
//! the order of their kind names and stay open across adjacent runs that
//! share them.

use pulldown_cmark_escape::{StrWrite, escape_html, escape_html_body_text};
use smol_str::SmolStr;

use crate::model::{Child, Document, Mark, MarkSet, Node};
use crate::schema::{AttrOutput, AttrSpec, AttrTarget, Attrs, Layout, RenderRule, Schema, TagSpec};

/// Marker attribute carrying an opaque node's render state.
pub const RENDER_STATE_ATTR: &str = "data-render-state";

/// What goes inside an opaque node's element when exporting with views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpaqueBody<'a> {
    Pending,
    /// Renderer output, written verbatim.
    Rendered(&'a str),
    /// Error message, shown escaped.
    Errored(&'a str),
}

impl OpaqueBody<'_> {
    fn state(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Rendered(_) => "rendered",
            Self::Errored(_) => "error",
        }
    }
}

/// Supplies opaque node bodies by document path.
pub trait OpaqueBodies {
    fn opaque_body(&self, path: &[usize]) -> Option<OpaqueBody<'_>>;
}

/// The persisted form: opaque nodes carry only their attributes.
pub fn to_html(schema: &Schema, doc: &Document) -> String {
    render(schema, doc, None)
}

/// Like [`to_html`], with each opaque node's current render state.
pub fn to_html_with_views(schema: &Schema, doc: &Document, views: &dyn OpaqueBodies) -> String {
    render(schema, doc, Some(views))
}

fn render(schema: &Schema, doc: &Document, views: Option<&dyn OpaqueBodies>) -> String {
    let mut out = String::new();
    match HtmlWriter::new(schema, &mut out, views).run(doc.root()) {
        Ok(()) => out,
        Err(_) => unreachable!("writing to a String cannot fail"),
    }
}

/// Class, attribute and style output for one element.
#[derive(Debug, Default)]
struct TagAttrs {
    classes: Vec<String>,
    attrs: Vec<(SmolStr, Option<String>)>,
    styles: Vec<String>,
}

impl TagAttrs {
    fn new(rule: &RenderRule) -> Self {
        let mut out = Self::default();
        out.classes.extend(rule.class.iter().map(ToString::to_string));
        out.attrs.extend(
            rule.static_attrs
                .iter()
                .map(|(name, value)| (name.clone(), Some(value.to_string()))),
        );
        out
    }

    fn push_outputs(&mut self, outputs: &[AttrOutput], specs: &[AttrSpec], values: &Attrs) {
        for output in outputs {
            let Some(value) = values.get(&output.attr) else {
                continue;
            };
            if output.omit_default {
                let default = specs
                    .iter()
                    .find(|spec| spec.name == output.attr)
                    .and_then(|spec| spec.default.as_ref());
                if default == Some(value) {
                    continue;
                }
            }
            if let AttrTarget::Flag(name) = &output.target {
                if value.as_bool() == Some(true) {
                    self.attrs.push((name.clone(), None));
                }
                continue;
            }
            let Some(text) = value.to_html_value() else {
                continue;
            };
            match &output.target {
                AttrTarget::Attribute(name) => self.attrs.push((name.clone(), Some(text.to_string()))),
                AttrTarget::Style(property) => self.styles.push(format!("{property}: {text}")),
                AttrTarget::Class(prefix) => self.classes.push(format!("{prefix}{text}")),
                AttrTarget::Flag(_) => {}
            }
        }
    }
}

struct HtmlWriter<'a, W> {
    schema: &'a Schema,
    writer: W,
    views: Option<&'a dyn OpaqueBodies>,
    /// Path of the node being written.
    path: Vec<usize>,
}

impl<'a, W: StrWrite> HtmlWriter<'a, W> {
    fn new(schema: &'a Schema, writer: W, views: Option<&'a dyn OpaqueBodies>) -> Self {
        Self {
            schema,
            writer,
            views,
            path: Vec::new(),
        }
    }

    #[inline]
    fn write(&mut self, s: &str) -> Result<(), W::Error> {
        self.writer.write_str(s)
    }

    fn run(mut self, root: &Node) -> Result<(), W::Error> {
        self.write_content(root.content())
    }

    fn write_open(&mut self, tag: &str, attrs: &TagAttrs) -> Result<(), W::Error> {
        self.write("<")?;
        self.write(tag)?;
        if !attrs.classes.is_empty() {
            self.write(" class=\"")?;
            escape_html(&mut self.writer, &attrs.classes.join(" "))?;
            self.write("\"")?;
        }
        for (name, value) in &attrs.attrs {
            self.write(" ")?;
            self.write(name)?;
            if let Some(value) = value {
                self.write("=\"")?;
                escape_html(&mut self.writer, value)?;
                self.write("\"")?;
            }
        }
        if !attrs.styles.is_empty() {
            self.write(" style=\"")?;
            escape_html(&mut self.writer, &attrs.styles.join("; "))?;
            self.write("\"")?;
        }
        self.write(">")
    }

    fn write_close(&mut self, tag: &str) -> Result<(), W::Error> {
        self.write("</")?;
        self.write(tag)?;
        self.write(">")
    }

    /// Mixed content: text runs with their marks, and nested nodes.
    fn write_content(&mut self, content: &[Child]) -> Result<(), W::Error> {
        let mut open: Vec<&Mark> = Vec::new();
        for (index, child) in content.iter().enumerate() {
            match child {
                Child::Text(run) => {
                    self.sync_marks(&mut open, run.marks())?;
                    escape_html_body_text(&mut self.writer, run.text())?;
                }
                Child::Node(node) => {
                    self.close_marks(&mut open, 0)?;
                    self.path.push(index);
                    self.write_node(node)?;
                    self.path.pop();
                }
            }
        }
        self.close_marks(&mut open, 0)
    }

    /// Close marks not in `next` (and everything opened after them), then
    /// open the missing ones.
    fn sync_marks<'m>(&mut self, open: &mut Vec<&'m Mark>, next: &'m MarkSet) -> Result<(), W::Error> {
        let keep = open
            .iter()
            .zip(next.iter())
            .take_while(|(a, b)| **a == *b)
            .count();
        self.close_marks(open, keep)?;
        for mark in next.iter().skip(keep) {
            self.open_mark(mark)?;
            open.push(mark);
        }
        Ok(())
    }

    fn close_marks(&mut self, open: &mut Vec<&Mark>, keep: usize) -> Result<(), W::Error> {
        while open.len() > keep {
            if let Some(mark) = open.pop() {
                self.close_mark(mark)?;
            }
        }
        Ok(())
    }

    fn open_mark(&mut self, mark: &Mark) -> Result<(), W::Error> {
        let schema = self.schema;
        let Ok(kind) = schema.mark_kind(mark.kind()) else {
            tracing::warn!(target: "inkpad::schema", kind = mark.kind(), "exporting unregistered mark");
            return Ok(());
        };
        let mut attrs = TagAttrs::new(&kind.render);
        attrs.push_outputs(&kind.render.attrs, &kind.attrs, mark.attrs());
        let tag = tag_name(&kind.render.tag, mark.attrs());
        self.write_open(&tag, &attrs)
    }

    fn close_mark(&mut self, mark: &Mark) -> Result<(), W::Error> {
        let schema = self.schema;
        match schema.mark_kind(mark.kind()) {
            Ok(kind) => self.write_close(&tag_name(&kind.render.tag, mark.attrs())),
            Err(_) => Ok(()),
        }
    }

    fn write_node(&mut self, node: &Node) -> Result<(), W::Error> {
        let schema = self.schema;
        let Ok(kind) = schema.node_kind(node.kind()) else {
            tracing::warn!(target: "inkpad::schema", kind = node.kind(), "exporting unregistered node");
            return self.write_content(node.content());
        };
        let rule = &kind.render;
        let tag = tag_name(&rule.tag, node.attrs());
        let mut attrs = TagAttrs::new(rule);
        attrs.push_outputs(&rule.attrs, &kind.attrs, node.attrs());

        match &rule.layout {
            Layout::Fragment => self.write_content(node.content()),
            Layout::Container => {
                self.write_open(&tag, &attrs)?;
                self.write_content(node.content())?;
                self.write_close(&tag)
            }
            Layout::Void => self.write_open(&tag, &attrs),
            Layout::Nested { tag: inner, attrs: outputs } => {
                let mut inner_attrs = TagAttrs::default();
                inner_attrs.push_outputs(outputs, &kind.attrs, node.attrs());
                self.write_open(&tag, &attrs)?;
                self.write_open(inner, &inner_attrs)?;
                self.write_content(node.content())?;
                self.write_close(inner)?;
                self.write_close(&tag)
            }
            Layout::Titled {
                summary_tag,
                summary_class,
                title_attr,
                body_tag,
                body_class,
            } => {
                let title = node
                    .attr(title_attr)
                    .and_then(|value| value.to_html_value())
                    .unwrap_or_default();
                self.write_open(&tag, &attrs)?;
                self.write_open(summary_tag, &class_only(summary_class))?;
                escape_html_body_text(&mut self.writer, &title)?;
                self.write_close(summary_tag)?;
                self.write_open(body_tag, &class_only(body_class))?;
                self.write_content(node.content())?;
                self.write_close(body_tag)?;
                self.write_close(&tag)
            }
            Layout::Opaque => {
                let body = self.views.and_then(|views| views.opaque_body(&self.path));
                if let Some(body) = &body {
                    attrs
                        .attrs
                        .push((RENDER_STATE_ATTR.into(), Some(body.state().to_string())));
                }
                self.write_open(&tag, &attrs)?;
                match body {
                    Some(OpaqueBody::Rendered(output)) => self.write(output)?,
                    Some(OpaqueBody::Errored(message)) => {
                        self.write("<span class=\"node-view-error\">")?;
                        escape_html_body_text(&mut self.writer, message)?;
                        self.write("</span>")?;
                    }
                    Some(OpaqueBody::Pending) | None => {}
                }
                self.write_close(&tag)
            }
        }
    }
}

fn class_only(class: &Option<SmolStr>) -> TagAttrs {
    TagAttrs {
        classes: class.iter().map(ToString::to_string).collect(),
        ..Default::default()
    }
}

fn tag_name(tag: &TagSpec, attrs: &Attrs) -> SmolStr {
    match tag {
        TagSpec::Fixed(tag) => tag.clone(),
        TagSpec::Leveled { prefix, attr } => {
            let level = attrs.get(attr).and_then(|value| value.as_int()).unwrap_or(1);
            smol_str::format_smolstr!("{prefix}{level}")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::test_support::{doc_with, node, p, schema};

    #[test]
    fn test_heading_and_marks() {
        let schema = schema();
        let bold = schema.create_mark("bold", &Attrs::new()).unwrap();
        let para = schema
            .create_node(
                "paragraph",
                &Attrs::new(),
                vec![schema.text("Hello ", []), schema.text("world", [bold])],
            )
            .unwrap();
        let heading = node(&schema, "heading", crate::attrs! { "level" => 1 }, "Title");
        let doc = doc_with(&schema, vec![heading, para]);
        insta::assert_snapshot!(to_html(&schema, &doc), @"<h1>Title</h1><p>Hello <strong>world</strong></p>");
    }

    #[test]
    fn test_marks_nest_alphabetically_and_stay_open() {
        let schema = schema();
        let bold = schema.create_mark("bold", &Attrs::new()).unwrap();
        let italic = schema.create_mark("italic", &Attrs::new()).unwrap();
        let para = schema
            .create_node(
                "paragraph",
                &Attrs::new(),
                vec![
                    schema.text("a", [italic.clone(), bold.clone()]),
                    schema.text("b", [bold]),
                    schema.text("c", [italic]),
                ],
            )
            .unwrap();
        let doc = doc_with(&schema, vec![para]);
        insta::assert_snapshot!(
            to_html(&schema, &doc),
            @"<p><strong><em>a</em>b</strong><em>c</em></p>"
        );
    }

    #[test]
    fn test_attribute_targets() {
        let schema = schema();
        let highlight = schema
            .create_mark("highlight", &crate::attrs! { "color" => "green" })
            .unwrap();
        let centered = schema
            .create_node(
                "paragraph",
                &crate::attrs! { "text_align" => "center" },
                vec![schema.text("hi", [highlight])],
            )
            .unwrap();
        let quote = schema
            .create_node(
                "blockquote",
                &crate::attrs! { "admonition_type" => "note" },
                vec![Child::Node(p(&schema, "careful"))],
            )
            .unwrap();
        let hr = schema.create_node("horizontal_rule", &Attrs::new(), Vec::new()).unwrap();
        let doc = doc_with(&schema, vec![centered, quote, hr]);
        insta::assert_snapshot!(
            to_html(&schema, &doc),
            @r#"<p style="text-align: center"><mark class="highlight highlight-green" data-color="green">hi</mark></p><blockquote class="admonition admonition-note" data-admonition-type="note"><p>careful</p></blockquote><hr class="hr-solid">"#
        );
    }

    #[test]
    fn test_code_block_and_escaping() {
        let schema = schema();
        let code = node(
            &schema,
            "code_block",
            crate::attrs! { "language" => "rust" },
            "if a < b && c {\n}",
        );
        let doc = doc_with(&schema, vec![code]);
        assert_eq!(
            to_html(&schema, &doc),
            "<pre><code class=\"language-rust\">if a &lt; b &amp;&amp; c {\n}</code></pre>"
        );
    }

    #[test]
    fn test_collapsible_and_ordered_list_defaults() {
        let schema = schema();
        let item = schema
            .create_node("list_item", &Attrs::new(), vec![Child::Node(p(&schema, "one"))])
            .unwrap();
        let list = schema
            .create_node("ordered_list", &Attrs::new(), vec![Child::Node(item)])
            .unwrap();
        let section = schema
            .create_node(
                "collapsible_section",
                &crate::attrs! { "title" => "More", "open" => true },
                vec![Child::Node(p(&schema, "body"))],
            )
            .unwrap();
        let doc = doc_with(&schema, vec![list, section]);
        insta::assert_snapshot!(
            to_html(&schema, &doc),
            @r#"<ol><li><p>one</p></li></ol><details class="collapsible-section" open><summary class="collapsible-title">More</summary><div class="collapsible-content"><p>body</p></div></details>"#
        );
    }

    struct Views(HashMap<Vec<usize>, OpaqueBody<'static>>);

    impl OpaqueBodies for Views {
        fn opaque_body(&self, path: &[usize]) -> Option<OpaqueBody<'_>> {
            self.0.get(path).copied()
        }
    }

    #[test]
    fn test_opaque_bodies() {
        let schema = schema();
        let diagram = schema
            .create_node("diagram", &crate::attrs! { "code" => "pie" }, Vec::new())
            .unwrap();
        let math = schema
            .create_node("math_block", &crate::attrs! { "latex" => "x^2" }, Vec::new())
            .unwrap();
        let doc = doc_with(&schema, vec![diagram, math]);
        insta::assert_snapshot!(
            to_html(&schema, &doc),
            @r#"<div class="mermaid-diagram" data-mermaid="pie" data-type="flowchart"></div><div class="math-block" data-latex="x^2"></div>"#
        );

        let views = Views(HashMap::from([
            (vec![0], OpaqueBody::Errored("bad <syntax>")),
            (vec![1], OpaqueBody::Rendered("<math>x</math>")),
        ]));
        insta::assert_snapshot!(
            to_html_with_views(&schema, &doc, &views),
            @r#"<div class="mermaid-diagram" data-mermaid="pie" data-type="flowchart" data-render-state="error"><span class="node-view-error">bad &lt;syntax&gt;</span></div><div class="math-block" data-latex="x^2" data-render-state="rendered"><math>x</math></div>"#
        );
    }
}
