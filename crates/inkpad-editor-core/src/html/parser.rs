//! HTML to document.
//!
//! Elements are matched against the schema's parse rules in registration
//! order and the first match wins. Markup that does not fit the schema is
//! flattened into its parent and recorded in an [`ImportReport`] rather than
//! failing the import.
//!
//! Whitespace in rich textblocks: a whitespace run containing a newline
//! becomes one space, and is dropped entirely at the very start and end of
//! the block. Code blocks keep their text verbatim.

use std::mem;

use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use smol_str::SmolStr;

use crate::error::{ImportDegraded, SchemaError};
use crate::model::{Child, Document, Mark, MarkSet, Node, TextRun, inline};
use crate::schema::{
    AttrSource, AttrType, AttrValue, Attrs, Category, Condition, ContentRule, DEFAULT_TEXTBLOCK,
    KindRef, NodeKind, ParseContent, ParseRule, ROOT, Schema, Selector,
};

/// Elements passed through without a trace.
const TRANSPARENT: &[&str] = &["html", "body", "tbody", "thead", "tfoot"];

/// Elements dropped together with their content.
const DROPPED: &[&str] = &[
    "head", "script", "style", "template", "noscript", "title", "meta", "link",
];

/// What the importer could not represent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub degraded: Vec<ImportDegraded>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.degraded.is_empty()
    }

    pub(crate) fn push(&mut self, degraded: ImportDegraded) {
        tracing::debug!(target: "inkpad::import", %degraded, "import degraded");
        self.degraded.push(degraded);
    }
}

#[derive(Debug, Clone)]
pub struct ParsedHtml {
    pub doc: Document,
    pub report: ImportReport,
}

/// Parse a whole document.
pub fn from_html(schema: &Schema, html: &str) -> Result<ParsedHtml, SchemaError> {
    let (blocks, report) = parse_blocks(schema, html)?;
    let doc = Document::from_blocks(schema, blocks)?;
    tracing::debug!(
        target: "inkpad::import",
        blocks = doc.root().child_count(),
        degraded = report.degraded.len(),
        "imported html"
    );
    Ok(ParsedHtml { doc, report })
}

/// Parse pasted markup into top-level blocks. Inline-only markup comes back
/// as a single paragraph.
pub fn parse_fragment(schema: &Schema, html: &str) -> Result<(Vec<Node>, ImportReport), SchemaError> {
    parse_blocks(schema, html)
}

fn parse_blocks(schema: &Schema, html: &str) -> Result<(Vec<Node>, ImportReport), SchemaError> {
    let root = required(schema, ROOT)?;
    required(schema, DEFAULT_TEXTBLOCK)?;

    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
    let mut nodes = Vec::new();
    convert(&dom.document, &mut nodes);

    let mut importer = Importer {
        schema,
        report: ImportReport::default(),
    };
    let mut sink = BlockSink::new(root);
    importer.blocks(&mut sink, nodes);
    let blocks = importer.finish(sink);
    Ok((blocks, importer.report))
}

fn required<'s>(schema: &'s Schema, name: &str) -> Result<&'s NodeKind, SchemaError> {
    schema
        .node_kind(name)
        .map_err(|_| SchemaError::MissingRequiredKind(name.into()))
}

/// Owned, simplified DOM.
#[derive(Debug, Clone)]
enum Dom {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Element {
    tag: SmolStr,
    attrs: Vec<(SmolStr, String)>,
    children: Vec<Dom>,
}

fn convert(handle: &Handle, out: &mut Vec<Dom>) {
    match &handle.data {
        NodeData::Document => {
            for child in handle.children.borrow().iter() {
                convert(child, out);
            }
        }
        NodeData::Element { name, attrs, .. } => {
            let mut children = Vec::new();
            for child in handle.children.borrow().iter() {
                convert(child, &mut children);
            }
            let attrs = attrs
                .borrow()
                .iter()
                .map(|attr| (SmolStr::new(&*attr.name.local), String::from(&*attr.value)))
                .collect();
            out.push(Dom::Element(Element {
                tag: SmolStr::new(name.local.to_ascii_lowercase()),
                attrs,
                children,
            }));
        }
        NodeData::Text { contents } => {
            let contents = contents.borrow();
            let text: &str = &contents;
            out.push(Dom::Text(text.to_owned()));
        }
        _ => {}
    }
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_ascii_whitespace()
    }

    fn style(&self, property: &str) -> Option<&str> {
        self.attr("style")?
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(property))
            .map(|(_, value)| value.trim())
    }

    fn class_suffix(&self, prefix: &str) -> Option<&str> {
        self.classes()
            .filter_map(|class| class.strip_prefix(prefix))
            .find(|rest| !rest.is_empty())
    }

    fn matches(&self, selector: &Selector) -> bool {
        self.tag.eq_ignore_ascii_case(&selector.tag)
            && selector.conditions.iter().all(|condition| match condition {
                Condition::Class(class) => self.classes().any(|c| c == class),
                Condition::HasAttr(name) => self.attr(name).is_some(),
                Condition::AttrEquals(name, value) => self.attr(name) == Some(value.as_str()),
                Condition::LacksAttr(name) => self.attr(name).is_none(),
                Condition::HasStyle(property) => self.style(property).is_some(),
            })
    }

    fn find(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find_map(|child| match child {
            Dom::Element(el) if el.tag == tag => Some(el),
            Dom::Element(el) => el.find(tag),
            Dom::Text(_) => None,
        })
    }

    fn text(&self) -> String {
        let mut out = String::new();
        raw_text(&self.children, &mut out);
        out
    }
}

/// Text of `nodes` with `<br>` as newlines and all other markup dropped.
fn raw_text(nodes: &[Dom], out: &mut String) {
    for node in nodes {
        match node {
            Dom::Text(text) => out.push_str(text),
            Dom::Element(el) if el.tag == "br" => out.push('\n'),
            Dom::Element(el) => raw_text(&el.children, out),
        }
    }
}

/// Children of the first descendant matching `selector`, taken out of the tree.
fn take_inner(children: &mut [Dom], selector: &Selector) -> Option<Vec<Dom>> {
    children.iter_mut().find_map(|child| match child {
        Dom::Element(el) if el.matches(selector) => Some(mem::take(&mut el.children)),
        Dom::Element(el) => take_inner(&mut el.children, selector),
        Dom::Text(_) => None,
    })
}

fn is_newline_run(ws: &str) -> bool {
    ws.contains('\n')
}

fn trim_soft_start(node: &mut Dom) {
    match node {
        Dom::Text(text) => {
            let ws = text.len() - text.trim_start().len();
            if is_newline_run(&text[..ws]) {
                text.drain(..ws);
            }
        }
        Dom::Element(el) => {
            if let Some(first) = el.children.first_mut() {
                trim_soft_start(first);
            }
        }
    }
}

fn trim_soft_end(node: &mut Dom) {
    match node {
        Dom::Text(text) => {
            let keep = text.trim_end().len();
            if is_newline_run(&text[keep..]) {
                text.truncate(keep);
            }
        }
        Dom::Element(el) => {
            if let Some(last) = el.children.last_mut() {
                trim_soft_end(last);
            }
        }
    }
}

/// Replace each whitespace run that contains a newline with one space.
fn collapse_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = String::new();
    for ch in text.chars() {
        if ch.is_whitespace() {
            run.push(ch);
            continue;
        }
        flush_run(&mut out, &mut run);
        out.push(ch);
    }
    flush_run(&mut out, &mut run);
    out
}

fn flush_run(out: &mut String, run: &mut String) {
    if is_newline_run(run) {
        out.push(' ');
    } else {
        out.push_str(run);
    }
    run.clear();
}

/// Block children being collected for one container, with inline content
/// waiting to become an implicit paragraph.
struct BlockSink<'s> {
    parent: &'s NodeKind,
    blocks: Vec<Node>,
    inline: Vec<Child>,
}

impl<'s> BlockSink<'s> {
    fn new(parent: &'s NodeKind) -> Self {
        Self {
            parent,
            blocks: Vec::new(),
            inline: Vec::new(),
        }
    }
}

struct Importer<'s> {
    schema: &'s Schema,
    report: ImportReport,
}

impl<'s> Importer<'s> {
    fn rule_for(&self, el: &Element) -> Option<(KindRef<'s>, &'s ParseRule)> {
        self.schema
            .parse_rules()
            .find(|(_, rule)| el.matches(&rule.selector))
    }

    fn paragraph(&self) -> Option<&'s NodeKind> {
        self.schema.node_kind(DEFAULT_TEXTBLOCK).ok()
    }

    fn finish(&mut self, mut sink: BlockSink<'s>) -> Vec<Node> {
        self.flush(&mut sink);
        sink.blocks
    }

    /// Turn buffered inline content into a paragraph, if the parent takes one.
    fn flush(&mut self, sink: &mut BlockSink<'s>) {
        let mut content = inline::normalize(mem::take(&mut sink.inline));
        if let Some(Child::Text(run)) = content.first() {
            let trimmed = run.text().trim_start();
            if trimmed.len() != run.text().len() {
                content[0] = Child::Text(TextRun::new(trimmed, run.marks().clone()));
            }
        }
        if let Some(Child::Text(run)) = content.last() {
            let trimmed = run.text().trim_end();
            if trimmed.len() != run.text().len() {
                let last = content.len() - 1;
                content[last] = Child::Text(TextRun::new(trimmed, run.marks().clone()));
            }
        }
        let content = inline::normalize(content);
        if content.is_empty() {
            return;
        }
        match self.paragraph() {
            Some(paragraph) if self.schema.allows(sink.parent, paragraph) => {
                sink.blocks
                    .push(Node::new(paragraph.name.clone(), paragraph_attrs(paragraph), content));
            }
            _ => self.report.push(ImportDegraded::DroppedInline {
                parent: sink.parent.name.clone(),
            }),
        }
    }

    fn blocks(&mut self, sink: &mut BlockSink<'s>, nodes: Vec<Dom>) {
        for node in nodes {
            match node {
                Dom::Text(text) => {
                    if sink.inline.is_empty() && text.trim().is_empty() {
                        continue;
                    }
                    let block = self.paragraph().unwrap_or(sink.parent);
                    self.text(text, block, &MarkSet::new(), true, &mut sink.inline);
                }
                Dom::Element(el) => self.block_element(sink, el),
            }
        }
    }

    fn block_element(&mut self, sink: &mut BlockSink<'s>, el: Element) {
        let tag = el.tag.as_str();
        if DROPPED.contains(&tag) {
            return;
        }
        if TRANSPARENT.contains(&tag) {
            self.blocks(sink, el.children);
            return;
        }
        match self.rule_for(&el) {
            Some((KindRef::Node(kind), rule)) if kind.category == Category::Block => {
                if !self.schema.allows(sink.parent, kind) {
                    self.report.push(ImportDegraded::Misplaced {
                        kind: kind.name.clone(),
                        parent: sink.parent.name.clone(),
                    });
                    self.blocks(sink, el.children);
                    return;
                }
                let Some(attrs) = self.attrs_for(KindRef::Node(kind), rule, &el) else {
                    self.blocks(sink, el.children);
                    return;
                };
                self.flush(sink);
                if let Some(node) = self.build_block(kind, rule, attrs, el) {
                    sink.blocks.push(node);
                }
            }
            Some(_) => {
                let block = self.paragraph().unwrap_or(sink.parent);
                self.inline(Dom::Element(el), block, &MarkSet::new(), &mut sink.inline);
            }
            None => {
                self.report.push(ImportDegraded::UnknownElement { tag: el.tag.clone() });
                self.blocks(sink, el.children);
            }
        }
    }

    /// Resolve the attributes a rule reads from `el`, recording failure.
    fn attrs_for(&mut self, kind: KindRef<'_>, rule: &ParseRule, el: &Element) -> Option<Attrs> {
        let (name, specs) = match kind {
            KindRef::Node(kind) => (&kind.name, &kind.attrs),
            KindRef::Mark(kind) => (&kind.name, &kind.attrs),
        };
        let mut given = Attrs::new();
        for (attr, source) in &rule.attrs {
            let ty = specs
                .iter()
                .find(|spec| spec.name == *attr)
                .map_or(AttrType::Str, |spec| spec.ty);
            if let Some(value) = read_attr(el, source, ty) {
                given.insert(attr.clone(), value);
            }
        }
        let resolved = match kind {
            KindRef::Node(kind) => kind.resolve_attrs(&given),
            KindRef::Mark(kind) => kind.resolve_attrs(&given),
        };
        match resolved {
            Ok(attrs) => Some(attrs),
            Err(error) => {
                self.report.push(ImportDegraded::InvalidAttrs {
                    tag: el.tag.clone(),
                    kind: name.clone(),
                    error,
                });
                None
            }
        }
    }

    /// Build a block node from a matched element. Returns `None` when the
    /// element turned out empty and its kind cannot be left empty.
    fn build_block(&mut self, kind: &'s NodeKind, rule: &ParseRule, attrs: Attrs, mut el: Element) -> Option<Node> {
        let children = match &rule.content {
            ParseContent::Ignore => Vec::new(),
            ParseContent::Text => {
                let text = el.text();
                let content = if text.is_empty() {
                    Vec::new()
                } else {
                    vec![Child::Text(TextRun::new(text, MarkSet::new()))]
                };
                return Some(Node::new(kind.name.clone(), attrs, content));
            }
            ParseContent::Children => el.children,
            ParseContent::Inner { selector, skip } => match take_inner(&mut el.children, selector) {
                Some(inner) => inner,
                None => {
                    el.children.retain(|child| match child {
                        Dom::Element(child) => !skip.iter().any(|s| child.matches(s)),
                        Dom::Text(_) => true,
                    });
                    el.children
                }
            },
        };

        let content = match &kind.content {
            ContentRule::Empty => Vec::new(),
            ContentRule::Inline { .. } => self.textblock(kind, children),
            ContentRule::Blocks(_) => {
                let mut sink = BlockSink::new(kind);
                self.blocks(&mut sink, children);
                let blocks = self.finish(sink);
                if blocks.is_empty() {
                    match self.paragraph() {
                        Some(paragraph) if self.schema.allows(kind, paragraph) => {
                            vec![Child::Node(Node::new(
                                paragraph.name.clone(),
                                paragraph_attrs(paragraph),
                                Vec::new(),
                            ))]
                        }
                        _ => {
                            self.report.push(ImportDegraded::EmptyContainer {
                                kind: kind.name.clone(),
                            });
                            return None;
                        }
                    }
                } else {
                    blocks.into_iter().map(Child::Node).collect()
                }
            }
        };
        Some(Node::new(kind.name.clone(), attrs, content))
    }

    fn textblock(&mut self, kind: &'s NodeKind, mut children: Vec<Dom>) -> Vec<Child> {
        if let Some(first) = children.first_mut() {
            trim_soft_start(first);
        }
        if let Some(last) = children.last_mut() {
            trim_soft_end(last);
        }
        let mut content = Vec::new();
        for child in children {
            self.inline(child, kind, &MarkSet::new(), &mut content);
        }
        inline::normalize(content)
    }

    fn text(&mut self, text: String, block: &NodeKind, marks: &MarkSet, collapse: bool, out: &mut Vec<Child>) {
        let text = if collapse { collapse_newlines(&text) } else { text };
        if text.is_empty() {
            return;
        }
        let marks = if block.allows_marks() {
            marks.clone()
        } else {
            MarkSet::new()
        };
        out.push(Child::Text(TextRun::new(text, marks)));
    }

    /// Inline content of textblock `block`, under `marks`.
    fn inline(&mut self, node: Dom, block: &'s NodeKind, marks: &MarkSet, out: &mut Vec<Child>) {
        let el = match node {
            Dom::Text(text) => {
                self.text(text, block, marks, true, out);
                return;
            }
            Dom::Element(el) => el,
        };
        if DROPPED.contains(&el.tag.as_str()) {
            return;
        }
        match self.rule_for(&el) {
            Some((KindRef::Mark(kind), rule)) => {
                let marks = match self.attrs_for(KindRef::Mark(kind), rule, &el) {
                    Some(attrs) if block.allows_marks() => {
                        marks.clone().with(Mark::new(kind.name.clone(), attrs), self.schema)
                    }
                    _ => marks.clone(),
                };
                if rule.content != ParseContent::Ignore {
                    for child in el.children {
                        self.inline(child, block, &marks, out);
                    }
                }
            }
            Some((KindRef::Node(kind), rule))
                if kind.category == Category::Inline && self.schema.allows(block, kind) =>
            {
                if let Some(attrs) = self.attrs_for(KindRef::Node(kind), rule, &el) {
                    out.push(Child::Node(Node::new(kind.name.clone(), attrs, Vec::new())));
                } else {
                    self.inline_children(el.children, block, marks, out);
                }
            }
            Some((KindRef::Node(kind), _)) => {
                self.report.push(ImportDegraded::Misplaced {
                    kind: kind.name.clone(),
                    parent: block.name.clone(),
                });
                self.inline_children(el.children, block, marks, out);
            }
            None => {
                if !TRANSPARENT.contains(&el.tag.as_str()) {
                    self.report.push(ImportDegraded::UnknownElement { tag: el.tag.clone() });
                }
                self.inline_children(el.children, block, marks, out);
            }
        }
    }

    fn inline_children(&mut self, children: Vec<Dom>, block: &'s NodeKind, marks: &MarkSet, out: &mut Vec<Child>) {
        for child in children {
            self.inline(child, block, marks, out);
        }
    }
}

/// Attributes of an implicit paragraph: every declared default.
fn paragraph_attrs(kind: &NodeKind) -> Attrs {
    kind.resolve_attrs(&Attrs::new()).unwrap_or_default()
}

fn read_attr(el: &Element, source: &AttrSource, ty: AttrType) -> Option<AttrValue> {
    match source {
        AttrSource::Attribute(name) => ty.parse(el.attr(name)?),
        AttrSource::Flag(name) => Some(AttrValue::Bool(el.attr(name).is_some())),
        AttrSource::Style(property) => ty.parse(el.style(property)?),
        AttrSource::ClassPrefix(prefix) => ty.parse(el.class_suffix(prefix)?),
        AttrSource::TagLevel => el
            .tag
            .chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .map(|level| AttrValue::Int(i64::from(level))),
        AttrSource::ChildText(tag) => ty.parse(&el.find(tag)?.text()),
        AttrSource::ChildClassPrefix { tag, prefix } => ty.parse(el.find(tag)?.class_suffix(prefix)?),
        AttrSource::Value(value) => Some(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::to_html;
    use crate::test_support::schema;

    fn import(html: &str) -> (Schema, ParsedHtml) {
        let schema = schema();
        let parsed = from_html(&schema, html).unwrap();
        parsed.doc.check(&schema).unwrap();
        (schema, parsed)
    }

    fn kinds(doc: &Document) -> Vec<&str> {
        doc.root().children().map(Node::kind).collect()
    }

    #[test]
    fn test_heading_and_marked_paragraph() {
        let html = "<h1>Title</h1><p>Hello <strong>world</strong></p>";
        let (schema, parsed) = import(html);
        assert!(parsed.report.is_clean());
        assert_eq!(kinds(&parsed.doc), ["heading", "paragraph"]);
        let heading = parsed.doc.node_at(&[0]).unwrap();
        assert_eq!(heading.attr("level"), Some(&AttrValue::Int(1)));
        let paragraph = parsed.doc.node_at(&[1]).unwrap();
        assert_eq!(paragraph.child_count(), 2);
        let bold = paragraph.content()[1].as_text().unwrap();
        assert_eq!(bold.text(), "world");
        assert!(bold.marks().has("bold"));
        assert_eq!(to_html(&schema, &parsed.doc), html);
    }

    #[test]
    fn test_unknown_element_is_flattened() {
        let (_, parsed) = import("<p>a <blink>b</blink> c</p>");
        assert_eq!(parsed.doc.root().text_content(), "a b c");
        assert_eq!(
            parsed.report.degraded,
            [ImportDegraded::UnknownElement { tag: "blink".into() }]
        );
    }

    #[test]
    fn test_script_and_comments_are_dropped() {
        let (_, parsed) = import("<p>a</p><!-- note --><script>alert(1)</script><p>b</p>");
        assert!(parsed.report.is_clean());
        assert_eq!(kinds(&parsed.doc), ["paragraph", "paragraph"]);
        assert_eq!(parsed.doc.root().text_content(), "ab");
    }

    #[test]
    fn test_bare_inline_content_gets_a_paragraph() {
        let (schema, parsed) = import("<strong>bold</strong> text");
        assert_eq!(to_html(&schema, &parsed.doc), "<p><strong>bold</strong> text</p>");
    }

    #[test]
    fn test_legacy_forms_import_as_current_kinds() {
        let (schema, parsed) = import(concat!(
            r#"<div class="admonition admonition-warning">"#,
            r#"<div class="admonition-title">Warning</div>"#,
            r#"<div class="admonition-content"><p>Careful</p></div></div>"#,
            r#"<p><span class="highlight highlight-green">x</span><span data-math="x^2"></span></p>"#,
        ));
        assert!(parsed.report.is_clean());
        insta::assert_snapshot!(
            to_html(&schema, &parsed.doc),
            @r#"<blockquote class="admonition admonition-warning" data-admonition-type="warning"><p>Careful</p></blockquote><p><mark class="highlight highlight-green" data-color="green">x</mark><span class="math-inline" data-latex="x^2"></span></p>"#
        );
    }

    #[test]
    fn test_table_sections_are_read_through() {
        let (schema, parsed) = import(
            "<table><thead><tr><th>A</th></tr></thead><tbody><tr><td>1</td></tr></tbody></table>",
        );
        assert!(parsed.report.is_clean());
        assert_eq!(
            to_html(&schema, &parsed.doc),
            "<table><tbody><tr><th><p>A</p></th></tr><tr><td><p>1</p></td></tr></tbody></table>"
        );
    }

    #[test]
    fn test_task_list_is_told_apart_from_bullet_list() {
        let (_, parsed) = import(concat!(
            r#"<ul data-type="taskList"><li data-type="taskItem" data-checked="true"><p>done</p></li></ul>"#,
            "<ul><li><p>plain</p></li></ul>",
        ));
        assert_eq!(kinds(&parsed.doc), ["task_list", "bullet_list"]);
        let item = parsed.doc.node_at(&[0, 0]).unwrap();
        assert_eq!(item.kind(), "task_item");
        assert_eq!(item.attr("checked"), Some(&AttrValue::Bool(true)));
        assert_eq!(parsed.doc.node_at(&[1, 0]).unwrap().kind(), "list_item");
    }

    #[test]
    fn test_misplaced_block_is_flattened_and_reported() {
        let (_, parsed) = import("<ul><p>x</p></ul>");
        assert_eq!(
            parsed.report.degraded,
            [
                ImportDegraded::Misplaced {
                    kind: "paragraph".into(),
                    parent: "bullet_list".into(),
                },
                ImportDegraded::DroppedInline {
                    parent: "bullet_list".into(),
                },
                ImportDegraded::EmptyContainer {
                    kind: "bullet_list".into(),
                },
            ]
        );
        assert_eq!(kinds(&parsed.doc), ["paragraph"]);
    }

    #[test]
    fn test_formatting_whitespace_is_collapsed() {
        let (schema, parsed) = import("<p>\n  Hello\n  <em>there</em>\n</p>\n<p>two  spaces</p>");
        assert_eq!(
            to_html(&schema, &parsed.doc),
            "<p>Hello <em>there</em></p><p>two  spaces</p>"
        );
    }

    #[test]
    fn test_code_block_text_is_verbatim() {
        let (_, parsed) =
            import("<pre><code class=\"language-rust\">fn a() {\n    <b>b</b>\n}</code></pre>");
        let code = parsed.doc.node_at(&[0]).unwrap();
        assert_eq!(code.kind(), "code_block");
        assert_eq!(code.attr("language"), Some(&AttrValue::from("rust")));
        assert_eq!(code.text_content(), "fn a() {\n    b\n}");
    }

    #[test]
    fn test_invalid_attrs_are_reported() {
        let (_, parsed) = import(r#"<p>a<img alt="no source">b</p>"#);
        assert!(matches!(
            &parsed.report.degraded[..],
            [ImportDegraded::InvalidAttrs { kind, error: SchemaError::MissingAttr { .. }, .. }] if kind == "image"
        ));
        assert_eq!(parsed.doc.root().text_content(), "ab");
    }

    #[test]
    fn test_fragment_keeps_blocks() {
        let schema = schema();
        let (blocks, report) = parse_fragment(&schema, "<h2>A</h2><hr>").unwrap();
        assert!(report.is_clean());
        let kinds: Vec<_> = blocks.iter().map(Node::kind).collect();
        assert_eq!(kinds, ["heading", "horizontal_rule"]);
    }

    #[test]
    fn test_missing_root_kind_is_fatal() {
        assert_eq!(
            from_html(&Schema::new(), "<p>x</p>").unwrap_err(),
            SchemaError::MissingRequiredKind("doc".into())
        );
    }
}
