//! Schema registry: the node and mark kinds a document may contain.
//!
//! Kinds are immutable once registered. Registering the same name twice is
//! a no-op when the definitions are identical and a [`SchemaError`]
//! otherwise. Kinds referenced by `ContentRule::*(Allowed::Only(..))` must
//! already be registered, so containers are registered after their children.

mod attrs;
mod rules;

use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;

pub use attrs::{AttrSpec, AttrType, AttrValue, Attrs};
pub use rules::{
    AttrOutput, AttrSource, AttrTarget, Condition, Layout, ParseContent, ParseRule, RenderRule,
    Selector, TagSpec,
};

use crate::error::SchemaError;
use crate::model::{Child, Mark, MarkSet, Node, TextRun};

/// Name of the reserved root kind.
pub const ROOT: &str = "doc";
/// Textblock used for implicit paragraphs and block resets.
pub const DEFAULT_TEXTBLOCK: &str = "paragraph";
/// Inline node standing for a line break inside rich text.
pub const LINE_BREAK: &str = "hard_break";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Block,
    Inline,
}

/// Which kinds a content rule admits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allowed {
    /// Any registered kind of the matching category.
    Any,
    Only(BTreeSet<SmolStr>),
}

impl Allowed {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self::Only(names.into_iter().map(Into::into).collect())
    }

    pub fn permits(&self, name: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(names) => names.contains(name),
        }
    }
}

/// What a node may contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentRule {
    /// Leaf node.
    Empty,
    /// Text runs plus the admitted inline node kinds. This makes a textblock.
    Inline { marks: bool, nodes: Allowed },
    /// One or more block children.
    Blocks(Allowed),
}

impl ContentRule {
    /// Marked text and any inline node.
    pub fn rich_text() -> Self {
        Self::Inline {
            marks: true,
            nodes: Allowed::Any,
        }
    }

    /// Unmarked text only.
    pub fn plain_text() -> Self {
        Self::Inline {
            marks: false,
            nodes: Allowed::Only(BTreeSet::new()),
        }
    }

    pub fn blocks() -> Self {
        Self::Blocks(Allowed::Any)
    }

    fn references(&self) -> impl Iterator<Item = &SmolStr> {
        let allowed = match self {
            Self::Empty => None,
            Self::Inline { nodes, .. } => Some(nodes),
            Self::Blocks(allowed) => Some(allowed),
        };
        allowed
            .into_iter()
            .flat_map(|allowed| match allowed {
                Allowed::Any => None,
                Allowed::Only(names) => Some(names.iter()),
            })
            .flatten()
    }
}

/// A registered node kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeKind {
    pub name: SmolStr,
    pub category: Category,
    pub groups: BTreeSet<SmolStr>,
    pub content: ContentRule,
    pub attrs: Vec<AttrSpec>,
    /// Set for opaque kinds: the attribute whose change triggers a re-render.
    pub opaque: Option<SmolStr>,
    pub parse: Vec<ParseRule>,
    pub render: RenderRule,
}

impl NodeKind {
    pub fn block(name: impl Into<SmolStr>) -> Self {
        Self::new(name.into(), Category::Block, ContentRule::Empty)
    }

    pub fn inline(name: impl Into<SmolStr>) -> Self {
        Self::new(name.into(), Category::Inline, ContentRule::Empty)
    }

    fn new(name: SmolStr, category: Category, content: ContentRule) -> Self {
        Self {
            render: RenderRule::container(name.clone()),
            name,
            category,
            groups: BTreeSet::new(),
            content,
            attrs: Vec::new(),
            opaque: None,
            parse: Vec::new(),
        }
    }

    pub fn content(mut self, content: ContentRule) -> Self {
        self.content = content;
        self
    }

    pub fn group(mut self, group: impl Into<SmolStr>) -> Self {
        self.groups.insert(group.into());
        self
    }

    pub fn attr(mut self, spec: AttrSpec) -> Self {
        self.attrs.push(spec);
        self
    }

    pub fn opaque(mut self, content_attr: impl Into<SmolStr>) -> Self {
        self.opaque = Some(content_attr.into());
        self.content = ContentRule::Empty;
        self
    }

    pub fn parse(mut self, rule: ParseRule) -> Self {
        self.parse.push(rule);
        self
    }

    pub fn render(mut self, rule: RenderRule) -> Self {
        self.render = rule;
        self
    }

    pub fn is_textblock(&self) -> bool {
        matches!(self.content, ContentRule::Inline { .. })
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.content, ContentRule::Empty)
    }

    pub fn is_opaque(&self) -> bool {
        self.opaque.is_some()
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    pub fn allows_marks(&self) -> bool {
        matches!(self.content, ContentRule::Inline { marks: true, .. })
    }

    pub fn attr_spec(&self, name: &str) -> Option<&AttrSpec> {
        self.attrs.iter().find(|spec| spec.name == name)
    }

    pub fn resolve_attrs(&self, given: &Attrs) -> Result<Attrs, SchemaError> {
        resolve_attrs(&self.name, &self.attrs, given)
    }
}

/// A registered mark kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkKind {
    pub name: SmolStr,
    pub attrs: Vec<AttrSpec>,
    /// Other mark kinds that cannot share a run with this one. A kind always
    /// excludes itself, so two colours of one mark never coexist.
    pub exclusive_with: BTreeSet<SmolStr>,
    pub parse: Vec<ParseRule>,
    pub render: RenderRule,
}

impl MarkKind {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        let name = name.into();
        Self {
            render: RenderRule::container(name.clone()),
            name,
            attrs: Vec::new(),
            exclusive_with: BTreeSet::new(),
            parse: Vec::new(),
        }
    }

    pub fn attr(mut self, spec: AttrSpec) -> Self {
        self.attrs.push(spec);
        self
    }

    pub fn excludes(mut self, other: impl Into<SmolStr>) -> Self {
        self.exclusive_with.insert(other.into());
        self
    }

    pub fn parse(mut self, rule: ParseRule) -> Self {
        self.parse.push(rule);
        self
    }

    pub fn render(mut self, rule: RenderRule) -> Self {
        self.render = rule;
        self
    }

    pub fn resolve_attrs(&self, given: &Attrs) -> Result<Attrs, SchemaError> {
        resolve_attrs(&self.name, &self.attrs, given)
    }
}

fn resolve_attrs(kind: &SmolStr, specs: &[AttrSpec], given: &Attrs) -> Result<Attrs, SchemaError> {
    if let Some(unknown) = given.keys().find(|name| !specs.iter().any(|s| &s.name == *name)) {
        return Err(SchemaError::UnknownAttr {
            kind: kind.clone(),
            attr: unknown.clone(),
        });
    }
    let mut resolved = Attrs::new();
    for spec in specs {
        let value = match given.get(&spec.name) {
            Some(value) => value.clone(),
            None => spec.default.clone().ok_or_else(|| SchemaError::MissingAttr {
                kind: kind.clone(),
                attr: spec.name.clone(),
            })?,
        };
        if !spec.accepts(&value) {
            return Err(SchemaError::AttrType {
                kind: kind.clone(),
                attr: spec.name.clone(),
                expected: spec.ty,
                found: value,
            });
        }
        if let (Some((min, max)), false) = (spec.range, spec.in_range(&value)) {
            return Err(SchemaError::AttrOutOfRange {
                kind: kind.clone(),
                attr: spec.name.clone(),
                min,
                max,
                found: value,
            });
        }
        resolved.insert(spec.name.clone(), value);
    }
    Ok(resolved)
}

/// Either kind of schema entry, for [`Schema::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindDef {
    Node(NodeKind),
    Mark(MarkKind),
}

impl From<NodeKind> for KindDef {
    fn from(kind: NodeKind) -> Self {
        Self::Node(kind)
    }
}

impl From<MarkKind> for KindDef {
    fn from(kind: MarkKind) -> Self {
        Self::Mark(kind)
    }
}

/// A resolved schema entry.
#[derive(Debug, Clone, Copy)]
pub enum KindRef<'a> {
    Node(&'a NodeKind),
    Mark(&'a MarkKind),
}

/// Owner of a parse rule, in registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RuleOwner {
    Node(SmolStr),
    Mark(SmolStr),
}

/// The node and mark kinds known to an editor.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    nodes: IndexMap<SmolStr, Arc<NodeKind>>,
    marks: IndexMap<SmolStr, Arc<MarkKind>>,
    parse_order: Vec<RuleOwner>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node or mark kind.
    ///
    /// Returns `Ok(false)` when an identical definition was already present.
    pub fn register(&mut self, def: impl Into<KindDef>) -> Result<bool, SchemaError> {
        match def.into() {
            KindDef::Node(kind) => self.register_node(kind),
            KindDef::Mark(kind) => self.register_mark(kind),
        }
    }

    fn register_node(&mut self, kind: NodeKind) -> Result<bool, SchemaError> {
        if let Some(existing) = self.nodes.get(&kind.name) {
            if **existing == kind {
                tracing::debug!(target: "inkpad::schema", kind = %kind.name, "identical node kind registered again");
                return Ok(false);
            }
            return Err(SchemaError::DuplicateKind(kind.name));
        }
        if self.marks.contains_key(&kind.name) {
            return Err(SchemaError::DuplicateKind(kind.name));
        }
        if let Some(missing) = kind
            .content
            .references()
            .find(|name| **name != kind.name && !self.nodes.contains_key(*name))
        {
            return Err(SchemaError::InvalidSchema {
                kind: kind.name.clone(),
                reference: missing.clone(),
            });
        }
        tracing::trace!(target: "inkpad::schema", kind = %kind.name, "registered node kind");
        self.parse_order.push(RuleOwner::Node(kind.name.clone()));
        self.nodes.insert(kind.name.clone(), Arc::new(kind));
        Ok(true)
    }

    fn register_mark(&mut self, kind: MarkKind) -> Result<bool, SchemaError> {
        if let Some(existing) = self.marks.get(&kind.name) {
            if **existing == kind {
                tracing::debug!(target: "inkpad::schema", kind = %kind.name, "identical mark kind registered again");
                return Ok(false);
            }
            return Err(SchemaError::DuplicateKind(kind.name));
        }
        if self.nodes.contains_key(&kind.name) {
            return Err(SchemaError::DuplicateKind(kind.name));
        }
        tracing::trace!(target: "inkpad::schema", kind = %kind.name, "registered mark kind");
        self.parse_order.push(RuleOwner::Mark(kind.name.clone()));
        self.marks.insert(kind.name.clone(), Arc::new(kind));
        Ok(true)
    }

    pub fn resolve(&self, name: &str) -> Result<KindRef<'_>, SchemaError> {
        if let Some(kind) = self.nodes.get(name) {
            return Ok(KindRef::Node(kind));
        }
        self.marks
            .get(name)
            .map(|kind| KindRef::Mark(kind))
            .ok_or_else(|| SchemaError::UnknownKind(name.into()))
    }

    pub fn node_kind(&self, name: &str) -> Result<&NodeKind, SchemaError> {
        self.nodes
            .get(name)
            .map(|kind| &**kind)
            .ok_or_else(|| SchemaError::UnknownKind(name.into()))
    }

    pub fn mark_kind(&self, name: &str) -> Result<&MarkKind, SchemaError> {
        self.marks
            .get(name)
            .map(|kind| &**kind)
            .ok_or_else(|| SchemaError::UnknownKind(name.into()))
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn node_kinds(&self) -> impl Iterator<Item = &NodeKind> {
        self.nodes.values().map(|kind| &**kind)
    }

    pub fn mark_kinds(&self) -> impl Iterator<Item = &MarkKind> {
        self.marks.values().map(|kind| &**kind)
    }

    /// Parse rules of every kind, in registration order.
    pub fn parse_rules(&self) -> impl Iterator<Item = (KindRef<'_>, &ParseRule)> {
        self.parse_order.iter().flat_map(move |owner| {
            let (kind, rules) = match owner {
                RuleOwner::Node(name) => {
                    let kind = self.nodes.get(name);
                    (kind.map(|k| KindRef::Node(k)), kind.map(|k| k.parse.as_slice()))
                }
                RuleOwner::Mark(name) => {
                    let kind = self.marks.get(name);
                    (kind.map(|k| KindRef::Mark(k)), kind.map(|k| k.parse.as_slice()))
                }
            };
            kind.into_iter()
                .flat_map(move |kind| rules.unwrap_or_default().iter().map(move |rule| (kind, rule)))
        })
    }

    /// Whether `parent` admits a child of kind `child`.
    pub fn allows(&self, parent: &NodeKind, child: &NodeKind) -> bool {
        if child.name == ROOT {
            return false;
        }
        match &parent.content {
            ContentRule::Empty => false,
            ContentRule::Inline { nodes, .. } => {
                child.category == Category::Inline && nodes.permits(&child.name)
            }
            ContentRule::Blocks(allowed) => {
                child.category == Category::Block && allowed.permits(&child.name)
            }
        }
    }

    /// Whether marks `a` and `b` cannot share a text run.
    pub fn marks_exclusive(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        let excludes = |x: &str, y: &str| {
            self.marks
                .get(x)
                .is_some_and(|kind| kind.exclusive_with.contains(y))
        };
        excludes(a, b) || excludes(b, a)
    }

    pub fn create_node(
        &self,
        kind: &str,
        attrs: &Attrs,
        content: Vec<Child>,
    ) -> Result<Node, SchemaError> {
        let spec = self.node_kind(kind)?;
        let attrs = spec.resolve_attrs(attrs)?;
        Ok(Node::new(spec.name.clone(), attrs, content))
    }

    pub fn create_mark(&self, kind: &str, attrs: &Attrs) -> Result<Mark, SchemaError> {
        let spec = self.mark_kind(kind)?;
        let attrs = spec.resolve_attrs(attrs)?;
        Ok(Mark::new(spec.name.clone(), attrs))
    }

    /// An unmarked or marked text child. Conflicting marks resolve in
    /// iteration order, later ones winning.
    pub fn text(&self, text: impl Into<String>, marks: impl IntoIterator<Item = Mark>) -> Child {
        let set = marks
            .into_iter()
            .fold(MarkSet::new(), |set, mark| set.with(mark, self));
        Child::Text(TextRun::new(text, set))
    }

    /// An empty default textblock.
    pub fn empty_textblock(&self) -> Result<Node, SchemaError> {
        self.create_node(DEFAULT_TEXTBLOCK, &Attrs::new(), Vec::new())
    }
}
