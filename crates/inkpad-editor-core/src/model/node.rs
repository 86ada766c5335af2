use serde::Serialize;
use smol_str::SmolStr;

use crate::error::{SchemaError, StepError};
use crate::schema::{AttrValue, Attrs, ContentRule, Schema};

/// An applied mark: kind plus resolved attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Mark {
    kind: SmolStr,
    attrs: Attrs,
}

impl Mark {
    pub(crate) fn new(kind: SmolStr, attrs: Attrs) -> Self {
        Self { kind, attrs }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// Kind matches and every attribute in `filter` has the same value.
    pub fn matches(&self, kind: &str, filter: &Attrs) -> bool {
        self.kind == kind && filter.iter().all(|(k, v)| self.attrs.get(k) == Some(v))
    }
}

/// The marks on a text run, at most one per kind, ordered by kind name.
///
/// The ordering is what makes mark wrapping in exported HTML stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct MarkSet(Vec<Mark>);

impl MarkSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mark> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, kind: &str) -> Option<&Mark> {
        self.0.iter().find(|mark| mark.kind == kind)
    }

    pub fn has(&self, kind: &str) -> bool {
        self.get(kind).is_some()
    }

    pub fn contains(&self, mark: &Mark) -> bool {
        self.0.contains(mark)
    }

    pub fn contains_matching(&self, kind: &str, filter: &Attrs) -> bool {
        self.0.iter().any(|mark| mark.matches(kind, filter))
    }

    /// Add `mark`, dropping any mark it is exclusive with.
    pub fn with(mut self, mark: Mark, schema: &Schema) -> Self {
        self.0
            .retain(|existing| !schema.marks_exclusive(&existing.kind, &mark.kind));
        let at = self
            .0
            .partition_point(|existing| existing.kind < mark.kind);
        self.0.insert(at, mark);
        self
    }

    pub fn without(mut self, kind: &str) -> Self {
        self.0.retain(|mark| mark.kind != kind);
        self
    }
}

impl<'a> IntoIterator for &'a MarkSet {
    type Item = &'a Mark;
    type IntoIter = std::slice::Iter<'a, Mark>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A run of text sharing one mark set. Never empty inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TextRun {
    pub(crate) text: String,
    pub(crate) marks: MarkSet,
}

impl TextRun {
    pub fn new(text: impl Into<String>, marks: MarkSet) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A child slot: either a text run or a nested node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Child {
    Text(TextRun),
    Node(Node),
}

impl Child {
    /// Width in inline positions. Inline nodes count as one.
    pub fn inline_len(&self) -> usize {
        match self {
            Self::Text(run) => run.char_len(),
            Self::Node(_) => 1,
        }
    }

    pub fn as_text(&self) -> Option<&TextRun> {
        match self {
            Self::Text(run) => Some(run),
            Self::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            Self::Text(_) => None,
        }
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<TextRun> for Child {
    fn from(run: TextRun) -> Self {
        Self::Text(run)
    }
}

/// A node instance. Create through [`Schema::create_node`] so attributes
/// are resolved against their declarations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Node {
    kind: SmolStr,
    attrs: Attrs,
    content: Vec<Child>,
}

impl Node {
    pub(crate) fn new(kind: SmolStr, attrs: Attrs, content: Vec<Child>) -> Self {
        Self {
            kind,
            attrs,
            content,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn kind_name(&self) -> &SmolStr {
        &self.kind
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn content(&self) -> &[Child] {
        &self.content
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    pub fn child_node(&self, index: usize) -> Option<&Node> {
        self.content.get(index).and_then(Child::as_node)
    }

    /// Nested nodes, skipping text runs.
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.content.iter().filter_map(Child::as_node)
    }

    pub(crate) fn content_mut(&mut self) -> &mut Vec<Child> {
        &mut self.content
    }

    pub(crate) fn into_content(self) -> Vec<Child> {
        self.content
    }

    pub(crate) fn set_markup(&mut self, kind: SmolStr, attrs: Attrs) {
        self.kind = kind;
        self.attrs = attrs;
    }

    pub(crate) fn set_attrs(&mut self, attrs: Attrs) {
        self.attrs = attrs;
    }

    /// Same kind and attributes, different content.
    pub fn with_content(&self, content: Vec<Child>) -> Self {
        Self {
            kind: self.kind.clone(),
            attrs: self.attrs.clone(),
            content,
        }
    }

    pub fn matches(&self, kind: &str, filter: &Attrs) -> bool {
        self.kind == kind && filter.iter().all(|(k, v)| self.attrs.get(k) == Some(v))
    }

    /// Inline width of the content, for textblocks.
    pub fn inline_len(&self) -> usize {
        self.content.iter().map(Child::inline_len).sum()
    }

    /// Concatenated text of every run below this node.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.content {
            match child {
                Child::Text(run) => out.push_str(&run.text),
                Child::Node(node) => node.collect_text(out),
            }
        }
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => self.child_node(*first)?.node_at(rest),
        }
    }

    pub(crate) fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => match self.content.get_mut(*first)? {
                Child::Node(node) => node.node_at_mut(rest),
                Child::Text(_) => None,
            },
        }
    }

    /// Validate this subtree against the schema.
    pub fn check(&self, schema: &Schema) -> Result<(), StepError> {
        let kind = schema.node_kind(&self.kind)?;
        let resolved = kind.resolve_attrs(&self.attrs)?;
        if let Some(missing) = resolved.keys().find(|name| !self.attrs.contains_key(*name)) {
            return Err(SchemaError::MissingAttr {
                kind: self.kind.clone(),
                attr: missing.clone(),
            }
            .into());
        }

        match &kind.content {
            ContentRule::Empty => {
                if let Some(first) = self.content.first() {
                    return Err(StepError::InvalidChild {
                        parent: self.kind.clone(),
                        child: child_name(first),
                    });
                }
            }
            ContentRule::Inline { marks, .. } => {
                let mut previous: Option<&MarkSet> = None;
                for child in &self.content {
                    match child {
                        Child::Text(run) => {
                            if run.text.is_empty() {
                                return Err(StepError::EmptyText);
                            }
                            if !marks && !run.marks.is_empty() {
                                return Err(StepError::MarksNotAllowed(self.kind.clone()));
                            }
                            if *marks && run.text.contains('\n') {
                                return Err(StepError::NewlineInRichText(self.kind.clone()));
                            }
                            for mark in &run.marks {
                                schema.mark_kind(&mark.kind)?.resolve_attrs(&mark.attrs)?;
                            }
                            if previous == Some(&run.marks) {
                                return Err(StepError::Fragmented);
                            }
                            previous = Some(&run.marks);
                        }
                        Child::Node(node) => {
                            self.check_child(schema, kind, node)?;
                            previous = None;
                        }
                    }
                }
            }
            ContentRule::Blocks(_) => {
                if self.content.is_empty() {
                    return Err(StepError::EmptyContent(self.kind.clone()));
                }
                for child in &self.content {
                    match child {
                        Child::Text(_) => return Err(StepError::TextNotAllowed(self.kind.clone())),
                        Child::Node(node) => self.check_child(schema, kind, node)?,
                    }
                }
            }
        }
        Ok(())
    }

    fn check_child(
        &self,
        schema: &Schema,
        kind: &crate::schema::NodeKind,
        child: &Node,
    ) -> Result<(), StepError> {
        let child_kind = schema.node_kind(&child.kind)?;
        if !schema.allows(kind, child_kind) {
            return Err(StepError::InvalidChild {
                parent: self.kind.clone(),
                child: child.kind.clone(),
            });
        }
        child.check(schema)
    }
}

fn child_name(child: &Child) -> SmolStr {
    match child {
        Child::Text(_) => "text".into(),
        Child::Node(node) => node.kind.clone(),
    }
}
