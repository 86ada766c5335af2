//! Declarative HTML parse and render rules attached to schema kinds.
//!
//! Rules are plain data so that kind definitions can be compared for
//! idempotent registration and so that import/export stay symmetric.

use smol_str::SmolStr;

use super::attrs::AttrValue;

/// A condition an element must satisfy in addition to its tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Has this class token.
    Class(SmolStr),
    /// Has this attribute, any value.
    HasAttr(SmolStr),
    /// Attribute equals the value exactly.
    AttrEquals(SmolStr, SmolStr),
    /// Does not carry this attribute.
    LacksAttr(SmolStr),
    /// Inline `style` declares this property.
    HasStyle(SmolStr),
}

/// Tag plus conditions. Tag names compare ASCII case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub tag: SmolStr,
    pub conditions: Vec<Condition>,
}

impl Selector {
    pub fn tag(tag: impl Into<SmolStr>) -> Self {
        Self {
            tag: tag.into(),
            conditions: Vec::new(),
        }
    }

    pub fn with(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn class(self, class: impl Into<SmolStr>) -> Self {
        self.with(Condition::Class(class.into()))
    }
}

/// Where an attribute value comes from when importing an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrSource {
    /// Value of an HTML attribute.
    Attribute(SmolStr),
    /// `true` when the HTML attribute is present, `false` otherwise.
    Flag(SmolStr),
    /// A property in the inline `style` attribute.
    Style(SmolStr),
    /// Remainder of the first class token starting with the prefix.
    ClassPrefix(SmolStr),
    /// Trailing digit of the tag name (`h3` gives 3).
    TagLevel,
    /// Text content of the first child element with this tag.
    ChildText(SmolStr),
    /// Class prefix looked up on the first child element with this tag.
    ChildClassPrefix { tag: SmolStr, prefix: SmolStr },
    /// A fixed value.
    Value(AttrValue),
}

/// How the children of a matched element become node content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseContent {
    /// Parse the element's children normally.
    Children,
    /// Parse the children of the first descendant matching `selector`. When
    /// there is none, parse the element's own children minus `skip` matches.
    Inner {
        selector: Selector,
        skip: Vec<Selector>,
    },
    /// Collect raw text (with `<br>` as newlines), dropping all markup.
    Text,
    /// The element's children carry no document content.
    Ignore,
}

/// Recognises an HTML element as a node or mark of the owning kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRule {
    pub selector: Selector,
    pub attrs: Vec<(SmolStr, AttrSource)>,
    pub content: ParseContent,
}

impl ParseRule {
    pub fn tag(tag: impl Into<SmolStr>) -> Self {
        Self::new(Selector::tag(tag))
    }

    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            attrs: Vec::new(),
            content: ParseContent::Children,
        }
    }

    pub fn attr(mut self, name: impl Into<SmolStr>, source: AttrSource) -> Self {
        self.attrs.push((name.into(), source));
        self
    }

    pub fn content(mut self, content: ParseContent) -> Self {
        self.content = content;
        self
    }
}

/// Tag emitted for a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagSpec {
    Fixed(SmolStr),
    /// `prefix` followed by the integer attribute, as in `h` + level.
    Leveled { prefix: SmolStr, attr: SmolStr },
}

/// How a node or mark attribute shows up in emitted HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrTarget {
    Attribute(SmolStr),
    /// Valueless boolean attribute, present when true.
    Flag(SmolStr),
    Style(SmolStr),
    /// Appended to the class list as `prefix` + value.
    Class(SmolStr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrOutput {
    pub attr: SmolStr,
    pub target: AttrTarget,
    /// Skip emission when the value equals the declared default.
    pub omit_default: bool,
}

impl AttrOutput {
    pub fn new(attr: impl Into<SmolStr>, target: AttrTarget) -> Self {
        Self {
            attr: attr.into(),
            target,
            omit_default: false,
        }
    }

    pub fn omit_default(mut self) -> Self {
        self.omit_default = true;
        self
    }
}

/// Shape of the emitted element around the node's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// Children only, no element of its own. Used by the root.
    Fragment,
    /// `<tag>children</tag>`
    Container,
    /// `<tag>` with no children or closing tag.
    Void,
    /// `<tag><inner>children</inner></tag>`
    Nested {
        tag: SmolStr,
        attrs: Vec<AttrOutput>,
    },
    /// `<tag><summary>title</summary><body>children</body></tag>`
    Titled {
        summary_tag: SmolStr,
        summary_class: Option<SmolStr>,
        title_attr: SmolStr,
        body_tag: SmolStr,
        body_class: Option<SmolStr>,
    },
    /// Wrapper carrying the attributes; the body is supplied by a node view.
    Opaque,
}

/// Produces the HTML for a node or mark of the owning kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRule {
    pub tag: TagSpec,
    pub class: Option<SmolStr>,
    pub static_attrs: Vec<(SmolStr, SmolStr)>,
    pub attrs: Vec<AttrOutput>,
    pub layout: Layout,
}

impl RenderRule {
    pub fn container(tag: impl Into<SmolStr>) -> Self {
        Self::with_layout(TagSpec::Fixed(tag.into()), Layout::Container)
    }

    pub fn void(tag: impl Into<SmolStr>) -> Self {
        Self::with_layout(TagSpec::Fixed(tag.into()), Layout::Void)
    }

    pub fn fragment() -> Self {
        Self::with_layout(TagSpec::Fixed(SmolStr::default()), Layout::Fragment)
    }

    pub fn with_layout(tag: TagSpec, layout: Layout) -> Self {
        Self {
            tag,
            class: None,
            static_attrs: Vec::new(),
            attrs: Vec::new(),
            layout,
        }
    }

    pub fn class(mut self, class: impl Into<SmolStr>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn static_attr(mut self, name: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.static_attrs.push((name.into(), value.into()));
        self
    }

    pub fn attr(mut self, output: AttrOutput) -> Self {
        self.attrs.push(output);
        self
    }
}
