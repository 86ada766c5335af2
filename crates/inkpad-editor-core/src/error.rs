//! Error taxonomy for the engine.
//!
//! Only [`SchemaError`] is fatal. Rejections, degraded imports and render
//! failures are contained where they happen.

use miette::Diagnostic;
use smol_str::SmolStr;

use crate::schema::{AttrType, AttrValue};

/// Programmer error in schema setup or command construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Diagnostic)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("kind `{0}` is already registered with a different definition")]
    #[diagnostic(code(inkpad::schema::duplicate_kind))]
    DuplicateKind(SmolStr),

    #[error("kind `{kind}` refers to `{reference}`, which is not registered")]
    #[diagnostic(
        code(inkpad::schema::invalid_schema),
        help("register child kinds before the kinds that contain them")
    )]
    InvalidSchema { kind: SmolStr, reference: SmolStr },

    #[error("unknown kind `{0}`")]
    #[diagnostic(code(inkpad::schema::unknown_kind))]
    UnknownKind(SmolStr),

    #[error("`{kind}` has no attribute `{attr}`")]
    #[diagnostic(code(inkpad::schema::unknown_attr))]
    UnknownAttr { kind: SmolStr, attr: SmolStr },

    #[error("attribute `{attr}` of `{kind}` expects {expected}, got {found}")]
    #[diagnostic(code(inkpad::schema::attr_type))]
    AttrType {
        kind: SmolStr,
        attr: SmolStr,
        expected: AttrType,
        found: AttrValue,
    },

    #[error("attribute `{attr}` of `{kind}` must be between {min} and {max}, got {found}")]
    #[diagnostic(code(inkpad::schema::attr_range))]
    AttrOutOfRange {
        kind: SmolStr,
        attr: SmolStr,
        min: i64,
        max: i64,
        found: AttrValue,
    },

    #[error("`{kind}` requires attribute `{attr}`")]
    #[diagnostic(code(inkpad::schema::missing_attr))]
    MissingAttr { kind: SmolStr, attr: SmolStr },

    #[error("no command registered as `{0}`")]
    #[diagnostic(code(inkpad::schema::unknown_command))]
    UnknownCommand(SmolStr),

    #[error("unknown extension `{0}`")]
    #[diagnostic(
        code(inkpad::schema::unknown_extension),
        help("check the `extensions` list in the editor config")
    )]
    UnknownExtension(SmolStr),

    #[error("extension `{0}` is registered twice")]
    #[diagnostic(code(inkpad::schema::duplicate_extension))]
    DuplicateExtension(SmolStr),

    #[error("invalid key combination `{0}`")]
    #[diagnostic(code(inkpad::schema::invalid_shortcut))]
    InvalidShortcut(SmolStr),

    #[error("schema has no `{0}` kind")]
    #[diagnostic(
        code(inkpad::schema::missing_kind),
        help("enable the `starter_kit` extension")
    )]
    MissingRequiredKind(SmolStr),
}

/// Structural violation found while applying a primitive step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StepError {
    #[error("no node at path {0:?}")]
    InvalidPath(Vec<usize>),

    #[error("offset {offset} is outside `{kind}` content of length {len}")]
    InvalidOffset {
        kind: SmolStr,
        offset: usize,
        len: usize,
    },

    #[error("`{0}` is not a textblock")]
    NotTextblock(SmolStr),

    #[error("`{parent}` cannot contain `{child}`")]
    InvalidChild { parent: SmolStr, child: SmolStr },

    #[error("`{0}` cannot contain text")]
    TextNotAllowed(SmolStr),

    #[error("`{0}` does not allow marks")]
    MarksNotAllowed(SmolStr),

    #[error("`{0}` holds line breaks as nodes, not newline characters")]
    NewlineInRichText(SmolStr),

    #[error("`{0}` must not be empty")]
    EmptyContent(SmolStr),

    #[error("text runs must not be empty")]
    EmptyText,

    #[error("adjacent text runs with identical marks must be merged")]
    Fragmented,

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Why a command did not apply. Expected and non-fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Rejection {
    #[error("selection is not inside a table")]
    NotInTable,

    #[error("no table cell in that direction")]
    NoAdjacentCell,

    #[error("selection contains no text that can carry `{0}`")]
    NothingToMark(SmolStr),

    #[error("`{0}` cannot be placed here")]
    NotAllowedHere(SmolStr),

    #[error("no `{0}` at the selection")]
    NotFound(SmolStr),

    #[error("nothing to insert")]
    EmptyInsert,

    #[error("selection is empty")]
    EmptySelection,

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("history commands cannot be chained with other commands")]
    HistoryInChain,

    #[error("chain has no commands")]
    EmptyChain,

    #[error("the editor session has been destroyed")]
    Destroyed,

    #[error("invalid document structure: {0}")]
    InvalidStructure(StepError),
}

/// Outcome of a failed command inside the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("command rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl CommandError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

impl From<StepError> for CommandError {
    fn from(err: StepError) -> Self {
        match err {
            StepError::Schema(err) => Self::Schema(err),
            other => Self::Rejected(Rejection::InvalidStructure(other)),
        }
    }
}

/// Markup the HTML importer could not map onto the schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ImportDegraded {
    #[error("dropped unknown element <{tag}>")]
    UnknownElement { tag: SmolStr },

    #[error("`{kind}` is not allowed inside `{parent}`; flattened")]
    Misplaced { kind: SmolStr, parent: SmolStr },

    #[error("dropped inline content that `{parent}` cannot hold")]
    DroppedInline { parent: SmolStr },

    #[error("<{tag}> does not make a valid `{kind}`: {error}")]
    InvalidAttrs {
        tag: SmolStr,
        kind: SmolStr,
        error: SchemaError,
    },

    #[error("dropped empty `{kind}`")]
    EmptyContainer { kind: SmolStr },

    #[error("removed formatting that `{parent}` cannot hold")]
    MarksStripped { parent: SmolStr },
}

/// A node-view renderer failed. Scoped to the one node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
    #[error("{0}")]
    Failed(String),

    #[error("renderer panicked")]
    Panicked,
}

/// The persistence collaborator failed to store a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to save: {0}")]
pub struct PersistError(pub String);
