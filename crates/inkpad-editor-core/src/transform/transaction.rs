use std::sync::Arc;

use super::step::Step;
use crate::error::StepError;
use crate::model::{Document, MarkSet, Position, Selection};
use crate::schema::Schema;

/// Committed editor state: document, selection and stored marks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    pub doc: Document,
    pub selection: Selection,
    /// Marks the next typed text picks up, set by toggling a mark at a caret.
    pub stored_marks: Option<MarkSet>,
}

impl EditorState {
    /// State with the caret at the start of `doc`.
    pub fn new(doc: Document, schema: &Schema) -> Self {
        let caret = doc
            .start(schema)
            .unwrap_or_else(|| Position::new(Vec::new(), 0));
        Self {
            doc,
            selection: Selection::collapsed(caret),
            stored_marks: None,
        }
    }
}

/// Where a committed change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeOrigin {
    Command,
    InputRule,
    Paste,
    Undo,
    Redo,
}

/// The atomic unit of change.
///
/// Steps apply to a private working copy; nothing is observable until the
/// session commits the finished transaction. Dropping a transaction
/// discards it.
#[derive(Debug, Clone)]
pub struct Transaction {
    schema: Arc<Schema>,
    before: EditorState,
    doc: Document,
    selection: Selection,
    stored_marks: Option<MarkSet>,
    steps: Vec<Step>,
    origin: ChangeOrigin,
    add_to_history: bool,
}

impl Transaction {
    pub fn new(state: &EditorState, schema: Arc<Schema>) -> Self {
        Self {
            schema,
            before: state.clone(),
            doc: state.doc.clone(),
            selection: state.selection.clone(),
            stored_marks: state.stored_marks.clone(),
            steps: Vec::new(),
            origin: ChangeOrigin::Command,
            add_to_history: true,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn schema_arc(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// State the transaction started from.
    pub fn before(&self) -> &EditorState {
        &self.before
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn stored_marks(&self) -> Option<&MarkSet> {
        self.stored_marks.as_ref()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn origin(&self) -> ChangeOrigin {
        self.origin
    }

    pub fn set_origin(&mut self, origin: ChangeOrigin) -> &mut Self {
        self.origin = origin;
        self
    }

    pub fn adds_to_history(&self) -> bool {
        self.add_to_history
    }

    pub fn set_add_to_history(&mut self, add: bool) -> &mut Self {
        self.add_to_history = add;
        self
    }

    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        if selection != self.selection {
            self.stored_marks = None;
        }
        self.selection = selection;
        self
    }

    pub fn set_caret(&mut self, at: Position) -> &mut Self {
        self.set_selection(Selection::collapsed(at))
    }

    pub fn set_stored_marks(&mut self, marks: Option<MarkSet>) -> &mut Self {
        self.stored_marks = marks;
        self
    }

    /// Apply a step to the working document.
    ///
    /// On error the working document is untouched. The selection is carried
    /// over by textblock ordinal; commands that move it set it afterwards.
    pub fn step(&mut self, step: Step) -> Result<&mut Self, StepError> {
        let mut root = self.doc.root().clone();
        step.apply(&mut root, &self.schema)?;
        let next = Document::new(root);
        let selection = Selection::new(
            self.map_position(&next, &self.selection.anchor),
            self.map_position(&next, &self.selection.head),
        );
        tracing::trace!(target: "inkpad::command", ?step, "applied step");
        self.doc = next;
        self.selection = selection;
        self.steps.push(step);
        Ok(self)
    }

    fn map_position(&self, next: &Document, pos: &Position) -> Position {
        let before = self.doc.textblocks(&self.schema);
        let after = next.textblocks(&self.schema);
        let ordinal = before.iter().position(|path| *path == pos.path);
        let path = match ordinal {
            Some(ordinal) => after.get(ordinal).or(after.last()).cloned(),
            None => after.first().cloned(),
        };
        match path {
            Some(path) => {
                let len = next.node_at(&path).map_or(0, |node| node.inline_len());
                Position::new(path, pos.offset.min(len))
            }
            None => pos.clone(),
        }
    }

    /// Finish into the state to commit. The selection is clamped to valid
    /// textblock positions.
    pub fn into_state(self) -> EditorState {
        let selection = self
            .doc
            .clamp_selection(&self.schema, &self.selection)
            .unwrap_or(self.selection);
        EditorState {
            doc: self.doc,
            selection,
            stored_marks: self.stored_marks,
        }
    }
}
