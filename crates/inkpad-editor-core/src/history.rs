//! Undo/redo over committed transactions.
//!
//! Each entry records the state before and after one committed
//! transaction. Undo and redo move entries between the two stacks in LIFO
//! order; any other commit clears the redo stack.

use crate::transform::EditorState;

/// Undo/redo operations, mirroring what the session exposes.
pub trait UndoManager {
    fn can_undo(&self) -> bool;

    fn can_redo(&self) -> bool;

    /// Step back from `current`. Returns the state to restore.
    fn undo(&mut self, current: &EditorState) -> Option<EditorState>;

    /// Step forward from `current`. Returns the state to restore.
    fn redo(&mut self, current: &EditorState) -> Option<EditorState>;

    fn clear_history(&mut self);
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    before: EditorState,
    after: EditorState,
}

#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_steps: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

impl History {
    pub fn new(max_steps: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps: max_steps.max(1),
        }
    }

    /// Record a committed transaction.
    pub fn record(&mut self, before: EditorState, after: EditorState) {
        // Clear redo stack on new edit
        self.redo_stack.clear();
        self.undo_stack.push(HistoryEntry { before, after });

        while self.undo_stack.len() > self.max_steps {
            self.undo_stack.remove(0);
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
}

impl UndoManager for History {
    fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn undo(&mut self, current: &EditorState) -> Option<EditorState> {
        let entry = self.undo_stack.pop()?;
        let restored = entry.before.clone();
        // Redo returns to what was current, which may carry a newer selection.
        self.redo_stack.push(HistoryEntry {
            before: entry.before,
            after: EditorState {
                selection: current.selection.clone(),
                ..entry.after
            },
        });
        Some(restored)
    }

    fn redo(&mut self, current: &EditorState) -> Option<EditorState> {
        let entry = self.redo_stack.pop()?;
        let restored = entry.after.clone();
        self.undo_stack.push(HistoryEntry {
            before: EditorState {
                selection: current.selection.clone(),
                ..entry.before
            },
            after: entry.after,
        });
        Some(restored)
    }

    fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{doc_with, p, schema};

    fn state(text: &str) -> EditorState {
        let schema = schema();
        EditorState::new(doc_with(&schema, vec![p(&schema, text)]), &schema)
    }

    #[test]
    fn test_undo_redo_cycle() {
        let mut history = History::new(10);
        let (a, b) = (state("a"), state("ab"));
        history.record(a.clone(), b.clone());

        assert!(history.can_undo());
        assert_eq!(history.undo(&b).map(|s| s.doc), Some(a.doc.clone()));
        assert!(history.can_redo());
        assert_eq!(history.redo(&a).map(|s| s.doc), Some(b.doc));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut history = History::new(10);
        let (a, b, c) = (state("a"), state("ab"), state("ac"));
        history.record(a.clone(), b.clone());
        history.undo(&b);
        assert!(history.can_redo());

        history.record(a, c);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_max_steps() {
        let mut history = History::new(3);
        let states: Vec<_> = (0..6).map(|i| state(&"x".repeat(i + 1))).collect();
        for pair in states.windows(2) {
            history.record(pair[0].clone(), pair[1].clone());
        }
        assert_eq!(history.undo_depth(), 3);

        let mut current = states[5].clone();
        while let Some(previous) = history.undo(&current) {
            current = previous;
        }
        assert_eq!(current.doc, states[2].doc);
    }
}
