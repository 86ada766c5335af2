use serde::{Deserialize, Serialize};

/// A point inside a textblock: the child-index path from the root to the
/// textblock, plus an inline offset in chars.
///
/// Textblocks never nest, so comparing paths lexicographically and then
/// offsets gives document order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub path: Vec<usize>,
    pub offset: usize,
}

impl Position {
    pub fn new(path: impl Into<Vec<usize>>, offset: usize) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }
}

/// Selection with anchor and head positions.
///
/// The anchor is where the selection started, the head is where the cursor
/// is now. They may be in any order; use `start()` and `end()` for ordered
/// bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Position,
    pub head: Position,
}

impl Selection {
    pub fn new(anchor: Position, head: Position) -> Self {
        Self { anchor, head }
    }

    /// A collapsed selection (caret).
    pub fn collapsed(at: Position) -> Self {
        Self {
            anchor: at.clone(),
            head: at,
        }
    }

    pub fn start(&self) -> &Position {
        if self.head < self.anchor {
            &self.head
        } else {
            &self.anchor
        }
    }

    pub fn end(&self) -> &Position {
        if self.head < self.anchor {
            &self.anchor
        } else {
            &self.head
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    pub fn is_backwards(&self) -> bool {
        self.head < self.anchor
    }
}
