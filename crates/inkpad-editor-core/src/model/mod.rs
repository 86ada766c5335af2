//! Document model: nodes, marks, text runs, positions and read-only queries.

mod document;
pub mod inline;
mod node;
mod position;
pub mod query;

pub use document::Document;
pub use node::{Child, Mark, MarkSet, Node, TextRun};
pub use position::{Position, Selection};
pub use query::BlockRange;
