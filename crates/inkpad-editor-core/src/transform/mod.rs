//! Transactions and the primitive steps they are built from.

mod step;
mod transaction;

pub use step::Step;
pub(crate) use step::conform_inline;
pub use transaction::{ChangeOrigin, EditorState, Transaction};
