//! HTML import and export.
//!
//! Export followed by import yields an equal document, for every document
//! the schema accepts (whitespace-only text edges aside, see [`parser`]).

mod parser;
mod writer;

pub use parser::{ImportReport, ParsedHtml, from_html, parse_fragment};
pub use writer::{OpaqueBodies, OpaqueBody, RENDER_STATE_ATTR, to_html, to_html_with_views};
