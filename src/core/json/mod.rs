// ─── JSON ───
// Callback-driven scanner for launcher API responses. Never builds a tree.

mod parser;

pub use parser::{parse_json, JsonContext, JsonValue, JsonVisitor, OnValue, ParseOptions};
