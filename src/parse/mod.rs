pub mod due_parser;
pub mod modifier_parser;

pub use due_parser::{DueError, is_due, next_occurrence, parse_timezone, resolve_due};
pub use modifier_parser::ModifierParser;
