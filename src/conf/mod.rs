//! Validator configuration tree and its INFO-syntax reader.

pub mod info;
pub mod section;

pub use info::{parse_info, InfoParseError};
pub use section::{ConfigSection, SectionCursor, SectionError};
