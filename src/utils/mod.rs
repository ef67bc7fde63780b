//! Generic utility primitives with zero domain knowledge.
//!
//! - `base_path` - Remote path joining utilities
//! - `command` - Captured command output
//! - `shell` - Shell escaping and quoting
//! - `template` - String template rendering

pub mod base_path;
pub mod command;
pub mod shell;
pub mod template;
