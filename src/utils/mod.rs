//! Utility modules for the page compiler.

pub mod date;
pub mod git;
pub mod log;
pub mod slug;
