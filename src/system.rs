//! Thin wrappers over the git CLI and child processes.

pub mod git;
pub mod process;
