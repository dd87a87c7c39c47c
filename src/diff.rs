//! Unified-diff model, hunk patching, and the renderer backends.

pub mod difftastic;
pub mod fallback;
pub mod parse;
pub mod patch;
pub mod render;

pub use parse::parse_unified_diff;
pub use patch::apply_hunk;
pub use render::{select_renderer, DiffOpts, DiffRenderer, RendererChoice};

/// One `@@` block of a unified diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hunk {
    /// The verbatim `@@ ... @@` line, including any trailing section heading.
    pub header: String,
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    /// Body lines, each still carrying its `' '`, `'+'` or `'-'` marker.
    pub lines: Vec<String>,
}

/// All hunks of one file section, plus the header lines that precede them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiff {
    /// Everything before the first hunk header, newline-terminated.
    pub header: String,
    pub path: String,
    pub hunks: Vec<Hunk>,
}
