use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::difftastic::Difftastic;
use super::fallback::PlainDiff;
use super::Hunk;
use crate::error::RenderError;
use crate::system::git::git_command;
use crate::system::process::{find_executable, run_diff_tool};

/// Which stages or refs a range-mode diff compares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOpts {
    /// Index vs HEAD instead of worktree vs index.
    pub staged: bool,
    pub base: Option<String>,
    pub target: Option<String>,
    pub color: bool,
    /// Fixed output width. `None` selects range mode.
    pub width: Option<u16>,
}

/// A diff rendering backend, chosen once at startup and shared by reference.
#[async_trait::async_trait]
pub trait DiffRenderer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Render the changes for one file, or every changed file when `file` is `None`.
    async fn diff(
        &self,
        repo_root: &Path,
        file: Option<&str>,
        opts: &DiffOpts,
    ) -> Result<String, RenderError>;

    /// Render every file changed between two commits.
    async fn diff_commit(
        &self,
        repo_root: &Path,
        base: &str,
        target: &str,
        color: bool,
        width: Option<u16>,
    ) -> Result<String, RenderError>;

    /// Render each hunk independently against `base`, one string per hunk.
    /// Never fails: a hunk that cannot be rendered falls back to its raw text.
    async fn diff_hunks(
        &self,
        hunks: &[Hunk],
        path: &str,
        base: &str,
        color: bool,
        width: Option<u16>,
    ) -> Vec<String>;
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RendererChoice {
    /// Difftastic when installed, plain git diff otherwise.
    #[default]
    Auto,
    Difftastic,
    Plain,
}

/// Probe for difftastic and pick the backend.
pub fn select_renderer(choice: RendererChoice, difft_path: Option<&Path>) -> Arc<dyn DiffRenderer> {
    if choice == RendererChoice::Plain {
        return Arc::new(PlainDiff);
    }

    let located = difft_path
        .filter(|p| p.is_file())
        .map(Path::to_path_buf)
        .or_else(|| find_executable("difft"));

    match located {
        Some(path) => {
            tracing::debug!(path = %path.display(), "using difftastic renderer");
            Arc::new(Difftastic::new(path))
        }
        None => {
            if choice == RendererChoice::Difftastic {
                tracing::warn!("difftastic requested but not found; using git diff");
            }
            Arc::new(PlainDiff)
        }
    }
}

/// Arguments for a range-mode `git diff`.
pub(crate) fn git_diff_args(opts: &DiffOpts, file: Option<&str>) -> Vec<String> {
    let mut args = vec!["diff".to_string(), color_flag(opts.color).to_string()];
    if opts.staged {
        args.push("--staged".to_string());
    } else {
        args.extend(opts.base.iter().cloned());
        if opts.base.is_some() {
            args.extend(opts.target.iter().cloned());
        }
    }
    if let Some(file) = file.filter(|f| !f.is_empty()) {
        args.push("--".to_string());
        args.push(file.to_string());
    }
    args
}

/// `git diff --name-only` with the same selectors as [`git_diff_args`],
/// limited to `paths` when any are given.
pub(crate) fn name_only_args(opts: &DiffOpts, paths: &[String]) -> Vec<String> {
    let mut args = git_diff_args(opts, None);
    args[1] = "--name-only".to_string();
    if !paths.is_empty() {
        args.push("--".to_string());
        args.extend(paths.iter().cloned());
    }
    args
}

/// Paths a range-mode diff would cover, in git's order.
pub async fn changed_files(
    repo_root: &Path,
    opts: &DiffOpts,
    paths: &[String],
) -> Result<Vec<String>, RenderError> {
    let names = run_diff_tool(
        git_command(repo_root).args(name_only_args(opts, paths)),
        "git diff --name-only",
    )
    .await?;
    Ok(names
        .lines()
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Arguments for `git diff base..target`.
pub(crate) fn commit_diff_args(base: &str, target: &str, color: bool) -> Vec<String> {
    vec![
        "diff".to_string(),
        color_flag(color).to_string(),
        format!("{base}..{target}"),
    ]
}

fn color_flag(color: bool) -> &'static str {
    if color {
        "--color=always"
    } else {
        "--color=never"
    }
}

const CYAN: &str = "\x1b[36m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// The hunk's own header and body, optionally colored by line marker.
pub fn raw_hunk(hunk: &Hunk, color: bool) -> String {
    if !color {
        return format!("{}\n{}", hunk.header, hunk.lines.join("\n"));
    }

    let mut out = format!("{CYAN}{}{RESET}", hunk.header);
    for line in &hunk.lines {
        out.push('\n');
        match line.as_bytes().first() {
            Some(b'+') => out.push_str(&format!("{GREEN}{line}{RESET}")),
            Some(b'-') => out.push_str(&format!("{RED}{line}{RESET}")),
            _ => out.push_str(line),
        }
    }
    out
}
