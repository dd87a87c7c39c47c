//! Native `git diff` renderer, used when difftastic is unavailable.

use std::path::Path;

use super::render::{commit_diff_args, git_diff_args, raw_hunk, DiffOpts, DiffRenderer};
use super::Hunk;
use crate::error::RenderError;
use crate::system::git::git_command;
use crate::system::process::run_diff_tool;

pub struct PlainDiff;

#[async_trait::async_trait]
impl DiffRenderer for PlainDiff {
    fn name(&self) -> &'static str {
        "git-diff"
    }

    async fn diff(
        &self,
        repo_root: &Path,
        file: Option<&str>,
        opts: &DiffOpts,
    ) -> Result<String, RenderError> {
        let mut args = git_diff_args(opts, file);
        // A user-configured external diff would defeat the line-based fallback.
        args.insert(1, "--no-ext-diff".to_string());
        run_diff_tool(git_command(repo_root).args(&args), "git diff").await
    }

    async fn diff_commit(
        &self,
        repo_root: &Path,
        base: &str,
        target: &str,
        color: bool,
        _width: Option<u16>,
    ) -> Result<String, RenderError> {
        let mut args = commit_diff_args(base, target, color);
        args.insert(1, "--no-ext-diff".to_string());
        run_diff_tool(git_command(repo_root).args(&args), "git diff").await
    }

    async fn diff_hunks(
        &self,
        hunks: &[Hunk],
        _path: &str,
        _base: &str,
        color: bool,
        _width: Option<u16>,
    ) -> Vec<String> {
        hunks.iter().map(|h| raw_hunk(h, color)).collect()
    }
}
