//! Renderer backed by the `difft` structural diff tool.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use super::patch::apply_hunk;
use super::render::{changed_files, git_diff_args, raw_hunk, DiffOpts, DiffRenderer};
use super::Hunk;
use crate::error::RenderError;
use crate::system::git::git_command;
use crate::system::process::run_diff_tool;

/// Path difftastic treats as "this side does not exist".
const NULL_PATH: &str = "/dev/null";

pub struct Difftastic {
    binary: PathBuf,
}

impl Difftastic {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    /// Range mode: let `git diff` drive difftastic through its external-diff hook.
    async fn diff_via_git(
        &self,
        repo_root: &Path,
        file: Option<&str>,
        opts: &DiffOpts,
    ) -> Result<String, RenderError> {
        let mut cmd = git_command(repo_root);
        cmd.args(git_diff_args(opts, file))
            .env("GIT_EXTERNAL_DIFF", &self.binary)
            .env("DFT_COLOR", if opts.color { "always" } else { "never" });
        run_diff_tool(&mut cmd, "git diff (difftastic)").await
    }

    /// Direct-pair mode for a single file at a fixed width.
    async fn diff_direct(
        &self,
        repo_root: &Path,
        file: &str,
        opts: &DiffOpts,
    ) -> Result<String, RenderError> {
        let scratch = scratch_dir()?;
        let old_dest = scratch.path().join("a").join(file);
        let new_dest = scratch.path().join("b").join(file);

        let (old, new) = match (&opts.base, &opts.target) {
            (Some(base), Some(target)) if !opts.staged => (
                show_or_null(repo_root, &format!("{base}:{file}"), &old_dest).await,
                show_or_null(repo_root, &format!("{target}:{file}"), &new_dest).await,
            ),
            (Some(base), None) if !opts.staged => (
                show_or_null(repo_root, &format!("{base}:{file}"), &old_dest).await,
                worktree_or_null(repo_root, file),
            ),
            _ if opts.staged => (
                show_or_null(repo_root, &format!("HEAD:{file}"), &old_dest).await,
                show_or_null(repo_root, &format!(":{file}"), &new_dest).await,
            ),
            _ => (
                show_or_null(repo_root, &format!(":{file}"), &old_dest).await,
                worktree_or_null(repo_root, file),
            ),
        };

        self.diff_pair(&old, &new, opts.color, opts.width).await
    }

    /// Direct-pair mode over every changed file, concatenated. Files that
    /// fail to render are skipped.
    async fn diff_all_direct(
        &self,
        repo_root: &Path,
        opts: &DiffOpts,
    ) -> Result<String, RenderError> {
        let names = changed_files(repo_root, opts, &[]).await?;

        let mut out = String::new();
        for file in &names {
            match self.diff_direct(repo_root, file, opts).await {
                Ok(rendered) => out.push_str(&rendered),
                Err(e) => tracing::debug!(file = %file, error = %e, "skipping file in full diff"),
            }
        }
        Ok(out)
    }

    /// Invoke difftastic side-by-side on two paths.
    async fn diff_pair(
        &self,
        old: &Path,
        new: &Path,
        color: bool,
        width: Option<u16>,
    ) -> Result<String, RenderError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(pair_args(color, width)).arg(old).arg(new);
        run_diff_tool(&mut cmd, "difftastic").await
    }

    #[allow(clippy::too_many_arguments)]
    async fn render_one_hunk(
        &self,
        scratch: &Path,
        index: usize,
        hunk: &Hunk,
        old: &Path,
        path: &str,
        base: &str,
        color: bool,
        width: Option<u16>,
    ) -> String {
        let new = scratch.join(format!("b{index}")).join(path);
        let applied = apply_hunk(base, hunk);

        let result = match write_file(&new, &applied).await {
            Ok(()) => self.diff_pair(old, &new, color, width).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(rendered) if !rendered.trim().is_empty() => rendered,
            Ok(_) => {
                tracing::debug!(path, hunk = %hunk.header, "difftastic produced no output");
                raw_hunk(hunk, false)
            }
            Err(e) => {
                tracing::warn!(path, hunk = %hunk.header, error = %e, "falling back to raw hunk");
                raw_hunk(hunk, false)
            }
        }
    }
}

#[async_trait::async_trait]
impl DiffRenderer for Difftastic {
    fn name(&self) -> &'static str {
        "difftastic"
    }

    async fn diff(
        &self,
        repo_root: &Path,
        file: Option<&str>,
        opts: &DiffOpts,
    ) -> Result<String, RenderError> {
        match (opts.width, file.filter(|f| !f.is_empty())) {
            (None, file) => self.diff_via_git(repo_root, file, opts).await,
            (Some(_), Some(file)) => self.diff_direct(repo_root, file, opts).await,
            (Some(_), None) => self.diff_all_direct(repo_root, opts).await,
        }
    }

    async fn diff_commit(
        &self,
        repo_root: &Path,
        base: &str,
        target: &str,
        color: bool,
        width: Option<u16>,
    ) -> Result<String, RenderError> {
        let range = format!("{base}..{target}");
        let names = run_diff_tool(
            git_command(repo_root).args(["diff", "--name-only", range.as_str()]),
            "git diff --name-only",
        )
        .await?;

        let scratch = scratch_dir()?;
        let mut out = String::new();
        for file in names.lines().filter(|l| !l.is_empty()) {
            let old = show_or_null(
                repo_root,
                &format!("{base}:{file}"),
                &scratch.path().join("a").join(file),
            )
            .await;
            let new = show_or_null(
                repo_root,
                &format!("{target}:{file}"),
                &scratch.path().join("b").join(file),
            )
            .await;
            match self.diff_pair(&old, &new, color, width).await {
                Ok(rendered) => out.push_str(&rendered),
                Err(e) => tracing::debug!(file, error = %e, "skipping file in commit diff"),
            }
        }
        Ok(out)
    }

    async fn diff_hunks(
        &self,
        hunks: &[Hunk],
        path: &str,
        base: &str,
        color: bool,
        width: Option<u16>,
    ) -> Vec<String> {
        let scratch = match scratch_dir() {
            Ok(dir) => dir,
            Err(e) => {
                tracing::warn!(path, error = %e, "no scratch space for hunk rendering");
                return hunks.iter().map(|h| raw_hunk(h, false)).collect();
            }
        };

        let old = if base.is_empty() {
            PathBuf::from(NULL_PATH)
        } else {
            let dest = scratch.path().join("a").join(path);
            match write_file(&dest, base).await {
                Ok(()) => dest,
                Err(e) => {
                    tracing::warn!(path, error = %e, "could not stage base content");
                    PathBuf::from(NULL_PATH)
                }
            }
        };

        // Pure-addition hunks ignore --width in difftastic; the UI hard-wraps.
        let renders = hunks.iter().enumerate().map(|(i, hunk)| {
            self.render_one_hunk(scratch.path(), i, hunk, &old, path, base, color, width)
        });
        futures::future::join_all(renders).await
    }
}

/// Flags for a direct difftastic invocation, before the two paths.
pub(crate) fn pair_args(color: bool, width: Option<u16>) -> Vec<String> {
    let mut args = vec!["--display".to_string(), "side-by-side".to_string()];
    if let Some(width) = width {
        args.push("--width".to_string());
        args.push(width.to_string());
    }
    args.push("--color".to_string());
    args.push(if color { "always" } else { "never" }.to_string());
    args
}

fn scratch_dir() -> Result<tempfile::TempDir, RenderError> {
    Ok(tempfile::Builder::new().prefix("rift-diff-").tempdir()?)
}

async fn write_file(dest: &Path, content: &str) -> Result<(), RenderError> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest, content).await?;
    Ok(())
}

/// Extract `spec` (`rev:path` or `:path`) into `dest`, or return the null
/// path when that side does not exist.
async fn show_or_null(repo_root: &Path, spec: &str, dest: &Path) -> PathBuf {
    let output = git_command(repo_root).args(["show", spec]).output().await;
    match output {
        Ok(o) if o.status.success() => match write_file(dest, &String::from_utf8_lossy(&o.stdout)).await {
            Ok(()) => dest.to_path_buf(),
            Err(e) => {
                tracing::debug!(spec, error = %e, "could not materialize side");
                PathBuf::from(NULL_PATH)
            }
        },
        _ => PathBuf::from(NULL_PATH),
    }
}

fn worktree_or_null(repo_root: &Path, file: &str) -> PathBuf {
    let path = repo_root.join(file);
    if path.exists() {
        path
    } else {
        PathBuf::from(NULL_PATH)
    }
}
