use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::GitError;
use crate::models::{FileStatus, StatusFile};
use crate::system::process::{run_with_stdin, DIFF_FOUND_EXIT_CODE};

/// A `git` command rooted at `repo_root`. Paths in its output are printed
/// verbatim so they match `status -z`.
pub fn git_command(repo_root: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.arg("-C")
        .arg(repo_root)
        .args(["-c", "core.quotePath=false"]);
    cmd
}

/// Repository operations the staging session depends on.
///
/// Every call completes its git invocation before returning; nothing is
/// cached between calls.
#[async_trait::async_trait]
pub trait StagingGateway: Send + Sync {
    fn root(&self) -> &Path;

    async fn stage(&self, paths: &[String]) -> Result<(), GitError>;
    async fn unstage(&self, paths: &[String]) -> Result<(), GitError>;

    /// Apply a single-hunk patch to the index.
    async fn stage_hunk(&self, patch: &str) -> Result<(), GitError>;
    /// Reverse-apply a single-hunk patch to the index.
    async fn unstage_hunk(&self, patch: &str) -> Result<(), GitError>;

    /// Changed paths, sorted by path.
    async fn status_files(&self) -> Result<Vec<StatusFile>, GitError>;

    /// Worktree vs index (`staged == false`) or index vs HEAD, without color.
    async fn raw_unified_diff(&self, staged: bool, path: &str) -> Result<String, GitError>;
    /// The whole file as additions, for untracked paths.
    async fn raw_new_file_diff(&self, path: &str) -> Result<String, GitError>;
    /// File content at the index (`staged == false`) or at HEAD.
    async fn base_content(&self, staged: bool, path: &str) -> Result<String, GitError>;
}

/// The real gateway, shelling out to `git`.
#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    /// Resolve the work tree containing `dir`.
    pub async fn open(dir: &Path) -> Result<Self, GitError> {
        let output = git_command(dir)
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .await
            .map_err(|e| GitError::RepositoryUnavailable(format!("cannot run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitError::RepositoryUnavailable(if stderr.is_empty() {
                format!("{} is not inside a git work tree", dir.display())
            } else {
                stderr
            }));
        }

        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::debug!(%root, "opened repository");
        Ok(Self {
            root: PathBuf::from(root),
        })
    }

    /// Run git and return stdout; any exit code outside `ok_codes` is an error.
    async fn run(&self, args: &[&str], ok_codes: &[i32]) -> Result<String, GitError> {
        let output = git_command(&self.root)
            .args(args)
            .output()
            .await
            .map_err(|e| command_error(args, e.to_string()))?;

        match output.status.code() {
            Some(code) if ok_codes.contains(&code) => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            _ => Err(command_error(
                args,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
        }
    }

    async fn apply_to_index(&self, patch: &str, reverse: bool) -> Result<(), GitError> {
        let mut args = vec!["apply", "--cached", "--unidiff-zero"];
        if reverse {
            args.push("--reverse");
        }
        args.push("-");

        let output = run_with_stdin(git_command(&self.root).args(&args), patch.as_bytes())
            .await
            .map_err(|e| command_error(&args, e.to_string()))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::info!(reverse, %stderr, "git apply rejected hunk");
            Err(GitError::PatchApply(stderr))
        }
    }

    async fn paths_command(&self, leading: &[&str], paths: &[String]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args: Vec<&str> = leading.to_vec();
        args.push("--");
        args.extend(paths.iter().map(String::as_str));
        self.run(&args, &[0]).await.map(|_| ())
    }
}

fn command_error(args: &[&str], message: String) -> GitError {
    GitError::Command {
        command: format!("git {}", args.join(" ")),
        message,
    }
}

#[async_trait::async_trait]
impl StagingGateway for GitRepo {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn stage(&self, paths: &[String]) -> Result<(), GitError> {
        self.paths_command(&["add"], paths).await
    }

    async fn unstage(&self, paths: &[String]) -> Result<(), GitError> {
        self.paths_command(&["restore", "--staged"], paths).await
    }

    async fn stage_hunk(&self, patch: &str) -> Result<(), GitError> {
        self.apply_to_index(patch, false).await
    }

    async fn unstage_hunk(&self, patch: &str) -> Result<(), GitError> {
        self.apply_to_index(patch, true).await
    }

    async fn status_files(&self) -> Result<Vec<StatusFile>, GitError> {
        let raw = self
            .run(
                &["status", "--porcelain=v1", "-z", "--untracked-files=all"],
                &[0],
            )
            .await?;
        Ok(parse_porcelain_status(&raw))
    }

    async fn raw_unified_diff(&self, staged: bool, path: &str) -> Result<String, GitError> {
        let mut args = vec!["diff", "--no-color", "--no-ext-diff"];
        if staged {
            args.push("--staged");
        }
        args.extend(["--", path]);
        self.run(&args, &[0]).await
    }

    async fn raw_new_file_diff(&self, path: &str) -> Result<String, GitError> {
        self.run(
            &[
                "diff",
                "--no-color",
                "--no-ext-diff",
                "--no-index",
                "--",
                "/dev/null",
                path,
            ],
            &[0, DIFF_FOUND_EXIT_CODE],
        )
        .await
    }

    async fn base_content(&self, staged: bool, path: &str) -> Result<String, GitError> {
        let (spec, stage) = if staged {
            (format!("HEAD:{path}"), "HEAD")
        } else {
            (format!(":{path}"), "index")
        };
        let output = git_command(&self.root)
            .args(["show", spec.as_str()])
            .output()
            .await
            .map_err(|e| command_error(&["show", spec.as_str()], e.to_string()))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(GitError::NotFound {
                path: path.to_string(),
                stage,
            })
        }
    }
}

/// Parse `git status --porcelain=v1 -z` output.
///
/// Renames and copies, on either side, carry their source path as an extra
/// NUL-separated field, which is skipped. Ignored entries are dropped.
pub fn parse_porcelain_status(raw: &str) -> Vec<StatusFile> {
    let mut files = Vec::new();
    let mut fields = raw.split('\0');

    while let Some(entry) = fields.next() {
        let mut chars = entry.chars();
        let (Some(x), Some(y), Some(' ')) = (chars.next(), chars.next(), chars.next()) else {
            continue;
        };
        let path = chars.as_str();
        if path.is_empty() || x == '!' {
            continue;
        }
        if matches!(x, 'R' | 'C') || matches!(y, 'R' | 'C') {
            fields.next();
        }
        files.push(StatusFile {
            path: path.to_string(),
            staged: FileStatus::from_code(x),
            worktree: FileStatus::from_code(y),
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}
