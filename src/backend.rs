use std::sync::Arc;

use tokio::sync::mpsc;

use crate::app::DisplayHunk;
use crate::diff::render::raw_hunk;
use crate::diff::{parse_unified_diff, DiffRenderer, FileDiff};
use crate::error::GitError;
use crate::models::StatusFile;
use crate::system::git::StagingGateway;

/// Identity of a hunk toggle, captured when the job is queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkTicket {
    pub index: usize,
    pub path: String,
    pub header: String,
    pub want_staged: bool,
}

/// Work requested by the UI loop.
#[derive(Debug)]
pub enum Job {
    LoadFiles {
        generation: u64,
        /// False after a hunk toggle: only the status letters need refreshing.
        reload_hunks: bool,
    },
    LoadHunks {
        generation: u64,
        file: StatusFile,
        width: Option<u16>,
    },
    ToggleHunk {
        ticket: HunkTicket,
        patch: String,
    },
    ToggleFile {
        paths: Vec<String>,
        want_staged: bool,
    },
    Quit,
}

/// Exactly one of these comes back for every job except `Quit`.
#[derive(Debug)]
pub enum JobResult {
    Files {
        generation: u64,
        reload_hunks: bool,
        result: Result<Vec<StatusFile>, GitError>,
    },
    Hunks {
        generation: u64,
        path: String,
        result: Result<Vec<DisplayHunk>, GitError>,
    },
    HunkToggled {
        ticket: HunkTicket,
        result: Result<(), GitError>,
    },
    FileToggled {
        want_staged: bool,
        result: Result<(), GitError>,
    },
}

/// Runs jobs off the UI loop. Each job gets its own task; results are sent
/// back in completion order, not submission order.
pub struct Worker {
    gateway: Arc<dyn StagingGateway>,
    renderer: Arc<dyn DiffRenderer>,
    color: bool,
    result_tx: mpsc::Sender<JobResult>,
}

impl Worker {
    pub fn new(
        gateway: Arc<dyn StagingGateway>,
        renderer: Arc<dyn DiffRenderer>,
        color: bool,
        result_tx: mpsc::Sender<JobResult>,
    ) -> Self {
        Self {
            gateway,
            renderer,
            color,
            result_tx,
        }
    }

    pub async fn run(self, mut job_rx: mpsc::Receiver<Job>) {
        while let Some(job) = job_rx.recv().await {
            if matches!(job, Job::Quit) {
                tracing::debug!("worker stopping");
                break;
            }

            let gateway = Arc::clone(&self.gateway);
            let renderer = Arc::clone(&self.renderer);
            let tx = self.result_tx.clone();
            let color = self.color;
            tokio::spawn(async move {
                let Some(result) = execute(job, gateway.as_ref(), renderer.as_ref(), color).await
                else {
                    return;
                };
                if tx.send(result).await.is_err() {
                    tracing::debug!("result dropped: UI loop has exited");
                }
            });
        }
    }
}

/// Run one job to completion.
pub async fn execute(
    job: Job,
    gateway: &dyn StagingGateway,
    renderer: &dyn DiffRenderer,
    color: bool,
) -> Option<JobResult> {
    let result = match job {
        Job::Quit => return None,
        Job::LoadFiles {
            generation,
            reload_hunks,
        } => JobResult::Files {
            generation,
            reload_hunks,
            result: gateway.status_files().await,
        },
        Job::LoadHunks {
            generation,
            file,
            width,
        } => JobResult::Hunks {
            generation,
            result: load_display_hunks(gateway, renderer, &file, color, width).await,
            path: file.path,
        },
        Job::ToggleHunk { ticket, patch } => {
            tracing::info!(path = %ticket.path, hunk = %ticket.header, staged = ticket.want_staged, "applying hunk");
            let result = if ticket.want_staged {
                gateway.stage_hunk(&patch).await
            } else {
                gateway.unstage_hunk(&patch).await
            };
            JobResult::HunkToggled { ticket, result }
        }
        Job::ToggleFile { paths, want_staged } => {
            tracing::info!(count = paths.len(), staged = want_staged, "toggling files");
            let result = if want_staged {
                gateway.stage(&paths).await
            } else {
                gateway.unstage(&paths).await
            };
            JobResult::FileToggled {
                want_staged,
                result,
            }
        }
    };
    Some(result)
}

/// Build the hunk sequence for one file: unstaged hunks, then staged hunks.
pub async fn load_display_hunks(
    gateway: &dyn StagingGateway,
    renderer: &dyn DiffRenderer,
    file: &StatusFile,
    color: bool,
    width: Option<u16>,
) -> Result<Vec<DisplayHunk>, GitError> {
    if file.is_untracked() {
        let raw = gateway.raw_new_file_diff(&file.path).await?;
        return Ok(render_batch(renderer, &raw, String::new(), false, color, width).await);
    }

    let (unstaged, staged) = tokio::join!(
        load_side(gateway, renderer, &file.path, false, color, width),
        load_side(gateway, renderer, &file.path, true, color, width),
    );

    let mut hunks = unstaged?;
    hunks.extend(staged?);
    Ok(hunks)
}

async fn load_side(
    gateway: &dyn StagingGateway,
    renderer: &dyn DiffRenderer,
    path: &str,
    staged: bool,
    color: bool,
    width: Option<u16>,
) -> Result<Vec<DisplayHunk>, GitError> {
    let raw = gateway.raw_unified_diff(staged, path).await?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let base = match gateway.base_content(staged, path).await {
        Ok(content) => content,
        // Newly added files have no HEAD side.
        Err(GitError::NotFound { .. }) => String::new(),
        Err(e) => return Err(e),
    };

    Ok(render_batch(renderer, &raw, base, staged, color, width).await)
}

async fn render_batch(
    renderer: &dyn DiffRenderer,
    raw: &str,
    base: String,
    origin_staged: bool,
    color: bool,
    width: Option<u16>,
) -> Vec<DisplayHunk> {
    let mut out = Vec::new();
    for file in parse_unified_diff(raw) {
        let file = Arc::new(file);
        let rendered = renderer
            .diff_hunks(&file.hunks, &file.path, &base, color, width)
            .await;
        out.extend(display_hunks(&file, rendered, origin_staged, color));
    }
    out
}

fn display_hunks(
    file: &Arc<FileDiff>,
    rendered: Vec<String>,
    origin_staged: bool,
    color: bool,
) -> Vec<DisplayHunk> {
    let mut rendered = rendered.into_iter();
    file.hunks
        .iter()
        .map(|hunk| DisplayHunk {
            file: Arc::clone(file),
            hunk: hunk.clone(),
            rendered: rendered.next().unwrap_or_else(|| raw_hunk(hunk, color)),
            origin_staged,
        })
        .collect()
}
