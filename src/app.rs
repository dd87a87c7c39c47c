use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use crate::backend::{HunkTicket, Job, JobResult};
use crate::diff::{FileDiff, Hunk};
use crate::error::GitError;
use crate::models::StatusFile;
use crate::ui::{build_hunk_layout, HunkLayout};

/// Width used for layout before the first frame reports the real one.
const DEFAULT_DIFF_WIDTH: u16 = 80;

/// Rows moved per mouse-wheel notch.
const WHEEL_STEP: usize = 3;

/// One entry of the session's hunk sequence.
#[derive(Debug, Clone)]
pub struct DisplayHunk {
    pub file: Arc<FileDiff>,
    pub hunk: Hunk,
    pub rendered: String,
    /// Whether the hunk came from the index-vs-HEAD diff. Flipped in place
    /// by a successful toggle.
    pub origin_staged: bool,
}

impl DisplayHunk {
    /// Standalone patch for this hunk alone.
    pub fn patch(&self) -> String {
        self.hunk.patch(&self.file.header)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Files,
    Hunks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Mutating,
}

#[derive(Debug, PartialEq, Eq)]
enum Mutation {
    Hunk(HunkTicket),
    Files,
}

/// The interactive staging session.
///
/// Synchronous: every git or renderer call is queued as a [`Job`] and its
/// [`JobResult`] is folded in by [`StageApp::poll_results`], so all state
/// changes happen on the UI loop in order.
pub struct StageApp {
    pub files: Vec<StatusFile>,
    pub selected_file: usize,
    pub selected_hunk: usize,
    pub focus: Pane,
    /// First visible row of the diff pane.
    pub scroll: usize,
    pub status_message: Option<String>,
    pub should_quit: bool,
    pub needs_redraw: bool,

    hunks: Vec<DisplayHunk>,
    hunks_path: Option<String>,
    layout: HunkLayout,
    viewport_width: Option<u16>,
    viewport_height: u16,

    generation: u64,
    pending_files: Option<u64>,
    pending_hunks: Option<(u64, String)>,
    pending_mutation: Option<Mutation>,

    renderer_name: &'static str,
    job_tx: mpsc::Sender<Job>,
    result_rx: mpsc::Receiver<JobResult>,
}

impl StageApp {
    pub fn new(
        job_tx: mpsc::Sender<Job>,
        result_rx: mpsc::Receiver<JobResult>,
        renderer_name: &'static str,
    ) -> Self {
        Self {
            files: Vec::new(),
            selected_file: 0,
            selected_hunk: 0,
            focus: Pane::Files,
            scroll: 0,
            status_message: None,
            should_quit: false,
            needs_redraw: true,
            hunks: Vec::new(),
            hunks_path: None,
            layout: HunkLayout::default(),
            viewport_width: None,
            viewport_height: 0,
            generation: 0,
            pending_files: None,
            pending_hunks: None,
            pending_mutation: None,
            renderer_name,
            job_tx,
            result_rx,
        }
    }

    pub fn hunks(&self) -> &[DisplayHunk] {
        &self.hunks
    }

    /// Path the current hunk sequence belongs to.
    pub fn hunks_path(&self) -> Option<&str> {
        self.hunks_path.as_deref()
    }

    pub fn layout(&self) -> &HunkLayout {
        &self.layout
    }

    pub fn renderer_name(&self) -> &'static str {
        self.renderer_name
    }

    pub fn phase(&self) -> Phase {
        if self.pending_mutation.is_some() {
            Phase::Mutating
        } else if self.pending_files.is_some() || self.pending_hunks.is_some() {
            Phase::Loading
        } else {
            Phase::Idle
        }
    }

    pub fn selected_path(&self) -> Option<&str> {
        self.files.get(self.selected_file).map(|f| f.path.as_str())
    }

    fn queue(&mut self, job: Job) {
        match self.job_tx.try_send(job) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(job)) => {
                let tx = self.job_tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(job).await;
                });
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.status_message = Some("Worker disconnected".to_string());
                self.should_quit = true;
            }
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn fail(&mut self, err: GitError) {
        tracing::warn!(error = %err, "operation failed");
        self.status_message = Some(err.to_string());
    }

    // ── Loading ─────────────────────────────────────────────────────

    /// Re-fetch the file list, keep the selected path if it survives, then
    /// reload its hunks.
    pub fn reload(&mut self) {
        self.request_files(true);
    }

    fn request_files(&mut self, reload_hunks: bool) {
        let generation = self.next_generation();
        self.pending_files = Some(generation);
        self.queue(Job::LoadFiles {
            generation,
            reload_hunks,
        });
    }

    /// Replace the hunk sequence with a fresh load of `path`.
    pub fn load_hunks(&mut self, path: &str) {
        let Some(file) = self.files.iter().find(|f| f.path == path).cloned() else {
            tracing::debug!(path, "not in file list; skipping hunk load");
            return;
        };
        let generation = self.next_generation();
        self.pending_hunks = Some((generation, path.to_string()));
        self.queue(Job::LoadHunks {
            generation,
            file,
            width: self.viewport_width,
        });
    }

    fn load_selected_hunks(&mut self) {
        match self.selected_path().map(str::to_string) {
            Some(path) => self.load_hunks(&path),
            None => self.clear_hunks(),
        }
    }

    fn clear_hunks(&mut self) {
        self.hunks.clear();
        self.hunks_path = None;
        self.pending_hunks = None;
        self.selected_hunk = 0;
        self.scroll = 0;
        self.rebuild_layout();
    }

    fn replace_files(&mut self, files: Vec<StatusFile>, reload_hunks: bool) {
        let prev_path = self.selected_path().map(str::to_string);
        let prev_index = self.selected_file;

        self.selected_file = prev_path
            .and_then(|p| files.iter().position(|f| f.path == p))
            .unwrap_or_else(|| prev_index.min(files.len().saturating_sub(1)));
        self.files = files;

        let Some(path) = self.selected_path().map(str::to_string) else {
            self.clear_hunks();
            return;
        };
        let shown = self.hunks_path.as_deref() == Some(path.as_str());
        let in_flight = self
            .pending_hunks
            .as_ref()
            .is_some_and(|(_, p)| *p == path);
        if reload_hunks || (!shown && !in_flight) {
            self.load_hunks(&path);
        }
    }

    fn replace_hunks(&mut self, path: String, hunks: Vec<DisplayHunk>) {
        let same_file = self.hunks_path.as_deref() == Some(path.as_str());
        tracing::debug!(%path, count = hunks.len(), "hunks loaded");

        self.hunks = hunks;
        self.hunks_path = Some(path);
        if same_file {
            self.selected_hunk = self.selected_hunk.min(self.hunks.len().saturating_sub(1));
        } else {
            self.selected_hunk = 0;
            self.scroll = 0;
        }
        self.rebuild_layout();
    }

    fn rebuild_layout(&mut self) {
        let width = self.viewport_width.unwrap_or(DEFAULT_DIFF_WIDTH);
        self.layout = build_hunk_layout(&self.hunks, width);
        self.clamp_scroll();
    }

    /// Record the diff pane's content size. A width change re-renders the
    /// current file at the new width.
    pub fn set_viewport(&mut self, width: u16, height: u16) {
        if self.viewport_height != height {
            self.viewport_height = height;
            self.clamp_scroll();
            self.needs_redraw = true;
        }
        if self.viewport_width == Some(width) {
            return;
        }

        let had_width = self.viewport_width.is_some();
        self.viewport_width = Some(width);
        self.rebuild_layout();
        self.needs_redraw = true;
        if had_width {
            if let Some(path) = self.hunks_path.clone() {
                self.load_hunks(&path);
            }
        }
    }

    // ── Results ─────────────────────────────────────────────────────

    /// Drain finished jobs. Call once per tick. Returns true if anything
    /// was applied.
    pub fn poll_results(&mut self) -> bool {
        let mut changed = false;
        while let Ok(result) = self.result_rx.try_recv() {
            self.apply_result(result);
            changed = true;
        }
        changed
    }

    pub fn apply_result(&mut self, result: JobResult) {
        self.needs_redraw = true;
        match result {
            JobResult::Files {
                generation,
                reload_hunks,
                result,
            } => {
                if self.pending_files != Some(generation) {
                    tracing::debug!(generation, "discarding stale file list");
                    return;
                }
                self.pending_files = None;
                match result {
                    Ok(files) => self.replace_files(files, reload_hunks),
                    Err(e) => self.fail(e),
                }
            }
            JobResult::Hunks {
                generation,
                path,
                result,
            } => {
                if self.pending_hunks.as_ref().map(|(g, _)| *g) != Some(generation) {
                    tracing::debug!(generation, %path, "discarding stale hunks");
                    return;
                }
                self.pending_hunks = None;
                match result {
                    Ok(hunks) => self.replace_hunks(path, hunks),
                    Err(e) => {
                        if self.hunks_path.as_deref() != Some(path.as_str()) {
                            self.clear_hunks();
                        }
                        self.fail(e);
                    }
                }
            }
            JobResult::HunkToggled { ticket, result } => {
                if !matches!(&self.pending_mutation, Some(Mutation::Hunk(t)) if *t == ticket) {
                    tracing::debug!(path = %ticket.path, "discarding unexpected hunk result");
                    return;
                }
                self.pending_mutation = None;
                match result {
                    Ok(()) => {
                        self.status_message = None;
                        self.mark_toggled(&ticket);
                        // Index changed: refresh status letters without reloading hunks.
                        self.request_files(false);
                    }
                    Err(e) => self.fail(e),
                }
            }
            JobResult::FileToggled {
                want_staged,
                result,
            } => {
                if self.pending_mutation != Some(Mutation::Files) {
                    tracing::debug!(want_staged, "discarding unexpected file result");
                    return;
                }
                self.pending_mutation = None;
                match result {
                    Ok(()) => {
                        self.status_message = None;
                        self.reload();
                    }
                    Err(e) => self.fail(e),
                }
            }
        }
    }

    fn mark_toggled(&mut self, ticket: &HunkTicket) {
        let entry = self
            .hunks
            .get_mut(ticket.index)
            .filter(|h| h.file.path == ticket.path && h.hunk.header == ticket.header);
        match entry {
            Some(hunk) => {
                hunk.origin_staged = ticket.want_staged;
                self.rebuild_layout();
            }
            None => tracing::debug!(
                index = ticket.index,
                path = %ticket.path,
                "toggled hunk no longer displayed"
            ),
        }
    }

    // ── Mutations ───────────────────────────────────────────────────

    /// Stage (`want_staged`) or unstage one hunk by applying its patch to the
    /// index. A hunk already in the target state is left alone.
    pub fn toggle_hunk(&mut self, index: usize, want_staged: bool) {
        let Some(hunk) = self.hunks.get(index) else {
            return;
        };
        if hunk.origin_staged == want_staged {
            return;
        }
        if self.phase() != Phase::Idle {
            tracing::debug!(index, phase = ?self.phase(), "toggle ignored while busy");
            return;
        }

        let ticket = HunkTicket {
            index,
            path: hunk.file.path.clone(),
            header: hunk.hunk.header.clone(),
            want_staged,
        };
        let patch = hunk.patch();
        self.pending_mutation = Some(Mutation::Hunk(ticket.clone()));
        self.queue(Job::ToggleHunk { ticket, patch });
    }

    /// Stage or unstage the selected file as a whole.
    pub fn toggle_file(&mut self, want_staged: bool) {
        let Some(file) = self.files.get(self.selected_file) else {
            return;
        };
        if !want_staged && (file.is_untracked() || !file.has_staged_change()) {
            return;
        }
        let paths = vec![file.path.clone()];
        self.queue_file_mutation(paths, want_staged);
    }

    pub fn stage_all(&mut self) {
        let paths: Vec<String> = self.files.iter().map(|f| f.path.clone()).collect();
        if paths.is_empty() {
            return;
        }
        self.queue_file_mutation(paths, true);
    }

    fn queue_file_mutation(&mut self, paths: Vec<String>, want_staged: bool) {
        if self.phase() != Phase::Idle {
            tracing::debug!(phase = ?self.phase(), "file toggle ignored while busy");
            return;
        }
        self.pending_mutation = Some(Mutation::Files);
        self.queue(Job::ToggleFile { paths, want_staged });
    }

    // ── Navigation ──────────────────────────────────────────────────

    pub fn select_file(&mut self, index: usize) {
        if index >= self.files.len() || index == self.selected_file {
            return;
        }
        self.selected_file = index;
        self.load_selected_hunks();
    }

    pub fn next_file(&mut self) {
        self.select_file(self.selected_file + 1);
    }

    pub fn prev_file(&mut self) {
        if self.selected_file > 0 {
            self.select_file(self.selected_file - 1);
        }
    }

    pub fn select_hunk(&mut self, index: usize) {
        if self.hunks.is_empty() {
            return;
        }
        self.selected_hunk = index.min(self.hunks.len() - 1);
        self.scroll = self.layout.offset_of(self.selected_hunk);
        self.clamp_scroll();
    }

    pub fn next_hunk(&mut self) {
        self.select_hunk(self.selected_hunk + 1);
    }

    pub fn prev_hunk(&mut self) {
        self.select_hunk(self.selected_hunk.saturating_sub(1));
    }

    fn max_scroll(&self) -> usize {
        self.layout
            .len()
            .saturating_sub(usize::from(self.viewport_height))
    }

    fn clamp_scroll(&mut self) {
        self.scroll = self.scroll.min(self.max_scroll());
    }

    pub fn scroll_by(&mut self, delta: isize) {
        self.scroll = self.scroll.saturating_add_signed(delta);
        self.clamp_scroll();
    }

    fn half_page(&self) -> isize {
        isize::try_from((self.viewport_height / 2).max(1)).unwrap_or(1)
    }

    pub fn scroll_to_top(&mut self) {
        self.select_hunk(0);
        self.scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        if !self.hunks.is_empty() {
            self.select_hunk(self.hunks.len() - 1);
        }
        self.scroll = self.max_scroll();
    }

    pub fn handle_wheel(&mut self, up: bool) {
        let step = WHEEL_STEP as isize;
        self.scroll_by(if up { -step } else { step });
        self.needs_redraw = true;
    }

    fn quit(&mut self) {
        self.should_quit = true;
        self.queue(Job::Quit);
    }

    // ── Keys ────────────────────────────────────────────────────────

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.needs_redraw = true;
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => self.quit(),
            KeyCode::Char('q') | KeyCode::Esc => self.quit(),
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Pane::Files => Pane::Hunks,
                    Pane::Hunks => Pane::Files,
                }
            }
            KeyCode::Char('r') => self.reload(),
            _ => match self.focus {
                Pane::Files => self.handle_files_key(key.code, ctrl),
                Pane::Hunks => self.handle_hunks_key(key.code, ctrl),
            },
        }
    }

    fn handle_files_key(&mut self, code: KeyCode, ctrl: bool) {
        match code {
            KeyCode::Char('d') if ctrl => self.scroll_by(self.half_page()),
            KeyCode::Char('u') if ctrl => self.scroll_by(-self.half_page()),
            // Other chords never fall through to the plain-letter actions.
            KeyCode::Char(_) if ctrl => {}
            KeyCode::Char('j') | KeyCode::Down => self.next_file(),
            KeyCode::Char('k') | KeyCode::Up => self.prev_file(),
            KeyCode::Char('g') | KeyCode::Home => self.select_file(0),
            KeyCode::Char('G') | KeyCode::End => {
                self.select_file(self.files.len().saturating_sub(1))
            }
            KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => self.focus = Pane::Hunks,
            KeyCode::Char('s') => self.toggle_file(true),
            KeyCode::Char('u') => self.toggle_file(false),
            KeyCode::Char('a') => self.stage_all(),
            _ => {}
        }
    }

    fn handle_hunks_key(&mut self, code: KeyCode, ctrl: bool) {
        match code {
            KeyCode::Char('d') if ctrl => self.scroll_by(self.half_page()),
            KeyCode::Char('u') if ctrl => self.scroll_by(-self.half_page()),
            KeyCode::Char(_) if ctrl => {}
            KeyCode::PageDown => self.scroll_by(self.half_page() * 2),
            KeyCode::PageUp => self.scroll_by(-self.half_page() * 2),
            KeyCode::Char('j' | 'n' | '}') | KeyCode::Down => self.next_hunk(),
            KeyCode::Char('k' | 'p' | '{') | KeyCode::Up => self.prev_hunk(),
            KeyCode::Char('g') | KeyCode::Home => self.scroll_to_top(),
            KeyCode::Char('G') | KeyCode::End => self.scroll_to_bottom(),
            KeyCode::Char('h') | KeyCode::Left => self.focus = Pane::Files,
            KeyCode::Char('s') => self.toggle_hunk(self.selected_hunk, true),
            KeyCode::Char('u') => self.toggle_hunk(self.selected_hunk, false),
            _ => {}
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backend::fakes::{self, FakeGateway, TagRenderer};
    use crate::backend::Worker;
    use crate::diff::parse_unified_diff;

    pub(crate) fn make_app() -> (StageApp, mpsc::Receiver<Job>, mpsc::Sender<JobResult>) {
        let (job_tx, job_rx) = mpsc::channel(64);
        let (result_tx, result_rx) = mpsc::channel(64);
        (StageApp::new(job_tx, result_rx, "tag"), job_rx, result_tx)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    pub(crate) fn display(path: &str, header: &str, staged: bool) -> DisplayHunk {
        let raw = fakes::diff_text(path, &[(header, &["-old", "+new"])]);
        let file = Arc::new(parse_unified_diff(&raw).remove(0));
        DisplayHunk {
            hunk: file.hunks[0].clone(),
            rendered: format!("{header}\n-old\n+new"),
            file,
            origin_staged: staged,
        }
    }

    /// An app showing `hunks` for the first of `files`, with an empty job queue.
    pub(crate) fn loaded_app(
        files: Vec<StatusFile>,
        hunks: Vec<DisplayHunk>,
    ) -> (StageApp, mpsc::Receiver<Job>) {
        let (mut app, mut jobs, _results) = make_app();
        app.files = files;
        let path = app.selected_path().unwrap().to_string();
        app.load_hunks(&path);
        while jobs.try_recv().is_ok() {}
        app.apply_result(JobResult::Hunks {
            generation: app.generation,
            path,
            result: Ok(hunks),
        });
        (app, jobs)
    }

    fn three_hunks() -> (StageApp, mpsc::Receiver<Job>) {
        loaded_app(
            vec![fakes::modified("src/lib.rs", true, true)],
            vec![
                display("src/lib.rs", "@@ -1 +1 @@", false),
                display("src/lib.rs", "@@ -5 +5 @@", false),
                display("src/lib.rs", "@@ -9 +9 @@", true),
            ],
        )
    }

    fn origins(app: &StageApp) -> Vec<bool> {
        app.hunks().iter().map(|h| h.origin_staged).collect()
    }

    #[test]
    fn starts_idle_and_empty() {
        let (app, _jobs, _results) = make_app();
        assert_eq!(app.phase(), Phase::Idle);
        assert!(app.hunks().is_empty());
        assert_eq!(app.selected_path(), None);
    }

    #[test]
    fn toggle_to_current_state_is_a_noop() {
        let (mut app, mut jobs) = three_hunks();
        app.toggle_hunk(2, true);
        app.toggle_hunk(0, false);

        assert!(jobs.try_recv().is_err());
        assert_eq!(app.phase(), Phase::Idle);
        assert_eq!(origins(&app), vec![false, false, true]);
    }

    #[test]
    fn successful_toggle_flips_only_that_entry() {
        let (mut app, mut jobs) = three_hunks();
        app.toggle_hunk(1, true);
        assert_eq!(app.phase(), Phase::Mutating);

        let ticket = match jobs.try_recv() {
            Ok(Job::ToggleHunk { ticket, patch }) => {
                assert_eq!(patch, app.hunks()[1].patch());
                assert!(patch.ends_with("@@ -5 +5 @@\n-old\n+new\n"));
                ticket
            }
            other => panic!("expected ToggleHunk, got {other:?}"),
        };
        assert_eq!(ticket.index, 1);
        assert!(ticket.want_staged);

        app.apply_result(JobResult::HunkToggled {
            ticket,
            result: Ok(()),
        });
        assert_eq!(origins(&app), vec![false, true, true]);
        assert!(app.layout().rows.iter().any(|(i, row)| *i == 1
            && row.spans[0].content.contains("[staged]")));

        // Status letters refresh, hunks are not reloaded.
        match jobs.try_recv() {
            Ok(Job::LoadFiles { reload_hunks, .. }) => assert!(!reload_hunks),
            other => panic!("expected LoadFiles, got {other:?}"),
        }
        assert!(jobs.try_recv().is_err());
    }

    #[test]
    fn failed_toggle_surfaces_error_and_keeps_sequence() {
        let (mut app, mut jobs) = three_hunks();
        app.toggle_hunk(0, true);
        let Ok(Job::ToggleHunk { ticket, .. }) = jobs.try_recv() else {
            panic!("expected ToggleHunk");
        };

        app.apply_result(JobResult::HunkToggled {
            ticket,
            result: Err(GitError::PatchApply("does not apply".to_string())),
        });

        assert_eq!(origins(&app), vec![false, false, true]);
        assert_eq!(app.phase(), Phase::Idle);
        assert_eq!(
            app.status_message.as_deref(),
            Some("patch rejected: does not apply")
        );
        assert!(jobs.try_recv().is_err());
    }

    #[test]
    fn second_toggle_while_mutating_is_ignored() {
        let (mut app, mut jobs) = three_hunks();
        app.toggle_hunk(0, true);
        app.toggle_hunk(1, true);
        assert!(matches!(jobs.try_recv(), Ok(Job::ToggleHunk { .. })));
        assert!(jobs.try_recv().is_err());
    }

    #[test]
    fn toggle_result_for_vanished_hunk_is_not_misapplied() {
        let (mut app, mut jobs) = three_hunks();
        app.toggle_hunk(1, true);
        let Ok(Job::ToggleHunk { ticket, .. }) = jobs.try_recv() else {
            panic!("expected ToggleHunk");
        };

        // The sequence is replaced by a shorter one before the result lands.
        app.load_hunks("src/lib.rs");
        while jobs.try_recv().is_ok() {}
        app.apply_result(JobResult::Hunks {
            generation: app.generation,
            path: "src/lib.rs".to_string(),
            result: Ok(vec![display("src/lib.rs", "@@ -9 +9 @@", true)]),
        });

        app.apply_result(JobResult::HunkToggled {
            ticket,
            result: Ok(()),
        });
        assert_eq!(origins(&app), vec![true]);
        assert_eq!(app.hunks()[0].hunk.header, "@@ -9 +9 @@");
    }

    #[test]
    fn stale_hunk_load_is_discarded() {
        let (mut app, mut jobs) = three_hunks();
        app.load_hunks("src/lib.rs");
        let old_generation = app.generation;
        app.load_hunks("src/lib.rs");
        while jobs.try_recv().is_ok() {}

        app.apply_result(JobResult::Hunks {
            generation: old_generation,
            path: "src/lib.rs".to_string(),
            result: Ok(Vec::new()),
        });
        assert_eq!(app.hunks().len(), 3);
        assert_eq!(app.phase(), Phase::Loading);
    }

    #[test]
    fn reload_keeps_selected_path_across_reordering() {
        let (mut app, mut jobs, _results) = make_app();
        app.files = vec![
            fakes::modified("a.rs", false, true),
            fakes::modified("b.rs", false, true),
            fakes::modified("c.rs", false, true),
        ];
        app.selected_file = 1;
        app.reload();
        let Ok(Job::LoadFiles { generation, .. }) = jobs.try_recv() else {
            panic!("expected LoadFiles");
        };

        app.apply_result(JobResult::Files {
            generation,
            reload_hunks: true,
            result: Ok(vec![
                fakes::modified("0.rs", false, true),
                fakes::modified("a.rs", false, true),
                fakes::modified("b.rs", false, true),
            ]),
        });
        assert_eq!(app.selected_path(), Some("b.rs"));
        match jobs.try_recv() {
            Ok(Job::LoadHunks { file, .. }) => assert_eq!(file.path, "b.rs"),
            other => panic!("expected LoadHunks, got {other:?}"),
        }
    }

    #[test]
    fn reload_clamps_when_selected_path_disappears() {
        let (mut app, mut jobs, _results) = make_app();
        app.files = vec![
            fakes::modified("a.rs", false, true),
            fakes::modified("b.rs", false, true),
        ];
        app.selected_file = 1;
        app.reload();
        let Ok(Job::LoadFiles { generation, .. }) = jobs.try_recv() else {
            panic!("expected LoadFiles");
        };
        app.apply_result(JobResult::Files {
            generation,
            reload_hunks: true,
            result: Ok(vec![fakes::modified("a.rs", false, true)]),
        });
        assert_eq!(app.selected_path(), Some("a.rs"));
        while jobs.try_recv().is_ok() {}

        app.reload();
        let Ok(Job::LoadFiles { generation, .. }) = jobs.try_recv() else {
            panic!("expected LoadFiles");
        };
        app.apply_result(JobResult::Files {
            generation,
            reload_hunks: true,
            result: Ok(Vec::new()),
        });
        assert_eq!(app.selected_path(), None);
        assert!(app.hunks().is_empty());
        assert_eq!(app.phase(), Phase::Idle);
    }

    #[test]
    fn file_unstage_guard_skips_untracked_and_unstaged() {
        let (mut app, mut jobs, _results) = make_app();
        app.files = vec![fakes::untracked("new.txt"), fakes::modified("a.rs", false, true)];
        app.toggle_file(false);
        app.selected_file = 1;
        app.toggle_file(false);
        assert!(jobs.try_recv().is_err());

        app.toggle_file(true);
        match jobs.try_recv() {
            Ok(Job::ToggleFile { paths, want_staged }) => {
                assert_eq!(paths, vec!["a.rs"]);
                assert!(want_staged);
            }
            other => panic!("expected ToggleFile, got {other:?}"),
        }
    }

    #[test]
    fn file_toggle_success_triggers_full_reload() {
        let (mut app, mut jobs, _results) = make_app();
        app.files = vec![fakes::modified("a.rs", true, false)];
        app.toggle_file(false);
        assert!(matches!(jobs.try_recv(), Ok(Job::ToggleFile { .. })));

        app.apply_result(JobResult::FileToggled {
            want_staged: false,
            result: Ok(()),
        });
        match jobs.try_recv() {
            Ok(Job::LoadFiles { reload_hunks, .. }) => assert!(reload_hunks),
            other => panic!("expected LoadFiles, got {other:?}"),
        }
    }

    #[test]
    fn stage_all_sends_every_path_once() {
        let (mut app, mut jobs, _results) = make_app();
        app.files = vec![fakes::modified("a.rs", false, true), fakes::untracked("b.txt")];
        app.handle_key(key(KeyCode::Char('a')));
        match jobs.try_recv() {
            Ok(Job::ToggleFile { paths, want_staged }) => {
                assert_eq!(paths, vec!["a.rs", "b.txt"]);
                assert!(want_staged);
            }
            other => panic!("expected ToggleFile, got {other:?}"),
        }
    }

    #[test]
    fn hunk_keys_route_to_selected_hunk() {
        let (mut app, mut jobs) = three_hunks();
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.focus, Pane::Hunks);

        app.handle_key(key(KeyCode::Char('n')));
        assert_eq!(app.selected_hunk, 1);
        app.handle_key(key(KeyCode::Char('s')));
        match jobs.try_recv() {
            Ok(Job::ToggleHunk { ticket, .. }) => {
                assert_eq!(ticket.index, 1);
                assert_eq!(ticket.header, "@@ -5 +5 @@");
            }
            other => panic!("expected ToggleHunk, got {other:?}"),
        }
    }

    #[test]
    fn hunk_navigation_jumps_viewport_to_separator() {
        let (mut app, _jobs) = three_hunks();
        app.set_viewport(40, 2);
        app.select_hunk(1);
        assert_eq!(app.scroll, app.layout().offset_of(1));
        app.scroll_to_bottom();
        assert_eq!(app.selected_hunk, 2);
        assert_eq!(app.scroll, app.layout().len() - 2);
        app.scroll_to_top();
        assert_eq!(app.scroll, 0);
    }

    #[test]
    fn width_change_rerenders_current_file() {
        let (mut app, mut jobs) = three_hunks();
        app.set_viewport(100, 20);
        assert!(jobs.try_recv().is_err(), "first width only sizes the layout");

        app.set_viewport(60, 20);
        match jobs.try_recv() {
            Ok(Job::LoadHunks { file, width, .. }) => {
                assert_eq!(file.path, "src/lib.rs");
                assert_eq!(width, Some(60));
            }
            other => panic!("expected LoadHunks, got {other:?}"),
        }
        assert_eq!(app.layout().width, 60);
    }

    #[test]
    fn ctrl_chords_in_files_pane_do_not_toggle_files() {
        let (mut app, mut jobs) = three_hunks();
        app.set_viewport(40, 4);
        assert_eq!(app.focus, Pane::Files);

        let ctrl = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);
        app.handle_key(ctrl('u'));
        app.handle_key(ctrl('s'));
        app.handle_key(ctrl('a'));
        assert!(jobs.try_recv().is_err());
        assert_eq!(app.phase(), Phase::Idle);

        app.handle_key(ctrl('d'));
        assert_eq!(app.scroll, 2);
        app.handle_key(ctrl('u'));
        assert_eq!(app.scroll, 0);
        assert!(jobs.try_recv().is_err());
    }

    #[test]
    fn ctrl_s_in_hunks_pane_does_not_stage() {
        let (mut app, mut jobs) = three_hunks();
        app.focus = Pane::Hunks;
        app.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert!(jobs.try_recv().is_err());
    }

    #[test]
    fn quit_key_stops_worker() {
        let (mut app, mut jobs, _results) = make_app();
        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.should_quit);
        assert!(matches!(jobs.try_recv(), Ok(Job::Quit)));
    }

    #[tokio::test]
    async fn full_session_loads_unstaged_then_staged() {
        let gateway = Arc::new(fakes::gateway_with_both_sides());
        let (job_tx, job_rx) = mpsc::channel(16);
        let (result_tx, result_rx) = mpsc::channel(16);
        tokio::spawn(Worker::new(gateway.clone(), Arc::new(TagRenderer), false, result_tx).run(job_rx));

        let mut app = StageApp::new(job_tx, result_rx, "tag");
        app.reload();
        for _ in 0..200 {
            app.poll_results();
            if app.phase() == Phase::Idle && !app.hunks().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        assert_eq!(app.selected_path(), Some("new.txt"));
        assert_eq!(origins(&app), vec![false]);

        app.next_file();
        for _ in 0..200 {
            app.poll_results();
            if app.phase() == Phase::Idle && app.hunks_path() == Some("src/lib.rs") {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(origins(&app), vec![false, false, true]);

        app.toggle_hunk(0, true);
        for _ in 0..200 {
            app.poll_results();
            if app.phase() == Phase::Idle {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(origins(&app), vec![true, false, true]);
        let applied = gateway.applied.lock().unwrap().clone();
        assert_eq!(applied.len(), 1);
        assert!(applied[0].0);
        assert!(applied[0].1.contains("@@ -1 +1 @@\n-a\n+A\n"));
    }

    #[test]
    fn rejected_patch_from_fake_gateway_reaches_status_line() {
        let gw = FakeGateway {
            reject_patches: true,
            ..FakeGateway::default()
        };
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let result = rt.block_on(crate::backend::execute(
            Job::ToggleHunk {
                ticket: HunkTicket {
                    index: 0,
                    path: "src/lib.rs".to_string(),
                    header: "@@ -1 +1 @@".to_string(),
                    want_staged: true,
                },
                patch: String::new(),
            },
            &gw,
            &TagRenderer,
            false,
        ));

        let (mut app, mut jobs) = three_hunks();
        app.toggle_hunk(0, true);
        while jobs.try_recv().is_ok() {}
        app.apply_result(result.unwrap());
        assert_eq!(app.status_message.as_deref(), Some("patch rejected: corrupt patch"));
        assert_eq!(origins(&app), vec![false, false, true]);
    }
}
