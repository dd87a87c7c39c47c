use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use std::io::{self, Write};
use std::sync::Arc;

use rift::app::StageApp;
use rift::backend::Worker;
use rift::config::{self, Config};
use rift::diff::render::changed_files;
use rift::diff::{select_renderer, DiffOpts, DiffRenderer, RendererChoice};
use rift::event::{Event, EventHandler};
use rift::models::StatusFile;
use rift::system::git::{GitRepo, StagingGateway};
use rift::{logging, ui};

const JOB_CHANNEL_CAPACITY: usize = 64;
const RESULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "rift", version, about = "Interactive hunk-level git staging")]
struct Cli {
    /// Diff renderer (overrides the config file)
    #[arg(long, value_enum, global = true)]
    renderer: Option<RendererChoice>,
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the interactive staging session (default)
    Stage,
    /// Print rendered diffs to stdout
    Diff {
        /// Compare the index against HEAD
        #[arg(long)]
        staged: bool,
        /// Only print the names of changed files
        #[arg(long)]
        name_only: bool,
        /// Render each file side by side at this many columns
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
        width: Option<u16>,
        /// BASE [TARGET]; BASE defaults to HEAD
        refs: Vec<String>,
        /// Limit output to these paths
        #[arg(last = true)]
        paths: Vec<String>,
    },
    /// List changed files as `XY path`
    Status {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Arguments of `rift diff` after flag parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DiffRequest {
    staged: bool,
    name_only: bool,
    width: Option<u16>,
    refs: Vec<String>,
    paths: Vec<String>,
}

impl Cli {
    fn resolve_config(&self, mut config: Config) -> Config {
        if let Some(choice) = self.renderer {
            config.renderer = choice;
        }
        if self.no_color {
            config.color = false;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&logging::default_log_path());

    let config = config::load_config(&config::default_config_path())
        .await
        .apply_env(std::env::var("NO_COLOR").ok().as_deref());
    let config = cli.resolve_config(config);

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let repo = GitRepo::open(&cwd)
        .await
        .context("Failed to open git repository")?;
    let renderer = select_renderer(config.renderer, config.difft_path.as_deref());
    tracing::info!(root = %repo.root().display(), renderer = renderer.name(), "starting");

    match cli.command {
        Some(Commands::Diff {
            staged,
            name_only,
            width,
            refs,
            paths,
        }) => {
            let request = DiffRequest {
                staged,
                name_only,
                width,
                refs,
                paths,
            };
            cmd_diff(&repo, renderer.as_ref(), &config, request).await
        }
        Some(Commands::Status { json }) => cmd_status(&repo, json).await,
        Some(Commands::Stage) | None => run_tui(repo, renderer, config).await,
    }
}

/// Resolve `[BASE [TARGET]]`, with BASE defaulting to HEAD.
fn diff_targets(refs: &[String]) -> Result<(String, Option<String>)> {
    match refs {
        [] => Ok(("HEAD".to_string(), None)),
        [base] => Ok((base.clone(), None)),
        [base, target] => Ok((base.clone(), Some(target.clone()))),
        _ => anyhow::bail!("expected at most two refs (BASE [TARGET]), got {}", refs.len()),
    }
}

async fn cmd_diff(
    repo: &GitRepo,
    renderer: &dyn DiffRenderer,
    config: &Config,
    request: DiffRequest,
) -> Result<()> {
    let (base, target) = diff_targets(&request.refs)?;
    let opts = DiffOpts {
        staged: request.staged,
        base: Some(base),
        target,
        color: config.color,
        width: request.width,
    };
    let mut stdout = io::stdout().lock();

    if request.name_only {
        let names = changed_files(repo.root(), &opts, &request.paths)
            .await
            .context("Failed to list changed files")?;
        for name in &names {
            writeln!(stdout, "{name}")?;
        }
        return Ok(());
    }

    if let (Some(base), Some(target), true) = (&opts.base, &opts.target, request.paths.is_empty()) {
        let out = renderer
            .diff_commit(repo.root(), base, target, opts.color, opts.width)
            .await
            .with_context(|| format!("Failed to diff {base}..{target}"))?;
        stdout.write_all(out.as_bytes())?;
        return Ok(());
    }

    if request.paths.is_empty() {
        let out = renderer
            .diff(repo.root(), None, &opts)
            .await
            .context("Failed to render diff")?;
        stdout.write_all(out.as_bytes())?;
        return Ok(());
    }

    for path in &request.paths {
        match renderer.diff(repo.root(), Some(path), &opts).await {
            Ok(out) => stdout.write_all(out.as_bytes())?,
            Err(e) => eprintln!("rift: {path}: {e}"),
        }
    }
    Ok(())
}

fn format_status(files: &[StatusFile], json: bool) -> Result<String> {
    if json {
        let mut out = serde_json::to_string_pretty(files)?;
        out.push('\n');
        return Ok(out);
    }
    Ok(files
        .iter()
        .map(|f| format!("{} {}\n", f.status_code(), f.path))
        .collect())
}

async fn cmd_status(repo: &GitRepo, json: bool) -> Result<()> {
    let files = repo
        .status_files()
        .await
        .context("Failed to read repository status")?;
    io::stdout().lock().write_all(format_status(&files, json)?.as_bytes())?;
    Ok(())
}

async fn run_tui(repo: GitRepo, renderer: Arc<dyn DiffRenderer>, config: Config) -> Result<()> {
    let (job_tx, job_rx) = tokio::sync::mpsc::channel(JOB_CHANNEL_CAPACITY);
    let (result_tx, result_rx) = tokio::sync::mpsc::channel(RESULT_CHANNEL_CAPACITY);

    let renderer_name = renderer.name();
    let worker = Worker::new(Arc::new(repo), renderer, config.color, result_tx);
    tokio::spawn(worker.run(job_rx));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut app = StageApp::new(job_tx, result_rx, renderer_name);
    let mut events = EventHandler::new(config.tick_rate());

    // Size the diff pane before the first hunks are rendered.
    let size = terminal.size()?;
    let layout = ui::compute_layout(Rect::new(0, 0, size.width, size.height));
    app.set_viewport(layout.diff_content_width(), layout.diff_content_height());
    app.reload();

    let outcome = event_loop(&mut terminal, &mut app, &mut events).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    outcome
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut StageApp,
    events: &mut EventHandler,
) -> Result<()> {
    terminal.draw(|frame| ui::draw(frame, app))?;

    // No awaits besides the next input event; git work happens in the worker.
    loop {
        if app.should_quit {
            break;
        }

        match events.next().await {
            Some(Event::Key(key)) => app.handle_key(key),
            Some(Event::Wheel { up }) => app.handle_wheel(up),
            Some(Event::Tick) => {
                if app.poll_results() {
                    app.needs_redraw = true;
                }
            }
            Some(Event::Resize(width, height)) => {
                let layout = ui::compute_layout(Rect::new(0, 0, width, height));
                app.set_viewport(layout.diff_content_width(), layout.diff_content_height());
                app.needs_redraw = true;
            }
            None => break,
        }

        if app.needs_redraw {
            terminal.draw(|frame| ui::draw(frame, app))?;
            app.needs_redraw = false;
        }
    }
    Ok(())
}
