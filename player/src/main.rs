use std::{
    fs::{self, OpenOptions},
    io,
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use log::{debug, error, info};
use marquee_core::{PlaybackController, classify};
use ratatui::{Terminal, backend::CrosstermBackend, style::Color};
use tokio::{sync::mpsc, time::Instant};

mod app;
mod browser;
mod commands;
mod config;
mod download;
mod events; // Host events and event utility functions
mod mpv;
mod ui;

use app::App;
use browser::BrowserFrame;
use events::event_utils::is_terminate_event;
use mpv::MpvSurface;

/// Terminal video player for direct streams, YouTube and Vimeo
#[derive(Parser, Debug)]
#[command(name = "marquee", version, about)]
struct Args {
    /// Video URL to open on startup
    source: Option<String>,

    /// Poster image URL shown while the video loads
    #[arg(long, value_name = "URL")]
    poster: Option<String>,

    /// Start playback as soon as the media is ready
    #[arg(long)]
    autoplay: bool,

    /// Print how the source would be played and exit
    #[arg(long)]
    classify: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Automatic retries before giving up on a stream
    #[arg(long)]
    max_retries: Option<u32>,

    /// Base delay between retries in milliseconds
    #[arg(long)]
    retry_base_delay_ms: Option<u64>,

    /// How long buffering may last before it counts as a fault
    #[arg(long)]
    stall_timeout_ms: Option<u64>,

    /// mpv executable used for direct streams
    #[arg(long, value_name = "PATH", default_value = "mpv")]
    mpv: PathBuf,
}

/// Send log output to a file so it never corrupts the terminal UI
fn init_logging() -> Result<Option<PathBuf>> {
    let Some(dirs) = config::project_dirs() else {
        return Ok(None);
    };
    let dir = dirs.data_dir();
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let path = dir.join("marquee.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(Some(path))
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(io::stdout(), LeaveAlternateScreen).context("Failed to leave alternate screen")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.classify {
        let source = args
            .source
            .as_deref()
            .ok_or_else(|| anyhow!("--classify needs a source URL"))?;
        let descriptor = classify(source, args.autoplay);
        println!("{}", descriptor);
        if descriptor.error_reason().is_some() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let log_path = init_logging()?;
    info!("Application starting, logging to {:?}", log_path);

    let overrides = config::Overrides {
        autoplay: args.autoplay,
        max_retries: args.max_retries,
        retry_base_delay_ms: args.retry_base_delay_ms,
        stall_timeout_ms: args.stall_timeout_ms,
    };
    let player_config = config::load(args.config.as_deref(), &overrides)?;

    // Set up clean terminal restoration on panic
    let orig_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        error!("PANIC: {}", panic_info);
        orig_hook(panic_info);
    }));

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(anyhow!("Failed to setup terminal: {}", e));
    }

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = match Terminal::new(backend) {
        Ok(term) => term,
        Err(e) => {
            let _ = restore_terminal();
            return Err(anyhow!("Failed to create terminal: {}", e));
        }
    };

    let (host_tx, mut host_rx) = mpsc::unbounded_channel();
    let surface = MpvSurface::new(args.mpv.clone(), host_tx.clone());
    let frame = BrowserFrame::new(host_tx);
    let controller = PlaybackController::new(player_config, Box::new(surface), Box::new(frame));
    let mut app = App::new(controller);

    if let Some(source) = &args.source {
        app.open_source_with_poster(source, args.poster.clone());
    }

    let mut reader = EventStream::new();
    // Keeps spinners and the status fade moving
    let mut tick = tokio::time::interval(Duration::from_millis(100));

    while !app.should_quit {
        if let Err(e) = terminal.draw(|f| ui::draw_ui(f, &app)) {
            error!("Terminal draw error: {}", e);
        }

        let deadline = app.next_deadline();
        let timer = tokio::time::sleep_until(
            deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600)),
        );

        tokio::select! {
            maybe_event = reader.next() => match maybe_event {
                Some(Ok(event)) => handle_terminal_event(&mut app, event),
                Some(Err(e)) => error!("Error reading event: {}", e),
                None => app.should_quit = true,
            },
            Some(event) = host_rx.recv() => app.handle_host_event(event),
            _ = timer, if deadline.is_some() => app.fire_due_timers(Instant::now()),
            _ = tick.tick() => {}
        }
    }

    info!("Shutting down application");

    // Unbinds the surfaces and stops mpv
    drop(app);

    if let Err(e) = restore_terminal().and_then(|_| {
        terminal.show_cursor().context("Failed to show cursor")
    }) {
        error!("Error during cleanup: {}", e);
        eprintln!("Error during cleanup: {}", e);
    }

    info!("Application terminated successfully");
    Ok(())
}

fn handle_terminal_event(app: &mut App, event: Event) {
    if is_terminate_event(&event) {
        debug!("Quit key pressed, exiting application");
        app.should_quit = true;
        return;
    }

    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            if let Err(e) = app.handle_key_event(key) {
                debug!("Key handler error: {}", e);
                app.set_status(format!("Error: {}", e), Color::Red);
            }
        }
        Event::Resize(w, h) => debug!("Resize event: {}x{}", w, h),
        _ => {}
    }
}
