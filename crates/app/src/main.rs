use std::fmt;
use std::sync::Arc;

use grader_core::Clock;
use grader_core::model::{ContentId, GradingSession, HighlightsView, ItemIndex};
use services::ports::WiringScope;
use services::{
    Collaborators, Control, HeadlessSurface, PersistenceConfig, SessionPersistence, UiSurface,
};
use storage::{HttpSessionStore, HttpStoreConfig, SessionStore};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingCommand,
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "a subcommand is required"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidUrl { raw } => write!(f, "invalid --url value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- inspect [--url <base_url>]");
    eprintln!("  cargo run -p app -- replay  [--url <base_url>]");
    eprintln!("  cargo run -p app -- clear   [--url <base_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --url http://127.0.0.1:8080");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  GRADER_SESSION_URL, GRADER_LEGACY_SCAN_LIMIT, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Inspect,
    Replay,
    Clear,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "inspect" => Some(Self::Inspect),
            "replay" => Some(Self::Replay),
            "clear" => Some(Self::Clear),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    command: Command,
    store: HttpStoreConfig,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let command = match args.next() {
            None => return Err(ArgsError::MissingCommand),
            Some(first) if first == "--help" || first == "-h" => return Ok(None),
            Some(first) => Command::from_arg(&first).ok_or(ArgsError::UnknownCommand(first))?,
        };

        let mut store = HttpStoreConfig::from_env();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--url" => {
                    let value = require_value(&mut args, "--url")?;
                    let trimmed = value.trim();
                    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
                        return Err(ArgsError::InvalidUrl { raw: value });
                    }
                    store = HttpStoreConfig::new(trimmed);
                }
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Some(Self { command, store }))
    }
}

/// Counts shown by `inspect`.
#[derive(Debug, PartialEq, Eq)]
struct SessionSummary {
    active_tab: String,
    items: usize,
    with_markup: usize,
    overridden_items: usize,
    completed: usize,
    excluded_views: usize,
}

impl SessionSummary {
    fn from_session(session: &GradingSession, scan_limit: usize) -> Self {
        let data = &session.session_data;
        Self {
            active_tab: session.active_tab.to_string(),
            items: data
                .effective_batch(scan_limit)
                .map_or(0, |batch| batch.count()),
            with_markup: data.markup.len(),
            overridden_items: data.score_overrides.len(),
            completed: data.completed_flags.values().filter(|done| **done).count(),
            excluded_views: data.remove_all_flags.values().filter(|on| **on).count(),
        }
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "active tab:        {}", self.active_tab)?;
        writeln!(f, "items:             {}", self.items)?;
        writeln!(f, "cached markup:     {}", self.with_markup)?;
        writeln!(f, "overridden items:  {}", self.overridden_items)?;
        writeln!(f, "completed:         {}", self.completed)?;
        write!(f, "excluded views:    {}", self.excluded_views)
    }
}

/// Outcome of restoring the saved session onto a headless page.
#[derive(Debug, PartialEq, Eq)]
struct ReplaySummary {
    restored: bool,
    items: usize,
    wired_items: usize,
    excluded_views: usize,
}

impl fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.restored {
            return write!(f, "nothing restored");
        }
        writeln!(f, "items restored:    {}", self.items)?;
        writeln!(f, "items rewired:     {}", self.wired_items)?;
        write!(f, "excluded views:    {}", self.excluded_views)
    }
}

async fn replay(store: Arc<dyn SessionStore>, config: PersistenceConfig) -> ReplaySummary {
    let page = Arc::new(HeadlessSurface::new());
    let persistence = SessionPersistence::new(
        store,
        Collaborators::from_single(Arc::clone(&page)),
        config,
        Clock::system(),
    );
    let restored = persistence.load_and_restore().await;

    let items = persistence.records().count();
    let wired_items = ItemIndex::range(items)
        .filter(|&item| persistence.registry().wired_count(WiringScope::Item(item)) > 0)
        .count();
    let excluded_views = ItemIndex::range(items)
        .flat_map(|item| HighlightsView::ALL.map(|view| ContentId::new(view, item)))
        .filter(|&content| page.is_checked(Control::RemoveAll(content)))
        .count();

    ReplaySummary {
        restored,
        items,
        wired_items,
        excluded_views,
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let Some(args) = parsed else {
        print_usage();
        return Ok(());
    };

    let store = HttpSessionStore::new(&args.store);
    tracing::debug!(url = store.url(), command = ?args.command, "session store ready");

    match args.command {
        Command::Inspect => match store.fetch_session().await? {
            Some(session) => {
                let scan_limit = PersistenceConfig::from_env().legacy_scan_limit;
                println!("{}", SessionSummary::from_session(&session, scan_limit));
            }
            None => println!("no saved session"),
        },
        Command::Replay => {
            let summary = replay(Arc::new(store), PersistenceConfig::from_env()).await;
            println!("{summary}");
        }
        Command::Clear => {
            store.delete_session().await?;
            tracing::info!(url = store.url(), "saved session deleted");
            println!("saved session deleted");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
