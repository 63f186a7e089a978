use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use recap::runner::stream_events;
use recap::{BaseReporter, ReporterConfig, Session};

struct Args {
    input: Option<PathBuf>,
    summary_only: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        input: None,
        summary_only: false,
    };
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--summary" => args.summary_only = true,
            "-" => args.input = None,
            _ => args.input = Some(PathBuf::from(arg)),
        }
    }
    args
}

/// Log to the file named by `RECAP_DEBUG`, filtered by `RECAP_LOG` (default `debug`).
fn init_logging() {
    let Ok(path) = std::env::var("RECAP_DEBUG") else {
        return;
    };
    let file = match std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path)
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("recap: cannot open log file {path}: {e}");
            return;
        }
    };
    let filter = EnvFilter::try_from_env("RECAP_LOG").unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    debug!("tracing initialized");
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    match run(parse_args()).await {
        Ok(true) => ExitCode::FAILURE,
        Ok(false) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("recap: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Returns whether any test failed unexpectedly.
async fn run(args: Args) -> Result<bool> {
    let workspace = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = ReporterConfig::load(&workspace);

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let reader_task = tokio::spawn(async move {
        if let Err(e) = stream_events(reader, tx).await {
            warn!(error = %e, "event stream ended with an error");
        }
    });

    let mut session = Session::new(BaseReporter::new(config, io::stdout()));
    while let Some(event) = rx.recv().await {
        session.handle_event(event)?;
    }
    reader_task.await.context("event reader panicked")?;

    session.finish(!args.summary_only)?;
    Ok(session.has_failures())
}
