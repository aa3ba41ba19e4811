use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use crossbeam_channel::RecvTimeoutError;
use indicatif::{ProgressBar, ProgressStyle};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use filesift::{SearchEvent, SearchRequest, SearchResult, SessionHandle};

/// Find files whose name contains a piece of text
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Text the file name must contain (case-sensitive)
    pattern: String,

    /// Folder to search
    #[clap(default_value = ".")]
    root: PathBuf,

    /// Follow symbolic links
    #[clap(long)]
    follow_links: bool,

    /// Visit folder entries in name order
    #[clap(long)]
    sorted: bool,

    /// Report progress after every file instead of on each percent change
    #[clap(long)]
    every_file: bool,

    /// Hide the progress bar
    #[clap(short, long)]
    quiet: bool,

    /// More log output on stderr (repeat for more)
    #[clap(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)
        .context("failed to initialise logging")
}

fn progress_bar(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("Progress: [{bar:40.green/white}] {pos:>3}%")
            .context("invalid progress template")?
            .progress_chars("=> "),
    );
    Ok(bar)
}

/// Drain events for `session` until its result arrives.
///
/// Events from any other session are stale and dropped.
fn wait_for_result(
    rx: &crossbeam_channel::Receiver<SearchEvent>,
    session: &SessionHandle,
    bar: &ProgressBar,
) -> Result<SearchResult> {
    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(SearchEvent::Progress { session: id, percent }) if id == session.id() => {
                bar.set_position(u64::from(percent));
            }
            Ok(SearchEvent::Complete { session: id, result }) if id == session.id() => {
                return Ok(result);
            }
            Ok(stale) => log::debug!("dropping event from session {}", stale.session()),
            Err(RecvTimeoutError::Timeout) => {
                if session.is_finished() && rx.is_empty() {
                    bail!("search ended without a result");
                }
            }
            Err(RecvTimeoutError::Disconnected) => bail!("search worker went away"),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let (tx, rx) = crossbeam_channel::unbounded::<SearchEvent>();
    let worker = filesift::worker()
        .observer(tx)
        .follow_links(args.follow_links)
        .sort_by_name(args.sorted)
        .coalesce_progress(!args.every_file)
        .build()?;

    let session = match worker.start(SearchRequest::new(&args.pattern, &args.root)) {
        Ok(session) => session,
        Err(err) if err.is_invalid_input() => {
            eprintln!("Invalid input: {err}");
            std::process::exit(2);
        }
        Err(err) => return Err(err).context("failed to start search"),
    };

    let bar = progress_bar(args.quiet)?;
    let result = wait_for_result(&rx, &session, &bar)?;
    bar.finish_and_clear();
    session.join()?;

    if result.is_empty() {
        println!("No files found.");
    } else {
        for path in &result {
            println!("{}", path.display());
        }
    }

    log::info!(
        "{} matches among {} files ({} dirs, {} skipped) in {:.3}s",
        result.len(),
        result.stats.scanned,
        result.stats.dirs,
        result.stats.skipped,
        result.stats.duration.as_secs_f64()
    );

    Ok(())
}
