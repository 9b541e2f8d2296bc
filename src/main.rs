//! kindling - e-book search and download over IRC

mod args;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use kindling::bot::ServingBot;
use kindling::config::{Config, validate};
use kindling::dcc::FileSink;
use kindling::progress::{ProgressEvent, ProgressReporter};
use kindling::search::{SearchClient, SearchOutcome, SearchResult};
use kindling::session::IrcSession;
use kindling::telemetry;

use args::{Args, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    telemetry::init(args.debug, args.log_json);

    let config = Config::load_or_default(args.config.as_ref()).map_err(|e| {
        error!(path = ?args.config, error = %e, "Failed to load config");
        e
    })?;
    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        bail!("{} configuration error(s)", errors.len());
    }

    info!(
        host = %config.irc.host,
        port = config.irc.port,
        nick = %config.irc.nickname,
        "Starting kindling"
    );

    let session = Arc::new(IrcSession::connect(&config.irc).await?);
    session.join(&config.irc.channel).await?;

    let outcome = match args.command {
        Command::Search { query } => search(&session, &config, &query.join(" ")).await,
        Command::Download { line, output } => download(&session, &config, &line, &output).await,
        Command::Serve => serve(&session, &config).await,
    };

    if let Err(e) = session.quit(Some("bye")).await {
        warn!(error = %e, "Failed to quit cleanly");
    }
    outcome
}

async fn search(session: &Arc<IrcSession>, config: &Config, query: &str) -> anyhow::Result<()> {
    let client = SearchClient::new(Arc::clone(session), config).with_progress(progress_logger());

    match client.search(query).await? {
        SearchOutcome::NoMatches => println!("No matches for {query:?}"),
        SearchOutcome::Results(results) => {
            for result in &results {
                match result.metadata() {
                    Some(meta) => println!("{result}\n    {} by {}", meta.title, meta.author),
                    None => println!("{result}"),
                }
            }
            println!("{} result(s)", results.len());
        }
    }
    Ok(())
}

async fn download(
    session: &Arc<IrcSession>,
    config: &Config,
    line: &str,
    output: &Path,
) -> anyhow::Result<()> {
    let result = SearchResult::parse(line).with_context(|| format!("not a listing line: {line}"))?;
    let name = Path::new(&result.title)
        .file_name()
        .with_context(|| format!("no filename in {:?}", result.title))?;

    tokio::fs::create_dir_all(output)
        .await
        .with_context(|| format!("creating {}", output.display()))?;
    let path = output.join(name);
    let mut sink = FileSink::open(&path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;

    let client = SearchClient::new(Arc::clone(session), config).with_progress(progress_logger());
    let transfer = client.download_to(&result, &mut sink).await?;

    println!("Saved {} ({} bytes)", path.display(), transfer.total());
    Ok(())
}

async fn serve(session: &Arc<IrcSession>, config: &Config) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let bot = ServingBot::new(Arc::clone(session), config);

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
        }
        ctrl_c.cancel();
    });

    bot.run(shutdown).await?;
    Ok(())
}

/// A reporter whose events go to the log.
fn progress_logger() -> ProgressReporter {
    let (reporter, mut events) = ProgressReporter::channel();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match &event {
                ProgressEvent::Step {
                    current,
                    total,
                    status,
                } => info!(step = %format!("{current}/{total}"), "{status}"),
                ProgressEvent::Transfer { filename, .. } => info!(
                    filename = %filename,
                    percent = %format!("{:.0}", event.percent().unwrap_or(0.0)),
                    "Transferring"
                ),
            }
        }
    });
    reporter
}
