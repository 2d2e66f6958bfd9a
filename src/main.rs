use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use playlist_analytics::config::AnalysisConfig;
use playlist_analytics::keywords::TokenizerKind;
use playlist_analytics::models::{PlaylistRecord, PlaylistSortField, TrackRecord, TrackSortField};
use playlist_analytics::numeric::{format_duration_ms, format_large_number};
use playlist_analytics::observer::TracingObserver;
use playlist_analytics::progress::{format_duration, Progress};
use playlist_analytics::report::{build_report, Snapshot};
use playlist_analytics::safety::validate_output_path;
use playlist_analytics::store::{playlist_batches, IngestPolicy, Store};

const WRITE_BATCH_SIZE: usize = 10_000;

#[derive(Parser, Debug)]
#[command(name = "playlist-analytics")]
#[command(about = "Store crawled playlists and tracks in SQLite and report on them")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load JSON playlist and track dumps into the store
    Ingest(IngestArgs),

    /// Run every aggregation and print a summary
    Analyze(AnalyzeArgs),

    /// Print store-side summary counters
    Stats {
        db: PathBuf,
    },

    /// Print the top playlists or tracks straight from the store
    Top(TopArgs),

    /// Delete every stored playlist and track
    Clear {
        db: PathBuf,

        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Parser, Debug)]
struct IngestArgs {
    db: PathBuf,

    /// JSON array of playlist records
    #[arg(long, num_args = 1..)]
    playlists: Vec<PathBuf>,

    /// JSON array of track records
    #[arg(long, num_args = 1..)]
    tracks: Vec<PathBuf>,

    /// Overrides the config file's ingest_policy
    #[arg(long, value_enum)]
    policy: Option<IngestPolicy>,

    #[arg(long)]
    config: Option<PathBuf>,

    /// Hide progress bars, log plain lines instead
    #[arg(long)]
    log_only: bool,
}

#[derive(Parser, Debug)]
struct AnalyzeArgs {
    db: PathBuf,

    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the full report as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overrides min_cross_playlists
    #[arg(long)]
    min_cross: Option<usize>,

    /// Overrides the keyword tokenizer
    #[arg(long, value_enum)]
    tokenizer: Option<TokenizerKind>,

    /// Hide progress bars, log plain lines instead
    #[arg(long)]
    log_only: bool,
}

#[derive(Parser, Debug)]
struct TopArgs {
    db: PathBuf,

    #[arg(short, long, default_value_t = 10)]
    n: usize,

    /// Sort field; unrecognized names fall back to play_count (popularity for --tracks)
    #[arg(long)]
    by: Option<String>,

    /// Rank tracks instead of playlists
    #[arg(long)]
    tracks: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Ingest(args) => cmd_ingest(args),
        Command::Analyze(args) => cmd_analyze(args),
        Command::Stats { db } => cmd_stats(&db),
        Command::Top(args) => cmd_top(args),
        Command::Clear { db, yes } => cmd_clear(&db, yes),
    }
}

fn open_store(db: &Path) -> Result<Store> {
    Store::open(db).with_context(|| format!("Failed to open database {}", db.display()))
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse records in {}", path.display()))
}

fn cmd_ingest(args: IngestArgs) -> Result<()> {
    if args.playlists.is_empty() && args.tracks.is_empty() {
        bail!("Nothing to ingest: pass --playlists and/or --tracks");
    }

    let start = Instant::now();
    let progress = Progress::new(args.log_only);
    let config = AnalysisConfig::load(args.config.as_deref())?;
    let policy = args.policy.unwrap_or(config.ingest_policy);
    let mut store = open_store(&args.db)?;

    let spinner = progress.spinner("Reading record dumps");
    let mut playlists: Vec<PlaylistRecord> = Vec::new();
    for path in &args.playlists {
        playlists.extend(read_records::<PlaylistRecord>(path)?);
    }
    let mut tracks: Vec<TrackRecord> = Vec::new();
    for path in &args.tracks {
        tracks.extend(read_records::<TrackRecord>(path)?);
    }
    spinner.finish_with_message(format!(
        "Read {} playlists and {} tracks",
        playlists.len(),
        tracks.len()
    ));

    let total = playlists.len() as u64;
    let pb = progress.bar(total, "Writing playlists");
    let mut written = 0u64;
    for chunk in playlists.chunks(WRITE_BATCH_SIZE) {
        store.insert_playlists(chunk).context("Failed to write playlists")?;
        written += chunk.len() as u64;
        pb.inc(chunk.len() as u64);
        progress.log("playlists", written, total, WRITE_BATCH_SIZE as u64);
    }
    pb.finish_with_message(format!("Wrote {} playlists", playlists.len()));

    let total = tracks.len() as u64;
    let pb = progress.bar(total, "Writing tracks");
    let mut written = 0u64;
    for batch in playlist_batches(&tracks, WRITE_BATCH_SIZE) {
        store
            .insert_tracks(&batch, policy)
            .context("Failed to write tracks")?;
        written += batch.len() as u64;
        pb.inc(batch.len() as u64);
        progress.log("tracks", written, total, WRITE_BATCH_SIZE as u64);
    }
    pb.finish_with_message(format!("Wrote {} tracks", tracks.len()));

    info!(
        playlists = playlists.len(),
        tracks = tracks.len(),
        ?policy,
        elapsed = %format_duration(start.elapsed()),
        "Ingest complete"
    );
    Ok(())
}

fn cmd_analyze(args: AnalyzeArgs) -> Result<()> {
    if let Some(output) = &args.output {
        validate_output_path(output, &[args.db.as_path()])?;
    }

    let start = Instant::now();
    let progress = Progress::new(args.log_only);

    let mut config = AnalysisConfig::load(args.config.as_deref())?;
    if let Some(min_cross) = args.min_cross {
        config.min_cross_playlists = min_cross;
    }
    if let Some(tokenizer) = args.tokenizer {
        config.tokenizer = tokenizer;
    }

    let store = open_store(&args.db)?;
    let spinner = progress.spinner("Loading snapshot");
    let snapshot = Snapshot::load(&store).context("Failed to read records")?;
    spinner.finish_with_message(format!(
        "Loaded {} playlists and {} tracks",
        snapshot.playlists.len(),
        snapshot.tracks.len()
    ));

    let report = build_report(&snapshot, &config, &TracingObserver);
    report.print_summary();

    if let Some(output) = &args.output {
        report.write_to_file(output)?;
        info!(path = %output.display(), "Wrote report");
    }

    info!(elapsed = %format_duration(start.elapsed()), "Analysis complete");
    Ok(())
}

fn cmd_stats(db: &Path) -> Result<()> {
    let store = open_store(db)?;
    let s = store.summary().context("Failed to compute summary")?;

    println!("\n{:=<60}", "");
    println!("Store summary: {}", db.display());
    println!("{:=<60}", "");
    println!("  Playlists: {}", s.playlist_count);
    println!(
        "  Plays: {} total, {:.1} avg, {} max",
        format_large_number(s.total_play_count),
        s.avg_play_count,
        format_large_number(s.max_play_count)
    );
    println!(
        "  Subscriptions: {} total, {:.1} avg, {} max",
        format_large_number(s.total_subscribed_count),
        s.avg_subscribed_count,
        format_large_number(s.max_subscribed_count)
    );
    println!("  Track rows: {}", s.track_rows);
    println!("  Unique songs: {}", s.unique_songs);
    println!("  Artists: {}", s.unique_artists);
    println!("  Albums: {}", s.unique_albums);
    println!("  Avg duration: {}", format_duration_ms(s.avg_duration_ms as u64));
    println!("  Avg popularity: {:.1}", s.avg_popularity);
    println!("  Playlists with tracks: {}", s.playlists_with_tracks);
    println!("{:=<60}", "");
    Ok(())
}

fn cmd_top(args: TopArgs) -> Result<()> {
    let store = open_store(&args.db)?;
    let by = args.by.as_deref().unwrap_or("");

    if args.tracks {
        let field = TrackSortField::from(by);
        let tracks = store.get_top_tracks(args.n, field)?;
        println!("Top {} tracks by {}:", tracks.len(), field.column());
        for (i, t) in tracks.iter().enumerate() {
            println!(
                "  {:>3}. {} - {} [{}] popularity {} (playlist {})",
                i + 1,
                t.name,
                t.artist,
                format_duration_ms(t.duration_ms),
                t.popularity,
                t.playlist_id
            );
        }
    } else {
        let field = PlaylistSortField::from(by);
        let playlists = store.get_top_playlists(args.n, field)?;
        println!("Top {} playlists by {}:", playlists.len(), field.column());
        for (i, p) in playlists.iter().enumerate() {
            println!(
                "  {:>3}. {} ({}) - {}",
                i + 1,
                p.name,
                p.creator_name,
                format_large_number(field.value(p))
            );
        }
    }
    Ok(())
}

fn cmd_clear(db: &Path, yes: bool) -> Result<()> {
    if !yes {
        bail!("Refusing to clear {} without --yes", db.display());
    }
    let mut store = open_store(db)?;
    store.clear_all().context("Failed to clear store")?;
    println!("Cleared {}", db.display());
    Ok(())
}
