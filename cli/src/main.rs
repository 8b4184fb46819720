use anyhow::{bail, Context, Result};
use clap::Parser;
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::path::PathBuf;
use teamgrades::{
    fetch::NFLVERSE_PBP_URL,
    filter::{PlayFilter, SeasonType},
    firestore::{FirestoreStore, DEFAULT_DATABASE},
    publish::MemoryStore,
    DocumentStore, PbpDf, PublishEvent, Publisher, TeamGrades, DEFAULT_COLLECTION,
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Grade every team from play-by-play data")]
struct Args {
    /// Season to grade; repeat to combine seasons
    #[arg(short = 's', long = "season", default_value = "2024")]
    seasons: Vec<u16>,

    /// Play-by-play parquet file to grade instead of season files
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    file: Option<PathBuf>,

    /// Directory holding pbp_<season>.parquet files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Fail instead of downloading missing seasons
    #[arg(long)]
    no_download: bool,

    #[arg(long, default_value = NFLVERSE_PBP_URL)]
    download_url: String,

    #[arg(long, requires = "week_end")]
    week_start: Option<u16>,

    #[arg(long, requires = "week_start")]
    week_end: Option<u16>,

    /// Only grade plays of this season type (REG or POST)
    #[arg(long)]
    season_type: Option<SeasonType>,

    #[arg(long, default_value = DEFAULT_COLLECTION)]
    collection: String,

    #[arg(long, env = "FIRESTORE_PROJECT_ID")]
    project: Option<String>,

    #[arg(long, default_value = DEFAULT_DATABASE)]
    database: String,

    /// OAuth2 access token for Firestore
    #[arg(long, env = "FIRESTORE_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Print the grades and publish to an in-memory store only
    #[arg(long)]
    dry_run: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Set the default level based on verbosity
    let default_level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let config = ConfigBuilder::new()
        .add_filter_allow_str("teamgrades")
        .build();

    TermLogger::init(default_level, config, TerminalMode::Mixed, ColorChoice::Auto)?;

    let redacted = Args {
        token: args.token.as_ref().map(|_| "<redacted>".to_string()),
        ..args.clone()
    };
    log::trace!("Args {:#?}", redacted);

    println!("Fetching play-by-play data...");
    let plays = load_plays(&args)?;
    log::info!("Loaded {} plays", plays.height());

    let filter = run_filter(&args);
    let plays = if filter.is_empty() {
        plays
    } else {
        let filtered = plays.filter(filter.build())?;
        log::info!("{} plays after filtering", filtered.height());
        filtered
    };

    println!("Calculating grades...");
    let grades = teamgrades::grade_teams(&plays)?;
    let records = grades.records()?;

    if args.dry_run {
        println!("{}", *grades);
        let mut publisher = Publisher::new(MemoryStore::new(), args.collection.as_str());
        return finish(publish(&mut publisher, &records));
    }

    let project = args
        .project
        .clone()
        .context("A Firestore project is required (--project or FIRESTORE_PROJECT_ID)")?;
    let token = args
        .token
        .clone()
        .context("A Firestore access token is required (--token or FIRESTORE_ACCESS_TOKEN)")?;

    println!("Uploading to {}/{}...", project, args.collection);
    let store = FirestoreStore::new(project, args.database.as_str(), token)?;
    let mut publisher = Publisher::new(store, args.collection.as_str());
    finish(publish(&mut publisher, &records))
}

fn load_plays(args: &Args) -> Result<PbpDf> {
    if let Some(file) = &args.file {
        let plays = PbpDf::load(file).with_context(|| format!("Loading {}", file.display()))?;
        return Ok(plays);
    }

    let download_url = (!args.no_download).then_some(args.download_url.as_str());
    let plays = PbpDf::load_seasons(&args.seasons, &args.data_dir, download_url)?;
    Ok(plays)
}

fn run_filter(args: &Args) -> PlayFilter {
    let mut filter = PlayFilter::new();
    if let (Some(start), Some(end)) = (args.week_start, args.week_end) {
        filter = filter.week_range(start, end);
    }
    if let Some(season_type) = args.season_type {
        filter = filter.season_type(season_type);
    }
    filter
}

fn publish<S: DocumentStore>(
    publisher: &mut Publisher<S>,
    records: &[TeamGrades],
) -> Vec<String> {
    let report = publisher.publish_with(records, |event| {
        if let PublishEvent::Written(team) = event {
            println!("   -> Updated {}", team);
        }
    });
    report
        .failed
        .iter()
        .map(|(team, e)| format!("{}: {}", team, e))
        .collect()
}

fn finish(failures: Vec<String>) -> Result<()> {
    if !failures.is_empty() {
        bail!("{} team(s) failed to publish:\n{}", failures.len(), failures.join("\n"));
    }
    println!("Sync complete");
    Ok(())
}
