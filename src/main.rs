use anyhow::{Context, Result};
use clap::Parser;
use profile_stats::{GitHubClient, StatsFetcher, StatsRequest, TransportConfig};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "profile-stats",
    version = "0.1.0",
    about = "Aggregate GitHub profile statistics for a user"
)]
struct Args {
    /// GitHub username
    username: String,

    /// Count every commit via the commit search API
    #[arg(long)]
    include_all_commits: bool,

    /// Repository name to leave out of the star total (repeatable)
    #[arg(short, long = "exclude")]
    exclude: Vec<String>,

    /// Fetch merged pull request totals
    #[arg(long)]
    include_merged_prs: bool,

    /// Fetch discussion totals
    #[arg(long)]
    include_discussions: bool,

    /// Only count commit contributions from this year on
    #[arg(long)]
    commits_year: Option<i32>,
}

fn setup_tracing() {
    // Check if we should enable tokio-console
    if std::env::var("TOKIO_CONSOLE").is_ok() {
        console_subscriber::init();
        info!("tokio-console enabled on port 6669");
        return;
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,profile_stats=debug"));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();
    setup_tracing();

    let args = Args::parse();

    let transport_config = TransportConfig::from_env();
    if transport_config.token.is_none() {
        anyhow::bail!("GITHUB_TOKEN must be set");
    }

    let client =
        GitHubClient::new(&transport_config).context("Failed to build GitHub client")?;
    info!("Using GitHub API at {}", client.api_url());

    let fetcher = StatsFetcher::from_github(client);
    let request = StatsRequest::new(&args.username)
        .include_all_commits(args.include_all_commits)
        .exclude_repositories(args.exclude)
        .include_merged_prs(args.include_merged_prs)
        .include_discussions(args.include_discussions)
        .commits_year(args.commits_year);

    let record = match fetcher.fetch_stats(&request).await {
        Ok(record) => record,
        // Bad input, nothing was sent to GitHub
        Err(e) if !e.is_remote() => {
            error!("Rejected request for {}: {}", args.username, e);
            std::process::exit(2);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to fetch stats for {}", args.username))
        }
    };

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
