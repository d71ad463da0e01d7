use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use tripdata::{
    acquire::{self, RunContext},
    config::Config,
    fetch::{monthly_urls, HttpFetcher},
    query::{CountQuery, FilterValue},
    summary::{thousands, Summary},
};

#[derive(Parser)]
#[command(name = "tripdata")]
#[command(about = "Download monthly NYC taxi trip files and query them")]
#[command(version)]
struct Cli {
    /// YAML config file; flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory the Parquet files are written to and queried from
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch consecutive months and save them as Parquet
    Download(DownloadArgs),
    /// Count rows matching `column = value` across saved files
    Query(QueryArgs),
    /// Download, then query
    Run {
        #[command(flatten)]
        download: DownloadArgs,
        #[command(flatten)]
        query: QueryArgs,
    },
}

#[derive(Args)]
struct DownloadArgs {
    /// First month, YYYY-MM
    #[arg(long)]
    start: Option<String>,

    /// Number of months to fetch
    #[arg(long)]
    months: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Locator template containing `{month}`
    #[arg(long)]
    url_template: Option<String>,
}

#[derive(Args)]
struct QueryArgs {
    /// Column to filter on
    #[arg(long)]
    column: Option<String>,

    /// Value the column must equal
    #[arg(long)]
    equals: Option<String>,
}

impl DownloadArgs {
    fn apply(self, cfg: &mut Config) {
        if let Some(v) = self.start {
            cfg.start_month = v;
        }
        if let Some(v) = self.months {
            cfg.months = v;
        }
        if let Some(v) = self.timeout {
            cfg.timeout_secs = v;
        }
        if let Some(v) = self.url_template {
            cfg.url_template = v;
        }
    }
}

impl QueryArgs {
    fn apply(self, cfg: &mut Config) {
        if let Some(v) = self.column {
            cfg.query.column = v;
        }
        if let Some(v) = self.equals {
            cfg.query.equals = FilterValue::parse(&v);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        cfg.data_dir = dir;
    }

    match cli.command {
        Commands::Download(args) => {
            args.apply(&mut cfg);
            download(&cfg).await?;
        }
        Commands::Query(args) => {
            args.apply(&mut cfg);
            query(&cfg).await?;
        }
        Commands::Run { download: d, query: q } => {
            d.apply(&mut cfg);
            q.apply(&mut cfg);
            download(&cfg).await?;
            query(&cfg).await?;
        }
    }
    Ok(())
}

async fn download(cfg: &Config) -> Result<()> {
    cfg.validate()?;
    let template = cfg.template()?;
    let locators = monthly_urls(&template, &cfg.start_month, cfg.months)?;
    info!(
        months = cfg.months,
        start = %cfg.start_month,
        template = %template,
        dir = %cfg.data_dir.display(),
        "starting download"
    );

    let fetcher = HttpFetcher::new(cfg.timeout())?;
    let ctx = RunContext {
        data_dir: cfg.data_dir.clone(),
        locators,
    };
    let report = acquire::download_all(&ctx, &fetcher).await?;

    println!("{}", Summary::collect(&ctx.data_dir, report.total_rows)?);
    Ok(())
}

async fn query(cfg: &Config) -> Result<()> {
    let q = CountQuery::for_dir(&cfg.data_dir, cfg.query.column.clone(), cfg.query.equals.clone());
    let count = tokio::task::spawn_blocking(move || q.run()).await??;
    println!(
        "Rows where {} = {}: {}",
        cfg.query.column,
        cfg.query.equals,
        thousands(count)
    );
    Ok(())
}
