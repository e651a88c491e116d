//! Demo host shell: replays a sequence of page visits against a real
//! storefront and prints the rendered recently viewed section markup.

use clap::Parser;
use clap::ValueEnum;
use lb_core::WidgetError;
use lb_core::WidgetResult;
use lb_net::HttpStorefrontClient;
use lb_net::StorefrontBase;
use lb_storage::FileSessionStore;
use lb_storage::MemorySessionStore;
use lb_storage::SessionStore;
use lb_widget::FetchStrategy;
use lb_widget::HostSection;
use lb_widget::RecentlyViewedTracker;
use lb_widget::WidgetConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "lookback-widget",
    version,
    about = "Render a recently viewed products section for a storefront"
)]
struct Cli {
    /// Storefront base URL, e.g. https://shop.example.com
    #[arg(long)]
    storefront: String,

    /// Page URLs visited this session, oldest first. The last one is the
    /// page the section is rendered for.
    #[arg(required = true)]
    pages: Vec<String>,

    /// Maximum number of products to display
    #[arg(long, default_value_t = lb_widget::DEFAULT_DISPLAY_LIMIT)]
    limit: usize,

    /// Section id passed to the storefront's section-render endpoint
    #[arg(long, default_value = lb_widget::DEFAULT_SECTION_ID)]
    section_id: String,

    /// How product display data is retrieved
    #[arg(long, value_enum, default_value_t = StrategyArg::Section)]
    strategy: StrategyArg,

    /// Session state file shared across runs; omitted, the session lives
    /// only for this run
    #[arg(long)]
    state_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// Capture a card fragment from the section-render endpoint
    Section,
    /// Fetch product JSON and render the local card template
    Json,
}

impl From<StrategyArg> for FetchStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Section => Self::SectionFragment,
            StrategyArg::Json => Self::ProductJson,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("lookback-widget: {error}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> WidgetResult<()> {
    let base = StorefrontBase::parse(&cli.storefront)?;
    let client = HttpStorefrontClient::new(base)?;

    let store: Box<dyn SessionStore> = match &cli.state_file {
        Some(path) => Box::new(FileSessionStore::new(path.clone())),
        None => Box::new(MemorySessionStore::default()),
    };

    let config = WidgetConfig {
        limit: cli.limit,
        section_id: cli.section_id.clone(),
        strategy: cli.strategy.into(),
        ..WidgetConfig::default()
    };

    let Some((current_page, earlier_pages)) = cli.pages.split_last() else {
        return Err(WidgetError::new(
            "app.pages_missing",
            "at least one page URL is required",
        ));
    };

    let tracker = RecentlyViewedTracker::new(config.clone(), store, client);
    for page in earlier_pages {
        tracker.record_visit(page);
    }

    let mut host = HostSection::with_defaults(&config.section_id, config.limit);
    tracker.run(current_page, &mut host).await;

    println!("{}", host.into_markup());
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
