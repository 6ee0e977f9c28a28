// PromptDeck: Prompt-tool catalog with text generation
// License: Apache-2.0

use clap::{Parser, Subcommand};
use promptdeck::config::Config;
use promptdeck::generation::GenerationClient;
use promptdeck::metrics::Metrics;
use promptdeck::provider::factory::create_provider;
use promptdeck::service::ToolService;
use promptdeck::store::Store;
use promptdeck::web::{start_web_server, WebState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const LOGO: &str = "📝";

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "promptdeck",
    about = "PromptDeck: prompt-tool catalog with text generation",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server (default)
    Serve {
        /// Config file path
        #[arg(short, long)]
        config: Option<String>,
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Database file (overrides database.path)
        #[arg(long)]
        db: Option<String>,
    },
    /// Create the database schema
    #[command(name = "init-db")]
    InitDb {
        /// Config file path
        #[arg(short, long)]
        config: Option<String>,
        /// Database file (overrides database.path)
        #[arg(long)]
        db: Option<String>,
        /// Also load the demo catalog
        #[arg(long)]
        seed: bool,
    },
    /// Load the demo catalog (skipped when categories exist)
    Seed {
        /// Config file path
        #[arg(short, long)]
        config: Option<String>,
        /// Database file (overrides database.path)
        #[arg(long)]
        db: Option<String>,
    },
    /// Show configuration and database status
    Status {
        /// Config file path
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Show version information
    Version,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    promptdeck::logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Serve {
            config,
            host,
            port,
            db,
        }) => serve_cmd(config, host, port, db).await,
        Some(Commands::InitDb { config, db, seed }) => init_db_cmd(config, db, seed),
        Some(Commands::Seed { config, db }) => seed_cmd(config, db),
        Some(Commands::Status { config }) => status_cmd(config),
        Some(Commands::Version) => {
            version_cmd();
            Ok(())
        }
        None => serve_cmd(None, None, None, None).await,
    };

    if let Err(e) = result {
        eprintln!("{} Error: {:#}", LOGO, e);
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Serve command
// ---------------------------------------------------------------------------

async fn serve_cmd(
    config_path: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    db: Option<String>,
) -> anyhow::Result<()> {
    let mut cfg = load_config(config_path.as_deref());
    if let Some(h) = host {
        cfg.server.host = h;
    }
    if let Some(p) = port {
        cfg.server.port = p;
    }
    if let Some(d) = db {
        cfg.database.path = d;
    }
    cfg.validate()?;

    let store = Arc::new(open_store(&cfg)?);
    let provider = create_provider(&cfg)?;
    let generator = GenerationClient::new(
        provider,
        cfg.generation.configured_key(),
        Duration::from_secs(cfg.generation.timeout_secs),
    );
    if !generator.has_configured_key() {
        tracing::warn!("No server API key configured; generation needs a caller key or returns placeholder output");
    }

    let service = ToolService::new(
        store,
        Arc::new(generator),
        Metrics::new(),
        cfg.generation.default_model.clone(),
    );

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid listen address {}:{}: {}", cfg.server.host, cfg.server.port, e))?;
    println!("{} PromptDeck API listening on http://{}", LOGO, addr);

    start_web_server(addr, WebState::new(service)).await
}

// ---------------------------------------------------------------------------
// Database commands
// ---------------------------------------------------------------------------

fn init_db_cmd(config_path: Option<String>, db: Option<String>, seed: bool) -> anyhow::Result<()> {
    let mut cfg = load_config(config_path.as_deref());
    if let Some(d) = db {
        cfg.database.path = d;
    }

    let store = open_store(&cfg)?;
    println!("{} Schema ready at {}", LOGO, cfg.database_path()?.display());

    if seed {
        report_seed(&store)?;
    }
    Ok(())
}

fn seed_cmd(config_path: Option<String>, db: Option<String>) -> anyhow::Result<()> {
    let mut cfg = load_config(config_path.as_deref());
    if let Some(d) = db {
        cfg.database.path = d;
    }
    let store = open_store(&cfg)?;
    report_seed(&store)
}

fn report_seed(store: &Store) -> anyhow::Result<()> {
    let report = store.seed_demo_catalog()?;
    if report.skipped() {
        println!("{} Catalog already has categories, nothing seeded", LOGO);
    } else {
        println!(
            "{} Seeded {} categories and {} tools",
            LOGO, report.categories, report.tools
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Other commands
// ---------------------------------------------------------------------------

fn version_cmd() {
    println!("{} PromptDeck v{}", LOGO, promptdeck::VERSION);
    println!("  Built with Rust 🦀");
}

fn status_cmd(config_path: Option<String>) -> anyhow::Result<()> {
    println!("{} PromptDeck Status\n", LOGO);

    let cfg = load_config(config_path.as_deref());

    let path = config_path
        .map(PathBuf::from)
        .or_else(|| Config::default_path().ok())
        .unwrap_or_default();
    if path.exists() {
        println!("  Config:    ✅ {}", path.display());
    } else {
        println!("  Config:    ❌ Not found (using defaults)");
    }

    match cfg.validate() {
        Ok(()) => println!("  Valid:     ✅"),
        Err(e) => println!("  Valid:     ❌ {}", e),
    }

    println!("  Listen:    {}:{}", cfg.server.host, cfg.server.port);
    println!("  Model:     {}", cfg.generation.default_model);

    match cfg.generation.configured_key() {
        Some(_) => println!("  API key:   ✅ configured"),
        None => println!("  API key:   ❌ not set (placeholder output unless callers supply a key)"),
    }

    let db_path = cfg.database_path()?;
    if db_path.exists() {
        let store = Store::open(&db_path)?;
        println!(
            "  Database:  ✅ {} ({} categories, {} tools, {} runs)",
            db_path.display(),
            store.count_categories()?,
            store.count_tools()?,
            store.count_runs()?
        );
    } else {
        println!(
            "  Database:  ❌ {} (run 'promptdeck init-db --seed')",
            db_path.display()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_config(path: Option<&str>) -> Config {
    let config_path = if let Some(p) = path {
        PathBuf::from(p)
    } else {
        Config::default_path().unwrap_or_else(|_| PathBuf::from("config.json"))
    };

    Config::load(&config_path).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}, using defaults", e);
        Config::default()
    })
}

fn open_store(cfg: &Config) -> anyhow::Result<Store> {
    let path = cfg.database_path()?;
    let store = Store::open(&path)?;
    tracing::info!(path = %path.display(), "Database ready");
    Ok(store)
}
