//! CLI entry point for spacetravelling

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "spacetravelling")]
#[command(author = "Guilherme Cheng")]
#[command(version = "0.1.0")]
#[command(about = "A blog about space travel, powered by the Prismic CMS", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default _config.yml
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Generate static files
    #[command(alias = "g")]
    Generate,

    /// Serve the blog, rendering pages on demand
    #[command(alias = "s")]
    Server {
        /// Port to listen on (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// IP address to bind to (defaults to server.ip)
        #[arg(short, long)]
        ip: Option<String>,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,
    },

    /// Clean the public folder
    Clean,

    /// List the posts in the CMS
    List {
        /// Read from a content release or preview ref instead of the master ref
        #[arg(long = "ref")]
        reference: Option<String>,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "spacetravelling=debug,info"
    } else {
        "spacetravelling=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing blog in {:?}", target_dir);
            spacetravelling::commands::init::init_site(&target_dir)?;
            println!("Initialized blog in {:?}", target_dir);
        }

        Commands::Generate => {
            let blog = spacetravelling::Blog::new(&base_dir)?;
            tracing::info!("Generating static files...");
            blog.generate().await?;
            println!("Generated successfully!");
        }

        Commands::Server { port, ip, open } => {
            let blog = spacetravelling::Blog::new(&base_dir)?;
            let port = port.unwrap_or(blog.config.server.port);
            let ip = ip.unwrap_or_else(|| blog.config.server.ip.clone());

            tracing::info!("Starting server at http://{}:{}", ip, port);
            spacetravelling::server::start(&blog, &ip, port, open).await?;
        }

        Commands::Clean => {
            let blog = spacetravelling::Blog::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            blog.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { reference } => {
            let blog = spacetravelling::Blog::new(&base_dir)?;
            spacetravelling::commands::list::run(&blog, reference.as_deref()).await?;
        }

        Commands::Version => {
            println!("spacetravelling version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
