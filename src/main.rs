use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_litreview_mcp::config::LogFormat;
use rust_litreview_mcp::tools::{AcquireInput, AnalyzeInput, CiteInput, ExtractInput};
use rust_litreview_mcp::{
    AcquireTool, AnalyzeTool, CiteTool, Config, ConfigOverrides, ExtractTool, Server,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rust-litreview-mcp", version, about = "Literature review pipeline and MCP server")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Root directory for downloaded documents
    #[arg(long, global = true)]
    downloads_dir: Option<PathBuf>,

    /// Directory for the JSON outputs
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Skip the restricted-access fallback resolver
    #[arg(long, global = true)]
    no_fallback: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the MCP server on stdio
    Serve,
    /// Search a topic and download open-access documents
    Acquire {
        topic: String,
        #[arg(short = 'n', long)]
        count: Option<usize>,
        #[arg(long)]
        from_year: Option<i32>,
        #[arg(long)]
        to_year: Option<i32>,
    },
    /// Extract sections and keywords from acquired documents
    Extract {
        /// Defaults to the configured metadata file
        metadata_file: Option<PathBuf>,
    },
    /// Synthesize themes across extracted documents
    Analyze {
        /// Defaults to the configured extracted content file
        extracted_content_file: Option<PathBuf>,
    },
    /// Format citations for acquired documents
    Cite {
        #[arg(short, long, default_value = "APA")]
        style: String,
        metadata_file: Option<PathBuf>,
        #[arg(long)]
        include_abstract: bool,
    },
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    config.apply_overrides(&ConfigOverrides {
        downloads_directory: cli.downloads_dir,
        output_directory: cli.output_dir,
        log_level: cli.log_level,
        disable_fallback: cli.no_fallback,
    });
    init_tracing(&config);
    info!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = Arc::new(config);
    let output = match cli.command {
        Command::Serve => {
            Server::new_with_arc(config).run().await?;
            return Ok(());
        }
        Command::Acquire {
            topic,
            count,
            from_year,
            to_year,
        } => {
            AcquireTool::new(Arc::clone(&config))?
                .run(AcquireInput {
                    topic,
                    target_count: count,
                    from_year,
                    to_year,
                })
                .await
        }
        Command::Extract { metadata_file } => {
            let metadata_file = metadata_file.unwrap_or_else(|| config.output.metadata_file());
            ExtractTool::new(Arc::clone(&config))
                .run(ExtractInput { metadata_file })
                .await
        }
        Command::Analyze {
            extracted_content_file,
        } => {
            let extracted_content_file =
                extracted_content_file.unwrap_or_else(|| config.output.extracted_file());
            AnalyzeTool::new(Arc::clone(&config))
                .run(AnalyzeInput {
                    extracted_content_file,
                })
                .await
        }
        Command::Cite {
            style,
            metadata_file,
            include_abstract,
        } => {
            CiteTool::new()
                .run(CiteInput {
                    metadata_file: metadata_file.unwrap_or_else(|| config.output.metadata_file()),
                    style,
                    include_abstract,
                })
                .await
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    if output.get("error").is_some() {
        std::process::exit(1);
    }
    Ok(())
}
