use mosaic::cli::output::Output;
use mosaic::cli::{Cli, Commands};
use mosaic::research::{AgentEvent, EventCallback, ResearchOrchestrator};
use mosaic::tools::{ToolCatalog, ToolConnector};
use mosaic::utils::toml_config::{LoggingConfig, MosaicConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Credentials for the tool servers usually live in .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Err(e) = run(cli, output).await {
        output.error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Output) -> anyhow::Result<()> {
    let config = MosaicConfig::load(&cli.config)?;
    init_tracing(&config.logging, cli.verbose);
    tracing::debug!(config = %cli.config.display(), "Configuration loaded");

    let catalog = Arc::new(ToolCatalog::new(connector()));
    let source = config.tool_source();

    match cli.command {
        Commands::Run {
            query,
            stream,
            json,
        } => {
            if !json {
                output.banner();
            }
            let mut orchestrator = ResearchOrchestrator::from_config(&config, catalog)?;
            if stream {
                let callback: EventCallback = Arc::new(move |event: &AgentEvent| output.event(event));
                orchestrator = orchestrator.with_event_callback(callback);
            }

            let outcome = orchestrator.run(&query, &source, stream).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                output.report(&outcome);
            }
        }
        Commands::Tools => {
            if source.servers.is_empty() {
                output.warning("No tool servers configured");
                return Ok(());
            }
            let tools = catalog.get_tools(&source).await;
            output.header(&format!("{} tools", tools.len()));
            for tool in &tools {
                output.tool(tool.name(), tool.description());
            }
            if tools.is_empty() {
                output.warning("Discovery returned no tools; run with -v for details");
            }
        }
    }

    Ok(())
}

#[cfg(feature = "mcp")]
fn connector() -> Arc<dyn ToolConnector> {
    Arc::new(mosaic::tools::mcp::McpConnector::new())
}

#[cfg(not(feature = "mcp"))]
fn connector() -> Arc<dyn ToolConnector> {
    tracing::warn!("Built without the `mcp` feature; agents only get their built-in tools");
    Arc::new(mosaic::tools::StaticConnector::default())
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let default_level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mosaic={0},mosaic_research={0},warn", default_level)));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
