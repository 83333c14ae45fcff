mod config;
mod config_watcher;

use agentmesh_gateway::GatewayServer;
use agentmesh_llm::LlmClient;
use agentmesh_orchestrator::{
    CapabilitySummarizer, McpConnector, Orchestrator, ProviderRegistry, Reasoner, ToolAgent,
};
use clap::{Parser, Subcommand, ValueEnum};
use config::MeshConfig;
use config_watcher::ConfigWatcher;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agentmesh", about = "agentmesh: route questions across MCP tool-agents")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "agentmesh.toml")]
    config: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Answer one question and exit
    Ask {
        question: String,
        /// Prior conversation to pass as context
        #[arg(long, default_value = "")]
        context: String,
    },
    /// Connect every configured provider and print its capability summary
    Providers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = MeshConfig::load(&cli.config).await?;
    let (registry, orchestrator) = build(&config).await;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let reload_registry = registry.clone();
            let runtime = tokio::runtime::Handle::current();
            let _watcher = ConfigWatcher::start(cli.config.clone(), 500, move |providers| {
                let registry = reload_registry.clone();
                runtime.spawn(async move {
                    registry.load(&providers).await;
                });
            })
            .inspect_err(|e| warn!(error = %e, "Config hot reload disabled"))
            .ok();

            let app = GatewayServer::build(orchestrator);
            let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
            info!("agentmesh gateway listening on {host}:{port}");

            let served = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await;

            registry.unload().await;
            info!("agentmesh gateway stopped");
            served?;
        }
        Commands::Ask { question, context } => {
            let answer = orchestrator.answer(&question, &context).await;
            registry.unload().await;
            let answer = answer?;
            info!(steps = answer.steps, failed = answer.failed_steps, "Question answered");
            println!("{}", answer.text);
        }
        Commands::Providers => {
            for descriptor in registry.descriptors().await {
                println!("{}", descriptor.to_block());
            }
            let configured = config.providers.len();
            let ready = registry.ready_names().await.len();
            if ready < configured {
                println!("{ready} of {configured} configured providers are ready");
            }
            registry.unload().await;
        }
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

/// Wires the language model, connector, registry and orchestrator, then
/// connects every configured provider.
async fn build(config: &MeshConfig) -> (Arc<ProviderRegistry>, Arc<Orchestrator>) {
    let llm = Arc::new(LlmClient::new(config.model.clone()));
    let reasoner: Arc<dyn Reasoner> = llm.clone();
    let settings = &config.orchestrator;

    let mut connector = McpConnector::new()
        .with_request_timeout(settings.request_timeout())
        .with_agent(ToolAgent::new(llm));
    if settings.summarize_capabilities {
        connector = connector.with_summarizer(
            CapabilitySummarizer::new(reasoner.clone()).with_timeout(settings.reasoning_timeout()),
        );
    }

    let registry = Arc::new(
        ProviderRegistry::new(Arc::new(connector)).with_connect_timeout(settings.connect_timeout()),
    );
    let report = registry.load(&config.providers).await;
    for failure in &report.failures {
        warn!(kind = failure.kind(), error = %failure, "Provider unavailable");
    }

    let orchestrator = Arc::new(Orchestrator::new(registry.clone(), reasoner, settings));
    (registry, orchestrator)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
