use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use scriptgate::{
    config::AppConfig,
    engine::{
        Capabilities, DataSourceRegistry, ExecutionError, RequestParams, ServiceAnalyzer,
        ServiceExecutor,
    },
    http_server::{self, ApiState},
    initialization::InitializationService,
    loader::ScriptLoader,
    persistence::{InMemoryServiceRepository, ServiceRepository},
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Loads the configured services and starts the HTTP server.
    Serve {
        /// Directory holding `app.yaml`.
        #[arg(long, default_value = "configs")]
        config_dir: String,
    },
    /// Analyzes a script and prints the service it defines.
    Analyze {
        /// Script file to analyze.
        file: PathBuf,
    },
    /// Runs a script's handler once, without data sources.
    Run {
        /// Script file to run.
        file: PathBuf,
        /// Input parameters as a JSON object.
        #[arg(long, default_value = "{}")]
        params: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config_dir } => serve(&config_dir).await?,
        Commands::Analyze { file } => analyze(file)?,
        Commands::Run { file, params } => run_once(file, &params).await?,
    }

    Ok(())
}

async fn serve(config_dir: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!(config_dir = %config_dir, "Loading application configuration...");
    let config = Arc::new(AppConfig::new(Some(config_dir))?);
    tracing::debug!(listen_address = %config.server.listen_address, default_namespace = %config.server.default_namespace, "Configuration loaded.");

    let repo = Arc::new(InMemoryServiceRepository::new());

    tracing::debug!("Loading service scripts...");
    let initialization_service =
        InitializationService::new(&config, Arc::clone(&repo) as Arc<dyn ServiceRepository>);
    let summary = initialization_service.run().await?;
    tracing::info!(loaded = summary.loaded, failed = summary.failed, "Services initialized.");

    let state = ApiState::new(
        config,
        Arc::clone(&repo) as Arc<dyn ServiceRepository>,
        repo,
        Arc::new(DataSourceRegistry::new()),
    );
    http_server::run_server_from_config(state).await?;

    Ok(())
}

fn analyze(file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let script = ScriptLoader::read_script(file)?;
    let mut service = ServiceAnalyzer::default().analyze(&script.source)?;
    service.name = script.name;
    println!("{}", serde_json::to_string_pretty(&service)?);
    Ok(())
}

async fn run_once(file: PathBuf, params: &str) -> Result<(), Box<dyn std::error::Error>> {
    let script = ScriptLoader::read_script(file)?;
    let mut service = ServiceAnalyzer::default().analyze(&script.source)?;
    service.name = script.name;
    service.source = script.source;

    let values: serde_json::Map<String, serde_json::Value> = serde_json::from_str(params)?;
    let mut input = RequestParams::default();
    for name in service.path_params() {
        let value = values.get(name).map(scriptgate::engine::coercion::to_plain_string);
        input.path.insert(name.to_string(), value.unwrap_or_default());
    }
    input.values = values;

    let capabilities = Capabilities::detached(service.namespace.clone());
    match ServiceExecutor::default().invoke(Arc::new(service), input, capabilities).await {
        Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
        Err(e) => {
            for line in e.log() {
                eprintln!("{line}");
            }
            if let ExecutionError::Timeout(limit) = &e {
                tracing::warn!(limit = ?limit, "Script hit the execution timeout.");
            }
            return Err(e.into());
        }
    }

    Ok(())
}
