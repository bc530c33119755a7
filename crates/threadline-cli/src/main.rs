use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use threadline_core::{load_config, AnalysisOutcome, Pipeline, ThreadlineConfig};
use threadline_provider::GeminiFactory;
use threadline_schema::AnalyzeRequest;
use threadline_server::state::AppState;
use threadline_store::{AnalysisStore, SqliteStore};

const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Parser)]
#[command(
    name = "threadline",
    version,
    about = "Turn exported group chats into topics and thread summaries"
)]
struct Cli {
    #[arg(long, default_value = "threadline.yaml", help = "Path to the YAML config file")]
    config: PathBuf,

    #[arg(long, default_value = "data", help = "Directory for log files")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Start the HTTP API server")]
    Serve {
        #[arg(long, help = "Bind address, overrides server.bind")]
        bind: Option<String>,
    },
    #[command(about = "Analyze an exported chat file and print the result as JSON")]
    Analyze {
        #[arg(help = "Path to the exported chat (.txt)")]
        file: PathBuf,
        #[arg(long, help = "Gemini API key (defaults to $GEMINI_API_KEY)")]
        api_key: Option<String>,
        #[arg(long, help = "Only analyze the most recent month of messages")]
        only_last_month: bool,
        #[arg(long, help = "Persist the result to the configured store")]
        save: bool,
    },
    #[command(about = "Print a saved analysis by id or share id")]
    Show {
        #[arg(help = "Analysis id or share id")]
        key: String,
    },
    #[command(about = "Validate the config file")]
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = cli.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "threadline.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = load_config(&cli.config)?;

    match command {
        Commands::Validate => {
            let prompts = config.prompts.resolve()?;
            println!(
                "Config valid. model {}, batch size {}, prompts {}, persistence {}.",
                config.provider.model,
                config.pipeline.batch_size,
                prompts.version,
                if config.persistence.enabled {
                    config.persistence.path.as_str()
                } else {
                    "disabled"
                }
            );
        }
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let persist = config.persistence.enabled;
            let pipeline = build_pipeline(config, persist)?;
            threadline_server::serve(AppState::new(pipeline), &bind).await?;
        }
        Commands::Analyze {
            file,
            api_key,
            only_last_month,
            save,
        } => {
            let api_key = api_key
                .or_else(|| std::env::var(API_KEY_ENV).ok())
                .unwrap_or_default();
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("reading chat export {}", file.display()))?;
            let mut request = AnalyzeRequest::new(content, api_key);
            if only_last_month {
                request = request.with_only_last_month(true);
            }

            tracing::info!(file = %file.display(), only_last_month, save, "analyzing chat export");
            let pipeline = build_pipeline(config, save)?;
            let outcome = pipeline.analyze(&request).await;
            println!("{}", serde_json::to_string_pretty(&outcome_json(&outcome)?)?);
            if !outcome.is_success() {
                return Err(anyhow!("analysis failed with status {}", outcome.status_code()));
            }
        }
        Commands::Show { key } => {
            let store = open_store(&config)?;
            let record = match store.get_by_id(&key).await? {
                Some(record) => Some(record),
                None => store.get_by_share_id(&key).await?,
            };
            let record = record.ok_or_else(|| anyhow!("no analysis found for {key}"))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}

fn build_pipeline(config: ThreadlineConfig, persist: bool) -> Result<Pipeline> {
    let factory = GeminiFactory::new(
        config.provider.base_url.clone(),
        config.provider.timeout(),
        config.provider.digest_model.clone(),
    );
    let store = if persist {
        Some(open_store(&config)?)
    } else {
        None
    };
    let mut pipeline = Pipeline::new(config, Arc::new(factory))?;
    if let Some(store) = store {
        pipeline = pipeline.with_store(store);
    }
    Ok(pipeline)
}

/// Body a client of the HTTP endpoint would receive for `outcome`.
fn outcome_json(outcome: &AnalysisOutcome) -> serde_json::Result<serde_json::Value> {
    match outcome {
        AnalysisOutcome::BadRequest(body) | AnalysisOutcome::ServerError(body) => {
            serde_json::to_value(body)
        }
        AnalysisOutcome::Empty(result) | AnalysisOutcome::Completed(result) => {
            serde_json::to_value(result)
        }
    }
}

fn open_store(config: &ThreadlineConfig) -> Result<Arc<SqliteStore>> {
    let path = Path::new(&config.persistence.path);
    Ok(Arc::new(SqliteStore::open(path)?))
}
