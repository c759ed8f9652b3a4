/// CLI и API сервер для экспериментов с осадками

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use settlement_ml::{
    server::{self, AppState},
    Experiment, ExperimentConfig, ExperimentReport,
};

#[derive(Parser)]
#[command(name = "settlement-ml")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "LSTM forecasting of ground-settlement measurements")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an experiment described by a JSON config
    Run {
        /// Experiment config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Built-in preset when no config is given (settlement, settlement-deep)
        #[arg(long, default_value = "settlement")]
        preset: String,

        /// Override dataset CSV
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Override artifact directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start the HTTP API
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(short, long, default_value = "8000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "settlement_ml=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            preset,
            data,
            output,
        } => {
            let mut config = match config {
                Some(path) => ExperimentConfig::from_file(path)?,
                None => preset_config(&preset)?,
            };
            if data.is_some() {
                config.dataset = data;
            }
            if output.is_some() {
                config.artifact_dir = output;
            }

            let report = tokio::task::spawn_blocking(move || -> settlement_ml::Result<ExperimentReport> {
                Experiment::new(config)?.run_from_dataset()
            })
            .await??;

            println!("Test RMSE: {:.8}", report.rmse);
            if let Some(artifacts) = &report.artifacts {
                println!(
                    "Saved {} and {}",
                    artifacts.architecture.display(),
                    artifacts.weights.display()
                );
            }
        }
        Commands::Serve { host, port } => server::serve(&host, port, AppState::default()).await?,
    }

    Ok(())
}

fn preset_config(name: &str) -> anyhow::Result<ExperimentConfig> {
    match name {
        "settlement" => Ok(ExperimentConfig::settlement()),
        "settlement-deep" => Ok(ExperimentConfig::settlement_deep()),
        other => anyhow::bail!("unknown preset '{}'", other),
    }
}
