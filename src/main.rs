use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use clap::Parser;
use dhodh_predictor::config::{Config, CONFIG_ENV};
use dhodh_predictor::web::{configure, AppState};
use dhodh_predictor::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::*;

#[derive(Parser)]
#[command(name = "dhodh-web")]
#[command(about = "MalariaDHODHPredicter: web app for PfDHODH bioactivity prediction", long_about = None)]
struct Cli {
    /// Config TOML file
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8501
    #[arg(short, long)]
    bind: Option<String>,

    /// Directory holding <model_id>.json artifacts
    #[arg(long, value_name = "DIR")]
    model_dir: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,
}

fn read_logo(path: &Path) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!("Logo {} not loaded: {e}", path.display());
            None
        }
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(model_dir) = cli.model_dir {
        config.model_dir = model_dir;
    }
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level;
    }
    init_logging(&config.log_level);

    let registry = config.registry()?;
    for (id, path) in registry.entries() {
        if registry.is_available(id) {
            info!("{id} ({}) at {}", id.label(), path.display());
        } else {
            warn!("{id} ({}) missing at {}; requests for it will fail", id.label(), path.display());
        }
    }

    let predictor = Predictor::new(Arc::new(ModelStore::new(registry)))
        .with_max_batch_rows(config.max_batch_rows);
    let state = web::Data::new(
        AppState::new(predictor, config.default_model).with_logo(read_logo(&config.logo_path)),
    );

    info!("Listening on http://{}", config.bind);
    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(&config.bind)
        .with_context(|| format!("Failed to bind {}", config.bind))?
        .run()
        .await
        .context("Server error")
}
