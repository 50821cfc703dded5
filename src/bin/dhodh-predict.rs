use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use dhodh_predictor::config::{Config, CONFIG_ENV};
use dhodh_predictor::report::{to_text_table, write_csv};
use dhodh_predictor::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::*;

#[derive(Parser)]
#[command(name = "dhodh-predict")]
#[command(about = "Predict PfDHODH inhibition (pIC50, IC50 nM) for SMILES strings", long_about = None)]
struct Cli {
    /// A single SMILES string
    #[arg(short, long, conflicts_with = "input")]
    smiles: Option<String>,

    /// File of SMILES strings, one per line, no header
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// cat_model, lgbm_model, xgb_model or hgbr_model (defaults to the configured model)
    #[arg(short, long)]
    model: Option<ModelId>,

    /// Config TOML file
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Also write the results as CSV
    #[arg(short, long, value_name = "CSV")]
    output: Option<PathBuf>,

    /// List the models and whether their artifacts exist, then exit
    #[arg(long, action = ArgAction::SetTrue)]
    list_models: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_logging(&config.log_level);

    let registry = config.registry()?;
    if cli.list_models {
        for (id, path) in registry.entries() {
            let status = if registry.is_available(id) { "available" } else { "missing" };
            println!("{id:<12} {:<22} {status:<10} {}", id.label(), path.display());
        }
        return Ok(());
    }

    let upload = match &cli.input {
        Some(path) => Some(
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => None,
    };
    if cli.smiles.is_none() && upload.is_none() {
        bail!("Give a SMILES string with --smiles or a file with --input");
    }

    let request = PredictionRequest {
        smiles: cli.smiles,
        upload,
        model: cli.model.unwrap_or(config.default_model),
    };
    let predictor = Predictor::new(Arc::new(ModelStore::new(registry)))
        .with_max_batch_rows(config.max_batch_rows);
    let report = predictor.predict(&request).map_err(|e| {
        error!("{e}");
        anyhow::Error::new(e).context(format!("Prediction with {} failed", request.model))
    })?;

    print!("{}", to_text_table(&report));

    if let Some(path) = &cli.output {
        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        write_csv(&report, BufWriter::new(file))?;
        info!("Wrote {} row(s) to {}", report.results.len(), path.display());
    }
    Ok(())
}
