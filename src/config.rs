use crate::{ModelId, ModelRegistry, DEFAULT_MAX_BATCH_ROWS};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::*;

/// Environment variable naming the config file when `--config` is not given.
pub const CONFIG_ENV: &str = "DHODH_CONFIG";

/// Settings shared by the web server and the command line tool.
///
/// ```toml
/// bind = "0.0.0.0:8501"
/// model_dir = "data/model_data"
/// default_model = "xgb_model"
/// log_level = "debug"
/// logo_path = "image/FINAL_malaria.png"
/// max_batch_rows = 5000
///
/// [models]
/// hgbr_model = "/srv/models/hgbr-2024.json"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub bind: String,
    pub model_dir: PathBuf,
    pub default_model: ModelId,
    pub log_level: String,
    pub logo_path: PathBuf,
    pub max_batch_rows: usize,
    /// Per-model artifact paths overriding `<model_dir>/<id>.json`.
    pub models: BTreeMap<String, PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            model_dir: PathBuf::from("data/model_data"),
            default_model: ModelId::default(),
            log_level: "info".to_string(),
            logo_path: PathBuf::from("image/FINAL_malaria.png"),
            max_batch_rows: DEFAULT_MAX_BATCH_ROWS,
            models: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).context("Invalid configuration")?;
        if config.max_batch_rows == 0 {
            bail!("max_batch_rows must be at least 1");
        }
        // Surface bad model overrides at startup rather than on first request.
        config.registry()?;
        Ok(config)
    }

    /// Load from `path`, or from `$DHODH_CONFIG`, or fall back to the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV).map(PathBuf::from),
        };
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_toml(&text)
                    .with_context(|| format!("Failed to load config file {}", path.display()))
            }
            None => {
                debug!("No config file given; using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Build the model registry, applying any `[models]` overrides.
    pub fn registry(&self) -> Result<ModelRegistry> {
        let overrides = self
            .models
            .iter()
            .map(|(name, path)| -> Result<(ModelId, PathBuf)> {
                let id: ModelId = name
                    .parse()
                    .with_context(|| format!("Unknown model '{name}' in [models]"))?;
                Ok((id, path.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        ModelRegistry::new(&self.model_dir)
            .with_paths(overrides)
            .map_err(anyhow::Error::msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(
            config.registry().unwrap().path(ModelId::Cat),
            Path::new("data/model_data/cat_model.json")
        );
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_toml(
            r#"
            bind = "0.0.0.0:8501"
            model_dir = "/srv/models"
            default_model = "xgb_model"
            max_batch_rows = 50

            [models]
            hgbr_model = "/opt/hgbr.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_model, ModelId::Xgb);
        assert_eq!(config.max_batch_rows, 50);
        let registry = config.registry().unwrap();
        assert_eq!(registry.path(ModelId::Hgbr), Path::new("/opt/hgbr.json"));
        assert_eq!(registry.path(ModelId::Lgbm), Path::new("/srv/models/lgbm_model.json"));
    }

    #[test]
    fn test_invalid_configs() {
        assert!(Config::from_toml("default_model = \"rf_model\"").is_err());
        assert!(Config::from_toml("colour = \"blue\"").is_err());
        assert!(Config::from_toml("max_batch_rows = 0").is_err());
        assert!(Config::from_toml("[models]\nrf_model = \"rf.json\"").is_err());
        // Two models may not share one artifact.
        assert!(Config::from_toml(
            "model_dir = \"m\"\n[models]\nxgb_model = \"m/cat_model.json\""
        )
        .is_err());
    }

    #[test]
    fn test_overrides_checked_together() {
        let config = Config::from_toml(
            r#"
            model_dir = "m"

            [models]
            cat_model = "m/xgb_model.json"
            xgb_model = "m/other.json"
            "#,
        )
        .unwrap();
        let registry = config.registry().unwrap();
        assert_eq!(registry.path(ModelId::Cat), Path::new("m/xgb_model.json"));
        assert_eq!(registry.path(ModelId::Xgb), Path::new("m/other.json"));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("dhodh-config-{}.toml", std::process::id()));
        std::fs::write(&path, "log_level = \"debug\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.log_level, "debug");
        std::fs::remove_file(&path).unwrap();

        assert!(Config::load(Some(Path::new("/nonexistent/dhodh.toml"))).is_err());
    }
}
