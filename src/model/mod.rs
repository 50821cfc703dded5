mod tree;
pub use tree::*;

use crate::{InputError, ModelLoadError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::*;

/// The fixed set of pre-trained models a user can pick from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModelId {
    #[default]
    #[serde(rename = "cat_model")]
    Cat,
    #[serde(rename = "lgbm_model")]
    Lgbm,
    #[serde(rename = "xgb_model")]
    Xgb,
    #[serde(rename = "hgbr_model")]
    Hgbr,
}

impl ModelId {
    pub const ALL: [ModelId; 4] = [ModelId::Cat, ModelId::Lgbm, ModelId::Xgb, ModelId::Hgbr];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Cat => "cat_model",
            ModelId::Lgbm => "lgbm_model",
            ModelId::Xgb => "xgb_model",
            ModelId::Hgbr => "hgbr_model",
        }
    }

    /// Human readable name of the learner behind the model.
    pub fn label(&self) -> &'static str {
        match self {
            ModelId::Cat => "CatBoost",
            ModelId::Lgbm => "LightGBM",
            ModelId::Xgb => "XGBoost",
            ModelId::Hgbr => "HistGradientBoosting",
        }
    }

    /// File name of the artifact inside the model directory.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl Display for ModelId {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelId::ALL
            .into_iter()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| InputError::UnknownModel(s.to_owned()))
    }
}

/// Where each model's artifact lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRegistry {
    paths: BTreeMap<ModelId, PathBuf>,
}

impl ModelRegistry {
    /// Every model at `<model_dir>/<id>.json`.
    pub fn new(model_dir: impl AsRef<Path>) -> Self {
        let model_dir = model_dir.as_ref();
        let paths = ModelId::ALL
            .into_iter()
            .map(|id| (id, model_dir.join(id.file_name())))
            .collect();
        Self { paths }
    }

    /// Point one model at a different file.
    pub fn with_path(self, id: ModelId, path: impl Into<PathBuf>) -> Result<Self, String> {
        self.with_paths([(id, path.into())])
    }

    /// Point several models at different files at once.
    ///
    /// The check runs on the final mapping, so one override may take a path
    /// another override moves away from. Fails if two models end up sharing a
    /// file: every model id must load its own artifact.
    pub fn with_paths(
        mut self,
        overrides: impl IntoIterator<Item = (ModelId, PathBuf)>,
    ) -> Result<Self, String> {
        self.paths.extend(overrides);
        let mut owners: HashMap<&Path, ModelId> = HashMap::new();
        for (&id, path) in &self.paths {
            if let Some(other) = owners.insert(path.as_path(), id) {
                return Err(format!(
                    "{other} and {id} cannot share the artifact {}",
                    path.display()
                ));
            }
        }
        Ok(self)
    }

    pub fn path(&self, id: ModelId) -> &Path {
        // Every id is inserted by `new`.
        &self.paths[&id]
    }

    pub fn entries(&self) -> impl Iterator<Item = (ModelId, &Path)> {
        self.paths.iter().map(|(id, path)| (*id, path.as_path()))
    }

    pub fn is_available(&self, id: ModelId) -> bool {
        self.path(id).is_file()
    }
}

/// Load and validate one artifact from disk.
pub fn load_model(id: ModelId, path: &Path) -> Result<TreeEnsemble, ModelLoadError> {
    if !path.is_file() {
        return Err(ModelLoadError::Missing {
            id,
            path: path.to_path_buf(),
        });
    }
    let corrupt = |reason: String| ModelLoadError::Corrupt {
        id,
        path: path.to_path_buf(),
        reason,
    };
    let json = std::fs::read_to_string(path).map_err(|e| corrupt(e.to_string()))?;
    let model = TreeEnsemble::from_json(&json).map_err(corrupt)?;
    info!(
        "Loaded {id} from {} ({} trees, {} features)",
        path.display(),
        model.trees.len(),
        model.n_features
    );
    Ok(model)
}

/// Process-wide model cache.
///
/// Each artifact is deserialized the first time it is requested and then shared
/// read-only between requests. Failed loads are not cached, so fixing a missing
/// file takes effect on the next request.
#[derive(Debug)]
pub struct ModelStore {
    registry: ModelRegistry,
    cache: RwLock<HashMap<ModelId, Arc<TreeEnsemble>>>,
}

impl ModelStore {
    pub fn new(registry: ModelRegistry) -> Self {
        Self {
            registry,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Get a model, loading it on first use.
    pub fn get(&self, id: ModelId) -> Result<Arc<TreeEnsemble>, ModelLoadError> {
        if let Some(model) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            trace!("Model cache hit for {id}");
            return Ok(model.clone());
        }

        // Load outside the lock; if two requests race, the first insert wins.
        let loaded = Arc::new(load_model(id, self.registry.path(id))?);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(cache.entry(id).or_insert(loaded).clone())
    }

    pub fn is_cached(&self, id: ModelId) -> bool {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    /// Drop one model so the next request reloads it from disk.
    pub fn evict(&self, id: ModelId) -> bool {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    pub fn clear(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
