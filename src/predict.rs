use crate::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::*;

/// Default cap on molecules per request.
pub const DEFAULT_MAX_BATCH_ROWS: usize = 10_000;

/// What the user asked for: typed SMILES and/or an uploaded file, and a model.
#[derive(Debug, Clone, Default)]
pub struct PredictionRequest {
    pub smiles: Option<String>,
    pub upload: Option<Vec<u8>>,
    pub model: ModelId,
}

/// One successfully scored molecule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub row: usize,
    pub smiles: String,
    pub formula: String,
    pub heavy_atoms: usize,
    pub pic50: f64,
    pub ic50_nm: f64,
}

/// A molecule that could not be fingerprinted, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    pub row: usize,
    pub smiles: String,
    pub reason: String,
}

impl RowFailure {
    fn new(record: &MoleculeRecord, error: &FeatureExtractionError) -> Self {
        Self {
            row: record.row,
            smiles: record.smiles.clone(),
            reason: error.to_string(),
        }
    }
}

/// The outcome of one request. Every submitted molecule appears exactly once,
/// either in `results` or in `failures`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    pub model: ModelId,
    pub results: Vec<PredictionResult>,
    pub failures: Vec<RowFailure>,
}

impl PredictionReport {
    pub fn submitted(&self) -> usize {
        self.results.len() + self.failures.len()
    }
}

/// A molecule that made it through feature extraction.
struct Featurized {
    record: MoleculeRecord,
    molecule: Molecule,
    fingerprint: FingerprintVector,
}

/// Fingerprint every record, splitting the batch into usable rows and failures.
fn extract_features(records: Vec<MoleculeRecord>) -> (Vec<Featurized>, Vec<RowFailure>) {
    let mut featurized = Vec::with_capacity(records.len());
    let mut failures = Vec::new();
    for record in records {
        let parsed = Molecule::from_smiles(&record.smiles).map_err(|source| {
            FeatureExtractionError::InvalidSmiles {
                smiles: record.smiles.clone(),
                source,
            }
        });
        match parsed {
            Ok(molecule) => {
                let fingerprint = atom_pair_fingerprint(&molecule);
                debug!(
                    "Row {}: {} bits set for {}",
                    record.row,
                    fingerprint.count_ones(),
                    record.smiles
                );
                featurized.push(Featurized {
                    record,
                    molecule,
                    fingerprint,
                });
            }
            Err(error) => {
                warn!("Row {}: {error}", record.row);
                failures.push(RowFailure::new(&record, &error));
            }
        }
    }
    (featurized, failures)
}

/// Score fingerprints with `model`. Any dimension mismatch fails the whole batch.
pub fn infer(
    id: ModelId,
    model: &TreeEnsemble,
    rows: &[(usize, &FingerprintVector)],
) -> Result<Vec<f64>, InferenceError> {
    if let Some((_, fingerprint)) = rows.iter().find(|(_, fp)| fp.len() != model.n_features) {
        return Err(InferenceError::DimensionMismatch {
            model: id,
            expected: model.n_features,
            actual: fingerprint.len(),
        });
    }
    rows.iter()
        .map(|(row, fingerprint)| {
            let value = model.predict_row(fingerprint.as_slice());
            if value.is_finite() {
                Ok(value)
            } else {
                Err(InferenceError::NonFinite {
                    model: id,
                    row: *row,
                    value,
                })
            }
        })
        .collect()
}

/// Runs the whole pipeline: input → fingerprints → model → pIC50/IC50.
#[derive(Debug, Clone)]
pub struct Predictor {
    store: Arc<ModelStore>,
    max_batch_rows: usize,
}

impl Predictor {
    pub fn new(store: Arc<ModelStore>) -> Self {
        Self {
            store,
            max_batch_rows: DEFAULT_MAX_BATCH_ROWS,
        }
    }

    pub fn with_max_batch_rows(mut self, max_batch_rows: usize) -> Self {
        self.max_batch_rows = max_batch_rows;
        self
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionReport, PredictionError> {
        let records = resolve_input(
            request.smiles.as_deref(),
            request.upload.as_deref(),
            self.max_batch_rows,
        )?;
        info!(
            "Predicting {} molecule(s) with {}",
            records.len(),
            request.model
        );

        let model = self.store.get(request.model)?;
        let (featurized, failures) = extract_features(records);

        let rows: Vec<(usize, &FingerprintVector)> = featurized
            .iter()
            .map(|f| (f.record.row, &f.fingerprint))
            .collect();
        let predictions = infer(request.model, &model, &rows)?;

        let results = featurized
            .iter()
            .zip(predictions)
            .map(|(f, pic50)| PredictionResult {
                row: f.record.row,
                smiles: f.record.smiles.clone(),
                formula: f.molecule.formula(),
                heavy_atoms: f.molecule.heavy_atom_count(),
                pic50,
                ic50_nm: pic50_to_ic50_nm(pic50),
            })
            .collect::<Vec<_>>();

        info!(
            "{} prediction(s), {} failed row(s) with {}",
            results.len(),
            failures.len(),
            request.model
        );
        Ok(PredictionReport {
            model: request.model,
            results,
            failures,
        })
    }
}
