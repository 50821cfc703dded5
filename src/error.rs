use crate::{ModelId, SmilesError};
use std::path::PathBuf;
use thiserror::Error;

/// Problems with what the user submitted. Nothing is predicted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("No input provided: enter a SMILES string or upload a file of SMILES strings")]
    NoInput,
    #[error("The uploaded file is not valid UTF-8 text")]
    MalformedUpload,
    #[error("The uploaded file contains no SMILES strings")]
    EmptyUpload,
    #[error("Line {line} of the uploaded file has {columns} columns; expected a single column of SMILES strings")]
    TooManyColumns { line: usize, columns: usize },
    #[error("The uploaded file starts with a header row ('{0}'); remove it and upload SMILES strings only")]
    UnexpectedHeader(String),
    #[error("The batch has {rows} molecules; at most {limit} are accepted per request")]
    BatchTooLarge { rows: usize, limit: usize },
    #[error("Unknown model '{0}'")]
    UnknownModel(String),
}

/// The selected model could not be loaded. Nothing is predicted.
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("Model artifact for {id} not found at {}", path.display())]
    Missing { id: ModelId, path: PathBuf },
    #[error("Model artifact for {id} at {} could not be read: {reason}", path.display())]
    Corrupt {
        id: ModelId,
        path: PathBuf,
        reason: String,
    },
}

/// One molecule could not be turned into a feature vector.
/// The rest of the batch still goes ahead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeatureExtractionError {
    #[error("Invalid SMILES '{smiles}': {source}")]
    InvalidSmiles {
        smiles: String,
        #[source]
        source: SmilesError,
    },
}

/// The model could not score the extracted features.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("Model {model} expects {expected} features but the fingerprint has {actual}")]
    DimensionMismatch {
        model: ModelId,
        expected: usize,
        actual: usize,
    },
    #[error("Model {model} produced a non-finite prediction ({value}) for row {row}")]
    NonFinite {
        model: ModelId,
        row: usize,
        value: f64,
    },
}

/// Everything that can abort a prediction request.
#[derive(Error, Debug)]
pub enum PredictionError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PredictionError {
    /// Short machine-readable category, used by the JSON API.
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::Input(_) => "input_error",
            PredictionError::ModelLoad(_) => "model_load_error",
            PredictionError::Inference(_) => "inference_error",
        }
    }
}
