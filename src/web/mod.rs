//! The single-page web app and its JSON twin.
//!
//! | Route              | Purpose                                        |
//! |--------------------|------------------------------------------------|
//! | `GET /`            | input form                                     |
//! | `POST /predict`    | form submission, renders results or an alert   |
//! | `GET /api/models`  | model ids, labels and whether the file exists  |
//! | `POST /api/predict`| JSON request, JSON report                      |
//! | `GET /health`      | liveness                                       |

mod pages;
pub use pages::{escape_html, render_page, Outcome, PageContext};

use crate::{InputError, ModelId, PredictionError, PredictionReport, PredictionRequest, Predictor};
use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use tracing::*;

/// Largest request body accepted by the form and JSON endpoints.
pub const MAX_PAYLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Shared by every worker.
pub struct AppState {
    pub predictor: Predictor,
    pub default_model: ModelId,
    pub logo_png: Option<Vec<u8>>,
}

impl AppState {
    pub fn new(predictor: Predictor, default_model: ModelId) -> Self {
        Self {
            predictor,
            default_model,
            logo_png: None,
        }
    }

    pub fn with_logo(mut self, logo_png: Option<Vec<u8>>) -> Self {
        self.logo_png = logo_png;
        self
    }
}

/// Fields posted by the page, or sent as JSON to the API.
/// The upload is the text of the file, read by the browser.
#[derive(Debug, Default, Deserialize)]
pub struct PredictionInput {
    pub smiles: Option<String>,
    pub upload: Option<String>,
    pub model: Option<String>,
}

impl PredictionInput {
    fn into_request(self, default_model: ModelId) -> Result<PredictionRequest, InputError> {
        let model = match self.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            Some(name) => name.parse()?,
            None => default_model,
        };
        Ok(PredictionRequest {
            smiles: self.smiles,
            // The page always posts the hidden field, empty when no file was picked.
            upload: self
                .upload
                .filter(|upload| !upload.trim().is_empty())
                .map(String::into_bytes),
            model,
        })
    }
}

#[derive(Debug, Serialize)]
struct ModelInfo {
    id: ModelId,
    label: &'static str,
    available: bool,
    default: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

/// HTTP status for a request that could not be completed.
pub fn status_for(error: &PredictionError) -> StatusCode {
    match error {
        PredictionError::Input(_) => StatusCode::BAD_REQUEST,
        PredictionError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
        PredictionError::Inference(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// Run the pipeline on the blocking pool; model loading and tree walking are CPU bound.
async fn run_prediction(
    predictor: Predictor,
    request: PredictionRequest,
) -> Result<Result<PredictionReport, PredictionError>, BlockingError> {
    web::block(move || predictor.predict(&request)).await
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().limit(MAX_PAYLOAD_BYTES))
        .app_data(web::JsonConfig::default().limit(MAX_PAYLOAD_BYTES))
        .route("/", web::get().to(index))
        .route("/predict", web::post().to(predict_page))
        .route("/api/models", web::get().to(list_models))
        .route("/api/predict", web::post().to(predict_api))
        .route("/health", web::get().to(health));
}

fn page(state: &AppState, status: StatusCode, model: ModelId, smiles: &str, outcome: Outcome) -> HttpResponse {
    let context = PageContext {
        registry: state.predictor.store().registry(),
        selected_model: model,
        smiles,
        logo_png: state.logo_png.as_deref(),
    };
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(render_page(&context, outcome))
}

async fn index(state: web::Data<AppState>) -> impl Responder {
    page(&state, StatusCode::OK, state.default_model, "", Outcome::Nothing)
}

async fn predict_page(state: web::Data<AppState>, form: web::Form<PredictionInput>) -> impl Responder {
    let form = form.into_inner();
    let smiles = form.smiles.clone().unwrap_or_default();

    let request = match form.into_request(state.default_model) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected form submission: {e}");
            let message = e.to_string();
            return page(&state, StatusCode::BAD_REQUEST, state.default_model, &smiles, Outcome::Error(message));
        }
    };
    let model = request.model;

    match run_prediction(state.predictor.clone(), request).await {
        Ok(Ok(report)) => page(&state, StatusCode::OK, model, &smiles, Outcome::Report(&report)),
        Ok(Err(e)) => {
            error!("Prediction failed: {e}");
            page(&state, status_for(&e), model, &smiles, Outcome::Error(e.to_string()))
        }
        Err(e) => {
            error!("Prediction task did not complete: {e}");
            let message = "The prediction could not be completed; please try again".to_string();
            page(&state, StatusCode::INTERNAL_SERVER_ERROR, model, &smiles, Outcome::Error(message))
        }
    }
}

async fn list_models(state: web::Data<AppState>) -> impl Responder {
    let registry = state.predictor.store().registry();
    let models: Vec<ModelInfo> = registry
        .entries()
        .map(|(id, _)| ModelInfo {
            id,
            label: id.label(),
            available: registry.is_available(id),
            default: id == state.default_model,
        })
        .collect();
    HttpResponse::Ok().json(models)
}

fn error_json(status: StatusCode, kind: &'static str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorBody { kind, message })
}

async fn predict_api(state: web::Data<AppState>, input: web::Json<PredictionInput>) -> impl Responder {
    let request = match input.into_inner().into_request(state.default_model) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected API request: {e}");
            let e = PredictionError::from(e);
            return error_json(status_for(&e), e.kind(), e.to_string());
        }
    };

    match run_prediction(state.predictor.clone(), request).await {
        Ok(Ok(report)) => HttpResponse::Ok().json(report),
        Ok(Err(e)) => {
            error!("Prediction failed: {e}");
            error_json(status_for(&e), e.kind(), e.to_string())
        }
        Err(e) => {
            error!("Prediction task did not complete: {e}");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", e.to_string())
        }
    }
}

async fn health() -> impl Responder {
    HttpResponse::Ok().content_type("text/plain").body("ok")
}
