//! # HTTP service
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/` | GET | Browser front end for the endpoints below |
//! | `/api/process` | POST | Rewrite or analyze markdown against a guide |
//! | `/api/style-guides` | GET | List guide names |
//! | `/api/style-guides` | POST | Create or overwrite a guide |
//! | `/api/style-guides/{name}` | GET | Read one guide |
//! | `/api/preview` | POST | Render markdown to sanitized HTML |
//! | `/health` | GET | Liveness and configuration summary |
//!
//! Every failure, including unknown routes, is answered with
//! `{ "success": false, "error": "..." }`. See [`crate::error::AppError`] for
//! the status mapping.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::{
    api::{CompletionResult, LlmAdapter},
    config::ServiceConfig,
    error::{AppError, LlmError, StoreError},
    sanitize::sanitize,
    store::StyleGuideStore,
    template::PromptTemplates,
    validate::{ValidationReport, validate},
};

const INDEX_TEMPLATE: &str = include_str!("templates/index.html");

/// Everything a handler needs. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: StyleGuideStore,
    pub llm: LlmAdapter,
}

impl AppState {
    /// Wire up the store and the adapter from resolved configuration.
    ///
    /// A missing API key is not an error: the adapter is left uninitialized
    /// and a warning is logged.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self, LlmError> {
        let templates = PromptTemplates::load(config.templates_dir.as_deref()).await?;
        let llm = match config.llm_settings() {
            Some(settings) => LlmAdapter::new(&settings, templates)?,
            None => {
                warn!("OpenAI API key not found. Please set OPENAI_API_KEY in your environment.");
                LlmAdapter::uninitialized(templates)
            }
        };

        Ok(Self {
            store: StyleGuideStore::new(config.style_guides_dir.clone()),
            llm,
        })
    }
}

pub type SharedState = Arc<AppState>;

/// What `/api/process` should do with the markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[default]
    Process,
    Analyze,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProcessRequest {
    pub markdown_content: Option<String>,
    pub style_guide_name: Option<String>,
    pub action: Action,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateStyleGuideRequest {
    pub name: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PreviewRequest {
    pub markdown_content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub validation: ValidationReport,
    pub tokens_used: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub openai_configured: bool,
    pub style_guides_count: usize,
}

/// Build the router with all endpoints and the JSON fallbacks.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/process", post(process_markdown))
        .route(
            "/api/style-guides",
            get(list_style_guides).post(create_style_guide),
        )
        .route("/api/style-guides/{name}", get(get_style_guide))
        .route("/api/preview", post(preview_markdown))
        .route("/health", get(health_check))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
}

/// Serve on an already bound listener until the process exits.
pub async fn serve(listener: TcpListener, state: SharedState) -> std::io::Result<()> {
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}

async fn index(State(state): State<SharedState>) -> Result<Html<String>, AppError> {
    let names = state.store.list().await?;
    Ok(Html(render_index(&names)))
}

async fn process_markdown(
    State(state): State<SharedState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ProcessResponse>, AppError> {
    let request: ProcessRequest = decode_body(payload)?;

    let content = required(request.markdown_content, "No markdown content provided")?;
    let guide_name = required(request.style_guide_name, "No style guide selected")?;

    let style_guide = state
        .store
        .load(&guide_name)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => {
                AppError::NotFound(format!("Style guide \"{guide_name}\" not found"))
            }
            other => AppError::Store(other),
        })?;

    let validation = validate(&content);
    debug!(
        "Processing {} lines with guide '{}' ({:?})",
        validation.line_count, guide_name, request.action
    );

    let result = match request.action {
        Action::Process => state.llm.rewrite(&content, &style_guide).await?,
        Action::Analyze => state.llm.analyze(&content, &style_guide).await?,
    };

    match result {
        CompletionResult::Success { text, tokens_used } => {
            let (processed_content, analysis) = match request.action {
                Action::Process => (Some(text), None),
                Action::Analyze => (None, Some(text)),
            };
            Ok(Json(ProcessResponse {
                success: true,
                validation,
                tokens_used,
                processed_content,
                analysis,
            }))
        }
        CompletionResult::Failure { message } => Err(AppError::Upstream(message)),
    }
}

async fn list_style_guides(State(state): State<SharedState>) -> Result<Response, AppError> {
    let names = state.store.list().await?;
    Ok(Json(json!({ "success": true, "style_guides": names })).into_response())
}

async fn get_style_guide(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let content = state.store.load(&name).await.map_err(|e| match e {
        StoreError::NotFound(_) => AppError::NotFound("Style guide not found".to_string()),
        other => AppError::Store(other),
    })?;
    Ok(Json(json!({ "success": true, "content": content })).into_response())
}

async fn create_style_guide(
    State(state): State<SharedState>,
    payload: Result<Json<CreateStyleGuideRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(rejection_to_error)?;

    let (name, content) = match (non_blank(request.name), non_blank(request.content)) {
        (Some(name), Some(content)) => (name, content),
        _ => {
            return Err(AppError::InvalidInput(
                "Name and content are required".to_string(),
            ));
        }
    };

    let saved_as = state.store.save(&name, &content).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Style guide created successfully",
        "name": saved_as,
    }))
    .into_response())
}

async fn preview_markdown(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let request: PreviewRequest = decode_body(payload)?;
    let content = required(request.markdown_content, "No markdown content provided")?;

    Ok(Json(json!({
        "success": true,
        "html": sanitize(&content),
        "validation": validate(&content),
    }))
    .into_response())
}

async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        openai_configured: state.llm.is_configured(),
        style_guides_count: state.store.count().await,
    })
}

async fn not_found() -> Response {
    AppError::NotFound("Resource not found".to_string()).into_response()
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "success": false, "error": "Method not allowed" })),
    )
        .into_response()
}

/// Parse a request body, treating `null` and `{}` as no body at all.
fn decode_body<T: DeserializeOwned>(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<T, AppError> {
    let Json(value) = payload.map_err(rejection_to_error)?;
    if value.is_null() || value.as_object().is_some_and(|fields| fields.is_empty()) {
        return Err(AppError::InvalidInput("No data provided".to_string()));
    }
    serde_json::from_value(value).map_err(|e| AppError::InvalidInput(e.to_string()))
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonDataError(err) => AppError::InvalidInput(err.body_text()),
        _ => AppError::InvalidInput("No data provided".to_string()),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    non_blank(value).ok_or_else(|| AppError::InvalidInput(message.to_string()))
}

fn render_index(names: &[String]) -> String {
    let options = names
        .iter()
        .map(|name| {
            let name = ammonia::clean_text(name);
            format!("<option value=\"{name}\">{name}</option>")
        })
        .collect::<Vec<_>>()
        .join("\n          ");

    INDEX_TEMPLATE.replace("{{guide_options}}", &options)
}
