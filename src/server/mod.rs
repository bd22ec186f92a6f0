
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::crawler::{CrawlLimits, scrape_site};
use crate::database::sqlite::Database;
use crate::database::sqlite::models::NewUploadRecord;
use crate::extractor::extract_text;
use crate::mailer::{Mailer, generate_script_tag};
use crate::otp::OtpGate;
use crate::pipeline::{ChatPipeline, IngestPipeline};
use crate::{DocativeError, Result};

/// Uploads are documents, not datasets; 25 MiB is plenty.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Everything the route handlers need, shared behind one `Arc`
pub struct AppState {
    pub ingest: IngestPipeline,
    pub chat: ChatPipeline,
    pub otp: OtpGate,
    pub mailer: Mailer,
    pub db: Database,
}

#[derive(Debug, Deserialize)]
struct EmailForm {
    email: String,
}

#[derive(Debug, Deserialize)]
struct VerifyOtpRequest {
    email: String,
    otp: String,
}

#[derive(Debug, Deserialize)]
struct SiteUploadForm {
    url: String,
    email: String,
    name: String,
    #[serde(default)]
    replace: bool,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    question: String,
    bot_id: String,
    #[serde(default)]
    history: Vec<crate::llm::ChatTurn>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    bot_id: Option<String>,
}

/// Error wrapper translating the crate taxonomy into HTTP responses
#[derive(Debug)]
pub struct ApiError(DocativeError);

impl From<DocativeError> for ApiError {
    fn from(err: DocativeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, bot_id) = match &self.0 {
            DocativeError::EmptyContent => {
                (StatusCode::BAD_REQUEST, "empty_content", None)
            }
            DocativeError::ExistingBot(bot_id) => {
                (StatusCode::CONFLICT, "existing_bot", Some(bot_id.clone()))
            }
            DocativeError::UnknownBot(_) => (StatusCode::NOT_FOUND, "unknown_bot", None),
            DocativeError::Embedding(_) => (StatusCode::BAD_GATEWAY, "embedding_failed", None),
            DocativeError::Model(_) | DocativeError::EmptyAnswer => {
                (StatusCode::BAD_GATEWAY, "model_failed", None)
            }
            DocativeError::Notification(_) => {
                // The upload itself already succeeded; only the email failed.
                (StatusCode::INTERNAL_SERVER_ERROR, "notification_failed", None)
            }
            DocativeError::Index(_)
            | DocativeError::Storage(_)
            | DocativeError::Config(_)
            | DocativeError::Io(_)
            | DocativeError::Other(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", None)
            }
        };

        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }

        let body = ErrorBody {
            error: code,
            message: self.0.to_string(),
            bot_id,
        };
        (status, Json(body)).into_response()
    }
}

/// Build the application router. CORS is wide open so the embedded widget
/// can call the API from any site.
#[inline]
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/send-otp", post(send_otp))
        .route("/verify-otp", post(verify_otp))
        .route("/check-existing-bot", post(check_existing_bot))
        .route("/upload", post(upload_document))
        .route("/upload-site", post(upload_site))
        .route("/chat", post(chat))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is terminated
#[inline]
pub async fn run_server(config: &Config, state: Arc<AppState>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .map_err(DocativeError::Io)?;

    info!("Listening on {}", config.server.bind);
    axum::serve(listener, router(state))
        .await
        .map_err(DocativeError::Io)?;

    Ok(())
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Chatbot API is live 🎉" }))
}

async fn send_otp(
    State(state): State<Arc<AppState>>,
    Form(form): Form<EmailForm>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let code = state.otp.issue(&form.email).await?;
    state.mailer.send_otp_email(&form.email, &code).await?;

    info!("OTP sent to email: {}", form.email);
    Ok(Json(serde_json::json!({
        "message": "OTP sent successfully",
        "email": form.email,
    })))
}

async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyOtpRequest>,
) -> std::result::Result<Json<serde_json::Value>, Response> {
    let verified = state
        .otp
        .verify(&request.email, &request.otp)
        .await
        .map_err(|e| ApiError::from(e).into_response())?;

    if !verified {
        warn!("Invalid OTP for email: {}", request.email);
        let body = ErrorBody {
            error: "invalid_otp",
            message: "Invalid or expired OTP".to_string(),
            bot_id: None,
        };
        return Err((StatusCode::BAD_REQUEST, Json(body)).into_response());
    }

    info!("OTP verified for email: {}", request.email);
    Ok(Json(serde_json::json!({
        "message": "OTP verified successfully",
        "email": request.email,
    })))
}

async fn check_existing_bot(
    State(state): State<Arc<AppState>>,
    Form(form): Form<EmailForm>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let bot_id = state.ingest.find_bot_for_owner(&form.email).await?;

    Ok(Json(serde_json::json!({
        "has_existing_bot": bot_id.is_some(),
        "bot_id": bot_id,
    })))
}

async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> std::result::Result<Json<serde_json::Value>, Response> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename = String::new();
    let mut email = String::new();
    let mut name = String::new();
    let mut replace = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request("invalid_multipart", &e.to_string()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request("invalid_multipart", &e.to_string()))?;
                file_bytes = Some(bytes.to_vec());
            }
            "email" => {
                email = field
                    .text()
                    .await
                    .map_err(|e| bad_request("invalid_multipart", &e.to_string()))?;
            }
            "name" => {
                name = field
                    .text()
                    .await
                    .map_err(|e| bad_request("invalid_multipart", &e.to_string()))?;
            }
            "replace" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| bad_request("invalid_multipart", &e.to_string()))?;
                replace = matches!(value.as_str(), "true" | "1" | "on");
            }
            other => {
                warn!("Ignoring unexpected multipart field: {}", other);
            }
        }
    }

    let Some(file_bytes) = file_bytes else {
        return Err(bad_request("missing_file", "no file field in the upload"));
    };
    if email.is_empty() || name.is_empty() {
        return Err(bad_request("missing_fields", "email and name are required"));
    }

    info!(
        "Processing upload for email: {}, name: {}, replace: {}",
        email, name, replace
    );

    require_verified(&state, &email).await?;

    let text = extract_text(&filename, &file_bytes)
        .map_err(|e| ApiError::from(DocativeError::Other(e)).into_response())?
        .ok_or_else(|| bad_request("unsupported_file", "Unsupported file type"))?;

    finish_upload(&state, &text, &email, &name, replace, &filename).await
}

async fn upload_site(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SiteUploadForm>,
) -> std::result::Result<Json<serde_json::Value>, Response> {
    info!(
        "Processing site upload for email: {}, url: {}, replace: {}",
        form.email, form.url, form.replace
    );

    require_verified(&state, &form.email).await?;

    let text = scrape_site(&form.url, &CrawlLimits::default())
        .await
        .map_err(|e| ApiError::from(DocativeError::Other(e)).into_response())?;

    finish_upload(
        &state,
        &text,
        &form.email,
        &form.name,
        form.replace,
        &form.url,
    )
    .await
}

/// Shared tail of both upload flows: ingest, record provenance, send the
/// embed script, and answer.
async fn finish_upload(
    state: &AppState,
    text: &str,
    email: &str,
    name: &str,
    replace: bool,
    source_name: &str,
) -> std::result::Result<Json<serde_json::Value>, Response> {
    let bot_id = state
        .ingest
        .ingest(text, email, name, replace)
        .await
        .map_err(|e| ApiError::from(e).into_response())?;

    // Best-effort provenance; a failed audit row never fails the upload.
    if let Err(e) = state
        .db
        .append_upload(NewUploadRecord {
            owner_email: email.to_string(),
            bot_id: bot_id.clone(),
            source_name: source_name.to_string(),
            display_name: name.to_string(),
        })
        .await
    {
        warn!("Failed to record upload for {}: {}", email, e);
    }

    let script_tag = generate_script_tag(&bot_id);

    // The bot exists at this point; an email failure is reported as its own
    // error class rather than undoing the ingestion.
    state
        .mailer
        .send_embed_script_email(email, &bot_id, name)
        .await
        .map_err(|e| ApiError::from(e).into_response())?;
    if let Err(e) = state
        .mailer
        .send_admin_notification(email, name, &bot_id, source_name)
        .await
    {
        warn!("Failed to send admin notification: {}", e);
    }

    Ok(Json(serde_json::json!({
        "email": email,
        "bot_id": bot_id,
        "name": name,
        "script_tag": script_tag,
        "message": "Embedding stored successfully and email sent",
    })))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    info!("Processing chat request for bot_id: {}", request.bot_id);

    let answer = state
        .chat
        .answer(&request.bot_id, &request.question, &request.history)
        .await?;

    Ok(Json(serde_json::json!({ "answer": answer })))
}

async fn require_verified(
    state: &AppState,
    email: &str,
) -> std::result::Result<(), Response> {
    let verified = state
        .otp
        .is_verified(email)
        .await
        .map_err(|e| ApiError::from(e).into_response())?;

    if !verified {
        warn!("Email not verified: {}", email);
        let body = ErrorBody {
            error: "email_not_verified",
            message: "Please verify your email address first".to_string(),
            bot_id: None,
        };
        return Err((StatusCode::FORBIDDEN, Json(body)).into_response());
    }

    Ok(())
}

fn bad_request(code: &'static str, message: &str) -> Response {
    let body = ErrorBody {
        error: code,
        message: message.to_string(),
        bot_id: None,
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}
