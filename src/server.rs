//! HTTP surface of the editor.
//!
//! JSON endpoints answer `{success: ...}` or `{error: ...}`; the browse
//! endpoints answer HTML fragments. Failures carry a matching status code:
//! 400 validation, 401 unauthenticated, 404 not found, 409 conflict,
//! 502/504 upstream failure.

pub mod extract;
pub mod html;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use tracing::error;
use tracing::warn;

use self::extract::JsonOrForm;
use self::extract::PrNumberInput;
use crate::App;
use crate::clients::github::MergeStrategy;
use crate::clients::github::VersionToken;
use crate::commands::ProposalFailure;
use crate::commands::ProposalRequest;
use crate::error::WorkflowError;

pub fn create_router(app: Arc<App>) -> Router {
    Router::new()
        .route("/auth", post(handle_auth))
        .route("/logout", post(handle_logout))
        .route("/test-token", get(handle_test_token).post(handle_test_token))
        .route("/commit", post(handle_commit))
        .route("/create-pr", post(handle_create_pr))
        .route("/merge-pr", post(handle_merge_pr))
        .route("/files", get(handle_files))
        .route("/file/{*path}", get(handle_file))
        .route("/prs", get(handle_prs))
        .with_state(app)
}

/// Serve until ctrl-c.
pub async fn serve(app: Arc<App>, listen_addr: SocketAddr) -> anyhow::Result<()> {
    let router = create_router(app.clone());

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {listen_addr}"))?;

    tracing::info!(
        %listen_addr,
        repository = %format!("{}/{}", app.config.owner, app.config.repo),
        "Editor listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

// -----------------------------------------------------------------------------
// Request types

#[derive(Debug, Deserialize)]
struct AuthBody {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitBody {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePrBody {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    base_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MergePrBody {
    #[serde(default)]
    pr_number: Option<PrNumberInput>,
    #[serde(default)]
    commit_title: Option<String>,
    #[serde(default)]
    commit_message: Option<String>,
    #[serde(default)]
    strategy: Option<String>,
}

// -----------------------------------------------------------------------------
// Handlers

/// `POST /auth`
async fn handle_auth(
    State(app): State<Arc<App>>,
    JsonOrForm(body): JsonOrForm<AuthBody>,
) -> Result<Json<Value>, ApiError> {
    app.authenticate(body.token.as_deref().unwrap_or_default())?;
    Ok(success("GitHub connected!"))
}

/// `POST /logout`
async fn handle_logout(State(app): State<Arc<App>>) -> Json<Value> {
    app.logout();
    success("Disconnected")
}

/// `GET|POST /test-token`
async fn handle_test_token(State(app): State<Arc<App>>) -> Result<Json<Value>, ApiError> {
    let login = app.test_token().await?;
    Ok(success(format!("Token works! Logged in as: {}", login)))
}

/// `POST /commit`
async fn handle_commit(
    State(app): State<Arc<App>>,
    JsonOrForm(body): JsonOrForm<CommitBody>,
) -> Result<Json<Value>, ApiError> {
    let content = required_content(body.content)?;
    let outcome = app
        .write_file(
            body.file_path.as_deref(),
            &content,
            body.sha.map(VersionToken),
        )
        .await?;

    Ok(Json(json!({
        "success": "Committed successfully!",
        "path": outcome.path,
        "sha": outcome.version,
    })))
}

/// `POST /create-pr`
async fn handle_create_pr(
    State(app): State<Arc<App>>,
    JsonOrForm(body): JsonOrForm<CreatePrBody>,
) -> Result<Json<Value>, ApiError> {
    let request = ProposalRequest {
        title: body.title,
        body: body.body,
        path: body.file_path,
        content: required_content(body.content)?,
        base_branch: body.base_branch,
    };
    let proposal = app.propose(&request).await?;
    let pr = proposal.pull_request;

    Ok(Json(json!({
        "success": format!("PR created: {}", pr.url),
        "url": pr.url,
        "number": pr.number,
        "branch": proposal.branch,
    })))
}

/// `POST /merge-pr`
async fn handle_merge_pr(
    State(app): State<Arc<App>>,
    JsonOrForm(body): JsonOrForm<MergePrBody>,
) -> Result<Json<Value>, ApiError> {
    // Unauthenticated wins over malformed input.
    app.session()?;
    let pr_number = match body.pr_number {
        Some(input) => input.into_number()?,
        None => None,
    };
    let strategy = match body.strategy.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(strategy) => strategy.parse::<MergeStrategy>()?,
        None => MergeStrategy::default(),
    };

    let merged = app
        .merge_pr(
            pr_number,
            body.commit_title.as_deref(),
            body.commit_message.as_deref(),
            strategy,
        )
        .await?;
    Ok(success(format!("PR #{} merged successfully!", merged)))
}

/// `GET /file/{*path}`
async fn handle_file(
    State(app): State<Arc<App>>,
    Path(path): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let file = app.read_file(&path).await?;
    Ok(Json(json!({
        "content": file.content,
        "path": file.path,
        "sha": file.version,
    })))
}

/// `GET /files`
async fn handle_files(State(app): State<Arc<App>>) -> Response {
    match app.list_files().await {
        Ok(entries) => Html(html::render_file_list(&entries)).into_response(),
        Err(e) => html_error("loading files", e),
    }
}

/// `GET /prs`
async fn handle_prs(State(app): State<Arc<App>>) -> Response {
    match app.list_pull_requests().await {
        Ok(prs) => Html(html::render_pull_requests(&prs)).into_response(),
        Err(e) => html_error("loading PRs", e),
    }
}

fn success(message: impl Into<String>) -> Json<Value> {
    Json(json!({ "success": message.into() }))
}

fn required_content(content: Option<String>) -> Result<String, WorkflowError> {
    content.ok_or_else(|| WorkflowError::validation("No content provided"))
}

fn html_error(context: &str, error: WorkflowError) -> Response {
    let status = status_for(&error);
    log_failure(status, &error);
    (status, Html(html::render_error(context, &error))).into_response()
}

// -----------------------------------------------------------------------------
// Error type

/// Workflow failure rendered as `{error: message}` with a matching status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

pub fn status_for(error: &WorkflowError) -> StatusCode {
    match error {
        WorkflowError::Unauthenticated => StatusCode::UNAUTHORIZED,
        WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
        WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::Conflict(_) => StatusCode::CONFLICT,
        WorkflowError::Remote(_) => StatusCode::BAD_GATEWAY,
        WorkflowError::Unreachable {
            timed_out: true, ..
        } => StatusCode::GATEWAY_TIMEOUT,
        WorkflowError::Unreachable { .. } => StatusCode::BAD_GATEWAY,
    }
}

fn log_failure(status: StatusCode, error: &WorkflowError) {
    if status.is_server_error() {
        error!(%status, error = %error, "request failed upstream");
    } else {
        warn!(%status, error = %error, "request rejected");
    }
}

impl From<WorkflowError> for ApiError {
    fn from(error: WorkflowError) -> Self {
        let status = status_for(&error);
        log_failure(status, &error);
        Self {
            status,
            body: json!({ "error": error.to_string() }),
        }
    }
}

impl From<ProposalFailure> for ApiError {
    fn from(failure: ProposalFailure) -> Self {
        let mut api_error = ApiError::from(failure.error);
        api_error.body["stage"] = json!(failure.stage.to_string());
        if let Some(branch) = failure.branch {
            api_error.body["branch"] = json!(branch);
        }
        api_error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
