use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::api::responses::{
    BranchRequest, BranchesResponse, CommitsResponse, CurrentBranchResponse, DiffQuery,
    DiffResponse, Failure, HealthResponse, LimitQuery, MessageResponse, StatusBody,
    StatusResponse,
};
use crate::error::GitError;
use crate::git::{
    DEFAULT_COMMIT_LIMIT, DEFAULT_FILE_HISTORY_LIMIT, DeleteOutcome, DiffScope, Repository,
    parse_limit,
};

pub struct AppState {
    pub repo: Repository,
}

impl AppState {
    pub fn new(repo: Repository) -> Arc<Self> {
        Arc::new(Self { repo })
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/branch/current", get(current_branch))
        .route("/api/branches", get(list_branches))
        .route("/api/branch/create", post(create_branch))
        .route("/api/branch/checkout", post(checkout_branch))
        .route("/api/branch/delete", post(delete_branch))
        .route("/api/commits", get(list_commits))
        .route("/api/status", get(get_status))
        .route("/api/diff", get(get_diff))
        .route("/api/log/*file", get(file_log))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API until Ctrl+C
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> std::io::Result<()> {
    let repo_path = state.repo.path().display().to_string();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, repo = %repo_path, "git API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
}

fn failure(operation: &str, error: &GitError) -> Failure {
    tracing::warn!(operation, error = %error, "request failed");
    Failure::from(error)
}

/// Malformed bodies are treated like a missing name
fn branch_name(body: Result<Json<BranchRequest>, JsonRejection>) -> String {
    match body {
        Ok(Json(request)) => request.name,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unreadable branch request body");
            String::new()
        }
    }
}

pub async fn current_branch(State(state): State<Arc<AppState>>) -> Json<CurrentBranchResponse> {
    let response = match state.repo.current_branch().await {
        Ok(Some(branch)) => CurrentBranchResponse {
            success: true,
            branch: Some(branch),
            detached: false,
            message: None,
        },
        Ok(None) => CurrentBranchResponse {
            success: true,
            branch: Some(String::new()),
            detached: true,
            message: None,
        },
        Err(e) => CurrentBranchResponse {
            success: false,
            branch: None,
            detached: false,
            message: Some(failure("current_branch", &e).message),
        },
    };
    Json(response)
}

pub async fn list_branches(State(state): State<Arc<AppState>>) -> Json<BranchesResponse> {
    let response = match state.repo.list_branches().await {
        Ok(branches) => BranchesResponse {
            success: true,
            branches,
            message: None,
        },
        Err(e) => BranchesResponse {
            success: false,
            branches: Vec::new(),
            message: Some(failure("list_branches", &e).message),
        },
    };
    Json(response)
}

pub async fn create_branch(
    State(state): State<Arc<AppState>>,
    body: Result<Json<BranchRequest>, JsonRejection>,
) -> Json<MessageResponse> {
    let name = branch_name(body);
    Json(match state.repo.create_branch(&name).await {
        Ok(()) => MessageResponse::ok("Branch created successfully"),
        Err(e) => MessageResponse::failed(failure("create_branch", &e)),
    })
}

pub async fn checkout_branch(
    State(state): State<Arc<AppState>>,
    body: Result<Json<BranchRequest>, JsonRejection>,
) -> Json<MessageResponse> {
    let name = branch_name(body);
    Json(match state.repo.checkout_branch(&name).await {
        Ok(()) => MessageResponse::ok("Branch checked out successfully"),
        Err(e) => MessageResponse::failed(failure("checkout_branch", &e)),
    })
}

pub async fn delete_branch(
    State(state): State<Arc<AppState>>,
    body: Result<Json<BranchRequest>, JsonRejection>,
) -> Json<MessageResponse> {
    let name = branch_name(body);
    Json(match state.repo.delete_branch(&name).await {
        Ok(DeleteOutcome::Deleted) => MessageResponse::ok("Branch deleted successfully"),
        Ok(DeleteOutcome::ForceDeleted) => {
            MessageResponse::ok("Branch force deleted successfully")
        }
        Err(e) => MessageResponse::failed(failure("delete_branch", &e)),
    })
}

pub async fn list_commits(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Json<CommitsResponse> {
    let limit = parse_limit(query.limit.as_deref(), DEFAULT_COMMIT_LIMIT);
    let commits = match state.repo.commits(limit).await {
        Ok(commits) => commits,
        Err(e) => {
            failure("list_commits", &e);
            Vec::new()
        }
    };
    Json(CommitsResponse::new(commits))
}

pub async fn file_log(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Json<CommitsResponse> {
    let limit = parse_limit(query.limit.as_deref(), DEFAULT_FILE_HISTORY_LIMIT);
    let commits = match state.repo.file_history(&file, limit).await {
        Ok(commits) => commits,
        Err(e) => {
            failure("file_log", &e);
            Vec::new()
        }
    };
    Json(CommitsResponse::new(commits))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let response = match state.repo.status().await {
        Ok(status) => {
            tracing::debug!(clean = status.is_clean(), entries = status.entries.len(), "status read");
            StatusResponse {
                success: true,
                status: StatusBody::Status(status),
                message: None,
            }
        }
        Err(e) => StatusResponse {
            success: false,
            status: StatusBody::Unavailable {},
            message: Some(failure("status", &e).message),
        },
    };
    Json(response)
}

pub async fn get_diff(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DiffQuery>,
) -> Json<DiffResponse> {
    let scope = DiffScope::from_param(query.scope.as_deref());
    let file = query.file.as_deref().map(str::trim).filter(|f| !f.is_empty());

    let response = match state.repo.diff(scope, file).await {
        Ok(view) => {
            tracing::debug!(scope = ?view.scope, empty = view.is_empty(), "diff read");
            DiffResponse {
                success: true,
                diff: view.text,
                lines: view.lines,
                message: None,
            }
        }
        Err(e) => DiffResponse {
            success: false,
            diff: String::new(),
            lines: Vec::new(),
            message: Some(failure("diff", &e).message),
        },
    };
    Json(response)
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        repo_path: state.repo.path().display().to_string(),
    })
}
