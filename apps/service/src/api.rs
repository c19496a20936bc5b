//! HTTP routes.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use craftdeploy_deploy::{DeployError, UploadPhase, UploadReport};
use craftdeploy_installer::{InstallError, InstallReport};
use craftdeploy_protocol::{Artifact, ArtifactSummary, Loader, QueueEntry, ServerContext};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/servers/:id/queue",
            get(list_queue).post(enqueue).delete(clear_queue),
        )
        .route("/servers/:id/queue/:slug", delete(dequeue))
        .route("/servers/:id/install", post(install))
        .route("/servers/:id/upload", post(upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// -- Queue --

#[derive(Debug, Deserialize)]
struct EnqueueRequest {
    slug: String,
    #[serde(default)]
    title: Option<String>,
}

async fn list_queue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<Vec<QueueEntry>> {
    Json(state.repository.queues().list(&id))
}

async fn enqueue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<EnqueueRequest>,
) -> ApiResult<Json<Vec<QueueEntry>>> {
    let slug = request.slug.trim();
    if slug.is_empty() {
        return Err(ApiError::BadRequest("slug must not be empty".into()));
    }
    let title = request
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(slug);
    Ok(Json(state.repository.queues().enqueue(&id, slug, title)))
}

async fn dequeue(
    State(state): State<Arc<AppState>>,
    Path((id, slug)): Path<(String, String)>,
) -> Json<Vec<QueueEntry>> {
    Json(state.repository.queues().dequeue(&id, &slug))
}

async fn clear_queue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<Vec<QueueEntry>> {
    state.repository.reset(&id);
    Json(Vec::new())
}

// -- Install --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstallRequest {
    #[serde(default)]
    mod_loader: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InstallResponse {
    entries: Vec<QueueEntry>,
    success_count: usize,
    fail_count: usize,
    artifacts: Vec<ArtifactSummary>,
    loader: Loader,
    game_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

async fn install(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<InstallRequest>>,
) -> ApiResult<Json<InstallResponse>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let _worker = state.repository.lock_worker(&id).await;

    // Refuse before touching the panel.
    if state.repository.queues().list(&id).is_empty() {
        return Err(InstallError::NoQueue { server: id }.into());
    }

    let ctx = server_context(&state, &id, request).await?;
    let report = state
        .orchestrator
        .install(state.repository.queues(), &id, &ctx)
        .await?;

    let InstallReport {
        config,
        entries,
        artifacts,
        success_count,
        fail_count,
        artifacts_missing,
        processed,
    } = report;

    let (summaries, warning) = if processed == 0 {
        // Archives from an earlier run may still await upload.
        let cached = state.repository.downloads().summaries(&id);
        let warning = format!(
            "no queued entries to install; {} cached archive(s) kept for upload",
            cached.len()
        );
        (cached, Some(warning))
    } else {
        let summaries = artifacts.iter().map(Artifact::summary).collect();
        let warning = artifacts_missing.then(|| {
            format!("{success_count} package(s) reported installed but no archives were produced")
        });
        state.repository.store_artifacts(&id, artifacts);
        (summaries, warning)
    };

    Ok(Json(InstallResponse {
        entries,
        success_count,
        fail_count,
        artifacts: summaries,
        loader: config.loader,
        game_version: config.game_version,
        warning,
    }))
}

/// Request values win; the panel is only asked when one of them is missing.
async fn server_context(
    state: &AppState,
    id: &str,
    request: InstallRequest,
) -> ApiResult<ServerContext> {
    let mod_loader = request
        .mod_loader
        .as_deref()
        .map(Loader::parse)
        .filter(|l| *l != Loader::Unknown);
    let version = request.version.filter(|v| !v.trim().is_empty());

    let mut ctx = if mod_loader.is_some() && version.is_some() {
        ServerContext::default()
    } else {
        state.panel.server_details(id).await?.context()
    };
    if mod_loader.is_some() {
        ctx.mod_loader = mod_loader;
    }
    if version.is_some() {
        ctx.version = version;
    }
    Ok(ctx)
}

// -- Upload --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    #[serde(flatten)]
    report: UploadReport,
    queue_cleared: bool,
    /// Archives left in the cache for the next upload attempt.
    remaining_artifacts: usize,
}

async fn upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<UploadResponse>> {
    let _worker = state.repository.lock_worker(&id).await;

    let artifacts = state
        .repository
        .cached_artifacts(&id)
        .ok_or_else(|| DeployError::NoArtifacts { server: id.clone() })?;

    let files = state.panel.server(&id);
    let report = UploadPhase::new(&files, &state.config.mods_directory)
        .run(&artifacts)
        .await?;

    let placed: HashSet<&str> = report
        .results
        .iter()
        .filter(|r| r.is_success())
        .map(|r| r.file.as_str())
        .collect();
    let remaining_artifacts = state
        .repository
        .downloads()
        .retain(&id, |a| !placed.contains(a.name.as_str()));

    let queue_cleared = report.all_placed();
    if queue_cleared {
        state.repository.queues().clear(&id);
        info!(server = %id, "all archives placed, queue cleared");
    } else {
        warn!(server = %id, remaining = remaining_artifacts, "archives kept for another upload");
    }

    Ok(Json(UploadResponse {
        report,
        queue_cleared,
        remaining_artifacts,
    }))
}
