//! Package review endpoints
//!
//! Read endpoints give the review UI its list, detail and bulk-selection
//! context. Write endpoints hand reviewer decisions to the lifecycle
//! controller and return its per-package report.

use crate::db::{packages, rights_statements};
use crate::services::TransitionReport;
use crate::{ApiError, ApiResult, AppState};
use avqc_common::{Package, ProcessStatus, RightsStatement};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// GET /packages/:id response
#[derive(Debug, Serialize, Deserialize)]
pub struct PackageDetail {
    pub package: Package,
    pub rights_statements: Vec<RightsStatement>,
    /// Public registry link; absent without `archivesspace.public_url`
    pub archival_object_link: Option<String>,
}

/// GET /packages/selection response
#[derive(Debug, Serialize, Deserialize)]
pub struct SelectionContext {
    pub packages: Vec<Package>,
    pub rights_statements: Vec<RightsStatement>,
}

#[derive(Debug, Deserialize)]
pub struct SelectionQuery {
    /// Comma-separated package ids
    pub ids: String,
}

/// Body of the reject and refresh requests
#[derive(Debug, Deserialize)]
pub struct PackageIdsRequest {
    pub ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub ids: Vec<i64>,
    /// Comma-joined rights statement ids
    pub rights_ids: String,
}

/// Rights statements offered to the reviewer on every decision page
pub async fn rights_statement_context(pool: &SqlitePool) -> ApiResult<Vec<RightsStatement>> {
    Ok(rights_statements::list_rights_statements(pool).await?)
}

/// Packages named by a bulk selection, with the rights statements to pick from
pub async fn selection_context(pool: &SqlitePool, ids: &[i64]) -> ApiResult<SelectionContext> {
    Ok(SelectionContext {
        packages: packages::get_packages(pool, ids).await?,
        rights_statements: rights_statement_context(pool).await?,
    })
}

/// Parse `"1,2,3"`; blanks are ignored, anything else non-numeric is a 400
pub fn parse_id_list(raw: &str) -> ApiResult<Vec<i64>> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|_| ApiError::BadRequest(format!("Invalid package id '{}'", part)))
        })
        .collect::<ApiResult<Vec<i64>>>()?;
    require_ids(&ids)?;
    Ok(ids)
}

fn require_ids(ids: &[i64]) -> ApiResult<()> {
    if ids.is_empty() {
        return Err(ApiError::BadRequest("No packages selected".to_string()));
    }
    Ok(())
}

/// GET /packages
///
/// Packages waiting for review, oldest first
pub async fn list_pending(State(state): State<AppState>) -> ApiResult<Json<Vec<Package>>> {
    let pending = packages::list_by_status(&state.db, ProcessStatus::Pending).await?;
    Ok(Json(pending))
}

/// GET /packages/:id
pub async fn package_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PackageDetail>> {
    let package = packages::get_package(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Package {}", id)))?;

    let archival_object_link = state
        .config
        .archivesspace
        .public_url
        .as_deref()
        .map(|base| package.archival_object_link(base));

    Ok(Json(PackageDetail {
        package,
        rights_statements: rights_statement_context(&state.db).await?,
        archival_object_link,
    }))
}

/// GET /packages/selection?ids=1,2
pub async fn package_selection(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> ApiResult<Json<SelectionContext>> {
    let ids = parse_id_list(&query.ids)?;
    Ok(Json(selection_context(&state.db, &ids).await?))
}

/// POST /packages/approve
///
/// **Request:** `{"ids": [1, 2], "rights_ids": "3,4"}`
pub async fn approve_packages(
    State(state): State<AppState>,
    Json(request): Json<ApproveRequest>,
) -> ApiResult<Json<TransitionReport>> {
    require_ids(&request.ids)?;
    let rights_ids = request.rights_ids.trim();
    if rights_ids.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one rights statement is required to approve".to_string(),
        ));
    }
    state.config.require_storage_root()?;

    tracing::info!(ids = ?request.ids, rights_ids = %rights_ids, "Approve requested");
    Ok(Json(state.controller.approve(&request.ids, rights_ids).await))
}

/// POST /packages/reject
pub async fn reject_packages(
    State(state): State<AppState>,
    Json(request): Json<PackageIdsRequest>,
) -> ApiResult<Json<TransitionReport>> {
    require_ids(&request.ids)?;
    state.config.require_storage_root()?;

    tracing::info!(ids = ?request.ids, "Reject requested");
    Ok(Json(state.controller.reject(&request.ids).await))
}

/// POST /packages/refresh
pub async fn refresh_packages(
    State(state): State<AppState>,
    Json(request): Json<PackageIdsRequest>,
) -> ApiResult<Json<TransitionReport>> {
    require_ids(&request.ids)?;

    tracing::info!(ids = ?request.ids, "Metadata refresh requested");
    Ok(Json(state.controller.refresh_metadata(&request.ids).await))
}

pub fn package_routes() -> Router<AppState> {
    Router::new()
        .route("/packages", get(list_pending))
        .route("/packages/selection", get(package_selection))
        .route("/packages/:id", get(package_detail))
        .route("/packages/approve", post(approve_packages))
        .route("/packages/reject", post(reject_packages))
        .route("/packages/refresh", post(refresh_packages))
}
