// PromptDeck: HTTP handlers

use super::error::ApiError;
use super::WebState;
use crate::model::{CategorySummary, NewTool, Run, Tool};
use crate::provider::{ModelInfo, GEMINI_MODELS};
use crate::service::{GenerateRequest, GenerateResponse};
use crate::store::catalog::DEFAULT_PAGE_SIZE;
use crate::store::{RunFilter, ToolFilter, ToolPage, ToolSort};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

type ApiResult<T> = Result<T, ApiError>;

// ----- Query parameters -----

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsQuery {
    pub category_id: Option<i64>,
    pub q: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ToolsQuery {
    fn into_filter(self) -> ToolFilter {
        ToolFilter {
            category_id: self.category_id,
            search: self.q,
            sort: self
                .sort
                .as_deref()
                .map(ToolSort::parse_lenient)
                .unwrap_or_default(),
            limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            offset: self.offset.unwrap_or(0),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunsQuery {
    pub tool_id: Option<i64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsResponse {
    pub default_model: String,
    pub models: &'static [ModelInfo],
}

// ----- Catalog -----

pub async fn list_categories(
    State(state): State<Arc<WebState>>,
) -> ApiResult<Json<Vec<CategorySummary>>> {
    Ok(Json(state.service.list_categories().await?))
}

pub async fn list_tools(
    State(state): State<Arc<WebState>>,
    query: Result<Query<ToolsQuery>, QueryRejection>,
) -> ApiResult<Json<ToolPage>> {
    let Query(query) = query?;
    let filter = query.into_filter();
    tracing::debug!(?filter, "Listing tools");
    Ok(Json(state.service.list_tools(filter).await?))
}

pub async fn get_tool(
    State(state): State<Arc<WebState>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Tool>> {
    let Path(id) = id?;
    Ok(Json(state.service.get_tool(id).await?))
}

pub async fn create_tool(
    State(state): State<Arc<WebState>>,
    body: Result<Json<NewTool>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(new) = body?;
    let tool = state.service.create_tool(new).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "tool": tool })),
    ))
}

// ----- Generation -----

pub async fn generate(
    State(state): State<Arc<WebState>>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Json<GenerateResponse>> {
    let Json(req) = body?;
    Ok(Json(state.service.generate(req).await?))
}

// ----- Run ledger -----

pub async fn list_runs(
    State(state): State<Arc<WebState>>,
    query: Result<Query<RunsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Run>>> {
    let Query(query) = query?;
    let filter = RunFilter {
        tool_id: query.tool_id,
        limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        offset: query.offset.unwrap_or(0),
    };
    Ok(Json(state.service.list_runs(filter).await?))
}

pub async fn delete_run(
    State(state): State<Arc<WebState>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    state.service.delete_run(id).await?;
    Ok(Json(json!({ "message": format!("Run {} deleted", id) })))
}

pub async fn delete_all_runs(State(state): State<Arc<WebState>>) -> ApiResult<Json<Value>> {
    let deleted = state.service.delete_all_runs().await?;
    Ok(Json(json!({
        "message": "All runs deleted",
        "deleted": deleted,
    })))
}

// ----- Status -----

pub async fn check_env_key(State(state): State<Arc<WebState>>) -> Json<Value> {
    Json(json!({ "hasKey": state.service.has_key() }))
}

pub async fn list_models(State(state): State<Arc<WebState>>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        default_model: state.service.default_model().to_string(),
        models: GEMINI_MODELS,
    })
}

/// JSON status endpoint.
pub async fn api_status(State(state): State<Arc<WebState>>) -> Json<Value> {
    Json(json!({
        "status": "online",
        "version": crate::VERSION,
        "defaultModel": state.service.default_model(),
        "hasKey": state.service.has_key(),
    }))
}

/// JSON metrics API endpoint.
pub async fn api_metrics(State(state): State<Arc<WebState>>) -> Json<crate::metrics::MetricsReport> {
    Json(state.service.metrics().report().await)
}
