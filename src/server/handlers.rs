//! Route handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::package::types::Category;
use crate::refresh::RefreshScope;
use crate::server::AppState;
use crate::server::responses::{
    CategoryResponse, HealthResponse, OutdatedResponse, ReadyResponse, RefreshResponse,
    RootResponse, SearchResponse, StackDetail, StacksResponse, TrendingResponse, json_error,
};
use crate::store::TrendingSort;
use crate::store::query::names_match;

const DEFAULT_TRENDING_LIMIT: usize = 20;
const DEFAULT_OUTDATED_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrendingParams {
    sort_by: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OutdatedParams {
    threshold_days: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshParams {
    fast_only: Option<String>,
}

/// Parse an optional query value, answering 400 when it is malformed
fn parse_param<T: std::str::FromStr>(
    name: &str,
    value: Option<&str>,
    default: T,
) -> Result<T, Response> {
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| {
            json_error(
                StatusCode::BAD_REQUEST,
                format!("Invalid {}: {:?}", name, raw),
            )
        }),
    }
}

pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    let metadata = state.store.metadata();
    Json(RootResponse {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        total_stacks: metadata.total_count,
        last_updated: metadata.last_updated,
        endpoints: IndexMap::from([
            ("list_stacks", "/stacks"),
            ("get_stack", "/stacks/{name}"),
            ("category_stacks", "/stacks/category/{category}"),
            ("search_stacks", "/stacks/search?q={query}"),
            ("trending_stacks", "/stacks/trending"),
            ("outdated_stacks", "/stacks/outdated"),
            ("refresh", "/stacks/refresh"),
            ("health", "/health"),
            ("ready", "/ready"),
        ]),
    })
}

pub async fn list_stacks(State(state): State<AppState>) -> impl IntoResponse {
    let stacks = state.store.load();
    Json(StacksResponse {
        total_count: stacks.len(),
        last_refresh: state.store.metadata().last_updated,
        stacks,
    })
}

pub async fn stacks_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Response {
    let parsed: Category = match category.parse() {
        Ok(parsed) => parsed,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, format!("{}", e)),
    };

    let stacks = state.store.by_category(parsed);
    Json(CategoryResponse {
        category: parsed.to_string(),
        total_count: stacks.len(),
        stacks,
    })
    .into_response()
}

pub async fn search_stacks(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Response {
    let Some(query) = params.q else {
        return json_error(StatusCode::BAD_REQUEST, "Missing query parameter: q");
    };

    let stacks = state.store.search(&query);
    Json(SearchResponse {
        query,
        total_count: stacks.len(),
        stacks,
    })
    .into_response()
}

pub async fn trending_stacks(
    State(state): State<AppState>,
    Query(params): Query<TrendingParams>,
) -> Response {
    let sort = match params.sort_by.as_deref().map(str::parse::<TrendingSort>) {
        None => TrendingSort::default(),
        Some(Ok(sort)) => sort,
        Some(Err(e)) => return json_error(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let limit = match parse_param("limit", params.limit.as_deref(), DEFAULT_TRENDING_LIMIT) {
        Ok(limit) => limit,
        Err(response) => return response,
    };

    let stacks = state.store.trending(sort, limit);
    Json(TrendingResponse {
        sort_by: sort.to_string(),
        total_count: stacks.len(),
        stacks,
    })
    .into_response()
}

pub async fn outdated_stacks(
    State(state): State<AppState>,
    Query(params): Query<OutdatedParams>,
) -> Response {
    let threshold_days = match parse_param(
        "threshold_days",
        params.threshold_days.as_deref(),
        DEFAULT_OUTDATED_DAYS,
    ) {
        Ok(days) => days,
        Err(response) => return response,
    };

    let stacks = match state.store.outdated(threshold_days) {
        Ok(stacks) => stacks,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, e.to_string()),
    };
    Json(OutdatedResponse {
        threshold_days,
        total_count: stacks.len(),
        stacks,
    })
    .into_response()
}

pub async fn get_stack(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let stacks = state.store.load_with_history();
    match stacks.into_iter().find(|(key, _)| names_match(key, &name)) {
        Some((_, stored)) => Json(StackDetail {
            record: stored.record,
            history: stored.history,
        })
        .into_response(),
        None => json_error(
            StatusCode::NOT_FOUND,
            format!("Stack '{}' not found", name),
        ),
    }
}

pub async fn refresh_stacks(
    State(state): State<AppState>,
    Query(params): Query<RefreshParams>,
) -> Response {
    let fast_only = match parse_param("fast_only", params.fast_only.as_deref(), false) {
        Ok(fast_only) => fast_only,
        Err(response) => return response,
    };
    let scope = if fast_only {
        RefreshScope::FastMoving
    } else {
        RefreshScope::Full
    };
    debug!("Refresh requested over HTTP (fast_only={})", fast_only);

    let report = state.scheduler.trigger(scope).await;
    Json(RefreshResponse::from(report)).into_response()
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
    })
}

pub async fn ready(State(state): State<AppState>) -> Response {
    match state.store.check_readable() {
        Ok(total_count) => Json(ReadyResponse {
            status: "ready",
            total_count,
        })
        .into_response(),
        Err(e) => {
            warn!("Store not readable: {}", e);
            json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Store not readable: {}", e),
            )
        }
    }
}
