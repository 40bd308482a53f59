use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};

use super::ApiError;
use crate::arrivals::StopArrivals;
use crate::facade::{LineLive, LineVehicles, QueryFacade};
use crate::model::{Line, RouteStops, Stop, Timetable};

type SharedFacade = Arc<QueryFacade>;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default, alias = "q")]
    query: String,
}

pub fn create_router(facade: SharedFacade) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/lines", get(search_lines))
        .route("/lines/all", get(all_lines))
        .route("/lines/{line_code}/timetable", get(timetable))
        .route("/lines/{line_code}/info", get(line_info))
        .route("/lines/{line_code}/live", get(line_live))
        .route("/stops", get(search_stops))
        .route("/stops/{stop_code}/arrivals", get(stop_arrivals))
        .route("/routes/{line_code}", get(route))
        .route("/vehicles/{line_code}", get(vehicles))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(facade)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn search_lines(
    State(facade): State<SharedFacade>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Line>>, ApiError> {
    Ok(Json(facade.search_lines(&params.query).await?))
}

async fn all_lines(State(facade): State<SharedFacade>) -> Result<Json<Vec<Line>>, ApiError> {
    let lines = facade.all_lines().await?;
    Ok(Json(lines.as_ref().clone()))
}

async fn search_stops(
    State(facade): State<SharedFacade>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Stop>>, ApiError> {
    Ok(Json(facade.search_stops(&params.query).await?))
}

async fn route(
    State(facade): State<SharedFacade>,
    Path(line_code): Path<String>,
) -> Result<Json<RouteStops>, ApiError> {
    Ok(Json(facade.route(&line_code).await?))
}

async fn vehicles(
    State(facade): State<SharedFacade>,
    Path(line_code): Path<String>,
) -> Json<LineVehicles> {
    Json(facade.vehicles(&line_code).await)
}

async fn line_live(
    State(facade): State<SharedFacade>,
    Path(line_code): Path<String>,
) -> Json<LineLive> {
    Json(facade.live(&line_code).await)
}

async fn stop_arrivals(
    State(facade): State<SharedFacade>,
    Path(stop_code): Path<String>,
) -> Result<Json<StopArrivals>, ApiError> {
    Ok(Json(facade.stop_arrivals(&stop_code).await?))
}

async fn timetable(
    State(facade): State<SharedFacade>,
    Path(line_code): Path<String>,
) -> Result<Json<Timetable>, ApiError> {
    let table = facade.timetable(&line_code).await?;
    Ok(Json(table.as_ref().clone()))
}

async fn line_info(
    State(facade): State<SharedFacade>,
    Path(line_code): Path<String>,
) -> Json<Value> {
    Json(facade.line_info(&line_code).await)
}
