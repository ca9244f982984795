use crate::config::AppConfig;
use crate::pipeline::PipelineOutput;
use crate::render;
use crate::suggestions::{filter_suggestions, validate_submission, Suggestion, SuggestionStore};
use crate::types::{ResidentArea, ScoredArea};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::{Point, Rect};
use geojson::FeatureCollection;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};

// Wrapper for RTree indexing
struct AreaIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for AreaIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    pub residents: Vec<ResidentArea>,
    pub scored: Vec<ScoredArea>,
    pub tree: RTree<AreaIndex>,
    pub store: SuggestionStore,
    /// Postal codes present in the station data; suggestions must name
    /// one of these.
    pub valid_codes: Vec<String>,
    pub admin_password: String,
}

/// Errors that reach a handler boundary become opaque 500s; the detail
/// goes to the log, not the client.
struct ApiError(anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("request failed: {:#}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
pub struct QueryResponse {
    #[serde(rename = "PLZ")]
    plz: u32,
    #[serde(rename = "Einwohner")]
    einwohner: u64,
    #[serde(rename = "Number")]
    number: u64,
    #[serde(rename = "Demand")]
    demand: i64,
}

#[derive(Deserialize)]
struct ListParams {
    plz: Option<String>,
}

#[derive(Deserialize)]
struct SubmitBody {
    text: String,
    plz: String,
}

#[derive(Deserialize)]
struct ClearBody {
    password: String,
}

#[derive(Serialize)]
struct ClearResponse {
    cleared: bool,
}

pub async fn start_server(config: AppConfig, output: PipelineOutput) -> Result<()> {
    // Build Spatial Index
    info!("Building spatial index for {} areas...", output.scored.len());
    let tree_items: Vec<AreaIndex> = output
        .scored
        .iter()
        .enumerate()
        .map(|(i, area)| {
            let rect = area.geometry.bounding_rect().unwrap_or(Rect::new(
                geo::Coord { x: 0.0, y: 0.0 },
                geo::Coord { x: 0.0, y: 0.0 },
            ));
            AreaIndex {
                index: i,
                aabb: AABB::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                ),
            }
        })
        .collect();
    let tree = RTree::bulk_load(tree_items);

    let valid_codes: Vec<String> = output.counts.iter().map(|c| c.plz.to_string()).collect();
    let store = SuggestionStore::new(config.suggestions.path.clone());
    store.initialize()?;

    let state = Arc::new(AppState {
        residents: output.residents,
        scored: output.scored,
        tree,
        store,
        valid_codes,
        admin_password: config.suggestions.admin_password.clone(),
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Starting server on http://{}", addr);

    let app = Router::new()
        .route("/api/layers/:name", get(layer_handler))
        .route("/api/query", get(query_handler))
        .route(
            "/api/suggestions",
            get(list_suggestions).post(submit_suggestion),
        )
        .route("/api/suggestions/clear", post(clear_suggestions))
        .fallback_service(ServeDir::new(&config.server.static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn layer_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<FeatureCollection>, StatusCode> {
    let layer = match name.as_str() {
        "residents" => render::residents_layer(&state.residents),
        "charging_stations" => render::charging_stations_layer(&state.scored),
        "demand" => render::demand_layer(&state.scored),
        _ => return Err(StatusCode::NOT_FOUND),
    };
    Ok(Json(layer))
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    let point = Point::new(params.lon, params.lat);
    let envelope = AABB::from_point([params.lon, params.lat]);

    let candidates = state.tree.locate_in_envelope_intersecting(&envelope);
    for candidate in candidates {
        if let Some(area) = state.scored.get(candidate.index) {
            if area.geometry.contains(&point) {
                return Json(Some(QueryResponse {
                    plz: area.plz,
                    einwohner: area.einwohner,
                    number: area.number,
                    demand: area.demand,
                }));
            }
        }
    }

    Json(None)
}

async fn list_suggestions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Suggestion>>, ApiError> {
    let all = state.store.load()?;
    Ok(Json(filter_suggestions(all, params.plz.as_deref())))
}

async fn submit_suggestion(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitBody>,
) -> Result<Response, ApiError> {
    match validate_submission(&body.text, &body.plz, &state.valid_codes) {
        Ok(suggestion) => {
            state.store.append(suggestion.clone())?;
            Ok((StatusCode::CREATED, Json(suggestion)).into_response())
        }
        Err(reason) => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": reason.to_string() })),
        )
            .into_response()),
    }
}

async fn clear_suggestions(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ClearBody>,
) -> Result<Json<ClearResponse>, ApiError> {
    let cleared = state.store.clear(&body.password, &state.admin_password)?;
    Ok(Json(ClearResponse { cleared }))
}
