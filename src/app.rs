#![cfg(not(tarpaulin_include))]

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::config::ServerConfig;
use crate::editor::{EditEngine, EditOutcome, PointerEvent, Tool};
use crate::import::{self, FileSpaceCatalog, ImportedSpace, SpaceImporter};
use crate::layout::{Layout, SpaceTotals};
use crate::projector::ParkingSpace;
use crate::saving::{self, FileLayoutStore};

/// The engine mutex is the single owner of edit and debounce state; every
/// request touching the layout goes through it in turn.
pub struct AppState {
    engine: Mutex<EditEngine>,
    store: Mutex<FileLayoutStore>,
    catalog: Mutex<FileSpaceCatalog>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> std::io::Result<Self> {
        let store = FileLayoutStore::new(&config.layout_path);
        let mut engine = EditEngine::new(config.editor);
        if engine.load_from(&store)? {
            info!("Restored layout from {}", store.path().display());
        }
        Ok(AppState {
            engine: Mutex::new(engine),
            store: Mutex::new(store),
            catalog: Mutex::new(FileSpaceCatalog::new(&config.catalog_path)),
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Serialize)]
struct LayoutView {
    layout: Layout,
    spaces: Vec<ParkingSpace>,
    totals: SpaceTotals,
    tool: Tool,
    can_undo: bool,
}

impl LayoutView {
    fn of(engine: &EditEngine) -> Self {
        LayoutView {
            layout: engine.layout().clone(),
            spaces: engine.spaces(),
            totals: engine.totals(),
            tool: engine.tool(),
            can_undo: engine.can_undo(),
        }
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

impl StatusResponse {
    fn ok() -> Self {
        StatusResponse {
            status: "ok".to_string(),
            message: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        StatusResponse {
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }
}

#[derive(Deserialize)]
struct ToolRequest {
    tool: Tool,
}

#[derive(Deserialize)]
struct PointerRequest {
    pointer_id: i64,
    screen_x: f64,
    screen_y: f64,
    timestamp: Option<i64>,
}

#[derive(Deserialize)]
struct ActivateRequest {
    pointer_id: i64,
    timestamp: Option<i64>,
}

#[derive(Deserialize)]
struct RowRequest {
    name: String,
}

#[derive(Deserialize)]
struct ImportRequest {
    codes: String,
}

#[derive(Serialize)]
struct ImportResponse {
    status: String,
    added: usize,
    spaces: Vec<ImportedSpace>,
}

pub fn router(state: Arc<AppState>, static_dir: &FsPath) -> Router {
    Router::new()
        .route("/api/layout", get(get_layout))
        .route("/api/layout/tool", post(set_tool))
        .route("/api/layout/pointer", post(pointer))
        .route("/api/layout/spaces/:id/activate", post(activate_space))
        .route("/api/layout/rows", post(add_row))
        .route("/api/layout/clear", post(clear_layout))
        .route("/api/layout/undo", post(undo))
        .route("/api/layout/save", post(save_layout))
        .route("/api/layout/load", post(load_layout))
        .route("/api/layout/export", get(export_layout))
        .route("/api/spaces/import", post(import_spaces))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(&config)?);
    let app = router(state, &config.static_dir);

    let listener = TcpListener::bind(&config.bind).await?;
    info!("Listening on http://{}", config.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn get_layout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let engine = lock(&state.engine);
    Json(LayoutView::of(&engine))
}

async fn set_tool(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ToolRequest>,
) -> impl IntoResponse {
    lock(&state.engine).set_tool(payload.tool);
    Json(StatusResponse::ok())
}

async fn pointer(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PointerRequest>,
) -> Json<EditOutcome> {
    let event = PointerEvent {
        pointer_id: payload.pointer_id,
        screen_x: payload.screen_x,
        screen_y: payload.screen_y,
        timestamp_ms: payload.timestamp.unwrap_or_else(now_ms),
    };
    Json(lock(&state.engine).handle_pointer(&event))
}

async fn activate_space(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ActivateRequest>,
) -> Json<EditOutcome> {
    let now = payload.timestamp.unwrap_or_else(now_ms);
    Json(lock(&state.engine).activate_space(&id, payload.pointer_id, now))
}

async fn add_row(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RowRequest>,
) -> impl IntoResponse {
    if lock(&state.engine).add_row(&payload.name) {
        (StatusCode::OK, Json(StatusResponse::ok()))
    } else {
        (
            StatusCode::CONFLICT,
            Json(StatusResponse::error(format!(
                "Row '{}' already exists or is empty",
                payload.name.trim()
            ))),
        )
    }
}

async fn clear_layout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut engine = lock(&state.engine);
    engine.clear();
    Json(LayoutView::of(&engine))
}

async fn undo(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut engine = lock(&state.engine);
    if engine.undo() {
        Json(StatusResponse::ok())
    } else {
        Json(StatusResponse::error("Nothing to undo"))
    }
}

async fn save_layout(State(state): State<Arc<AppState>>) -> Response {
    let engine = lock(&state.engine);
    let mut store = lock(&state.store);

    match engine.save(&mut *store) {
        Ok(totals) => Json(totals).into_response(),
        Err(e) => {
            error!("Failed to save layout: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse::error(e.to_string())),
            )
                .into_response()
        }
    }
}

async fn load_layout(State(state): State<Arc<AppState>>, body: String) -> impl IntoResponse {
    let mut engine = lock(&state.engine);
    engine.load_json(&body);
    if engine.layout().is_empty() && !body.trim().is_empty() {
        warn!("Loaded layout is empty");
    }
    Json(LayoutView::of(&engine))
}

async fn export_layout(State(state): State<Arc<AppState>>) -> Response {
    let layout = lock(&state.engine).layout().clone();

    match saving::archive_bytes(&layout) {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "application/gzip"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"layout.bin.gz\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(StatusResponse::error(e.to_string())),
        )
            .into_response(),
    }
}

async fn import_spaces(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ImportRequest>,
) -> Response {
    let spaces = import::parse_codes(&payload.codes);
    if spaces.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(StatusResponse::error("No codes found")),
        )
            .into_response();
    }

    let mut catalog = lock(&state.catalog);
    match catalog.import_spaces(&spaces) {
        Ok(added) => Json(ImportResponse {
            status: "ok".to_string(),
            added,
            spaces,
        })
        .into_response(),
        Err(e) => {
            error!("Failed to import spaces: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse::error(e.to_string())),
            )
                .into_response()
        }
    }
}
