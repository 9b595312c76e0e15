use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    Json,
};
use tracing::{error, warn};

use crate::server::AppState;
use crate::types::*;
use crate::view::{html, ViewSession, ViewSnapshot};

/// Server-rendered main view. `?query=` runs a search right away. The page
/// is rendered from a live session seeded with the query, which the page
/// script then keeps driving.
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Html<String> {
    let session = match state.sessions.open(&params.query).await {
        Ok(session) => session,
        Err(e) => {
            warn!("Rendering a static page: {}", e);
            let session = ViewSession::detached(String::new(), state.sessions.deps().clone());
            session.set_input(&params.query).await;
            session.load_initial(&params.query).await;
            session
        }
    };

    let snapshot = session.snapshot().await;
    Html(html::render_page(&snapshot, &state.config.tmdb.image_base))
}

pub async fn search_movies(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<MoviesResponse>, (StatusCode, Json<ErrorResponse>)> {
    let deps = state.sessions.deps();

    let results = deps.catalog.fetch_movies(&params.query).await.map_err(|e| {
        error!(query = %params.query, "Failed to fetch movies: {}", e);
        (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: e.user_message().to_string(),
            }),
        )
    })?;

    deps.analytics.record_results(&params.query, &results).await;

    Ok(Json(MoviesResponse {
        query: params.query,
        results,
    }))
}

pub async fn trending(State(state): State<AppState>) -> Json<TrendingResponse> {
    let results = state
        .sessions
        .deps()
        .analytics
        .get_trending_movies()
        .await
        .unwrap_or_default();
    Json(TrendingResponse { results })
}

pub async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<ViewSnapshot>), (StatusCode, Json<ErrorResponse>)> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let session = state.sessions.create(&req.query).await.map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse { error: e.to_string() }),
        )
    })?;
    Ok((StatusCode::CREATED, Json(session.snapshot().await)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ViewSnapshot>, StatusCode> {
    let session = state.sessions.get(&id).await.ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(session.snapshot().await))
}

pub async fn get_session_html(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, StatusCode> {
    let session = state.sessions.get(&id).await.ok_or(StatusCode::NOT_FOUND)?;
    let snapshot = session.snapshot().await;
    Ok(Html(html::render_panels(&snapshot, &state.config.tmdb.image_base)))
}

pub async fn set_session_input(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<InputRequest>,
) -> Result<Json<ViewSnapshot>, StatusCode> {
    let session = state.sessions.get(&id).await.ok_or(StatusCode::NOT_FOUND)?;
    session.set_input(&req.text).await;
    Ok(Json(session.snapshot().await))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> StatusCode {
    if state.sessions.remove(&id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn robots_txt() -> &'static str {
    "User-agent: *\nDisallow: /api/\n"
}
