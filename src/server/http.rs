//! HTTP surface of the dev server
//!
//! | Route | Response |
//! |---|---|
//! | `GET /` | `The server is ready!` |
//! | `GET /bypath?<paths>` | bundle of artifacts by path |
//! | `GET /byid?<ids>` | bundle of artifacts by module id |
//! | `GET /deps?ids=..` / `?packs=..[&dep=0]` | resolved dependency maps as JSON |
//! | `GET /static/*` | files from the source root, else relayed from the remote host |
//!
//! Bundles are served as `application/x-javascript`; a bundle with nothing
//! readable is a 404 and a malformed combo list a 400. Every response allows
//! any origin. With a remote host configured, a static file missing locally
//! is fetched from `<remote>/static/*` and its status and body passed through.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{OriginalUri, Query, RawQuery, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, MethodRouter};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::Result;

use super::combo::{parse_combo_query, ComboService, DepsQuery};

const JS_CONTENT_TYPE: &str = "application/x-javascript";

/// Build the application router
pub fn router(combo: Arc<ComboService>) -> Router {
    let static_files = ServeDir::new(combo.context().src_dir());

    let router = Router::new()
        .route("/", get(ready))
        .route("/bypath", get(bypath))
        .route("/byid", get(byid))
        .route("/deps", get(deps));

    let router = if combo.context().remote().is_some() {
        let proxy: MethodRouter = get(proxy_static).with_state(combo.clone());
        router.nest_service("/static", static_files.fallback(proxy))
    } else {
        router.nest_service("/static", static_files)
    };

    router
        .layer(CorsLayer::new().allow_origin(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(combo)
}

/// Serve until Ctrl-C
pub async fn serve(combo: Arc<ComboService>, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("[COMBO] Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, router(combo))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("[COMBO] Shutting down");
        })
        .await?;
    Ok(())
}

async fn ready() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/x-javascript; charset=utf-8")],
        "The server is ready!",
    )
}

async fn bypath(State(combo): State<Arc<ComboService>>, RawQuery(query): RawQuery) -> Response {
    let paths = match parse_combo_query(query.as_deref()) {
        Ok(paths) => paths,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    bundle_response(combo.bypath(&paths).await)
}

async fn byid(State(combo): State<Arc<ComboService>>, RawQuery(query): RawQuery) -> Response {
    let ids = match parse_combo_query(query.as_deref()) {
        Ok(ids) => ids,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    bundle_response(combo.byid(&ids).await)
}

async fn deps(State(combo): State<Arc<ComboService>>, Query(query): Query<DepsQuery>) -> Response {
    Json(combo.deps(&query).await).into_response()
}

async fn proxy_static(
    State(combo): State<Arc<ComboService>>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let Some(remote) = combo.context().remote() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let target = uri.path_and_query().map_or(uri.path(), |pq| pq.as_str());

    match remote.fetch_static(target).await {
        Ok(file) => {
            let status = StatusCode::from_u16(file.status).unwrap_or(StatusCode::BAD_GATEWAY);
            let mut response = (status, file.body).into_response();
            if let Some(value) = file.content_type.and_then(|v| HeaderValue::from_str(&v).ok()) {
                response.headers_mut().insert(header::CONTENT_TYPE, value);
            }
            response
        }
        Err(e) => {
            tracing::warn!("[COMBO] Proxying {} to {} failed: {}", target, remote.host(), e);
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

fn bundle_response(bundle: Option<String>) -> Response {
    match bundle {
        Some(body) => ([(header::CONTENT_TYPE, JS_CONTENT_TYPE)], body).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
