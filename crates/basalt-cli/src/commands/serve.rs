//! `basalt serve` command implementation.
//!
//! Small HTTP shell around the compiler: `POST /compile` takes source
//! text in the request body and returns generated JavaScript, or a
//! JSON error object with the source position on 422. `GET /healthz`
//! reports liveness. CORS is permissive so browser-side editors can
//! talk to a local instance directly.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use basalt_compiler::{clean, compile, LineIndex, Location};
use miette::{IntoDiagnostic, Result};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;

pub fn run(host: &str, port: u16) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().into_diagnostic()?;
    rt.block_on(serve(host, port))
}

async fn serve(host: &str, port: u16) -> Result<()> {
    let app = Router::new()
        .route("/compile", post(compile_handler))
        .route("/healthz", get(healthz))
        .layer(CorsLayer::permissive());

    let host_ip = if host == "localhost" { "127.0.0.1" } else { host };
    let addr: SocketAddr = format!("{host_ip}:{port}").parse().into_diagnostic()?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .into_diagnostic()?;
    tracing::info!(%addr, "compile server listening");
    axum::serve(listener, app).await.into_diagnostic()?;

    Ok(())
}

async fn compile_handler(body: String) -> Response {
    match compile(&body) {
        Ok(js) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/javascript")],
            js,
        )
            .into_response(),
        Err(err) => {
            let normalized = clean(&body);
            let index = LineIndex::new(&normalized);
            let location = Location::of(err.span(), &index);
            let payload = json!({
                "kind": err.kind(),
                "message": err.message(),
                "line": location.first_line + 1,
                "column": location.first_column + 1,
                "span": err.span(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}
