use std::net::SocketAddr;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::{
    auth,
    config::AppConfig,
    cors::{cors_layer, reject_disallowed_origin},
    routes::{meta::meta_routes, not_found},
    state::AppState,
};

/// Layers run outermost first: tracing, security headers, origin rejection,
/// CORS (which answers preflights), router. The schema guard only wraps the
/// database-backed routes.
pub fn build_app(state: AppState) -> Router {
    let policy = state.origin_policy();

    Router::new()
        .merge(meta_routes())
        .merge(
            auth::router()
                .route_layer(middleware::from_fn_with_state(state.clone(), ensure_schema)),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(cors_layer(policy.clone()))
        .layer(middleware::from_fn_with_state(policy, reject_disallowed_origin))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

/// Retries schema creation on each request until it has succeeded once.
async fn ensure_schema(State(state): State<AppState>, req: Request, next: Next) -> Response {
    state.ensure_schema().await;
    next.run(req).await
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
