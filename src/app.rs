use std::net::SocketAddr;

use axum::{
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::flash::{self, NoticeKind};
use crate::state::AppState;
use crate::{auth, posts, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(posts::router())
        .route("/", get(home))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
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

/// Minimal landing page; its real job in the core is consuming the pending
/// flash notice so every redirect target has somewhere to land.
async fn home(headers: HeaderMap) -> Response {
    let mut body = String::from("<h1>postline</h1>");
    let notice = flash::take(&headers);
    if let Some(notice) = notice {
        let class = match notice.kind() {
            NoticeKind::Success => "success",
            NoticeKind::Error => "error",
        };
        body.push_str(&format!(
            r#"<p class="notice {class}">{}</p>"#,
            notice.message()
        ));
    }
    let mut res = Html(body).into_response();
    if notice.is_some() {
        res.headers_mut()
            .append(axum::http::header::SET_COOKIE, flash::clear_cookie());
    }
    res
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "3000".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
