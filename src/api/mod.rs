use crate::{
    abuse::{self, AbuseGuard},
    api::{
        handlers::{contract, health, proposal, root, session, verify, voice},
        state::{AppState, GateConfig},
    },
    cli::{actions::server::Args, telemetry::shutdown_tracer},
    rate_limit::{RateLimitConfig, RateLimiter},
    session::{CookieSessionStore, SessionCodec},
    unix_millis,
    verifier::{EnvPasswords, PasswordVerifier},
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use rand::Rng;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{debug, error, info, info_span, Span};
use ulid::Ulid;

pub mod error;
pub mod handlers;
mod openapi;
pub mod state;
pub mod utils;

pub use openapi::openapi;

const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
const SWEEP_JITTER_SECONDS: u64 = 60;

/// Every route behind the abuse filter, request ids and tracing.
pub fn router(state: Arc<AppState>, guard: Arc<AbuseGuard>) -> Router {
    Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health).options(health::health))
        .route("/auth/verify", post(verify::verify))
        .route("/auth/session", get(session::session))
        .route("/auth/logout", post(session::logout))
        .route("/proposal/:id", get(proposal::proposal))
        .route("/api/contract/submit", post(contract::submit))
        .route("/api/voice/signed-url", get(voice::signed_url))
        .route("/api-docs/openapi.json", get(openapi_json))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(guard, abuse::filter))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// router
/// # Errors
/// Returns an error if the server fails to start
pub async fn new(args: Args) -> Result<()> {
    let secure = args.public_base_url.starts_with("https://");

    let codec = SessionCodec::new(&args.session_secret).context("Invalid session secret")?;
    let sessions = Arc::new(CookieSessionStore::new(codec).with_secure(secure));

    let limiter = Arc::new(RateLimiter::in_memory(
        RateLimitConfig::default()
            .with_max_attempts(args.max_attempts)
            .with_window(args.attempt_window)
            .with_cooldown(args.cooldown),
    ));

    let guard = Arc::new(
        AbuseGuard::new(args.abuse_max_requests, args.abuse_window)
            .context("Failed to compile abuse filter patterns")?,
    );

    let config = GateConfig::default()
        .with_default_resource(args.default_resource)
        .with_mail_from(args.mail_from)
        .with_voice(args.voice);

    let state = Arc::new(
        AppState::new(
            sessions,
            limiter.clone(),
            PasswordVerifier::new(EnvPasswords),
            config,
        )
        .context("Failed to build application state")?,
    );

    spawn_sweeper(limiter, guard.clone());

    let app = router(state, guard);

    let listener = TcpListener::bind(format!("::0:{}", args.port)).await?;

    info!("Listening on [::]:{}", args.port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_tracer();

    Ok(())
}

/// Periodically drop stale limiter records so idle clients do not pile up.
fn spawn_sweeper(limiter: Arc<RateLimiter>, guard: Arc<AbuseGuard>) {
    tokio::spawn(async move {
        loop {
            let jitter = rand::thread_rng().gen_range(0..=SWEEP_JITTER_SECONDS);
            tokio::time::sleep(SWEEP_INTERVAL + Duration::from_secs(jitter)).await;

            let attempts = limiter.sweep();
            let requests = guard.limiter().sweep(unix_millis());
            debug!(attempts, requests, "limiter sweep");
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = route,
        request_id
    )
}
