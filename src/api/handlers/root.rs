use axum::response::IntoResponse;

// service banner
pub async fn root() -> impl IntoResponse {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
