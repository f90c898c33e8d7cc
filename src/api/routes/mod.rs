use {
    crate::api::State,
    axum::{
        routing::{get, post},
        Router,
    },
};

mod authorizations;
pub mod dto;
mod intents;

pub fn router(state: State) -> Router {
    Router::new()
        .route("/lives", get(lives))
        .route("/metrics", get(metrics))
        .route("/erc20/intents", post(intents::erc20))
        .route("/erc721/intents", post(intents::erc721))
        .route("/erc20/authorizations", post(authorizations::erc20))
        .route("/erc721/authorizations", post(authorizations::erc721))
        .route("/admin/queues", get(admin_queues))
        .route("/admin/status/:hash", get(admin_status))
        .with_state(state)
}

async fn lives() -> &'static str {
    "OK"
}

async fn metrics() -> String {
    crate::infra::metrics::encode()
}

async fn admin_queues(
    axum::extract::State(state): axum::extract::State<State>,
) -> axum::response::Json<serde_json::Value> {
    let mut queues = vec![
        state.queues.erc20.snapshot(),
        state.queues.erc721.snapshot(),
        state.inventory.snapshot(),
    ];
    if let Some(authorizer) = &state.authorizer {
        queues.push(authorizer.snapshot());
    }
    axum::response::Json(serde_json::json!({ "queues": queues }))
}

async fn admin_status(
    axum::extract::State(state): axum::extract::State<State>,
    axum::extract::Path(hash): axum::extract::Path<String>,
) -> Result<axum::response::Json<serde_json::Value>, axum::http::StatusCode> {
    let hash: crate::domain::eth::B256 =
        hash.parse().map_err(|_| axum::http::StatusCode::BAD_REQUEST)?;
    match state.store.status(&hash).await {
        Some(status) => Ok(axum::response::Json(serde_json::json!({ "status": status }))),
        None => Err(axum::http::StatusCode::NOT_FOUND),
    }
}
