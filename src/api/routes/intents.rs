//! Intent ingress endpoints.

use {
    super::dto,
    crate::{api::State, domain::{intent::Protocol, solver}},
    axum::{extract, http::StatusCode, response::Json},
    serde::Deserialize,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Request {
    intent: dto::Intent,
}

pub async fn erc20(
    state: extract::State<State>,
    Json(request): Json<Request>,
) -> (StatusCode, Json<serde_json::Value>) {
    submit(state.0, request, Protocol::Erc20).await
}

pub async fn erc721(
    state: extract::State<State>,
    Json(request): Json<Request>,
) -> (StatusCode, Json<serde_json::Value>) {
    submit(state.0, request, Protocol::Erc721).await
}

async fn submit(
    state: State,
    request: Request,
    protocol: Protocol,
) -> (StatusCode, Json<serde_json::Value>) {
    let intent = match dto::to_domain(&request.intent, protocol) {
        Ok(intent) => intent,
        Err(message) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "message": message })),
            );
        }
    };

    let hash = state.solver.intent_hash(&intent);
    let now = chrono::Utc::now().timestamp().max(0) as u32;
    let ttl = intent
        .remaining_validity(now)
        .max(std::time::Duration::from_secs(1));
    let queue = match protocol {
        Protocol::Erc20 => &state.queues.erc20,
        Protocol::Erc721 => &state.queues.erc721,
    };
    queue.submit(
        solver::job_id(&hash, None),
        ttl,
        solver::SolveJob {
            intent,
            approval: None,
            plan: None,
            authorization: None,
        },
    );

    (
        StatusCode::OK,
        Json(serde_json::json!({ "message": "success" })),
    )
}
