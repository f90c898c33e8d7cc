//! Matchmaker callback endpoints. The body carries either the UUID of a
//! previously posted solution or a full intent, never both, together with
//! the signed authorization.

use {
    super::dto,
    crate::{
        api::State,
        domain::{intent::Protocol, solver},
        infra::store::Approval,
    },
    axum::{extract, http::StatusCode, response::Json},
    serde::Deserialize,
    uuid::Uuid,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Request {
    #[serde(default)]
    uuid: Option<Uuid>,
    #[serde(default)]
    intent: Option<dto::Intent>,
    #[serde(default)]
    approval_tx_or_tx_hash: Option<String>,
    authorization: dto::Authorization,
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
    let error = |message: &str| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "message": message })),
        )
    };

    let job = match (&request.uuid, &request.intent) {
        (Some(_), Some(_)) | (None, None) => {
            return error("exactly one of uuid or intent is required");
        }
        (Some(uuid), None) => {
            if request.approval_tx_or_tx_hash.is_some() {
                return error("uuid cannot be combined with approvalTxOrTxHash");
            }
            let Some(cached) = state.store.cached_solution(uuid).await else {
                return (
                    StatusCode::NOT_FOUND,
                    Json(serde_json::json!({ "message": "unknown solution" })),
                );
            };
            solver::SolveJob {
                intent: cached.intent,
                approval: cached.approval,
                plan: Some(cached.plan),
                authorization: Some(dto::authorization_to_domain(&request.authorization)),
            }
        }
        (None, Some(intent)) => {
            let intent = match dto::to_domain(intent, protocol) {
                Ok(intent) => intent,
                Err(message) => return error(message),
            };
            let approval = match request
                .approval_tx_or_tx_hash
                .as_deref()
                .map(parse_approval)
                .transpose()
            {
                Ok(approval) => approval,
                Err(message) => return error(message),
            };
            solver::SolveJob {
                intent,
                approval,
                plan: None,
                authorization: Some(dto::authorization_to_domain(&request.authorization)),
            }
        }
    };

    let hash = state.solver.intent_hash(&job.intent);
    let auth = job
        .authorization
        .as_ref()
        .map(|auth| state.solver.authorization_hash(&auth.authorization, protocol));
    let now = chrono::Utc::now().timestamp().max(0) as u32;
    let ttl = job
        .intent
        .remaining_validity(now)
        .max(std::time::Duration::from_secs(1));
    let queue = match protocol {
        Protocol::Erc20 => &state.queues.erc20,
        Protocol::Erc721 => &state.queues.erc721,
    };
    queue.submit(solver::job_id(&hash, auth.as_ref()), ttl, job);

    (
        StatusCode::OK,
        Json(serde_json::json!({ "message": "success" })),
    )
}

/// A pre-signed raw transaction, or the 32-byte hash of a pending one.
fn parse_approval(value: &str) -> Result<Approval, &'static str> {
    let data = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(data).map_err(|_| "malformed approvalTxOrTxHash")?;
    Ok(if bytes.len() == 32 {
        Approval::Hash(crate::domain::eth::B256::from_slice(&bytes))
    } else {
        Approval::Raw(bytes.into())
    })
}
