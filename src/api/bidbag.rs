use crate::api::AppState;
use crate::domain::ItemId;
use crate::error::AppError;
use crate::orchestration::{BidPayload, DispatchOutcome};
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub payload: BidPayload,
    pub sent_at_ms: i64,
}

pub async fn dispatch_bid(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<DispatchResponse>, AppError> {
    let result = state.bidbag.dispatch(ItemId::new(id)).await?;

    let (outcome, url) = match result.outcome {
        DispatchOutcome::DeepLink(url) => ("deepLink", Some(url)),
        DispatchOutcome::Payload(_) => ("payload", None),
    };

    Ok(Json(DispatchResponse {
        outcome,
        url,
        payload: result.payload,
        sent_at_ms: result.sent_at.timestamp_millis(),
    }))
}
