use std::sync::Arc;

use axum::{extract::State, Json};
use litmap_types::wire::{EmbedRequest, EmbedResponse};

use crate::{AppError, AppState};

pub async fn embed(State(state): State<Arc<AppState>>, Json(request): Json<EmbedRequest>) -> Result<Json<EmbedResponse>, AppError> {
    let embedding = state.embedder.embed(&request.query).await?;
    Ok(Json(EmbedResponse { embedding }))
}
