use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::{
    competitions,
    error::AppError,
    models::{
        AddPenaltyPayload, Competition, CompetitionDetails, CompetitionQuery,
        ConfirmPenaltyPayload, CreateCompetitionPayload, JoinCompetitionPayload, PenaltiesQuery,
        Penalty,
    },
    penalties,
    state::AppState,
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/create-competition", post(create_competition_handler))
        .route("/api/join-competition", post(join_competition_handler))
        .route("/api/get-all-competitions", get(all_competitions_handler))
        .route(
            "/api/get-competition-details",
            get(competition_details_handler),
        )
        .route("/api/add-penalty", post(add_penalty_handler))
        .route("/api/confirm-penalty", post(confirm_penalty_handler))
        .route("/api/get-penalties", get(penalties_handler))
        .with_state(state)
}

#[derive(Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

#[derive(Serialize)]
pub struct JoinedResponse {
    pub id: String,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct AckResponse {
    pub success: bool,
}

async fn create_competition_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCompetitionPayload>,
) -> Result<Json<CreatedResponse>, AppError> {
    let id = competitions::create(&state.store, payload).await?;
    Ok(Json(CreatedResponse { id }))
}

async fn join_competition_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<JoinCompetitionPayload>,
) -> Result<Json<JoinedResponse>, AppError> {
    let id = competitions::join(&state.store, payload).await?;
    Ok(Json(JoinedResponse {
        id,
        message: "joined competition successfully",
    }))
}

async fn all_competitions_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Competition>>, AppError> {
    Ok(Json(competitions::list(&state.store).await?))
}

async fn competition_details_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CompetitionQuery>,
) -> Result<Json<CompetitionDetails>, AppError> {
    let details = competitions::details(&state.store, query.competition_id).await?;
    Ok(Json(details))
}

async fn add_penalty_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AddPenaltyPayload>,
) -> Result<Json<AckResponse>, AppError> {
    penalties::add(&state.store, payload).await?;
    Ok(Json(AckResponse { success: true }))
}

async fn confirm_penalty_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ConfirmPenaltyPayload>,
) -> Result<Json<AckResponse>, AppError> {
    penalties::confirm(&state.store, payload).await?;
    Ok(Json(AckResponse { success: true }))
}

async fn penalties_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PenaltiesQuery>,
) -> Result<Json<Vec<Penalty>>, AppError> {
    Ok(Json(penalties::list(&state.store, query).await?))
}
