use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::auth::services::AuthMember;
use crate::loyalty::catalog::RewardItem;
use crate::loyalty::dto::{CheckoutResponse, EarnRequest, ProfileResponse, RedeemRequest};
use crate::loyalty::error::LoyaltyError;
use crate::loyalty::services;
use crate::state::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/loyalty/profile", get(get_profile))
        .route("/loyalty/catalog", get(get_catalog))
        .route("/loyalty/vouchers/:id/checkout", get(get_checkout))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/loyalty/earn", post(earn))
        .route("/loyalty/redeem", post(redeem))
        .route("/loyalty/vouchers/:id/use", post(use_voucher))
        .route("/loyalty/profile", delete(reset_profile))
}

#[instrument(skip(state))]
async fn get_profile(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
) -> Result<Json<ProfileResponse>, LoyaltyError> {
    let now = OffsetDateTime::now_utc();
    let profile = services::get_profile(&state, member_id, now).await?;
    Ok(Json(ProfileResponse::new(profile, now)))
}

#[instrument]
async fn get_catalog() -> Json<&'static [RewardItem]> {
    Json(services::rewards())
}

#[instrument(skip(state, payload))]
async fn earn(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Json(payload): Json<EarnRequest>,
) -> Result<Json<ProfileResponse>, LoyaltyError> {
    let now = OffsetDateTime::now_utc();
    let profile = services::add_earn(&state, member_id, payload.amount, now).await?;
    info!(%member_id, amount = payload.amount, points = profile.current_points, "transaction recorded");
    Ok(Json(ProfileResponse::new(profile, now)))
}

#[instrument(skip(state, payload))]
async fn redeem(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Json(payload): Json<RedeemRequest>,
) -> Result<Json<ProfileResponse>, LoyaltyError> {
    let now = OffsetDateTime::now_utc();
    let profile = services::redeem(&state, member_id, &payload.reward_id, now).await?;
    info!(%member_id, reward_id = %payload.reward_id, "reward redeemed");
    Ok(Json(ProfileResponse::new(profile, now)))
}

/// Cashier/self-service confirmation that a voucher was honored.
#[instrument(skip(state))]
async fn use_voucher(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Path(voucher_id): Path<String>,
) -> Result<Json<ProfileResponse>, LoyaltyError> {
    let now = OffsetDateTime::now_utc();
    let profile = services::mark_used(&state, member_id, &voucher_id, now).await?;
    info!(%member_id, %voucher_id, "voucher marked used");
    Ok(Json(ProfileResponse::new(profile, now)))
}

/// Opaque payload for the client's QR rendering; the encoding on
/// screen is the client's concern.
#[instrument(skip(state))]
async fn get_checkout(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Path(voucher_id): Path<String>,
) -> Result<Json<CheckoutResponse>, LoyaltyError> {
    let now = OffsetDateTime::now_utc();
    let payload = services::checkout_payload(&state, member_id, &voucher_id, now).await?;
    Ok(Json(CheckoutResponse { payload }))
}

#[instrument(skip(state))]
async fn reset_profile(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
) -> Result<StatusCode, LoyaltyError> {
    services::reset(&state, member_id).await?;
    info!(%member_id, "loyalty profile reset");
    Ok(StatusCode::NO_CONTENT)
}
