use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicMember, RefreshRequest, RegisterRequest},
        repo::Member,
        services::{hash_password, is_valid_email, is_valid_phone, verify_password, JwtKeys},
    },
    loyalty,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

fn public(member: &Member) -> PublicMember {
    PublicMember {
        id: member.id,
        name: member.name.clone(),
        phone_number: member.phone_number.clone(),
        email: member.email.clone(),
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, (axum::http::StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();
    payload.name = payload.name.trim().to_string();
    payload.phone_number = payload.phone_number.trim().to_string();

    if payload.name.is_empty() {
        return Err((axum::http::StatusCode::BAD_REQUEST, "Name is required".into()));
    }

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((axum::http::StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    if !is_valid_phone(&payload.phone_number) {
        warn!("invalid phone number");
        return Err((
            axum::http::StatusCode::BAD_REQUEST,
            "Invalid phone number".into(),
        ));
    }

    if payload.password.len() < 8 {
        warn!("password too short");
        return Err((
            axum::http::StatusCode::BAD_REQUEST,
            "Password too short".into(),
        ));
    }

    // Ensure email is not taken
    if let Ok(Some(_)) = Member::find_by_email(&state.db, &payload.email).await {
        warn!(email = %payload.email, "email already registered");
        return Err((
            axum::http::StatusCode::CONFLICT,
            "Email already registered".into(),
        ));
    }

    let hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let member = match Member::create(
        &state.db,
        &payload.name,
        &payload.phone_number,
        &payload.email,
        &hash,
    )
    .await
    {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, "create member failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    // Seed an empty loyalty profile; the loyalty read path bootstraps
    // one anyway if this fails, so only warn.
    if let Err(e) = loyalty::services::init_profile(&state, &member).await {
        warn!(error = %e, member_id = %member.id, "loyalty profile seed failed");
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = match keys.sign_access(member.id) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "jwt sign access failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };
    let refresh_token = match keys.sign_refresh(member.id) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "jwt sign refresh failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    info!(member_id = %member.id, email = %member.email, "member registered");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        member: public(&member),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (axum::http::StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((axum::http::StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let member = match Member::find_by_email(&state.db, &payload.email).await {
        Ok(Some(m)) => m,
        Ok(None) => {
            warn!(email = %payload.email, "login unknown email");
            return Err((
                axum::http::StatusCode::UNAUTHORIZED,
                "Invalid credentials".into(),
            ));
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let ok = match verify_password(&payload.password, &member.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "verify_password failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    if !ok {
        warn!(email = %payload.email, member_id = %member.id, "login invalid password");
        return Err((
            axum::http::StatusCode::UNAUTHORIZED,
            "Invalid credentials".into(),
        ));
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = match keys.sign_access(member.id) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "jwt sign access failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };
    let refresh_token = match keys.sign_refresh(member.id) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "jwt sign refresh failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    info!(member_id = %member.id, email = %member.email, "member logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        member: public(&member),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (axum::http::StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (axum::http::StatusCode::UNAUTHORIZED, format!("{}", e)))?;

    // Issue new pair
    let access_token = keys
        .sign_access(claims.sub)
        .map_err(|e| (axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let refresh_token = keys
        .sign_refresh(claims.sub)
        .map_err(|e| (axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let member = Member::find_by_id(&state.db, claims.sub)
        .await
        .map_err(|e| (axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((
            axum::http::StatusCode::UNAUTHORIZED,
            "Member not found".to_string(),
        ))?;

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        member: public(&member),
    }))
}
