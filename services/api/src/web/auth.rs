//! services/api/src/web/auth.rs
//!
//! Wallet session endpoints. There are no passwords: a client proves control
//! of an address through its wallet and exchanges the address for a
//! server-side session cookie, replacing the ambient browser-storage
//! connection flags with an explicit session object.

use std::sync::Arc;

use academy_core::domain::Principal;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct ConnectRequest {
    /// The wallet's principal address (`SP…` or `ST…`).
    pub address: String,
    /// Optional human-readable BNS name for the address.
    pub bns_name: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ConnectResponse {
    pub success: bool,
    pub address: String,
    pub bns_name: Option<String>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/connect - Establish a wallet session
#[utoipa::path(
    post,
    path = "/api/auth/connect",
    request_body = ConnectRequest,
    responses(
        (status = 200, description = "Session established", body = ConnectResponse),
        (status = 400, description = "Invalid principal address"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn connect_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConnectRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Validate the address
    let principal = req.address.parse::<Principal>().map_err(|e| {
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;

    // 2. Upsert the user row
    let user = state
        .db
        .get_or_create_user(&principal, req.bns_name.as_deref())
        .await
        .map_err(|e| {
            error!("Failed to upsert user: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to connect wallet".to_string(),
            )
        })?;

    // 3. Generate auth session ID
    let auth_session_id = Uuid::new_v4().to_string();

    // 4. Set expiration (30 days)
    let expires_at = Utc::now() + Duration::days(30);

    // 5. Create auth session in database
    state
        .db
        .create_auth_session(&auth_session_id, &principal, expires_at)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create session".to_string(),
            )
        })?;

    // 6. Create session cookie
    let cookie = format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        auth_session_id,
        Duration::days(30).num_seconds()
    );

    // 7. Return response with cookie
    let response = ConnectResponse {
        success: true,
        address: user.address.to_string(),
        bns_name: user.bns_name,
    };

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /api/auth/disconnect - End the wallet session
#[utoipa::path(
    post,
    path = "/api/auth/disconnect",
    responses(
        (status = 200, description = "Session ended"),
        (status = 401, description = "No active session")
    )
)]
pub async fn disconnect_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Extract session cookie
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    // 2. Parse session ID from cookie
    let auth_session_id = cookie_header
        .split(';')
        .find_map(|c| {
            let c = c.trim();
            c.strip_prefix("session=")
        })
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    // 3. Delete auth session from database
    state
        .db
        .delete_auth_session(auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to disconnect".to_string(),
            )
        })?;

    // 4. Clear cookie
    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}
