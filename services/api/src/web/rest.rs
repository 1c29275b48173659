//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use std::sync::Arc;

use academy_core::domain::{ContractError, Principal, SkillLevel};
use academy_core::ports::PortError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::{OpenApi, ToSchema};

use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::connect_handler,
        crate::web::auth::disconnect_handler,
        get_certificate_handler,
        get_user_progress_handler,
        get_user_certificates_handler,
        get_course_progress_handler,
        get_stats_handler,
        transfer_handler,
        mint_certificate_handler,
        create_course_handler,
        create_module_handler,
    ),
    components(
        schemas(
            crate::web::auth::ConnectRequest,
            crate::web::auth::ConnectResponse,
            CertificateResponse,
            UserProgressResponse,
            UserCertificatesResponse,
            CourseProgressResponse,
            StatsResponse,
            TransferRequest,
            TxResponse,
            MintRequestBody,
            MintResponse,
            CreateCourseRequest,
            CreateModuleRequest,
        )
    ),
    tags(
        (name = "Bitcoin Developer Academy API", description = "Certificate issuance and progress tracking for the academy.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A certificate record together with its current owner.
#[derive(Serialize, ToSchema)]
pub struct CertificateResponse {
    pub success: bool,
    pub token_id: u64,
    pub course_id: u64,
    pub student: String,
    pub owner: String,
    pub skill_level: u32,
    pub metadata_hash: String,
    pub issued_at_height: u64,
}

#[derive(Serialize, ToSchema)]
pub struct UserProgressResponse {
    pub success: bool,
    pub address: String,
    pub total_points: u64,
    pub current_streak: u32,
    pub skill_level: u32,
    pub completed_modules: Vec<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct UserCertificatesResponse {
    pub success: bool,
    pub address: String,
    pub token_ids: Vec<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct CourseProgressResponse {
    pub success: bool,
    pub course_id: u64,
    pub total_modules: u64,
    pub completed_modules: u64,
    pub completion_percentage: u64,
}

#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub success: bool,
    pub total_students: u64,
    pub total_completions: u64,
}

#[derive(Deserialize, ToSchema)]
pub struct TransferRequest {
    pub recipient: String,
}

/// The response for state-changing calls that only yield a transaction.
#[derive(Serialize, ToSchema)]
pub struct TxResponse {
    pub success: bool,
    pub tx_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct MintRequestBody {
    pub recipient: String,
    pub course_id: u64,
    /// Skill tier as a number, 1 (beginner) through 4 (expert).
    pub skill_level: u32,
    pub metadata_hash: String,
}

#[derive(Serialize, ToSchema)]
pub struct MintResponse {
    pub success: bool,
    pub tx_id: String,
    pub token_id: u64,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateCourseRequest {
    pub course_id: u64,
    pub name: String,
    pub description: String,
    pub difficulty: u32,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateModuleRequest {
    pub module_id: u64,
    pub course_id: u64,
    pub name: String,
    pub description: String,
    pub points_reward: u64,
    pub difficulty: u32,
    pub estimated_minutes: u32,
}

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Maps a port failure to an HTTP status and message, keeping the contract
/// error taxonomy visible to clients.
fn port_error_response(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::Contract(contract_error) => {
            let status = match contract_error {
                ContractError::OwnerOnly | ContractError::NotTokenOwner => StatusCode::FORBIDDEN,
                ContractError::NotFound => StatusCode::NOT_FOUND,
                ContractError::AlreadyCompleted
                | ContractError::AlreadyCertified
                | ContractError::AlreadyExists => StatusCode::CONFLICT,
            };
            (status, contract_error.to_string())
        }
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(msg) => {
            error!("Unexpected port error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

fn parse_principal(address: &str) -> Result<Principal, (StatusCode, String)> {
    address
        .parse::<Principal>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

//=========================================================================================
// Public Read Handlers
//=========================================================================================

/// Look up a certificate by token id.
#[utoipa::path(
    get,
    path = "/api/certificates/{token_id}",
    params(("token_id" = u64, Path, description = "The certificate's token id.")),
    responses(
        (status = 200, description = "Certificate found", body = CertificateResponse),
        (status = 404, description = "No certificate with this token id")
    )
)]
pub async fn get_certificate_handler(
    State(state): State<Arc<AppState>>,
    Path(token_id): Path<u64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let certificate = state
        .ledger
        .get_certificate_data(token_id)
        .await
        .map_err(port_error_response)?
        .ok_or((
            StatusCode::NOT_FOUND,
            format!("Certificate {} not found", token_id),
        ))?;
    let owner = state
        .ledger
        .get_owner(token_id)
        .await
        .map_err(port_error_response)?
        .ok_or((
            StatusCode::NOT_FOUND,
            format!("Certificate {} not found", token_id),
        ))?;

    Ok(Json(CertificateResponse {
        success: true,
        token_id: certificate.token_id,
        course_id: certificate.course_id,
        student: certificate.student.to_string(),
        owner: owner.to_string(),
        skill_level: certificate.skill_level.as_u32(),
        metadata_hash: certificate.metadata_hash,
        issued_at_height: certificate.issued_at_height,
    }))
}

/// A student's aggregate learning progress.
#[utoipa::path(
    get,
    path = "/api/users/{address}/progress",
    params(("address" = String, Path, description = "The student's principal address.")),
    responses(
        (status = 200, description = "Aggregate progress (empty defaults for unknown students)", body = UserProgressResponse),
        (status = 400, description = "Invalid principal address")
    )
)]
pub async fn get_user_progress_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let principal = parse_principal(&address)?;
    let progress = state
        .ledger
        .get_user_progress(&principal)
        .await
        .map_err(port_error_response)?;

    Ok(Json(UserProgressResponse {
        success: true,
        address: principal.to_string(),
        total_points: progress.total_points,
        current_streak: progress.current_streak,
        skill_level: progress.skill_level.as_u32(),
        completed_modules: progress.completed_modules,
    }))
}

/// The token ids a student currently owns.
#[utoipa::path(
    get,
    path = "/api/users/{address}/certificates",
    params(("address" = String, Path, description = "The student's principal address.")),
    responses(
        (status = 200, description = "Owned certificates", body = UserCertificatesResponse),
        (status = 400, description = "Invalid principal address")
    )
)]
pub async fn get_user_certificates_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let principal = parse_principal(&address)?;
    let token_ids = state
        .ledger
        .get_student_certificates(&principal)
        .await
        .map_err(port_error_response)?;

    Ok(Json(UserCertificatesResponse {
        success: true,
        address: principal.to_string(),
        token_ids,
    }))
}

/// A student's completion state within one course.
#[utoipa::path(
    get,
    path = "/api/courses/{course_id}/progress/{address}",
    params(
        ("course_id" = u64, Path, description = "The course id."),
        ("address" = String, Path, description = "The student's principal address.")
    ),
    responses(
        (status = 200, description = "Course progress", body = CourseProgressResponse),
        (status = 400, description = "Invalid principal address")
    )
)]
pub async fn get_course_progress_handler(
    State(state): State<Arc<AppState>>,
    Path((course_id, address)): Path<(u64, String)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let principal = parse_principal(&address)?;
    let progress = state
        .ledger
        .get_course_progress(course_id, &principal)
        .await
        .map_err(port_error_response)?;

    Ok(Json(CourseProgressResponse {
        success: true,
        course_id,
        total_modules: progress.total_modules,
        completed_modules: progress.completed_modules,
        completion_percentage: progress.completion_percentage,
    }))
}

/// Global counters across all students.
#[utoipa::path(
    get,
    path = "/api/stats",
    responses((status = 200, description = "Global stats", body = StatsResponse))
)]
pub async fn get_stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let stats = state
        .ledger
        .get_total_stats()
        .await
        .map_err(port_error_response)?;

    Ok(Json(StatsResponse {
        success: true,
        total_students: stats.total_students,
        total_completions: stats.total_completions,
    }))
}

//=========================================================================================
// Authenticated Handlers
//=========================================================================================

/// Transfer an owned certificate to another principal.
#[utoipa::path(
    post,
    path = "/api/certificates/{token_id}/transfer",
    params(("token_id" = u64, Path, description = "The certificate's token id.")),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer accepted", body = TxResponse),
        (status = 403, description = "Caller does not own the token"),
        (status = 404, description = "No certificate with this token id")
    )
)]
pub async fn transfer_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(token_id): Path<u64>,
    Json(req): Json<TransferRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let recipient = parse_principal(&req.recipient)?;

    // The session principal is both the caller and the sender.
    let tx = state
        .ledger
        .transfer(&principal, token_id, &principal, &recipient)
        .await
        .map_err(port_error_response)?;

    Ok(Json(TxResponse {
        success: true,
        tx_id: tx.tx_id.0,
    }))
}

//=========================================================================================
// Administrative Handlers
//=========================================================================================

fn require_admin(state: &AppState, principal: &Principal) -> Result<(), (StatusCode, String)> {
    if principal != &state.config.admin_principal {
        return Err((
            StatusCode::FORBIDDEN,
            ContractError::OwnerOnly.to_string(),
        ));
    }
    Ok(())
}

/// Directly mint a certificate. The session principal must be the
/// administrative principal; the usual path for students is the WebSocket
/// mint workflow.
#[utoipa::path(
    post,
    path = "/api/certificates/mint",
    request_body = MintRequestBody,
    responses(
        (status = 201, description = "Certificate minted", body = MintResponse),
        (status = 403, description = "Caller is not the administrative principal"),
        (status = 409, description = "The pair (recipient, course) is already certified")
    )
)]
pub async fn mint_certificate_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<MintRequestBody>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_admin(&state, &principal)?;
    let recipient = parse_principal(&req.recipient)?;
    let skill_level = SkillLevel::from_u32(req.skill_level).ok_or((
        StatusCode::BAD_REQUEST,
        format!("'{}' is not a valid skill level", req.skill_level),
    ))?;

    let tx = state
        .ledger
        .mint_certificate(
            &principal,
            &recipient,
            req.course_id,
            skill_level,
            &req.metadata_hash,
        )
        .await
        .map_err(port_error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(MintResponse {
            success: true,
            tx_id: tx.tx_id.0,
            token_id: tx.result,
        }),
    ))
}

/// Register a new course in the certificate registry.
#[utoipa::path(
    post,
    path = "/api/admin/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created", body = TxResponse),
        (status = 403, description = "Caller is not the administrative principal"),
        (status = 409, description = "A course with this id already exists")
    )
)]
pub async fn create_course_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_admin(&state, &principal)?;

    let tx = state
        .ledger
        .create_course(
            &principal,
            req.course_id,
            &req.name,
            &req.description,
            req.difficulty,
        )
        .await
        .map_err(port_error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(TxResponse {
            success: true,
            tx_id: tx.tx_id.0,
        }),
    ))
}

/// Register a new module in the progress tracker.
#[utoipa::path(
    post,
    path = "/api/admin/modules",
    request_body = CreateModuleRequest,
    responses(
        (status = 201, description = "Module created", body = TxResponse),
        (status = 403, description = "Caller is not the administrative principal"),
        (status = 409, description = "A module with this id already exists")
    )
)]
pub async fn create_module_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateModuleRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_admin(&state, &principal)?;

    let tx = state
        .ledger
        .create_module(
            &principal,
            req.module_id,
            req.course_id,
            &req.name,
            &req.description,
            req.points_reward,
            req.difficulty,
            req.estimated_minutes,
        )
        .await
        .map_err(port_error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(TxResponse {
            success: true,
            tx_id: tx.tx_id.0,
        }),
    ))
}
