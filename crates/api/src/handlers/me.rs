//! Handlers for the authenticated user's own resources: profile, password,
//! and reservation views.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use gymclass_core::error::CoreError;
use gymclass_core::rules::HISTORY_DEFAULT_LIMIT;
use gymclass_core::validation::forms;
use gymclass_db::models::reservation::{Reservation, ReservationCounts};
use gymclass_db::models::user::{UpdateUser, UserResponse};
use gymclass_db::repositories::{ReservationRepo, RoleRepo, SessionRepo, UserRepo};

use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::LimitParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// History listings are capped to keep the payload bounded.
const HISTORY_MAX_LIMIT: i64 = 100;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `PUT /me`. Role and active flag are intentionally not
/// accepted here; those are admin-only fields.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Request body for `POST /me/change-password`.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Response body for `GET /me/stats`.
#[derive(Debug, Serialize)]
pub struct StudentStats {
    pub counts: ReservationCounts,
    /// Attended share of completed occurrences, rounded percent.
    pub attendance_rate: u32,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// GET /api/v1/me
pub async fn get_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<UserResponse>> {
    let user = load_user(&state, &auth_user).await?;
    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    Ok(Json(UserResponse::from_user(user, role)))
}

/// PUT /api/v1/me
///
/// Update name and/or email. The merged result is validated as a whole so
/// a partial update cannot leave the profile invalid.
pub async fn update_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserResponse>> {
    let current = load_user(&state, &auth_user).await?;

    let name = input.name.unwrap_or_else(|| current.name.clone());
    let email = input.email.unwrap_or_else(|| current.email.clone());

    let report = forms::validate_profile(&name, &email);
    if !report.valid {
        return Err(AppError::Core(CoreError::Validation(report.message())));
    }

    if email != current.email {
        if let Some(other) = UserRepo::find_by_email(&state.pool, &email).await? {
            if other.id != current.id {
                return Err(AppError::Core(CoreError::Conflict(
                    "Email is already registered".into(),
                )));
            }
        }
    }

    let updated = UserRepo::update(
        &state.pool,
        current.id,
        &UpdateUser {
            name: Some(name.trim().to_string()),
            email: Some(email.trim().to_string()),
            role_id: None,
            is_active: None,
        },
    )
    .await?
    .ok_or(AppError::Core(CoreError::NotFound {
        entity: "User",
        id: current.id,
    }))?;

    let role = RoleRepo::resolve_name(&state.pool, updated.role_id).await?;
    Ok(Json(UserResponse::from_user(updated, role)))
}

/// POST /api/v1/me/change-password
///
/// Verifies the current password, applies the new one, and revokes every
/// session so stolen refresh tokens die with the old password.
pub async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    let report = forms::validate_password_change(
        &input.current_password,
        &input.new_password,
        &input.confirm_password,
    );
    if !report.valid {
        return Err(AppError::Core(CoreError::Validation(report.message())));
    }

    let user = load_user(&state, &auth_user).await?;

    let current_valid = verify_password(&input.current_password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !current_valid {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Current password is incorrect".into(),
        )));
    }

    let new_hash = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    UserRepo::update_password(&state.pool, user.id, &new_hash).await?;
    SessionRepo::revoke_all_for_user(&state.pool, user.id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Reservation views
// ---------------------------------------------------------------------------

/// GET /api/v1/me/reservations
///
/// Upcoming confirmed reservations, soonest first.
pub async fn my_reservations(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Reservation>>>> {
    let reservations =
        ReservationRepo::list_active_for_student(&state.pool, auth_user.user_id).await?;
    Ok(Json(DataResponse { data: reservations }))
}

/// GET /api/v1/me/history?limit=
///
/// Settled reservations (cancelled / attended / absent), newest first.
pub async fn my_history(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<LimitParams>,
) -> AppResult<Json<DataResponse<Vec<Reservation>>>> {
    let limit = params
        .limit
        .unwrap_or(HISTORY_DEFAULT_LIMIT)
        .clamp(1, HISTORY_MAX_LIMIT);
    let reservations =
        ReservationRepo::list_history_for_student(&state.pool, auth_user.user_id, limit).await?;
    Ok(Json(DataResponse { data: reservations }))
}

/// GET /api/v1/me/stats
pub async fn my_stats(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<StudentStats>> {
    let counts = ReservationRepo::count_by_status(&state.pool, auth_user.user_id).await?;
    let attendance_rate =
        gymclass_core::booking::attendance_rate(counts.attended, counts.absent);
    Ok(Json(StudentStats {
        counts,
        attendance_rate,
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_user(
    state: &AppState,
    auth_user: &AuthUser,
) -> AppResult<gymclass_db::models::user::User> {
    UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth_user.user_id,
        }))
}
