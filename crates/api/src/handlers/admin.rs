//! Admin-only handlers: user management and the aggregate statistics view.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use gymclass_core::booking::attendance_rate;
use gymclass_core::error::CoreError;
use gymclass_core::types::DbId;
use gymclass_core::validation::forms;
use gymclass_db::models::user::{UpdateUser, UserResponse};
use gymclass_db::repositories::{RoleRepo, UserRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `PUT /admin/users/{id}`. This is the only place a
/// role can change.
#[derive(Debug, Default, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Role name (`"student"`, `"instructor"`, `"admin"`).
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// User counts per role.
#[derive(Debug, Serialize)]
pub struct UserTotals {
    pub total: i64,
    pub students: i64,
    pub instructors: i64,
    pub admins: i64,
}

/// Class counts and seat occupancy across active classes.
#[derive(Debug, Serialize)]
pub struct ClassTotals {
    pub total: i64,
    pub active: i64,
    /// Sum of capacity over active classes.
    pub capacity_total: i64,
    /// Sum of occupied seats over active classes.
    pub occupied_total: i64,
}

/// Reservation counts per status, system-wide.
#[derive(Debug, Serialize)]
pub struct ReservationTotals {
    pub total: i64,
    pub confirmed: i64,
    pub cancelled: i64,
    pub attended: i64,
    pub absent: i64,
}

/// Response body for `GET /admin/stats`.
#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub users: UserTotals,
    pub classes: ClassTotals,
    pub reservations: ReservationTotals,
    /// Attended share of all settled reservations, rounded percent.
    pub overall_attendance_rate: u32,
}

// ---------------------------------------------------------------------------
// User management
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    let users = UserRepo::list(&state.pool).await?;

    // Resolve role names once instead of per row.
    let roles = RoleRepo::list(&state.pool).await?;
    let role_name = |role_id: DbId| {
        roles
            .iter()
            .find(|r| r.id == role_id)
            .map(|r| r.name.clone())
            .unwrap_or_default()
    };

    let responses = users
        .into_iter()
        .map(|user| {
            let role = role_name(user.role_id);
            UserResponse::from_user(user, role)
        })
        .collect();

    Ok(Json(DataResponse { data: responses }))
}

/// GET /api/v1/admin/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<UserResponse>> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id,
        }))?;
    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    Ok(Json(UserResponse::from_user(user, role)))
}

/// PUT /api/v1/admin/users/{id}
///
/// Update profile fields, the active flag, and -- uniquely to this
/// endpoint -- the user's role.
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<AdminUpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let current = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id,
        }))?;

    let name = input.name.unwrap_or_else(|| current.name.clone());
    let email = input.email.unwrap_or_else(|| current.email.clone());
    let report = forms::validate_profile(&name, &email);
    if !report.valid {
        return Err(AppError::Core(CoreError::Validation(report.message())));
    }

    let role_id = match input.role {
        None => None,
        Some(role_name) => {
            let role = RoleRepo::find_by_name(&state.pool, &role_name)
                .await?
                .ok_or_else(|| {
                    AppError::Core(CoreError::Validation(format!(
                        "Unknown role: {role_name}"
                    )))
                })?;
            Some(role.id)
        }
    };

    let updated = UserRepo::update(
        &state.pool,
        id,
        &UpdateUser {
            name: Some(name),
            email: Some(email),
            role_id,
            is_active: input.is_active,
        },
    )
    .await?
    .ok_or(AppError::Core(CoreError::NotFound {
        entity: "User",
        id,
    }))?;

    let role = RoleRepo::resolve_name(&state.pool, updated.role_id).await?;
    Ok(Json(UserResponse::from_user(updated, role)))
}

/// DELETE /api/v1/admin/users/{id}
///
/// Soft-deactivation; reservation history stays intact.
pub async fn deactivate_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deactivated = UserRepo::deactivate(&state.pool, id).await?;
    if deactivated {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "User",
            id,
        }))
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/stats
///
/// Aggregate overview. The three count queries are independent reads, so
/// they run concurrently.
pub async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<AdminStats>> {
    let (users, classes, reservations) = tokio::try_join!(
        user_totals(&state.pool),
        class_totals(&state.pool),
        reservation_totals(&state.pool),
    )?;

    let overall_attendance_rate = attendance_rate(reservations.attended, reservations.absent);

    Ok(Json(AdminStats {
        users,
        classes,
        reservations,
        overall_attendance_rate,
    }))
}

async fn user_totals(pool: &PgPool) -> Result<UserTotals, sqlx::Error> {
    let (total, students, instructors, admins): (i64, i64, i64, i64) = sqlx::query_as(
        "SELECT
            COUNT(*),
            COUNT(*) FILTER (WHERE r.name = 'student'),
            COUNT(*) FILTER (WHERE r.name = 'instructor'),
            COUNT(*) FILTER (WHERE r.name = 'admin')
         FROM users u
         JOIN roles r ON r.id = u.role_id",
    )
    .fetch_one(pool)
    .await?;

    Ok(UserTotals {
        total,
        students,
        instructors,
        admins,
    })
}

async fn class_totals(pool: &PgPool) -> Result<ClassTotals, sqlx::Error> {
    let (total, active, capacity_total, occupied_total): (i64, i64, i64, i64) = sqlx::query_as(
        "SELECT
            COUNT(*),
            COUNT(*) FILTER (WHERE is_active),
            COALESCE(SUM(capacity) FILTER (WHERE is_active), 0),
            COALESCE(SUM(occupied_seats) FILTER (WHERE is_active), 0)
         FROM classes",
    )
    .fetch_one(pool)
    .await?;

    Ok(ClassTotals {
        total,
        active,
        capacity_total,
        occupied_total,
    })
}

async fn reservation_totals(pool: &PgPool) -> Result<ReservationTotals, sqlx::Error> {
    let (confirmed, cancelled, attended, absent): (i64, i64, i64, i64) = sqlx::query_as(
        "SELECT
            COUNT(*) FILTER (WHERE status = 'confirmed'),
            COUNT(*) FILTER (WHERE status = 'cancelled'),
            COUNT(*) FILTER (WHERE status = 'attended'),
            COUNT(*) FILTER (WHERE status = 'absent')
         FROM reservations",
    )
    .fetch_one(pool)
    .await?;

    Ok(ReservationTotals {
        total: confirmed + cancelled + attended + absent,
        confirmed,
        cancelled,
        attended,
        absent,
    })
}
