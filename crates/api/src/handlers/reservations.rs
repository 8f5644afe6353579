//! Handlers for the `/reservations` resource: booking, cancellation, and
//! attendance marking.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Datelike, Utc};
use serde::Deserialize;

use gymclass_core::booking::ReservationStatus;
use gymclass_core::error::CoreError;
use gymclass_core::schedule;
use gymclass_core::types::{DbId, Timestamp};
use gymclass_db::models::reservation::{CreateReservation, Reservation, ReservationFilter};
use gymclass_db::repositories::{ClassRepo, ReservationRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::classes::class_weekday;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAdmin, RequireInstructor};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /reservations`.
#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub class_id: DbId,
    /// Concrete occurrence to book. Defaults to the class's next
    /// occurrence when omitted.
    pub occurrence_at: Option<Timestamp>,
}

/// Request body for `POST /reservations/{id}/cancel`.
#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

/// Request body for `POST /reservations/{id}/attendance`.
#[derive(Debug, Deserialize)]
pub struct AttendanceRequest {
    /// `"attended"` or `"absent"`.
    pub status: String,
}

/// Query parameters for the admin `GET /reservations` listing.
#[derive(Debug, Deserialize)]
pub struct ReservationListParams {
    pub student_id: Option<DbId>,
    pub class_id: Option<DbId>,
    pub status: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/reservations
///
/// Book a seat for the authenticated student. The occurrence must match
/// the class's weekly slot and lie in the future; the capacity, cap, and
/// duplicate rules are enforced transactionally by the repository.
pub async fn book(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<BookRequest>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    if !user.is_student() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only students can book classes".into(),
        )));
    }

    let class = ClassRepo::find_by_id(&state.pool, input.class_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Class",
            id: input.class_id,
        }))?;

    let now = Utc::now();
    let weekday = class_weekday(&class)?;
    let next = schedule::next_occurrence(weekday, class.start_time, now);

    let occurrence_at = match input.occurrence_at {
        None => next,
        Some(requested) => {
            // A concrete occurrence must actually lie on the class's
            // weekly slot; anything else is a stale or forged client.
            let date = requested.date_naive();
            let on_slot = schedule::combine_date_and_time(date, class.start_time) == requested
                && date.weekday().num_days_from_sunday() as i16 == class.weekday;
            if !on_slot {
                return Err(AppError::Core(CoreError::Validation(
                    "Occurrence does not match the class schedule".into(),
                )));
            }
            if requested <= now {
                return Err(AppError::Core(CoreError::Validation(
                    "Cannot book a past occurrence".into(),
                )));
            }
            requested
        }
    };

    let reservation = ReservationRepo::book(
        &state.pool,
        &CreateReservation {
            class_id: input.class_id,
            student_id: user.user_id,
            occurrence_at,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(reservation)))
}

/// POST /api/v1/reservations/{id}/cancel
///
/// Students cancel their own reservations, subject to the 2-hour window.
/// Admins may cancel any reservation with no window.
pub async fn cancel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<CancelRequest>,
) -> AppResult<Json<Reservation>> {
    let reservation = ReservationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Reservation",
            id,
        }))?;

    let reason = input.reason.as_deref();

    let cancelled = if user.is_admin() {
        ReservationRepo::cancel_unrestricted(&state.pool, id, reason).await?
    } else if reservation.student_id == user.user_id {
        ReservationRepo::cancel(&state.pool, id, reason, Utc::now()).await?
    } else {
        return Err(AppError::Core(CoreError::Forbidden(
            "You can only cancel your own reservations".into(),
        )));
    };

    Ok(Json(cancelled))
}

/// POST /api/v1/reservations/{id}/attendance
///
/// Instructors mark attendance for their own classes; admins for any.
pub async fn mark_attendance(
    State(state): State<AppState>,
    RequireInstructor(user): RequireInstructor,
    Path(id): Path<DbId>,
    Json(input): Json<AttendanceRequest>,
) -> AppResult<Json<Reservation>> {
    let status = ReservationStatus::parse(&input.status).ok_or_else(|| {
        AppError::Core(CoreError::Validation(format!(
            "Unknown reservation status: {}",
            input.status
        )))
    })?;

    let reservation = ReservationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Reservation",
            id,
        }))?;

    if !user.is_admin() {
        let class = ClassRepo::find_by_id(&state.pool, reservation.class_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Class",
                id: reservation.class_id,
            }))?;
        if class.instructor_id != user.user_id {
            return Err(AppError::Core(CoreError::Forbidden(
                "You can only mark attendance for your own classes".into(),
            )));
        }
    }

    let updated = ReservationRepo::mark_attendance(&state.pool, id, status).await?;
    Ok(Json(updated))
}

/// GET /api/v1/reservations (admin only)
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    Query(params): Query<ReservationListParams>,
) -> AppResult<Json<DataResponse<Vec<Reservation>>>> {
    let status = match params.status.as_deref() {
        None => None,
        Some(code) => Some(ReservationStatus::parse(code).ok_or_else(|| {
            AppError::Core(CoreError::Validation(format!(
                "Unknown reservation status: {code}"
            )))
        })?),
    };

    let filter = ReservationFilter {
        student_id: params.student_id,
        class_id: params.class_id,
        status,
    };
    let reservations = ReservationRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: reservations }))
}

/// GET /api/v1/reservations/{id}
///
/// Owners see their own reservation; instructors of the class and admins
/// see any.
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<Reservation>> {
    let reservation = ReservationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Reservation",
            id,
        }))?;

    if reservation.student_id == user.user_id || user.is_admin() {
        return Ok(Json(reservation));
    }

    if user.is_instructor() {
        let class = ClassRepo::find_by_id(&state.pool, reservation.class_id).await?;
        if class.is_some_and(|c| c.instructor_id == user.user_id) {
            return Ok(Json(reservation));
        }
    }

    Err(AppError::Core(CoreError::Forbidden(
        "You cannot view this reservation".into(),
    )))
}
